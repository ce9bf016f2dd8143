//! The silo-loader job: parameters, validation against the world, and the
//! task list it runs once started.

mod errors;
mod parameters;
mod silo_loader;
mod systems;
mod tasks;
#[cfg(test)]
mod tests;

pub use errors::JobError;
pub use parameters::{
    ApplicableParameters, JobParameterStore, JobParameters, PositionAngle, UnloadMode,
};
pub use silo_loader::{JobState, SiloLoaderJob};
pub use systems::{start_job, stop_job, tick_silo_loader_jobs, SiloLoaderJobs};
pub use tasks::{JobTask, LoadCycleTask, LoadPhase, ParkTask, Task};
