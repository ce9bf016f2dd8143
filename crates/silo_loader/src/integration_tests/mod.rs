//! Integration tests using the `TestYard` harness.
//!
//! These spin up a headless Bevy App with `SiloLoaderPlugin` and drive jobs,
//! markers and shovels through the fixed schedule.

mod controller_polling;
mod job_cycles;
mod marker_systems;
mod save_data;
