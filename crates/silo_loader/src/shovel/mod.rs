//! Shovel implement control: the logical position state machine
//! ([`ShovelController`]) on top of the per-tick mechanical model
//! ([`ShovelActuator`]).

mod actuator;
mod controller;

pub use actuator::{
    discharge_tipped_shovels, drive_shovel_actuators, ShovelActuator, ShovelPose, ShovelPosition,
    DISCHARGE_RATE_PER_TICK,
};
pub use controller::{is_empty_level, is_full_level, is_unloading_state, ShovelController};
