//! Mechanical side of a shovel implement: arm and tip cylinders moving toward
//! a requested pose at a fixed rate per tick, and the discharge that starts
//! once the shovel is tipped past level.

use bevy::prelude::*;

use crate::config::{ARM_RATE_PER_TICK, POSE_TOLERANCE, TIP_RATE_PER_TICK};
use crate::fill::{DischargeState, Dischargeable, FillUnits};

/// Litres leaving a tipped shovel per tick.
pub const DISCHARGE_RATE_PER_TICK: f32 = 200.0;

/// Logical shovel position, owned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShovelPosition {
    #[default]
    Deactivated,
    Loading,
    Transport,
    PreUnloading,
    Unloading,
}

/// Arm height (metres above the lowest position) and tip factor (-1 fully
/// curled back, 0 starting to spill, 1 fully tipped).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShovelPose {
    pub arm_height: f32,
    pub tip_factor: f32,
}

impl ShovelPosition {
    /// Target pose; `Deactivated` has none (the cylinders are released).
    pub fn pose(self) -> Option<ShovelPose> {
        let (arm_height, tip_factor) = match self {
            ShovelPosition::Deactivated => return None,
            ShovelPosition::Loading => (0.0, -0.1),
            ShovelPosition::Transport => (0.5, -1.0),
            ShovelPosition::PreUnloading => (3.5, -0.8),
            ShovelPosition::Unloading => (3.5, 0.8),
        };
        Some(ShovelPose {
            arm_height,
            tip_factor,
        })
    }
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct ShovelActuator {
    pub arm_height: f32,
    pub tip_factor: f32,
    pub target: Option<ShovelPose>,
}

impl Default for ShovelActuator {
    fn default() -> Self {
        Self {
            arm_height: 0.5,
            tip_factor: -1.0,
            target: None,
        }
    }
}

fn approach(current: f32, target: f32, rate: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= rate {
        target
    } else {
        current + rate * delta.signum()
    }
}

impl ShovelActuator {
    pub fn request(&mut self, pose: ShovelPose) {
        self.target = Some(pose);
    }

    /// Stop holding a pose; the shovel stays where it is.
    pub fn release(&mut self) {
        self.target = None;
    }

    pub fn is_at(&self, pose: ShovelPose) -> bool {
        (self.arm_height - pose.arm_height).abs() <= POSE_TOLERANCE
            && (self.tip_factor - pose.tip_factor).abs() <= POSE_TOLERANCE
    }

    /// Advance one tick toward the target pose.
    pub fn step(&mut self) {
        let Some(target) = self.target else {
            return;
        };
        self.arm_height = approach(self.arm_height, target.arm_height, ARM_RATE_PER_TICK);
        self.tip_factor = approach(self.tip_factor, target.tip_factor, TIP_RATE_PER_TICK);
    }
}

pub fn drive_shovel_actuators(mut actuators: Query<&mut ShovelActuator>) {
    for mut actuator in &mut actuators {
        if actuator.target.is_some() {
            actuator.step();
        }
    }
}

/// A tipped shovel with material in it discharges; otherwise discharge is off.
pub fn discharge_tipped_shovels(
    mut shovels: Query<(&ShovelActuator, &mut Dischargeable, &mut FillUnits)>,
) {
    for (actuator, mut dischargeable, mut units) in &mut shovels {
        let index = dischargeable.fill_unit_index;
        let Some(unit) = units.0.get_mut(index) else {
            continue;
        };
        let state = if actuator.tip_factor >= 0.0 && unit.level > 0.0 {
            unit.remove(DISCHARGE_RATE_PER_TICK);
            DischargeState::Discharging
        } else {
            DischargeState::Off
        };
        if dischargeable.state != state {
            dischargeable.state = state;
        }
    }
}
