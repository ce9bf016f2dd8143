use bevy::prelude::*;

use crate::config::{SHOVEL_EMPTY_PERCENT, SHOVEL_FULL_PERCENT, SHOVEL_READY_TO_LOAD_PERCENT};
use crate::fill::{DischargeState, Dischargeable, FillType, FillUnit, FillUnits};
use crate::scene;
use crate::vehicle::Shovel;

use super::actuator::{ShovelActuator, ShovelPosition};

pub fn is_full_level(fill_level: f32) -> bool {
    fill_level >= SHOVEL_FULL_PERCENT
}

pub fn is_empty_level(fill_level: f32) -> bool {
    fill_level <= SHOVEL_EMPTY_PERCENT
}

/// Material only flows when the shovel is tipped AND the discharge is on.
pub fn is_unloading_state(tilted_for_unloading: bool, discharge: DischargeState) -> bool {
    tilted_for_unloading && discharge != DischargeState::Off
}

/// Drives one shovel implement through its loading cycle positions.
///
/// Position changes follow a polling contract: call the relevant `move_to_*`
/// every tick until it returns `true`. The controller only owns the logical
/// position; fill level, discharge state and tilt are read live from the
/// implement on every query.
#[derive(Debug, Clone, PartialEq)]
pub struct ShovelController {
    implement: Entity,
    state: ShovelPosition,
    pending: Option<ShovelPosition>,
}

impl ShovelController {
    pub fn new(implement: Entity) -> Self {
        Self {
            implement,
            state: ShovelPosition::Deactivated,
            pending: None,
        }
    }

    pub fn implement(&self) -> Entity {
        self.implement
    }

    pub fn state(&self) -> ShovelPosition {
        self.state
    }

    pub fn move_to_loading_position(&mut self, world: &mut World) -> bool {
        self.move_to_position(world, ShovelPosition::Loading)
    }

    pub fn move_to_transport_position(&mut self, world: &mut World) -> bool {
        self.move_to_position(world, ShovelPosition::Transport)
    }

    pub fn move_to_pre_unload_position(&mut self, world: &mut World) -> bool {
        self.move_to_position(world, ShovelPosition::PreUnloading)
    }

    pub fn move_to_unload_position(&mut self, world: &mut World) -> bool {
        self.move_to_position(world, ShovelPosition::Unloading)
    }

    /// Request `position`; `true` once it has been reached. Requesting the
    /// current position is a no-op that reports reached immediately.
    pub fn move_to_position(&mut self, world: &mut World, position: ShovelPosition) -> bool {
        if self.state == position && self.pending.is_none() {
            return true;
        }
        let Some(pose) = position.pose() else {
            self.on_finished(world);
            return true;
        };
        let Some(mut actuator) = world.get_mut::<ShovelActuator>(self.implement) else {
            debug!("implement {} has no shovel actuator", self.implement);
            return false;
        };
        if self.pending != Some(position) {
            debug!(
                "shovel {}: {:?} -> {:?}",
                self.implement, self.state, position
            );
            actuator.request(pose);
            self.pending = Some(position);
        }
        if actuator.is_at(pose) {
            self.state = position;
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Park: back to `Deactivated` and release the actuator. Does nothing if
    /// already deactivated.
    pub fn on_finished(&mut self, world: &mut World) {
        if self.state == ShovelPosition::Deactivated && self.pending.is_none() {
            return;
        }
        self.state = ShovelPosition::Deactivated;
        self.pending = None;
        if let Some(mut actuator) = world.get_mut::<ShovelActuator>(self.implement) {
            actuator.release();
        }
    }

    pub fn shovel_node(&self, world: &World) -> Option<Entity> {
        world.get::<Shovel>(self.implement).map(|s| s.node)
    }

    fn fill_unit<'w>(&self, world: &'w World) -> Option<&'w FillUnit> {
        let index = world.get::<Shovel>(self.implement)?.fill_unit_index;
        world.get::<FillUnits>(self.implement)?.get(index)
    }

    /// Shovel fill level in percent; 0 when the implement is gone.
    pub fn fill_level(&self, world: &World) -> f32 {
        self.fill_unit(world).map_or(0.0, FillUnit::percentage)
    }

    /// Litres currently in the shovel.
    pub fn fill_amount(&self, world: &World) -> f32 {
        self.fill_unit(world).map_or(0.0, |u| u.level)
    }

    pub fn is_full(&self, world: &World) -> bool {
        is_full_level(self.fill_level(world))
    }

    pub fn is_empty(&self, world: &World) -> bool {
        is_empty_level(self.fill_level(world))
    }

    pub fn is_tilted_for_unloading(&self, world: &World) -> bool {
        world
            .get::<ShovelActuator>(self.implement)
            .is_some_and(|a| a.tip_factor >= 0.0)
    }

    pub fn discharge_state(&self, world: &World) -> DischargeState {
        world
            .get::<Dischargeable>(self.implement)
            .map_or(DischargeState::Off, |d| d.state)
    }

    pub fn is_unloading(&self, world: &World) -> bool {
        is_unloading_state(self.is_tilted_for_unloading(world), self.discharge_state(world))
    }

    /// No fill type assigned yet and practically empty.
    pub fn is_ready_to_load(&self, world: &World) -> bool {
        self.loading_fill_type(world).is_none()
            && self.fill_level(world) < SHOVEL_READY_TO_LOAD_PERCENT
    }

    /// Whether the shovel tip has reached or passed `target` along the
    /// target's forward axis (its local Z is below `margin`).
    pub fn is_over_target(&self, world: &World, target: Entity, margin: f32) -> bool {
        let Some(node) = self.shovel_node(world) else {
            return false;
        };
        scene::local_to_local(world, node, target, Vec3::ZERO).is_ok_and(|p| p.z < margin)
    }

    pub fn loading_fill_type(&self, world: &World) -> Option<FillType> {
        self.fill_unit(world).and_then(|u| u.fill_type)
    }

    pub fn discharge_fill_type(&self, world: &World) -> Option<FillType> {
        let index = world.get::<Dischargeable>(self.implement)?.fill_unit_index;
        world
            .get::<FillUnits>(self.implement)?
            .get(index)
            .and_then(|u| u.fill_type)
    }
}
