//! Vehicles and unload targets for `TestYard` scenarios.

use bevy::prelude::*;

use crate::fill::{Dischargeable, FillType, FillUnit, FillUnits};
use crate::scene;
use crate::shovel::ShovelActuator;
use crate::unload::UnloadTarget;
use crate::vehicle::{attach_implement, AttachSide, Implement, Shovel, Vehicle, VehicleSize};

use super::TestYard;

/// Shovel tip distance ahead of the wheel loader root.
pub const SHOVEL_REACH: f32 = 4.8;

#[derive(Debug, Clone, Copy)]
pub struct LoaderHandles {
    pub vehicle: Entity,
    pub shovel: Entity,
    pub tip: Entity,
}

impl TestYard {
    /// Wheel loader at `position` facing `heading`, with a front shovel of
    /// `capacity` litres whose tip sits [`SHOVEL_REACH`] metres ahead.
    pub fn spawn_wheel_loader(
        &mut self,
        id: u32,
        farm_id: u8,
        position: Vec3,
        heading: f32,
        capacity: f32,
    ) -> LoaderHandles {
        let world = self.world_mut();
        let vehicle = world
            .spawn((
                Name::new("wheelLoader"),
                Vehicle::new(id, farm_id, VehicleSize::new(7.0, 2.6)),
                Transform::from_translation(position).with_rotation(scene::heading_rotation(heading)),
            ))
            .id();
        let shovel = world
            .spawn((
                Name::new("shovel"),
                Implement {
                    size: VehicleSize::new(1.6, 2.8),
                    side: AttachSide::Front,
                },
                Transform::from_xyz(0.0, 0.0, 4.0),
                ShovelActuator::default(),
                FillUnits(vec![FillUnit::empty(capacity)]),
                Dischargeable::default(),
            ))
            .set_parent(vehicle)
            .id();
        let tip = world
            .spawn((Name::new("shovelTip"), Transform::from_xyz(0.0, 0.0, 0.8)))
            .set_parent(shovel)
            .id();
        world.entity_mut(shovel).insert(Shovel {
            node: tip,
            fill_unit_index: 0,
        });
        if let Err(e) = attach_implement(world, vehicle, shovel) {
            panic!("attaching the shovel failed: {e}");
        }
        LoaderHandles {
            vehicle,
            shovel,
            tip,
        }
    }

    /// A trailed implement linked behind `vehicle`, its centre `distance`
    /// metres behind the root.
    pub fn attach_trailer(&mut self, vehicle: Entity, distance: f32, length: f32) -> Entity {
        let world = self.world_mut();
        let trailer = world
            .spawn((
                Name::new("trailer"),
                Implement {
                    size: VehicleSize::new(length, 2.5),
                    side: AttachSide::Back,
                },
                Transform::from_xyz(0.0, 0.0, -distance),
            ))
            .set_parent(vehicle)
            .id();
        if let Err(e) = attach_implement(world, vehicle, trailer) {
            panic!("attaching the trailer failed: {e}");
        }
        trailer
    }

    pub fn spawn_unload_trigger(&mut self, position: Vec3, heading: f32) -> Entity {
        self.world_mut()
            .spawn((
                Name::new("unloadTrigger"),
                UnloadTarget::trigger(vec![]),
                Transform::from_translation(position).with_rotation(scene::heading_rotation(heading)),
            ))
            .id()
    }

    pub fn spawn_unload_trailer(
        &mut self,
        position: Vec3,
        heading: f32,
        accepted: Vec<FillType>,
    ) -> Entity {
        self.world_mut()
            .spawn((
                Name::new("unloadTrailer"),
                UnloadTarget::trailer(accepted),
                Transform::from_translation(position).with_rotation(scene::heading_rotation(heading)),
            ))
            .id()
    }
}
