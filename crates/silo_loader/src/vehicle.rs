//! Composite vehicle model: a root vehicle plus its chain of attached
//! implements. Capabilities are expressed as components on the implement
//! entity (`Shovel`, [`Dischargeable`](crate::fill::Dischargeable)).

use bevy::prelude::*;

use crate::scene::{self, SceneError};

/// Bounding size along the longitudinal axis. `length_offset` shifts the box
/// centre forward of the root frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSize {
    pub length: f32,
    pub length_offset: f32,
    pub width: f32,
}

impl VehicleSize {
    pub fn new(length: f32, width: f32) -> Self {
        Self {
            length,
            length_offset: 0.0,
            width,
        }
    }

    pub fn with_length_offset(mut self, length_offset: f32) -> Self {
        self.length_offset = length_offset;
        self
    }
}

/// The root of a composite vehicle. The entity's own transform is the root
/// frame.
#[derive(Component, Debug, Clone)]
pub struct Vehicle {
    /// Stable id used to key persisted per-vehicle data.
    pub id: u32,
    pub farm_id: u8,
    pub size: VehicleSize,
    /// Frame pointing along the effective travel direction. Differs from the
    /// root when the cab is mounted reversed.
    pub direction_node: Option<Entity>,
    /// Reverse-driving reference frame of articulated or cab-reversed vehicles.
    pub reverser_node: Option<Entity>,
}

impl Vehicle {
    pub fn new(id: u32, farm_id: u8, size: VehicleSize) -> Self {
        Self {
            id,
            farm_id,
            size,
            direction_node: None,
            reverser_node: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachSide {
    Front,
    Back,
}

#[derive(Component, Debug, Clone)]
pub struct Implement {
    pub size: VehicleSize,
    pub side: AttachSide,
}

/// Ordered attachment chain of a vehicle, nearest implement first.
#[derive(Component, Debug, Clone, Default)]
pub struct AttachedImplements(pub Vec<Entity>);

/// Capability: a shovel with one canonical reference point.
#[derive(Component, Debug, Clone)]
pub struct Shovel {
    /// Reference frame at the shovel tip, linked under the implement.
    pub node: Entity,
    pub fill_unit_index: usize,
}

/// Append `implement` to the vehicle's attachment chain.
pub fn attach_implement(
    world: &mut World,
    vehicle: Entity,
    implement: Entity,
) -> Result<(), SceneError> {
    if !scene::node_exists(world, implement) {
        return Err(SceneError::MissingNode(implement));
    }
    if !scene::node_exists(world, vehicle) {
        return Err(SceneError::MissingNode(vehicle));
    }
    match world.get_mut::<AttachedImplements>(vehicle) {
        Some(mut attached) => {
            if !attached.0.contains(&implement) {
                attached.0.push(implement);
            }
        }
        None => {
            world
                .entity_mut(vehicle)
                .insert(AttachedImplements(vec![implement]));
        }
    }
    debug!("attached implement {implement} to vehicle {vehicle}");
    Ok(())
}

/// Remove `implement` from the chain. Returns whether it was attached.
pub fn detach_implement(world: &mut World, vehicle: Entity, implement: Entity) -> bool {
    let Some(mut attached) = world.get_mut::<AttachedImplements>(vehicle) else {
        return false;
    };
    let before = attached.0.len();
    attached.0.retain(|&e| e != implement);
    let removed = attached.0.len() != before;
    if removed {
        debug!("detached implement {implement} from vehicle {vehicle}");
    }
    removed
}

/// The vehicle itself followed by its attached implements.
pub fn composite_chain(world: &World, vehicle: Entity) -> Vec<Entity> {
    let mut chain = vec![vehicle];
    if let Some(attached) = world.get::<AttachedImplements>(vehicle) {
        chain.extend(attached.0.iter().copied());
    }
    chain
}

/// First unit of the composite (the vehicle included) with a shovel.
pub fn find_shovel_implement(world: &World, vehicle: Entity) -> Option<Entity> {
    composite_chain(world, vehicle)
        .into_iter()
        .find(|&e| world.get::<Shovel>(e).is_some())
}

/// A vehicle can run the silo-loader job when any unit carries a shovel.
pub fn supports_silo_loader(world: &World, vehicle: Entity) -> bool {
    world.get::<Vehicle>(vehicle).is_some() && find_shovel_implement(world, vehicle).is_some()
}

/// Longitudinal extent of an attached implement in the vehicle root frame,
/// as `(rear_edge, front_edge)`.
pub fn implement_extent(
    world: &World,
    vehicle: Entity,
    implement: Entity,
) -> Result<(f32, f32), SceneError> {
    let size = world
        .get::<Implement>(implement)
        .map(|i| i.size)
        .ok_or(SceneError::MissingNode(implement))?;
    let origin = scene::world_position(world, implement)?;
    let z = scene::world_to_local(world, vehicle, origin)?.z + size.length_offset;
    Ok((z - size.length / 2.0, z + size.length / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_vehicle(world: &mut World) -> Entity {
        world
            .spawn((
                Vehicle::new(1, 1, VehicleSize::new(6.0, 3.0)),
                Transform::IDENTITY,
            ))
            .id()
    }

    fn spawn_implement(world: &mut World, z: f32, length: f32, side: AttachSide) -> Entity {
        world
            .spawn((
                Implement {
                    size: VehicleSize::new(length, 3.0),
                    side,
                },
                Transform::from_xyz(0.0, 0.0, z),
            ))
            .id()
    }

    #[test]
    fn test_attach_detach_chain() {
        let mut world = World::new();
        let vehicle = spawn_vehicle(&mut world);
        let a = spawn_implement(&mut world, -5.0, 4.0, AttachSide::Back);
        let b = spawn_implement(&mut world, -10.0, 4.0, AttachSide::Back);

        attach_implement(&mut world, vehicle, a).unwrap();
        attach_implement(&mut world, vehicle, b).unwrap();
        attach_implement(&mut world, vehicle, a).unwrap();
        assert_eq!(composite_chain(&world, vehicle), vec![vehicle, a, b]);

        assert!(detach_implement(&mut world, vehicle, a));
        assert!(!detach_implement(&mut world, vehicle, a));
        assert_eq!(composite_chain(&world, vehicle), vec![vehicle, b]);
    }

    #[test]
    fn test_implement_extent_in_root_frame() {
        let mut world = World::new();
        let vehicle = spawn_vehicle(&mut world);
        let trailer = spawn_implement(&mut world, -7.0, 4.0, AttachSide::Back);
        let (rear, front) = implement_extent(&world, vehicle, trailer).unwrap();
        assert!((rear + 9.0).abs() < 1e-4);
        assert!((front + 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_silo_loader_support_requires_shovel() {
        let mut world = World::new();
        let vehicle = spawn_vehicle(&mut world);
        assert!(!supports_silo_loader(&world, vehicle));

        let implement = spawn_implement(&mut world, 4.0, 2.0, AttachSide::Front);
        let tip = world.spawn(Transform::IDENTITY).id();
        world.entity_mut(implement).insert(Shovel {
            node: tip,
            fill_unit_index: 0,
        });
        attach_implement(&mut world, vehicle, implement).unwrap();
        assert!(supports_silo_loader(&world, vehicle));
        assert_eq!(find_shovel_implement(&world, vehicle), Some(implement));
    }
}
