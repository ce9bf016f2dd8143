//! Scene-graph primitives the loader core consumes from the host engine.
//!
//! Reference frames are plain entities carrying a [`Transform`]. Parent links
//! use Bevy's hierarchy. World-space results are computed on demand by
//! walking the [`Parent`] chain, so they are valid immediately after a
//! re-link or translation change without waiting for transform propagation.
//!
//! Convention: a frame's local +Z axis is its forward (longitudinal) axis and
//! a heading angle is a rotation about +Y, so heading `a` points along
//! `(sin a, 0, cos a)` in world space.

use std::fmt;

use bevy::prelude::*;

/// Failure to create, find or re-link a scene node. Fatal for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// The node entity does not exist (never spawned or already despawned).
    MissingNode(Entity),
    /// The entity exists but carries no `Transform`, so it is not a frame.
    MissingTransform(Entity),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::MissingNode(e) => write!(f, "scene node {e} does not exist"),
            SceneError::MissingTransform(e) => write!(f, "scene node {e} has no transform"),
        }
    }
}

impl std::error::Error for SceneError {}

pub fn node_exists(world: &World, node: Entity) -> bool {
    world.entities().contains(node)
}

fn require_node(world: &World, node: Entity) -> Result<(), SceneError> {
    if node_exists(world, node) {
        Ok(())
    } else {
        Err(SceneError::MissingNode(node))
    }
}

/// Spawn a named reference frame at the identity transform, optionally
/// linked under `parent`.
pub fn create_node(
    world: &mut World,
    name: &str,
    parent: Option<Entity>,
) -> Result<Entity, SceneError> {
    if let Some(parent) = parent {
        require_node(world, parent)?;
    }
    let node = world
        .spawn((Name::new(name.to_string()), Transform::IDENTITY))
        .id();
    if let Some(parent) = parent {
        world.entity_mut(node).set_parent(parent);
    }
    Ok(node)
}

/// Despawn a node and everything linked below it. Returns `false` when the
/// node was already gone.
pub fn destroy_node(world: &mut World, node: Entity) -> bool {
    if !node_exists(world, node) {
        return false;
    }
    world.entity_mut(node).despawn_recursive();
    true
}

/// Link `node` under `parent`, keeping its local transform.
pub fn link(world: &mut World, node: Entity, parent: Entity) -> Result<(), SceneError> {
    require_node(world, node)?;
    require_node(world, parent)?;
    world.entity_mut(node).set_parent(parent);
    Ok(())
}

/// Detach `node` from its parent (no-op for root nodes).
pub fn unlink(world: &mut World, node: Entity) -> Result<(), SceneError> {
    require_node(world, node)?;
    world.entity_mut(node).remove_parent();
    Ok(())
}

pub fn parent_of(world: &World, node: Entity) -> Option<Entity> {
    world.get::<Parent>(node).map(|p| p.get())
}

pub fn set_translation(world: &mut World, node: Entity, translation: Vec3) -> Result<(), SceneError> {
    require_node(world, node)?;
    let mut transform = world
        .get_mut::<Transform>(node)
        .ok_or(SceneError::MissingTransform(node))?;
    transform.translation = translation;
    Ok(())
}

pub fn set_rotation(world: &mut World, node: Entity, rotation: Quat) -> Result<(), SceneError> {
    require_node(world, node)?;
    let mut transform = world
        .get_mut::<Transform>(node)
        .ok_or(SceneError::MissingTransform(node))?;
    transform.rotation = rotation;
    Ok(())
}

/// Compose local transforms up the parent chain.
pub fn world_transform(world: &World, node: Entity) -> Result<Transform, SceneError> {
    require_node(world, node)?;
    let mut transform = *world
        .get::<Transform>(node)
        .ok_or(SceneError::MissingTransform(node))?;
    let mut current = node;
    while let Some(parent) = parent_of(world, current) {
        let parent_transform = world
            .get::<Transform>(parent)
            .ok_or(SceneError::MissingTransform(parent))?;
        transform = parent_transform.mul_transform(transform);
        current = parent;
    }
    Ok(transform)
}

pub fn world_position(world: &World, node: Entity) -> Result<Vec3, SceneError> {
    Ok(world_transform(world, node)?.translation)
}

/// Heading of the node's forward (+Z) axis in radians, measured about +Y.
pub fn world_heading(world: &World, node: Entity) -> Result<f32, SceneError> {
    let forward = world_transform(world, node)?.rotation * Vec3::Z;
    Ok(forward.x.atan2(forward.z))
}

pub fn local_to_world(world: &World, node: Entity, local: Vec3) -> Result<Vec3, SceneError> {
    Ok(world_transform(world, node)?.transform_point(local))
}

pub fn world_to_local(world: &World, node: Entity, point: Vec3) -> Result<Vec3, SceneError> {
    let affine = world_transform(world, node)?.compute_affine();
    Ok(affine.inverse().transform_point3(point))
}

/// Express a point given in `from`'s frame in `to`'s frame.
pub fn local_to_local(
    world: &World,
    from: Entity,
    to: Entity,
    local: Vec3,
) -> Result<Vec3, SceneError> {
    let point = local_to_world(world, from, local)?;
    world_to_local(world, to, point)
}

/// Rotation about +Y for a heading angle.
pub fn heading_rotation(angle: f32) -> Quat {
    Quat::from_rotation_y(angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_heading_points_along_sin_cos() {
        let mut world = World::new();
        let node = create_node(&mut world, "probe", None).unwrap();
        set_rotation(&mut world, node, heading_rotation(FRAC_PI_2)).unwrap();
        let p = local_to_world(&world, node, Vec3::new(0.0, 0.0, 1.0)).unwrap();
        assert!(approx(p, Vec3::new(1.0, 0.0, 0.0)), "got {p:?}");
        assert!((world_heading(&world, node).unwrap() - FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn test_child_composes_with_parent() {
        let mut world = World::new();
        let root = create_node(&mut world, "root", None).unwrap();
        set_translation(&mut world, root, Vec3::new(10.0, 0.0, 5.0)).unwrap();
        set_rotation(&mut world, root, heading_rotation(PI)).unwrap();
        let child = create_node(&mut world, "child", Some(root)).unwrap();
        set_translation(&mut world, child, Vec3::new(0.0, 0.0, 2.0)).unwrap();

        let p = world_position(&world, child).unwrap();
        assert!(approx(p, Vec3::new(10.0, 0.0, 3.0)), "got {p:?}");
        let back = world_to_local(&world, root, p).unwrap();
        assert!(approx(back, Vec3::new(0.0, 0.0, 2.0)), "got {back:?}");
    }

    #[test]
    fn test_relink_moves_child_with_new_parent() {
        let mut world = World::new();
        let a = create_node(&mut world, "a", None).unwrap();
        let b = create_node(&mut world, "b", None).unwrap();
        set_translation(&mut world, b, Vec3::new(0.0, 0.0, 100.0)).unwrap();
        let child = create_node(&mut world, "child", Some(a)).unwrap();

        unlink(&mut world, child).unwrap();
        assert_eq!(parent_of(&world, child), None);
        link(&mut world, child, b).unwrap();
        assert_eq!(parent_of(&world, child), Some(b));
        assert!(approx(
            world_position(&world, child).unwrap(),
            Vec3::new(0.0, 0.0, 100.0)
        ));
    }

    #[test]
    fn test_missing_parent_is_an_error() {
        let mut world = World::new();
        let gone = world.spawn_empty().id();
        world.despawn(gone);
        assert_eq!(
            create_node(&mut world, "orphan", Some(gone)),
            Err(SceneError::MissingNode(gone))
        );
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut world = World::new();
        let node = create_node(&mut world, "n", None).unwrap();
        let child = create_node(&mut world, "c", Some(node)).unwrap();
        assert!(destroy_node(&mut world, node));
        assert!(!node_exists(&world, child));
        assert!(!destroy_node(&mut world, node));
    }
}
