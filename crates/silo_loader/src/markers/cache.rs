//! Marker derivation and the per-vehicle lazy cache.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::scene::{self, SceneError};
use crate::vehicle::{implement_extent, AttachSide, AttachedImplements, Implement, Vehicle};

use super::types::{BackMarkerSource, DirectionalMarkers, MarkerFrame, MarkerNode, MarkerSet};

fn vehicle_of(world: &World, vehicle: Entity) -> Result<Vehicle, SceneError> {
    world
        .get::<Vehicle>(vehicle)
        .cloned()
        .ok_or(SceneError::MissingNode(vehicle))
}

fn attached_on_side(world: &World, vehicle: Entity, side: AttachSide) -> Vec<Entity> {
    world
        .get::<AttachedImplements>(vehicle)
        .map(|attached| {
            attached
                .0
                .iter()
                .copied()
                .filter(|&e| world.get::<Implement>(e).is_some_and(|i| i.side == side))
                .collect()
        })
        .unwrap_or_default()
}

/// Back marker offset from the vehicle root, by rule priority.
pub(crate) fn derive_back_offset(
    world: &World,
    vehicle: Entity,
    measured_back_distance: Option<f32>,
) -> Result<(f32, BackMarkerSource), SceneError> {
    let data = vehicle_of(world, vehicle)?;

    let rear = attached_on_side(world, vehicle, AttachSide::Back);
    if !rear.is_empty() {
        let mut trailing = f32::INFINITY;
        for implement in rear {
            let (rear_edge, _) = implement_extent(world, vehicle, implement)?;
            trailing = trailing.min(rear_edge);
        }
        return Ok((trailing, BackMarkerSource::RearImplement));
    }

    if let Some(distance) = measured_back_distance {
        return Ok((-distance, BackMarkerSource::Measured));
    }

    let half_length = data.size.length / 2.0;
    if let Some(reverser) = data.reverser_node {
        let local = scene::local_to_local(world, reverser, vehicle, Vec3::ZERO)?;
        let planar = Vec2::new(local.x, local.z).length();
        return Ok((
            -planar - half_length + data.size.length_offset,
            BackMarkerSource::Reverser,
        ));
    }

    Ok((
        -half_length + data.size.length_offset,
        BackMarkerSource::VehicleLength,
    ))
}

/// Front marker offset: front edge of the outermost front implement, or 0.
pub(crate) fn derive_front_offset(world: &World, vehicle: Entity) -> Result<f32, SceneError> {
    let mut offset = 0.0f32;
    for implement in attached_on_side(world, vehicle, AttachSide::Front) {
        let (_, front_edge) = implement_extent(world, vehicle, implement)?;
        offset = offset.max(front_edge);
    }
    Ok(offset)
}

fn create_marker_frame(
    world: &mut World,
    vehicle: Entity,
    name: &str,
) -> Result<MarkerFrame, SceneError> {
    let node = scene::create_node(world, name, Some(vehicle))?;
    world.entity_mut(node).insert(MarkerNode { owner: vehicle });
    let inverted = scene::create_node(world, &format!("{name}Inverted"), Some(node))?;
    scene::set_rotation(world, inverted, Quat::from_rotation_y(PI))?;
    Ok(MarkerFrame {
        node,
        inverted,
        offset: 0.0,
    })
}

/// Unlink, relink under `reference`, then reposition. The inverted twin is a
/// child of the normal frame and follows it.
fn place_marker(
    world: &mut World,
    frame: &mut MarkerFrame,
    reference: Entity,
    offset: f32,
) -> Result<(), SceneError> {
    scene::unlink(world, frame.node)?;
    scene::link(world, frame.node, reference)?;
    scene::set_rotation(world, frame.node, Quat::IDENTITY)?;
    scene::set_translation(world, frame.node, Vec3::new(0.0, 0.0, offset))?;
    frame.offset = offset;
    Ok(())
}

fn frames_intact(world: &World, set: &MarkerSet) -> bool {
    scene::node_exists(world, set.front.node) && scene::node_exists(world, set.back.node)
}

/// Re-derive both markers for the vehicle, creating the frames if needed.
///
/// `measured_back_distance` only applies to this recompute; `None` falls
/// through to the reverser and vehicle length rules.
pub fn recompute_markers(
    world: &mut World,
    vehicle: Entity,
    measured_back_distance: Option<f32>,
) -> Result<MarkerSet, SceneError> {
    vehicle_of(world, vehicle)?;
    let existing = world.get::<MarkerSet>(vehicle).cloned();

    let intact = existing.as_ref().is_some_and(|set| frames_intact(world, set));
    let (mut front, mut back) = match existing {
        Some(set) if intact => (set.front, set.back),
        stale => {
            if let Some(set) = stale {
                scene::destroy_node(world, set.front.node);
                scene::destroy_node(world, set.back.node);
            }
            (
                create_marker_frame(world, vehicle, "frontMarker")?,
                create_marker_frame(world, vehicle, "backMarker")?,
            )
        }
    };

    let front_offset = derive_front_offset(world, vehicle)?;
    let (back_offset, back_source) = derive_back_offset(world, vehicle, measured_back_distance)?;

    let reference = vehicle;
    place_marker(world, &mut front, reference, front_offset)?;
    place_marker(world, &mut back, reference, back_offset)?;

    let set = MarkerSet {
        front,
        back,
        reference,
        measured_back_distance,
        back_source,
    };
    world.entity_mut(vehicle).insert(set.clone());
    debug!(
        "markers for vehicle {vehicle}: front {:.2}, back {:.2} ({:?})",
        front_offset, back_offset, back_source
    );
    Ok(set)
}

fn ensure_markers(world: &mut World, vehicle: Entity) -> Result<MarkerSet, SceneError> {
    match world.get::<MarkerSet>(vehicle) {
        Some(set) if frames_intact(world, set) => Ok(set.clone()),
        _ => recompute_markers(world, vehicle, None),
    }
}

pub fn front_marker(world: &mut World, vehicle: Entity) -> Result<(Entity, f32), SceneError> {
    let set = ensure_markers(world, vehicle)?;
    Ok((set.front.node, set.front.offset))
}

pub fn back_marker(world: &mut World, vehicle: Entity) -> Result<(Entity, f32), SceneError> {
    let set = ensure_markers(world, vehicle)?;
    Ok((set.back.node, set.back.offset))
}

/// `(front, back)` marker frames.
pub fn markers(world: &mut World, vehicle: Entity) -> Result<(Entity, Entity), SceneError> {
    let set = ensure_markers(world, vehicle)?;
    Ok((set.front.node, set.back.node))
}

/// Markers along the effective travel direction. When the back marker lies
/// ahead of the direction frame the vehicle is driven reversed: the inverted
/// frames are returned swapped, with swapped, sign-flipped offsets.
pub fn markers_relative_to_direction(
    world: &mut World,
    vehicle: Entity,
) -> Result<DirectionalMarkers, SceneError> {
    let set = ensure_markers(world, vehicle)?;
    let direction = vehicle_of(world, vehicle)?
        .direction_node
        .unwrap_or(vehicle);
    let projected = scene::local_to_local(world, set.back.node, direction, Vec3::ZERO)?;

    if projected.z > 0.0 {
        Ok(DirectionalMarkers {
            front: set.back.inverted,
            back: set.front.inverted,
            front_offset: -set.back.offset,
            back_offset: -set.front.offset,
            reversed: true,
        })
    } else {
        Ok(DirectionalMarkers {
            front: set.front.node,
            back: set.back.node,
            front_offset: set.front.offset,
            back_offset: set.back.offset,
            reversed: false,
        })
    }
}

/// Despawn the vehicle's marker frames and drop the cached set. Safe to call
/// repeatedly and after the vehicle itself is gone.
pub fn release_markers(world: &mut World, vehicle: Entity) -> bool {
    if !scene::node_exists(world, vehicle) {
        return false;
    }
    let Some(set) = world.entity_mut(vehicle).take::<MarkerSet>() else {
        return false;
    };
    scene::destroy_node(world, set.front.node);
    scene::destroy_node(world, set.back.node);
    debug!("released markers of vehicle {vehicle}");
    true
}
