//! Places a shovel can discharge into: fixed unload triggers (e.g. a feed
//! mixer hopper) and trailers parked next to the site.

use bevy::prelude::*;

use crate::fill::FillType;
use crate::scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadTargetKind {
    Trigger,
    Trailer,
}

/// The target's own transform is its unload frame. Its +Z axis points back
/// toward an approaching shovel, so the shovel is over the target once its
/// local Z in this frame drops below the margin.
#[derive(Component, Debug, Clone)]
pub struct UnloadTarget {
    pub kind: UnloadTargetKind,
    /// Empty accepts anything.
    pub accepted: Vec<FillType>,
    /// Unreachable targets (blocked, wrong farm, full) are skipped by searches.
    pub reachable: bool,
    /// Litres received so far.
    pub received: f32,
}

impl UnloadTarget {
    pub fn trigger(accepted: Vec<FillType>) -> Self {
        Self {
            kind: UnloadTargetKind::Trigger,
            accepted,
            reachable: true,
            received: 0.0,
        }
    }

    pub fn trailer(accepted: Vec<FillType>) -> Self {
        Self {
            kind: UnloadTargetKind::Trailer,
            ..Self::trigger(accepted)
        }
    }

    /// `None` means the fill type is not known yet, which any target accepts.
    pub fn accepts(&self, fill_type: Option<FillType>) -> bool {
        match fill_type {
            None => true,
            Some(fill_type) => self.accepted.is_empty() || self.accepted.contains(&fill_type),
        }
    }
}

fn planar(point: Vec3) -> Vec2 {
    Vec2::new(point.x, point.z)
}

fn nearest_target(
    world: &mut World,
    origin: Vec2,
    radius: f32,
    matches: impl Fn(&UnloadTarget) -> bool,
) -> Option<Entity> {
    let mut query = world.query::<(Entity, &UnloadTarget)>();
    let candidates: Vec<Entity> = query
        .iter(world)
        .filter(|(_, target)| target.reachable && matches(target))
        .map(|(entity, _)| entity)
        .collect();

    candidates
        .into_iter()
        .filter_map(|entity| {
            let position = scene::world_position(world, entity).ok()?;
            let distance = planar(position).distance(origin);
            (distance <= radius).then_some((entity, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(entity, _)| entity)
}

/// Nearest reachable unload trigger within `radius` of `origin` (world XZ).
pub fn find_unload_trigger(world: &mut World, origin: Vec2, radius: f32) -> Option<Entity> {
    nearest_target(world, origin, radius, |t| t.kind == UnloadTargetKind::Trigger)
}

/// Nearest reachable trailer within `radius` of `origin` taking `fill_type`.
pub fn find_trailer(
    world: &mut World,
    origin: Vec2,
    radius: f32,
    fill_type: Option<FillType>,
) -> Option<Entity> {
    nearest_target(world, origin, radius, |t| {
        t.kind == UnloadTargetKind::Trailer && t.accepts(fill_type)
    })
}

/// Planar distance from a scene node to an unload target.
pub fn distance_to_target(world: &World, node: Entity, target: Entity) -> Option<f32> {
    let a = scene::world_position(world, node).ok()?;
    let b = scene::world_position(world, target).ok()?;
    Some(planar(a).distance(planar(b)))
}
