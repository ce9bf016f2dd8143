//! ECS glue: keep cached markers in sync with the attachment chain and clean
//! up frames left behind by despawned vehicles.

use bevy::prelude::*;

use crate::vehicle::{AttachedImplements, Vehicle};

use super::cache::recompute_markers;
use super::types::{MarkerNode, MarkerSet};

/// Recompute markers of every cached vehicle whose attachment chain changed
/// since the last run.
pub fn refresh_markers_on_attachment_change(
    world: &mut World,
    changed: &mut QueryState<Entity, (With<MarkerSet>, Changed<AttachedImplements>)>,
) {
    let vehicles: Vec<Entity> = changed.iter(world).collect();
    for vehicle in vehicles {
        if let Err(e) = recompute_markers(world, vehicle, None) {
            warn!("marker recompute for vehicle {vehicle} failed: {e}");
        }
    }
}

/// Despawn marker frames whose owning vehicle no longer exists.
pub fn despawn_orphaned_markers(
    mut commands: Commands,
    markers: Query<(Entity, &MarkerNode)>,
    vehicles: Query<(), With<Vehicle>>,
) {
    for (node, marker) in &markers {
        if vehicles.get(marker.owner).is_err() {
            debug!("despawning orphaned marker {node} of vehicle {}", marker.owner);
            commands.entity(node).despawn_recursive();
        }
    }
}
