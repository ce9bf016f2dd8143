use bevy::prelude::*;

use crate::markers::{self, BackMarkerSource, MarkerNode, MarkerSet};
use crate::scene;
use crate::test_harness::TestYard;
use crate::vehicle::detach_implement;

fn marker_set(yard: &TestYard, vehicle: Entity) -> MarkerSet {
    yard.world().get::<MarkerSet>(vehicle).unwrap().clone()
}

#[test]
fn test_attachment_change_refreshes_cached_markers() {
    let mut yard = TestYard::new();
    let loader = yard.spawn_wheel_loader(1, 1, Vec3::ZERO, 0.0, 2000.0);
    let (_, back) = markers::back_marker(yard.world_mut(), loader.vehicle).unwrap();
    assert!((back + 3.5).abs() < 1e-4);

    let trailer = yard.attach_trailer(loader.vehicle, 6.0, 4.0);
    yard.tick(1);
    let set = marker_set(&yard, loader.vehicle);
    assert_eq!(set.back_source, BackMarkerSource::RearImplement);
    assert!((set.back.offset + 8.0).abs() < 1e-4, "back = {}", set.back.offset);

    assert!(detach_implement(yard.world_mut(), loader.vehicle, trailer));
    yard.tick(1);
    let set = marker_set(&yard, loader.vehicle);
    assert_eq!(set.back_source, BackMarkerSource::VehicleLength);
    assert!((set.back.offset + 3.5).abs() < 1e-4);
}

#[test]
fn test_uncached_vehicle_is_left_alone() {
    let mut yard = TestYard::new();
    let loader = yard.spawn_wheel_loader(1, 1, Vec3::ZERO, 0.0, 2000.0);
    yard.attach_trailer(loader.vehicle, 6.0, 4.0);
    yard.tick(2);
    assert!(yard.world().get::<MarkerSet>(loader.vehicle).is_none());
}

#[test]
fn test_orphaned_marker_frames_are_despawned() {
    let mut yard = TestYard::new();
    let loader = yard.spawn_wheel_loader(1, 1, Vec3::ZERO, 0.0, 2000.0);
    let (front, back) = markers::markers(yard.world_mut(), loader.vehicle).unwrap();

    // a non-recursive despawn leaves the frames behind
    yard.world_mut().entity_mut(loader.vehicle).despawn();
    assert!(yard.world().get::<MarkerNode>(front).is_some());
    yard.update();
    assert!(!scene::node_exists(yard.world(), front));
    assert!(!scene::node_exists(yard.world(), back));
}
