use std::f32::consts::PI;

use bevy::prelude::*;

use crate::fill::FillType;
use crate::job::{
    start_job, stop_job, JobError, JobParameters, PositionAngle, SiloLoaderJob, SiloLoaderJobs,
    UnloadMode,
};
use crate::markers::MarkerSet;
use crate::shovel::ShovelActuator;
use crate::site::MaterialMap;
use crate::test_harness::{LoaderHandles, TestYard};

fn probe_count(world: &mut World) -> usize {
    let mut query = world.query::<&Name>();
    query
        .iter(world)
        .filter(|name| name.as_str() == "siteDetectionProbe")
        .count()
}

fn finished(vehicle: Entity) -> impl FnMut(&mut World) -> bool {
    move |world| !world.resource::<SiloLoaderJobs>().is_running(vehicle)
}

fn start(yard: &mut TestYard, loader: LoaderHandles, parameters: JobParameters) -> Result<Entity, JobError> {
    let world = yard.world_mut();
    let mut job = SiloLoaderJob::new(world)?;
    job.apply_current_state(world, loader.vehicle)?;
    job.set_parameters(parameters);
    start_job(world, job, 1)
}

/// Loader at z = -2 facing +Z; its shovel tip reaches z = 2.8, right where
/// the unload targets are placed, so every cycle completes in place.
fn bunker_yard(litres: f32) -> (TestYard, Entity, LoaderHandles) {
    let mut yard = TestYard::new();
    let bunker = yard.spawn_bunker(
        Vec2::new(8.0, 0.0),
        Vec2::new(12.0, 10.0),
        FillType::Silage,
        litres,
    );
    let loader = yard.spawn_wheel_loader(1, 1, Vec3::new(10.0, 0.0, -2.0), 0.0, 2000.0);
    (yard, bunker, loader)
}

#[test]
fn test_direct_dig_empties_bunker_into_trailer() {
    let (mut yard, bunker, loader) = bunker_yard(20_000.0);
    let trailer = yard.spawn_unload_trailer(Vec3::new(10.0, 0.0, 3.0), PI, vec![FillType::Silage]);

    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        ..Default::default()
    };
    assert_eq!(start(&mut yard, loader, params), Ok(loader.vehicle));
    yard.assert_job_running(loader.vehicle);

    let ticks = yard.tick_until(5_000, finished(loader.vehicle));
    assert!(ticks.is_some(), "job never finished");
    yard.assert_no_job(loader.vehicle);

    assert_eq!(yard.bunker_level(bunker), 0.0);
    yard.assert_received_between(trailer, 19_900.0, 20_000.0);
    assert_eq!(probe_count(yard.world_mut()), 0);

    // parked at transport height with the actuator released
    let actuator = yard.world().get::<ShovelActuator>(loader.shovel).unwrap();
    assert_eq!(actuator.target, None);
    assert!((actuator.arm_height - 0.5).abs() < 1e-3);
}

#[test]
fn test_unload_at_trigger_delivers_every_load() {
    let (mut yard, bunker, loader) = bunker_yard(6_000.0);
    let trigger = yard.spawn_unload_trigger(Vec3::new(10.0, 0.0, 3.0), PI);
    // a trailer right there too, which trigger mode must ignore
    let trailer = yard.spawn_unload_trailer(Vec3::new(10.0, 0.0, 3.5), PI, vec![]);

    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        unload: PositionAngle::new(10.0, 3.0, PI),
        unload_mode: UnloadMode::UnloadAtTrigger,
    };
    start(&mut yard, loader, params).unwrap();
    assert!(yard.tick_until(5_000, finished(loader.vehicle)).is_some());

    assert_eq!(yard.bunker_level(bunker), 0.0);
    yard.assert_received_between(trigger, 5_900.0, 6_000.0);
    assert_eq!(yard.received(trailer), 0.0);
}

#[test]
fn test_direct_dig_waits_without_trailer() {
    let (mut yard, bunker, loader) = bunker_yard(20_000.0);
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        ..Default::default()
    };
    start(&mut yard, loader, params).unwrap();

    yard.tick(200);
    yard.assert_job_running(loader.vehicle);
    // one full shovel taken, then holding it until a trailer shows up
    assert_eq!(yard.bunker_level(bunker), 18_000.0);
    assert_eq!(yard.shovel_level(loader.shovel), 2_000.0);

    let trailer = yard.spawn_unload_trailer(Vec3::new(10.0, 0.0, 3.0), PI, vec![]);
    yard.tick(200);
    assert!(yard.received(trailer) >= 2_000.0);
}

#[test]
fn test_heap_is_dug_away() {
    let mut yard = TestYard::new().with_heap(Vec2::new(10.0, 20.0), 3.0, 1.5, FillType::Chaff, 11);
    let loader = yard.spawn_wheel_loader(1, 1, Vec3::new(10.0, 0.0, 12.0), 0.0, 2000.0);
    let trailer = yard.spawn_unload_trailer(Vec3::new(10.0, 0.0, 17.0), PI, vec![FillType::Chaff]);

    let world = yard.world_mut();
    let mut job = SiloLoaderJob::new(world).unwrap();
    job.apply_current_state(world, loader.vehicle).unwrap();
    job.validate(world, 1).unwrap();
    let area = *job.bunker_silo_or_heap().area().unwrap();
    let before = world.resource::<MaterialMap>().volume_in(&area);
    assert!(before > 1.0);
    start_job(world, job, 1).unwrap();

    assert!(yard.tick_until(20_000, finished(loader.vehicle)).is_some());
    let after = yard.resource::<MaterialMap>().volume_in(&area);
    assert!(after < 0.5, "heap left with {after} m³");
    let received = yard.received(trailer);
    assert!(
        (received / 1000.0 - (before - after)).abs() < 0.1,
        "received {received} l of {before} m³"
    );
}

#[test]
fn test_invalid_job_is_not_started_and_leaks_nothing() {
    let (mut yard, _, loader) = bunker_yard(20_000.0);
    let params = JobParameters {
        load: PositionAngle::new(-50.0, -50.0, 0.0),
        ..Default::default()
    };
    assert_eq!(
        start(&mut yard, loader, params),
        Err(JobError::NoHeapOrBunkerFound)
    );
    yard.assert_no_job(loader.vehicle);
    assert_eq!(probe_count(yard.world_mut()), 0);
}

#[test]
fn test_stop_job_parks_shovel() {
    let (mut yard, _, loader) = bunker_yard(20_000.0);
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        ..Default::default()
    };
    start(&mut yard, loader, params).unwrap();
    yard.tick(3);
    assert!(yard
        .world()
        .get::<ShovelActuator>(loader.shovel)
        .unwrap()
        .target
        .is_some());

    assert!(stop_job(yard.world_mut(), loader.vehicle));
    assert!(!stop_job(yard.world_mut(), loader.vehicle));
    assert_eq!(
        yard.world().get::<ShovelActuator>(loader.shovel).unwrap().target,
        None
    );
    assert_eq!(probe_count(yard.world_mut()), 0);
}

#[test]
fn test_job_dropped_with_its_vehicle() {
    let (mut yard, _, loader) = bunker_yard(20_000.0);
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        ..Default::default()
    };
    start(&mut yard, loader, params).unwrap();
    yard.tick(10);

    yard.world_mut().entity_mut(loader.vehicle).despawn_recursive();
    yard.tick(1);
    yard.assert_no_job(loader.vehicle);
    assert_eq!(probe_count(yard.world_mut()), 0);
}

#[test]
fn test_restarting_replaces_running_job() {
    let (mut yard, _, loader) = bunker_yard(20_000.0);
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        ..Default::default()
    };
    start(&mut yard, loader, params).unwrap();
    start(&mut yard, loader, params).unwrap();
    assert_eq!(yard.jobs().len(), 1);
    assert_eq!(probe_count(yard.world_mut()), 1);
}

#[test]
fn test_markers_built_only_when_searching_for_trailer() {
    let (mut yard, _, loader) = bunker_yard(20_000.0);
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        ..Default::default()
    };
    start(&mut yard, loader, params).unwrap();
    assert!(yard.world().get::<MarkerSet>(loader.vehicle).is_none());

    // the first load is carried to transport height, then a trailer is looked for
    yard.tick(60);
    assert!(yard.world().get::<MarkerSet>(loader.vehicle).is_some());
}
