use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use crate::fill::{Dischargeable, FillType};
use crate::persistence::{decode_or_warn, Saveable};
use crate::site::SiteDetection;
use crate::test_harness::{LoaderHandles, TestYard};
use crate::vehicle::{Vehicle, VehicleSize};

use super::*;

fn yard_with_bunker() -> (TestYard, Entity, LoaderHandles) {
    let mut yard = TestYard::new();
    let bunker = yard.spawn_bunker(
        Vec2::new(8.0, 0.0),
        Vec2::new(12.0, 10.0),
        FillType::Silage,
        20_000.0,
    );
    let loader = yard.spawn_wheel_loader(3, 1, Vec3::new(10.0, 0.0, -2.0), 0.0, 2000.0);
    (yard, bunker, loader)
}

fn configured_job(yard: &mut TestYard, vehicle: Entity, parameters: JobParameters) -> SiloLoaderJob {
    let world = yard.world_mut();
    let mut job = SiloLoaderJob::new(world).unwrap();
    job.apply_current_state(world, vehicle).unwrap();
    job.set_parameters(parameters);
    job
}

fn probe_count(world: &mut World) -> usize {
    let mut query = world.query::<&Name>();
    query
        .iter(world)
        .filter(|name| name.as_str() == "siteDetectionProbe")
        .count()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_validate_finds_bunker_at_load_position() {
    let (mut yard, bunker, loader) = yard_with_bunker();
    let mut job = configured_job(
        &mut yard,
        loader.vehicle,
        JobParameters {
            load: PositionAngle::new(10.0, 5.0, 0.0),
            ..default()
        },
    );
    assert!(!job.can_start_job());

    job.validate(yard.world_mut(), 1).unwrap();
    assert!(job.can_start_job());
    assert_eq!(job.state(), JobState::Valid);
    match job.bunker_silo_or_heap() {
        SiteDetection::Bunker { entity, .. } => assert_eq!(*entity, bunker),
        other => panic!("expected bunker, got {other:?}"),
    }
    // the site reaches the load cycle
    let cycle = job.tasks()[0].as_load_cycle().unwrap();
    assert!(cycle.site().bunker().is_some());
}

#[test]
fn test_validate_with_undefined_load_position() {
    let (mut yard, _, loader) = yard_with_bunker();
    let mut job = configured_job(&mut yard, loader.vehicle, JobParameters::default());

    let result = job.validate(yard.world_mut(), 1);
    assert_eq!(result, Err(JobError::NoHeapOrBunkerFound));
    assert!(!job.can_start_job());
    assert_eq!(job.state(), JobState::Invalid);
    assert_eq!(*job.bunker_silo_or_heap(), SiteDetection::NotFound);
}

#[test]
fn test_failed_validate_discards_previous_site() {
    let (mut yard, _, loader) = yard_with_bunker();
    let mut job = configured_job(
        &mut yard,
        loader.vehicle,
        JobParameters {
            load: PositionAngle::new(10.0, 5.0, 0.0),
            ..default()
        },
    );
    job.validate(yard.world_mut(), 1).unwrap();
    assert!(job.bunker_silo_or_heap().found());

    job.set_parameters(JobParameters {
        load: PositionAngle::new(200.0, 200.0, 0.0),
        ..default()
    });
    assert_eq!(
        job.validate(yard.world_mut(), 1),
        Err(JobError::NoHeapOrBunkerFound)
    );
    assert!(!job.bunker_silo_or_heap().found());
    assert!(!job.can_start_job());
}

#[test]
fn test_validate_rejects_vehicle_problems() {
    let (mut yard, _, loader) = yard_with_bunker();
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        ..default()
    };

    let mut unbound = SiloLoaderJob::new(yard.world_mut()).unwrap();
    assert_eq!(unbound.validate(yard.world_mut(), 1), Err(JobError::NoVehicle));

    let mut job = configured_job(&mut yard, loader.vehicle, params);
    assert_eq!(job.validate(yard.world_mut(), 2), Err(JobError::WrongFarm));

    let tractor = yard
        .world_mut()
        .spawn((
            Vehicle::new(9, 1, VehicleSize::new(4.0, 2.5)),
            Transform::from_xyz(10.0, 0.0, -2.0),
        ))
        .id();
    let mut job = configured_job(&mut yard, tractor, params);
    assert_eq!(
        job.validate(yard.world_mut(), 1),
        Err(JobError::VehicleNotSupported)
    );

    yard.world_mut().entity_mut(loader.vehicle).despawn_recursive();
    let mut job = SiloLoaderJob::new(yard.world_mut()).unwrap();
    assert_eq!(
        job.apply_current_state(yard.world_mut(), loader.vehicle),
        Err(JobError::NoVehicle)
    );
}

#[test]
fn test_trigger_mode_requires_trigger() {
    let (mut yard, _, loader) = yard_with_bunker();
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        unload: PositionAngle::new(40.0, 0.0, 0.0),
        unload_mode: UnloadMode::UnloadAtTrigger,
    };
    let mut job = configured_job(&mut yard, loader.vehicle, params);
    assert_eq!(
        job.validate(yard.world_mut(), 1),
        Err(JobError::NoUnloadTriggerFound)
    );
    assert!(!job.can_start_job());

    let trigger = yard.spawn_unload_trigger(Vec3::new(43.0, 0.0, 2.0), 0.0);
    job.validate(yard.world_mut(), 1).unwrap();
    assert_eq!(job.unload_trigger(), Some(trigger));
    assert!(job.can_start_job());
}

#[test]
fn test_unload_mode_needs_dischargeable_shovel() {
    let (mut yard, _, loader) = yard_with_bunker();
    yard.world_mut()
        .entity_mut(loader.shovel)
        .remove::<Dischargeable>();
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        unload: PositionAngle::new(40.0, 0.0, 0.0),
        unload_mode: UnloadMode::UnloadAtTrigger,
    };
    let mut job = configured_job(&mut yard, loader.vehicle, params);

    // no trigger needed: the mode falls back to direct digging
    job.validate(yard.world_mut(), 1).unwrap();
    let applicable = job.applicable_parameters();
    assert!(!applicable.unload_mode);
    assert!(!applicable.unload_position);
    assert_eq!(applicable.effective_mode(job.parameters()), UnloadMode::DirectDig);
    assert_eq!(job.unload_trigger(), None);
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[test]
fn test_apply_current_state_defaults_to_vehicle_pose() {
    let mut yard = TestYard::new();
    let loader = yard.spawn_wheel_loader(4, 1, Vec3::new(5.0, 0.0, 7.0), FRAC_PI_2, 2000.0);
    let world = yard.world_mut();
    let mut job = SiloLoaderJob::new(world).unwrap();
    job.apply_current_state(world, loader.vehicle).unwrap();

    let load = job.parameters().load;
    assert_eq!(load.x, Some(5.0));
    assert_eq!(load.z, Some(7.0));
    assert!((load.angle.unwrap() - FRAC_PI_2).abs() < 1e-4);
    assert_eq!(job.parameters().unload.x, Some(5.0));
    assert_eq!(job.vehicle(), Some(loader.vehicle));
}

#[test]
fn test_set_values_records_last_used_parameters() {
    let (mut yard, _, loader) = yard_with_bunker();
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        ..default()
    };
    let mut job = configured_job(&mut yard, loader.vehicle, params);
    job.set_values(yard.world_mut(), loader.vehicle).unwrap();
    assert!(job.can_start_job());
    assert_eq!(yard.resource::<JobParameterStore>().get(3), Some(&params));

    // a fresh job for the same vehicle starts from them; the unload position
    // was never set, so it defaults to where the vehicle stands
    let world = yard.world_mut();
    let mut next = SiloLoaderJob::new(world).unwrap();
    next.apply_current_state(world, loader.vehicle).unwrap();
    assert_eq!(next.parameters().load, params.load);
    assert_eq!(next.parameters().unload, PositionAngle::new(10.0, -2.0, 0.0));
    assert_eq!(next.parameters().unload_mode, params.unload_mode);
}

#[test]
fn test_set_values_without_site_fails() {
    let (mut yard, _, loader) = yard_with_bunker();
    let mut job = configured_job(
        &mut yard,
        loader.vehicle,
        JobParameters {
            load: PositionAngle::new(-100.0, 0.0, 0.0),
            ..default()
        },
    );
    assert_eq!(
        job.set_values(yard.world_mut(), loader.vehicle),
        Err(JobError::NoHeapOrBunkerFound)
    );
    assert!(!job.can_start_job());
    assert!(yard.resource::<JobParameterStore>().get(3).is_none());
}

#[test]
fn test_parameter_store_bytes_roundtrip() {
    let mut store = JobParameterStore::default();
    assert!(store.save_to_bytes().is_none());

    let params = JobParameters {
        load: PositionAngle::new(1.0, 2.0, 0.5),
        unload: PositionAngle {
            x: Some(3.0),
            z: None,
            angle: None,
        },
        unload_mode: UnloadMode::UnloadAtTrigger,
    };
    store.record(17, params);
    let bytes = store.save_to_bytes().unwrap();
    assert_eq!(JobParameterStore::load_from_bytes(&bytes), store);

    let broken: JobParameterStore = decode_or_warn(JobParameterStore::SAVE_KEY, &bytes[..2]);
    assert_eq!(broken, JobParameterStore::default());
}

#[test]
fn test_parameters_json_roundtrip() {
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        unload: PositionAngle::default(),
        unload_mode: UnloadMode::UnloadAtTrigger,
    };
    let json = serde_json::to_string(&params).unwrap();
    let back: JobParameters = serde_json::from_str(&json).unwrap();
    assert_eq!(back, params);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_delete_releases_probe() {
    let (mut yard, _, loader) = yard_with_bunker();
    assert_eq!(probe_count(yard.world_mut()), 0);

    for _ in 0..3 {
        let mut job = configured_job(&mut yard, loader.vehicle, JobParameters::default());
        assert_eq!(probe_count(yard.world_mut()), 1);
        job.delete(yard.world_mut());
        job.delete(yard.world_mut());
        assert_eq!(probe_count(yard.world_mut()), 0);
    }
}

#[test]
fn test_error_message_keys_are_distinct() {
    let errors = [
        JobError::NoVehicle,
        JobError::VehicleNotSupported,
        JobError::WrongFarm,
        JobError::NoHeapOrBunkerFound,
        JobError::NoUnloadTriggerFound,
        JobError::Scene(crate::scene::SceneError::MissingNode(Entity::PLACEHOLDER)),
    ];
    let keys: std::collections::HashSet<&str> = errors.iter().map(|e| e.message_key()).collect();
    assert_eq!(keys.len(), errors.len());
}
