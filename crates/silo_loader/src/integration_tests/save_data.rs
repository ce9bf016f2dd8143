use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::job::{JobParameterStore, JobParameters, PositionAngle, SiloLoaderJob};
use crate::persistence::{export_save_data, import_save_data, LoaderSaveData, Saveable};
use crate::test_harness::TestYard;

#[test]
fn test_plugin_registers_job_parameters() {
    let yard = TestYard::new();
    let keys: Vec<&str> = yard.resource::<LoaderSaveData>().keys().collect();
    assert_eq!(keys, vec![JobParameterStore::SAVE_KEY]);
}

#[test]
fn test_last_used_parameters_carried_through_savegame() {
    let mut yard = TestYard::new();
    yard.spawn_bunker(
        Vec2::new(8.0, 0.0),
        Vec2::new(12.0, 10.0),
        crate::fill::FillType::Silage,
        10_000.0,
    );
    let loader = yard.spawn_wheel_loader(5, 1, Vec3::new(10.0, 0.0, -2.0), 0.0, 2000.0);
    let params = JobParameters {
        load: PositionAngle::new(10.0, 5.0, 0.0),
        ..default()
    };

    let world = yard.world_mut();
    let mut job = SiloLoaderJob::new(world).unwrap();
    job.apply_current_state(world, loader.vehicle).unwrap();
    job.set_parameters(params);
    job.set_values(world, loader.vehicle).unwrap();
    job.delete(world);
    let extensions = export_save_data(world);

    // a new session with the same vehicle id
    let mut next = TestYard::new();
    import_save_data(next.world_mut(), &extensions);
    assert_eq!(next.resource::<JobParameterStore>().get(5), Some(&params));

    // a savegame without loader data leaves nothing behind
    import_save_data(next.world_mut(), &BTreeMap::new());
    assert!(next.resource::<JobParameterStore>().get(5).is_none());
}
