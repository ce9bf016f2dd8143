use bevy::prelude::*;

pub mod config;
pub mod fill;
pub mod job;
pub mod markers;
pub mod persistence;
pub mod scene;
pub mod shovel;
pub mod site;
pub mod unload;
pub mod vehicle;

#[cfg(test)]
mod integration_tests;
#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Ordered phases of the loader in `FixedUpdate`, chained
/// `Geometry` → `Jobs` → `Actuation`.
///
/// * **Geometry** – marker frames follow attachment changes before anything
///   measures against them.
/// * **Jobs** – running jobs advance their current task and request shovel
///   poses.
/// * **Actuation** – actuators move toward the requested poses and tipped
///   shovels discharge. Jobs see the result on the next tick.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum LoaderSet {
    Geometry,
    Jobs,
    Actuation,
}

pub struct SiloLoaderPlugin;

impl Plugin for SiloLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<config::LoaderConfig>()
            .init_resource::<site::MaterialMap>()
            .init_resource::<job::JobParameterStore>()
            .init_resource::<job::SiloLoaderJobs>();

        app.configure_sets(
            FixedUpdate,
            (LoaderSet::Geometry, LoaderSet::Jobs, LoaderSet::Actuation).chain(),
        );

        app.add_systems(
            FixedUpdate,
            markers::refresh_markers_on_attachment_change.in_set(LoaderSet::Geometry),
        )
        .add_systems(
            FixedUpdate,
            job::tick_silo_loader_jobs.in_set(LoaderSet::Jobs),
        )
        .add_systems(
            FixedUpdate,
            (shovel::drive_shovel_actuators, shovel::discharge_tipped_shovels)
                .chain()
                .in_set(LoaderSet::Actuation),
        )
        .add_systems(Update, markers::despawn_orphaned_markers);

        app.init_resource::<persistence::LoaderSaveData>();
        app.world_mut()
            .resource_mut::<persistence::LoaderSaveData>()
            .register::<job::JobParameterStore>();
    }
}
