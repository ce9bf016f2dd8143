//! Headless demo: one wheel loader digging out a bunker silo (or a heap with
//! `--heap`) into a trailer parked at the shovel tip.
//!
//! Settings come from `LoaderConfig` defaults, overridden by a JSON file named
//! in `SILO_LOADER_CONFIG`. A JSON summary is printed to stdout once the job
//! ends; logs go to stderr.

use std::f32::consts::PI;
use std::process::ExitCode;

use bevy::log::LogPlugin;
use bevy::prelude::*;

use silo_loader::config::LoaderConfig;
use silo_loader::fill::{Dischargeable, FillType, FillUnit, FillUnits};
use silo_loader::job::{
    start_job, JobError, JobParameters, PositionAngle, SiloLoaderJob, SiloLoaderJobs,
};
use silo_loader::persistence::export_save_data;
use silo_loader::scene;
use silo_loader::shovel::ShovelActuator;
use silo_loader::site::{BunkerSilo, MaterialMap, SiteArea};
use silo_loader::unload::UnloadTarget;
use silo_loader::vehicle::{attach_implement, AttachSide, Implement, Shovel, Vehicle, VehicleSize};
use silo_loader::SiloLoaderPlugin;

const FARM_ID: u8 = 1;
const MAX_TICKS: u32 = 50_000;

fn load_config() -> Option<LoaderConfig> {
    let path = std::env::var("SILO_LOADER_CONFIG").ok()?;
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            warn!("cannot read {path}: {e}; using defaults");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("invalid loader config in {path}: {e}; using defaults");
            None
        }
    }
}

/// Wheel loader at `position` facing +Z; the shovel tip ends up 4.8 m ahead.
fn spawn_wheel_loader(world: &mut World, position: Vec3) -> Result<Entity, scene::SceneError> {
    let vehicle = world
        .spawn((
            Name::new("wheelLoader"),
            Vehicle::new(1, FARM_ID, VehicleSize::new(7.0, 2.6)),
            Transform::from_translation(position),
        ))
        .id();
    let shovel = world
        .spawn((
            Name::new("shovel"),
            Implement {
                size: VehicleSize::new(1.6, 2.8),
                side: AttachSide::Front,
            },
            Transform::from_xyz(0.0, 0.0, 4.0),
            ShovelActuator::default(),
            FillUnits(vec![FillUnit::empty(2000.0)]),
            Dischargeable::default(),
        ))
        .set_parent(vehicle)
        .id();
    let tip = world
        .spawn((Name::new("shovelTip"), Transform::from_xyz(0.0, 0.0, 0.8)))
        .set_parent(shovel)
        .id();
    world.entity_mut(shovel).insert(Shovel {
        node: tip,
        fill_unit_index: 0,
    });
    attach_implement(world, vehicle, shovel)?;
    Ok(vehicle)
}

fn spawn_trailer(world: &mut World, position: Vec3) -> Entity {
    world
        .spawn((
            Name::new("trailer"),
            UnloadTarget::trailer(vec![]),
            Transform::from_translation(position).with_rotation(scene::heading_rotation(PI)),
        ))
        .id()
}

fn start_digging(world: &mut World, vehicle: Entity, load: PositionAngle) -> Result<Entity, JobError> {
    let mut job = SiloLoaderJob::new(world)?;
    job.apply_current_state(world, vehicle)?;
    job.set_parameters(JobParameters { load, ..default() });
    job.set_values(world, vehicle)?;
    start_job(world, job, FARM_ID)
}

fn main() -> ExitCode {
    let heap = std::env::args().any(|arg| arg == "--heap");

    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LogPlugin::default()))
        .add_plugins(SiloLoaderPlugin);
    if let Some(config) = load_config() {
        app.insert_resource(config);
    }
    app.update();

    let world = app.world_mut();
    let (vehicle, trailer, load) = if heap {
        world.resource_mut::<MaterialMap>().scatter_heap(
            Vec2::new(0.0, 20.0),
            4.0,
            2.0,
            FillType::Chaff,
            42,
        );
        let vehicle = match spawn_wheel_loader(world, Vec3::new(0.0, 0.0, 11.0)) {
            Ok(vehicle) => vehicle,
            Err(e) => {
                error!("spawning the loader failed: {e}");
                return ExitCode::FAILURE;
            }
        };
        let trailer = spawn_trailer(world, Vec3::new(0.0, 0.0, 16.0));
        (vehicle, trailer, PositionAngle::new(0.0, 11.0, 0.0))
    } else {
        world.spawn((
            Name::new("bunkerSilo"),
            BunkerSilo {
                area: SiteArea::axis_aligned(Vec2::new(-4.0, 0.0), Vec2::new(4.0, 30.0)),
                fill_type: Some(FillType::Silage),
                fill_level: 40_000.0,
            },
        ));
        let vehicle = match spawn_wheel_loader(world, Vec3::new(0.0, 0.0, -2.0)) {
            Ok(vehicle) => vehicle,
            Err(e) => {
                error!("spawning the loader failed: {e}");
                return ExitCode::FAILURE;
            }
        };
        let trailer = spawn_trailer(world, Vec3::new(0.0, 0.0, 3.0));
        (vehicle, trailer, PositionAngle::new(0.0, 5.0, 0.0))
    };

    let started = start_digging(world, vehicle, load);
    if let Err(e) = started {
        error!("silo loader job rejected: {e} ({})", e.message_key());
        return ExitCode::FAILURE;
    }

    let mut ticks = 0;
    while ticks < MAX_TICKS && app.world().resource::<SiloLoaderJobs>().is_running(vehicle) {
        app.world_mut().run_schedule(FixedUpdate);
        ticks += 1;
    }
    let finished = !app.world().resource::<SiloLoaderJobs>().is_running(vehicle);
    let received = app
        .world()
        .get::<UnloadTarget>(trailer)
        .map_or(0.0, |t| t.received);
    info!("job finished: {finished} after {ticks} ticks, {received:.0} l delivered");

    let saved_keys: Vec<String> = export_save_data(app.world()).into_keys().collect();

    let summary = serde_json::json!({
        "site": if heap { "heap" } else { "bunker" },
        "finished": finished,
        "ticks": ticks,
        "delivered_litres": received,
        "saved_keys": saved_keys,
    });
    println!("{summary}");
    if finished {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
