use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::scene;

use super::errors::JobError;
use super::silo_loader::SiloLoaderJob;

/// Started jobs, at most one per vehicle.
#[derive(Resource, Debug, Default)]
pub struct SiloLoaderJobs {
    jobs: BTreeMap<Entity, SiloLoaderJob>,
}

impl SiloLoaderJobs {
    pub fn get(&self, vehicle: Entity) -> Option<&SiloLoaderJob> {
        self.jobs.get(&vehicle)
    }

    pub fn is_running(&self, vehicle: Entity) -> bool {
        self.jobs.contains_key(&vehicle)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn prepare(world: &mut World, job: &mut SiloLoaderJob, farm_id: u8) -> Result<Entity, JobError> {
    let vehicle = job.vehicle().ok_or(JobError::NoVehicle)?;
    if !job.can_start_job() {
        job.validate(world, farm_id)?;
    }
    job.start(world)?;
    Ok(vehicle)
}

/// Hand a configured job over to the runtime. A job that has not passed
/// validation is validated for `farm_id` first. On failure the job is
/// deleted and the error returned; a job already running on the same
/// vehicle is replaced on success.
pub fn start_job(world: &mut World, mut job: SiloLoaderJob, farm_id: u8) -> Result<Entity, JobError> {
    let vehicle = match prepare(world, &mut job, farm_id) {
        Ok(vehicle) => vehicle,
        Err(e) => {
            warn!("silo loader job not started: {e}");
            job.delete(world);
            return Err(e);
        }
    };

    stop_job(world, vehicle);
    world
        .get_resource_or_insert_with(SiloLoaderJobs::default)
        .jobs
        .insert(vehicle, job);
    Ok(vehicle)
}

/// Stop and delete the job running on `vehicle`. Returns whether one was
/// running.
pub fn stop_job(world: &mut World, vehicle: Entity) -> bool {
    let Some(mut job) = world
        .get_resource_mut::<SiloLoaderJobs>()
        .and_then(|mut jobs| jobs.jobs.remove(&vehicle))
    else {
        return false;
    };
    job.delete(world);
    info!("silo loader job stopped for vehicle {vehicle}");
    true
}

/// Advance every running job by one tick. Jobs whose vehicle disappeared or
/// whose tasks are all done are deleted.
pub fn tick_silo_loader_jobs(world: &mut World) {
    if !world.contains_resource::<SiloLoaderJobs>() {
        return;
    }
    world.resource_scope(|world, mut jobs: Mut<SiloLoaderJobs>| {
        jobs.jobs.retain(|&vehicle, job| {
            if !scene::node_exists(world, vehicle) {
                info!("vehicle {vehicle} removed, dropping its silo loader job");
                job.delete(world);
                return false;
            }
            if job.update(world) {
                info!("silo loader job finished for vehicle {vehicle}");
                job.delete(world);
                return false;
            }
            true
        });
    });
}
