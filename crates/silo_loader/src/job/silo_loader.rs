use bevy::prelude::*;

use crate::config::LoaderConfig;
use crate::scene::{self, SceneError};
use crate::shovel::ShovelController;
use crate::site::{SiteDetection, SiteDetector};
use crate::unload;
use crate::vehicle::{self, Vehicle};

use super::errors::JobError;
use super::parameters::{
    ApplicableParameters, JobParameterStore, JobParameters, PositionAngle, UnloadMode,
};
use super::tasks::{JobTask, LoadCycleTask, ParkTask, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobState {
    #[default]
    Unconfigured,
    Validating,
    Valid,
    Invalid,
}

/// Automated loading from a bunker silo or heap with a shovel implement.
///
/// Lifecycle: `new` → `apply_current_state` → edit parameters and
/// `validate` as often as needed → `set_values` → start via
/// [`start_job`](super::start_job). `delete` must be called when the job is
/// dropped so its probe frame does not leak.
#[derive(Debug)]
pub struct SiloLoaderJob {
    vehicle: Option<Entity>,
    parameters: JobParameters,
    applicable: ApplicableParameters,
    detector: SiteDetector,
    site: SiteDetection,
    unload_trigger: Option<Entity>,
    has_valid_position: bool,
    state: JobState,
    tasks: Vec<JobTask>,
    current_task: usize,
    shovel: Option<ShovelController>,
}

impl SiloLoaderJob {
    pub fn new(world: &mut World) -> Result<Self, SceneError> {
        Ok(Self {
            vehicle: None,
            parameters: JobParameters::default(),
            applicable: ApplicableParameters::default(),
            detector: SiteDetector::new(world)?,
            site: SiteDetection::NotFound,
            unload_trigger: None,
            has_valid_position: false,
            state: JobState::Unconfigured,
            tasks: vec![
                JobTask::LoadCycle(LoadCycleTask::default()),
                JobTask::Park(ParkTask::default()),
            ],
            current_task: 0,
            shovel: None,
        })
    }

    pub fn vehicle(&self) -> Option<Entity> {
        self.vehicle
    }

    pub fn parameters(&self) -> &JobParameters {
        &self.parameters
    }

    /// Replace the parameters. The job must be validated again before it
    /// can start.
    pub fn set_parameters(&mut self, parameters: JobParameters) {
        self.parameters = parameters;
        self.has_valid_position = false;
        self.state = JobState::Unconfigured;
    }

    pub fn applicable_parameters(&self) -> ApplicableParameters {
        self.applicable
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn unload_trigger(&self) -> Option<Entity> {
        self.unload_trigger
    }

    pub fn bunker_silo_or_heap(&self) -> &SiteDetection {
        &self.site
    }

    pub fn can_start_job(&self) -> bool {
        self.has_valid_position
    }

    pub fn shovel(&self) -> Option<&ShovelController> {
        self.shovel.as_ref()
    }

    pub fn tasks(&self) -> &[JobTask] {
        &self.tasks
    }

    pub fn current_task(&self) -> Option<&JobTask> {
        self.tasks.get(self.current_task)
    }

    /// Bind `vehicle`, restore its last-used parameters and default any unset
    /// position to where the vehicle stands now.
    pub fn apply_current_state(&mut self, world: &mut World, vehicle: Entity) -> Result<(), JobError> {
        let id = world.get::<Vehicle>(vehicle).ok_or(JobError::NoVehicle)?.id;
        if let Some(last) = world
            .get_resource::<JobParameterStore>()
            .and_then(|store| store.get(id))
        {
            self.parameters = *last;
        }

        let position = scene::world_position(world, vehicle)?;
        let heading = scene::world_heading(world, vehicle)?;
        let here = PositionAngle::new(position.x, position.z, heading);
        if !self.parameters.load.is_set() {
            self.parameters.load = here;
        }
        if !self.parameters.unload.is_set() {
            self.parameters.unload = here;
        }
        self.vehicle = Some(vehicle);
        self.applicable = ApplicableParameters::resolve(world, vehicle, &self.parameters);
        Ok(())
    }

    fn validate_vehicle(&self, world: &World, farm_id: u8) -> Result<Entity, JobError> {
        let vehicle = self.vehicle.ok_or(JobError::NoVehicle)?;
        let owner = world
            .get::<Vehicle>(vehicle)
            .ok_or(JobError::NoVehicle)?
            .farm_id;
        if !vehicle::supports_silo_loader(world, vehicle) {
            return Err(JobError::VehicleNotSupported);
        }
        if owner != farm_id {
            return Err(JobError::WrongFarm);
        }
        Ok(vehicle)
    }

    fn reset_detection(&mut self) {
        self.site = SiteDetection::NotFound;
        self.unload_trigger = None;
        self.has_valid_position = false;
    }

    /// Detect the site and, at a trigger, the unload trigger. Leaves both on
    /// `self` so a failed validation still shows what was found.
    fn resolve_site(&mut self, world: &mut World, vehicle: Entity) -> Result<(), JobError> {
        self.applicable = ApplicableParameters::resolve(world, vehicle, &self.parameters);
        let load = self.parameters.load;
        self.site = self.detector.detect(world, load.x, load.z, load.angle)?;
        if !self.site.found() {
            return Err(JobError::NoHeapOrBunkerFound);
        }

        if self.applicable.effective_mode(&self.parameters) == UnloadMode::UnloadAtTrigger {
            let radius = LoaderConfig::from_world_or_default(world).unload_trigger_search_radius;
            let origin = self
                .parameters
                .unload
                .planar()
                .ok_or(JobError::NoUnloadTriggerFound)?;
            let trigger = unload::find_unload_trigger(world, origin, radius)
                .ok_or(JobError::NoUnloadTriggerFound)?;
            self.unload_trigger = Some(trigger);
        }
        Ok(())
    }

    fn push_site_into_tasks(&mut self, vehicle: Entity) {
        let mode = self.applicable.effective_mode(&self.parameters);
        for task in &mut self.tasks {
            if let Some(cycle) = task.as_load_cycle_mut() {
                cycle.configure(vehicle, self.site.clone(), mode, self.unload_trigger);
            }
        }
    }

    /// Full re-check of the job for `farm_id`. Earlier results are discarded
    /// first, so a failed validation never leaves a usable site behind.
    pub fn validate(&mut self, world: &mut World, farm_id: u8) -> Result<(), JobError> {
        self.reset_detection();
        self.state = JobState::Validating;

        let result = self
            .validate_vehicle(world, farm_id)
            .and_then(|vehicle| self.resolve_site(world, vehicle).map(|_| vehicle));
        match result {
            Ok(vehicle) => {
                self.push_site_into_tasks(vehicle);
                self.has_valid_position = true;
                self.state = JobState::Valid;
                Ok(())
            }
            Err(e) => {
                debug!("silo loader job invalid: {e}");
                self.state = JobState::Invalid;
                Err(e)
            }
        }
    }

    /// Commit the parameters for `vehicle`: detect the site once more, hand
    /// it to the tasks and remember the parameters as the vehicle's last-used
    /// set.
    pub fn set_values(&mut self, world: &mut World, vehicle: Entity) -> Result<(), JobError> {
        let id = world.get::<Vehicle>(vehicle).ok_or(JobError::NoVehicle)?.id;
        self.vehicle = Some(vehicle);
        self.reset_detection();

        if let Err(e) = self.resolve_site(world, vehicle) {
            self.state = JobState::Invalid;
            return Err(e);
        }
        self.push_site_into_tasks(vehicle);
        self.has_valid_position = true;
        self.state = JobState::Valid;

        if let Some(mut store) = world.get_resource_mut::<JobParameterStore>() {
            store.record(id, self.parameters);
        }
        Ok(())
    }

    /// Bind the shovel controller and set up the first task.
    pub(crate) fn start(&mut self, world: &mut World) -> Result<(), JobError> {
        let vehicle = self.vehicle.ok_or(JobError::NoVehicle)?;
        let implement =
            vehicle::find_shovel_implement(world, vehicle).ok_or(JobError::VehicleNotSupported)?;

        let mut shovel = ShovelController::new(implement);
        self.current_task = 0;
        if let Some(task) = self.tasks.first_mut() {
            task.setup(world, &mut shovel);
        }
        self.shovel = Some(shovel);
        info!("silo loader job started for vehicle {vehicle}");
        Ok(())
    }

    /// Run the current task for one tick. Returns `true` once every task is
    /// done (or the job was never started).
    pub fn update(&mut self, world: &mut World) -> bool {
        let Some(shovel) = self.shovel.as_mut() else {
            return true;
        };
        let Some(task) = self.tasks.get_mut(self.current_task) else {
            return true;
        };
        task.run(world, shovel);
        if !task.is_done() {
            return false;
        }
        self.current_task += 1;
        match self.tasks.get_mut(self.current_task) {
            Some(next) => {
                next.setup(world, shovel);
                false
            }
            None => true,
        }
    }

    /// Release the probe frame and park the shovel. Safe to call repeatedly.
    pub fn delete(&mut self, world: &mut World) {
        self.detector.release(world);
        if let Some(shovel) = self.shovel.as_mut() {
            shovel.on_finished(world);
        }
    }
}
