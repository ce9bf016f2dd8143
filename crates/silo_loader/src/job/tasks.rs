//! Runtime tasks of a silo-loader job. A started job runs its tasks in order,
//! one `run` per fixed tick, moving on once `is_done` reports true.

use bevy::prelude::*;

use crate::config::LoaderConfig;
use crate::fill::{FillType, FillUnits};
use crate::markers;
use crate::scene;
use crate::shovel::ShovelController;
use crate::site::{remaining_volume, BunkerSilo, MaterialMap, SiteDetection, MATERIAL_CELL_SIZE};
use crate::unload::{self, UnloadTarget};
use crate::vehicle::Shovel;

use super::parameters::UnloadMode;

pub trait Task {
    /// Called once when the task becomes current.
    fn setup(&mut self, world: &mut World, shovel: &mut ShovelController);
    /// Called every tick while the task is current and not done.
    fn run(&mut self, world: &mut World, shovel: &mut ShovelController);
    fn is_done(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadPhase {
    #[default]
    Approach,
    Loading,
    Transport,
    PreUnload,
    Unload,
}

/// Repeated load, carry and discharge cycles until the site runs dry.
#[derive(Debug, Clone)]
pub struct LoadCycleTask {
    vehicle: Option<Entity>,
    site: SiteDetection,
    unload_mode: UnloadMode,
    trigger: Option<Entity>,
    target: Option<Entity>,
    phase: LoadPhase,
    /// Shovel contents at the last unload tick, to credit the target.
    unload_level: f32,
    loads_delivered: u32,
    done: bool,
}

impl Default for LoadCycleTask {
    fn default() -> Self {
        Self {
            vehicle: None,
            site: SiteDetection::NotFound,
            unload_mode: UnloadMode::DirectDig,
            trigger: None,
            target: None,
            phase: LoadPhase::Approach,
            unload_level: 0.0,
            loads_delivered: 0,
            done: false,
        }
    }
}

impl LoadCycleTask {
    pub fn configure(
        &mut self,
        vehicle: Entity,
        site: SiteDetection,
        unload_mode: UnloadMode,
        trigger: Option<Entity>,
    ) {
        self.vehicle = Some(vehicle);
        self.site = site;
        self.unload_mode = unload_mode;
        self.trigger = trigger;
    }

    pub fn site(&self) -> &SiteDetection {
        &self.site
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn loads_delivered(&self) -> u32 {
        self.loads_delivered
    }

    fn site_exhausted(&self, world: &World, config: &LoaderConfig) -> bool {
        remaining_volume(world, &self.site) < config.site_exhausted_volume
    }

    fn enter(&mut self, phase: LoadPhase) {
        debug!("load cycle: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn finish(&mut self) {
        info!(
            "load cycle finished after {} load(s): site exhausted",
            self.loads_delivered
        );
        self.done = true;
    }

    /// Current target if it is still usable, otherwise search for a new one.
    fn resolve_target(
        &mut self,
        world: &mut World,
        shovel: &ShovelController,
        config: &LoaderConfig,
    ) -> Option<Entity> {
        let fill_type = shovel.loading_fill_type(world);
        let usable = |world: &World, entity: Entity| {
            world
                .get::<UnloadTarget>(entity)
                .is_some_and(|t| t.reachable && t.accepts(fill_type))
        };
        if let Some(target) = self.target.filter(|&t| usable(world, t)) {
            return Some(target);
        }
        self.target = match self.unload_mode {
            UnloadMode::UnloadAtTrigger => self.trigger.filter(|&t| usable(world, t)),
            UnloadMode::DirectDig => {
                let vehicle = self.vehicle?;
                let origin = markers::front_marker(world, vehicle)
                    .and_then(|(node, _)| scene::world_position(world, node))
                    .ok()?;
                unload::find_trailer(
                    world,
                    Vec2::new(origin.x, origin.z),
                    config.trailer_search_radius,
                    fill_type,
                )
            }
        };
        if let Some(target) = self.target {
            debug!("load cycle: unloading into {target}");
        }
        self.target
    }

    fn credit_target(&mut self, world: &mut World, shovel: &ShovelController) {
        let level = shovel.fill_amount(world);
        let discharged = (self.unload_level - level).max(0.0);
        self.unload_level = level;
        if discharged <= 0.0 {
            return;
        }
        if let Some(mut target) = self
            .target
            .and_then(|t| world.get_mut::<UnloadTarget>(t))
        {
            target.received += discharged;
        }
    }
}

fn load_into_shovel(world: &mut World, implement: Entity, fill_type: FillType, litres: f32) -> f32 {
    let Some(index) = world.get::<Shovel>(implement).map(|s| s.fill_unit_index) else {
        return 0.0;
    };
    let Some(mut units) = world.get_mut::<FillUnits>(implement) else {
        return 0.0;
    };
    units
        .0
        .get_mut(index)
        .map_or(0.0, |unit| unit.add(fill_type, litres))
}

/// Move up to `litres` from the site into the shovel. Heaps are dug from the
/// cell nearest the shovel tip.
fn scoop(world: &mut World, shovel: &ShovelController, site: &SiteDetection, litres: f32) -> f32 {
    let implement = shovel.implement();
    match site {
        SiteDetection::Bunker { entity, .. } => {
            let (fill_type, level) = match world.get::<BunkerSilo>(*entity) {
                Some(silo) => (silo.fill_type, silo.fill_level),
                None => return 0.0,
            };
            let Some(fill_type) = fill_type else {
                return 0.0;
            };
            let taken = load_into_shovel(world, implement, fill_type, level.min(litres));
            if let Some(mut silo) = world.get_mut::<BunkerSilo>(*entity) {
                silo.fill_level = (silo.fill_level - taken).max(0.0);
            }
            taken
        }
        SiteDetection::Heap(heap) => {
            let tip = shovel
                .shovel_node(world)
                .and_then(|node| scene::world_position(world, node).ok())
                .map_or_else(|| heap.area.center(), |p| Vec2::new(p.x, p.z));
            let Some(material) = world.get_resource::<MaterialMap>() else {
                return 0.0;
            };
            let cell_area = MATERIAL_CELL_SIZE * MATERIAL_CELL_SIZE;
            let nearest = material
                .cells
                .iter()
                .map(|(index, cell)| (*index, MaterialMap::cell_center(*index), *cell))
                .filter(|(_, center, _)| heap.area.contains(*center))
                .min_by(|a, b| {
                    a.1.distance_squared(tip)
                        .total_cmp(&b.1.distance_squared(tip))
                        .then(a.0.cmp(&b.0))
                });
            let Some((_, center, cell)) = nearest else {
                return 0.0;
            };
            let available = cell.height * cell_area * 1000.0;
            let taken = load_into_shovel(world, implement, cell.fill_type, available.min(litres));
            if let Some(mut material) = world.get_resource_mut::<MaterialMap>() {
                material.remove_material(center, taken / 1000.0 / cell_area);
            }
            taken
        }
        SiteDetection::NotFound => 0.0,
    }
}

impl Task for LoadCycleTask {
    fn setup(&mut self, world: &mut World, shovel: &mut ShovelController) {
        self.phase = LoadPhase::Approach;
        self.target = None;
        self.done = false;
        self.unload_level = shovel.fill_amount(world);
        if !self.site.found() {
            warn!("load cycle started without a site; nothing to do");
            self.done = true;
        }
    }

    fn run(&mut self, world: &mut World, shovel: &mut ShovelController) {
        if self.done {
            return;
        }
        let config = LoaderConfig::from_world_or_default(world);
        match self.phase {
            LoadPhase::Approach => {
                if shovel.is_empty(world) && self.site_exhausted(world, &config) {
                    self.finish();
                } else if shovel.move_to_loading_position(world) {
                    self.enter(LoadPhase::Loading);
                }
            }
            LoadPhase::Loading => {
                if shovel.is_full(world) {
                    self.enter(LoadPhase::Transport);
                    return;
                }
                let site = self.site.clone();
                if scoop(world, shovel, &site, config.load_rate_per_tick) > 0.0 {
                    return;
                }
                // nothing left to dig (or the material does not mix)
                if shovel.is_empty(world) {
                    self.finish();
                } else {
                    self.enter(LoadPhase::Transport);
                }
            }
            LoadPhase::Transport => {
                if !shovel.move_to_transport_position(world) {
                    return;
                }
                let Some(target) = self.resolve_target(world, shovel, &config) else {
                    return;
                };
                let Some(node) = shovel.shovel_node(world) else {
                    return;
                };
                if unload::distance_to_target(world, node, target)
                    .is_some_and(|d| d <= config.pre_unload_distance)
                {
                    self.enter(LoadPhase::PreUnload);
                }
            }
            LoadPhase::PreUnload => {
                if !shovel.move_to_pre_unload_position(world) {
                    return;
                }
                let Some(target) = self.resolve_target(world, shovel, &config) else {
                    self.enter(LoadPhase::Transport);
                    return;
                };
                if shovel.is_over_target(world, target, config.over_target_margin) {
                    self.unload_level = shovel.fill_amount(world);
                    self.enter(LoadPhase::Unload);
                }
            }
            LoadPhase::Unload => {
                let tipped = shovel.move_to_unload_position(world);
                self.credit_target(world, shovel);
                if tipped && shovel.is_empty(world) {
                    self.loads_delivered += 1;
                    debug!("load cycle: load {} delivered", self.loads_delivered);
                    self.enter(LoadPhase::Approach);
                }
            }
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

/// Brings the shovel back to transport height and releases it.
#[derive(Debug, Clone, Default)]
pub struct ParkTask {
    done: bool,
}

impl Task for ParkTask {
    fn setup(&mut self, _world: &mut World, _shovel: &mut ShovelController) {
        self.done = false;
    }

    fn run(&mut self, world: &mut World, shovel: &mut ShovelController) {
        if self.done {
            return;
        }
        if shovel.move_to_transport_position(world) {
            shovel.on_finished(world);
            self.done = true;
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[derive(Debug, Clone)]
pub enum JobTask {
    LoadCycle(LoadCycleTask),
    Park(ParkTask),
}

impl JobTask {
    pub fn as_load_cycle(&self) -> Option<&LoadCycleTask> {
        match self {
            JobTask::LoadCycle(task) => Some(task),
            JobTask::Park(_) => None,
        }
    }

    pub fn as_load_cycle_mut(&mut self) -> Option<&mut LoadCycleTask> {
        match self {
            JobTask::LoadCycle(task) => Some(task),
            JobTask::Park(_) => None,
        }
    }
}

impl Task for JobTask {
    fn setup(&mut self, world: &mut World, shovel: &mut ShovelController) {
        match self {
            JobTask::LoadCycle(task) => task.setup(world, shovel),
            JobTask::Park(task) => task.setup(world, shovel),
        }
    }

    fn run(&mut self, world: &mut World, shovel: &mut ShovelController) {
        match self {
            JobTask::LoadCycle(task) => task.run(world, shovel),
            JobTask::Park(task) => task.run(world, shovel),
        }
    }

    fn is_done(&self) -> bool {
        match self {
            JobTask::LoadCycle(task) => task.is_done(),
            JobTask::Park(task) => task.is_done(),
        }
    }
}
