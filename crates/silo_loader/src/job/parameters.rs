use std::collections::BTreeMap;

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::fill::Dischargeable;
use crate::persistence::{decode_or_warn, Saveable};
use crate::vehicle;

/// A world position on the ground plane plus a heading. Coordinates stay
/// `None` until set by the operator or defaulted from the vehicle.
#[derive(
    Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct PositionAngle {
    pub x: Option<f32>,
    pub z: Option<f32>,
    pub angle: Option<f32>,
}

impl PositionAngle {
    pub fn new(x: f32, z: f32, angle: f32) -> Self {
        Self {
            x: Some(x),
            z: Some(z),
            angle: Some(angle),
        }
    }

    pub fn is_set(&self) -> bool {
        self.x.is_some() && self.z.is_some()
    }

    pub fn planar(&self) -> Option<Vec2> {
        Some(Vec2::new(self.x?, self.z?))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum UnloadMode {
    /// Discharge into a trailer next to the site.
    #[default]
    DirectDig,
    /// Carry each load to an unload trigger at the unload position.
    UnloadAtTrigger,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct JobParameters {
    pub load: PositionAngle,
    pub unload: PositionAngle,
    pub unload_mode: UnloadMode,
}

/// Which parameters make sense for the bound vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplicableParameters {
    pub unload_mode: bool,
    pub unload_position: bool,
}

impl ApplicableParameters {
    /// The unload mode can only be chosen when the shovel implement can
    /// discharge on its own; the unload position only matters at a trigger.
    pub fn resolve(world: &World, vehicle: Entity, parameters: &JobParameters) -> Self {
        let unload_mode = vehicle::find_shovel_implement(world, vehicle)
            .is_some_and(|implement| world.get::<Dischargeable>(implement).is_some());
        let mode = if unload_mode {
            parameters.unload_mode
        } else {
            UnloadMode::DirectDig
        };
        Self {
            unload_mode,
            unload_position: mode == UnloadMode::UnloadAtTrigger,
        }
    }

    pub fn effective_mode(&self, parameters: &JobParameters) -> UnloadMode {
        if self.unload_mode {
            parameters.unload_mode
        } else {
            UnloadMode::DirectDig
        }
    }
}

/// Last-used job parameters per vehicle id, persisted with the save.
#[derive(Resource, Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct JobParameterStore {
    pub by_vehicle: BTreeMap<u32, JobParameters>,
}

impl JobParameterStore {
    pub fn get(&self, vehicle_id: u32) -> Option<&JobParameters> {
        self.by_vehicle.get(&vehicle_id)
    }

    pub fn record(&mut self, vehicle_id: u32, parameters: JobParameters) {
        self.by_vehicle.insert(vehicle_id, parameters);
    }
}

impl Saveable for JobParameterStore {
    const SAVE_KEY: &'static str = "silo_loader_job_parameters";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.by_vehicle.is_empty() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        decode_or_warn(Self::SAVE_KEY, bytes)
    }
}
