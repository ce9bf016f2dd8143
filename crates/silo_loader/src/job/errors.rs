use std::fmt;

use crate::scene::SceneError;

/// Why a silo-loader job cannot be validated or started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobError {
    NoVehicle,
    VehicleNotSupported,
    WrongFarm,
    NoHeapOrBunkerFound,
    NoUnloadTriggerFound,
    Scene(SceneError),
}

impl JobError {
    /// Stable localisation key; the text itself is resolved by the host.
    pub fn message_key(&self) -> &'static str {
        match self {
            JobError::NoVehicle => "silo_loader.error.no_vehicle",
            JobError::VehicleNotSupported => "silo_loader.error.vehicle_not_supported",
            JobError::WrongFarm => "silo_loader.error.wrong_farm",
            JobError::NoHeapOrBunkerFound => "silo_loader.error.no_heap_or_bunker_found",
            JobError::NoUnloadTriggerFound => "silo_loader.error.no_unload_trigger_found",
            JobError::Scene(_) => "silo_loader.error.internal",
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::NoVehicle => write!(f, "no vehicle bound to the job"),
            JobError::VehicleNotSupported => write!(f, "vehicle has no shovel implement"),
            JobError::WrongFarm => write!(f, "vehicle belongs to another farm"),
            JobError::NoHeapOrBunkerFound => write!(f, "no heap or bunker silo at the load position"),
            JobError::NoUnloadTriggerFound => write!(f, "no unload trigger at the unload position"),
            JobError::Scene(e) => write!(f, "scene error: {e}"),
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JobError::Scene(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SceneError> for JobError {
    fn from(e: SceneError) -> Self {
        JobError::Scene(e)
    }
}
