//! Assertion helpers for `TestYard` integration tests.

use bevy::prelude::*;

use crate::fill::FillUnits;
use crate::site::BunkerSilo;
use crate::unload::UnloadTarget;

use super::TestYard;

impl TestYard {
    pub fn bunker_level(&self, bunker: Entity) -> f32 {
        self.world()
            .get::<BunkerSilo>(bunker)
            .map_or(0.0, |silo| silo.fill_level)
    }

    pub fn received(&self, target: Entity) -> f32 {
        self.world()
            .get::<UnloadTarget>(target)
            .map_or(0.0, |t| t.received)
    }

    pub fn shovel_level(&self, shovel: Entity) -> f32 {
        self.world()
            .get::<FillUnits>(shovel)
            .and_then(|units| units.get(0))
            .map_or(0.0, |unit| unit.level)
    }

    /// Assert a job is running on `vehicle`.
    pub fn assert_job_running(&self, vehicle: Entity) {
        assert!(
            self.jobs().is_running(vehicle),
            "Expected a silo loader job on vehicle {vehicle}"
        );
    }

    /// Assert no job is running on `vehicle`.
    pub fn assert_no_job(&self, vehicle: Entity) {
        assert!(
            !self.jobs().is_running(vehicle),
            "Expected no silo loader job on vehicle {vehicle}"
        );
    }

    /// Assert `target` received between `min` and `max` litres (inclusive).
    pub fn assert_received_between(&self, target: Entity, min: f32, max: f32) {
        let received = self.received(target);
        assert!(
            received >= min && received <= max,
            "Expected {target} to receive [{min}, {max}] litres, got {received}"
        );
    }
}
