//! # TestYard: headless integration test harness for the silo loader
//!
//! Wraps `bevy::app::App` + `SiloLoaderPlugin` so jobs, markers and shovels
//! can be driven tick by tick without a window or renderer.

mod assertions;
mod spawning;

use bevy::app::App;
use bevy::prelude::*;

use crate::config::LoaderConfig;
use crate::fill::FillType;
use crate::job::SiloLoaderJobs;
use crate::site::{BunkerSilo, MaterialMap, SiteArea};
use crate::SiloLoaderPlugin;

pub use spawning::LoaderHandles;

/// A headless Bevy App wrapping `SiloLoaderPlugin` for integration testing.
///
/// Use builder methods to set up the yard, spawn vehicles and targets, then
/// call `tick()` to advance the fixed schedule.
pub struct TestYard {
    app: App,
}

impl Default for TestYard {
    fn default() -> Self {
        Self::new()
    }
}

impl TestYard {
    /// An empty yard: no sites, no vehicles, default config.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(SiloLoaderPlugin);
        // Run one update so Startup systems execute.
        app.update();
        Self { app }
    }

    // -----------------------------------------------------------------------
    // Yard setup (builder methods consume and return Self)
    // -----------------------------------------------------------------------

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.app.world_mut().insert_resource(config);
        self
    }

    /// Drop a conical heap of loose material (deterministic per seed).
    pub fn with_heap(
        mut self,
        center: Vec2,
        radius: f32,
        peak: f32,
        fill_type: FillType,
        seed: u64,
    ) -> Self {
        self.app
            .world_mut()
            .resource_mut::<MaterialMap>()
            .scatter_heap(center, radius, peak, fill_type, seed);
        self
    }

    /// Spawn an axis-aligned bunker silo holding `litres` of `fill_type`.
    pub fn spawn_bunker(&mut self, min: Vec2, max: Vec2, fill_type: FillType, litres: f32) -> Entity {
        self.app
            .world_mut()
            .spawn((
                Name::new("bunkerSilo"),
                BunkerSilo {
                    area: SiteArea::axis_aligned(min, max),
                    fill_type: Some(fill_type),
                    fill_level: litres,
                },
            ))
            .id()
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run `n` fixed ticks.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    /// Tick until `done` holds, at most `max` ticks. Returns the ticks used,
    /// or `None` if the condition never held.
    pub fn tick_until(&mut self, max: u32, mut done: impl FnMut(&mut World) -> bool) -> Option<u32> {
        for n in 0..max {
            if done(self.app.world_mut()) {
                return Some(n);
            }
            self.app.world_mut().run_schedule(FixedUpdate);
        }
        done(self.app.world_mut()).then_some(max)
    }

    /// One full frame (runs `Update` systems such as orphan cleanup).
    pub fn update(&mut self) {
        self.app.update();
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn world(&self) -> &World {
        self.app.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn jobs(&self) -> &SiloLoaderJobs {
        self.resource::<SiloLoaderJobs>()
    }
}
