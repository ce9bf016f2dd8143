use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Site search envelopes (metres, probe-local frame: +Z forward, X lateral)
// ---------------------------------------------------------------------------

pub const BUNKER_SEARCH_FORWARD: f32 = 25.0;
pub const BUNKER_SEARCH_LATERAL: f32 = 5.0;
pub const HEAP_SEARCH_FORWARD: f32 = 50.0;
pub const HEAP_SEARCH_LATERAL: f32 = 10.0;

/// Spacing of the sample grid laid over a search envelope.
pub const SEARCH_STEP: f32 = 1.0;

/// Material thinner than this does not count as part of a heap.
pub const MIN_HEAP_HEIGHT: f32 = 0.1;

/// A site holding less material than this (m³) is treated as exhausted.
pub const SITE_EXHAUSTED_VOLUME: f32 = 0.5;

// ---------------------------------------------------------------------------
// Shovel fill thresholds (percent). The 1..98 band is "partial".
// ---------------------------------------------------------------------------

pub const SHOVEL_FULL_PERCENT: f32 = 98.0;
pub const SHOVEL_EMPTY_PERCENT: f32 = 1.0;
pub const SHOVEL_READY_TO_LOAD_PERCENT: f32 = 0.5;

// ---------------------------------------------------------------------------
// Shovel actuation
// ---------------------------------------------------------------------------

/// Arm height change per fixed tick (metres).
pub const ARM_RATE_PER_TICK: f32 = 0.25;
/// Tip factor change per fixed tick. Tip factor spans -1 (curled) to 1 (tipped).
pub const TIP_RATE_PER_TICK: f32 = 0.2;
/// Pose components within this distance of the target count as reached.
pub const POSE_TOLERANCE: f32 = 0.01;

// ---------------------------------------------------------------------------
// Unloading
// ---------------------------------------------------------------------------

/// Radius around the unload position searched for an unload trigger.
pub const UNLOAD_TRIGGER_SEARCH_RADIUS: f32 = 10.0;
/// Radius around the vehicle searched for a trailer in direct-dig mode.
pub const TRAILER_SEARCH_RADIUS: f32 = 30.0;
/// Shovel-to-target distance at which the shovel is raised for unloading.
pub const PRE_UNLOAD_DISTANCE: f32 = 8.0;
/// The shovel counts as over the target once its tip is within this distance
/// of the target frame's origin along the approach axis.
pub const OVER_TARGET_MARGIN: f32 = 0.5;

/// Litres scooped from the site per tick while loading.
pub const LOAD_RATE_PER_TICK: f32 = 250.0;

/// Runtime-tunable loader settings. Defaults mirror the constants above;
/// hosts may replace the resource (e.g. from a JSON file) before jobs run.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub bunker_search_forward: f32,
    pub bunker_search_lateral: f32,
    pub heap_search_forward: f32,
    pub heap_search_lateral: f32,
    pub search_step: f32,
    pub min_heap_height: f32,
    pub site_exhausted_volume: f32,
    pub unload_trigger_search_radius: f32,
    pub trailer_search_radius: f32,
    pub pre_unload_distance: f32,
    pub over_target_margin: f32,
    pub load_rate_per_tick: f32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            bunker_search_forward: BUNKER_SEARCH_FORWARD,
            bunker_search_lateral: BUNKER_SEARCH_LATERAL,
            heap_search_forward: HEAP_SEARCH_FORWARD,
            heap_search_lateral: HEAP_SEARCH_LATERAL,
            search_step: SEARCH_STEP,
            min_heap_height: MIN_HEAP_HEIGHT,
            site_exhausted_volume: SITE_EXHAUSTED_VOLUME,
            unload_trigger_search_radius: UNLOAD_TRIGGER_SEARCH_RADIUS,
            trailer_search_radius: TRAILER_SEARCH_RADIUS,
            pre_unload_distance: PRE_UNLOAD_DISTANCE,
            over_target_margin: OVER_TARGET_MARGIN,
            load_rate_per_tick: LOAD_RATE_PER_TICK,
        }
    }
}

impl LoaderConfig {
    /// Read the config from the world, falling back to defaults when the
    /// resource was never inserted.
    pub fn from_world_or_default(world: &World) -> Self {
        world.get_resource::<LoaderConfig>().cloned().unwrap_or_default()
    }
}
