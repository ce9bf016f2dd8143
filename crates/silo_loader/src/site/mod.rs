//! Site detection: find the bunker silo or loose heap a loader should work.
//!
//! Bunkers always win. A heap is only synthesised from the material map when
//! no bunker lies inside the (smaller) bunker search envelope, and material
//! inside a bunker's walls is never counted as a heap.

mod detector;
mod types;

pub use detector::{remaining_volume, SiteDetector};
pub use types::{
    BunkerSilo, HeapPile, MaterialCell, MaterialMap, SiteArea, SiteDetection, MATERIAL_CELL_SIZE,
};

#[cfg(feature = "bench")]
pub mod bench_support {
    //! Pure search entry points for the criterion benches.
    use bevy::prelude::*;

    use super::detector::{find_bunker, find_heap, Envelope};
    use super::types::{BunkerSilo, HeapPile, MaterialMap};

    pub fn heap_search(
        probe: &Transform,
        material: &MaterialMap,
        bunkers: &[(Entity, BunkerSilo)],
        forward: f32,
        lateral: f32,
        step: f32,
    ) -> Option<HeapPile> {
        find_heap(
            probe,
            material,
            bunkers,
            Envelope {
                forward,
                lateral,
                step,
            },
            crate::config::MIN_HEAP_HEIGHT,
        )
    }

    pub fn bunker_search(
        probe: &Transform,
        bunkers: &[(Entity, BunkerSilo)],
        forward: f32,
        lateral: f32,
        step: f32,
    ) -> Option<Entity> {
        find_bunker(
            probe,
            bunkers,
            Envelope {
                forward,
                lateral,
                step,
            },
        )
        .map(|(entity, _)| *entity)
    }
}
