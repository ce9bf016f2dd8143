//! Geometry marker cache: front/back extent frames of composite vehicles.
//!
//! Distance and position logic outside this crate measures against these
//! frames instead of the vehicle root, so attaching a trailer automatically
//! moves the back extent to the trailer's trailing edge.

mod cache;
mod systems;
mod types;

pub use cache::{
    back_marker, front_marker, markers, markers_relative_to_direction, recompute_markers,
    release_markers,
};
pub use systems::{despawn_orphaned_markers, refresh_markers_on_attachment_change};
pub use types::{BackMarkerSource, DirectionalMarkers, MarkerFrame, MarkerNode, MarkerSet};
