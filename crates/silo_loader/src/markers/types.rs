use bevy::prelude::*;

/// One marker: the normal frame, its 180°-rotated twin, and the signed
/// longitudinal offset from the reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerFrame {
    pub node: Entity,
    pub inverted: Entity,
    pub offset: f32,
}

/// Front and back extent frames of a composite vehicle. Lives on the vehicle
/// entity; created on first access and kept until the vehicle goes away.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct MarkerSet {
    pub front: MarkerFrame,
    pub back: MarkerFrame,
    /// Frame both markers are currently linked under.
    pub reference: Entity,
    /// Sensor-measured back distance the set was derived with, if any.
    pub measured_back_distance: Option<f32>,
    pub back_source: BackMarkerSource,
}

/// Tags a normal marker frame with the vehicle it belongs to, so frames of
/// despawned vehicles can be found and cleaned up.
#[derive(Component, Debug, Clone, Copy)]
pub struct MarkerNode {
    pub owner: Entity,
}

/// Which rule placed the back marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackMarkerSource {
    RearImplement,
    Measured,
    Reverser,
    VehicleLength,
}

/// Markers as seen along the vehicle's effective travel direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalMarkers {
    pub front: Entity,
    pub back: Entity,
    pub front_offset: f32,
    pub back_offset: f32,
    pub reversed: bool,
}
