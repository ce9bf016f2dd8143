//! Bunker/heap search around a probe frame.
//!
//! The search envelope is laid out in the probe's local frame: `forward`
//! metres along +Z and `lateral` metres to either side. It is sampled on a
//! regular grid; rows are visited nearest first.

use std::collections::VecDeque;

use bevy::prelude::*;

use crate::config::LoaderConfig;
use crate::fill::FillType;
use crate::scene::{self, SceneError};

use super::types::{BunkerSilo, HeapPile, MaterialMap, SiteArea, SiteDetection};

const MAX_ENVELOPE_SAMPLES: f32 = 4_000_000.0;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Envelope {
    pub forward: f32,
    pub lateral: f32,
    pub step: f32,
}

impl Envelope {
    /// A usable envelope has a positive step and non-negative extents, all
    /// finite, and no more than `MAX_ENVELOPE_SAMPLES` samples.
    pub(crate) fn is_valid(&self) -> bool {
        let finite = self.forward.is_finite() && self.lateral.is_finite() && self.step.is_finite();
        if !finite || self.step <= 0.0 || self.forward < 0.0 || self.lateral < 0.0 {
            return false;
        }
        let rows = (self.forward / self.step).floor() + 1.0;
        let cols = 2.0 * (self.lateral / self.step).floor() + 1.0;
        rows * cols <= MAX_ENVELOPE_SAMPLES
    }

    fn rows(&self) -> i32 {
        (self.forward / self.step).floor() as i32 + 1
    }

    fn half_cols(&self) -> i32 {
        (self.lateral / self.step).floor() as i32
    }

    fn local(&self, row: i32, col: i32) -> Vec2 {
        Vec2::new(col as f32 * self.step, row as f32 * self.step)
    }

    /// Column indices ordered by distance from the centre line.
    fn cols_nearest_first(&self) -> Vec<i32> {
        let n = self.half_cols();
        let mut cols: Vec<i32> = (-n..=n).collect();
        cols.sort_by_key(|c| c.abs());
        cols
    }
}

fn to_world(probe: &Transform, local: Vec2) -> Vec2 {
    let p = probe.transform_point(Vec3::new(local.x, 0.0, local.y));
    Vec2::new(p.x, p.z)
}

/// First bunker (nearest row first) containing any envelope sample.
pub(crate) fn find_bunker<'a>(
    probe: &Transform,
    bunkers: &'a [(Entity, BunkerSilo)],
    envelope: Envelope,
) -> Option<&'a (Entity, BunkerSilo)> {
    if bunkers.is_empty() || !envelope.is_valid() {
        return None;
    }
    let cols = envelope.cols_nearest_first();
    for row in 0..envelope.rows() {
        for &col in &cols {
            let point = to_world(probe, envelope.local(row, col));
            if let Some(hit) = bunkers.iter().find(|(_, silo)| silo.area.contains(point)) {
                return Some(hit);
            }
        }
    }
    None
}

/// Synthesise a heap from loose material inside the envelope. Material lying
/// inside any bunker is ignored so a bunker's contents never show up as a
/// heap. The heap is the 4-connected cluster around the nearest sample with
/// enough material.
pub(crate) fn find_heap(
    probe: &Transform,
    material: &MaterialMap,
    bunkers: &[(Entity, BunkerSilo)],
    envelope: Envelope,
    min_height: f32,
) -> Option<HeapPile> {
    if !envelope.is_valid() {
        return None;
    }
    let rows = envelope.rows();
    let n = envelope.half_cols();
    let width = (2 * n + 1) as usize;
    let index = |row: i32, col: i32| row as usize * width + (col + n) as usize;

    let mut samples: Vec<Option<(f32, FillType)>> = vec![None; rows as usize * width];
    for row in 0..rows {
        for col in -n..=n {
            let point = to_world(probe, envelope.local(row, col));
            if bunkers.iter().any(|(_, silo)| silo.area.contains(point)) {
                continue;
            }
            if let Some(cell) = material.cell_at(point) {
                if cell.height >= min_height {
                    samples[index(row, col)] = Some((cell.height, cell.fill_type));
                }
            }
        }
    }

    let cols = envelope.cols_nearest_first();
    let seed = (0..rows)
        .flat_map(|row| cols.iter().map(move |&col| (row, col)))
        .find(|&(row, col)| samples[index(row, col)].is_some())?;
    let (_, fill_type) = samples[index(seed.0, seed.1)]?;

    let mut visited = vec![false; samples.len()];
    let mut queue = VecDeque::from([seed]);
    visited[index(seed.0, seed.1)] = true;
    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);
    let mut volume = 0.0f32;

    while let Some((row, col)) = queue.pop_front() {
        let Some((height, _)) = samples[index(row, col)] else {
            continue;
        };
        let local = envelope.local(row, col);
        min = min.min(local);
        max = max.max(local);
        volume += height * envelope.step * envelope.step;

        for (dr, dc) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (r, c) = (row + dr, col + dc);
            if r < 0 || r >= rows || c < -n || c > n {
                continue;
            }
            let i = index(r, c);
            if !visited[i] && samples[i].is_some() {
                visited[i] = true;
                queue.push_back((r, c));
            }
        }
    }

    let half = envelope.step / 2.0;
    let (min, max) = (min - Vec2::splat(half), max + Vec2::splat(half));
    let area = SiteArea::new(
        to_world(probe, min),
        to_world(probe, Vec2::new(max.x, min.y)),
        to_world(probe, Vec2::new(min.x, max.y)),
    );
    Some(HeapPile {
        area,
        fill_type,
        volume,
    })
}

/// Finds the bunker or heap at a configured load position. Owns one probe
/// frame for its whole lifetime; call [`SiteDetector::release`] when done.
#[derive(Debug)]
pub struct SiteDetector {
    probe: Entity,
}

impl SiteDetector {
    pub fn new(world: &mut World) -> Result<Self, SceneError> {
        let probe = scene::create_node(world, "siteDetectionProbe", None)?;
        Ok(Self { probe })
    }

    pub fn probe(&self) -> Entity {
        self.probe
    }

    /// Search at `(x, z)` looking along `angle`. A missing coordinate is a
    /// configuration error and yields `NotFound`; a missing angle means 0.
    pub fn detect(
        &self,
        world: &mut World,
        x: Option<f32>,
        z: Option<f32>,
        angle: Option<f32>,
    ) -> Result<SiteDetection, SceneError> {
        let (Some(x), Some(z)) = (x, z) else {
            debug!("site detection skipped: load position not set");
            return Ok(SiteDetection::NotFound);
        };
        if !x.is_finite() || !z.is_finite() {
            return Ok(SiteDetection::NotFound);
        }
        scene::set_translation(world, self.probe, Vec3::new(x, 0.0, z))?;
        scene::set_rotation(
            world,
            self.probe,
            scene::heading_rotation(angle.unwrap_or(0.0)),
        )?;
        let probe = scene::world_transform(world, self.probe)?;
        let config = LoaderConfig::from_world_or_default(world);
        if !(config.search_step.is_finite() && config.search_step > 0.0) {
            warn!(
                "site detection skipped: invalid search step {}",
                config.search_step
            );
            return Ok(SiteDetection::NotFound);
        }

        let mut query = world.query::<(Entity, &BunkerSilo)>();
        let bunkers: Vec<(Entity, BunkerSilo)> = query
            .iter(world)
            .map(|(entity, silo)| (entity, silo.clone()))
            .collect();

        let bunker_envelope = Envelope {
            forward: config.bunker_search_forward,
            lateral: config.bunker_search_lateral,
            step: config.search_step,
        };
        if let Some((entity, silo)) = find_bunker(&probe, &bunkers, bunker_envelope) {
            debug!("bunker silo {entity} found at ({x:.1}, {z:.1})");
            return Ok(SiteDetection::Bunker {
                entity: *entity,
                silo: silo.clone(),
            });
        }

        let Some(material) = world.get_resource::<MaterialMap>() else {
            return Ok(SiteDetection::NotFound);
        };
        let heap_envelope = Envelope {
            forward: config.heap_search_forward,
            lateral: config.heap_search_lateral,
            step: config.search_step,
        };
        match find_heap(&probe, material, &bunkers, heap_envelope, config.min_heap_height) {
            Some(heap) => {
                debug!(
                    "heap of {:?} found at ({x:.1}, {z:.1}), {:.1} m³",
                    heap.fill_type, heap.volume
                );
                Ok(SiteDetection::Heap(heap))
            }
            None => Ok(SiteDetection::NotFound),
        }
    }

    /// Despawn the probe frame. Returns `false` if it was already gone.
    pub fn release(&self, world: &mut World) -> bool {
        scene::destroy_node(world, self.probe)
    }
}

/// Cubic metres still available at a detected site, read live: the bunker's
/// current fill level or the loose material inside the heap bounds.
pub fn remaining_volume(world: &World, site: &SiteDetection) -> f32 {
    match site {
        SiteDetection::Bunker { entity, silo } => world
            .get::<BunkerSilo>(*entity)
            .unwrap_or(silo)
            .fill_level
            / 1000.0,
        SiteDetection::Heap(heap) => world
            .get_resource::<MaterialMap>()
            .map_or(0.0, |material| material.volume_in(&heap.area)),
        SiteDetection::NotFound => 0.0,
    }
}
