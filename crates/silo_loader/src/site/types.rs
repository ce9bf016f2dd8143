use std::collections::HashMap;

use bevy::math::Mat2;
use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::fill::FillType;

/// Planar parallelogram in world XZ (a `Vec2` here is `(x, z)`), spanned from
/// `start` towards `width_end` and `length_end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteArea {
    pub start: Vec2,
    pub width_end: Vec2,
    pub length_end: Vec2,
}

impl SiteArea {
    pub fn new(start: Vec2, width_end: Vec2, length_end: Vec2) -> Self {
        Self {
            start,
            width_end,
            length_end,
        }
    }

    /// Rectangle aligned with the world axes; width along X, length along Z.
    pub fn axis_aligned(min: Vec2, max: Vec2) -> Self {
        Self {
            start: min,
            width_end: Vec2::new(max.x, min.y),
            length_end: Vec2::new(min.x, max.y),
        }
    }

    pub fn width_axis(&self) -> Vec2 {
        self.width_end - self.start
    }

    pub fn length_axis(&self) -> Vec2 {
        self.length_end - self.start
    }

    pub fn width(&self) -> f32 {
        self.width_axis().length()
    }

    pub fn length(&self) -> f32 {
        self.length_axis().length()
    }

    pub fn center(&self) -> Vec2 {
        self.start + (self.width_axis() + self.length_axis()) / 2.0
    }

    /// Corners in winding order, for overlays.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.start,
            self.width_end,
            self.width_end + self.length_axis(),
            self.length_end,
        ]
    }

    /// Point-in-parallelogram test, edges inclusive. Degenerate areas contain
    /// nothing.
    pub fn contains(&self, point: Vec2) -> bool {
        let basis = Mat2::from_cols(self.width_axis(), self.length_axis());
        if basis.determinant().abs() < f32::EPSILON {
            return false;
        }
        let uv = basis.inverse() * (point - self.start);
        (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y)
    }
}

/// A structured storage bunker with fixed walls.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct BunkerSilo {
    pub area: SiteArea,
    pub fill_type: Option<FillType>,
    /// Stored material in litres.
    pub fill_level: f32,
}

/// A loose pile whose bounds were inferred from the material map.
#[derive(Debug, Clone, PartialEq)]
pub struct HeapPile {
    pub area: SiteArea,
    pub fill_type: FillType,
    /// Cubic metres found inside the detected cluster.
    pub volume: f32,
}

/// Outcome of a site search. At most one kind of site is ever reported.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SiteDetection {
    Bunker { entity: Entity, silo: BunkerSilo },
    Heap(HeapPile),
    #[default]
    NotFound,
}

impl SiteDetection {
    pub fn found(&self) -> bool {
        !matches!(self, SiteDetection::NotFound)
    }

    pub fn bunker(&self) -> Option<&BunkerSilo> {
        match self {
            SiteDetection::Bunker { silo, .. } => Some(silo),
            _ => None,
        }
    }

    pub fn heap(&self) -> Option<&HeapPile> {
        match self {
            SiteDetection::Heap(heap) => Some(heap),
            _ => None,
        }
    }

    /// Bounds of whichever site was found.
    pub fn area(&self) -> Option<&SiteArea> {
        match self {
            SiteDetection::Bunker { silo, .. } => Some(&silo.area),
            SiteDetection::Heap(heap) => Some(&heap.area),
            SiteDetection::NotFound => None,
        }
    }
}

/// Side length of one material map cell (metres).
pub const MATERIAL_CELL_SIZE: f32 = 1.0;

/// Cells thinner than this are dropped from the map.
const EMPTY_CELL_HEIGHT: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialCell {
    pub fill_type: FillType,
    /// Material height above terrain (metres).
    pub height: f32,
}

/// Loose material lying on the terrain, on a 1 m grid keyed by cell index.
#[derive(Resource, Debug, Clone, Default)]
pub struct MaterialMap {
    pub cells: HashMap<(i32, i32), MaterialCell>,
}

impl MaterialMap {
    pub fn cell_index(point: Vec2) -> (i32, i32) {
        (
            (point.x / MATERIAL_CELL_SIZE).floor() as i32,
            (point.y / MATERIAL_CELL_SIZE).floor() as i32,
        )
    }

    pub fn cell_center(index: (i32, i32)) -> Vec2 {
        Vec2::new(
            (index.0 as f32 + 0.5) * MATERIAL_CELL_SIZE,
            (index.1 as f32 + 0.5) * MATERIAL_CELL_SIZE,
        )
    }

    pub fn cell_at(&self, point: Vec2) -> Option<&MaterialCell> {
        self.cells.get(&Self::cell_index(point))
    }

    pub fn height_at(&self, point: Vec2) -> f32 {
        self.cell_at(point).map_or(0.0, |c| c.height)
    }

    /// Pile material onto the cell containing `point`. A different fill type
    /// replaces whatever was there.
    pub fn add_material(&mut self, point: Vec2, fill_type: FillType, height: f32) {
        if height <= 0.0 {
            return;
        }
        let cell = self
            .cells
            .entry(Self::cell_index(point))
            .or_insert(MaterialCell {
                fill_type,
                height: 0.0,
            });
        if cell.fill_type != fill_type {
            *cell = MaterialCell {
                fill_type,
                height: 0.0,
            };
        }
        cell.height += height;
    }

    /// Take up to `height` metres off the cell containing `point`; returns the
    /// amount removed.
    pub fn remove_material(&mut self, point: Vec2, height: f32) -> f32 {
        let index = Self::cell_index(point);
        let Some(cell) = self.cells.get_mut(&index) else {
            return 0.0;
        };
        let removed = height.max(0.0).min(cell.height);
        cell.height -= removed;
        if cell.height <= EMPTY_CELL_HEIGHT {
            self.cells.remove(&index);
        }
        removed
    }

    /// Cubic metres of material in cells whose centre lies inside `area`.
    pub fn volume_in(&self, area: &SiteArea) -> f32 {
        self.cells
            .iter()
            .filter(|(index, _)| area.contains(Self::cell_center(**index)))
            .map(|(_, cell)| cell.height * MATERIAL_CELL_SIZE * MATERIAL_CELL_SIZE)
            .sum()
    }

    /// Drop a roughly conical heap around `center`. Deterministic per seed.
    pub fn scatter_heap(
        &mut self,
        center: Vec2,
        radius: f32,
        peak: f32,
        fill_type: FillType,
        seed: u64,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (min_x, min_z) = Self::cell_index(center - Vec2::splat(radius));
        let (max_x, max_z) = Self::cell_index(center + Vec2::splat(radius));
        for cx in min_x..=max_x {
            for cz in min_z..=max_z {
                let c = Self::cell_center((cx, cz));
                let distance = c.distance(center);
                if distance > radius {
                    continue;
                }
                let height = peak * (1.0 - distance / radius) * rng.gen_range(0.85f32..1.0);
                self.add_material(c, fill_type, height);
            }
        }
    }
}
