//! Fill units and discharge state of implements.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum FillType {
    Silage,
    Chaff,
    Grass,
    Manure,
    Lime,
    Gravel,
}

/// One storage volume on an implement.
#[derive(Debug, Clone, PartialEq)]
pub struct FillUnit {
    /// Stored amount in litres.
    pub level: f32,
    pub capacity: f32,
    /// `None` until material has been picked up; cleared again once empty.
    pub fill_type: Option<FillType>,
}

impl FillUnit {
    pub fn empty(capacity: f32) -> Self {
        Self {
            level: 0.0,
            capacity,
            fill_type: None,
        }
    }

    /// Fill level in percent of capacity, clamped to `[0, 100]`.
    pub fn percentage(&self) -> f32 {
        if self.capacity <= 0.0 {
            return 0.0;
        }
        (self.level / self.capacity * 100.0).clamp(0.0, 100.0)
    }

    /// Add material, returning the amount actually taken.
    pub fn add(&mut self, fill_type: FillType, amount: f32) -> f32 {
        if let Some(current) = self.fill_type {
            if current != fill_type && self.level > 0.0 {
                return 0.0;
            }
        }
        let taken = amount.max(0.0).min(self.capacity - self.level);
        if taken > 0.0 {
            self.level += taken;
            self.fill_type = Some(fill_type);
        }
        taken
    }

    /// Remove material, returning the amount actually removed.
    pub fn remove(&mut self, amount: f32) -> f32 {
        let removed = amount.max(0.0).min(self.level);
        self.level -= removed;
        if self.level <= 0.0 {
            self.level = 0.0;
            self.fill_type = None;
        }
        removed
    }
}

/// All fill units of one implement, addressed by index.
#[derive(Component, Debug, Clone, Default)]
pub struct FillUnits(pub Vec<FillUnit>);

impl FillUnits {
    pub fn get(&self, index: usize) -> Option<&FillUnit> {
        self.0.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut FillUnit> {
        self.0.get_mut(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DischargeState {
    #[default]
    Off,
    Discharging,
}

/// Capability: the implement can expel material from a fill unit.
#[derive(Component, Debug, Clone, Default)]
pub struct Dischargeable {
    pub fill_unit_index: usize,
    pub state: DischargeState,
}
