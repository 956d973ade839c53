//! Per-cell activity records carried alongside the colour grid.
//!
//! Each algorithm owns its own payload; switching algorithms rebuilds the whole
//! array from the colour grid, nothing carries over.

use std::collections::VecDeque;
use std::ops::{Add, AddAssign, Mul, Sub};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Grid;
use crate::config::{Algorithm, InfoConfig};

/// Energy assigned to every coloured cell when the energy rule starts.
pub const INITIAL_ENERGY: f32 = 0.5;

/// Minimal 3-vector used for spins, flows and centres of mass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction; the zero vector (or anything non-finite) maps to zero.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > f32::EPSILON && len.is_finite() {
            self * (1.0 / len)
        } else {
            Vec3::ZERO
        }
    }

    /// Uniformly distributed direction drawn from `rng`.
    pub fn random_unit(rng: &mut impl Rng) -> Self {
        loop {
            let candidate = Vec3::new(
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
            );
            let len = candidate.length();
            if len > 1e-3 && len <= 1.0 {
                return candidate * (1.0 / len);
            }
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// 3-D Life bookkeeping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LifeCell {
    pub age: u32,
}

/// Energy/resource bookkeeping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct EnergyCell {
    pub energy: f32,
    pub nutrients: f32,
    /// Normalised direction of the local energy gradient, diagnostics only.
    pub flow: Vec3,
}

/// Magnetic alignment bookkeeping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MagnetCell {
    pub spin: Vec3,
    /// Length of the neighbor-average spin from the last update.
    pub spin_strength: f32,
    pub temperature: f32,
}

/// Information-processing bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InfoCell {
    /// Gate identifier, looked up in [`InfoConfig::gate_types`].
    pub gate: u8,
    pub output_signal: f32,
    /// Pending inputs of a DELAY gate, oldest first.
    pub input_buffer: VecDeque<f32>,
}

/// Activity fields for every cell, one payload per algorithm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "cells", rename_all = "snake_case")]
pub enum CellStates {
    /// Competition keeps no state beyond the colour grid.
    Competition,
    Life3d(Vec<LifeCell>),
    Energy(Vec<EnergyCell>),
    Magnet(Vec<MagnetCell>),
    Info(Vec<InfoCell>),
}

impl CellStates {
    /// Build fresh activity fields for `algorithm` from a plain colour grid.
    pub fn initialize(algorithm: &Algorithm, grid: &Grid, rng: &mut impl Rng) -> Self {
        match algorithm {
            Algorithm::Competition(_) => CellStates::Competition,
            Algorithm::Life3d(_) => CellStates::Life3d(init_life(grid)),
            Algorithm::Energy(_) => CellStates::Energy(init_energy(grid)),
            Algorithm::Magnet(_) => CellStates::Magnet(init_magnet(grid, rng)),
            Algorithm::Info(config) => CellStates::Info(init_info(grid, config)),
        }
    }

    /// True when the payload belongs to `algorithm`.
    #[must_use]
    pub fn matches(&self, algorithm: &Algorithm) -> bool {
        matches!(
            (self, algorithm),
            (CellStates::Competition, Algorithm::Competition(_))
                | (CellStates::Life3d(_), Algorithm::Life3d(_))
                | (CellStates::Energy(_), Algorithm::Energy(_))
                | (CellStates::Magnet(_), Algorithm::Magnet(_))
                | (CellStates::Info(_), Algorithm::Info(_))
        )
    }

    #[must_use]
    pub fn life(&self) -> Option<&[LifeCell]> {
        match self {
            CellStates::Life3d(cells) => Some(cells),
            _ => None,
        }
    }

    #[must_use]
    pub fn energy(&self) -> Option<&[EnergyCell]> {
        match self {
            CellStates::Energy(cells) => Some(cells),
            _ => None,
        }
    }

    #[must_use]
    pub fn magnet(&self) -> Option<&[MagnetCell]> {
        match self {
            CellStates::Magnet(cells) => Some(cells),
            _ => None,
        }
    }

    #[must_use]
    pub fn info(&self) -> Option<&[InfoCell]> {
        match self {
            CellStates::Info(cells) => Some(cells),
            _ => None,
        }
    }
}

#[must_use]
pub fn init_life(grid: &Grid) -> Vec<LifeCell> {
    vec![LifeCell::default(); grid.len()]
}

#[must_use]
pub fn init_energy(grid: &Grid) -> Vec<EnergyCell> {
    grid.cells()
        .iter()
        .map(|cell| EnergyCell {
            energy: if cell.is_some() { INITIAL_ENERGY } else { 0.0 },
            ..EnergyCell::default()
        })
        .collect()
}

pub fn init_magnet(grid: &Grid, rng: &mut impl Rng) -> Vec<MagnetCell> {
    grid.cells()
        .iter()
        .map(|cell| match cell {
            Some(_) => MagnetCell {
                spin: Vec3::random_unit(rng),
                spin_strength: 1.0,
                temperature: 1.0,
            },
            None => MagnetCell::default(),
        })
        .collect()
}

#[must_use]
pub fn init_info(grid: &Grid, config: &InfoConfig) -> Vec<InfoCell> {
    grid.cells()
        .iter()
        .map(|cell| {
            let gate = match cell {
                Some(color) if config.gate_types.contains_key(&color.0) => color.0,
                _ => 0,
            };
            InfoCell {
                gate,
                ..InfoCell::default()
            }
        })
        .collect()
}
