//! Core types shared across the CubeLab workspace: the colour grid, per-cell
//! state, the five update rules, the simulation driver and trajectory analysis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cubelab_index::{Coord, CubeTopology, TopologyError, coord_to_index, index_to_coord};

pub mod analysis;
pub mod config;
pub mod pattern;
pub mod rules;
pub mod simulation;
pub mod state;

pub use analysis::{
    Classification, GenerationSnapshot, SimulationMetrics, SimulationResult, analyze, classify,
    detect_oscillation, interest_score,
};
pub use config::{
    Algorithm, AlgorithmKind, CompetitionConfig, EnergyConfig, GateKind, InfoConfig, LifeConfig,
    MagnetConfig, OscillatorClock, Ruleset,
};
pub use simulation::{RunStatus, Simulation, TickReport};
pub use state::{CellStates, EnergyCell, InfoCell, LifeCell, MagnetCell, Vec3};

/// Number of distinct cell colours.
pub const COLOR_COUNT: usize = 6;

/// Colour index of a living cell, always below [`COLOR_COUNT`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Color(pub u8);

impl Color {
    /// Colour for an arbitrary integer, wrapped into the palette.
    #[must_use]
    pub const fn wrapping(value: usize) -> Self {
        Color((value % COLOR_COUNT) as u8)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Errors raised while setting up a simulation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The initial pattern does not match the cube.
    #[error("initial pattern has {actual} cells, expected {expected}")]
    PatternLength { expected: usize, actual: usize },
    /// A pattern cell carries a colour outside the palette.
    #[error("cell {index} has colour {color}, palette holds 6 colours")]
    ColorOutOfRange { index: usize, color: u8 },
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Dense colour grid of `size³` cells; `None` marks an empty cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Option<Color>>,
}

impl Grid {
    /// All-empty grid for a cube of side `size`.
    #[must_use]
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size * size],
        }
    }

    /// Wrap an explicit cell sequence, validating length and palette.
    pub fn from_cells(size: usize, cells: Vec<Option<Color>>) -> Result<Self, SimulationError> {
        let grid = Self { size, cells };
        grid.validate()?;
        Ok(grid)
    }

    /// Check that the grid holds `size³` cells and every colour is in the palette.
    ///
    /// Grids built through [`Grid::set`] always pass; deserialized ones may not.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let expected = self.size * self.size * self.size;
        if self.cells.len() != expected {
            return Err(SimulationError::PatternLength {
                expected,
                actual: self.cells.len(),
            });
        }
        if let Some((index, color)) = self
            .cells
            .iter()
            .enumerate()
            .find_map(|(index, cell)| {
                (*cell)
                    .filter(|c| c.index() >= COLOR_COUNT)
                    .map(|c| (index, c))
            })
        {
            return Err(SimulationError::ColorOutOfRange {
                index,
                color: color.0,
            });
        }
        Ok(())
    }

    /// Grid filled with a single colour.
    #[must_use]
    pub fn filled(size: usize, color: Color) -> Self {
        Self {
            size,
            cells: vec![Some(color); size * size * size],
        }
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn cells(&self) -> &[Option<Color>] {
        &self.cells
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Color> {
        self.cells.get(index).copied().flatten()
    }

    #[must_use]
    pub fn is_alive(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Overwrite one cell. Out-of-range indices and colours outside the
    /// palette are ignored.
    pub fn set(&mut self, index: usize, cell: Option<Color>) {
        if cell.is_some_and(|c| c.index() >= COLOR_COUNT) {
            return;
        }
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = cell;
        }
    }

    /// Number of living cells.
    #[must_use]
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Living cells per colour.
    #[must_use]
    pub fn color_histogram(&self) -> [usize; COLOR_COUNT] {
        let mut counts = [0usize; COLOR_COUNT];
        for color in self.cells.iter().flatten() {
            counts[color.index() % COLOR_COUNT] += 1;
        }
        counts
    }

    /// Non-zero colour counts keyed by colour index.
    #[must_use]
    pub fn color_counts(&self) -> BTreeMap<u8, usize> {
        self.color_histogram()
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(color, count)| (color as u8, *count))
            .collect()
    }

    /// Mean coordinate of living cells; the origin for an empty grid.
    #[must_use]
    pub fn center_of_mass(&self) -> Vec3 {
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;
        for (index, cell) in self.cells.iter().enumerate() {
            if cell.is_some() {
                let [x, y, z] = index_to_coord(index, self.size).to_f32();
                sum += Vec3::new(x, y, z);
                count += 1;
            }
        }
        if count == 0 {
            Vec3::ZERO
        } else {
            sum * (1.0 / count as f32)
        }
    }

    /// Number of cells whose colour differs from `other`.
    #[must_use]
    pub fn changes_from(&self, other: &Grid) -> usize {
        self.cells
            .iter()
            .zip(&other.cells)
            .filter(|(a, b)| a != b)
            .count()
    }
}
