//! Colour competition: cells adopt the colour that dominates their neighborhood.

use super::{dominant_color, neighbor_colors};
use crate::config::CompetitionConfig;
use crate::{CubeTopology, Grid};

/// Produce the next generation under the competition rule.
#[must_use]
pub fn step(grid: &Grid, topology: &CubeTopology, config: &CompetitionConfig) -> Grid {
    let mut next = Grid::empty(grid.size());
    for index in 0..grid.len() {
        let counts = neighbor_colors(grid, topology, index);
        let dominant = dominant_color(&counts);
        let living: u32 = counts.iter().map(|&c| u32::from(c)).sum();

        let cell = match (grid.get(index), dominant) {
            (None, Some((color, count))) if count >= config.min_neighbors_to_birth => Some(color),
            (None, _) => None,
            (Some(current), Some((color, count)))
                if color != current && count >= config.competition_threshold =>
            {
                Some(color)
            }
            (Some(_), _) if living < u32::from(config.min_neighbors_to_survive) => None,
            (Some(current), _) => Some(current),
        };
        next.set(index, cell);
    }
    next
}
