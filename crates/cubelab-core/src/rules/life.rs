//! 3-D Life: birth/survival on the total count of living Moore neighbors.

use super::{dominant_color, neighbor_colors};
use crate::config::LifeConfig;
use crate::state::LifeCell;
use crate::{Color, CubeTopology, Grid};

/// Colour of the age band a cell falls into.
///
/// Bands cover fifths of `max_age`: `[0, .2) → 0`, `[.2, .4) → 3`, `[.4, .6) → 2`,
/// `[.6, .8) → 1`, `[.8, 1] → 4`.
#[must_use]
pub fn age_color(age: u32, max_age: u32) -> Color {
    let ratio = if max_age == 0 {
        0.0
    } else {
        age as f32 / max_age as f32
    };
    let band = if ratio < 0.2 {
        0
    } else if ratio < 0.4 {
        3
    } else if ratio < 0.6 {
        2
    } else if ratio < 0.8 {
        1
    } else {
        4
    };
    Color(band)
}

/// Neighbor count after applying the edge bias to boundary cells.
#[must_use]
pub fn effective_neighbors(raw: u32, is_edge: bool, edge_bias: f32) -> u8 {
    if !is_edge {
        return raw.min(u32::from(u8::MAX)) as u8;
    }
    let biased = (raw as f32 * edge_bias).round();
    if biased.is_finite() {
        biased.clamp(0.0, f32::from(u8::MAX)) as u8
    } else {
        0
    }
}

/// Produce the next generation under 3-D Life.
///
/// Birth needs at least one living neighbor to inherit a colour from, even when
/// the birth set contains the biased count 0.
#[must_use]
pub fn step(
    grid: &Grid,
    cells: &[LifeCell],
    topology: &CubeTopology,
    config: &LifeConfig,
) -> (Grid, Vec<LifeCell>) {
    let mut next = Grid::empty(grid.size());
    let mut next_cells = vec![LifeCell::default(); grid.len()];

    for index in 0..grid.len() {
        let counts = neighbor_colors(grid, topology, index);
        let raw: u32 = counts.iter().map(|&c| u32::from(c)).sum();
        let effective = effective_neighbors(raw, topology.is_edge(index), config.edge_bias);
        let age = cells.get(index).map_or(0, |cell| cell.age);

        let survivor = match grid.get(index) {
            Some(color) if config.survival_neighbors.contains(&effective) => Some((color, age)),
            Some(_) => None,
            None if config.birth_neighbors.contains(&effective) => {
                dominant_color(&counts).map(|(color, _)| (color, 0))
            }
            None => None,
        };

        if let Some((color, age)) = survivor {
            let age = age.saturating_add(1).min(config.max_age);
            let color = if config.use_age_colors {
                age_color(age, config.max_age)
            } else {
                color
            };
            next.set(index, Some(color));
            next_cells[index].age = age;
        }
    }

    (next, next_cells)
}
