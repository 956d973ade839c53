//! The five update laws.
//!
//! Every law reads only the current generation and returns a fresh grid and state
//! array, touching each cell exactly once.

use rand::rngs::SmallRng;

use crate::config::Algorithm;
use crate::state::{self, CellStates};
use crate::{COLOR_COUNT, Color, CubeTopology, Grid};

pub mod competition;
pub mod energy;
pub mod info;
pub mod life;
pub mod magnet;

/// Inputs a rule may read besides the grid and state.
pub struct RuleContext<'a> {
    /// Generation being produced (1 for the first tick).
    pub generation: u64,
    /// Run-private random source, seeded by the driver.
    pub rng: &'a mut SmallRng,
}

/// Apply `algorithm` once, producing the next grid and state.
///
/// A state payload belonging to another algorithm is discarded and rebuilt
/// from the grid first.
pub fn apply(
    algorithm: &Algorithm,
    grid: &Grid,
    states: &CellStates,
    topology: &CubeTopology,
    ctx: &mut RuleContext<'_>,
) -> (Grid, CellStates) {
    match algorithm {
        Algorithm::Competition(config) => (
            competition::step(grid, topology, config),
            CellStates::Competition,
        ),
        Algorithm::Life3d(config) => {
            let fresh;
            let cells = match states.life() {
                Some(cells) => cells,
                None => {
                    fresh = state::init_life(grid);
                    &fresh
                }
            };
            let (next, cells) = life::step(grid, cells, topology, config);
            (next, CellStates::Life3d(cells))
        }
        Algorithm::Energy(config) => {
            let fresh;
            let cells = match states.energy() {
                Some(cells) => cells,
                None => {
                    fresh = state::init_energy(grid);
                    &fresh
                }
            };
            let (next, cells) = energy::step(grid, cells, topology, config);
            (next, CellStates::Energy(cells))
        }
        Algorithm::Magnet(config) => {
            let fresh;
            let cells = match states.magnet() {
                Some(cells) => cells,
                None => {
                    fresh = state::init_magnet(grid, &mut *ctx.rng);
                    &fresh
                }
            };
            let (next, cells) = magnet::step(grid, cells, topology, config, ctx);
            (next, CellStates::Magnet(cells))
        }
        Algorithm::Info(config) => {
            let fresh;
            let cells = match states.info() {
                Some(cells) => cells,
                None => {
                    fresh = state::init_info(grid, config);
                    &fresh
                }
            };
            let (next, cells) = info::step(grid, cells, topology, config, ctx);
            (next, CellStates::Info(cells))
        }
    }
}

/// Per-colour counts of the living neighbors of `index`.
pub(crate) fn neighbor_colors(
    grid: &Grid,
    topology: &CubeTopology,
    index: usize,
) -> [u8; COLOR_COUNT] {
    let mut counts = [0u8; COLOR_COUNT];
    for &neighbor in topology.neighbors(index) {
        if let Some(slot) = grid.get(neighbor).and_then(|c| counts.get_mut(c.index())) {
            *slot += 1;
        }
    }
    counts
}

/// Most frequent colour and its count.
///
/// Colours are scanned in ascending order and only a strictly greater count
/// replaces the current pick, so ties go to the lowest colour index. Returns
/// `None` when every count is zero.
#[must_use]
pub fn dominant_color(counts: &[u8; COLOR_COUNT]) -> Option<(Color, u8)> {
    let mut best: Option<(Color, u8)> = None;
    for (color, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((Color(color as u8), count));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_color_prefers_lowest_index_on_ties() {
        assert_eq!(dominant_color(&[0, 3, 0, 3, 1, 0]), Some((Color(1), 3)));
        assert_eq!(dominant_color(&[2, 2, 2, 2, 2, 2]), Some((Color(0), 2)));
        assert_eq!(dominant_color(&[0, 0, 0, 0, 0, 4]), Some((Color(5), 4)));
        assert_eq!(dominant_color(&[0; COLOR_COUNT]), None);
    }

    #[test]
    fn neighbor_colors_counts_living_cells() {
        let topology = CubeTopology::new(3).expect("topology");
        let mut grid = Grid::empty(3);
        grid.set(0, Some(Color(1)));
        grid.set(1, Some(Color(1)));
        grid.set(2, Some(Color(4)));
        let counts = neighbor_colors(&grid, &topology, 13);
        assert_eq!(counts, [0, 2, 0, 0, 1, 0]);
    }

    #[test]
    fn neighbor_colors_skips_off_palette_cells() {
        let topology = CubeTopology::new(2).expect("topology");
        let grid: Grid =
            serde_json::from_str(r#"{"size":2,"cells":[9,2,null,null,null,null,null,null]}"#)
                .expect("grid json");
        assert_eq!(neighbor_colors(&grid, &topology, 7), [0, 0, 1, 0, 0, 0]);
    }
}
