//! Initial colour patterns.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{COLOR_COUNT, Color, Coord, Grid, coord_to_index};

/// Default fraction of living cells in a sparse random start.
pub const DEFAULT_DENSITY: f32 = 0.15;
/// Fill fraction inside the seeded cluster.
const CLUSTER_DENSITY: f64 = 0.6;

/// How a run's first grid is produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartPattern {
    /// Every cell is alive with probability `density`, colour uniform.
    SparseRandom { density: f32 },
    /// Dense random blob around the centre of the cube.
    CenteredCluster,
}

impl Default for StartPattern {
    fn default() -> Self {
        StartPattern::SparseRandom {
            density: DEFAULT_DENSITY,
        }
    }
}

impl StartPattern {
    pub fn generate(self, size: usize, rng: &mut impl Rng) -> Grid {
        match self {
            StartPattern::SparseRandom { density } => sparse_random(size, density, rng),
            StartPattern::CenteredCluster => centered_cluster(size, rng),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            StartPattern::SparseRandom { .. } => "random",
            StartPattern::CenteredCluster => "cluster",
        }
    }
}

fn random_color(rng: &mut impl Rng) -> Color {
    Color(rng.random_range(0..COLOR_COUNT as u8))
}

/// Each cell alive with probability `density` (clamped into `[0, 1]`).
pub fn sparse_random(size: usize, density: f32, rng: &mut impl Rng) -> Grid {
    let density = if density.is_nan() {
        0.0
    } else {
        f64::from(density.clamp(0.0, 1.0))
    };
    let mut grid = Grid::empty(size);
    for index in 0..grid.len() {
        if rng.random_bool(density) {
            grid.set(index, Some(random_color(rng)));
        }
    }
    grid
}

/// Random blob inside the central cube of side `max(1, size / 2)`.
pub fn centered_cluster(size: usize, rng: &mut impl Rng) -> Grid {
    let mut grid = Grid::empty(size);
    if size == 0 {
        return grid;
    }
    let extent = (size / 2).max(1);
    let start = (size - extent) / 2;
    for z in start..start + extent {
        for y in start..start + extent {
            for x in start..start + extent {
                if rng.random_bool(CLUSTER_DENSITY) {
                    let index = coord_to_index(Coord::new(x, y, z), size);
                    grid.set(index, Some(random_color(rng)));
                }
            }
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn sparse_random_respects_density_extremes() {
        let mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(sparse_random(4, 0.0, &mut rng).population(), 0);
        assert_eq!(sparse_random(4, 1.0, &mut rng).population(), 64);
        assert_eq!(sparse_random(4, f32::NAN, &mut rng).population(), 0);
        let grid = sparse_random(10, 0.2, &mut rng);
        let fraction = grid.population() as f32 / 1000.0;
        assert!((0.1..0.3).contains(&fraction), "fraction {fraction}");
    }

    #[test]
    fn same_seed_same_pattern() {
        let a = StartPattern::default().generate(6, &mut SmallRng::seed_from_u64(99));
        let b = StartPattern::default().generate(6, &mut SmallRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn cluster_stays_in_the_middle() {
        let mut rng = SmallRng::seed_from_u64(3);
        let grid = centered_cluster(8, &mut rng);
        assert!(grid.population() > 0);
        for (index, cell) in grid.cells().iter().enumerate() {
            if cell.is_some() {
                let coord = crate::index_to_coord(index, 8);
                for axis in [coord.x, coord.y, coord.z] {
                    assert!((2..6).contains(&axis));
                }
            }
        }
    }

    #[test]
    fn single_cell_cluster() {
        let mut rng = SmallRng::seed_from_u64(0);
        let grid = centered_cluster(1, &mut rng);
        assert!(grid.population() <= 1);
        assert_eq!(grid.len(), 1);
    }
}
