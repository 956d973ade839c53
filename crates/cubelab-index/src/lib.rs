//! Cubic grid topology and Moore-neighborhood lookup shared by every CubeLab rule.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of offsets in a full 3D Moore neighborhood.
pub const MOORE_NEIGHBORS: usize = 26;

/// Errors emitted while building a topology.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// Indicates configuration values that cannot be used (e.g., a zero cube size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Integer lattice coordinate inside a cube.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Coord {
    #[must_use]
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Coordinate as floating point components, used by spatial metrics.
    #[must_use]
    pub fn to_f32(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}

/// Converts a linear index into a coordinate for a cube of side `size`.
#[must_use]
pub const fn index_to_coord(index: usize, size: usize) -> Coord {
    Coord {
        x: index % size,
        y: (index / size) % size,
        z: index / (size * size),
    }
}

/// Converts a coordinate into a linear index (`x + y·n + z·n²`).
#[must_use]
pub const fn coord_to_index(coord: Coord, size: usize) -> usize {
    coord.x + coord.y * size + coord.z * size * size
}

/// Precomputed neighborhood tables for a cube of fixed side length.
///
/// Neighbor lists are stored in a flat table with per-cell offsets so rules can
/// borrow a slice for any cell without allocating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeTopology {
    size: usize,
    offsets: Vec<usize>,
    neighbors: Vec<usize>,
    edge: Vec<bool>,
}

impl CubeTopology {
    /// Build the neighbor tables for a cube with the provided side length.
    pub fn new(size: usize) -> Result<Self, TopologyError> {
        if size == 0 {
            return Err(TopologyError::InvalidConfig("cube size must be positive"));
        }
        let cells = size
            .checked_pow(3)
            .ok_or(TopologyError::InvalidConfig("cube size overflows the index space"))?;

        let mut offsets = Vec::with_capacity(cells + 1);
        let mut neighbors = Vec::with_capacity(cells * MOORE_NEIGHBORS);
        let mut edge = Vec::with_capacity(cells);
        offsets.push(0);
        for index in 0..cells {
            let coord = index_to_coord(index, size);
            collect_ball(coord, size, 1, &mut |neighbor, _| neighbors.push(neighbor));
            offsets.push(neighbors.len());
            edge.push(is_boundary(coord, size));
        }

        Ok(Self {
            size,
            offsets,
            neighbors,
            edge,
        })
    }

    /// Side length of the cube.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells (`size³`).
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.edge.len()
    }

    #[must_use]
    pub const fn coord(&self, index: usize) -> Coord {
        index_to_coord(index, self.size)
    }

    #[must_use]
    pub const fn index(&self, coord: Coord) -> usize {
        coord_to_index(coord, self.size)
    }

    /// Index of a signed coordinate, or `None` when it falls outside the cube.
    #[must_use]
    pub fn checked_index(&self, x: i64, y: i64, z: i64) -> Option<usize> {
        let n = self.size as i64;
        if (0..n).contains(&x) && (0..n).contains(&y) && (0..n).contains(&z) {
            Some(self.index(Coord::new(x as usize, y as usize, z as usize)))
        } else {
            None
        }
    }

    /// Clipped Moore neighbors of `index` in ascending offset order
    /// (`dz`, then `dy`, then `dx`, each from -1 to 1).
    #[must_use]
    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.neighbors[self.offsets[index]..self.offsets[index + 1]]
    }

    /// True when any coordinate of the cell sits on the cube boundary.
    #[must_use]
    pub fn is_edge(&self, index: usize) -> bool {
        self.edge[index]
    }

    /// Visit every cell within Chebyshev distance `radius` of `index`,
    /// excluding the cell itself, together with its Euclidean distance.
    ///
    /// Radius 1 visits exactly the cells returned by [`Self::neighbors`].
    pub fn neighbors_within(
        &self,
        index: usize,
        radius: usize,
        visitor: &mut dyn FnMut(usize, f32),
    ) {
        if radius == 1 {
            let origin = self.coord(index);
            for &neighbor in self.neighbors(index) {
                visitor(neighbor, distance(origin, self.coord(neighbor)));
            }
            return;
        }
        collect_ball(self.coord(index), self.size, radius, visitor);
    }
}

fn is_boundary(coord: Coord, size: usize) -> bool {
    let last = size - 1;
    coord.x == 0
        || coord.y == 0
        || coord.z == 0
        || coord.x == last
        || coord.y == last
        || coord.z == last
}

fn distance(a: Coord, b: Coord) -> f32 {
    let dx = a.x as f32 - b.x as f32;
    let dy = a.y as f32 - b.y as f32;
    let dz = a.z as f32 - b.z as f32;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

fn collect_ball(origin: Coord, size: usize, radius: usize, visitor: &mut dyn FnMut(usize, f32)) {
    let r = radius as i64;
    let n = size as i64;
    let (ox, oy, oz) = (origin.x as i64, origin.y as i64, origin.z as i64);
    for dz in -r..=r {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 && dz == 0 {
                    continue;
                }
                let (x, y, z) = (ox + dx, oy + dy, oz + dz);
                if x < 0 || y < 0 || z < 0 || x >= n || y >= n || z >= n {
                    continue;
                }
                let coord = Coord::new(x as usize, y as usize, z as usize);
                let dist = ((dx * dx + dy * dy + dz * dz) as f32).sqrt();
                visitor(coord_to_index(coord, size), dist);
            }
        }
    }
}
