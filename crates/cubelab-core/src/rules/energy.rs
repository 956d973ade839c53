//! Energy/resource dynamics: decay, diffusion, nutrient injection, starvation,
//! energy-funded reproduction and colour-versus-colour energy competition.
//!
//! The stages run in a fixed order over scratch buffers and every stage ends by
//! clamping energy and nutrients into `[0, 1]`. Empty cells carry no energy;
//! nutrients belong to the medium and persist on empty cells.

use crate::config::EnergyConfig;
use crate::state::{EnergyCell, Vec3};
use crate::{CubeTopology, Grid};

/// Largest amount of stored nutrients converted into energy per tick.
const NUTRIENT_CONVERSION_CAP: f32 = 0.1;
/// Share of the energy difference moved per competing pair (scaled by the transfer rate).
const COMPETITION_SHARE: f32 = 0.5;
/// Minimum number of well-fed neighbors needed before an empty cell is born.
const BIRTH_QUORUM: usize = 2;

fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn clamp_all(values: &mut [f32]) {
    for value in values {
        *value = clamp01(*value);
    }
}

/// Produce the next generation under the energy rule.
#[must_use]
pub fn step(
    grid: &Grid,
    cells: &[EnergyCell],
    topology: &CubeTopology,
    config: &EnergyConfig,
) -> (Grid, Vec<EnergyCell>) {
    let len = grid.len();
    let mut next = grid.clone();
    let mut energy: Vec<f32> = (0..len)
        .map(|i| match (grid.is_alive(i), cells.get(i)) {
            (true, Some(cell)) => clamp01(cell.energy),
            _ => 0.0,
        })
        .collect();
    let mut nutrients: Vec<f32> = (0..len)
        .map(|i| cells.get(i).map_or(0.0, |cell| clamp01(cell.nutrients)))
        .collect();

    stage_decay(&next, &mut energy, &mut nutrients, config);
    stage_diffusion(&next, topology, &mut energy, config);
    stage_injection(topology, &mut nutrients, config);
    stage_starvation(&mut next, &mut energy, config);
    stage_reproduction(&mut next, topology, &mut energy, config);
    stage_competition(&next, topology, &mut energy, config);

    let next_cells = (0..len)
        .map(|index| EnergyCell {
            energy: energy[index],
            nutrients: nutrients[index],
            flow: flow_vector(&next, topology, &energy, index),
        })
        .collect();
    (next, next_cells)
}

fn stage_decay(grid: &Grid, energy: &mut [f32], nutrients: &mut [f32], config: &EnergyConfig) {
    for index in 0..grid.len() {
        if !grid.is_alive(index) {
            continue;
        }
        let converted = nutrients[index].min(NUTRIENT_CONVERSION_CAP);
        nutrients[index] -= converted;
        energy[index] = clamp01(energy[index] + converted) - config.base_decay_rate;
    }
    clamp_all(energy);
    clamp_all(nutrients);
}

fn stage_diffusion(
    grid: &Grid,
    topology: &CubeTopology,
    energy: &mut [f32],
    config: &EnergyConfig,
) {
    if config.diffusion_rate <= 0.0 {
        return;
    }
    let previous = energy.to_vec();
    let mut living = Vec::with_capacity(26);
    for index in 0..grid.len() {
        if !grid.is_alive(index) {
            continue;
        }
        living.clear();
        living.extend(
            topology
                .neighbors(index)
                .iter()
                .copied()
                .filter(|&n| grid.is_alive(n)),
        );
        if living.is_empty() {
            continue;
        }
        let outgoing = previous[index] * config.diffusion_rate;
        let share = outgoing / living.len() as f32;
        energy[index] -= outgoing;
        for &neighbor in &living {
            energy[neighbor] += share;
        }
    }
    clamp_all(energy);
}

fn stage_injection(topology: &CubeTopology, nutrients: &mut [f32], config: &EnergyConfig) {
    for &[x, y, z] in &config.injection_points {
        if let Some(index) = topology.checked_index(x, y, z) {
            nutrients[index] = clamp01(nutrients[index] + config.injection_rate);
        }
    }
}

fn stage_starvation(grid: &mut Grid, energy: &mut [f32], config: &EnergyConfig) {
    for index in 0..grid.len() {
        if grid.is_alive(index) && energy[index] < config.death_threshold {
            grid.set(index, None);
            energy[index] = 0.0;
        }
    }
}

fn stage_reproduction(
    grid: &mut Grid,
    topology: &CubeTopology,
    energy: &mut [f32],
    config: &EnergyConfig,
) {
    let cost = config.birth_energy_cost;
    let parents_alive: Vec<bool> = (0..grid.len()).map(|i| grid.is_alive(i)).collect();
    for index in 0..grid.len() {
        if parents_alive[index] {
            continue;
        }
        let mut eligible = 0usize;
        let mut parent: Option<usize> = None;
        for &neighbor in topology.neighbors(index) {
            if !parents_alive[neighbor] || energy[neighbor] <= cost {
                continue;
            }
            eligible += 1;
            if parent.is_none_or(|best| energy[neighbor] > energy[best]) {
                parent = Some(neighbor);
            }
        }
        let Some(parent) = parent else {
            continue;
        };
        if eligible < BIRTH_QUORUM {
            continue;
        }
        grid.set(index, grid.get(parent));
        energy[index] = clamp01(cost / 2.0);
        energy[parent] = clamp01(energy[parent] - cost);
    }
}

fn stage_competition(
    grid: &Grid,
    topology: &CubeTopology,
    energy: &mut [f32],
    config: &EnergyConfig,
) {
    if config.energy_transfer_rate <= 0.0 || config.competition_radius == 0 {
        return;
    }
    let previous = energy.to_vec();
    let mut delta = vec![0.0_f32; energy.len()];
    for index in 0..grid.len() {
        let Some(color) = grid.get(index) else {
            continue;
        };
        topology.neighbors_within(index, config.competition_radius, &mut |other, _| {
            // Each unordered pair once.
            if other <= index {
                return;
            }
            let Some(other_color) = grid.get(other) else {
                return;
            };
            if other_color == color {
                return;
            }
            let transfer = (previous[index] - previous[other])
                * config.energy_transfer_rate
                * COMPETITION_SHARE;
            delta[index] -= transfer;
            delta[other] += transfer;
        });
    }
    for (value, change) in energy.iter_mut().zip(delta) {
        *value = clamp01(*value + change);
    }
}

/// Unit vector pointing up the local energy gradient; zero for empty or flat cells.
fn flow_vector(grid: &Grid, topology: &CubeTopology, energy: &[f32], index: usize) -> Vec3 {
    if !grid.is_alive(index) {
        return Vec3::ZERO;
    }
    let origin = topology.coord(index);
    let mut flow = Vec3::ZERO;
    for &neighbor in topology.neighbors(index) {
        if !grid.is_alive(neighbor) {
            continue;
        }
        let coord = topology.coord(neighbor);
        let direction = Vec3::new(
            coord.x as f32 - origin.x as f32,
            coord.y as f32 - origin.y as f32,
            coord.z as f32 - origin.z as f32,
        );
        flow += direction * (energy[neighbor] - energy[index]);
    }
    flow.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::init_energy;
    use crate::{Color, Coord};

    fn quiet_config() -> EnergyConfig {
        EnergyConfig {
            base_decay_rate: 0.0,
            diffusion_rate: 0.0,
            energy_transfer_rate: 0.0,
            death_threshold: 0.0,
            birth_energy_cost: 2.0,
            ..EnergyConfig::default()
        }
    }

    #[test]
    fn energy_and_nutrients_stay_clamped() {
        let topology = CubeTopology::new(4).expect("topology");
        let mut grid = Grid::empty(4);
        for index in (0..64).step_by(3) {
            grid.set(index, Some(Color::wrapping(index)));
        }
        let mut cells = init_energy(&grid);
        for (i, cell) in cells.iter_mut().enumerate() {
            cell.energy = if i % 2 == 0 { 5.0 } else { -3.0 };
            cell.nutrients = 2.0;
        }
        let config = EnergyConfig {
            injection_points: vec![[0, 0, 0], [0, 0, 0], [1, 1, 1], [-1, 2, 9]],
            injection_rate: 0.9,
            energy_transfer_rate: 3.0,
            diffusion_rate: 0.8,
            ..EnergyConfig::default()
        };
        let (mut grid, mut cells) = step(&grid, &cells, &topology, &config);
        for _ in 0..10 {
            for cell in &cells {
                assert!((0.0..=1.0).contains(&cell.energy), "energy {}", cell.energy);
                assert!((0.0..=1.0).contains(&cell.nutrients), "nutrients {}", cell.nutrients);
            }
            (grid, cells) = step(&grid, &cells, &topology, &config);
        }
    }

    #[test]
    fn decay_consumes_nutrients_first() {
        let topology = CubeTopology::new(3).expect("topology");
        let mut grid = Grid::empty(3);
        grid.set(13, Some(Color(0)));
        let mut cells = init_energy(&grid);
        cells[13].nutrients = 0.25;
        let config = EnergyConfig {
            base_decay_rate: 0.05,
            ..quiet_config()
        };
        let (next, next_cells) = step(&grid, &cells, &topology, &config);
        assert!(next.is_alive(13));
        assert!((next_cells[13].energy - 0.55).abs() < 1e-6);
        assert!((next_cells[13].nutrients - 0.15).abs() < 1e-6);
    }

    #[test]
    fn diffusion_spreads_evenly_over_living_neighbors() {
        let topology = CubeTopology::new(3).expect("topology");
        let mut grid = Grid::empty(3);
        grid.set(0, Some(Color(0)));
        grid.set(1, Some(Color(0)));
        let mut cells = init_energy(&grid);
        cells[0].energy = 0.8;
        cells[1].energy = 0.0;
        let config = EnergyConfig {
            diffusion_rate: 0.25,
            ..quiet_config()
        };
        let (_, next_cells) = step(&grid, &cells, &topology, &config);
        assert!((next_cells[0].energy - 0.6).abs() < 1e-6);
        assert!((next_cells[1].energy - 0.2).abs() < 1e-6);
        assert!(next_cells[1].flow.x < 0.0, "flow points towards richer cell");
    }

    #[test]
    fn starving_cells_die_and_drop_their_energy() {
        let topology = CubeTopology::new(2).expect("topology");
        let mut grid = Grid::empty(2);
        grid.set(0, Some(Color(3)));
        let mut cells = init_energy(&grid);
        cells[0].energy = 0.02;
        let config = EnergyConfig {
            death_threshold: 0.05,
            ..quiet_config()
        };
        let (next, next_cells) = step(&grid, &cells, &topology, &config);
        assert_eq!(next.population(), 0);
        assert_eq!(next_cells[0].energy, 0.0);
    }

    #[test]
    fn richest_neighbor_parents_the_child() {
        let topology = CubeTopology::new(3).expect("topology");
        let centre = topology.index(Coord::new(1, 1, 1));
        let mut grid = Grid::filled(3, Color(0));
        grid.set(centre, None);
        let mut cells = init_energy(&grid);
        for cell in cells.iter_mut() {
            cell.energy = 0.1;
        }
        let rich = topology.index(Coord::new(0, 1, 1));
        let richer = topology.index(Coord::new(2, 1, 1));
        grid.set(richer, Some(Color(4)));
        cells[rich].energy = 0.9;
        cells[richer].energy = 0.95;
        let config = EnergyConfig {
            birth_energy_cost: 0.4,
            ..quiet_config()
        };
        let (next, next_cells) = step(&grid, &cells, &topology, &config);
        assert_eq!(next.get(centre), Some(Color(4)));
        assert!((next_cells[centre].energy - 0.2).abs() < 1e-6);
        assert!((next_cells[richer].energy - 0.55).abs() < 1e-6);
        assert!((next_cells[rich].energy - 0.9).abs() < 1e-6);
    }

    #[test]
    fn single_fed_neighbor_is_not_enough_for_birth() {
        let topology = CubeTopology::new(3).expect("topology");
        let mut grid = Grid::empty(3);
        grid.set(0, Some(Color(2)));
        let mut cells = init_energy(&grid);
        cells[0].energy = 1.0;
        let config = EnergyConfig {
            birth_energy_cost: 0.2,
            ..quiet_config()
        };
        let (next, _) = step(&grid, &cells, &topology, &config);
        assert_eq!(next.population(), 1);
    }

    #[test]
    fn competition_moves_energy_between_colours() {
        let topology = CubeTopology::new(2).expect("topology");
        let mut grid = Grid::empty(2);
        grid.set(0, Some(Color(0)));
        grid.set(1, Some(Color(1)));
        let mut cells = init_energy(&grid);
        cells[0].energy = 0.9;
        cells[1].energy = 0.1;
        let config = EnergyConfig {
            energy_transfer_rate: 0.5,
            ..quiet_config()
        };
        let (_, next_cells) = step(&grid, &cells, &topology, &config);
        // (0.9 - 0.1) * 0.5 * 0.5 = 0.2
        assert!((next_cells[0].energy - 0.7).abs() < 1e-6);
        assert!((next_cells[1].energy - 0.3).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_injection_points_are_ignored() {
        let topology = CubeTopology::new(2).expect("topology");
        let grid = Grid::empty(2);
        let cells = init_energy(&grid);
        let config = EnergyConfig {
            injection_points: vec![[5, 0, 0], [0, -1, 0], [1, 1, 1]],
            injection_rate: 0.3,
            ..quiet_config()
        };
        let (_, next_cells) = step(&grid, &cells, &topology, &config);
        assert!((next_cells[7].nutrients - 0.3).abs() < 1e-6);
        assert_eq!(next_cells.iter().filter(|c| c.nutrients > 0.0).count(), 1);
    }
}
