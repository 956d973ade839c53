//! Trajectory analysis: per-generation snapshots, summary metrics, the
//! interest heuristic and qualitative classification.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::Ruleset;
use crate::pattern::StartPattern;
use crate::simulation::{RunStatus, Simulation};
use crate::state::Vec3;
use crate::{Grid, SimulationError};

/// Number of trailing population samples inspected for oscillation.
pub const OSCILLATION_WINDOW: usize = 20;
/// Shortest and longest period considered an oscillation.
pub const MIN_PERIOD: usize = 2;
pub const MAX_PERIOD: usize = 10;
/// Trailing snapshots inspected for stability and glider motion.
pub const TAIL_WINDOW: usize = 10;
/// Consecutive quiet snapshots marking the onset of stability.
const STABILITY_RUN: usize = 3;
/// Fraction of the cube above which a final population is explosive.
const EXPLOSIVE_FRACTION: f64 = 0.8;
/// Centre-of-mass travel over the tail window that counts as a glider.
const GLIDER_DISTANCE: f64 = 2.0;

/// State of the grid after one tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSnapshot {
    pub generation: u64,
    pub population: usize,
    pub changes: usize,
    pub color_counts: BTreeMap<u8, usize>,
    pub center_of_mass: Vec3,
}

impl GenerationSnapshot {
    #[must_use]
    pub fn capture(generation: u64, grid: &Grid, changes: usize) -> Self {
        Self {
            generation,
            population: grid.population(),
            changes,
            color_counts: grid.color_counts(),
            center_of_mass: grid.center_of_mass(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[default]
    Extinct,
    Stable,
    Oscillating,
    Chaotic,
    Explosive,
    Glider,
}

impl Classification {
    pub const ALL: [Classification; 6] = [
        Classification::Extinct,
        Classification::Stable,
        Classification::Oscillating,
        Classification::Chaotic,
        Classification::Explosive,
        Classification::Glider,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Classification::Extinct => "extinct",
            Classification::Stable => "stable",
            Classification::Oscillating => "oscillating",
            Classification::Chaotic => "chaotic",
            Classification::Explosive => "explosive",
            Classification::Glider => "glider",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one trajectory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SimulationMetrics {
    pub total_generations: u64,
    pub max_population: usize,
    pub avg_population: f64,
    pub final_population: usize,
    pub avg_change_per_generation: f64,
    /// Colours present in the final grid.
    pub color_diversity: usize,
    /// First generation of the earliest run of three quiet snapshots.
    pub stability_generation: Option<u64>,
    /// Detected population period, 0 when aperiodic.
    pub oscillation_period: usize,
    pub spatial_distribution: f64,
    pub interest_score: u32,
    pub classification: Classification,
}

impl SimulationMetrics {
    /// Derive metrics from the tick snapshots of a run. `initial` stands in
    /// for the final state when no tick was taken.
    #[must_use]
    pub fn from_snapshots(
        initial: &GenerationSnapshot,
        snapshots: &[GenerationSnapshot],
        cell_count: usize,
    ) -> Self {
        let last = snapshots.last().unwrap_or(initial);
        let populations: Vec<usize> = snapshots.iter().map(|s| s.population).collect();

        let (max_population, avg_population, avg_change_per_generation) = if snapshots.is_empty() {
            (initial.population, initial.population as f64, 0.0)
        } else {
            let count = snapshots.len() as f64;
            let total_population: usize = populations.iter().sum();
            let total_changes: usize = snapshots.iter().map(|s| s.changes).sum();
            (
                populations.iter().copied().max().unwrap_or(0),
                total_population as f64 / count,
                total_changes as f64 / count,
            )
        };

        let mut metrics = Self {
            total_generations: snapshots.len() as u64,
            max_population,
            avg_population,
            final_population: last.population,
            avg_change_per_generation,
            color_diversity: last.color_counts.values().filter(|&&n| n > 0).count(),
            stability_generation: stability_generation(snapshots),
            oscillation_period: detect_oscillation(&populations),
            spatial_distribution: spatial_distribution(last.center_of_mass),
            interest_score: 0,
            classification: Classification::Extinct,
        };
        metrics.interest_score = interest_score(&metrics);
        metrics.classification = classify(&metrics, snapshots, cell_count);
        metrics
    }
}

/// Outcome of analysing one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResult {
    pub ruleset: Ruleset,
    pub start: StartPattern,
    pub rng_seed: Option<u64>,
    pub status: RunStatus,
    pub metrics: SimulationMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<GenerationSnapshot>,
}

/// Generation of the first snapshot in the earliest run of three quiet ticks.
#[must_use]
pub fn stability_generation(snapshots: &[GenerationSnapshot]) -> Option<u64> {
    snapshots
        .windows(STABILITY_RUN)
        .find(|window| window.iter().all(|s| s.changes == 0))
        .map(|window| window[0].generation)
}

/// Smallest period in `MIN_PERIOD..=MAX_PERIOD` that repeats across the last
/// `OSCILLATION_WINDOW` samples, or 0. Each period needs at least two full
/// repetitions. A constant window repeats at every period and reports
/// `MIN_PERIOD`.
#[must_use]
pub fn detect_oscillation(populations: &[usize]) -> usize {
    let window = &populations[populations.len().saturating_sub(OSCILLATION_WINDOW)..];
    (MIN_PERIOD..=MAX_PERIOD)
        .take_while(|&period| window.len() >= 2 * period)
        .find(|&period| (period..window.len()).all(|i| window[i] == window[i - period]))
        .unwrap_or(0)
}

/// Distance of the centre of mass from the origin, scaled into `[0, 1]`.
#[must_use]
pub fn spatial_distribution(center_of_mass: Vec3) -> f64 {
    let distance = f64::from(center_of_mass.length());
    if distance.is_finite() {
        (distance / 10.0).min(1.0)
    } else {
        0.0
    }
}

/// Heuristic score in `0..=100` from longevity, population, activity,
/// diversity, periodicity and spread.
#[must_use]
pub fn interest_score(metrics: &SimulationMetrics) -> u32 {
    let longevity = (metrics.total_generations as f64 / 4.0).min(25.0);
    let population = if metrics.max_population > 0 && metrics.final_population > 0 {
        (metrics.avg_population / 10.0).min(20.0)
    } else {
        0.0
    };
    let activity = (metrics.avg_change_per_generation * 2.0).min(20.0);
    let diversity = (metrics.color_diversity as f64 * 3.0).min(15.0);
    let dynamics = if metrics.oscillation_period > 1 {
        15.0
    } else if metrics.final_population > 0 && metrics.total_generations > 50 {
        10.0
    } else {
        0.0
    };
    let spread = (metrics.spatial_distribution * 10.0).min(10.0);

    let total = longevity + population + activity + diversity + dynamics + spread;
    if total.is_finite() {
        total.round().clamp(0.0, 100.0) as u32
    } else {
        0
    }
}

/// Qualitative class of a trajectory.
#[must_use]
pub fn classify(
    metrics: &SimulationMetrics,
    snapshots: &[GenerationSnapshot],
    cell_count: usize,
) -> Classification {
    if metrics.final_population == 0 {
        return Classification::Extinct;
    }
    if metrics.final_population as f64 > EXPLOSIVE_FRACTION * cell_count as f64 {
        return Classification::Explosive;
    }
    if metrics.oscillation_period > 1 {
        return Classification::Oscillating;
    }
    let tail = &snapshots[snapshots.len().saturating_sub(TAIL_WINDOW)..];
    if tail.iter().map(|s| s.changes).sum::<usize>() == 0 {
        return Classification::Stable;
    }
    let travelled: f64 = tail
        .windows(2)
        .map(|pair| f64::from((pair[1].center_of_mass - pair[0].center_of_mass).length()))
        .sum();
    if travelled > GLIDER_DISTANCE {
        Classification::Glider
    } else {
        Classification::Chaotic
    }
}

/// Run `ruleset` from a generated start to completion and analyse it.
pub fn analyze(
    ruleset: &Ruleset,
    start: StartPattern,
    rng_seed: Option<u64>,
) -> Result<SimulationResult, SimulationError> {
    let simulation = Simulation::from_pattern(ruleset, start, rng_seed)?;
    Ok(observe(ruleset, simulation, start, rng_seed))
}

/// Drive an already constructed simulation to completion, recording one
/// snapshot per tick.
#[must_use]
pub fn observe(
    ruleset: &Ruleset,
    mut simulation: Simulation,
    start: StartPattern,
    rng_seed: Option<u64>,
) -> SimulationResult {
    let initial = GenerationSnapshot::capture(simulation.generation(), simulation.grid(), 0);
    let mut snapshots = Vec::new();
    while simulation.is_running() {
        let report = simulation.step();
        snapshots.push(GenerationSnapshot::capture(
            report.generation,
            simulation.grid(),
            report.changes,
        ));
    }

    let metrics = SimulationMetrics::from_snapshots(&initial, &snapshots, simulation.grid().len());
    trace!(
        ruleset = %ruleset.name,
        generations = metrics.total_generations,
        score = metrics.interest_score,
        class = %metrics.classification,
        "run analysed",
    );
    SimulationResult {
        ruleset: ruleset.clone(),
        start,
        rng_seed,
        status: simulation.status(),
        metrics,
        snapshots,
    }
}
