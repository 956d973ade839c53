//! Batch search over rule space: generates rulesets, analyses each one from
//! several starts in parallel and aggregates the outcomes.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use cubelab_core::pattern::{DEFAULT_DENSITY, StartPattern};
use cubelab_core::{Classification, Ruleset, SimulationError, SimulationResult, analyze};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub mod catalog;
pub mod export;

pub use catalog::generate_rulesets;
pub use export::{export_json, write_json};

/// Number of entries kept in the summary leaderboard.
pub const TOP_RESULTS: usize = 10;
/// Odd multiplier spreading per-job seeds across the 64-bit space.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid batch configuration: {0}")]
    InvalidConfig(&'static str),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode export: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parameters of a batch search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchSimulationConfig {
    pub cube_size: usize,
    pub max_generations: u64,
    /// Sparse random starts per ruleset when `include_random_start` is set.
    pub runs_per_ruleset: usize,
    pub include_random_start: bool,
    /// Adds one centred-cluster start per ruleset.
    pub include_pattern_start: bool,
    /// Base seed; every run derives its own from it. Drawn from entropy when absent.
    pub rng_seed: Option<u64>,
    pub random_density: f32,
    /// Truncate the generated ruleset list.
    pub max_rulesets: Option<usize>,
    /// Keep per-generation snapshots in each result.
    pub keep_snapshots: bool,
}

impl Default for BatchSimulationConfig {
    fn default() -> Self {
        Self {
            cube_size: 10,
            max_generations: 100,
            runs_per_ruleset: 1,
            include_random_start: true,
            include_pattern_start: true,
            rng_seed: None,
            random_density: DEFAULT_DENSITY,
            max_rulesets: None,
            keep_snapshots: false,
        }
    }
}

impl BatchSimulationConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.cube_size == 0 {
            return Err(SearchError::InvalidConfig("cube_size must be positive"));
        }
        if !self.random_density.is_finite() || !(0.0..=1.0).contains(&self.random_density) {
            return Err(SearchError::InvalidConfig("random_density must lie in [0, 1]"));
        }
        Ok(())
    }

    /// Starts each ruleset is run from, in job order.
    #[must_use]
    pub fn starts(&self) -> Vec<StartPattern> {
        let random = StartPattern::SparseRandom {
            density: self.random_density,
        };
        let mut starts = Vec::new();
        if self.include_random_start {
            starts.extend(std::iter::repeat_n(random, self.runs_per_ruleset));
        }
        if self.include_pattern_start {
            starts.push(StartPattern::CenteredCluster);
        }
        if starts.is_empty() {
            starts.push(random);
        }
        starts
    }

    /// The rulesets this batch explores.
    #[must_use]
    pub fn rulesets(&self) -> Vec<Ruleset> {
        let mut rulesets = generate_rulesets(self.cube_size, self.max_generations);
        if let Some(limit) = self.max_rulesets {
            rulesets.truncate(limit);
        }
        rulesets
    }
}

/// Reference to one result inside [`BatchResult::results`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedRun {
    pub result_index: usize,
    pub ruleset_name: String,
    pub interest_score: u32,
    pub classification: Classification,
}

impl RankedRun {
    fn new(result_index: usize, result: &SimulationResult) -> Self {
        Self {
            result_index,
            ruleset_name: result.ruleset.name.clone(),
            interest_score: result.metrics.interest_score,
            classification: result.metrics.classification,
        }
    }
}

/// Mean outcome of every run of one ruleset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RulesetStanding {
    pub ruleset_name: String,
    pub runs: usize,
    pub mean_interest_score: f64,
    pub best_interest_score: u32,
}

/// Aggregates derived from a result list. Never authoritative; always
/// recomputed from the results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BatchSummary {
    pub total_rulesets: usize,
    pub total_runs: usize,
    pub average_interest_score: f64,
    /// First result holding the maximum score.
    pub best: Option<RankedRun>,
    pub classification_counts: BTreeMap<Classification, usize>,
    /// Highest scoring runs, descending; equal scores keep job order.
    pub top_rulesets: Vec<RankedRun>,
    /// Rulesets ranked by mean score, descending.
    pub standings: Vec<RulesetStanding>,
}

impl BatchSummary {
    #[must_use]
    pub fn from_results(results: &[SimulationResult]) -> Self {
        let names: BTreeSet<&str> = results.iter().map(|r| r.ruleset.name.as_str()).collect();
        let total_score: u64 = results
            .iter()
            .map(|r| u64::from(r.metrics.interest_score))
            .sum();
        let average_interest_score = if results.is_empty() {
            0.0
        } else {
            total_score as f64 / results.len() as f64
        };

        let mut best: Option<RankedRun> = None;
        for (index, result) in results.iter().enumerate() {
            let score = result.metrics.interest_score;
            if best.as_ref().is_none_or(|b| score > b.interest_score) {
                best = Some(RankedRun::new(index, result));
            }
        }

        let mut classification_counts = BTreeMap::new();
        for result in results {
            *classification_counts
                .entry(result.metrics.classification)
                .or_insert(0) += 1;
        }

        let mut ranked: Vec<RankedRun> = results
            .iter()
            .enumerate()
            .map(|(index, result)| RankedRun::new(index, result))
            .collect();
        ranked.sort_by(|a, b| b.interest_score.cmp(&a.interest_score));
        ranked.truncate(TOP_RESULTS);

        Self {
            total_rulesets: names.len(),
            total_runs: results.len(),
            average_interest_score,
            best,
            classification_counts,
            top_rulesets: ranked,
            standings: standings(results),
        }
    }
}

/// Per-ruleset mean scores, best first. Rulesets appear in first-seen order
/// before sorting so ties stay in job order.
#[must_use]
pub fn standings(results: &[SimulationResult]) -> Vec<RulesetStanding> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: BTreeMap<&str, (usize, u64, u32)> = BTreeMap::new();
    for result in results {
        let name = result.ruleset.name.as_str();
        let score = result.metrics.interest_score;
        let entry = totals.entry(name).or_insert_with(|| {
            order.push(name);
            (0, 0, 0)
        });
        entry.0 += 1;
        entry.1 += u64::from(score);
        entry.2 = entry.2.max(score);
    }

    let mut standings: Vec<RulesetStanding> = order
        .into_iter()
        .filter_map(|name| {
            totals.get(name).map(|&(runs, total, best)| RulesetStanding {
                ruleset_name: name.to_owned(),
                runs,
                mean_interest_score: total as f64 / runs as f64,
                best_interest_score: best,
            })
        })
        .collect();
    standings.sort_by_key(|s| std::cmp::Reverse(OrderedFloat(s.mean_interest_score)));
    standings
}

/// Everything a batch produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchResult {
    pub config: BatchSimulationConfig,
    pub results: Vec<SimulationResult>,
    pub summary: BatchSummary,
    /// Completion time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl BatchResult {
    /// Assemble a result, deriving the summary from `results`.
    #[must_use]
    pub fn new(config: BatchSimulationConfig, results: Vec<SimulationResult>) -> Self {
        let summary = BatchSummary::from_results(&results);
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64);
        Self {
            config,
            results,
            summary,
            timestamp_ms,
        }
    }
}

/// Seed of the `job`-th run of a batch seeded with `base`.
#[must_use]
pub fn job_seed(base: u64, job: usize) -> u64 {
    base.wrapping_add((job as u64).wrapping_add(1).wrapping_mul(SEED_STRIDE))
}

/// Run the whole search. Runs execute in parallel; results come back in job
/// order (ruleset by ruleset, starts in [`BatchSimulationConfig::starts`] order).
pub fn run_batch(config: &BatchSimulationConfig) -> Result<BatchResult, SearchError> {
    config.validate()?;
    let rulesets = config.rulesets();
    run_rulesets(config, &rulesets)
}

/// Run a caller supplied ruleset list under the batch's start and seeding policy.
pub fn run_rulesets(
    config: &BatchSimulationConfig,
    rulesets: &[Ruleset],
) -> Result<BatchResult, SearchError> {
    config.validate()?;
    let starts = config.starts();
    let base_seed = config.rng_seed.unwrap_or_else(rand::random);
    let jobs: Vec<(&Ruleset, StartPattern)> = rulesets
        .iter()
        .flat_map(|ruleset| starts.iter().map(move |&start| (ruleset, start)))
        .collect();
    info!(
        rulesets = rulesets.len(),
        runs = jobs.len(),
        cube_size = config.cube_size,
        max_generations = config.max_generations,
        base_seed,
        "starting batch search",
    );

    let results = jobs
        .par_iter()
        .enumerate()
        .map(|(job, &(ruleset, start))| -> Result<SimulationResult, SearchError> {
            let mut result = analyze(ruleset, start, Some(job_seed(base_seed, job)))?;
            if !config.keep_snapshots {
                result.snapshots = Vec::new();
            }
            debug!(
                job,
                ruleset = %ruleset.name,
                start = start.label(),
                score = result.metrics.interest_score,
                class = %result.metrics.classification,
                "run complete",
            );
            Ok(result)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let batch = BatchResult::new(config.clone(), results);
    info!(
        runs = batch.summary.total_runs,
        rulesets = batch.summary.total_rulesets,
        mean_score = batch.summary.average_interest_score,
        best = batch.summary.best.as_ref().map_or(0, |b| b.interest_score),
        "batch search finished",
    );
    Ok(batch)
}
