//! Simulation driver: owns the grid, the per-cell state and the generation counter
//! for one run and applies the selected rule once per tick.

use std::fmt;

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Algorithm, Ruleset};
use crate::pattern::StartPattern;
use crate::rules::{self, RuleContext};
use crate::state::CellStates;
use crate::{CubeTopology, Grid, SimulationError};

/// Consecutive zero-change ticks after which a run is declared stable.
pub const STABLE_STREAK: u32 = 3;

/// Lifecycle of a run. Every state but `Running` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Stable,
    Extinct,
    GenerationCapReached,
    /// Abandoned by the caller between ticks.
    Stopped,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickReport {
    pub generation: u64,
    pub population: usize,
    /// Cells whose colour differs from the previous generation.
    pub changes: usize,
    pub status: RunStatus,
}

/// Returns a generator seeded from `seed`, or from entropy if absent.
#[must_use]
pub fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => {
            let seed: u64 = rand::random();
            SmallRng::seed_from_u64(seed)
        }
    }
}

pub struct Simulation {
    algorithm: Algorithm,
    max_generations: u64,
    topology: CubeTopology,
    grid: Grid,
    states: CellStates,
    generation: u64,
    status: RunStatus,
    quiet_ticks: u32,
    rng: SmallRng,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("algorithm", &self.algorithm.kind())
            .field("cube_size", &self.topology.size())
            .field("generation", &self.generation)
            .field("status", &self.status)
            .field("population", &self.grid.population())
            .finish()
    }
}

impl Simulation {
    /// Start a run of `ruleset` from an explicit initial grid.
    pub fn new(
        ruleset: &Ruleset,
        initial: Grid,
        rng_seed: Option<u64>,
    ) -> Result<Self, SimulationError> {
        Self::with_rng(ruleset, initial, seeded_rng(rng_seed))
    }

    /// Start a run of `ruleset` from a generated pattern. The same seed drives
    /// the pattern and any randomness inside the rule.
    pub fn from_pattern(
        ruleset: &Ruleset,
        pattern: StartPattern,
        rng_seed: Option<u64>,
    ) -> Result<Self, SimulationError> {
        if ruleset.cube_size == 0 {
            return Err(SimulationError::InvalidConfig("cube_size must be positive"));
        }
        let mut rng = seeded_rng(rng_seed);
        let initial = pattern.generate(ruleset.cube_size, &mut rng);
        Self::with_rng(ruleset, initial, rng)
    }

    fn with_rng(
        ruleset: &Ruleset,
        initial: Grid,
        mut rng: SmallRng,
    ) -> Result<Self, SimulationError> {
        if ruleset.cube_size == 0 {
            return Err(SimulationError::InvalidConfig("cube_size must be positive"));
        }
        let expected = ruleset.cube_size.pow(3);
        if initial.size() != ruleset.cube_size || initial.len() != expected {
            return Err(SimulationError::PatternLength {
                expected,
                actual: initial.len(),
            });
        }
        initial.validate()?;
        let topology = CubeTopology::new(ruleset.cube_size)?;
        let states = CellStates::initialize(&ruleset.algorithm, &initial, &mut rng);
        let mut simulation = Self {
            algorithm: ruleset.algorithm.clone(),
            max_generations: ruleset.max_generations,
            topology,
            grid: initial,
            states,
            generation: 0,
            status: RunStatus::Running,
            quiet_ticks: 0,
            rng,
        };
        simulation.status = simulation.resting_status();
        Ok(simulation)
    }

    /// Status implied by the current grid when no tick history is involved.
    fn resting_status(&self) -> RunStatus {
        if self.grid.population() == 0 {
            RunStatus::Extinct
        } else if self.generation >= self.max_generations {
            RunStatus::GenerationCapReached
        } else {
            RunStatus::Running
        }
    }

    /// Apply the rule once. Calling this on a finished run is a no-op that
    /// reports the current state with zero changes.
    pub fn step(&mut self) -> TickReport {
        if self.status != RunStatus::Running {
            return self.report(0);
        }
        let next_generation = self.generation + 1;
        let mut ctx = RuleContext {
            generation: next_generation,
            rng: &mut self.rng,
        };
        let (grid, states) = rules::apply(
            &self.algorithm,
            &self.grid,
            &self.states,
            &self.topology,
            &mut ctx,
        );
        let changes = grid.changes_from(&self.grid);
        self.grid = grid;
        self.states = states;
        self.generation = next_generation;

        self.quiet_ticks = if changes == 0 { self.quiet_ticks + 1 } else { 0 };
        let population = self.grid.population();
        self.status = if population == 0 {
            RunStatus::Extinct
        } else if self.quiet_ticks >= STABLE_STREAK {
            RunStatus::Stable
        } else if self.generation >= self.max_generations {
            RunStatus::GenerationCapReached
        } else {
            RunStatus::Running
        };

        if self.status != RunStatus::Running {
            debug!(
                algorithm = %self.algorithm.kind(),
                generation = self.generation,
                population,
                status = ?self.status,
                "simulation finished",
            );
        }
        self.report(changes)
    }

    /// Step until the run reaches a terminal state, returning the number of ticks taken.
    pub fn run_to_end(&mut self) -> u64 {
        let start = self.generation;
        while self.is_running() {
            self.step();
        }
        self.generation - start
    }

    fn report(&self, changes: usize) -> TickReport {
        TickReport {
            generation: self.generation,
            population: self.grid.population(),
            changes,
            status: self.status,
        }
    }

    /// Swap the update law. All per-cell activity is rebuilt from the colour grid.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.states = CellStates::initialize(&algorithm, &self.grid, &mut self.rng);
        self.algorithm = algorithm;
        self.quiet_ticks = 0;
        if self.status != RunStatus::Stopped {
            self.status = self.resting_status();
        }
    }

    /// Abandon the run; later calls to [`Self::step`] do nothing.
    pub fn stop(&mut self) {
        if self.status == RunStatus::Running {
            self.status = RunStatus::Stopped;
        }
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn states(&self) -> &CellStates {
        &self.states
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    #[must_use]
    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    #[must_use]
    pub fn topology(&self) -> &CubeTopology {
        &self.topology
    }

    #[must_use]
    pub const fn max_generations(&self) -> u64 {
        self.max_generations
    }
}
