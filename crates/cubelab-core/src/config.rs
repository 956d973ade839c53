//! Per-algorithm configuration records and the immutable [`Ruleset`] job description.
//!
//! Every record derives `Default` and is deserialized with `#[serde(default)]`, so
//! partially specified JSON falls back to the documented defaults field by field.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::state::Vec3;

/// Parameters for the colour competition rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompetitionConfig {
    /// Occupied cells with fewer living neighbors than this die.
    pub min_neighbors_to_survive: u8,
    /// Empty cells are born once the dominant neighbor colour reaches this count.
    pub min_neighbors_to_birth: u8,
    /// Occupied cells flip to a different dominant colour at this count.
    pub competition_threshold: u8,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            min_neighbors_to_survive: 4,
            min_neighbors_to_birth: 5,
            competition_threshold: 7,
        }
    }
}

/// Parameters for the 3-D Life rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifeConfig {
    /// Effective neighbor counts that give birth to an empty cell.
    pub birth_neighbors: BTreeSet<u8>,
    /// Effective neighbor counts that keep a living cell alive.
    pub survival_neighbors: BTreeSet<u8>,
    /// Replace colours with the age band of each cell.
    pub use_age_colors: bool,
    /// Upper bound for the age counter.
    pub max_age: u32,
    /// Multiplier applied to the neighbor count of boundary cells.
    pub edge_bias: f32,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            birth_neighbors: BTreeSet::from([5]),
            survival_neighbors: BTreeSet::from([4, 5]),
            use_age_colors: false,
            max_age: 50,
            edge_bias: 1.0,
        }
    }
}

impl LifeConfig {
    /// Build a config from birth/survival count lists, keeping the remaining defaults.
    #[must_use]
    pub fn from_counts(birth: &[u8], survival: &[u8]) -> Self {
        Self {
            birth_neighbors: birth.iter().copied().collect(),
            survival_neighbors: survival.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Conventional `B…/S…` label, e.g. `B5/S45`.
    #[must_use]
    pub fn rule_label(&self) -> String {
        fn join(set: &BTreeSet<u8>) -> String {
            set.iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(",")
        }
        format!(
            "B{}/S{}",
            join(&self.birth_neighbors),
            join(&self.survival_neighbors)
        )
    }
}

/// Parameters for the energy/resource rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnergyConfig {
    /// Energy lost by every living cell per tick.
    pub base_decay_rate: f32,
    /// Energy a parent pays to spawn a child.
    pub birth_energy_cost: f32,
    /// Cells whose energy falls below this die.
    pub death_threshold: f32,
    /// Fraction of energy a cell spreads over its living neighbors.
    pub diffusion_rate: f32,
    /// Cells receiving nutrients each tick; points outside the cube are ignored.
    pub injection_points: Vec<[i64; 3]>,
    /// Nutrients added at each injection point per tick.
    pub injection_rate: f32,
    /// Scale of the energy flowing between competing colours.
    pub energy_transfer_rate: f32,
    /// Chebyshev radius of the pairwise competition neighborhood.
    pub competition_radius: usize,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            base_decay_rate: 0.01,
            birth_energy_cost: 0.3,
            death_threshold: 0.05,
            diffusion_rate: 0.1,
            injection_points: Vec::new(),
            injection_rate: 0.05,
            energy_transfer_rate: 0.1,
            competition_radius: 1,
        }
    }
}

/// Parameters for the magnetic alignment rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MagnetConfig {
    /// How strongly spins follow their neighbors.
    pub alignment_strength: f32,
    /// Chebyshev radius of the alignment neighborhood.
    pub alignment_radius: usize,
    /// Damping of the alignment blend (0 = none, 1 = frozen).
    pub viscosity: f32,
    /// Magnitude of isotropic noise added per tick.
    pub turbulence: f32,
    /// Uniform external field, if any.
    pub global_field: Option<Vec3>,
    /// Centres of vortices pulling spins tangentially around the Y axis.
    pub vortex_centers: Vec<Vec3>,
}

impl Default for MagnetConfig {
    fn default() -> Self {
        Self {
            alignment_strength: 0.3,
            alignment_radius: 1,
            viscosity: 0.1,
            turbulence: 0.05,
            global_field: None,
            vortex_centers: Vec::new(),
        }
    }
}

/// Logic function performed by a cell under the information-processing rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateKind {
    Wire,
    And,
    Or,
    Xor,
    Not,
    Threshold,
    Delay,
    Source,
    Sink,
    /// Source whose output follows `sin(phase) > 0`, see [`OscillatorClock`].
    Oscillator,
}

/// Phase source for [`GateKind::Oscillator`] cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OscillatorClock {
    /// Phase advances with the generation counter; runs are reproducible.
    Generation { radians_per_tick: f32 },
    /// Phase is the wall-clock time in seconds. Runs are not reproducible.
    WallClock,
}

impl Default for OscillatorClock {
    fn default() -> Self {
        Self::Generation {
            radians_per_tick: 0.5,
        }
    }
}

/// Parameters for the information-processing rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InfoConfig {
    /// Gate identifiers and the logic each performs. Cells start with the gate whose
    /// identifier equals their colour, falling back to gate 0.
    ///
    /// Colours only span `0..COLOR_COUNT`, so the default entries 6 to 9 (SINK,
    /// DELAY, THRESHOLD, OSCILLATOR) are never assigned at start. Map a colour to
    /// one of those kinds to use it.
    pub gate_types: BTreeMap<u8, GateKind>,
    /// Fraction of a signal lost when crossing to a neighbor.
    pub signal_decay: f32,
    /// Level above which an input counts as "high".
    pub signal_threshold: f32,
    /// Ticks a DELAY gate holds its input.
    pub propagation_delay: usize,
    pub oscillator: OscillatorClock,
}

impl Default for InfoConfig {
    fn default() -> Self {
        Self {
            gate_types: BTreeMap::from([
                (0, GateKind::Wire),
                (1, GateKind::And),
                (2, GateKind::Or),
                (3, GateKind::Xor),
                (4, GateKind::Not),
                (5, GateKind::Source),
                (6, GateKind::Sink),
                (7, GateKind::Delay),
                (8, GateKind::Threshold),
                (9, GateKind::Oscillator),
            ]),
            signal_decay: 0.1,
            signal_threshold: 0.5,
            propagation_delay: 1,
            oscillator: OscillatorClock::default(),
        }
    }
}

impl InfoConfig {
    /// Logic of the gate with the given identifier; unknown identifiers behave as wires.
    #[must_use]
    pub fn gate_kind(&self, gate: u8) -> GateKind {
        self.gate_types.get(&gate).copied().unwrap_or(GateKind::Wire)
    }
}

/// Discriminant of [`Algorithm`] without its configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    Competition,
    Life3d,
    Energy,
    Magnet,
    Info,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 5] = [
        AlgorithmKind::Competition,
        AlgorithmKind::Life3d,
        AlgorithmKind::Energy,
        AlgorithmKind::Magnet,
        AlgorithmKind::Info,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AlgorithmKind::Competition => "competition",
            AlgorithmKind::Life3d => "life3d",
            AlgorithmKind::Energy => "energy",
            AlgorithmKind::Magnet => "magnet",
            AlgorithmKind::Info => "info",
        }
    }

    /// The algorithm with its default configuration.
    #[must_use]
    pub fn default_algorithm(self) -> Algorithm {
        match self {
            AlgorithmKind::Competition => Algorithm::Competition(CompetitionConfig::default()),
            AlgorithmKind::Life3d => Algorithm::Life3d(LifeConfig::default()),
            AlgorithmKind::Energy => Algorithm::Energy(EnergyConfig::default()),
            AlgorithmKind::Magnet => Algorithm::Magnet(MagnetConfig::default()),
            AlgorithmKind::Info => Algorithm::Info(InfoConfig::default()),
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown algorithm `{0}` (expected competition, life3d, energy, magnet or info)")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for AlgorithmKind {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlgorithmKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAlgorithm(s.to_owned()))
    }
}

/// Selected update law together with its configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum Algorithm {
    Competition(CompetitionConfig),
    Life3d(LifeConfig),
    Energy(EnergyConfig),
    Magnet(MagnetConfig),
    Info(InfoConfig),
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Competition(CompetitionConfig::default())
    }
}

impl Algorithm {
    #[must_use]
    pub const fn kind(&self) -> AlgorithmKind {
        match self {
            Algorithm::Competition(_) => AlgorithmKind::Competition,
            Algorithm::Life3d(_) => AlgorithmKind::Life3d,
            Algorithm::Energy(_) => AlgorithmKind::Energy,
            Algorithm::Magnet(_) => AlgorithmKind::Magnet,
            Algorithm::Info(_) => AlgorithmKind::Info,
        }
    }
}

/// A fully specified, immutable simulation job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ruleset {
    pub name: String,
    pub algorithm: Algorithm,
    pub cube_size: usize,
    pub max_generations: u64,
}

impl Ruleset {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        algorithm: Algorithm,
        cube_size: usize,
        max_generations: u64,
    ) -> Self {
        Self {
            name: name.into(),
            algorithm,
            cube_size,
            max_generations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: CompetitionConfig =
            serde_json::from_str(r#"{"competition_threshold": 9}"#).expect("parse");
        assert_eq!(config.min_neighbors_to_survive, 4);
        assert_eq!(config.min_neighbors_to_birth, 5);
        assert_eq!(config.competition_threshold, 9);

        let life: LifeConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(life, LifeConfig::default());
    }

    #[test]
    fn algorithm_json_is_tagged_by_kind() {
        let json = r#"{"kind":"life3d","config":{"birth_neighbors":[4],"edge_bias":0.5}}"#;
        let algorithm: Algorithm = serde_json::from_str(json).expect("parse");
        match &algorithm {
            Algorithm::Life3d(config) => {
                assert_eq!(config.birth_neighbors, BTreeSet::from([4]));
                assert_eq!(config.survival_neighbors, BTreeSet::from([4, 5]));
                assert!((config.edge_bias - 0.5).abs() < f32::EPSILON);
            }
            other => panic!("unexpected algorithm {other:?}"),
        }
        assert_eq!(algorithm.kind(), AlgorithmKind::Life3d);
    }

    #[test]
    fn algorithm_names_parse_case_insensitively() {
        assert_eq!("Magnet".parse::<AlgorithmKind>(), Ok(AlgorithmKind::Magnet));
        assert_eq!(" life3d ".parse::<AlgorithmKind>(), Ok(AlgorithmKind::Life3d));
        assert!("gravity".parse::<AlgorithmKind>().is_err());
        for kind in AlgorithmKind::ALL {
            assert_eq!(kind.default_algorithm().kind(), kind);
        }
    }

    #[test]
    fn life_rule_label_lists_counts() {
        let config = LifeConfig::from_counts(&[6, 5], &[5, 6, 7]);
        assert_eq!(config.rule_label(), "B5,6/S5,6,7");
    }

    #[test]
    fn unknown_gate_behaves_as_wire() {
        let config = InfoConfig::default();
        assert_eq!(config.gate_kind(3), GateKind::Xor);
        assert_eq!(config.gate_kind(200), GateKind::Wire);
    }
}
