//! Ruleset generation for the batch search.
//!
//! Four families are produced, in this order:
//! 1. named Life3D rules crossed with age colouring and maximum age,
//! 2. a systematic sample of birth/survival sets (every third combination),
//! 3. an edge-bias sweep over three base rules,
//! 4. a Competition parameter sweep restricted to `birth > survival`.

use cubelab_core::{Algorithm, CompetitionConfig, LifeConfig, Ruleset};

/// Named Life3D presets as `(name, birth, survival)` over the 26-cell Moore neighborhood.
pub const NAMED_LIFE_RULES: &[(&str, &[u8], &[u8])] = &[
    ("classic", &[5], &[4, 5]),
    ("life_445", &[4], &[4]),
    ("life_55", &[5], &[5]),
    ("crystal", &[4], &[5]),
    ("amoeba", &[6, 7], &[5, 6]),
    ("pyroclastic", &[4], &[3, 4]),
    ("slow_growth", &[5, 6, 7], &[6, 7, 8]),
    (
        "coral",
        &[
            9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26,
        ],
        &[5, 6, 7, 12, 13, 15],
    ),
];

pub const MAX_AGE_OPTIONS: [u32; 3] = [20, 50, 100];

pub const BIRTH_OPTIONS: [&[u8]; 10] = [
    &[4],
    &[5],
    &[6],
    &[3, 4],
    &[4, 5],
    &[4, 6],
    &[5, 6],
    &[6, 7],
    &[4, 5, 6],
    &[5, 6, 7],
];

pub const SURVIVAL_OPTIONS: [&[u8]; 9] = [
    &[4],
    &[5],
    &[2, 3],
    &[4, 5],
    &[5, 6],
    &[4, 5, 6],
    &[5, 6, 7],
    &[3, 4, 5],
    &[6, 7, 8],
];

/// Keep one combination in this many during the systematic sample.
pub const SAMPLE_STRIDE: usize = 3;

/// Base rules of the edge-bias sweep, by catalog name.
pub const EDGE_BASE_RULES: [&str; 3] = ["classic", "crystal", "amoeba"];
pub const EDGE_BIASES: [f32; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

pub const COMPETITION_SURVIVAL: std::ops::RangeInclusive<u8> = 2..=6;
pub const COMPETITION_BIRTH: std::ops::RangeInclusive<u8> = 3..=8;
pub const COMPETITION_THRESHOLDS: [u8; 3] = [5, 7, 9];

/// Every ruleset of the search, each sized to `cube_size` and capped at `max_generations`.
#[must_use]
pub fn generate_rulesets(cube_size: usize, max_generations: u64) -> Vec<Ruleset> {
    let mut rulesets = Vec::new();
    let mut push = |name: String, algorithm: Algorithm| {
        rulesets.push(Ruleset::new(name, algorithm, cube_size, max_generations));
    };

    for &(name, birth, survival) in NAMED_LIFE_RULES {
        for use_age_colors in [false, true] {
            for max_age in MAX_AGE_OPTIONS {
                let config = LifeConfig {
                    use_age_colors,
                    max_age,
                    ..LifeConfig::from_counts(birth, survival)
                };
                let colouring = if use_age_colors { "aged" } else { "plain" };
                push(
                    format!("life3d/{name}/{colouring}/max{max_age}"),
                    Algorithm::Life3d(config),
                );
            }
        }
    }

    let combinations = BIRTH_OPTIONS
        .iter()
        .flat_map(|&birth| SURVIVAL_OPTIONS.iter().map(move |&survival| (birth, survival)));
    for (birth, survival) in combinations.step_by(SAMPLE_STRIDE) {
        let config = LifeConfig::from_counts(birth, survival);
        push(
            format!("life3d/sweep/{}", config.rule_label()),
            Algorithm::Life3d(config),
        );
    }

    for base in EDGE_BASE_RULES {
        let Some(&(_, birth, survival)) = NAMED_LIFE_RULES.iter().find(|rule| rule.0 == base)
        else {
            continue;
        };
        for edge_bias in EDGE_BIASES {
            let config = LifeConfig {
                edge_bias,
                ..LifeConfig::from_counts(birth, survival)
            };
            push(
                format!("life3d/edge/{base}/bias{edge_bias:.2}"),
                Algorithm::Life3d(config),
            );
        }
    }

    for min_neighbors_to_survive in COMPETITION_SURVIVAL {
        for min_neighbors_to_birth in COMPETITION_BIRTH {
            if min_neighbors_to_birth <= min_neighbors_to_survive {
                continue;
            }
            for competition_threshold in COMPETITION_THRESHOLDS {
                push(
                    format!(
                        "competition/s{min_neighbors_to_survive}-b{min_neighbors_to_birth}-c{competition_threshold}"
                    ),
                    Algorithm::Competition(CompetitionConfig {
                        min_neighbors_to_survive,
                        min_neighbors_to_birth,
                        competition_threshold,
                    }),
                );
            }
        }
    }

    rulesets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn family_sizes() {
        let rulesets = generate_rulesets(8, 50);
        let count = |prefix: &str| {
            rulesets
                .iter()
                .filter(|r| r.name.starts_with(prefix))
                .count()
        };
        assert_eq!(count("life3d/sweep/"), 30);
        assert_eq!(count("life3d/edge/"), 18);
        assert_eq!(count("competition/"), 60);
        assert_eq!(
            rulesets.len(),
            NAMED_LIFE_RULES.len() * 6 + 30 + 18 + 60
        );
    }

    #[test]
    fn names_are_unique() {
        let rulesets = generate_rulesets(8, 50);
        let names: BTreeSet<&str> = rulesets.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names.len(), rulesets.len());
    }

    #[test]
    fn competition_sweep_requires_birth_above_survival() {
        for ruleset in generate_rulesets(5, 10) {
            assert_eq!(ruleset.cube_size, 5);
            assert_eq!(ruleset.max_generations, 10);
            if let Algorithm::Competition(config) = ruleset.algorithm {
                assert!(config.min_neighbors_to_birth > config.min_neighbors_to_survive);
            }
        }
    }

    #[test]
    fn systematic_sample_starts_at_first_combination() {
        let rulesets = generate_rulesets(4, 10);
        let first = rulesets
            .iter()
            .find(|r| r.name.starts_with("life3d/sweep/"))
            .expect("sweep ruleset");
        assert_eq!(first.name, "life3d/sweep/B4/S4");
    }
}
