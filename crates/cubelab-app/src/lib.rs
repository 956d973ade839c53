//! Shared plumbing for the `cubelab` command-line front end.

use std::path::Path;

use anyhow::{Context, Result, bail};
use cubelab_core::{Algorithm, AlgorithmKind, Ruleset};
use cubelab_search::BatchSimulationConfig;
use serde::de::DeserializeOwned;

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("{what} file {} did not contain valid JSON", path.display()))
}

/// Load a ruleset from a JSON file; missing config fields take their defaults.
pub fn read_ruleset(path: &Path) -> Result<Ruleset> {
    let ruleset: Ruleset = read_json(path, "ruleset")?;
    if ruleset.cube_size == 0 {
        bail!("ruleset {} has cube_size 0", ruleset.name);
    }
    Ok(ruleset)
}

pub fn read_batch_config(path: &Path) -> Result<BatchSimulationConfig> {
    read_json(path, "batch config")
}

/// Ruleset running the default configuration of `kind`.
#[must_use]
pub fn default_ruleset(kind: AlgorithmKind, cube_size: usize, max_generations: u64) -> Ruleset {
    Ruleset::new(
        kind.as_str(),
        kind.default_algorithm(),
        cube_size,
        max_generations,
    )
}

/// One-line description of an algorithm and its parameters.
#[must_use]
pub fn describe_algorithm(algorithm: &Algorithm) -> String {
    match algorithm {
        Algorithm::Competition(c) => format!(
            "competition survive>={} birth>={} flip>={}",
            c.min_neighbors_to_survive, c.min_neighbors_to_birth, c.competition_threshold
        ),
        Algorithm::Life3d(c) => format!(
            "life3d {} ages:{} max_age:{} edge_bias:{:.2}",
            c.rule_label(),
            if c.use_age_colors { "on" } else { "off" },
            c.max_age,
            c.edge_bias
        ),
        Algorithm::Energy(c) => format!(
            "energy decay:{:.3} diffusion:{:.2} birth_cost:{:.2} injections:{}",
            c.base_decay_rate,
            c.diffusion_rate,
            c.birth_energy_cost,
            c.injection_points.len()
        ),
        Algorithm::Magnet(c) => format!(
            "magnet align:{:.2} radius:{} viscosity:{:.2} turbulence:{:.2}",
            c.alignment_strength, c.alignment_radius, c.viscosity, c.turbulence
        ),
        Algorithm::Info(c) => format!(
            "info gates:{} decay:{:.2} threshold:{:.2} delay:{}",
            c.gate_types.len(),
            c.signal_decay,
            c.signal_threshold,
            c.propagation_delay
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubelab_core::LifeConfig;
    use std::io::Write;

    #[test]
    fn describes_life_rules() {
        let algorithm = Algorithm::Life3d(LifeConfig::from_counts(&[5, 6], &[5, 6, 7]));
        assert_eq!(
            describe_algorithm(&algorithm),
            "life3d B5,6/S5,6,7 ages:off max_age:50 edge_bias:1.00"
        );
    }

    #[test]
    fn reads_partial_ruleset_files() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"name":"m","algorithm":{{"kind":"magnet","config":{{"viscosity":0.5}}}},"cube_size":6,"max_generations":30}}"#
        )
        .expect("write");
        let ruleset = read_ruleset(file.path()).expect("ruleset");
        assert_eq!(ruleset.algorithm.kind(), AlgorithmKind::Magnet);
        assert!(describe_algorithm(&ruleset.algorithm).contains("viscosity:0.50"));
    }

    #[test]
    fn rejects_bad_files() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "not json").expect("write");
        let err = read_ruleset(file.path()).expect_err("invalid");
        assert!(format!("{err:#}").contains("did not contain valid JSON"));
        assert!(read_ruleset(Path::new("/definitely/missing.json")).is_err());
    }
}
