use std::collections::BTreeSet;

use cubelab_core::pattern::StartPattern;
use cubelab_core::{AlgorithmKind, Ruleset};
use cubelab_search::{BatchSimulationConfig, run_batch, run_rulesets, write_json};

fn quick_config(seed: u64) -> BatchSimulationConfig {
    BatchSimulationConfig {
        cube_size: 5,
        max_generations: 15,
        runs_per_ruleset: 2,
        rng_seed: Some(seed),
        max_rulesets: Some(12),
        ..BatchSimulationConfig::default()
    }
}

#[test]
fn aggregation_invariants_hold() {
    let batch = run_batch(&quick_config(42)).expect("batch");
    let k = batch.results.len();
    assert_eq!(k, 12 * 3);
    assert_eq!(batch.summary.total_runs, k);

    let names: BTreeSet<&str> = batch
        .results
        .iter()
        .map(|r| r.ruleset.name.as_str())
        .collect();
    assert_eq!(batch.summary.total_rulesets, names.len());

    let top = &batch.summary.top_rulesets;
    assert_eq!(top.len(), k.min(10));
    assert!(top.windows(2).all(|w| w[0].interest_score >= w[1].interest_score));

    let histogram_total: usize = batch.summary.classification_counts.values().sum();
    assert_eq!(histogram_total, k);

    let best = batch.summary.best.as_ref().expect("best");
    let max = batch
        .results
        .iter()
        .map(|r| r.metrics.interest_score)
        .max()
        .expect("max");
    assert_eq!(best.interest_score, max);
    assert!(
        batch.results[..best.result_index]
            .iter()
            .all(|r| r.metrics.interest_score < max)
    );
}

#[test]
fn results_arrive_in_job_order() {
    let batch = run_batch(&quick_config(1)).expect("batch");
    for chunk in batch.results.chunks(3) {
        assert!(chunk.iter().all(|r| r.ruleset.name == chunk[0].ruleset.name));
        assert_eq!(chunk[2].start, StartPattern::CenteredCluster);
        assert!(chunk.iter().all(|r| r.snapshots.is_empty()));
    }
}

#[test]
fn seeded_batches_are_reproducible() {
    let a = run_batch(&quick_config(9)).expect("a");
    let b = run_batch(&quick_config(9)).expect("b");
    assert_eq!(a.results, b.results);
    assert_eq!(a.summary, b.summary);
}

#[test]
fn custom_rulesets_cover_every_algorithm() {
    let config = BatchSimulationConfig {
        include_pattern_start: false,
        runs_per_ruleset: 1,
        keep_snapshots: true,
        ..quick_config(5)
    };
    let rulesets: Vec<Ruleset> = AlgorithmKind::ALL
        .iter()
        .map(|kind| Ruleset::new(kind.as_str(), kind.default_algorithm(), 5, 15))
        .collect();
    let batch = run_rulesets(&config, &rulesets).expect("batch");
    assert_eq!(batch.summary.total_rulesets, AlgorithmKind::ALL.len());
    for result in &batch.results {
        assert_eq!(
            result.snapshots.len() as u64,
            result.metrics.total_generations
        );
    }
}

#[test]
fn export_round_trips_through_a_file() {
    let batch = run_batch(&BatchSimulationConfig {
        max_rulesets: Some(2),
        ..quick_config(11)
    })
    .expect("batch");
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("batch.json");
    write_json(&batch, &path).expect("write");
    let text = std::fs::read_to_string(&path).expect("read");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["summary"]["total_runs"], serde_json::json!(6));
    assert_eq!(value["runs"][0]["ruleset"], serde_json::json!(batch.results[0].ruleset.name));
}
