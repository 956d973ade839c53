//! JSON export of a batch: summary, full detail for the leaders, the
//! classification histogram and one condensed row per run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use cubelab_core::{Classification, SimulationResult};
use serde_json::{Value, json};
use tracing::info;

use crate::{BatchResult, SearchError};

fn condensed_run(index: usize, result: &SimulationResult) -> Value {
    let metrics = &result.metrics;
    json!({
        "index": index,
        "ruleset": result.ruleset.name,
        "algorithm": result.ruleset.algorithm.kind().as_str(),
        "start": result.start.label(),
        "seed": result.rng_seed,
        "generations": metrics.total_generations,
        "final_population": metrics.final_population,
        "interest_score": metrics.interest_score,
        "classification": metrics.classification.as_str(),
    })
}

/// Export-ready representation of `batch`. Pure: the same batch always yields
/// the same value.
#[must_use]
pub fn export_json(batch: &BatchResult) -> Value {
    let summary = &batch.summary;
    let top: Vec<Value> = summary
        .top_rulesets
        .iter()
        .filter_map(|ranked| {
            let result = batch.results.get(ranked.result_index)?;
            Some(json!({
                "rank_index": ranked.result_index,
                "ruleset": result.ruleset,
                "start": result.start,
                "seed": result.rng_seed,
                "status": result.status,
                "metrics": result.metrics,
            }))
        })
        .collect();

    let counts: serde_json::Map<String, Value> = Classification::ALL
        .iter()
        .map(|class| {
            let count = summary.classification_counts.get(class).copied().unwrap_or(0);
            (class.as_str().to_owned(), json!(count))
        })
        .collect();

    let runs: Vec<Value> = batch
        .results
        .iter()
        .enumerate()
        .map(|(index, result)| condensed_run(index, result))
        .collect();

    json!({
        "timestamp_ms": batch.timestamp_ms,
        "config": batch.config,
        "summary": {
            "total_rulesets": summary.total_rulesets,
            "total_runs": summary.total_runs,
            "average_interest_score": summary.average_interest_score,
            "best": summary.best,
            "standings": summary.standings,
        },
        "top_rulesets": top,
        "classification_counts": counts,
        "runs": runs,
    })
}

/// Write the pretty-printed export of `batch` to `path`.
pub fn write_json(batch: &BatchResult, path: impl AsRef<Path>) -> Result<(), SearchError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &export_json(batch))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!(path = %path.display(), runs = batch.results.len(), "wrote batch export");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BatchSimulationConfig, run_batch};

    fn small_batch() -> BatchResult {
        let config = BatchSimulationConfig {
            cube_size: 4,
            max_generations: 8,
            rng_seed: Some(3),
            max_rulesets: Some(3),
            ..BatchSimulationConfig::default()
        };
        run_batch(&config).expect("batch")
    }

    #[test]
    fn export_has_all_sections() {
        let batch = small_batch();
        let value = export_json(&batch);
        assert_eq!(value["summary"]["total_runs"], json!(6));
        assert_eq!(value["runs"].as_array().map(Vec::len), Some(6));
        assert_eq!(value["top_rulesets"].as_array().map(Vec::len), Some(6));
        let counts = value["classification_counts"].as_object().expect("counts");
        assert_eq!(counts.len(), Classification::ALL.len());
        let total: u64 = counts.values().filter_map(Value::as_u64).sum();
        assert_eq!(total, 6);
        assert_eq!(value["config"]["cube_size"], json!(4));
    }

    #[test]
    fn export_is_pure() {
        let batch = small_batch();
        assert_eq!(export_json(&batch), export_json(&batch));
    }
}
