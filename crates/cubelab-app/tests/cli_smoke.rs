use std::process::Command;

fn cubelab() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cubelab"));
    cmd.env("RUST_LOG", "off").env("NO_COLOR", "1");
    cmd
}

#[test]
fn run_prints_json_result() {
    let output = cubelab()
        .args([
            "run",
            "--algorithm",
            "life3d",
            "--size",
            "5",
            "--generations",
            "10",
            "--seed",
            "4",
            "--json",
        ])
        .output()
        .expect("failed to run cubelab binary");
    assert!(output.status.success(), "run failed: {output:?}");
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(value["ruleset"]["name"], "life3d");
    assert_eq!(value["rng_seed"], 4);
    assert!(value["metrics"]["interest_score"].as_u64().is_some());
}

#[test]
fn batch_writes_export() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.json");
    let status = cubelab()
        .args([
            "batch",
            "--size",
            "4",
            "--generations",
            "6",
            "--max-rulesets",
            "3",
            "--threads",
            "2",
            "--output",
        ])
        .arg(&path)
        .env("CUBELAB_SEED", "21")
        .status()
        .expect("failed to run cubelab binary");
    assert!(status.success(), "batch failed");
    let text = std::fs::read_to_string(&path).expect("export written");
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(value["summary"]["total_rulesets"], 3);
    assert_eq!(value["config"]["rng_seed"], 21);
}

#[test]
fn rulesets_lists_the_catalog() {
    let output = cubelab()
        .args(["rulesets", "--filter", "competition/"])
        .output()
        .expect("failed to run cubelab binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("competition/s2-b3-c5"));
    assert!(!stdout.contains("life3d/"));
}

#[test]
fn unknown_algorithm_is_rejected() {
    let status = cubelab()
        .args(["run", "--algorithm", "plasma"])
        .status()
        .expect("failed to run cubelab binary");
    assert!(!status.success());
}
