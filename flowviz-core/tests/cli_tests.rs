//! End-to-end tests for the `flowviz` binary

mod helpers;

use std::process::Command;

use helpers::scenario_records;
use tempfile::TempDir;

fn flowviz() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_flowviz"));
    command
        .env_remove("FLOWVIZ_CONFIG")
        .env_remove("FLOWVIZ_RECORDS")
        .env_remove("RUST_LOG");
    command
}

#[test]
fn test_runs_for_duration_and_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let records = dir.path().join("responses.json");
    std::fs::write(&records, serde_json::to_string(&scenario_records()).unwrap()).unwrap();

    let output = flowviz()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("--records")
        .arg(&records)
        .args(["--duration-secs", "1", "--log-level", "info"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("years_at_organization → learning_style"));
    assert!(stdout.contains("Shutdown complete"));
}

#[test]
fn test_unreadable_records_fail() {
    let dir = TempDir::new().unwrap();
    let records = dir.path().join("responses.json");
    std::fs::write(&records, "{not json").unwrap();

    let output = flowviz()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("--records")
        .arg(&records)
        .args(["--duration-secs", "1"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}
