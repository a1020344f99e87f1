//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::process::Command;

struct Cli {
    data_dir: tempfile::TempDir,
}

impl Cli {
    fn new() -> Self {
        Self {
            data_dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(env!("CARGO_BIN_EXE_doselog"))
            .args(args)
            .env("DOSELOG_DATA_DIR", self.data_dir.path())
            .env_remove("DOSELOG_LOG")
            .output()
            .expect("Failed to execute CLI command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);

        (stdout, stderr, code)
    }

    fn success(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "command {args:?} failed: {stderr}");
        stdout
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let stdout = self.success(args);
        serde_json::from_str(&stdout).expect("output is not JSON")
    }
}

#[test]
fn test_experience_create_and_list() {
    let cli = Cli::new();
    let out = cli.success(&["experience", "create", "First night", "--date", "2024-05-01T20:00:00Z"]);
    assert!(out.contains("Experience created: 1"));

    let list = cli.json(&["experience", "list", "--json"]);
    let experiences = list.as_array().unwrap();
    assert_eq!(experiences.len(), 1);
    assert_eq!(experiences[0]["title"], "First night");
    assert_eq!(experiences[0]["is_favorite"], false);

    cli.success(&["experience", "favorite", "1"]);
    let list = cli.json(&["experience", "list", "--favorites", "--json"]);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[test]
fn test_ingestion_add_groups_into_experience() {
    let cli = Cli::new();
    let out = cli.success(&[
        "ingestion", "add", "caffeine", "oral", "--dose", "100", "--time", "2024-05-01T08:00:00Z",
    ]);
    assert!(out.contains("experience 1"));

    // Two hours later joins the same experience; units come from the catalog.
    let out = cli.success(&[
        "ingestion", "add", "Caffeine", "oral", "--dose", "50", "--time", "2024-05-01T10:00:00Z",
    ]);
    assert!(out.contains("experience 1"));

    // A week later starts a new one.
    let out = cli.success(&[
        "ingestion", "add", "Caffeine", "oral", "--dose", "50", "--time", "2024-05-08T10:00:00Z",
    ]);
    assert!(out.contains("experience 2"));

    let ingestions = cli.json(&["ingestion", "list", "--experience", "1", "--json"]);
    let ingestions = ingestions.as_array().unwrap();
    assert_eq!(ingestions.len(), 2);
    assert_eq!(ingestions[0]["units"], "mg");
    assert_eq!(ingestions[0]["substance_name"], "Caffeine");
}

#[test]
fn test_timeline_json() {
    let cli = Cli::new();
    cli.success(&[
        "ingestion", "add", "Caffeine", "oral", "--dose", "100", "--time", "2024-05-01T08:00:00Z",
    ]);
    cli.success(&[
        "ingestion", "add", "Unobtainium", "oral", "--dose", "1", "--units", "mg", "--time",
        "2024-05-01T08:30:00Z",
    ]);

    let timeline = cli.json(&["timeline", "1", "--json"]);
    assert_eq!(timeline["timelines"]["timelines"].as_array().unwrap().len(), 1);
    assert_eq!(timeline["timelines"]["skipped"][0]["reason"], "unknown_substance");
    let points = timeline["lines"][0]["points"].as_array().unwrap();
    assert!(points[0]["is_ingestion_point"].as_bool().unwrap());

    let text = cli.success(&["timeline", "1", "--independent", "--width", "20"]);
    assert!(text.contains("Caffeine oral"));
    assert!(text.contains("no timeline for Unobtainium"));
}

#[test]
fn test_timeline_unknown_experience_fails() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["timeline", "42"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_ingestion_without_units_fails() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["ingestion", "add", "Unobtainium", "oral", "--dose", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--units"));
}

#[test]
fn test_stats_json() {
    let cli = Cli::new();
    cli.success(&["ingestion", "add", "Caffeine", "oral", "--dose", "100"]);
    let stats = cli.json(&["stats", "--period", "days30", "--json"]);
    assert_eq!(stats["ingestion_stats"][0]["substance_name"], "Caffeine");
    assert_eq!(stats["ingestion_stats"][0]["ingestion_count"], 1);
}

#[test]
fn test_search() {
    let cli = Cli::new();
    let hits = cli.json(&["search", "caf", "--json"]);
    assert_eq!(hits[0]["name"], "Caffeine");

    let used = cli.json(&["search", "--used", "--json"]);
    assert!(used.as_array().unwrap().is_empty());

    cli.success(&["ingestion", "add", "LSD", "sublingual", "--dose", "100"]);
    let used = cli.json(&["search", "--used", "--json"]);
    assert_eq!(used.as_array().unwrap().len(), 1);
    assert_eq!(used[0]["name"], "LSD");
}

#[test]
fn test_dose_classify() {
    let cli = Cli::new();
    let out = cli.success(&["dose", "classify", "Caffeine", "oral", "100", "mg"]);
    assert!(out.contains("common"));

    let json = cli.json(&["dose", "classify", "MDMA", "oral", "200", "mg", "--json"]);
    assert_eq!(json["class"], "heavy");

    let (_, _, code) = cli.run(&["dose", "classify", "Caffeine", "oral", "100", "g"]);
    assert_eq!(code, 1);

    let explain = cli.success(&["dose", "explain"]);
    assert_eq!(explain.lines().count(), 5);
}

#[test]
fn test_config_get_set() {
    let cli = Cli::new();
    assert_eq!(
        cli.success(&["config", "get", "timeline.substance_heights_independent"]).trim(),
        "false"
    );
    cli.success(&["config", "set", "timeline.substance_heights_independent", "true"]);
    assert_eq!(
        cli.success(&["config", "get", "timeline.substance_heights_independent"]).trim(),
        "true"
    );

    let (_, _, code) = cli.run(&["config", "get", "no.such.key"]);
    assert_eq!(code, 1);

    cli.success(&["config", "reset"]);
    let list = cli.json(&["config", "list"]);
    assert_eq!(list["timeline"]["substance_heights_independent"], false);
}

#[test]
fn test_out_of_range_spans_are_rejected() {
    let cli = Cli::new();
    let (_, _, code) = cli.run(&["ingestion", "suggest", "--days", "1000000000"]);
    assert_eq!(code, 2);
    let (_, _, code) = cli.run(&["ingestion", "suggest", "--days", "0"]);
    assert_eq!(code, 2);
    cli.success(&["ingestion", "suggest", "--days", "36500"]);

    let (_, stderr, code) = cli.run(&[
        "config", "set", "journal.hours_to_separate_ingestions", "10000000000",
    ]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
    let (_, _, code) = cli.run(&["config", "set", "journal.hours_to_separate_ingestions", "0"]);
    assert_eq!(code, 1);
    assert_eq!(
        cli.success(&["config", "get", "journal.hours_to_separate_ingestions"]).trim(),
        "12"
    );
}

#[test]
fn test_search_all_includes_uncommon() {
    let cli = Cli::new();
    let all = cli.json(&["search", "--all", "--json"]);
    let common = cli.json(&["search", "--json"]);
    assert!(all.as_array().unwrap().len() >= common.as_array().unwrap().len());
    assert!(!common.as_array().unwrap().is_empty());
}

#[test]
fn test_testing_services() {
    let cli = Cli::new();
    let found = cli.json(&["testing", "zurich", "--json"]);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["country"], "Switzerland");
    assert_eq!(found[0]["services"][0]["name"], "DIZ / Saferparty");

    let text = cli.success(&["testing"]);
    assert!(text.contains("United Kingdom"));
    assert!(text.contains("The Loop (Bristol)"));
}
