use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn msfind_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("msfind");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let text_dir = root.join("text").join("computer-science");
    fs::create_dir_all(&text_dir).unwrap();
    fs::write(
        text_dir.join("9618_s23_ms_12.txt"),
        "Cambridge mark scheme header\n\
         1 (a) the alu performs arithmetic and logic operations on data\n\
         1 (b) the control unit sends control signals to coordinate components\n\
         2 registers store data temporarily and the program counter holds the address of the next instruction\n",
    )
    .unwrap();
    fs::write(
        text_dir.join("9618_s23_qp_12.txt"),
        "1 (a) Describe the purpose of the ALU.\n\
         1 (b) Explain the role of the control unit.\n",
    )
    .unwrap();

    let config_content = format!(
        r#"[index]
path = "{root}/data/index/snapshot.json"

[retrieval]
top_k = 3

[corpus]
text_dir = "{root}/text"
include_globs = ["**/*.txt"]
"#,
        root = root.display()
    );

    let config_path = config_dir.join("msfind.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_msfind(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = msfind_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run msfind binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn rebuild(config_path: &Path, extra: &[&str]) -> String {
    let mut args = vec!["rebuild-index"];
    args.extend_from_slice(extra);
    let (stdout, stderr, success) = run_msfind(config_path, &args);
    assert!(success, "rebuild failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

#[test]
fn test_rebuild_reports_counts() {
    let (_tmp, config_path) = setup_test_env();
    let stdout = rebuild(&config_path, &[]);
    assert!(stdout.contains("Index rebuilt"));
    assert!(stdout.contains("chunks:       4"), "stdout={}", stdout);
    assert!(stdout.contains("question:     0"));
}

#[test]
fn test_query_finds_alu_passage() {
    let (_tmp, config_path) = setup_test_env();
    rebuild(&config_path, &[]);

    let (stdout, stderr, success) =
        run_msfind(&config_path, &["query", "Describe the purpose of the ALU"]);
    assert!(success, "query failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Exact Answer:"));
    assert!(stdout.contains("Short Explanation:"));
    assert!(stdout.contains("alu performs arithmetic"));
}

#[test]
fn test_query_without_shared_tokens_reports_no_match() {
    let (_tmp, config_path) = setup_test_env();
    rebuild(&config_path, &[]);

    let (stdout, _, success) =
        run_msfind(&config_path, &["query", "photosynthesis chlorophyll"]);
    assert!(success);
    assert!(stdout.contains("No relevant passages found."));
    assert!(!stdout.contains("Exact Answer:"));
}

#[test]
fn test_query_without_index_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_msfind(&config_path, &["query", "alu"]);
    assert!(!success);
    assert!(stderr.contains("rebuild-index"));
}

#[test]
fn test_json_results_with_large_k() {
    let (_tmp, config_path) = setup_test_env();
    rebuild(&config_path, &[]);

    let (stdout, stderr, success) = run_msfind(
        &config_path,
        &["query", "control unit data", "-k", "50", "--json"],
    );
    assert!(success, "query failed: stderr={}", stderr);

    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let items = value["results"]["items"].as_array().unwrap();
    assert!(!items.is_empty());
    assert!(items.len() <= 4);
    let scores: Vec<f64> = items.iter().map(|i| i["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(items
        .iter()
        .all(|i| i["chunk"]["doc_type"] == "mark_scheme"));
}

#[test]
fn test_question_id_narrows_candidates() {
    let (_tmp, config_path) = setup_test_env();
    rebuild(&config_path, &[]);

    let (stdout, _, success) = run_msfind(
        &config_path,
        &["query", "data", "--question-id", "2", "--json"],
    );
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let items = value["results"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["chunk"]["question_id"], "2");
}

#[test]
fn test_include_qp_rebuild_then_mark_schemes_only() {
    let (_tmp, config_path) = setup_test_env();

    let with_qp = rebuild(&config_path, &["--include-qp"]);
    assert!(with_qp.contains("question:     2"), "stdout={}", with_qp);

    let ms_only = rebuild(&config_path, &[]);
    assert!(ms_only.contains("question:     0"));

    let (stdout, _, success) = run_msfind(
        &config_path,
        &["query", "Explain the role of the control unit", "--json"],
    );
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let items = value["results"]["items"].as_array().unwrap();
    assert!(items
        .iter()
        .all(|i| i["chunk"]["doc_type"] == "mark_scheme"));
}

#[test]
fn test_stats_after_rebuild() {
    let (_tmp, config_path) = setup_test_env();
    let rebuilt = rebuild(&config_path, &[]);
    let digest = rebuilt
        .lines()
        .find_map(|l| l.trim().strip_prefix("sha256:"))
        .map(|d| d.trim().to_string())
        .unwrap();

    let (stdout, stderr, success) = run_msfind(&config_path, &["stats"]);
    assert!(success, "stats failed: stderr={}", stderr);
    assert!(stdout.contains("Chunks:       4"));
    assert!(stdout.contains("computer-science/9618_s23_ms_12"));
    assert!(stdout.contains(&format!("SHA-256:      {}", digest)));
}
