use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ragkit_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ragkit");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let knowledge_dir = root.join("knowledge");
    fs::create_dir_all(&knowledge_dir).unwrap();

    // One file with a single document object, one with an array.
    fs::write(
        knowledge_dir.join("backend.json"),
        r#"{"id": "a", "title": "Backend Experience", "text": "Experienced backend engineer with 5 years Python.", "source": "backend.json"}"#,
    )
    .unwrap();
    fs::write(
        knowledge_dir.join("frontend.json"),
        r#"[{"id": "b", "title": "Frontend Projects", "text": "Built a React dashboard for analytics.", "source": "frontend.json"}]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[knowledge]
root = "{root}/knowledge"

[index]
dir = "{root}/data/index"

[chunking]
max_chunk_chars = 1000
overlap_chars = 200

[embedding]
provider = "hash"
dims = 256

[retrieval]
top_k = 5

[prompt]
max_context_chars = 3000
max_history_turns = 6
"#,
        root = root.display()
    );

    let config_path = config_dir.join("ragkit.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ragkit(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ragkit_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ragkit binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_ingest_builds_index() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ragkit(&config_path, &["ingest"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("documents: 2"));
    assert!(stdout.contains("chunks: 2"));
    assert!(stdout.contains("ok"));

    assert!(tmp.path().join("data/index/vectors.bin").exists());
    assert!(tmp.path().join("data/index/chunks.jsonl").exists());
}

#[test]
fn test_ingest_dry_run_persists_nothing() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ragkit(&config_path, &["ingest", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("documents: 2"));
    assert!(!tmp.path().join("data/index").exists());
}

#[test]
fn test_search_ranks_relevant_document_first() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_ragkit(&config_path, &["ingest"]);
    assert!(success);

    let (stdout, stderr, success) = run_ragkit(&config_path, &["search", "Python experience"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("results: 2"));

    let backend_at = stdout.find("Backend Experience").unwrap();
    let frontend_at = stdout.find("Frontend Projects").unwrap();
    assert!(
        backend_at < frontend_at,
        "expected backend doc ranked first:\n{}",
        stdout
    );
}

#[test]
fn test_search_without_index_fails_with_guidance() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ragkit(&config_path, &["search", "anything"]);
    assert!(!success, "search should fail before ingest: {}", stdout);
    assert!(stderr.contains("ragkit ingest"), "stderr: {}", stderr);
}

#[test]
fn test_prompt_includes_context_and_sources() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_ragkit(&config_path, &["ingest"]);
    assert!(success);

    let (stdout, stderr, success) =
        run_ragkit(&config_path, &["prompt", "Tell me about your Python experience"]);
    assert!(success, "prompt failed: {}", stderr);
    assert!(stdout.contains("Context:"));
    assert!(stdout.contains("Experienced backend engineer"));
    assert!(stdout.contains("Question: Tell me about your Python experience"));
    assert!(stdout.contains("Sources:"));
    assert!(stdout.contains("Backend Experience (backend.json)"));
}

#[test]
fn test_stats_reports_counts() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_ragkit(&config_path, &["ingest"]);
    assert!(success);

    let (stdout, _, success) = run_ragkit(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("chunks: 2"));
    assert!(stdout.contains("documents: 2"));
    assert!(stdout.contains("dimension: 256"));
}

#[test]
fn test_empty_knowledge_base_searches_empty() {
    let (tmp, config_path) = setup_test_env();

    // Remove the seeded knowledge files.
    for entry in fs::read_dir(tmp.path().join("knowledge")).unwrap() {
        fs::remove_file(entry.unwrap().path()).unwrap();
    }

    let (stdout, stderr, success) = run_ragkit(&config_path, &["ingest"]);
    assert!(success, "ingest failed: {} {}", stdout, stderr);
    assert!(stdout.contains("documents: 0"));

    let (stdout, stderr, success) = run_ragkit(&config_path, &["search", "anything"]);
    assert!(success, "search on empty index should not fail: {}", stderr);
    assert!(stdout.contains("no results"));
}

#[test]
fn test_reingest_is_idempotent() {
    let (tmp, config_path) = setup_test_env();

    let (_, _, success) = run_ragkit(&config_path, &["ingest"]);
    assert!(success);
    let first = fs::read(tmp.path().join("data/index/chunks.jsonl")).unwrap();
    let first_vectors = fs::read(tmp.path().join("data/index/vectors.bin")).unwrap();

    let (_, _, success) = run_ragkit(&config_path, &["ingest"]);
    assert!(success);
    let second = fs::read(tmp.path().join("data/index/chunks.jsonl")).unwrap();
    let second_vectors = fs::read(tmp.path().join("data/index/vectors.bin")).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_vectors, second_vectors);
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env();

    let bad = fs::read_to_string(&config_path)
        .unwrap()
        .replace("overlap_chars = 200", "overlap_chars = 1000");
    fs::write(&config_path, bad).unwrap();

    let (_, stderr, success) = run_ragkit(&config_path, &["ingest"]);
    assert!(!success);
    assert!(stderr.contains("overlap_chars"), "stderr: {}", stderr);
}
