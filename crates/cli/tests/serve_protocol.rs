use assert_cmd::Command;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn scenario_text() -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/scenario.json");
    fs::read_to_string(path).unwrap()
}

#[allow(deprecated)]
fn serve(extra_args: &[&str], requests: &[Value], raw_lines: &[&str]) -> Vec<Value> {
    let temp = tempdir().unwrap();
    let mut input = String::new();
    for line in raw_lines {
        input.push_str(line);
        input.push('\n');
    }
    for request in requests {
        input.push_str(&request.to_string());
        input.push('\n');
    }

    let output = Command::cargo_bin("chunk-finder")
        .expect("binary")
        .current_dir(temp.path())
        .env_remove("CHUNK_FINDER_CONFIG")
        .arg("serve")
        .args(extra_args)
        .write_stdin(input)
        .output()
        .expect("command run");
    assert!(output.status.success(), "serve exited with {:?}", output.status);

    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

fn terminal(responses: &[Value]) -> Vec<&Value> {
    responses.iter().filter(|r| r["type"] != "progress").collect()
}

#[test]
fn init_then_compute() {
    let responses = serve(
        &[],
        &[
            json!({"type": "initFromText", "text": scenario_text()}),
            json!({"type": "compute", "selected": ["A", "B"], "mode": "ANY"}),
            json!({"type": "compute", "selected": ["A", "B"], "mode": "ALL"}),
        ],
        &[],
    );

    assert_eq!(responses[0]["type"], "progress");
    assert!(responses
        .iter()
        .filter(|r| r["type"] == "progress")
        .all(|r| r["pct"].as_u64().unwrap() <= 100));

    let done = terminal(&responses);
    assert_eq!(done.len(), 3);
    assert_eq!(done[0]["type"], "ready");
    assert_eq!(done[0]["featureIds"], json!(["A", "B"]));
    assert_eq!(done[0]["chunkCount"], 2);
    assert_eq!(
        *done[1],
        json!({"type": "result", "chunks": ["chunk_id_1", "chunk_id_2"]})
    );
    assert_eq!(*done[2], json!({"type": "result", "chunks": []}));
}

#[test]
fn compute_before_init_is_an_error() {
    let responses = serve(
        &["--no-progress"],
        &[json!({"type": "compute", "selected": ["A"], "mode": "ALL"})],
        &[],
    );
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["type"], "error");
    assert_eq!(responses[0]["code"], "not_loaded");
}

#[test]
fn malformed_lines_do_not_stop_the_session() {
    let responses = serve(
        &["--no-progress"],
        &[
            json!({"type": "initFromText", "text": "{\"nodes\": 5}"}),
            json!({"type": "initFromText", "text": scenario_text(), "chunkGroupHint": 0}),
        ],
        &["not json", r#"{"type": "explode"}"#],
    );

    let types: Vec<&str> = responses
        .iter()
        .map(|r| r["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["error", "error", "error", "ready"]);
    assert!(responses[..3]
        .iter()
        .all(|r| r["code"] == "malformed_input" && r["error"].is_string()));
    // pinned chunk group; the remaining group has no file-like ids
    assert_eq!(responses[3]["chunkGroup"], 0);
    assert_eq!(responses[3]["fileGroup"], 1);
    assert_eq!(
        responses[3]["featureIds"],
        json!(["chunk_id_1", "chunk_id_2"])
    );
}

#[test]
#[allow(deprecated)]
fn invalid_utf8_line_gets_an_error_and_session_continues() {
    let temp = tempdir().unwrap();
    let mut input = b"{\"type\":\"compute\",\"selected\":[\"\xff\"],\"mode\":\"ALL\"}\n".to_vec();
    input.extend_from_slice(b"{\"type\":\"compute\",\"selected\":[],\"mode\":\"ALL\"}\n");

    let output = Command::cargo_bin("chunk-finder")
        .expect("binary")
        .current_dir(temp.path())
        .env_remove("CHUNK_FINDER_CONFIG")
        .args(["serve", "--no-progress"])
        .write_stdin(input)
        .output()
        .expect("command run");
    assert!(output.status.success(), "serve exited with {:?}", output.status);

    let responses: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["type"], "error");
    assert_eq!(responses[0]["code"], "malformed_input");
    // nothing loaded yet, so the valid compute still gets a terminal answer
    assert_eq!(responses[1]["type"], "error");
    assert_eq!(responses[1]["code"], "not_loaded");
}
