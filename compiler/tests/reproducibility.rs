// Reproducibility tests for hermetic builds.
//
// The generator must produce byte-identical output for identical inputs,
// and build-info must change exactly when the document or options change.

use std::path::{Path, PathBuf};
use std::process::Command;

fn flowgen_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_flowgen"))
}

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn demo(name: &str) -> String {
    project_root()
        .join("demos")
        .join(name)
        .to_str()
        .unwrap()
        .to_string()
}

fn run_flowgen(args: &[&str]) -> String {
    let output = Command::new(flowgen_binary())
        .args(args)
        .output()
        .expect("failed to run flowgen");
    assert!(
        output.status.success(),
        "flowgen failed with args {:?}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("non-UTF8 output")
}

fn build_info(args: &[&str]) -> serde_json::Value {
    let json = run_flowgen(args);
    serde_json::from_str(&json).expect("build-info is not valid JSON")
}

/// Generating the same document twice produces byte-identical code.
#[test]
fn same_document_identical_js() {
    let src = demo("orders.json");
    let first = run_flowgen(&["-o", "-", &src]);
    let second = run_flowgen(&["-o", "-", &src]);
    assert!(!first.is_empty());
    assert_eq!(first, second, "generated code should be byte-identical across runs");
}

#[test]
fn same_document_identical_dot() {
    let src = demo("orders.json");
    let first = run_flowgen(&["--emit", "dot", &src]);
    let second = run_flowgen(&["--emit", "dot", &src]);
    assert_eq!(first, second);
}

#[test]
fn build_info_is_stable() {
    let src = demo("orders.json");
    let first = build_info(&["--emit", "build-info", &src]);
    let second = build_info(&["--emit", "build-info", &src]);
    assert_eq!(first, second);
    assert_eq!(first["manifest_schema_version"], 1);
    assert_eq!(first["source_hash"].as_str().unwrap().len(), 64);
    assert_eq!(first["compiler_version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn build_info_tracks_document_and_options() {
    let orders = demo("orders.json");
    let broken = demo("broken_port.json");
    let base = build_info(&["--emit", "build-info", &orders]);
    let other_doc = build_info(&["--emit", "build-info", &broken]);
    let other_opts = build_info(&["--emit", "build-info", "--module", "commonjs", &orders]);

    assert_ne!(base["source_hash"], other_doc["source_hash"]);
    assert_eq!(base["options_fingerprint"], other_doc["options_fingerprint"]);

    assert_eq!(base["source_hash"], other_opts["source_hash"]);
    assert_ne!(base["options_fingerprint"], other_opts["options_fingerprint"]);
}

/// The output file and stdout carry the same bytes.
#[test]
fn file_output_matches_stdout() {
    let src = demo("orders.json");
    let out = std::env::temp_dir().join(format!("flowgen_repro_{}.js", std::process::id()));
    let out_str = out.to_str().unwrap().to_string();

    run_flowgen(&["-o", &out_str, &src]);
    let written = std::fs::read_to_string(&out).expect("output file missing");
    let _ = std::fs::remove_file(&out);

    assert_eq!(written, run_flowgen(&["-o", "-", &src]));
}
