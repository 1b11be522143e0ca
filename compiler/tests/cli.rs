// Command-line behaviour: exit codes, emit stages and option flags.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

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

fn flowgen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flowgen"))
        .args(args)
        .output()
        .expect("failed to run flowgen")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// ── Exit codes ──────────────────────────────────────────────────────────────

#[test]
fn valid_document_exits_zero() {
    let out = flowgen(&["-o", "-", &demo("orders.json")]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let js = stdout(&out);
    assert!(js.starts_with("// Generated by flowgen"));
    assert!(js.contains("export function createPipeline(runtime) {"));
}

#[test]
fn validation_error_exits_one() {
    let out = flowgen(&["-o", "-", &demo("broken_port.json")]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).is_empty());
    let err = stderr(&out);
    assert!(err.contains("error[E0104]"), "stderr: {}", err);
    assert!(err.contains("validate pass failed"), "stderr: {}", err);
}

#[test]
fn missing_file_exits_two() {
    let missing = project_root().join("demos").join("no_such_document.json");
    let out = flowgen(&[missing.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("no_such_document.json"));
}

#[test]
fn malformed_document_exits_one() {
    let path = std::env::temp_dir().join(format!("flowgen_cli_bad_{}.json", std::process::id()));
    std::fs::write(&path, "{ \"elements\": [ { \"kind\": \"bogus\" } ] }").unwrap();
    let out = flowgen(&["-o", "-", path.to_str().unwrap()]);
    let _ = std::fs::remove_file(&path);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("E0002"), "stderr: {}", stderr(&out));
}

// ── Emit stages ─────────────────────────────────────────────────────────────

#[test]
fn emit_ir_prints_graph_summary() {
    let out = flowgen(&["--emit", "ir", &demo("orders.json")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let ir = stdout(&out);
    assert!(ir.starts_with("DataflowGraph (7 elements"), "{}", ir);
    assert!(ir.contains("  0: table customers"));
    assert!(ir.contains("  stratum 0: ["));
    assert!(ir.contains("  stratum 1: ["));
}

#[test]
fn emit_dot_prints_digraph() {
    let out = flowgen(&["--emit", "dot", &demo("orders.json")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let dot = stdout(&out);
    assert!(dot.starts_with("digraph dataflow {"));
    assert!(dot.contains("subgraph cluster_s0 {"));
    assert!(dot.contains("subgraph cluster_s1 {"));
    assert!(dot.trim_end().ends_with('}'));
}

/// Non-code stages stop after loading, so invalid wiring still renders.
#[test]
fn emit_dot_skips_validation() {
    let out = flowgen(&["--emit", "dot", &demo("broken_port.json")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("e0 -> e1 [label=\"input\"];"));
}

#[test]
fn default_output_path_is_next_to_source() {
    let dir = std::env::temp_dir().join(format!("flowgen_cli_out_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let src = dir.join("orders.json");
    std::fs::copy(demo("orders.json"), &src).unwrap();

    let out = flowgen(&[src.to_str().unwrap()]);
    let written = std::fs::read_to_string(dir.join("orders.js"));
    let _ = std::fs::remove_dir_all(&dir);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).is_empty());
    assert!(written.unwrap().contains("createPipeline"));
}

// ── Options ─────────────────────────────────────────────────────────────────

#[test]
fn commonjs_module_format() {
    let out = flowgen(&["-o", "-", "--module", "commonjs", &demo("orders.json")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let js = stdout(&out);
    assert!(js.contains("\nfunction createPipeline(runtime) {"));
    assert!(!js.contains("export function"));
    assert!(js.trim_end().ends_with("module.exports = { createPipeline };"));
}

#[test]
fn custom_factory_name() {
    let out = flowgen(&["-o", "-", "--factory", "buildOrders", &demo("orders.json")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("export function buildOrders(runtime) {"));
}

#[test]
fn invalid_factory_name_is_rejected() {
    let out = flowgen(&["-o", "-", "--factory", "not-an-ident", &demo("orders.json")]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("E0705"), "stderr: {}", stderr(&out));
}

#[test]
fn no_comments_keeps_only_header() {
    let with = stdout(&flowgen(&["-o", "-", &demo("orders.json")]));
    let without = stdout(&flowgen(&["-o", "-", "--no-comments", &demo("orders.json")]));
    assert!(with.contains("// stratum 0"));
    assert!(!without.contains("// stratum"));
    assert!(without.starts_with("// Generated by flowgen"));
    assert!(without.len() < with.len());
}

#[test]
fn verbose_logs_passes_to_stderr() {
    let out = flowgen(&["-o", "-", "--verbose", &demo("orders.json")]);
    assert!(out.status.success());
    let err = stderr(&out);
    assert!(err.contains("pass complete"), "stderr: {}", err);
    assert!(!stdout(&out).contains("pass complete"));
}
