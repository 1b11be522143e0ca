// pipeline.rs — Compilation state and pass orchestration
//
// Holds all pass artifacts and runs the minimal set of passes for a given
// terminal PassId.
//
// Preconditions: the IR document text is set before calling run_pipeline.
// Postconditions: all artifacts for required passes are populated, or has_error is set.
// Failure modes: any pass emitting error-level diagnostics.
// Side effects: calls on_pass_complete after each pass for immediate display;
//               emits tracing events.

use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::codegen::{CodegenOptions, GeneratedCode, ModuleFormat};
use crate::diag::{has_errors, Diagnostic, DiagLevel};
use crate::ir::{DataflowGraph, GraphCert};
use crate::pass::{descriptor, required_passes, PassId};

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible builds and cache keys.
///
/// `source_hash`: SHA-256 of the raw IR document text.
/// `options_fingerprint`: SHA-256 of the canonical codegen options string.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub options_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

#[derive(Serialize)]
struct BuildInfo<'a> {
    source_hash: String,
    options_fingerprint: String,
    manifest_schema_version: u32,
    compiler_version: &'a str,
}

impl Provenance {
    /// Hex string of the source hash (64 characters).
    pub fn source_hash_hex(&self) -> String {
        bytes_to_hex(&self.source_hash)
    }

    pub fn options_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.options_fingerprint)
    }

    /// Serialize provenance as pretty JSON for `--emit build-info`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let info = BuildInfo {
            source_hash: self.source_hash_hex(),
            options_fingerprint: self.options_fingerprint_hex(),
            manifest_schema_version: 1,
            compiler_version: self.compiler_version,
        };
        let mut json = serde_json::to_string_pretty(&info)?;
        json.push('\n');
        Ok(json)
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Canonical one-line form of the options; stable across runs.
fn canonical_options(options: &CodegenOptions) -> String {
    let module = match options.module {
        ModuleFormat::Esm => "esm",
        ModuleFormat::CommonJs => "commonjs",
    };
    format!(
        "factory={};module={};comments={}",
        options.factory_name, module, options.comments
    )
}

/// Compute provenance from the IR document text and codegen options.
pub fn compute_provenance(source: &str, options: &CodegenOptions) -> Provenance {
    Provenance {
        source_hash: sha256(source.as_bytes()),
        options_fingerprint: sha256(canonical_options(options).as_bytes()),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Compilation state ──────────────────────────────────────────────────────

/// Holds all compilation artifacts and accumulated diagnostics.
pub struct CompilationState {
    pub source: String,
    pub graph: Option<DataflowGraph>,
    pub cert: Option<GraphCert>,
    pub generated: Option<GeneratedCode>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
    pub provenance: Option<Provenance>,
}

impl CompilationState {
    pub fn new(source: String) -> Self {
        Self {
            source,
            graph: None,
            cert: None,
            generated: None,
            diagnostics: Vec::new(),
            has_error: false,
            provenance: None,
        }
    }
}

// ── Error type ─────────────────────────────────────────────────────────────

/// Pipeline execution failed due to error-level diagnostics in a pass.
/// The specific diagnostics are available in `CompilationState.diagnostics`.
#[derive(Debug, Error)]
#[error("{} pass failed", pass_name(.failing_pass))]
pub struct PipelineError {
    /// The pass that produced the error.
    pub failing_pass: PassId,
}

fn pass_name(id: &PassId) -> &'static str {
    descriptor(*id).name
}

/// Per-pass post-processing: callback, accumulate, log, error check.
fn finish_pass(
    state: &mut CompilationState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    on_pass_complete(pass_id, &diags);
    for d in diags.iter().filter(|d| d.level == DiagLevel::Warning) {
        warn!(pass = descriptor(pass_id).name, "{}", d);
    }
    let is_err = has_errors(&diags);
    state.diagnostics.extend(diags);
    debug!(
        pass = descriptor(pass_id).name,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "pass complete"
    );
    if is_err {
        state.has_error = true;
        return Err(PipelineError {
            failing_pass: pass_id,
        });
    }
    Ok(())
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: execute → on_pass_complete(callback) → log → error check.
///
/// Preconditions: `state.source` holds the IR document text.
/// Postconditions: artifacts for all passes in `required_passes(terminal)` are
///   populated, or `state.has_error` is true.
/// Failure modes: any pass producing error-level diagnostics.
/// Side effects: calls `on_pass_complete` after each pass.
pub fn run_pipeline(
    state: &mut CompilationState,
    terminal: PassId,
    codegen_options: &CodegenOptions,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    state.provenance = Some(compute_provenance(&state.source, codegen_options));

    for pass_id in required_passes(terminal) {
        let t = Instant::now();
        match pass_id {
            PassId::Load => {
                let result = crate::interchange::load_str(&state.source);
                state.graph = result.graph;
                finish_pass(state, pass_id, result.diagnostics, t.elapsed(), &mut on_pass_complete)?;
            }
            PassId::Validate => {
                let graph = state.graph.as_ref().ok_or(PipelineError {
                    failing_pass: PassId::Load,
                })?;
                let result = crate::ir::validate(graph);
                state.cert = Some(result.cert);
                finish_pass(state, pass_id, result.diagnostics, t.elapsed(), &mut on_pass_complete)?;
            }
            PassId::Codegen => {
                let graph = state.graph.as_ref().ok_or(PipelineError {
                    failing_pass: PassId::Load,
                })?;
                let result = crate::codegen::codegen(graph, codegen_options);
                state.generated = result.generated;
                finish_pass(state, pass_id, result.diagnostics, t.elapsed(), &mut on_pass_complete)?;
            }
        }
    }
    Ok(())
}
