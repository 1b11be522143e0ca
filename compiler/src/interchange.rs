// interchange.rs — JSON IR documents
//
// The upstream analysis phase hands its IR over as a JSON document. This
// module decodes the document with serde, parses key and map expressions,
// resolves element references and builds a `DataflowGraph`.
//
// Document shape:
//
//   { "elements":     [ { "kind": "table", "relation": "t", "last_key_col_index": 0 },
//                       { "kind": "input", "relation": "a" },
//                       { "kind": "hash_equi_join", "build_key": "$0[0]",
//                         "probe_key": "$0[1]", "left_is_build": true },
//                       { "kind": "map", "function": "$0", "arity": 1 },
//                       { "kind": "scanner", "target": "a" } ],
//     "edges":        [ { "from": "a", "to": 2, "port": "leftInput" } ],
//     "strata":       [ { "index": 0, "elements": ["a", 2] } ],
//     "invalidation": [ { "key": "t", "values": [2] } ],
//     "rescan":       [] }
//
// An element reference is either a position in `elements` or a relation
// name. Element ids are assigned in document order.
//
// Preconditions: none.
// Postconditions: on success the graph's ids equal document positions.
// Failure modes: malformed JSON (E0002), dangling references (E0002),
//                expression syntax errors (E0201).
// Side effects: `load_file` reads one file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diag::{codes, Diagnostic};
use crate::expr::Expr;
use crate::id::ElementId;
use crate::ir::{DataflowGraph, GraphBuilder, InputPortName};
use crate::parser::parse_expr;

// ── Document schema ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrDocument {
    pub elements: Vec<ElementDoc>,
    #[serde(default)]
    pub edges: Vec<EdgeDoc>,
    #[serde(default)]
    pub strata: Vec<StratumDoc>,
    #[serde(default)]
    pub invalidation: Vec<LookupEntryDoc>,
    #[serde(default)]
    pub rescan: Vec<LookupEntryDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementDoc {
    Table {
        relation: String,
        last_key_col_index: u32,
    },
    Input {
        relation: String,
    },
    HashEquiJoin {
        build_key: String,
        probe_key: String,
        left_is_build: bool,
    },
    Map {
        function: String,
        arity: u32,
    },
    Scanner {
        target: ElementRef,
    },
}

/// Position in `elements`, or a relation name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementRef {
    Index(u32),
    Name(String),
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementRef::Index(i) => write!(f, "{}", i),
            ElementRef::Name(name) => write!(f, "{:?}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDoc {
    #[serde(rename = "leftInput")]
    LeftInput,
    #[serde(rename = "rightInput")]
    RightInput,
    #[serde(rename = "deltaIn")]
    DeltaIn,
    #[serde(rename = "input")]
    Input,
}

impl From<PortDoc> for InputPortName {
    fn from(port: PortDoc) -> Self {
        match port {
            PortDoc::LeftInput => InputPortName::LeftInput,
            PortDoc::RightInput => InputPortName::RightInput,
            PortDoc::DeltaIn => InputPortName::DeltaIn,
            PortDoc::Input => InputPortName::Input,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeDoc {
    pub from: ElementRef,
    pub to: ElementRef,
    pub port: PortDoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StratumDoc {
    pub index: u32,
    pub elements: Vec<ElementRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupEntryDoc {
    pub key: ElementRef,
    pub values: Vec<ElementRef>,
}

// ── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed IR document: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoadError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self {
            LoadError::Io { .. } => codes::E0001,
            LoadError::Json(_) => codes::E0002,
        };
        Diagnostic::error(self.to_string()).with_code(code)
    }
}

/// Read an IR document from disk without decoding it.
pub fn read_source(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_document(source: &str) -> Result<IrDocument, LoadError> {
    Ok(serde_json::from_str(source)?)
}

// ── Loading ────────────────────────────────────────────────────────────────

/// Result of loading: the graph (absent on error) plus diagnostics.
#[derive(Debug)]
pub struct LoadResult {
    pub graph: Option<DataflowGraph>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Decode JSON text and build the graph.
pub fn load_str(source: &str) -> LoadResult {
    match parse_document(source) {
        Ok(doc) => build_graph(&doc),
        Err(e) => LoadResult {
            graph: None,
            diagnostics: vec![e.to_diagnostic()],
        },
    }
}

/// Read, decode and build in one step.
pub fn load_file(path: &Path) -> LoadResult {
    match read_source(path) {
        Ok(source) => load_str(&source),
        Err(e) => LoadResult {
            graph: None,
            diagnostics: vec![e.to_diagnostic()],
        },
    }
}

/// Build a `DataflowGraph` from a decoded document.
pub fn build_graph(doc: &IrDocument) -> LoadResult {
    let mut loader = Loader {
        names: HashMap::new(),
        len: doc.elements.len(),
        diagnostics: Vec::new(),
    };
    for (i, el) in doc.elements.iter().enumerate() {
        if let ElementDoc::Table { relation, .. } | ElementDoc::Input { relation } = el {
            loader
                .names
                .entry(relation.clone())
                .or_insert(ElementId(i as u32));
        }
    }

    let mut b = GraphBuilder::new();
    for (i, el) in doc.elements.iter().enumerate() {
        let subject = i.to_string();
        match el {
            ElementDoc::Table {
                relation,
                last_key_col_index,
            } => {
                b.table(relation, *last_key_col_index);
            }
            ElementDoc::Input { relation } => {
                b.input(relation);
            }
            ElementDoc::HashEquiJoin {
                build_key,
                probe_key,
                left_is_build,
            } => {
                let build = loader.expr(&subject, "build_key", build_key);
                let probe = loader.expr(&subject, "probe_key", probe_key);
                b.join(build, probe, *left_is_build);
            }
            ElementDoc::Map { function, arity } => {
                let function = loader.expr(&subject, "function", function);
                b.map(function, *arity);
            }
            ElementDoc::Scanner { target } => {
                // An unresolved target still takes this slot so later ids stay aligned.
                let target = loader
                    .resolve(target, "scanner target")
                    .unwrap_or(ElementId(u32::MAX));
                b.scanner(target);
            }
        }
    }

    for edge in &doc.edges {
        let from = loader.resolve(&edge.from, "edge source");
        let to = loader.resolve(&edge.to, "edge target");
        if let (Some(from), Some(to)) = (from, to) {
            b.connect(from, to, edge.port.into());
        }
    }

    for stratum in &doc.strata {
        let members = loader.resolve_all(&stratum.elements, "stratum member");
        b.stratum(stratum.index, &members);
    }
    for entry in &doc.invalidation {
        if let Some(key) = loader.resolve(&entry.key, "invalidation key") {
            let values = loader.resolve_all(&entry.values, "invalidation value");
            b.invalidate(key, &values);
        }
    }
    for entry in &doc.rescan {
        if let Some(key) = loader.resolve(&entry.key, "rescan key") {
            let values = loader.resolve_all(&entry.values, "rescan value");
            b.rescan(key, &values);
        }
    }

    let failed = crate::diag::has_errors(&loader.diagnostics);
    LoadResult {
        graph: if failed { None } else { Some(b.build()) },
        diagnostics: loader.diagnostics,
    }
}

struct Loader {
    names: HashMap<String, ElementId>,
    len: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Loader {
    fn resolve(&mut self, r: &ElementRef, what: &str) -> Option<ElementId> {
        let found = match r {
            ElementRef::Index(i) if (*i as usize) < self.len => Some(ElementId(*i)),
            ElementRef::Index(_) => None,
            ElementRef::Name(name) => self.names.get(name).copied(),
        };
        if found.is_none() {
            self.diagnostics.push(
                Diagnostic::error(format!("{} {} does not name an element", what, r))
                    .with_code(codes::E0002),
            );
        }
        found
    }

    fn resolve_all(&mut self, refs: &[ElementRef], what: &str) -> Vec<ElementId> {
        refs.iter().filter_map(|r| self.resolve(r, what)).collect()
    }

    /// Parse an expression field. On failure records E0201 and returns a
    /// placeholder; the graph is discarded in that case.
    fn expr(&mut self, subject: &str, field: &str, source: &str) -> Expr {
        let result = parse_expr(source);
        for err in &result.errors {
            self.diagnostics.push(
                Diagnostic::error(format!("{}: {}", field, err))
                    .with_code(codes::E0201)
                    .with_subject(subject)
                    .with_span(*err.span())
                    .with_hint("expressions look like `$0[1]` or `[$0, $1 + 1]`"),
            );
        }
        let ok = result.is_ok();
        match result.expr {
            Some(expr) if ok => expr,
            _ => Expr::param(0),
        }
    }
}
