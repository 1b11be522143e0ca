// ir.rs — Dataflow IR consumed by code generation
//
// A `DataflowGraph` is the output of the upstream analysis phase: an arena of
// relational operators (tables, inputs, hash equi-joins, maps, scanners)
// connected by typed ports, plus the stratification order and the
// precomputed invalidation and rescan relations.
//
// Preconditions: graphs are assembled through `GraphBuilder`, which assigns
//                every `ElementId` exactly once.
// Postconditions: `validate` reports every well-formedness violation as a
//                 diagnostic and summarizes the result in a `GraphCert`.
// Failure modes: none at build time; malformed graphs are reported by `validate`.
// Side effects: none.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::codegen::FACTORY_LOCALS;
use crate::diag::{codes, Diagnostic};
use crate::expr::Expr;
use crate::id::{ElementId, IdAllocator};

// ── Ports ───────────────────────────────────────────────────────────────────

/// Input port roles. Each element variant accepts a fixed subset, see
/// `ElementKind::input_ports`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputPortName {
    LeftInput,
    RightInput,
    DeltaIn,
    Input,
}

impl InputPortName {
    pub fn as_str(self) -> &'static str {
        match self {
            InputPortName::LeftInput => "leftInput",
            InputPortName::RightInput => "rightInput",
            InputPortName::DeltaIn => "deltaIn",
            InputPortName::Input => "input",
        }
    }
}

impl fmt::Display for InputPortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputPortName {
    Output,
}

impl OutputPortName {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputPortName::Output => "output",
        }
    }
}

impl fmt::Display for OutputPortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination endpoint of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPort {
    pub element: ElementId,
    pub name: InputPortName,
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: ElementId,
    pub source_port: OutputPortName,
    pub target: InputPort,
}

/// An output port and its connections, in delivery order.
#[derive(Debug, Clone)]
pub struct OutputPort {
    pub name: OutputPortName,
    pub owner: ElementId,
    pub connections: Vec<Edge>,
}

// ── Elements ────────────────────────────────────────────────────────────────

/// The closed set of dataflow operators.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Passive materialized state for one relation.
    Table {
        relation: String,
        last_key_col_index: u32,
    },
    /// External ingestion point for one relation.
    Input { relation: String },
    /// Binary join; `left_is_build` marks the left side as materialized.
    HashEquiJoin {
        build_key: Expr,
        probe_key: Expr,
        left_is_build: bool,
    },
    /// Unary transform over tuples of `arity` positional fields.
    Map { function: Expr, arity: u32 },
    /// On-demand cursor over one table or input.
    Scanner { target: ElementId },
}

/// Discriminant of `ElementKind`, for messages and vocabulary lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementVariant {
    Table,
    Input,
    HashEquiJoin,
    Map,
    Scanner,
}

impl fmt::Display for ElementVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementVariant::Table => "table",
            ElementVariant::Input => "input",
            ElementVariant::HashEquiJoin => "hash equi-join",
            ElementVariant::Map => "map",
            ElementVariant::Scanner => "scanner",
        };
        f.write_str(s)
    }
}

impl ElementKind {
    pub fn variant(&self) -> ElementVariant {
        match self {
            ElementKind::Table { .. } => ElementVariant::Table,
            ElementKind::Input { .. } => ElementVariant::Input,
            ElementKind::HashEquiJoin { .. } => ElementVariant::HashEquiJoin,
            ElementKind::Map { .. } => ElementVariant::Map,
            ElementKind::Scanner { .. } => ElementVariant::Scanner,
        }
    }
}

impl ElementVariant {
    /// Input port vocabulary of the variant.
    pub fn input_ports(self) -> &'static [InputPortName] {
        match self {
            ElementVariant::HashEquiJoin => &[InputPortName::LeftInput, InputPortName::RightInput],
            ElementVariant::Table => &[InputPortName::DeltaIn],
            ElementVariant::Input | ElementVariant::Map => &[InputPortName::Input],
            ElementVariant::Scanner => &[],
        }
    }

    /// Output port vocabulary of the variant. Tables have none.
    pub fn output_ports(self) -> &'static [OutputPortName] {
        match self {
            ElementVariant::Table => &[],
            ElementVariant::Input
            | ElementVariant::HashEquiJoin
            | ElementVariant::Map
            | ElementVariant::Scanner => &[OutputPortName::Output],
        }
    }

    /// Tables and inputs can be wrapped by a scanner.
    pub fn is_scannable(self) -> bool {
        matches!(self, ElementVariant::Table | ElementVariant::Input)
    }
}

/// How an element is identified outside the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementIdentity<'a> {
    Relation(&'a str),
    Numeric(ElementId),
}

impl fmt::Display for ElementIdentity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementIdentity::Relation(name) => f.write_str(name),
            ElementIdentity::Numeric(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub outputs: Vec<OutputPort>,
}

impl Element {
    pub fn variant(&self) -> ElementVariant {
        self.kind.variant()
    }

    pub fn relation(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Table { relation, .. } | ElementKind::Input { relation } => {
                Some(relation)
            }
            _ => None,
        }
    }

    pub fn identity(&self) -> ElementIdentity<'_> {
        match self.relation() {
            Some(name) => ElementIdentity::Relation(name),
            None => ElementIdentity::Numeric(self.id),
        }
    }

    /// All outgoing edges, port by port, in connection order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.outputs.iter().flat_map(|p| p.connections.iter())
    }
}

// ── Strata and lookup tables ────────────────────────────────────────────────

/// One evaluation stratum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stratum {
    pub index: u32,
    pub elements: Vec<ElementId>,
}

/// Element → ordered element list. Entry order and value order are kept
/// exactly as supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    pub entries: Vec<(ElementId, Vec<ElementId>)>,
}

impl LookupTable {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ── Graph ───────────────────────────────────────────────────────────────────

/// The complete dataflow IR. Read-only once built.
#[derive(Debug, Clone)]
pub struct DataflowGraph {
    elements: Vec<Element>,
    pub tables: BTreeMap<String, ElementId>,
    pub inputs: BTreeMap<String, ElementId>,
    pub strata: Vec<Stratum>,
    pub invalidation: LookupTable,
    pub rescan: LookupTable,
}

impl DataflowGraph {
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.index())
    }

    /// Every edge in the graph, grouped by source element in arena order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.elements.iter().flat_map(Element::edges)
    }

    /// Strata sorted by ascending index; equal indices keep their order.
    pub fn strata_in_order(&self) -> Vec<&Stratum> {
        let mut strata: Vec<&Stratum> = self.strata.iter().collect();
        strata.sort_by_key(|s| s.index);
        strata
    }

    /// Elements in stratified traversal order.
    pub fn stratified_elements(&self) -> Vec<(u32, &Element)> {
        let mut out = Vec::new();
        for stratum in self.strata_in_order() {
            for &id in &stratum.elements {
                if let Some(el) = self.element(id) {
                    out.push((stratum.index, el));
                }
            }
        }
        out
    }

    /// Label used in diagnostics: relation name or numeric id.
    pub fn label(&self, id: ElementId) -> String {
        match self.element(id) {
            Some(el) => el.identity().to_string(),
            None => format!("#{}", id),
        }
    }
}

impl fmt::Display for DataflowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "DataflowGraph ({} elements, {} edges, {} strata)",
            self.elements.len(),
            self.edges().count(),
            self.strata.len()
        )?;
        for el in &self.elements {
            match &el.kind {
                ElementKind::Table {
                    relation,
                    last_key_col_index,
                } => writeln!(f, "  {}: table {} (key bound {})", el.id, relation, last_key_col_index)?,
                ElementKind::Input { relation } => writeln!(f, "  {}: input {}", el.id, relation)?,
                ElementKind::HashEquiJoin { left_is_build, .. } => writeln!(
                    f,
                    "  {}: hash equi-join (build side {})",
                    el.id,
                    if *left_is_build { "left" } else { "right" }
                )?,
                ElementKind::Map { arity, .. } => writeln!(f, "  {}: map (arity {})", el.id, arity)?,
                ElementKind::Scanner { target } => {
                    writeln!(f, "  {}: scanner over {}", el.id, self.label(*target))?
                }
            }
            for edge in el.edges() {
                writeln!(
                    f,
                    "    {} -> {}.{}",
                    edge.source_port,
                    self.label(edge.target.element),
                    edge.target.name
                )?;
            }
        }
        for stratum in self.strata_in_order() {
            let members: Vec<String> = stratum.elements.iter().map(|id| self.label(*id)).collect();
            writeln!(f, "  stratum {}: [{}]", stratum.index, members.join(", "))?;
        }
        if !self.invalidation.is_empty() {
            writeln!(f, "  invalidation entries: {}", self.invalidation.len())?;
        }
        if !self.rescan.is_empty() {
            writeln!(f, "  rescan entries: {}", self.rescan.len())?;
        }
        Ok(())
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Assembles a `DataflowGraph`. IDs are allocated here, once, in call order.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    ids: IdAllocator,
    elements: Vec<Element>,
    tables: BTreeMap<String, ElementId>,
    inputs: BTreeMap<String, ElementId>,
    strata: Vec<Stratum>,
    invalidation: LookupTable,
    rescan: LookupTable,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: ElementKind) -> ElementId {
        let id = self.ids.alloc_element();
        let outputs = kind
            .variant()
            .output_ports()
            .iter()
            .map(|&name| OutputPort {
                name,
                owner: id,
                connections: Vec::new(),
            })
            .collect();
        self.elements.push(Element { id, kind, outputs });
        id
    }

    /// Declare a table. A repeated relation name keeps the first entry in
    /// the `tables` map; `validate` reports the clash.
    pub fn table(&mut self, relation: &str, last_key_col_index: u32) -> ElementId {
        let id = self.push(ElementKind::Table {
            relation: relation.to_string(),
            last_key_col_index,
        });
        self.tables.entry(relation.to_string()).or_insert(id);
        id
    }

    pub fn input(&mut self, relation: &str) -> ElementId {
        let id = self.push(ElementKind::Input {
            relation: relation.to_string(),
        });
        self.inputs.entry(relation.to_string()).or_insert(id);
        id
    }

    pub fn join(&mut self, build_key: Expr, probe_key: Expr, left_is_build: bool) -> ElementId {
        self.push(ElementKind::HashEquiJoin {
            build_key,
            probe_key,
            left_is_build,
        })
    }

    pub fn map(&mut self, function: Expr, arity: u32) -> ElementId {
        self.push(ElementKind::Map { function, arity })
    }

    pub fn scanner(&mut self, target: ElementId) -> ElementId {
        self.push(ElementKind::Scanner { target })
    }

    /// Connect `source`'s output port to `port` on `target`. Edges keep
    /// their connection order.
    pub fn connect(&mut self, source: ElementId, target: ElementId, port: InputPortName) {
        let Some(el) = self.elements.get_mut(source.index()) else {
            return;
        };
        let edge = Edge {
            source,
            source_port: OutputPortName::Output,
            target: InputPort {
                element: target,
                name: port,
            },
        };
        match el.outputs.iter_mut().find(|p| p.name == OutputPortName::Output) {
            Some(out) => out.connections.push(edge),
            // Tables have no output port; keep the edge so validation sees it.
            None => el.outputs.push(OutputPort {
                name: OutputPortName::Output,
                owner: source,
                connections: vec![edge],
            }),
        }
    }

    pub fn stratum(&mut self, index: u32, elements: &[ElementId]) {
        self.strata.push(Stratum {
            index,
            elements: elements.to_vec(),
        });
    }

    pub fn invalidate(&mut self, key: ElementId, targets: &[ElementId]) {
        self.invalidation.entries.push((key, targets.to_vec()));
    }

    pub fn rescan(&mut self, key: ElementId, targets: &[ElementId]) {
        self.rescan.entries.push((key, targets.to_vec()));
    }

    pub fn build(self) -> DataflowGraph {
        DataflowGraph {
            elements: self.elements,
            tables: self.tables,
            inputs: self.inputs,
            strata: self.strata,
            invalidation: self.invalidation,
            rescan: self.rescan,
        }
    }
}

// ── Validation ──────────────────────────────────────────────────────────────

/// Well-formedness obligations checked by `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphCert {
    pub relations: bool,
    pub scanners: bool,
    pub ports: bool,
    pub functions: bool,
    pub strata: bool,
    pub lookups: bool,
}

impl GraphCert {
    pub fn all_pass(&self) -> bool {
        self.obligations().iter().all(|(_, ok)| *ok)
    }

    pub fn obligations(&self) -> [(&'static str, bool); 6] {
        [
            ("relations", self.relations),
            ("scanners", self.scanners),
            ("ports", self.ports),
            ("functions", self.functions),
            ("strata", self.strata),
            ("lookups", self.lookups),
        ]
    }
}

#[derive(Debug)]
pub struct ValidateResult {
    pub cert: GraphCert,
    pub diagnostics: Vec<Diagnostic>,
}

/// Check that `graph` is well formed for code generation.
pub fn validate(graph: &DataflowGraph) -> ValidateResult {
    let mut v = Validator {
        graph,
        diagnostics: Vec::new(),
    };
    let cert = GraphCert {
        relations: v.check_relations(),
        scanners: v.check_scanners(),
        ports: v.check_ports(),
        functions: v.check_functions(),
        strata: v.check_strata(),
        lookups: v.check_lookup("invalidation", &graph.invalidation)
            & v.check_lookup("rescan", &graph.rescan),
    };
    ValidateResult {
        cert,
        diagnostics: v.diagnostics,
    }
}

struct Validator<'a> {
    graph: &'a DataflowGraph,
    diagnostics: Vec<Diagnostic>,
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Validator<'_> {
    fn error(&mut self, d: Diagnostic) -> bool {
        self.diagnostics.push(d);
        false
    }

    fn check_relations(&mut self) -> bool {
        let mut ok = true;
        let mut seen: HashMap<&str, ElementId> = HashMap::new();
        for el in self.graph.elements() {
            let Some(relation) = el.relation() else {
                continue;
            };
            if !is_identifier(relation) || relation == "__proto__" {
                ok = self.error(
                    Diagnostic::error(format!("relation name {:?} is not an identifier", relation))
                        .with_code(codes::E0101)
                        .with_subject(relation),
                );
            }
            if let Some(first) = seen.insert(relation, el.id) {
                ok = self.error(
                    Diagnostic::error(format!(
                        "relation '{}' declared twice (elements {} and {})",
                        relation, first, el.id
                    ))
                    .with_code(codes::E0102)
                    .with_subject(relation),
                );
            }
        }
        ok
    }

    fn check_scanners(&mut self) -> bool {
        let mut ok = true;
        for el in self.graph.elements() {
            let ElementKind::Scanner { target } = &el.kind else {
                continue;
            };
            let scannable = self
                .graph
                .element(*target)
                .is_some_and(|t| t.variant().is_scannable());
            if !scannable {
                ok = self.error(
                    Diagnostic::error(format!(
                        "scanner target {} is not a table or input",
                        self.graph.label(*target)
                    ))
                    .with_code(codes::E0103)
                    .with_subject(el.id.to_string()),
                );
            }
        }
        ok
    }

    fn check_ports(&mut self) -> bool {
        let mut ok = true;
        for el in self.graph.elements() {
            let subject = el.identity().to_string();
            for port in &el.outputs {
                if port.connections.is_empty() {
                    continue;
                }
                if el.variant() == ElementVariant::Table {
                    self.diagnostics.push(
                        Diagnostic::warning(format!(
                            "{} outgoing edge(s) from a table are never subscribed",
                            port.connections.len()
                        ))
                        .with_code(codes::W0110)
                        .with_subject(subject.clone())
                        .with_hint("read tables through a scanner"),
                    );
                    continue;
                }
                if !el.variant().output_ports().contains(&port.name) {
                    ok = self.error(
                        Diagnostic::error(format!(
                            "{} has no output port '{}'",
                            el.variant(),
                            port.name
                        ))
                        .with_code(codes::E0104)
                        .with_subject(subject.clone()),
                    );
                }
            }
            for edge in el.edges() {
                let Some(target) = self.graph.element(edge.target.element) else {
                    ok = self.error(
                        Diagnostic::error(format!(
                            "edge targets unknown element #{}",
                            edge.target.element
                        ))
                        .with_code(codes::E0104)
                        .with_subject(subject.clone()),
                    );
                    continue;
                };
                if !target.variant().input_ports().contains(&edge.target.name) {
                    let expected: Vec<&str> = target
                        .variant()
                        .input_ports()
                        .iter()
                        .map(|p| p.as_str())
                        .collect();
                    ok = self.error(
                        Diagnostic::error(format!(
                            "{} has no input port '{}'",
                            target.variant(),
                            edge.target.name
                        ))
                        .with_code(codes::E0104)
                        .with_subject(target.identity().to_string())
                        .with_hint(if expected.is_empty() {
                            format!("a {} accepts no incoming edges", target.variant())
                        } else {
                            format!("valid ports: {}", expected.join(", "))
                        }),
                    );
                }
            }
        }
        ok
    }

    fn check_params(&mut self, subject: &str, what: &str, expr: &Expr, count: u32) -> bool {
        let mut ok = true;
        for (index, span) in expr.param_refs() {
            if index >= count {
                ok = self.error(
                    Diagnostic::error(format!(
                        "{} refers to ${} but takes {} parameter(s)",
                        what, index, count
                    ))
                    .with_code(codes::E0106)
                    .with_subject(subject)
                    .with_span(span),
                );
            }
        }
        for (name, span) in expr.free_names() {
            if FACTORY_LOCALS.contains(&name) {
                ok = self.error(
                    Diagnostic::error(format!(
                        "{} uses '{}', which the generated factory binds itself",
                        what, name
                    ))
                    .with_code(codes::E0111)
                    .with_subject(subject)
                    .with_span(span),
                );
            }
        }
        ok
    }

    fn check_functions(&mut self) -> bool {
        let mut ok = true;
        for el in self.graph.elements() {
            let subject = el.identity().to_string();
            match &el.kind {
                ElementKind::HashEquiJoin {
                    build_key,
                    probe_key,
                    ..
                } => {
                    ok &= self.check_params(&subject, "build key", build_key, 1);
                    ok &= self.check_params(&subject, "probe key", probe_key, 1);
                }
                ElementKind::Map { function, arity } => {
                    if *arity == 0 {
                        ok = self.error(
                            Diagnostic::error("map arity must be at least 1")
                                .with_code(codes::E0105)
                                .with_subject(subject.clone()),
                        );
                        continue;
                    }
                    ok &= self.check_params(&subject, "map function", function, *arity);
                }
                ElementKind::Table { .. } | ElementKind::Input { .. } | ElementKind::Scanner { .. } => {}
            }
        }
        ok
    }

    fn check_strata(&mut self) -> bool {
        let mut ok = true;
        let mut indices = HashSet::new();
        let mut placed: HashMap<ElementId, u32> = HashMap::new();
        for stratum in &self.graph.strata {
            if !indices.insert(stratum.index) {
                ok = self.error(
                    Diagnostic::error(format!("stratum {} listed twice", stratum.index))
                        .with_code(codes::E0108),
                );
            }
            for &id in &stratum.elements {
                if self.graph.element(id).is_none() {
                    ok = self.error(
                        Diagnostic::error(format!(
                            "stratum {} lists unknown element #{}",
                            stratum.index, id
                        ))
                        .with_code(codes::E0107),
                    );
                    continue;
                }
                if let Some(first) = placed.insert(id, stratum.index) {
                    ok = self.error(
                        Diagnostic::error(format!(
                            "element listed in stratum {} and again in stratum {}",
                            first, stratum.index
                        ))
                        .with_code(codes::E0108)
                        .with_subject(self.graph.label(id)),
                    );
                }
            }
        }
        for el in self.graph.elements() {
            let needs_stratum = matches!(
                el.variant(),
                ElementVariant::Input | ElementVariant::HashEquiJoin | ElementVariant::Map
            );
            if needs_stratum && !placed.contains_key(&el.id) {
                ok = self.error(
                    Diagnostic::error(format!("{} is not assigned to any stratum", el.variant()))
                        .with_code(codes::E0107)
                        .with_subject(el.identity().to_string()),
                );
            }
        }
        ok
    }

    fn check_lookup(&mut self, which: &str, table: &LookupTable) -> bool {
        let mut ok = true;
        let mut keys = HashSet::new();
        for (key, values) in &table.entries {
            if !keys.insert(*key) {
                ok = self.error(
                    Diagnostic::error(format!("{} table has a duplicate key", which))
                        .with_code(codes::E0109)
                        .with_subject(self.graph.label(*key)),
                );
            }
            for id in std::iter::once(key).chain(values.iter()) {
                if self.graph.element(*id).is_none() {
                    ok = self.error(
                        Diagnostic::error(format!(
                            "{} table references unknown element #{}",
                            which, id
                        ))
                        .with_code(codes::E0109),
                    );
                }
            }
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::DiagLevel;
    use crate::parser::parse_expr;

    fn codes_of(result: &ValidateResult) -> Vec<&'static str> {
        result
            .diagnostics
            .iter()
            .filter_map(|d| d.code.map(|c| c.0))
            .collect()
    }

    fn join_graph() -> (DataflowGraph, ElementId, ElementId, ElementId) {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let c = b.input("b");
        let j = b.join(Expr::param(0), Expr::param(0), true);
        b.connect(a, j, InputPortName::LeftInput);
        b.connect(c, j, InputPortName::RightInput);
        b.stratum(0, &[a, c, j]);
        (b.build(), a, c, j)
    }

    #[test]
    fn builder_assigns_ids_in_order() {
        let (g, a, c, j) = join_graph();
        assert_eq!((a, c, j), (ElementId(0), ElementId(1), ElementId(2)));
        assert_eq!(g.elements().len(), 3);
        assert_eq!(g.inputs.len(), 2);
        assert_eq!(g.edges().count(), 2);
    }

    #[test]
    fn well_formed_graph_passes() {
        let (g, ..) = join_graph();
        let result = validate(&g);
        assert!(result.diagnostics.is_empty(), "{:#?}", result.diagnostics);
        assert!(result.cert.all_pass());
    }

    #[test]
    fn edges_keep_connection_order() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let m1 = b.map(Expr::param(0), 1);
        let m2 = b.map(Expr::param(0), 1);
        b.connect(a, m2, InputPortName::Input);
        b.connect(a, m1, InputPortName::Input);
        let g = b.build();
        let targets: Vec<ElementId> = g.edges().map(|e| e.target.element).collect();
        assert_eq!(targets, vec![m2, m1]);
    }

    #[test]
    fn strata_sorted_by_index() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let m = b.map(Expr::param(0), 1);
        b.stratum(1, &[m]);
        b.stratum(0, &[a]);
        let g = b.build();
        let order: Vec<ElementId> = g.stratified_elements().iter().map(|(_, e)| e.id).collect();
        assert_eq!(order, vec![a, m]);
    }

    #[test]
    fn wrong_port_for_join_is_rejected() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let j = b.join(Expr::param(0), Expr::param(0), false);
        b.connect(a, j, InputPortName::Input);
        b.stratum(0, &[a, j]);
        let result = validate(&b.build());
        assert!(!result.cert.ports);
        assert_eq!(codes_of(&result), vec!["E0104"]);
        assert!(result.diagnostics[0].hint.as_deref().unwrap().contains("leftInput"));
    }

    #[test]
    fn duplicate_relation_is_rejected() {
        let mut b = GraphBuilder::new();
        b.table("r", 0);
        let i = b.input("r");
        b.stratum(0, &[i]);
        let result = validate(&b.build());
        assert!(!result.cert.relations);
        assert_eq!(codes_of(&result), vec!["E0102"]);
    }

    #[test]
    fn relation_names_must_be_identifiers() {
        let mut b = GraphBuilder::new();
        b.table("two words", 0);
        let result = validate(&b.build());
        assert_eq!(codes_of(&result), vec!["E0101"]);
    }

    #[test]
    fn proto_relation_name_is_rejected() {
        let mut b = GraphBuilder::new();
        let t = b.table("__proto__", 0);
        b.stratum(0, &[t]);
        let result = validate(&b.build());
        assert!(!result.cert.relations);
        assert_eq!(codes_of(&result), vec!["E0101"]);
    }

    #[test]
    fn scanner_over_map_is_rejected() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let m = b.map(Expr::param(0), 1);
        b.scanner(m);
        b.stratum(0, &[a, m]);
        let result = validate(&b.build());
        assert!(!result.cert.scanners);
        assert_eq!(codes_of(&result), vec!["E0103"]);
    }

    #[test]
    fn map_params_checked_against_arity() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let m = b.map(Expr::param(2), 2);
        let z = b.map(Expr::param(0), 0);
        b.stratum(0, &[a, m, z]);
        let result = validate(&b.build());
        assert!(!result.cert.functions);
        assert_eq!(codes_of(&result), vec!["E0106", "E0105"]);
    }

    #[test]
    fn factory_locals_cannot_be_referenced() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let m = b.map(parse_expr("[$0, tables, limit]").expr.unwrap(), 1);
        let j = b.join(parse_expr("$0[0] + runtime").expr.unwrap(), Expr::param(0), true);
        b.stratum(0, &[a, m, j]);
        let result = validate(&b.build());
        assert!(!result.cert.functions);
        assert_eq!(codes_of(&result), vec!["E0111", "E0111"]);
        assert_eq!(result.diagnostics[0].subject.as_deref(), Some(m.to_string().as_str()));
    }

    #[test]
    fn unplaced_and_double_placed_elements() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let m = b.map(Expr::param(0), 1);
        b.stratum(0, &[a]);
        b.stratum(1, &[a]);
        let result = validate(&b.build());
        assert!(!result.cert.strata);
        let codes = codes_of(&result);
        assert!(codes.contains(&"E0108"));
        assert!(codes.contains(&"E0107"));
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.subject.as_deref() == Some(m.to_string().as_str())));
    }

    #[test]
    fn table_source_edge_is_a_warning() {
        let mut b = GraphBuilder::new();
        let t = b.table("t", 0);
        let m = b.map(Expr::param(0), 1);
        b.connect(t, m, InputPortName::Input);
        b.stratum(0, &[m]);
        let result = validate(&b.build());
        assert!(result.cert.all_pass());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].level, DiagLevel::Warning);
        assert_eq!(codes_of(&result), vec!["W0110"]);
    }

    #[test]
    fn lookup_tables_checked() {
        let mut b = GraphBuilder::new();
        let t = b.table("t", 0);
        b.invalidate(t, &[ElementId(42)]);
        b.rescan(t, &[]);
        b.rescan(t, &[]);
        let result = validate(&b.build());
        assert!(!result.cert.lookups);
        assert_eq!(codes_of(&result), vec!["E0109", "E0109"]);
    }

    #[test]
    fn display_summarizes_graph() {
        let (g, ..) = join_graph();
        let text = g.to_string();
        assert!(text.starts_with("DataflowGraph (3 elements, 2 edges, 1 strata)"));
        assert!(text.contains("output -> 2.leftInput"));
        assert!(text.contains("stratum 0: [a, b, 2]"));
    }
}
