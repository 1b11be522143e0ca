// codegen.rs — Pipeline code generation
//
// Assembles the generated module from a `DataflowGraph`. The module exports
// one factory function that takes the reactive runtime, builds every
// registry, wires subscriptions and returns one push entry point per input
// relation. Sections are emitted in a fixed order:
//
//   tables, inputs + entry points, operators, scanners,
//   invalidation/rescan tables, subscriptions.
//
// Preconditions: the graph passed IR validation (`ir::validate`).
// Postconditions: output is a pure function of the graph and options.
// Failure modes: name collisions and internal reference errors abort the
//                whole generation; no partial artifact is returned.
// Side effects: none.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::diag::{codes, Diagnostic};
use crate::doc::{self, Doc, Params};
use crate::id::ElementId;
use crate::ir::{is_identifier, DataflowGraph, ElementVariant};
use crate::lookup::lookup_table;
use crate::lower::{lower_element, Lowered};
use crate::naming::NameTable;
use crate::ports::PortResolver;
use crate::wiring::{statement_count, wire};

const HEADER: &str = "Generated by flowgen (dataflow pipeline generator). Do not edit.";

/// Names bound in the factory's scope: its parameter and every registry
/// it declares. User expressions are emitted inside that scope.
pub const FACTORY_LOCALS: [&str; 8] = [
    "runtime",
    "tables",
    "inputs",
    "entryPoints",
    "operators",
    "scanners",
    "invalidationLookupTable",
    "rescanLookupTable",
];

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleFormat {
    #[default]
    Esm,
    CommonJs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    pub factory_name: String,
    pub module: ModuleFormat,
    /// Section and stratum comments.
    pub comments: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            factory_name: "createPipeline".to_string(),
            module: ModuleFormat::Esm,
            comments: true,
        }
    }
}

/// Entry counts of the generated sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodegenStats {
    pub tables: usize,
    pub inputs: usize,
    pub operators: usize,
    pub scanners: usize,
    pub subscriptions: usize,
}

#[derive(Debug, Clone)]
pub struct GeneratedCode {
    pub source: String,
    pub stats: CodegenStats,
}

#[derive(Debug)]
pub struct CodegenResult {
    /// `None` whenever `diagnostics` holds an error.
    pub generated: Option<GeneratedCode>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("elements {first} and {second} both resolve to the name \"{name}\"")]
    NameCollision {
        name: String,
        first: ElementId,
        second: ElementId,
    },
    #[error("{variant} element {element} has no port '{port}'")]
    PortVocabulary {
        element: ElementId,
        variant: ElementVariant,
        port: &'static str,
    },
    #[error("reference to unknown element #{0}")]
    UnknownElement(ElementId),
    #[error("scanner {scanner} wraps element {target}, which is not a table or input")]
    ScannerTarget { scanner: ElementId, target: ElementId },
    #[error("factory name {0:?} is not an identifier")]
    InvalidFactoryName(String),
    #[error("relation '{relation}' is registered to element {element}, which is not a {expected}")]
    MisfiledRelation {
        relation: String,
        element: ElementId,
        expected: ElementVariant,
    },
}

impl CodegenError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let d = Diagnostic::error(self.to_string());
        match self {
            CodegenError::NameCollision { name, .. } => d
                .with_code(codes::E0701)
                .with_subject(name.clone())
                .with_hint("relation names must not repeat or look like element ids"),
            CodegenError::PortVocabulary { element, .. } => {
                d.with_code(codes::E0702).with_subject(element.to_string())
            }
            CodegenError::UnknownElement(_) => d.with_code(codes::E0703),
            CodegenError::ScannerTarget { scanner, .. } => {
                d.with_code(codes::E0704).with_subject(scanner.to_string())
            }
            CodegenError::InvalidFactoryName(_) => d.with_code(codes::E0705),
            CodegenError::MisfiledRelation { relation, .. } => {
                d.with_code(codes::E0706).with_subject(relation.clone())
            }
        }
    }
}

// ── Public entry points ─────────────────────────────────────────────────────

/// Generate code, reporting failure as diagnostics.
pub fn codegen(graph: &DataflowGraph, options: &CodegenOptions) -> CodegenResult {
    match generate(graph, options) {
        Ok(generated) => CodegenResult {
            generated: Some(generated),
            diagnostics: Vec::new(),
        },
        Err(e) => CodegenResult {
            generated: None,
            diagnostics: vec![e.to_diagnostic()],
        },
    }
}

/// Generate the pipeline module for `graph`.
pub fn generate(graph: &DataflowGraph, options: &CodegenOptions) -> Result<GeneratedCode, CodegenError> {
    if !is_identifier(&options.factory_name) {
        return Err(CodegenError::InvalidFactoryName(options.factory_name.clone()));
    }
    let names = NameTable::build(graph)?;
    let resolver = PortResolver::new(graph, &names);
    let mut asm = Assembler {
        options,
        body: Vec::new(),
        stats: CodegenStats::default(),
    };

    asm.emit_tables(graph, &resolver)?;
    asm.emit_inputs(graph, &resolver)?;
    asm.emit_operators(graph, &resolver)?;
    asm.emit_lookup_tables(graph, &names)?;
    asm.emit_subscriptions(graph, &resolver)?;
    asm.emit_return();

    let stats = asm.stats;
    let source = asm.finish().render();
    debug!(
        tables = stats.tables,
        inputs = stats.inputs,
        operators = stats.operators,
        scanners = stats.scanners,
        subscriptions = stats.subscriptions,
        bytes = source.len(),
        "generated pipeline module"
    );
    Ok(GeneratedCode { source, stats })
}

// ── Assembly ────────────────────────────────────────────────────────────────

struct Assembler<'a> {
    options: &'a CodegenOptions,
    body: Vec<Doc>,
    stats: CodegenStats,
}

impl Assembler<'_> {
    fn section(&mut self, title: &str) {
        if self.options.comments {
            self.body.push(doc::comment(title));
        }
    }

    fn declare(&mut self, name: &str, value: Doc) {
        self.body.push(doc::statement(doc::concat([
            doc::text(format!("const {} = ", name)),
            value,
        ])));
    }

    fn emit_tables(&mut self, graph: &DataflowGraph, resolver: &PortResolver<'_>) -> Result<(), CodegenError> {
        let mut entries = Vec::with_capacity(graph.tables.len());
        for (relation, &id) in &graph.tables {
            let el = graph.element(id).ok_or(CodegenError::UnknownElement(id))?;
            match lower_element(resolver, el)? {
                Lowered::Table(value) => entries.push((doc::quote(relation), value)),
                _ => {
                    return Err(CodegenError::MisfiledRelation {
                        relation: relation.clone(),
                        element: id,
                        expected: ElementVariant::Table,
                    })
                }
            }
        }
        self.stats.tables = entries.len();
        debug!(count = entries.len(), "lowered tables");
        self.section("Tables");
        self.declare("tables", doc::assoc(entries));
        Ok(())
    }

    fn emit_inputs(&mut self, graph: &DataflowGraph, resolver: &PortResolver<'_>) -> Result<(), CodegenError> {
        let mut entries = Vec::with_capacity(graph.inputs.len());
        let mut entry_points = Vec::with_capacity(graph.inputs.len());
        let tuple = Params::Named(vec!["tuple".to_string()]);
        for (relation, &id) in &graph.inputs {
            let el = graph.element(id).ok_or(CodegenError::UnknownElement(id))?;
            match lower_element(resolver, el)? {
                Lowered::Input(value) => entries.push((doc::quote(relation), value)),
                _ => {
                    return Err(CodegenError::MisfiledRelation {
                        relation: relation.clone(),
                        element: id,
                        expected: ElementVariant::Input,
                    })
                }
            }
            let push = doc::method_call(doc::index("inputs", relation), "push", [doc::text("tuple")]);
            entry_points.push((doc::quote(relation), doc::lambda(&tuple, push)));
        }
        self.stats.inputs = entries.len();
        debug!(count = entries.len(), "lowered inputs");
        self.section("Inputs");
        self.declare("inputs", doc::assoc(entries));
        self.declare("entryPoints", doc::assoc(entry_points));
        Ok(())
    }

    /// Operators and scanners, in stratified traversal order. Elements not
    /// listed in any stratum follow in id order.
    fn emit_operators(&mut self, graph: &DataflowGraph, resolver: &PortResolver<'_>) -> Result<(), CodegenError> {
        let names_of = |id: ElementId| resolver.element_name(id);
        let mut seen = HashSet::new();
        let order = graph
            .stratified_elements()
            .into_iter()
            .map(|(_, el)| el)
            .chain(graph.elements().iter());
        let mut operators = Vec::new();
        let mut scanners = Vec::new();
        for el in order {
            if !seen.insert(el.id) {
                continue;
            }
            match lower_element(resolver, el)? {
                Lowered::Operator(value) => operators.push((doc::quote(names_of(el.id)?), value)),
                Lowered::Scanner(value) => scanners.push((doc::quote(names_of(el.id)?), value)),
                Lowered::Table(_) | Lowered::Input(_) => {}
            }
        }
        self.stats.operators = operators.len();
        self.stats.scanners = scanners.len();
        debug!(operators = operators.len(), scanners = scanners.len(), "lowered operators");
        self.section("Operators");
        self.declare("operators", doc::assoc(operators));
        self.section("Scanners");
        self.declare("scanners", doc::assoc(scanners));
        Ok(())
    }

    fn emit_lookup_tables(&mut self, graph: &DataflowGraph, names: &NameTable) -> Result<(), CodegenError> {
        let invalidation = lookup_table(&graph.invalidation, names)?;
        let rescan = lookup_table(&graph.rescan, names)?;
        self.section("Invalidation and rescan");
        self.declare("invalidationLookupTable", invalidation);
        self.declare("rescanLookupTable", rescan);
        Ok(())
    }

    fn emit_subscriptions(&mut self, graph: &DataflowGraph, resolver: &PortResolver<'_>) -> Result<(), CodegenError> {
        let wiring = wire(graph, resolver)?;
        self.stats.subscriptions = statement_count(&wiring);
        debug!(count = self.stats.subscriptions, "wired subscriptions");
        self.section("Subscriptions");
        for stratum in wiring {
            if stratum.statements.is_empty() {
                continue;
            }
            if self.options.comments {
                self.body.push(doc::comment(&format!("stratum {}", stratum.index)));
            }
            self.body.extend(stratum.statements);
        }
        Ok(())
    }

    fn emit_return(&mut self) {
        let registries = "$registries: { tables, inputs, operators, scanners, \
                          invalidationLookupTable, rescanLookupTable },";
        self.body.push(doc::concat([
            doc::text("return {"),
            doc::line(),
            doc::nest(doc::concat([
                doc::text("...entryPoints,"),
                doc::line(),
                doc::text(registries),
                doc::line(),
            ])),
            doc::text("};"),
            doc::line(),
        ]));
    }

    fn finish(self) -> Doc {
        let name = &self.options.factory_name;
        let export = match self.options.module {
            ModuleFormat::Esm => "export ",
            ModuleFormat::CommonJs => "",
        };
        let mut parts = vec![
            doc::comment(HEADER),
            doc::text(format!("{}function {}(runtime) {{", export, name)),
            doc::line(),
            doc::nest(Doc::Concat(self.body)),
            doc::text("}"),
            doc::line(),
        ];
        if self.options.module == ModuleFormat::CommonJs {
            parts.push(doc::statement(doc::text(format!("module.exports = {{ {} }}", name))));
        }
        Doc::Concat(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::ir::{GraphBuilder, InputPortName};

    fn table_only() -> DataflowGraph {
        let mut b = GraphBuilder::new();
        b.table("t", 0);
        b.build()
    }

    #[test]
    fn table_only_module() {
        let code = generate(&table_only(), &CodegenOptions::default()).unwrap();
        assert!(code.source.contains("  const tables = {\n    \"t\": new runtime.Table(0),\n  };\n"));
        assert!(code.source.contains("  const operators = {};\n"));
        assert!(!code.source.contains(".subscribe("));
        assert_eq!(
            code.stats,
            CodegenStats {
                tables: 1,
                ..CodegenStats::default()
            }
        );
    }

    #[test]
    fn sections_in_fixed_order() {
        let code = generate(&table_only(), &CodegenOptions::default()).unwrap();
        let at = |needle: &str| code.source.find(needle).unwrap();
        assert!(at("const tables") < at("const inputs"));
        assert!(at("const inputs") < at("const entryPoints"));
        assert!(at("const entryPoints") < at("const operators"));
        assert!(at("const operators") < at("const scanners"));
        assert!(at("const scanners") < at("const invalidationLookupTable"));
        assert!(at("const rescanLookupTable") < at("// Subscriptions"));
        assert!(at("// Subscriptions") < at("return {"));
    }

    #[test]
    fn entry_point_per_input() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        b.stratum(0, &[a]);
        let code = generate(&b.build(), &CodegenOptions::default()).unwrap();
        assert!(code
            .source
            .contains("\"a\": (tuple) => inputs[\"a\"].push(tuple),"));
        assert!(code.source.contains("    ...entryPoints,\n"));
    }

    #[test]
    fn commonjs_and_no_comments() {
        let options = CodegenOptions {
            factory_name: "build".into(),
            module: ModuleFormat::CommonJs,
            comments: false,
        };
        let code = generate(&table_only(), &options).unwrap();
        assert!(code.source.contains("\nfunction build(runtime) {\n"));
        assert!(code.source.ends_with("}\nmodule.exports = { build };\n"));
        assert!(!code.source.contains("// Tables"));
        assert!(code.source.starts_with("// Generated by flowgen"));
    }

    #[test]
    fn invalid_factory_name() {
        let options = CodegenOptions {
            factory_name: "make pipeline".into(),
            ..CodegenOptions::default()
        };
        let result = codegen(&table_only(), &options);
        assert!(result.generated.is_none());
        assert_eq!(result.diagnostics[0].code, Some(codes::E0705));
    }

    #[test]
    fn name_collision_aborts_generation() {
        let mut b = GraphBuilder::new();
        b.table("r", 0);
        b.input("r");
        let result = codegen(&b.build(), &CodegenOptions::default());
        assert!(result.generated.is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some(codes::E0701));
        assert_eq!(result.diagnostics[0].subject.as_deref(), Some("r"));
    }

    #[test]
    fn port_violation_is_reported_not_panicked() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let m = b.map(Expr::param(0), 1);
        b.connect(a, m, InputPortName::LeftInput);
        b.stratum(0, &[a, m]);
        let result = codegen(&b.build(), &CodegenOptions::default());
        assert!(result.generated.is_none());
        assert_eq!(result.diagnostics[0].code, Some(codes::E0702));
    }

    #[test]
    fn unstratified_scanner_still_registered() {
        let mut b = GraphBuilder::new();
        let t = b.table("t", 1);
        b.scanner(t);
        let code = generate(&b.build(), &CodegenOptions::default()).unwrap();
        assert_eq!(code.stats.scanners, 1);
        assert!(code
            .source
            .contains("\"1\": { scan: () => tables[\"t\"].scanner(), targets: [] },"));
    }

    #[test]
    fn output_has_no_trailing_whitespace() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let m = b.map(Expr::param(0), 1);
        b.connect(a, m, InputPortName::Input);
        b.stratum(0, &[a, m]);
        let code = generate(&b.build(), &CodegenOptions::default()).unwrap();
        for line in code.source.lines() {
            assert_eq!(line, line.trim_end());
        }
    }
}
