// wiring.rs — Subscription wiring in stratum order
//
// Walks strata in ascending index order and, within each stratum, elements
// in listed order. Every edge leaving an element that is neither a table nor
// a scanner becomes one statement:
//
//   <source>.output.subscribe(<destination>.<member>);
//
// Scanner-sourced edges are served by the scanner registry instead, and
// table-sourced edges are never subscribed. Edges into a table's `deltaIn`
// port are wired like any other edge. No ordering checks are made here.
//
// Preconditions: stratification is correct on input.
// Postconditions: statement count equals the number of edges whose source
//                 is neither a table nor a scanner (for stratified sources).
// Failure modes: resolver errors.
// Side effects: none.

use tracing::trace;

use crate::codegen::CodegenError;
use crate::doc::{self, Doc};
use crate::ir::{DataflowGraph, ElementVariant};
use crate::ports::PortResolver;

/// Subscription statements of one stratum, in edge order.
#[derive(Debug, Clone)]
pub struct StratumWiring {
    pub index: u32,
    pub statements: Vec<Doc>,
}

pub fn wire(
    graph: &DataflowGraph,
    resolver: &PortResolver<'_>,
) -> Result<Vec<StratumWiring>, CodegenError> {
    let mut out = Vec::new();
    for stratum in graph.strata_in_order() {
        let mut statements = Vec::new();
        for &id in &stratum.elements {
            let el = graph.element(id).ok_or(CodegenError::UnknownElement(id))?;
            if matches!(el.variant(), ElementVariant::Table | ElementVariant::Scanner) {
                continue;
            }
            for port in &el.outputs {
                let source = resolver.output_ref(el.id, port.name)?;
                for edge in &port.connections {
                    let target = resolver.input_ref(&edge.target)?;
                    statements.push(doc::statement(doc::method_call(
                        source.clone(),
                        "subscribe",
                        [target],
                    )));
                }
            }
        }
        trace!(stratum = stratum.index, count = statements.len(), "wired stratum");
        out.push(StratumWiring {
            index: stratum.index,
            statements,
        });
    }
    Ok(out)
}

/// Total number of subscription statements.
pub fn statement_count(wiring: &[StratumWiring]) -> usize {
    wiring.iter().map(|s| s.statements.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::ir::{GraphBuilder, InputPortName};
    use crate::naming::NameTable;

    fn render(wiring: &[StratumWiring]) -> Vec<String> {
        wiring
            .iter()
            .flat_map(|s| s.statements.iter().map(|d| d.render()))
            .collect()
    }

    #[test]
    fn join_inputs_in_edge_order() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let c = b.input("b");
        let j = b.join(Expr::param(0), Expr::param(0), true);
        b.connect(a, j, InputPortName::LeftInput);
        b.connect(c, j, InputPortName::RightInput);
        b.stratum(0, &[a, c, j]);
        let g = b.build();
        let names = NameTable::build(&g).unwrap();
        let wiring = wire(&g, &PortResolver::new(&g, &names)).unwrap();
        assert_eq!(
            render(&wiring),
            vec![
                "inputs[\"a\"].output.subscribe(operators[\"2\"].leftInput);\n",
                "inputs[\"b\"].output.subscribe(operators[\"2\"].rightInput);\n",
            ]
        );
    }

    #[test]
    fn edge_into_table_uses_delta() {
        let mut b = GraphBuilder::new();
        let t = b.table("t", 0);
        let a = b.input("a");
        let m = b.map(Expr::param(0), 1);
        b.connect(a, m, InputPortName::Input);
        b.connect(m, t, InputPortName::DeltaIn);
        b.stratum(0, &[a, m]);
        let g = b.build();
        let names = NameTable::build(&g).unwrap();
        let wiring = wire(&g, &PortResolver::new(&g, &names)).unwrap();
        assert_eq!(
            render(&wiring)[1],
            "operators[\"2\"].output.subscribe(tables[\"t\"].Delta);\n"
        );
    }

    #[test]
    fn strata_run_in_ascending_order() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let m1 = b.map(Expr::param(0), 1);
        let m2 = b.map(Expr::param(0), 1);
        b.connect(a, m1, InputPortName::Input);
        b.connect(m1, m2, InputPortName::Input);
        b.stratum(1, &[m1]);
        b.stratum(0, &[a]);
        b.stratum(2, &[m2]);
        let g = b.build();
        let names = NameTable::build(&g).unwrap();
        let wiring = wire(&g, &PortResolver::new(&g, &names)).unwrap();
        let indices: Vec<u32> = wiring.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(statement_count(&wiring), 2);
        assert!(render(&wiring)[0].starts_with("inputs[\"a\"]"));
    }

    #[test]
    fn scanner_and_table_sources_are_skipped() {
        let mut b = GraphBuilder::new();
        let t = b.table("t", 0);
        let a = b.input("a");
        let m = b.map(Expr::param(0), 1);
        let s = b.scanner(a);
        b.connect(s, m, InputPortName::Input);
        b.connect(t, m, InputPortName::Input);
        b.stratum(0, &[t, a, s, m]);
        let g = b.build();
        let names = NameTable::build(&g).unwrap();
        let wiring = wire(&g, &PortResolver::new(&g, &names)).unwrap();
        assert_eq!(statement_count(&wiring), 0);
    }

    #[test]
    fn bad_port_fails_loudly() {
        let mut b = GraphBuilder::new();
        let a = b.input("a");
        let j = b.join(Expr::param(0), Expr::param(0), true);
        b.connect(a, j, InputPortName::DeltaIn);
        b.stratum(0, &[a, j]);
        let g = b.build();
        let names = NameTable::build(&g).unwrap();
        let err = wire(&g, &PortResolver::new(&g, &names)).unwrap_err();
        assert!(matches!(err, CodegenError::PortVocabulary { port: "deltaIn", .. }));
    }
}
