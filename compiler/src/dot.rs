// dot.rs — Graphviz DOT output for dataflow graphs
//
// Renders a DataflowGraph in DOT format for `dot` and friends. Each stratum
// becomes a cluster; elements outside every stratum (tables, scanners) are
// drawn at top level. Edges are labeled with their destination port.
//
// Preconditions: none; dangling ids are drawn as plain nodes.
// Postconditions: returns a DOT string with one node per element.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::collections::HashSet;

use crate::id::ElementId;
use crate::ir::{DataflowGraph, Element, ElementKind, ElementVariant};

/// Emit the graph as a Graphviz DOT string.
pub fn emit_dot(graph: &DataflowGraph) -> String {
    let mut buf = String::new();
    buf.push_str("digraph dataflow {\n");
    buf.push_str("    rankdir=LR;\n");
    buf.push_str("    node [fontname=\"Helvetica\", fontsize=10];\n");
    buf.push_str("    edge [fontname=\"Helvetica\", fontsize=9];\n");

    let mut placed = HashSet::new();
    for stratum in graph.strata_in_order() {
        buf.push('\n');
        buf.push_str(&format!("    subgraph cluster_s{} {{\n", stratum.index));
        buf.push_str(&format!("        label=\"stratum {}\";\n", stratum.index));
        buf.push_str("        style=rounded;\n");
        buf.push_str("        color=gray50;\n");
        for &id in &stratum.elements {
            if let Some(el) = graph.element(id) {
                if placed.insert(id) {
                    write_node(&mut buf, el, "        ");
                }
            }
        }
        buf.push_str("    }\n");
    }

    let loose: Vec<&Element> = graph
        .elements()
        .iter()
        .filter(|el| !placed.contains(&el.id))
        .collect();
    if !loose.is_empty() {
        buf.push('\n');
        for el in loose {
            write_node(&mut buf, el, "    ");
        }
    }

    let edge_count = graph.edges().count();
    let has_scanners = graph
        .elements()
        .iter()
        .any(|el| el.variant() == ElementVariant::Scanner);
    if edge_count > 0 || has_scanners {
        buf.push('\n');
    }
    for edge in graph.edges() {
        let style = match graph.element(edge.source).map(Element::variant) {
            // Never subscribed.
            Some(ElementVariant::Table) => ", style=dotted, color=gray60",
            Some(ElementVariant::Scanner) => ", style=dashed",
            _ => "",
        };
        buf.push_str(&format!(
            "    {} -> {} [label=\"{}\"{}];\n",
            node_id(edge.source),
            node_id(edge.target.element),
            edge.target.name,
            style
        ));
    }
    for el in graph.elements() {
        if let ElementKind::Scanner { target } = &el.kind {
            buf.push_str(&format!(
                "    {} -> {} [style=dotted, arrowhead=none, label=\"scans\"];\n",
                node_id(*target),
                node_id(el.id)
            ));
        }
    }

    buf.push_str("}\n");
    buf
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn node_id(id: ElementId) -> String {
    format!("e{}", id)
}

/// Escape a label for a double-quoted DOT string.
fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_label(el: &Element) -> String {
    match &el.kind {
        ElementKind::Table {
            relation,
            last_key_col_index,
        } => format!("table {}\\nkey ..{last_key_col_index}", escape(relation)),
        ElementKind::Input { relation } => format!("input {}", escape(relation)),
        ElementKind::HashEquiJoin { left_is_build, .. } => {
            let side = if *left_is_build { "left" } else { "right" };
            format!("join #{}\\nbuild {side}", el.id)
        }
        ElementKind::Map { arity, .. } => format!("map #{}\\narity {arity}", el.id),
        ElementKind::Scanner { .. } => format!("scan #{}", el.id),
    }
}

fn node_attrs(el: &Element) -> String {
    let (shape, color) = match el.variant() {
        ElementVariant::Table => ("cylinder", "lightsalmon"),
        ElementVariant::Input => ("invhouse", "lightgreen"),
        ElementVariant::HashEquiJoin => ("box", "lightblue"),
        ElementVariant::Map => ("box", "lightyellow"),
        ElementVariant::Scanner => ("ellipse", "white"),
    };
    let label = node_label(el);
    format!("shape={shape}, style=filled, fillcolor={color}, label=\"{label}\"")
}

fn write_node(buf: &mut String, el: &Element, indent: &str) {
    buf.push_str(&format!("{indent}{} [{}];\n", node_id(el.id), node_attrs(el)));
}
