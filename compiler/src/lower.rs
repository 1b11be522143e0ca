// lower.rs — Element Lowering
//
// Turns each element variant into the runtime construction expression that
// goes into its registry. Tables and inputs get their own registries; joins
// and maps share the operator registry; scanners have no registry entry and
// lower to a scan thunk over the wrapped table or input, plus the list of
// ports their rows are fed to.
//
// Preconditions: `names` was built from the same graph; expression
//                parameters were range-checked by IR validation.
// Postconditions: every lowered expression is a single-line target
//                 expression.
// Failure modes: port and reference errors from the resolver.
// Side effects: none.

use crate::codegen::CodegenError;
use crate::doc::{self, Doc, Params};
use crate::expr::Expr;
use crate::ir::{Element, ElementKind};
use crate::ports::PortResolver;

/// Name bound to the whole tuple in single-parameter functions. Bindings
/// carry a `$` so no free identifier in a user expression can match one.
const TUPLE_PARAM: &str = "$t";

/// Lowered form of one element.
#[derive(Debug, Clone, PartialEq)]
pub enum Lowered {
    Table(Doc),
    Input(Doc),
    Operator(Doc),
    /// `{ scan: () => <target>.scanner(), targets: [<ports>] }`.
    Scanner(Doc),
}

pub fn lower_element(resolver: &PortResolver<'_>, el: &Element) -> Result<Lowered, CodegenError> {
    match &el.kind {
        ElementKind::Table {
            last_key_col_index, ..
        } => Ok(Lowered::Table(lower_table(*last_key_col_index))),
        ElementKind::Input { .. } => Ok(Lowered::Input(lower_input())),
        ElementKind::HashEquiJoin {
            build_key,
            probe_key,
            left_is_build,
        } => Ok(Lowered::Operator(lower_join(build_key, probe_key, *left_is_build))),
        ElementKind::Map { function, arity } => Ok(Lowered::Operator(lower_map(function, *arity))),
        ElementKind::Scanner { target } => {
            let scan = resolver.scanner_source(el.id, *target)?;
            let targets = el
                .edges()
                .map(|edge| resolver.input_ref(&edge.target))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Lowered::Scanner(doc::concat([
                doc::text("{ scan: "),
                doc::lambda(&Params::Named(Vec::new()), scan),
                doc::text(", targets: "),
                doc::array(targets),
                doc::text(" }"),
            ])))
        }
    }
}

pub fn lower_table(last_key_col_index: u32) -> Doc {
    doc::new_object("runtime.Table", [doc::text(last_key_col_index.to_string())])
}

pub fn lower_input() -> Doc {
    doc::new_object("runtime.Input", [])
}

/// Parameters of a join key function.
pub fn key_params() -> Params {
    Params::Named(vec![TUPLE_PARAM.to_string()])
}

/// Parameters of a map function. Arity 1 binds the whole tuple; larger
/// arities destructure positions `0..arity` into `$x0`, `$x1`, ...
pub fn map_params(arity: u32) -> Params {
    if arity > 1 {
        Params::Destructure((0..arity).map(|i| format!("$x{}", i)).collect())
    } else {
        Params::Named(vec![TUPLE_PARAM.to_string()])
    }
}

fn key_fn(key: &Expr) -> Doc {
    let params = key_params();
    let body = key.render(params.names());
    doc::lambda(&params, doc::text(body))
}

/// `new runtime.HashEquiJoin(build, probe, "left" | "right")`; the tag names
/// the materialized side.
pub fn lower_join(build_key: &Expr, probe_key: &Expr, left_is_build: bool) -> Doc {
    let side = if left_is_build { "left" } else { "right" };
    doc::new_object(
        "runtime.HashEquiJoin",
        [key_fn(build_key), key_fn(probe_key), doc::quote(side)],
    )
}

/// `new runtime.Map(fn)` with `fn` bound per [`map_params`].
pub fn lower_map(function: &Expr, arity: u32) -> Doc {
    let params = map_params(arity);
    let body = function.render(params.names());
    doc::new_object("runtime.Map", [doc::lambda(&params, doc::text(body))])
}
