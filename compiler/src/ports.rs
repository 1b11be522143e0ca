// ports.rs — Port Resolver
//
// Maps (element, port) pairs to runtime member references in generated
// code. Each element variant has a fixed vocabulary:
//
//   hash equi-join   leftInput → leftInput, rightInput → rightInput; output
//   table            deltaIn → Delta; no output
//   other variants   input → input; output
//
// A scanner is never a registry entry. Referring to it yields a fresh
// scanner obtained from the wrapped table or input.
//
// Preconditions: `names` was built from the same graph.
// Postconditions: every reference returned is a valid runtime expression.
// Failure modes: a port outside its owner's vocabulary (`PortVocabulary`),
//                a dangling id (`UnknownElement`), a scanner over a
//                non-scannable element (`ScannerTarget`).
// Side effects: none.

use crate::codegen::CodegenError;
use crate::doc::{self, Doc};
use crate::id::ElementId;
use crate::ir::{DataflowGraph, ElementKind, ElementVariant, InputPort, InputPortName, OutputPortName};
use crate::naming::NameTable;

/// Runtime member for an input port of `variant`.
pub fn input_member(
    element: ElementId,
    variant: ElementVariant,
    port: InputPortName,
) -> Result<&'static str, CodegenError> {
    match (variant, port) {
        (ElementVariant::HashEquiJoin, InputPortName::LeftInput) => Ok("leftInput"),
        (ElementVariant::HashEquiJoin, InputPortName::RightInput) => Ok("rightInput"),
        (ElementVariant::Table, InputPortName::DeltaIn) => Ok("Delta"),
        (ElementVariant::Input | ElementVariant::Map, InputPortName::Input) => Ok("input"),
        _ => Err(CodegenError::PortVocabulary {
            element,
            variant,
            port: port.as_str(),
        }),
    }
}

/// Runtime member for an output port of `variant`. Tables have none.
pub fn output_member(
    element: ElementId,
    variant: ElementVariant,
    port: OutputPortName,
) -> Result<&'static str, CodegenError> {
    match (variant, port) {
        (ElementVariant::Table, _) => Err(CodegenError::PortVocabulary {
            element,
            variant,
            port: port.as_str(),
        }),
        (
            ElementVariant::Input
            | ElementVariant::HashEquiJoin
            | ElementVariant::Map
            | ElementVariant::Scanner,
            OutputPortName::Output,
        ) => Ok("output"),
    }
}

/// Resolves element and port references against one graph.
pub struct PortResolver<'a> {
    graph: &'a DataflowGraph,
    names: &'a NameTable,
}

impl<'a> PortResolver<'a> {
    pub fn new(graph: &'a DataflowGraph, names: &'a NameTable) -> Self {
        Self { graph, names }
    }

    pub fn element_name(&self, id: ElementId) -> Result<&'a str, CodegenError> {
        self.names.name(id)
    }

    /// Runtime object of an element: `tables["t"]`, `inputs["a"]`,
    /// `operators["3"]`, or `<target>.scanner()` for a scanner.
    pub fn element_ref(&self, id: ElementId) -> Result<Doc, CodegenError> {
        let el = self
            .graph
            .element(id)
            .ok_or(CodegenError::UnknownElement(id))?;
        let name = self.names.name(id)?;
        match &el.kind {
            ElementKind::Table { .. } => Ok(doc::index("tables", name)),
            ElementKind::Input { .. } => Ok(doc::index("inputs", name)),
            ElementKind::HashEquiJoin { .. } | ElementKind::Map { .. } => {
                Ok(doc::index("operators", name))
            }
            ElementKind::Scanner { target } => self.scanner_source(id, *target),
        }
    }

    /// `tables["t"].scanner()` / `inputs["a"].scanner()`.
    pub fn scanner_source(&self, scanner: ElementId, target: ElementId) -> Result<Doc, CodegenError> {
        let wrapped = self
            .graph
            .element(target)
            .ok_or(CodegenError::UnknownElement(target))?;
        if !wrapped.variant().is_scannable() {
            return Err(CodegenError::ScannerTarget { scanner, target });
        }
        Ok(doc::method_call(self.element_ref(target)?, "scanner", []))
    }

    pub fn input_ref(&self, port: &InputPort) -> Result<Doc, CodegenError> {
        let el = self
            .graph
            .element(port.element)
            .ok_or(CodegenError::UnknownElement(port.element))?;
        let member = input_member(port.element, el.variant(), port.name)?;
        Ok(doc::concat([
            self.element_ref(port.element)?,
            doc::text("."),
            doc::text(member),
        ]))
    }

    pub fn output_ref(&self, element: ElementId, port: OutputPortName) -> Result<Doc, CodegenError> {
        let el = self
            .graph
            .element(element)
            .ok_or(CodegenError::UnknownElement(element))?;
        let member = output_member(element, el.variant(), port)?;
        Ok(doc::concat([
            self.element_ref(element)?,
            doc::text("."),
            doc::text(member),
        ]))
    }
}
