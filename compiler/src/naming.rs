// naming.rs — Element Namer
//
// Assigns every element of a graph the external name used as its registry
// key and as the key shared by the invalidation and rescan tables. Tables
// and inputs are named after their relation; every other element after its
// numeric id.
//
// Preconditions: none.
// Postconditions: `NameTable::build` succeeds only if names are injective.
// Failure modes: two elements resolving to one name (`NameCollision`).
// Side effects: none.

use std::collections::HashMap;

use crate::codegen::CodegenError;
use crate::id::ElementId;
use crate::ir::DataflowGraph;

/// Injective element → name mapping for one graph.
#[derive(Debug, Clone)]
pub struct NameTable {
    names: Vec<String>,
}

impl NameTable {
    pub fn build(graph: &DataflowGraph) -> Result<Self, CodegenError> {
        let mut names = Vec::with_capacity(graph.elements().len());
        let mut owners: HashMap<String, ElementId> = HashMap::new();
        for el in graph.elements() {
            let name = el.identity().to_string();
            if let Some(&first) = owners.get(&name) {
                return Err(CodegenError::NameCollision {
                    name,
                    first,
                    second: el.id,
                });
            }
            owners.insert(name.clone(), el.id);
            names.push(name);
        }
        Ok(Self { names })
    }

    pub fn name(&self, id: ElementId) -> Result<&str, CodegenError> {
        self.names
            .get(id.index())
            .map(String::as_str)
            .ok_or(CodegenError::UnknownElement(id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
