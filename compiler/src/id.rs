// id.rs — Stable element identifiers for the dataflow IR
//
// Every element in a `DataflowGraph` is addressed by an `ElementId`, an index
// into the graph's element arena. IDs are allocated once, in insertion order,
// while the IR is being built. Code generation only reads them.

use std::fmt;

/// Arena index of a dataflow element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl ElementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocator for element IDs. Produces monotonically increasing IDs in
/// allocation order, so identical build sequences yield identical IDs.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_element: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_element(&mut self) -> ElementId {
        let id = ElementId(self.next_element);
        self.next_element += 1;
        id
    }
}
