// lookup.rs — Invalidation and rescan tables
//
// Serializes the precomputed element → element-list relations as object
// literals keyed by element name. Nothing is computed: entry order, key
// identity and value order are kept exactly as supplied.

use crate::codegen::CodegenError;
use crate::doc::{self, Doc};
use crate::ir::LookupTable;
use crate::naming::NameTable;

pub fn lookup_table(table: &LookupTable, names: &NameTable) -> Result<Doc, CodegenError> {
    let mut entries = Vec::with_capacity(table.len());
    for (key, values) in &table.entries {
        let key = doc::quote(names.name(*key)?);
        let values = values
            .iter()
            .map(|id| names.name(*id).map(doc::quote))
            .collect::<Result<Vec<_>, _>>()?;
        entries.push((key, doc::array(values)));
    }
    Ok(doc::assoc(entries))
}
