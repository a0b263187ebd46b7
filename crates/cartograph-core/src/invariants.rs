use crate::error::{Error, Result};
use crate::model::Ast;

/// Check the structural invariants the normalizer guarantees.
///
/// A failure here is a compiler bug, never a problem with the document:
/// user-facing findings belong to the validator.
pub fn check_invariants(ast: &Ast) -> Result<()> {
    for (key, table) in &ast.tables {
        let id = table.id();
        if &id != key {
            return Err(Error::Invariant(format!(
                "table stored under '{key}' identifies as '{id}'"
            )));
        }

        for (name, column) in &table.columns {
            if name != &column.name {
                return Err(Error::Invariant(format!(
                    "column stored under '{}' is named '{}'",
                    key.column_key(name),
                    column.name
                )));
            }
        }
    }

    for (key, source) in &ast.sources {
        if key != &source.id {
            return Err(Error::Invariant(format!(
                "source stored under '{key}' has id '{}'",
                source.id
            )));
        }
    }

    for (position, mapping) in ast.mappings.iter().enumerate() {
        if mapping.index != position {
            return Err(Error::Invariant(format!(
                "mapping at position {position} carries index {}",
                mapping.index
            )));
        }
    }

    Ok(())
}
