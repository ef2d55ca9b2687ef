//! Helper validations reused by tooling and by the rewriter's output check.

use std::collections::HashSet;

use crate::{
    bytecode::{codec, opcode},
    CodeUnit, CoreError, CoreResult,
};

/// Structural validation of a compiled unit.
///
/// Checks that the metadata is coherent and that every operand indexing a
/// table (names, locals, constants) is in range for that table.
pub fn validate_unit(unit: &CodeUnit) -> CoreResult<()> {
    if unit.nlocals as usize != unit.varnames.len() {
        return Err(CoreError::corrupted(format!(
            "nlocals is {} but varnames holds {} entries",
            unit.nlocals,
            unit.varnames.len()
        )));
    }
    if unit.argcount > unit.nlocals {
        return Err(CoreError::corrupted(format!(
            "argcount {} exceeds nlocals {}",
            unit.argcount, unit.nlocals
        )));
    }
    ensure_distinct("names", &unit.names)?;
    ensure_distinct("varnames", &unit.varnames)?;

    let mut offset = 0usize;
    for ins in codec::decode(&unit.code)? {
        if let Some(ix) = ins.index() {
            let bound = if opcode::has_name(ins.op) {
                Some(("names", unit.names.len()))
            } else if opcode::has_local(ins.op) {
                Some(("varnames", unit.varnames.len()))
            } else if ins.op == opcode::LOAD_CONST {
                Some(("consts", unit.consts.len()))
            } else {
                None
            };
            if let Some((table, len)) = bound {
                if ix >= len {
                    return Err(CoreError::corrupted(format!(
                        "{ins} at byte {offset} indexes {table}[{ix}] but the table holds {len}"
                    )));
                }
            }
        }
        offset += codec::encoded_len(&ins);
    }

    Ok(())
}

fn ensure_distinct(table: &'static str, entries: &[String]) -> CoreResult<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.as_str()) {
            return Err(CoreError::corrupted(format!("duplicate `{entry}` in {table}")));
        }
    }
    Ok(())
}
