//! Symbol-table renumbering.
//!
//! Given the decoded stream and the names to inject, computes the new
//! external-name and local-variable tables plus the three index maps the
//! rewriter applies to operands.

use std::collections::{HashMap, HashSet};

use graft_core::{bytecode::opcode, CodeUnit, Instruction};

use crate::{InjectError, InjectResult};

/// Old → new index maps and the rewritten tables for one injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renumbering {
    /// New external-name table.
    pub names: Vec<String>,
    /// New local-variable table.
    pub varnames: Vec<String>,
    /// Old external index → new external index (`None` once removed).
    name_map: Vec<Option<usize>>,
    /// Old local index → new local index.
    local_map: Vec<usize>,
    /// Old external index of an injected name → its new local slot.
    redirects: HashMap<usize, usize>,
    /// Injected names kept in the external table because other opcodes use them.
    protected: Vec<String>,
}

impl Renumbering {
    /// Plan the renumbering of `unit`'s tables for `injected` names.
    pub fn plan(unit: &CodeUnit, instrs: &[Instruction], injected: &[String]) -> InjectResult<Self> {
        check_injected(unit, injected)?;

        let argcount = unit.argcount as usize;
        if argcount > unit.varnames.len() {
            return Err(InjectError::IndexOutOfRange { index: argcount, len: unit.varnames.len() });
        }

        let protected = protected_names(instrs, unit.names.len());
        let injected_set: HashSet<&str> = injected.iter().map(String::as_str).collect();

        let mut names = Vec::with_capacity(unit.names.len());
        let mut name_map = Vec::with_capacity(unit.names.len());
        let mut kept_injected = Vec::new();
        for (old, name) in unit.names.iter().enumerate() {
            let is_injected = injected_set.contains(name.as_str());
            if is_injected && !protected.contains(&old) {
                name_map.push(None);
                continue;
            }
            if is_injected {
                kept_injected.push(name.clone());
            }
            name_map.push(Some(names.len()));
            names.push(name.clone());
        }

        let k = injected.len();
        let mut varnames = Vec::with_capacity(unit.varnames.len() + k);
        varnames.extend_from_slice(&unit.varnames[..argcount]);
        varnames.extend(injected.iter().cloned());
        varnames.extend_from_slice(&unit.varnames[argcount..]);

        let local_map = (0..unit.varnames.len())
            .map(|i| if i < argcount { i } else { i + k })
            .collect();

        let redirects = injected
            .iter()
            .enumerate()
            .filter_map(|(j, name)| {
                unit.names.iter().position(|n| n == name).map(|old| (old, argcount + j))
            })
            .collect();

        Ok(Self { names, varnames, name_map, local_map, redirects, protected: kept_injected })
    }

    /// New external index for an old one.
    pub fn name(&self, old: usize) -> Option<usize> { self.name_map.get(old).copied().flatten() }

    /// New local index for an old one.
    pub fn local(&self, old: usize) -> Option<usize> { self.local_map.get(old).copied() }

    /// New local slot for an old external index naming an injected binding.
    pub fn redirect(&self, old: usize) -> Option<usize> { self.redirects.get(&old).copied() }

    /// Number of locals before the injection.
    pub fn old_local_count(&self) -> usize { self.local_map.len() }

    /// Number of external names dropped from the table.
    pub fn removed_names(&self) -> usize { self.name_map.iter().filter(|m| m.is_none()).count() }

    /// Injected names that also stay external.
    pub fn protected(&self) -> &[String] { &self.protected }
}

/// External indices used by any name opcode other than `LOAD_GLOBAL`.
///
/// Those entries must survive in the external table even when an injected
/// binding shares their name. Out-of-range operands are ignored here and
/// surface as `NameLost` during patching.
pub fn protected_names(instrs: &[Instruction], name_count: usize) -> HashSet<usize> {
    instrs
        .iter()
        .filter(|ins| opcode::has_name(ins.op) && ins.op != opcode::LOAD_GLOBAL)
        .filter_map(Instruction::index)
        .filter(|&ix| ix < name_count)
        .collect()
}

fn check_injected(unit: &CodeUnit, injected: &[String]) -> InjectResult<()> {
    let mut seen = HashSet::with_capacity(injected.len());
    for name in injected {
        if !seen.insert(name.as_str()) || unit.varnames.iter().any(|v| v == name) {
            return Err(InjectError::DuplicateName(name.clone()));
        }
    }
    Ok(())
}
