//! Unit rewriter: decode → renumber → patch → re-encode → reassemble.

use graft_core::{bytecode::opcode, encode, helpers::validate_unit, CodeUnit, CoreError, Instruction};
#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::{renumber::Renumbering, InjectError, InjectOptions, InjectResult};

/// Inject `names` as new locals of `unit`, with default options.
///
/// The names are spliced right after the argument prefix, in order, and
/// `argcount`/`nlocals` grow by `names.len()`. `LOAD_GLOBAL`s of those names
/// become `LOAD_FAST`s of the new slots.
pub fn append_locals<S: AsRef<str>>(unit: &CodeUnit, names: &[S]) -> InjectResult<CodeUnit> {
    append_locals_with(unit, names, &InjectOptions::default())
}

/// [`append_locals`] with explicit options.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip_all, fields(unit = %unit.name, injected = names.len()))
)]
pub fn append_locals_with<S: AsRef<str>>(
    unit: &CodeUnit,
    names: &[S],
    options: &InjectOptions,
) -> InjectResult<CodeUnit> {
    let injected: Vec<String> = names.iter().map(|n| n.as_ref().to_owned()).collect();

    let mut instrs = unit.instructions()?;
    #[cfg(feature = "tracing")]
    trace!(before = %graft_core::disasm::disassemble_compact(&instrs), "decoded");

    let plan = Renumbering::plan(unit, &instrs, &injected)?;
    let redirected = patch(&mut instrs, &plan)?;

    #[cfg(feature = "tracing")]
    debug!(
        removed = plan.removed_names(),
        protected = ?plan.protected(),
        redirected,
        "renumbered symbol tables"
    );
    #[cfg(not(feature = "tracing"))]
    let _ = redirected;

    let code = encode(&instrs)?;
    #[cfg(feature = "tracing")]
    trace!(after = %graft_core::disasm::disassemble_compact(&instrs), "patched");

    if options.preserve_layout && code.len() != unit.code.len() {
        return Err(InjectError::CodeLayoutChanged { before: unit.code.len(), after: code.len() });
    }

    let k = injected.len();
    let out = CodeUnit {
        argcount: grow(unit.argcount, k)?,
        nlocals: grow(unit.nlocals, k)?,
        stacksize: unit.stacksize,
        flags: unit.flags,
        code,
        consts: unit.consts.clone(),
        names: plan.names,
        varnames: plan.varnames,
        filename: unit.filename.clone(),
        name: unit.name.clone(),
        firstlineno: unit.firstlineno,
        lnotab: unit.lnotab.clone(),
    };

    if options.validate_output {
        validate_unit(&out)?;
    }
    Ok(out)
}

/// Rewrite every table operand of `instrs` through `plan`.
///
/// Returns the number of `LOAD_GLOBAL`s turned into `LOAD_FAST`s.
pub fn patch(instrs: &mut [Instruction], plan: &Renumbering) -> InjectResult<usize> {
    let mut redirected = 0;
    for ins in instrs.iter_mut() {
        let Some(old) = ins.index() else { continue };

        if ins.op == opcode::LOAD_GLOBAL {
            if let Some(slot) = plan.redirect(old) {
                *ins = Instruction::with_arg(opcode::LOAD_FAST, slot)?;
                redirected += 1;
            } else {
                let new = plan.name(old).ok_or(InjectError::NameLost { index: old })?;
                *ins = Instruction::with_arg(ins.op, new)?;
            }
        } else if opcode::has_name(ins.op) {
            let new = plan.name(old).ok_or(InjectError::NameLost { index: old })?;
            *ins = Instruction::with_arg(ins.op, new)?;
        } else if opcode::has_local(ins.op) {
            let new = plan
                .local(old)
                .ok_or(InjectError::IndexOutOfRange { index: old, len: plan.old_local_count() })?;
            *ins = Instruction::with_arg(ins.op, new)?;
        }
    }
    Ok(redirected)
}

fn grow(count: u32, by: usize) -> InjectResult<u32> {
    u32::try_from(by)
        .ok()
        .and_then(|by| count.checked_add(by))
        .ok_or_else(|| CoreError::OperandTooLarge { value: u64::from(count) + by as u64 }.into())
}
