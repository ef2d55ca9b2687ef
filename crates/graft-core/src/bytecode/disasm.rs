//! Minimal textual disassembly helpers used by tests and trace logs.

use core::fmt::Write;

use crate::{
    bytecode::{codec, opcode},
    CodeUnit, ConstValue, CoreResult, Instruction,
};

/// Produce a multi-line, human readable disassembly with metadata.
pub fn disassemble_full(unit: &CodeUnit) -> CoreResult<String> {
    let instrs = unit.instructions()?;
    let lines = unit.line_table();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "== {} == (file={}, args={}, locals={}, stack={}, flags={:?})",
        unit.name, unit.filename, unit.argcount, unit.nlocals, unit.stacksize, unit.flags
    );
    let _ = writeln!(out, ";; varnames: {:?}", unit.varnames);
    let _ = writeln!(out, ";; names: {:?}", unit.names);

    if !unit.consts.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, ";; constants");
        for (idx, value) in unit.consts.iter() {
            let _ = writeln!(out, "const[{idx:04}] = {}", show_const(value));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, ";; code");
    let mut offset = 0usize;
    for ins in &instrs {
        let line = lines.line_for_offset(offset as u32);
        match preview(unit, ins) {
            Some(p) => {
                let _ = writeln!(out, "{offset:04} | {line:4} | {ins} ({p})");
            }
            None => {
                let _ = writeln!(out, "{offset:04} | {line:4} | {ins}");
            }
        }
        offset += codec::encoded_len(ins);
    }

    Ok(out)
}

/// One-line-per-instruction variant, without table resolution.
pub fn disassemble_compact(instrs: &[Instruction]) -> String {
    let mut out = String::new();
    let mut offset = 0usize;
    for ins in instrs {
        let _ = writeln!(out, "{offset:04}: {ins}");
        offset += codec::encoded_len(ins);
    }
    out
}

fn preview(unit: &CodeUnit, ins: &Instruction) -> Option<String> {
    let ix = ins.index()?;
    if opcode::has_name(ins.op) {
        unit.names.get(ix).cloned()
    } else if opcode::has_local(ins.op) {
        unit.varnames.get(ix).cloned()
    } else if ins.op == opcode::LOAD_CONST {
        unit.consts.get(ix as u32).map(show_const)
    } else {
        None
    }
}

pub(crate) fn show_const(value: &ConstValue) -> String {
    match value {
        ConstValue::None => "None".into(),
        ConstValue::Bool(true) => "True".into(),
        ConstValue::Bool(false) => "False".into(),
        ConstValue::Int(i) => format!("{i}"),
        ConstValue::Float(f) => format!("{f:?}"),
        ConstValue::Str(s) => {
            if s.chars().count() <= 64 {
                format!("{s:?}")
            } else {
                let head: String = s.chars().take(64).collect();
                format!("{head:?}…")
            }
        }
        ConstValue::Bytes(bytes) => format!("bytes[{}]", bytes.len()),
        ConstValue::Tuple(items) => {
            let inner: Vec<String> = items.iter().map(show_const).collect();
            if inner.len() == 1 {
                format!("({},)", inner[0])
            } else {
                format!("({})", inner.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::opcode::{LOAD_CONST, LOAD_FAST, LOAD_GLOBAL, RETURN_VALUE};
    use crate::{CodeUnit, ConstPool};
    use pretty_assertions::assert_eq;

    #[test]
    fn compact_listing_tracks_offsets() {
        let instrs = [
            Instruction { op: LOAD_FAST, arg: Some(0x1_0000) },
            Instruction { op: RETURN_VALUE, arg: None },
        ];
        assert_eq!(disassemble_compact(&instrs), "0000: LOAD_FAST 65536\n0006: RETURN_VALUE\n");
    }

    #[test]
    fn full_listing_resolves_tables() -> CoreResult<()> {
        let unit = CodeUnit {
            name: "f".into(),
            filename: "f.py".into(),
            argcount: 1,
            nlocals: 1,
            firstlineno: 3,
            code: vec![LOAD_GLOBAL, 0, 0, LOAD_FAST, 0, 0, LOAD_CONST, 0, 0, RETURN_VALUE],
            names: vec!["helper".into()],
            varnames: vec!["a".into()],
            consts: ConstPool::from_iter([ConstValue::Tuple(vec![ConstValue::Int(1)])]),
            ..CodeUnit::default()
        };
        let text = disassemble_full(&unit)?;
        assert!(text.contains("0000 |    3 | LOAD_GLOBAL 0 (helper)"));
        assert!(text.contains("0003 |    3 | LOAD_FAST 0 (a)"));
        assert!(text.contains("0006 |    3 | LOAD_CONST 0 ((1,))"));
        assert!(text.contains("0009 |    3 | RETURN_VALUE"));
        Ok(())
    }
}
