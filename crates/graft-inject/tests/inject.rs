//! End-to-end injection scenarios.

use graft_core::{
    asm::assemble,
    bytecode::opcode::{
        JUMP_ABSOLUTE, LOAD_ATTR, LOAD_CONST, LOAD_FAST, LOAD_GLOBAL, RETURN_VALUE, STORE_FAST, STORE_GLOBAL,
    },
    encode, CodeFlags, CodeUnit, ConstValue, CoreError, Instruction,
};
use graft_inject::{
    add_locals, append_locals, append_locals_with, HostFunction, InjectError, InjectOptions, InjectResult,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

fn ins(op: u8, arg: u32) -> Instruction { Instruction { op, arg: Some(arg) } }

fn strings(xs: &[&str]) -> Vec<String> { xs.iter().map(|s| (*s).to_string()).collect() }

/// Minimal host callable: a unit plus its positional defaults.
#[derive(Debug, Clone, PartialEq)]
struct Function {
    code: CodeUnit,
    defaults: Vec<i64>,
}

impl HostFunction for Function {
    type Value = i64;

    fn code(&self) -> &CodeUnit { &self.code }

    fn rebind(&self, code: CodeUnit, injected_defaults: Vec<i64>) -> Self {
        let mut defaults = self.defaults.clone();
        defaults.extend(injected_defaults);
        Self { code, defaults }
    }
}

#[test]
fn injects_one_binding_after_the_sole_argument() -> InjectResult<()> {
    let unit = CodeUnit {
        argcount: 1,
        nlocals: 2,
        stacksize: 3,
        flags: CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS,
        code: encode(&[ins(LOAD_GLOBAL, 0), ins(LOAD_FAST, 0), ins(LOAD_FAST, 1)])?,
        names: strings(&["helper"]),
        varnames: strings(&["a", "b"]),
        filename: "m.py".into(),
        name: "f".into(),
        firstlineno: 1,
        ..CodeUnit::default()
    };
    let func = Function { code: unit.clone(), defaults: Vec::new() };

    let out = add_locals(&func, IndexMap::from([("x".to_string(), 42)]))?;

    assert_eq!(out.defaults, vec![42]);
    assert_eq!(out.code.argcount, 2);
    assert_eq!(out.code.nlocals, 3);
    assert_eq!(out.code.varnames, strings(&["a", "x", "b"]));
    assert_eq!(out.code.names, strings(&["helper"]));
    assert_eq!(
        out.code.instructions()?,
        vec![ins(LOAD_GLOBAL, 0), ins(LOAD_FAST, 0), ins(LOAD_FAST, 2)]
    );
    assert_eq!(func.code, unit, "input must not be mutated");
    Ok(())
}

#[test]
fn empty_injection_is_identity() -> InjectResult<()> {
    let unit = assemble(
        "g",
        r#"
        .arg a
        .const None
        .const "s"
        .line 3
        LOAD_GLOBAL len
        LOAD_FAST a
        .line 4
        LOAD_ATTR upper
        STORE_FAST tmp
        JUMP_ABSOLUTE #70000
        LOAD_CONST 1
        RETURN_VALUE
        "#,
    )?;
    let out = append_locals(&unit, &[] as &[&str])?;
    assert_eq!(out, unit);
    Ok(())
}

#[test]
fn injected_names_follow_the_argument_prefix_in_order() -> InjectResult<()> {
    let unit = assemble(
        "h",
        ".arg a\n.arg b\n.local c\n.local d\nLOAD_FAST d\nLOAD_GLOBAL q\nSTORE_FAST c\nLOAD_FAST b",
    )?;
    let out = append_locals(&unit, &["p", "q", "r"])?;

    assert_eq!(out.argcount, unit.argcount + 3);
    assert_eq!(out.nlocals, unit.nlocals + 3);
    assert_eq!(&out.varnames[..2], &unit.varnames[..2]);
    assert_eq!(&out.varnames[2..5], strings(&["p", "q", "r"]).as_slice());
    assert_eq!(&out.varnames[5..], &unit.varnames[2..]);
    assert!(out.names.is_empty());
    assert_eq!(
        out.instructions()?,
        vec![ins(LOAD_FAST, 6), ins(LOAD_FAST, 3), ins(STORE_FAST, 5), ins(LOAD_FAST, 1)]
    );
    Ok(())
}

#[test]
fn protected_name_stays_external_while_global_loads_go_local() -> InjectResult<()> {
    let unit = assemble(
        "k",
        ".arg self\nLOAD_GLOBAL cfg\nLOAD_GLOBAL x\nLOAD_FAST self\nLOAD_ATTR x\nSTORE_GLOBAL x",
    )?;
    assert_eq!(unit.names, strings(&["cfg", "x"]));

    let out = append_locals(&unit, &["x", "cfg"])?;

    // `x` is also an attribute/global store, `cfg` is only ever a global load.
    assert_eq!(out.names, strings(&["x"]));
    assert_eq!(out.varnames, strings(&["self", "x", "cfg"]));
    assert_eq!(
        out.instructions()?,
        vec![
            ins(LOAD_FAST, 2),
            ins(LOAD_FAST, 1),
            ins(LOAD_FAST, 0),
            ins(LOAD_ATTR, 0),
            ins(STORE_GLOBAL, 0),
        ]
    );
    Ok(())
}

#[test]
fn unreferenced_injected_name_is_dropped_from_external_table() -> InjectResult<()> {
    let unit = assemble("u", ".name a\n.name b\n.name c\nLOAD_GLOBAL c\nLOAD_ATTR a")?;
    let out = append_locals(&unit, &["b"])?;
    assert_eq!(out.names, strings(&["a", "c"]));
    assert_eq!(out.instructions()?, vec![ins(LOAD_GLOBAL, 1), ins(LOAD_ATTR, 0)]);
    Ok(())
}

#[test]
fn metadata_is_carried_through() -> InjectResult<()> {
    let mut unit = assemble("meta", ".stacksize 4\n.const 1.5\n.line 10\nLOAD_CONST 0\n.line 12\nRETURN_VALUE")?;
    unit.flags |= CodeFlags::GENERATOR;
    unit.filename = "meta.py".into();

    let out = append_locals(&unit, &["z"])?;
    assert_eq!(out.stacksize, 4);
    assert_eq!(out.flags, unit.flags);
    assert_eq!(out.consts.get(0), Some(&ConstValue::Float(1.5)));
    assert_eq!((out.filename.as_str(), out.name.as_str()), ("meta.py", "meta"));
    assert_eq!((out.firstlineno, out.lnotab.clone()), (10, vec![3, 2]));
    assert_eq!(out.code, unit.code);
    Ok(())
}

#[test]
fn duplicate_names_are_rejected() -> InjectResult<()> {
    let unit = assemble("d", ".arg a\n.local b\nLOAD_GLOBAL c")?;
    assert_eq!(append_locals(&unit, &["a"]), Err(InjectError::DuplicateName("a".into())));
    assert_eq!(append_locals(&unit, &["b"]), Err(InjectError::DuplicateName("b".into())));
    assert_eq!(append_locals(&unit, &["c", "c"]), Err(InjectError::DuplicateName("c".into())));
    Ok(())
}

#[test]
fn dangling_name_operands_are_lost() -> InjectResult<()> {
    let unit = assemble("n", ".name g\nLOAD_ATTR #5")?;
    assert_eq!(append_locals(&unit, &["y"]), Err(InjectError::NameLost { index: 5 }));

    let unit = assemble("n", ".name g\nLOAD_GLOBAL #1")?;
    assert_eq!(append_locals(&unit, &["g"]), Err(InjectError::NameLost { index: 1 }));
    Ok(())
}

#[test]
fn local_operand_beyond_declared_count_is_out_of_range() -> InjectResult<()> {
    let unit = assemble("o", ".arg a\nLOAD_FAST #9")?;
    assert_eq!(
        append_locals(&unit, &["y"]),
        Err(InjectError::IndexOutOfRange { index: 9, len: 1 })
    );
    Ok(())
}

#[test]
fn malformed_code_is_reported() {
    let unit = CodeUnit { code: vec![RETURN_VALUE, LOAD_FAST, 0x00], ..CodeUnit::default() };
    let err = append_locals(&unit, &["y"]).unwrap_err();
    assert!(err.is_malformed(), "{err}");
    assert_eq!(err, InjectError::Core(CoreError::MalformedEncoding { offset: 1, reason: "truncated operand" }));
}

#[test]
fn renumbering_across_the_sixteen_bit_boundary() -> InjectResult<()> {
    let varnames: Vec<String> = (0..=0xFFFF).map(|i| format!("v{i}")).collect();
    let unit = CodeUnit {
        nlocals: varnames.len() as u32,
        code: encode(&[ins(LOAD_FAST, 0xFFFF), Instruction { op: RETURN_VALUE, arg: None }])?,
        varnames,
        ..CodeUnit::default()
    };

    assert_eq!(
        append_locals(&unit, &["fresh"]),
        Err(InjectError::CodeLayoutChanged { before: 4, after: 7 })
    );

    let lax = InjectOptions::default().with_preserve_layout(false);
    let out = append_locals_with(&unit, &["fresh"], &lax)?;
    assert_eq!(out.instructions()?[0], ins(LOAD_FAST, 0x1_0000));
    assert_eq!(out.varnames[0], "fresh");
    Ok(())
}

#[test]
fn output_validation_catches_inconsistent_inputs() -> InjectResult<()> {
    let mut unit = assemble("v", ".arg a\nLOAD_CONST 0")?;
    assert!(matches!(append_locals(&unit, &["y"]), Err(InjectError::Core(CoreError::Corrupted(_)))));

    let lax = InjectOptions::default().with_validate_output(false);
    assert!(append_locals_with(&unit, &["y"], &lax).is_ok());

    unit.consts.add(ConstValue::None);
    assert!(append_locals(&unit, &["y"]).is_ok());
    Ok(())
}

#[test]
fn host_defaults_follow_map_order_and_keep_existing_ones() -> InjectResult<()> {
    let unit = assemble("w", ".arg a\n.arg b\nLOAD_GLOBAL k2\nLOAD_GLOBAL k1\nLOAD_FAST b")?;
    let func = Function { code: unit, defaults: vec![7] };

    let mut locals = IndexMap::new();
    locals.insert("k1".to_string(), 1);
    locals.insert("k2".to_string(), 2);
    let out = add_locals(&func, locals)?;

    assert_eq!(out.defaults, vec![7, 1, 2]);
    assert_eq!(out.code.varnames, strings(&["a", "b", "k1", "k2"]));
    assert_eq!(
        out.code.instructions()?,
        vec![ins(LOAD_FAST, 3), ins(LOAD_FAST, 2), ins(LOAD_FAST, 1)]
    );
    Ok(())
}

#[test]
fn rewrite_emits_traces() -> InjectResult<()> {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new("graft_inject=trace"))
        .try_init();

    let unit = assemble("t", "LOAD_GLOBAL x\nLOAD_CONST #0")?;
    let out = append_locals_with(&unit, &["x"], &InjectOptions::default().with_validate_output(false))?;
    assert_eq!(out.instructions()?, vec![ins(LOAD_FAST, 0), ins(LOAD_CONST, 0)]);
    Ok(())
}

#[test]
fn jump_operands_are_never_rewritten() -> InjectResult<()> {
    let unit = assemble("j", ".arg a\nLOAD_FAST a\nJUMP_ABSOLUTE 0")?;
    let out = append_locals(&unit, &["y"])?;
    assert_eq!(out.instructions()?, vec![ins(LOAD_FAST, 0), ins(JUMP_ABSOLUTE, 0)]);
    Ok(())
}
