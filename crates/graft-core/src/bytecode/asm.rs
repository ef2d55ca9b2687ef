//! Small line-based assembler used by tests and benches to build units.
//!
//! ```text
//! ; comment
//! .arg a              declare a positional argument (before any local use)
//! .local b            declare a local slot
//! .name helper        reserve an external name
//! .const 42           append a constant (int, float, "str", None, True, False)
//! .line 7             source line of the following instructions
//! .stacksize 2
//! LOAD_GLOBAL helper  name operand, interned into `names`
//! LOAD_FAST a         local operand, interned into `varnames`
//! LOAD_CONST 0        plain decimal operand
//! LOAD_FAST #9        raw operand, no interning
//! RETURN_VALUE
//! ```

use crate::{
    bytecode::{codec, opcode},
    CodeFlags, CodeUnit, ConstValue, CoreError, CoreResult, Instruction,
};

/// Assemble `source` into a [`CodeUnit`] named `name`.
pub fn assemble(name: &str, source: &str) -> CoreResult<CodeUnit> {
    let mut unit = CodeUnit {
        name: name.into(),
        filename: "<asm>".into(),
        flags: CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS | CodeFlags::NOFREE,
        firstlineno: 1,
        ..CodeUnit::default()
    };
    let mut instrs: Vec<Instruction> = Vec::new();
    let mut lines = LnotabBuilder::starting_at(unit.firstlineno);
    let mut current_line: Option<u32> = None;
    let mut args_closed = false;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.split(';').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (line, ""),
        };

        match head {
            ".arg" => {
                if args_closed {
                    return Err(CoreError::corrupted(format!(
                        "line {line_no}: arguments must be declared before locals"
                    )));
                }
                push_distinct(&mut unit.varnames, rest, line_no)?;
                unit.argcount += 1;
            }
            ".local" => {
                args_closed = true;
                push_distinct(&mut unit.varnames, rest, line_no)?;
            }
            ".name" => push_distinct(&mut unit.names, rest, line_no)?,
            ".const" => {
                unit.consts.add(parse_const(rest)?);
            }
            ".line" => {
                let n = parse_number(rest, line_no)?;
                if instrs.is_empty() && current_line.is_none() {
                    unit.firstlineno = n;
                    lines.reset(n);
                }
                current_line = Some(n);
            }
            ".stacksize" => unit.stacksize = parse_number(rest, line_no)?,
            mnemonic => {
                let op = opcode::from_name(mnemonic)
                    .ok_or_else(|| CoreError::UnknownOpcode(mnemonic.into()))?;
                let ins = if opcode::has_arg(op) {
                    let arg = if let Some(raw) = rest.strip_prefix('#') {
                        parse_number(raw, line_no)? as usize
                    } else if opcode::has_name(op) {
                        intern(&mut unit.names, rest, line_no)?
                    } else if opcode::has_local(op) {
                        args_closed = true;
                        intern(&mut unit.varnames, rest, line_no)?
                    } else {
                        parse_number(rest, line_no)? as usize
                    };
                    Instruction::with_arg(op, arg)?
                } else {
                    if !rest.is_empty() {
                        return Err(CoreError::corrupted(format!(
                            "line {line_no}: `{mnemonic}` takes no operand"
                        )));
                    }
                    Instruction::simple(op)?
                };
                if let Some(l) = current_line {
                    lines.mark(l, line_no)?;
                }
                lines.advance(codec::encoded_len(&ins));
                instrs.push(ins);
            }
        }
    }

    unit.nlocals = unit.varnames.len() as u32;
    unit.code = codec::encode(&instrs)?;
    unit.lnotab = lines.finish();
    Ok(unit)
}

/// Incremental `lnotab` writer.
#[derive(Debug)]
struct LnotabBuilder {
    out: Vec<u8>,
    offset: usize,
    last_offset: usize,
    last_line: u32,
}

impl LnotabBuilder {
    fn starting_at(first_line: u32) -> Self {
        Self { out: Vec::new(), offset: 0, last_offset: 0, last_line: first_line }
    }

    fn reset(&mut self, first_line: u32) { self.last_line = first_line; }

    fn advance(&mut self, width: usize) { self.offset += width; }

    fn mark(&mut self, line: u32, src_line: usize) -> CoreResult<()> {
        if line == self.last_line {
            return Ok(());
        }
        if line < self.last_line {
            return Err(CoreError::corrupted(format!("line {src_line}: `.line` must not decrease")));
        }
        let mut byte_delta = self.offset - self.last_offset;
        let mut line_delta = line - self.last_line;
        while byte_delta > 255 {
            self.out.extend_from_slice(&[255, 0]);
            byte_delta -= 255;
        }
        while line_delta > 255 {
            self.out.extend_from_slice(&[byte_delta as u8, 255]);
            line_delta -= 255;
            byte_delta = 0;
        }
        self.out.extend_from_slice(&[byte_delta as u8, line_delta as u8]);
        self.last_offset = self.offset;
        self.last_line = line;
        Ok(())
    }

    fn finish(self) -> Vec<u8> { self.out }
}

fn push_distinct(table: &mut Vec<String>, name: &str, line_no: usize) -> CoreResult<()> {
    check_ident(name, line_no)?;
    if table.iter().any(|n| n == name) {
        return Err(CoreError::corrupted(format!("line {line_no}: `{name}` declared twice")));
    }
    table.push(name.into());
    Ok(())
}

fn intern(table: &mut Vec<String>, name: &str, line_no: usize) -> CoreResult<usize> {
    check_ident(name, line_no)?;
    if let Some(ix) = table.iter().position(|n| n == name) {
        return Ok(ix);
    }
    table.push(name.into());
    Ok(table.len() - 1)
}

fn check_ident(name: &str, line_no: usize) -> CoreResult<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CoreError::corrupted(format!("line {line_no}: invalid identifier `{name}`")))
    }
}

fn parse_number(text: &str, line_no: usize) -> CoreResult<u32> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| CoreError::corrupted(format!("line {line_no}: expected an integer, got `{text}`")))
}

fn parse_const(literal: &str) -> CoreResult<ConstValue> {
    match literal {
        "None" => return Ok(ConstValue::None),
        "True" => return Ok(ConstValue::Bool(true)),
        "False" => return Ok(ConstValue::Bool(false)),
        _ => {}
    }
    if literal.starts_with('"') {
        return parse_string_literal(literal).map(ConstValue::Str);
    }
    if let Ok(i) = literal.parse::<i64>() {
        return Ok(ConstValue::Int(i));
    }
    literal
        .parse::<f64>()
        .map(ConstValue::Float)
        .map_err(|_| CoreError::corrupted(format!("unsupported constant `{literal}`")))
}

fn parse_string_literal(input: &str) -> CoreResult<String> {
    let inner = input
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| CoreError::corrupted("string literal expected"))?;

    let mut out = String::new();
    let mut escaping = false;
    for c in inner.chars() {
        if escaping {
            out.push(match c {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            escaping = false;
        } else if c == '\\' {
            escaping = true;
        } else {
            out.push(c);
        }
    }

    if escaping {
        return Err(CoreError::corrupted("incomplete escape sequence"));
    }
    Ok(out)
}
