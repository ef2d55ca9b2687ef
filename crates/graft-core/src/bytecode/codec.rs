//! Instruction stream codec.
//!
//! ```text
//! entry    = op                       (op <  HAVE_ARGUMENT)
//!          | op lo hi                 (op >= HAVE_ARGUMENT, u16 LE)
//! extended = EXTENDED_ARG lo hi entry (high 16 bits of the next operand)
//! ```

use super::{
    instr::Instruction,
    opcode::{self, EXTENDED_ARG},
};
use crate::{ByteReader, ByteWriter, CoreError, CoreResult};

/// Decode a raw instruction stream.
///
/// The pending `EXTENDED_ARG` bits live in a local accumulator, so each call
/// starts from a clean state.
pub fn decode(code: &[u8]) -> CoreResult<Vec<Instruction>> {
    let mut r = ByteReader::new(code);
    let mut out = Vec::with_capacity(code.len() / 2);
    let mut extended: u64 = 0;
    let mut pending_at: Option<usize> = None;

    while r.remaining() > 0 {
        let at = r.offset();
        let op = r.read_u8()?;
        if !opcode::has_arg(op) {
            if let Some(offset) = pending_at {
                return Err(CoreError::MalformedEncoding {
                    offset,
                    reason: "EXTENDED_ARG not followed by an operand",
                });
            }
            out.push(Instruction { op, arg: None });
            continue;
        }

        let low = r
            .read_u16_le()
            .map_err(|_| CoreError::MalformedEncoding { offset: at, reason: "truncated operand" })?;
        let value = extended | u64::from(low);
        extended = 0;

        if op == EXTENDED_ARG {
            extended = value << 16;
            if extended > u64::from(u32::MAX) {
                return Err(CoreError::OperandTooLarge { value: extended });
            }
            pending_at = Some(at);
            continue;
        }
        pending_at = None;

        // bounded by the check on `extended` above
        let arg = u32::try_from(value).map_err(|_| CoreError::OperandTooLarge { value })?;
        out.push(Instruction { op, arg: Some(arg) });
    }

    if let Some(offset) = pending_at {
        return Err(CoreError::MalformedEncoding { offset, reason: "dangling EXTENDED_ARG" });
    }
    Ok(out)
}

/// Encode an instruction sequence back to bytes.
pub fn encode(instrs: &[Instruction]) -> CoreResult<Vec<u8>> {
    let mut w = ByteWriter::with_capacity(instrs.len() * 3);
    for ins in instrs {
        write_instruction(&mut w, ins)?;
    }
    Ok(w.into_vec())
}

/// Byte width of one encoded instruction (1, 3 or 6).
pub fn encoded_len(ins: &Instruction) -> usize {
    match ins.arg {
        None => 1,
        Some(arg) if arg <= 0xFFFF => 3,
        Some(_) => 6,
    }
}

fn write_instruction(w: &mut ByteWriter, ins: &Instruction) -> CoreResult<()> {
    let op = ins.op;
    if op == EXTENDED_ARG {
        return Err(CoreError::InvalidInstruction { op, reason: "EXTENDED_ARG is implicit" });
    }
    match (opcode::has_arg(op), ins.arg) {
        (false, None) => w.write_u8(op),
        (true, Some(arg)) => {
            if arg > 0xFFFF {
                w.write_u8(EXTENDED_ARG);
                w.write_u16_le((arg >> 16) as u16);
            }
            w.write_u8(op);
            w.write_u16_le((arg & 0xFFFF) as u16);
        }
        (true, None) => {
            return Err(CoreError::InvalidInstruction { op, reason: "missing operand" });
        }
        (false, Some(_)) => {
            return Err(CoreError::InvalidInstruction { op, reason: "unexpected operand" });
        }
    }
    Ok(())
}
