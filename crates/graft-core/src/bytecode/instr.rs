//! Decoded instruction: opcode plus optional 32-bit operand.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::opcode;
use crate::{CoreError, CoreResult};

/// One position of a decoded instruction stream.
///
/// `arg` is `Some` exactly when `op >= HAVE_ARGUMENT`; `EXTENDED_ARG` never
/// appears as a decoded instruction since the codec folds it into the operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instruction {
    /// Operation code.
    pub op: u8,
    /// Operand (only for opcodes with an argument).
    pub arg: Option<u32>,
}

impl Instruction {
    /// Operand-less instruction.
    pub fn simple(op: u8) -> CoreResult<Self> {
        if opcode::has_arg(op) {
            return Err(CoreError::InvalidInstruction { op, reason: "opcode requires an operand" });
        }
        Ok(Self { op, arg: None })
    }

    /// Instruction with an operand; `arg` must fit in 32 bits.
    pub fn with_arg(op: u8, arg: usize) -> CoreResult<Self> {
        if !opcode::has_arg(op) {
            return Err(CoreError::InvalidInstruction { op, reason: "opcode takes no operand" });
        }
        let arg = u32::try_from(arg).map_err(|_| CoreError::OperandTooLarge { value: arg as u64 })?;
        Ok(Self { op, arg: Some(arg) })
    }

    /// Operand as a table index, if any.
    pub fn index(&self) -> Option<usize> { self.arg.map(|a| a as usize) }

    /// Mnemonic, if the opcode is known.
    pub fn mnemonic(&self) -> Option<&'static str> { opcode::name(self.op) }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(n) => f.write_str(n)?,
            None => write!(f, "<{}>", self.op)?,
        }
        if let Some(arg) = self.arg {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
