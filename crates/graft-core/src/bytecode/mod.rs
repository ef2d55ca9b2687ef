//! Bytecode primitives: compiled-unit descriptor, opcode tables, the
//! instruction codec and the tooling helpers built on top of it.

/// Compiled-unit descriptor plus its constant pool and line table.
pub mod unit;
/// Static opcode classification tables.
pub mod opcode;
/// Decoded instruction value.
pub mod instr;
/// Variable-length instruction decoding/encoding.
pub mod codec;
pub mod helpers;
pub mod disasm;
pub mod asm;

pub use codec::{decode, encode, encoded_len};
pub use instr::Instruction;
pub use unit::{CodeFlags, CodeUnit, ConstPool, ConstValue, LineTable};
