//! Opcode numbering and classification.
//!
//! Layout of the instruction stream: one opcode byte, followed by a
//! little-endian `u16` operand when the opcode is `>= HAVE_ARGUMENT`.
//! `EXTENDED_ARG` carries the high half of the next operand.

#![allow(missing_docs)]

/// First opcode that carries an operand.
pub const HAVE_ARGUMENT: u8 = 90;
/// Operand-widening prefix.
pub const EXTENDED_ARG: u8 = 145;

pub const POP_TOP: u8 = 1;
pub const ROT_TWO: u8 = 2;
pub const DUP_TOP: u8 = 4;
pub const NOP: u8 = 9;
pub const BINARY_MULTIPLY: u8 = 20;
pub const BINARY_ADD: u8 = 23;
pub const BINARY_SUBTRACT: u8 = 24;
pub const BINARY_SUBSCR: u8 = 25;
pub const PRINT_ITEM: u8 = 71;
pub const PRINT_NEWLINE: u8 = 72;
pub const RETURN_VALUE: u8 = 83;

pub const STORE_NAME: u8 = 90;
pub const DELETE_NAME: u8 = 91;
pub const STORE_ATTR: u8 = 95;
pub const DELETE_ATTR: u8 = 96;
pub const STORE_GLOBAL: u8 = 97;
pub const DELETE_GLOBAL: u8 = 98;
pub const LOAD_CONST: u8 = 100;
pub const LOAD_NAME: u8 = 101;
pub const BUILD_TUPLE: u8 = 102;
pub const BUILD_LIST: u8 = 103;
pub const LOAD_ATTR: u8 = 106;
pub const COMPARE_OP: u8 = 107;
pub const IMPORT_NAME: u8 = 108;
pub const IMPORT_FROM: u8 = 109;
pub const JUMP_FORWARD: u8 = 110;
pub const JUMP_ABSOLUTE: u8 = 113;
pub const POP_JUMP_IF_FALSE: u8 = 114;
pub const POP_JUMP_IF_TRUE: u8 = 115;
pub const LOAD_GLOBAL: u8 = 116;
pub const LOAD_FAST: u8 = 124;
pub const STORE_FAST: u8 = 125;
pub const DELETE_FAST: u8 = 126;
pub const CALL_FUNCTION: u8 = 131;
pub const MAKE_FUNCTION: u8 = 132;

/// Opcodes whose operand indexes the external-name table.
pub const HAS_NAME: [u8; 11] = [
    STORE_NAME,
    DELETE_NAME,
    STORE_ATTR,
    DELETE_ATTR,
    STORE_GLOBAL,
    DELETE_GLOBAL,
    LOAD_NAME,
    LOAD_ATTR,
    IMPORT_NAME,
    IMPORT_FROM,
    LOAD_GLOBAL,
];

/// Opcodes whose operand indexes the local-variable table.
pub const HAS_LOCAL: [u8; 3] = [LOAD_FAST, STORE_FAST, DELETE_FAST];

/// Mnemonic table, in opcode order.
const MNEMONICS: [(u8, &str); 36] = [
    (POP_TOP, "POP_TOP"),
    (ROT_TWO, "ROT_TWO"),
    (DUP_TOP, "DUP_TOP"),
    (NOP, "NOP"),
    (BINARY_MULTIPLY, "BINARY_MULTIPLY"),
    (BINARY_ADD, "BINARY_ADD"),
    (BINARY_SUBTRACT, "BINARY_SUBTRACT"),
    (BINARY_SUBSCR, "BINARY_SUBSCR"),
    (PRINT_ITEM, "PRINT_ITEM"),
    (PRINT_NEWLINE, "PRINT_NEWLINE"),
    (RETURN_VALUE, "RETURN_VALUE"),
    (STORE_NAME, "STORE_NAME"),
    (DELETE_NAME, "DELETE_NAME"),
    (STORE_ATTR, "STORE_ATTR"),
    (DELETE_ATTR, "DELETE_ATTR"),
    (STORE_GLOBAL, "STORE_GLOBAL"),
    (DELETE_GLOBAL, "DELETE_GLOBAL"),
    (LOAD_CONST, "LOAD_CONST"),
    (LOAD_NAME, "LOAD_NAME"),
    (BUILD_TUPLE, "BUILD_TUPLE"),
    (BUILD_LIST, "BUILD_LIST"),
    (LOAD_ATTR, "LOAD_ATTR"),
    (COMPARE_OP, "COMPARE_OP"),
    (IMPORT_NAME, "IMPORT_NAME"),
    (IMPORT_FROM, "IMPORT_FROM"),
    (JUMP_FORWARD, "JUMP_FORWARD"),
    (JUMP_ABSOLUTE, "JUMP_ABSOLUTE"),
    (POP_JUMP_IF_FALSE, "POP_JUMP_IF_FALSE"),
    (POP_JUMP_IF_TRUE, "POP_JUMP_IF_TRUE"),
    (LOAD_GLOBAL, "LOAD_GLOBAL"),
    (LOAD_FAST, "LOAD_FAST"),
    (STORE_FAST, "STORE_FAST"),
    (DELETE_FAST, "DELETE_FAST"),
    (CALL_FUNCTION, "CALL_FUNCTION"),
    (MAKE_FUNCTION, "MAKE_FUNCTION"),
    (EXTENDED_ARG, "EXTENDED_ARG"),
];

/// True if `op` is followed by a 16-bit operand.
#[must_use]
pub const fn has_arg(op: u8) -> bool { op >= HAVE_ARGUMENT }

/// True if `op`'s operand indexes the external-name table.
#[must_use]
pub const fn has_name(op: u8) -> bool {
    matches!(
        op,
        STORE_NAME
            | DELETE_NAME
            | STORE_ATTR
            | DELETE_ATTR
            | STORE_GLOBAL
            | DELETE_GLOBAL
            | LOAD_NAME
            | LOAD_ATTR
            | IMPORT_NAME
            | IMPORT_FROM
            | LOAD_GLOBAL
    )
}

/// True if `op`'s operand indexes the local-variable table.
#[must_use]
pub const fn has_local(op: u8) -> bool { matches!(op, LOAD_FAST | STORE_FAST | DELETE_FAST) }

/// Mnemonic for `op`, if known.
#[must_use]
pub fn name(op: u8) -> Option<&'static str> {
    MNEMONICS.iter().find(|(code, _)| *code == op).map(|(_, n)| *n)
}

/// Opcode for a mnemonic (case-insensitive).
#[must_use]
pub fn from_name(mnemonic: &str) -> Option<u8> {
    MNEMONICS
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(mnemonic))
        .map(|(code, _)| *code)
}
