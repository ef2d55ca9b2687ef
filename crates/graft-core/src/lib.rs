//! graft-core — primitives partagées pour la réécriture d'unités compilées
//!
//! Fournit :
//! - `CodeUnit` (descripteur d'unité compilée) + `ConstPool`, `LineTable`, `CodeFlags`
//! - Tables d'opcodes (`HAVE_ARGUMENT`, `EXTENDED_ARG`, `HAS_NAME`, `HAS_LOCAL`, mnémoniques)
//! - Codec d'instructions : `decode` / `encode` (opérande LE 16 bits + échappement EXTENDED_ARG)
//! - IO mémoire (little-endian) : `ByteWriter`, `ByteReader`
//! - Validation (`helpers`), désassembleur (`disasm`), mini-assembleur (`asm`)
//! - Erreurs `CoreError` + alias `CoreResult<T>`
//!
//! Features :
//! - `std` (par défaut)
//! - `serde` (par défaut) : derive (dé)sérialisation sur les descripteurs

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

use std::borrow::Cow;

use thiserror::Error;

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Primitives de bytecode (unité, opcodes, codec, assembleur, désassembleur, helpers).
pub mod bytecode;

/// Ré-exporte les helpers de validation.
pub use bytecode::helpers;
/// Ré-exporte le désassembleur textuel.
pub use bytecode::disasm;
/// Ré-exporte l'assembleur minimal.
pub use bytecode::asm;

pub use bytecode::codec::{decode, encode, encoded_len};
pub use bytecode::instr::Instruction;
pub use bytecode::unit::{CodeFlags, CodeUnit, ConstPool, ConstValue, LineTable};

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/* ─────────────────────────── Byte Writer (LE) ─────────────────────────── */

/// Buffer d’écriture (croît automatiquement).
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Crée un writer vide.
    pub fn new() -> Self { Self { buf: Vec::new() } }
    /// Crée un writer avec une capacité réservée.
    pub fn with_capacity(cap: usize) -> Self { Self { buf: Vec::with_capacity(cap) } }
    /// Accès en lecture au contenu.
    pub fn as_slice(&self) -> &[u8] { &self.buf }
    /// Récupère le buffer (consomme).
    pub fn into_vec(self) -> Vec<u8> { self.buf }
    /// Nombre d'octets écrits.
    pub fn len(&self) -> usize { self.buf.len() }
    /// Vrai si rien n'a été écrit.
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }
    /// Ajoute des octets bruts.
    pub fn write_bytes(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }
    /// Écrit un octet.
    pub fn write_u8(&mut self, v: u8) { self.buf.push(v); }
    /// Écrit un u16 little-endian.
    pub fn write_u16_le(&mut self, v: u16) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Écrit un u32 little-endian.
    pub fn write_u32_le(&mut self, v: u32) { self.buf.extend_from_slice(&v.to_le_bytes()); }
}

/* ─────────────────────────── Byte Reader (LE) ─────────────────────────── */

/// Lecteur séquentiel sur un slice d’octets (helpers LE).
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> ByteReader<'a> {
    /// Construit un lecteur.
    pub fn new(data: &'a [u8]) -> Self { Self { data, off: 0 } }
    /// Offset courant.
    pub fn offset(&self) -> usize { self.off }
    /// Taille restante.
    pub fn remaining(&self) -> usize { self.data.len().saturating_sub(self.off) }

    /// Lit `n` octets (ou erreur si EOF).
    pub fn read_bytes(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CoreError::UnexpectedEof { needed: n as u64, at: self.off as u64 });
        }
        let start = self.off;
        self.off += n;
        Ok(&self.data[start..self.off])
    }

    /// Lit un octet.
    pub fn read_u8(&mut self) -> CoreResult<u8> {
        let b = self.read_bytes(1)?;
        Ok(b[0])
    }

    /// Lit un u16 LE.
    pub fn read_u16_le(&mut self) -> CoreResult<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Lit un u32 LE.
    pub fn read_u32_le(&mut self) -> CoreResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreurs de bas niveau communes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Flux d'instructions tronqué (opérande ou continuation EXTENDED_ARG manquante).
    #[error("malformed encoding at byte {offset}: {reason}")]
    MalformedEncoding {
        /// Offset de l'entrée fautive.
        offset: usize,
        /// Description courte.
        reason: &'static str,
    },
    /// Opérande non représentable sur 32 bits.
    #[error("operand {value} does not fit in 32 bits")]
    OperandTooLarge {
        /// Valeur fautive.
        value: u64,
    },
    /// Instruction incohérente (opcode/opérande).
    #[error("invalid instruction (opcode {op}): {reason}")]
    InvalidInstruction {
        /// Opcode fautif.
        op: u8,
        /// Description courte.
        reason: &'static str,
    },
    /// Mnémonique inconnue (assembleur).
    #[error("unknown opcode mnemonic `{0}`")]
    UnknownOpcode(String),
    /// Fin de buffer inattendue.
    #[error("unexpected EOF: need {needed} bytes at {at}")]
    UnexpectedEof {
        /// Nombre d’octets manquants.
        needed: u64,
        /// Offset où l’erreur s’est produite.
        at: u64,
    },
    /// Données incohérentes (validation / assembleur).
    #[error("corrupted: {0}")]
    Corrupted(Cow<'static, str>),
}

impl CoreError {
    /// Construit une erreur « corrompu ».
    pub fn corrupted(msg: impl Into<Cow<'static, str>>) -> Self { CoreError::Corrupted(msg.into()) }
}

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        bytecode::opcode, decode, encode, encoded_len, ByteReader, ByteWriter, CodeFlags, CodeUnit,
        ConstPool, ConstValue, CoreError, CoreResult, Instruction, LineTable,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_reader_le() -> CoreResult<()> {
        let mut w = ByteWriter::new();
        w.write_u8(0x7C);
        w.write_u16_le(0xBEEF);
        w.write_u32_le(0xDEAD_BEEF);

        let mut r = ByteReader::new(w.as_slice());
        assert_eq!(r.read_u8()?, 0x7C);
        assert_eq!(r.read_u16_le()?, 0xBEEF);
        assert_eq!(r.read_u32_le()?, 0xDEAD_BEEF);
        assert_eq!(r.remaining(), 0);
        Ok(())
    }

    #[test]
    fn reader_reports_eof_offset() {
        let mut r = ByteReader::new(&[0x01, 0x02, 0x03]);
        assert!(r.read_u16_le().is_ok());
        assert_eq!(r.read_u16_le(), Err(CoreError::UnexpectedEof { needed: 2, at: 2 }));
    }
}
