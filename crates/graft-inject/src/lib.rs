//! graft-inject — injection de liaisons locales dans une unité compilée
//!
//! Pipeline (un seul passage, sans retour arrière) :
//! - décodage du flux d'instructions (`graft_core::decode`)
//! - classification des noms externes + renumérotation des tables ([`renumber`])
//! - patch des opérandes, `LOAD_GLOBAL` → `LOAD_FAST` pour les noms injectés ([`rewrite`])
//! - ré-encodage + nouveau descripteur (`argcount`/`nlocals` augmentés)
//!
//! Le descripteur d'entrée n'est jamais muté.
//!
//! ```
//! use graft_core::asm::assemble;
//! use graft_inject::append_locals;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let unit = assemble("f", ".arg a\nLOAD_GLOBAL helper\nLOAD_GLOBAL x\nLOAD_FAST a\nRETURN_VALUE")?;
//! let out = append_locals(&unit, &["x"])?;
//! assert_eq!(out.argcount, 2);
//! assert_eq!(out.varnames, ["a", "x"]);
//! assert_eq!(out.names, ["helper"]);
//! # Ok(())
//! # }
//! ```
//!
//! Features :
//! - `std` (par défaut)
//! - `serde` (par défaut) : (dé)sérialisation de [`InjectOptions`]
//! - `tracing` (par défaut) : span par réécriture + événements de renumérotation

#![deny(missing_docs)]

use graft_core::CoreError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod host;
pub mod renumber;
pub mod rewrite;

pub use host::{add_locals, add_locals_with, HostFunction};
pub use renumber::Renumbering;
pub use rewrite::{append_locals, append_locals_with};

/* ─────────────────────────── Options ─────────────────────────── */

/// Options de réécriture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct InjectOptions {
    /// Valider le descripteur produit (opérandes dans les tables, compteurs cohérents).
    pub validate_output: bool,
    /// Refuser un code dont la taille change (cibles de saut et `lnotab` sont recopiées telles quelles).
    pub preserve_layout: bool,
}

impl Default for InjectOptions {
    fn default() -> Self { Self { validate_output: true, preserve_layout: true } }
}

impl InjectOptions {
    /// Active/désactive la validation de sortie.
    #[must_use]
    pub fn with_validate_output(mut self, on: bool) -> Self {
        self.validate_output = on;
        self
    }

    /// Active/désactive le contrôle de taille du code.
    #[must_use]
    pub fn with_preserve_layout(mut self, on: bool) -> Self {
        self.preserve_layout = on;
        self
    }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreurs de réécriture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    /// Erreur du codec ou de validation (`MalformedEncoding`, `OperandTooLarge`, …).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Un opérande de nom externe n'a pas d'entrée dans la nouvelle table.
    #[error("external name #{index} was lost in translation")]
    NameLost {
        /// Ancien index dans la table des noms externes.
        index: usize,
    },

    /// Index de variable locale hors de la table déclarée.
    #[error("local index {index} is out of range ({len} locals declared)")]
    IndexOutOfRange {
        /// Index fautif.
        index: usize,
        /// Taille de la table des locales d'entrée.
        len: usize,
    },

    /// Nom injecté déjà présent parmi les locales, ou répété.
    #[error("injected name `{0}` collides with an existing local")]
    DuplicateName(String),

    /// Le ré-encodage a changé la taille du code.
    #[error("patched code is {after} bytes but the original was {before}")]
    CodeLayoutChanged {
        /// Taille d'origine.
        before: usize,
        /// Taille après patch.
        after: usize,
    },
}

impl InjectError {
    /// Vrai pour un flux d'instructions tronqué.
    pub fn is_malformed(&self) -> bool { matches!(self, InjectError::Core(CoreError::MalformedEncoding { .. })) }

    /// Vrai pour un opérande non représentable.
    pub fn is_operand_too_large(&self) -> bool {
        matches!(self, InjectError::Core(CoreError::OperandTooLarge { .. }))
    }
}

/// Résultat de réécriture.
pub type InjectResult<T> = core::result::Result<T, InjectError>;
