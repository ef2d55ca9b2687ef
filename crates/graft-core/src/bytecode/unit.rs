//! Compiled-unit descriptor: code bytes, symbol tables, constants and the
//! metadata a host runtime needs to wrap the unit into a callable.

use core::{
    hash::{Hash, Hasher},
    mem,
    ops::Range,
    slice,
};

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{codec, instr::Instruction};
use crate::CoreResult;

bitflags! {
    /// `co_flags`-style bits carried through rewrites untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct CodeFlags: u32 {
        /// Locals live in fast slots.
        const OPTIMIZED   = 0x0001;
        /// A fresh locals namespace is created per call.
        const NEWLOCALS   = 0x0002;
        /// Takes `*args`.
        const VARARGS     = 0x0004;
        /// Takes `**kwargs`.
        const VARKEYWORDS = 0x0008;
        /// Nested function.
        const NESTED      = 0x0010;
        /// Generator function.
        const GENERATOR   = 0x0020;
        /// No free or cell variables.
        const NOFREE      = 0x0040;
    }
}

/// Values that can live in the constant pool.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstValue {
    /// `None` literal.
    None,
    /// Boolean literal.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// UTF-8 string constant.
    Str(String),
    /// Raw byte blob.
    Bytes(Vec<u8>),
    /// Tuple of constants.
    Tuple(Vec<ConstValue>),
}

impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstValue::None, ConstValue::None) => true,
            (ConstValue::Bool(a), ConstValue::Bool(b)) => a == b,
            (ConstValue::Int(a), ConstValue::Int(b)) => a == b,
            (ConstValue::Float(a), ConstValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ConstValue::Str(a), ConstValue::Str(b)) => a == b,
            (ConstValue::Bytes(a), ConstValue::Bytes(b)) => a == b,
            (ConstValue::Tuple(a), ConstValue::Tuple(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl Hash for ConstValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            ConstValue::None => {}
            ConstValue::Bool(b) => b.hash(state),
            ConstValue::Int(v) => v.hash(state),
            ConstValue::Float(v) => v.to_bits().hash(state),
            ConstValue::Str(s) => s.hash(state),
            ConstValue::Bytes(bytes) => bytes.hash(state),
            ConstValue::Tuple(items) => items.hash(state),
        }
    }
}

/// Constant pool with stable indices (0-based).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstPool {
    values: Vec<ConstValue>,
}

impl ConstPool {
    /// Create an empty pool.
    pub fn new() -> Self { Self { values: Vec::new() } }

    /// Number of stored constants.
    pub fn len(&self) -> usize { self.values.len() }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Iterate as `(index, &ConstValue)`.
    pub fn iter(&self) -> ConstIter<'_> { ConstIter { inner: self.values.iter().enumerate() } }

    /// Pushes a value and returns its index.
    pub fn add(&mut self, value: ConstValue) -> u32 {
        let idx = self.values.len() as u32;
        self.values.push(value);
        idx
    }

    /// Lookup a constant by index.
    pub fn get(&self, idx: u32) -> Option<&ConstValue> { self.values.get(idx as usize) }
}

impl FromIterator<ConstValue> for ConstPool {
    fn from_iter<I: IntoIterator<Item = ConstValue>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

/// Iterator returned by [`ConstPool::iter`].
pub struct ConstIter<'a> {
    inner: core::iter::Enumerate<slice::Iter<'a, ConstValue>>,
}

impl<'a> Iterator for ConstIter<'a> {
    type Item = (u32, &'a ConstValue);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(idx, value)| (idx as u32, value))
    }
}

impl<'a> IntoIterator for &'a ConstPool {
    type Item = (u32, &'a ConstValue);
    type IntoIter = ConstIter<'a>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

/// Line starts expanded from a packed `lnotab`.
///
/// `lnotab` is a sequence of `(byte increment, line increment)` byte pairs
/// starting from offset 0 and `firstlineno`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTable {
    first_line: u32,
    starts: Vec<(u32, u32)>,
}

impl LineTable {
    /// Expand `lnotab` into `(offset, line)` starts.
    pub fn from_lnotab(first_line: u32, lnotab: &[u8]) -> Self {
        let mut starts = Vec::new();
        let mut last_line = None;
        let mut addr = 0u32;
        let mut line = first_line;
        for pair in lnotab.chunks_exact(2) {
            let (byte_incr, line_incr) = (pair[0], pair[1]);
            if byte_incr != 0 {
                if last_line != Some(line) {
                    starts.push((addr, line));
                    last_line = Some(line);
                }
                addr += u32::from(byte_incr);
            }
            line += u32::from(line_incr);
        }
        if last_line != Some(line) {
            starts.push((addr, line));
        }
        Self { first_line, starts }
    }

    /// `(offset, line)` pairs where a new source line begins.
    pub fn starts(&self) -> &[(u32, u32)] { &self.starts }

    /// Resolve the source line of the instruction at byte `offset`.
    pub fn line_for_offset(&self, offset: u32) -> u32 {
        self.starts
            .iter()
            .take_while(|(start, _)| *start <= offset)
            .last()
            .map_or(self.first_line, |(_, line)| *line)
    }

    /// Iterate `[start, end) → line` ranges; the last range ends at `code_len`.
    pub fn iter_ranges(&self, code_len: u32) -> LineRangeIter<'_> {
        LineRangeIter { starts: &self.starts, index: 0, end: code_len }
    }
}

/// Iterator yielding contiguous line ranges `(start..end, line)`.
pub struct LineRangeIter<'a> {
    starts: &'a [(u32, u32)],
    index: usize,
    end: u32,
}

impl<'a> Iterator for LineRangeIter<'a> {
    type Item = (Range<u32>, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let (start, line) = *self.starts.get(self.index)?;
        self.index += 1;
        let end = self.starts.get(self.index).map_or(self.end, |(next, _)| *next);
        Some((start..end.max(start), line))
    }
}

/// Compiled unit ready for execution by a host runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodeUnit {
    /// Number of leading `varnames` entries that are positional arguments.
    pub argcount: u32,
    /// Number of local slots (`varnames.len()`).
    pub nlocals: u32,
    /// Evaluation stack size hint.
    pub stacksize: u32,
    /// Unit flags.
    pub flags: CodeFlags,
    /// Encoded instruction stream.
    pub code: Vec<u8>,
    /// Constant pool.
    pub consts: ConstPool,
    /// External-name table.
    pub names: Vec<String>,
    /// Local-variable table: arguments first, then declared locals.
    pub varnames: Vec<String>,
    /// Source file name.
    pub filename: String,
    /// Unit (function) name.
    pub name: String,
    /// Line of the unit's first source line.
    pub firstlineno: u32,
    /// Packed line-number table.
    pub lnotab: Vec<u8>,
}

impl CodeUnit {
    /// Decode the instruction stream.
    pub fn instructions(&self) -> CoreResult<Vec<Instruction>> { codec::decode(&self.code) }

    /// Argument prefix of the local-variable table.
    pub fn arguments(&self) -> &[String] {
        let n = (self.argcount as usize).min(self.varnames.len());
        &self.varnames[..n]
    }

    /// Expanded line table.
    pub fn line_table(&self) -> LineTable { LineTable::from_lnotab(self.firstlineno, &self.lnotab) }
}
