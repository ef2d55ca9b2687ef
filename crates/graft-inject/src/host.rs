//! Seam towards the host runtime's function objects.
//!
//! The host owns the callable wrapper (closure cells, globals, existing
//! defaults). This crate only needs to read the wrapped unit and to ask the
//! host for a new callable around a rewritten one.

use indexmap::IndexMap;
use graft_core::CodeUnit;

use crate::{rewrite::append_locals_with, InjectOptions, InjectResult};

/// A host callable wrapping a [`CodeUnit`].
pub trait HostFunction: Sized {
    /// Host value type used for default arguments.
    type Value;

    /// The wrapped unit.
    fn code(&self) -> &CodeUnit;

    /// Build a new callable around `code`.
    ///
    /// `injected_defaults` belong to the last `injected_defaults.len()`
    /// positional parameters of `code`, which are exactly the injected ones.
    /// A host that already carries defaults for earlier parameters keeps them
    /// in front.
    fn rebind(&self, code: CodeUnit, injected_defaults: Vec<Self::Value>) -> Self;
}

/// Return a copy of `func` whose unit gains `locals` as defaulted parameters.
///
/// Key order is injection order; calling the result with the original
/// argument count makes every injected name resolve to its default.
pub fn add_locals<F: HostFunction>(func: &F, locals: IndexMap<String, F::Value>) -> InjectResult<F> {
    add_locals_with(func, locals, &InjectOptions::default())
}

/// [`add_locals`] with explicit options.
pub fn add_locals_with<F: HostFunction>(
    func: &F,
    locals: IndexMap<String, F::Value>,
    options: &InjectOptions,
) -> InjectResult<F> {
    let (names, values): (Vec<String>, Vec<F::Value>) = locals.into_iter().unzip();
    let code = append_locals_with(func.code(), &names, options)?;
    Ok(func.rebind(code, values))
}
