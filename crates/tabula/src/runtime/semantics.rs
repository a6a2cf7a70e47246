//! The semantic-action seam.
//!
//! A [`Semantics`] implementation supplies the value pushed for every
//! shifted token and the value produced by every reduction, and gets first
//! say over syntax errors before recovery starts. `Shared` is an opaque
//! caller-owned value threaded through every callback; the parser never
//! looks at it.

use crate::error::{SemanticError, SyntaxError};
use crate::grammar::{ProductionId, SymbolId};
use crate::runtime::lexer::{Location, Scanned};

/// What a reduction produced.
pub enum Reduced<V> {
    /// The value for the recognized left-hand side; parsing continues.
    Value(V),
    /// Finish immediately with this value, abandoning the rest of the
    /// input. The early-accept escape hatch.
    Finished(V),
}

/// The error callback's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Attempt panic-mode recovery through the `error` terminal.
    Recover,
    /// Abort the parse with the reported error.
    Fail,
}

/// Everything a reduction callback may look at: the production being
/// reduced and the values/locations of its right-hand side, oldest first.
pub struct ReduceContext<'a, V> {
    pub production: ProductionId,
    pub lhs: SymbolId,
    /// The top `|rhs|` semantic values, about to be popped.
    pub values: &'a [V],
    /// The matching locations.
    pub locations: &'a [Location],
    /// The combined location of the whole right-hand side.
    pub span: Location,
}

/// Semantic actions for an LR parse.
///
/// Reductions fire in left-to-right, bottom-up order: the action for a
/// production runs exactly when it is reduced, after the actions of
/// everything it derives.
pub trait Semantics {
    type Value;
    /// Opaque state threaded through every callback.
    type Shared;

    /// The value pushed when `token` is shifted. Also called for the
    /// synthesized `error` token when recovery shifts one.
    fn token_value(&mut self, token: &Scanned, shared: &mut Self::Shared) -> Self::Value;

    /// The value for a reduction.
    ///
    /// # Errors
    ///
    /// A [`SemanticError`] aborts the parse and is propagated unchanged.
    fn reduce(
        &mut self,
        ctx: &ReduceContext<'_, Self::Value>,
        shared: &mut Self::Shared,
    ) -> Result<Reduced<Self::Value>, SemanticError>;

    /// Called once per syntax error before any recovery. The default
    /// accepts recovery whenever the table allows it.
    fn syntax_error(&mut self, error: &SyntaxError, shared: &mut Self::Shared) -> ErrorDisposition {
        let _ = (error, shared);
        ErrorDisposition::Recover
    }
}

/// Value-free semantics: recognize the input and build nothing.
pub struct Recognize;

impl Semantics for Recognize {
    type Value = ();
    type Shared = ();

    fn token_value(&mut self, _token: &Scanned, _shared: &mut ()) {}

    fn reduce(
        &mut self,
        _ctx: &ReduceContext<'_, ()>,
        _shared: &mut (),
    ) -> Result<Reduced<()>, SemanticError> {
        Ok(Reduced::Value(()))
    }
}
