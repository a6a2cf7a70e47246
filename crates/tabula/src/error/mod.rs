//! # Error Types
//!
//! Error types and conflict records for table construction and parsing.
//!
//! ## Overview
//!
//! Three families of faults exist, with different lifecycles:
//!
//! - **Grammar errors** ([`GrammarError`]): a malformed grammar description.
//!   These abort table construction.
//! - **Conflicts** ([`Conflict`]): the grammar is well-formed but not
//!   deterministic for the chosen algorithm. Construction succeeds and the
//!   records are surfaced through `conflicts()`; callers decide whether to
//!   reject the table.
//! - **Parse errors** ([`ParseError`]): faults while driving a table over a
//!   token stream. Syntax errors are offered to the error callback and may be
//!   recovered through the reserved `error` nonterminal; everything else is
//!   fatal.
//!
//! When the `diagnostics` feature is enabled, errors integrate with
//! [`miette`] for rich reporting.

use compact_str::CompactString;
use thiserror::Error;

use crate::backend::lr::{Action, StateId};
use crate::grammar::SymbolId;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors produced while building a [`Grammar`](crate::grammar::Grammar).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("grammar has no productions")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tabula::empty_grammar)))]
    EmptyGrammar,

    #[error("grammar does not declare a start symbol")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tabula::no_start)))]
    NoStart,

    /// A name is referenced but is neither a declared token nor defined by
    /// any rule.
    #[error("symbol `{0}` is neither a declared token nor defined by a rule")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tabula::undeclared_symbol)))]
    UndeclaredSymbol(String),

    /// A declared token also appears on the left-hand side of a rule, so it
    /// cannot be classified consistently.
    #[error("`{0}` is declared as a token but also defined by a rule")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tabula::token_defined_as_rule)))]
    TokenDefinedAsRule(String),
}

/// The kind of a recorded table conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConflictKind {
    /// A terminal both shifts and completes a production in one LR state.
    ShiftReduce,
    /// Two completed productions compete for the same lookahead.
    ReduceReduce,
    /// An LL(1) terminal selects two productions through their FIRST sets.
    FirstFirst,
    /// An LL(1) terminal selects one production through FIRST and another
    /// through the nullable/FOLLOW path.
    FirstFollow,
}

impl ConflictKind {
    const fn describe(self) -> &'static str {
        match self {
            Self::ShiftReduce => "shift/reduce",
            Self::ReduceReduce => "reduce/reduce",
            Self::FirstFirst => "first/first",
            Self::FirstFollow => "first/follow",
        }
    }
}

/// Where a conflict was detected: an LR state or an LL nonterminal row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConflictSite {
    State(StateId),
    Nonterminal(SymbolId),
}

/// A recorded conflict and how it was resolved.
///
/// Conflicts never fail construction; the builder applies its deterministic
/// resolution policy, keeps going, and appends one of these per collision.
/// For LL tables the `chosen`/`discarded` actions are the competing
/// predictions encoded as [`Action::Reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conflict {
    pub site: ConflictSite,
    /// The lookahead terminal the two actions competed on.
    pub lookahead: SymbolId,
    pub chosen: Action,
    pub discarded: Action,
    pub kind: ConflictKind,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.site {
            ConflictSite::State(s) => write!(
                f,
                "{} conflict in state {} on {:?} ({:?} kept, {:?} dropped)",
                self.kind.describe(),
                s.index(),
                self.lookahead,
                self.chosen,
                self.discarded,
            ),
            ConflictSite::Nonterminal(nt) => write!(
                f,
                "{} conflict in row {:?} on {:?} ({:?} kept, {:?} dropped)",
                self.kind.describe(),
                nt,
                self.lookahead,
                self.chosen,
                self.discarded,
            ),
        }
    }
}

/// A lexical fault propagated from the token source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("lexical error on line {line}: {message}")]
#[cfg_attr(feature = "diagnostics", diagnostic(code(tabula::lex)))]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl LexError {
    #[must_use]
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// A structured syntax error.
///
/// Built by the runtime when no action is defined for the current
/// state/lookahead pair, and handed to
/// [`Semantics::syntax_error`](crate::runtime::semantics::Semantics::syntax_error)
/// before any recovery is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyntaxError {
    /// Human-readable description, including the lexer's position display
    /// when the token source provides one.
    pub message: String,
    /// The offending terminal.
    pub token: SymbolId,
    /// The offending token's text.
    pub text: CompactString,
    pub line: u32,
    pub column: u32,
    /// Names of the terminals that had a defined action, sorted.
    pub expected: Vec<CompactString>,
    /// Whether an `error`-shifting state was on the stack when the fault was
    /// detected, i.e. whether panic-mode recovery can be attempted.
    pub recoverable: bool,
    /// Stable fingerprint of the diagnostic context (state, terminal,
    /// position), for caller-side deduplication of repeated reports.
    pub context_hash: u64,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// An error raised by a semantic-action callback. Propagated unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("semantic action failed: {message}")]
#[cfg_attr(feature = "diagnostics", diagnostic(code(tabula::semantic)))]
pub struct SemanticError {
    pub message: String,
}

impl SemanticError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors produced while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    /// A syntax error that could not be recovered from (or that the error
    /// callback chose not to recover).
    #[error("{0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tabula::syntax)))]
    Syntax(SyntaxError),

    #[error(transparent)]
    Lexer(#[from] LexError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    /// The caller's cancellation flag was raised.
    #[error("parse cancelled")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tabula::cancelled)))]
    Cancelled,
}

impl ParseError {
    /// The structured syntax error, if this is a syntax fault.
    #[must_use]
    pub const fn as_syntax(&self) -> Option<&SyntaxError> {
        match self {
            Self::Syntax(e) => Some(e),
            _ => None,
        }
    }
}
