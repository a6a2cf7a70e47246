//! # Grammar Module
//!
//! The canonical in-memory grammar: symbol table, productions, operator
//! precedence, start-rule augmentation.
//!
//! ## Overview
//!
//! A [`Grammar`] is built once through [`GrammarBuilder`] and immutable
//! afterwards. Symbols are interned to dense integer ids; three ids are
//! reserved:
//!
//! | id | name | kind |
//! |---|---|---|
//! | 0 | `$accept` | nonterminal (augmented start) |
//! | 1 | `$end` | terminal (end of input) |
//! | 2 | `error` | terminal (recovery placeholder) |
//!
//! Production 0 is always the synthetic `$accept → start`; the runtime
//! accepts exactly when that production is reduced with `$end` as lookahead.
//!
//! ## Usage
//!
//! ```rust
//! use tabula::grammar::Grammar;
//!
//! let grammar = Grammar::builder()
//!     .start("list")
//!     .tokens(["item", ","])
//!     .rule("list", ["item"])
//!     .rule("list", ["list", ",", "item"])
//!     .build()?;
//!
//! assert_eq!(grammar.productions().len(), 3); // two rules + augmentation
//! # Ok::<(), tabula::error::GrammarError>(())
//! ```

pub mod analysis;
pub mod builder;

pub use analysis::GrammarSets;
pub use builder::GrammarBuilder;

use hashbrown::HashMap;
use lasso::{Rodeo, Spur};
use smallvec::SmallVec;
use std::fmt;

/// A symbol identifier. Stable, dense, assigned at grammar build.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    /// The augmented start symbol `$accept`.
    pub const ACCEPT: Self = Self(0);
    /// The end-of-input terminal `$end`.
    pub const EOF: Self = Self(1);
    /// The `error` recovery terminal.
    pub const ERROR: Self = Self(2);

    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ACCEPT => f.write_str("$accept"),
            Self::EOF => f.write_str("$end"),
            Self::ERROR => f.write_str("error"),
            Self(raw) => write!(f, "sym#{raw}"),
        }
    }
}

/// A production identifier: the production's index in declaration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct ProductionId(u32);

impl ProductionId {
    /// The synthetic `$accept → start` production.
    pub const AUGMENTED: Self = Self(0);

    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ProductionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

/// Whether a symbol is consumed from the token stream or derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
}

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Assoc {
    Left,
    Right,
    NonAssoc,
}

/// A precedence level with its associativity. Levels start at 1 and grow
/// with each operator declaration, so later declarations bind tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Precedence {
    pub level: u32,
    pub assoc: Assoc,
}

pub(crate) struct SymbolEntry {
    pub(crate) name: Spur,
    pub(crate) kind: SymbolKind,
}

/// A single production `lhs → rhs`. An empty `rhs` denotes ε.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    id: ProductionId,
    lhs: SymbolId,
    rhs: SmallVec<[SymbolId; 4]>,
    precedence: Option<Precedence>,
}

impl Production {
    pub(crate) fn new(
        id: ProductionId,
        lhs: SymbolId,
        rhs: SmallVec<[SymbolId; 4]>,
        precedence: Option<Precedence>,
    ) -> Self {
        Self {
            id,
            lhs,
            rhs,
            precedence,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ProductionId {
        self.id
    }

    #[must_use]
    pub const fn lhs(&self) -> SymbolId {
        self.lhs
    }

    #[must_use]
    pub fn rhs(&self) -> &[SymbolId] {
        &self.rhs
    }

    /// Length of the right-hand side; 0 for ε-productions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    /// The production's effective precedence, if any.
    #[must_use]
    pub const fn precedence(&self) -> Option<Precedence> {
        self.precedence
    }
}

/// An immutable context-free grammar with interned symbols.
///
/// Invariants established at build time: every symbol referenced by any
/// right-hand side exists; every left-hand side is a nonterminal;
/// production 0 is the augmentation `$accept → start`.
pub struct Grammar {
    interner: Rodeo,
    symbols: Vec<SymbolEntry>,
    ids: HashMap<Spur, SymbolId, ahash::RandomState>,
    productions: Vec<Production>,
    /// Production ids grouped by LHS, indexed by symbol id. Empty for
    /// terminals. Ids appear in declaration order.
    by_lhs: Vec<SmallVec<[ProductionId; 4]>>,
    start: SymbolId,
    operators: HashMap<SymbolId, Precedence, ahash::RandomState>,
}

impl Grammar {
    /// Start describing a grammar.
    #[must_use]
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    pub(crate) fn from_parts(
        interner: Rodeo,
        symbols: Vec<SymbolEntry>,
        ids: HashMap<Spur, SymbolId, ahash::RandomState>,
        productions: Vec<Production>,
        start: SymbolId,
        operators: HashMap<SymbolId, Precedence, ahash::RandomState>,
    ) -> Self {
        let mut by_lhs: Vec<SmallVec<[ProductionId; 4]>> = vec![SmallVec::new(); symbols.len()];
        for production in &productions {
            by_lhs[production.lhs.index()].push(production.id);
        }
        Self {
            interner,
            symbols,
            ids,
            productions,
            by_lhs,
            start,
            operators,
        }
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// The printable name of a symbol.
    #[must_use]
    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.interner.resolve(&self.symbols[id.index()].name)
    }

    /// Look a symbol up by name.
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        let spur = self.interner.get(name)?;
        self.ids.get(&spur).copied()
    }

    #[must_use]
    pub fn kind(&self, id: SymbolId) -> SymbolKind {
        self.symbols[id.index()].kind
    }

    #[must_use]
    pub fn is_terminal(&self, id: SymbolId) -> bool {
        self.kind(id) == SymbolKind::Terminal
    }

    #[must_use]
    pub fn is_nonterminal(&self, id: SymbolId) -> bool {
        self.kind(id) == SymbolKind::Nonterminal
    }

    /// All symbol ids, in id order.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.symbols.len() as u32).map(SymbolId::new)
    }

    /// All terminal ids, in id order. Includes `$end` and `error`.
    pub fn terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols().filter(|&s| self.is_terminal(s))
    }

    /// All nonterminal ids, in id order. Includes `$accept`.
    pub fn nonterminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols().filter(|&s| self.is_nonterminal(s))
    }

    #[must_use]
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    #[must_use]
    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id.index()]
    }

    /// The productions with the given nonterminal on the left, in
    /// declaration order.
    #[must_use]
    pub fn productions_of(&self, lhs: SymbolId) -> &[ProductionId] {
        &self.by_lhs[lhs.index()]
    }

    /// The user-declared start symbol (not `$accept`).
    #[must_use]
    pub const fn start(&self) -> SymbolId {
        self.start
    }

    /// The declared precedence of a terminal, if any.
    #[must_use]
    pub fn terminal_precedence(&self, terminal: SymbolId) -> Option<Precedence> {
        self.operators.get(&terminal).copied()
    }

    /// Render a production as `lhs -> a b c` for diagnostics.
    #[must_use]
    pub fn display_production(&self, id: ProductionId) -> String {
        let production = self.production(id);
        let mut out = String::from(self.symbol_name(production.lhs()));
        out.push_str(" ->");
        if production.is_empty() {
            out.push_str(" %empty");
        } else {
            for &sym in production.rhs() {
                out.push(' ');
                out.push_str(self.symbol_name(sym));
            }
        }
        out
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("symbols", &self.symbols.len())
            .field("productions", &self.productions.len())
            .field("start", &self.symbol_name(self.start))
            .finish_non_exhaustive()
    }
}
