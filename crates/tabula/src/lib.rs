//! # Tabula
//!
//! Parse-table construction and a table-driven runtime for context-free
//! grammars.
//!
//! ## Overview
//!
//! Tabula takes a structured grammar description and compiles it into the
//! tables that drive a deterministic parser:
//!
//! - **Five algorithms**: LR(0), SLR(1), LALR(1) (canonical LR(1) merged by
//!   core), canonical LR(1), and LL(1), selected by a single
//!   [`Algorithm`] variant passed to [`build`].
//! - **Deterministic conflict resolution**: precedence and associativity
//!   first, the classic prefer-shift / prefer-earlier-rule policy as a
//!   recorded fallback. Construction never fails on an ambiguous grammar;
//!   inspect [`Table::conflicts`] and decide.
//! - **Compression**: sole-reduction rows become default actions the
//!   runtime takes without lexing, and states stranded by conflict
//!   resolution are pruned.
//! - **A shift-reduce runtime** over a pluggable [`TokenSource`], with
//!   semantic actions behind the [`Semantics`] trait and panic-mode
//!   recovery through the reserved `error` terminal.
//!
//! Lexing itself, grammar-file syntax and code generation are deliberately
//! out of scope; the traits above are the seams they plug into.
//!
//! ## Quick Start
//!
//! ```rust
//! use tabula::{
//!     Algorithm, Grammar, IterTokens, Location, ParseConfig, Recognize, Scanned, build,
//! };
//!
//! // S -> a B ; B -> b | c
//! let grammar = Grammar::builder()
//!     .start("S")
//!     .tokens(["a", "b", "c"])
//!     .rule("S", ["a", "B"])
//!     .rule("B", ["b"])
//!     .rule("B", ["c"])
//!     .build()?;
//!
//! let table = build(&grammar, Algorithm::Lalr1);
//! assert!(table.conflicts().is_empty());
//! let table = table.as_lr().expect("LALR is an LR table");
//!
//! // Feed it the pre-tokenized input `a b`.
//! let a = grammar.symbol("a").unwrap();
//! let b = grammar.symbol("b").unwrap();
//! let mut lexer = IterTokens::new(vec![
//!     Scanned::new(a, "a", Location::point(1, 0)),
//!     Scanned::new(b, "b", Location::point(1, 1)),
//! ]);
//! table.parse(&mut lexer, &mut Recognize, &mut (), &ParseConfig::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Concurrency
//!
//! A built [`Table`] is immutable and may be shared across threads by
//! reference. Every `parse` call owns its stacks and its lexer, so
//! concurrent parses against one table are safe; whatever shared state the
//! semantic actions mutate is the caller's concern.

pub mod backend;
pub mod error;
pub mod grammar;
pub mod runtime;

pub use backend::ll::LlTable;
pub use backend::lr::{Action, LrTable, StateId};
pub use backend::{Algorithm, BuildConfig, Table, build, build_with};
pub use error::{
    Conflict, ConflictKind, ConflictSite, GrammarError, LexError, ParseError, SemanticError,
    SyntaxError,
};
pub use grammar::{
    Assoc, Grammar, GrammarBuilder, GrammarSets, Precedence, Production, ProductionId, SymbolId,
    SymbolKind,
};
pub use runtime::{
    ErrorDisposition, IterTokens, Location, ParseConfig, Recognize, ReduceContext, Reduced,
    Scanned, Semantics, TokenSource,
};
