//! # Table Builders
//!
//! The single entry point for table construction: [`build`] takes a grammar
//! and an [`Algorithm`] and returns a finished [`Table`]. Algorithm choice
//! is a tagged variant dispatched once at the top of the pipeline; the
//! shared stages (set solving, closure, state collection) are plain
//! functions selected by branching on the variant, so no dynamic dispatch
//! sits in the per-item hot path.

pub mod ll;
pub mod lr;

use compact_str::CompactString;
use smallvec::SmallVec;
use std::fmt;

use crate::backend::lr::item::Flavor;
use crate::backend::lr::{LrTable, automaton, optimizer};
use crate::backend::ll::LlTable;
use crate::error::Conflict;
use crate::grammar::{Grammar, GrammarSets, SymbolId};

/// The table-construction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// LR(0): completed items reduce on every terminal.
    Lr0,
    /// SLR(1): completed items reduce on FOLLOW of their left-hand side.
    Slr1,
    /// LALR(1): canonical LR(1) states merged by LR(0) core.
    Lalr1,
    /// Canonical LR(1).
    Lr1,
    /// LL(1) predictive table.
    Ll1,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lr0 => "LR(0)",
            Self::Slr1 => "SLR(1)",
            Self::Lalr1 => "LALR(1)",
            Self::Lr1 => "LR(1)",
            Self::Ll1 => "LL(1)",
        })
    }
}

/// Knobs for the compression passes that run after LR assembly.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Collapse rows whose only action is a single reduction into a default
    /// action the runtime takes without reading a lookahead.
    pub default_reductions: bool,
    /// Drop states that became unreachable through conflict resolution and
    /// renumber the table densely.
    pub prune_unreachable: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            default_reductions: true,
            prune_unreachable: true,
        }
    }
}

/// Symbol metadata copied into finished tables so they are self-contained
/// (and serializable) without the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) struct SymbolMeta {
    pub name: CompactString,
    pub terminal: bool,
}

/// Production metadata the runtime needs: left-hand side and right-hand
/// side (the LL driver expands it; the LR runtime only pops its length).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) struct RuleMeta {
    pub lhs: SymbolId,
    pub rhs: SmallVec<[SymbolId; 4]>,
}

pub(crate) fn symbol_metas(grammar: &Grammar) -> Vec<SymbolMeta> {
    grammar
        .symbols()
        .map(|id| SymbolMeta {
            name: CompactString::from(grammar.symbol_name(id)),
            terminal: grammar.is_terminal(id),
        })
        .collect()
}

pub(crate) fn rule_metas(grammar: &Grammar) -> Vec<RuleMeta> {
    grammar
        .productions()
        .iter()
        .map(|production| RuleMeta {
            lhs: production.lhs(),
            rhs: SmallVec::from_slice(production.rhs()),
        })
        .collect()
}

/// A finished parse table.
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    Lr(LrTable),
    Ll(LlTable),
}

impl Table {
    /// The conflicts recorded during construction. An empty slice means the
    /// table is deterministic for its algorithm.
    #[must_use]
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            Self::Lr(table) => table.conflicts(),
            Self::Ll(table) => table.conflicts(),
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Lr(table) => table.algorithm(),
            Self::Ll(_) => Algorithm::Ll1,
        }
    }

    #[must_use]
    pub const fn as_lr(&self) -> Option<&LrTable> {
        match self {
            Self::Lr(table) => Some(table),
            Self::Ll(_) => None,
        }
    }

    #[must_use]
    pub const fn as_ll(&self) -> Option<&LlTable> {
        match self {
            Self::Ll(table) => Some(table),
            Self::Lr(_) => None,
        }
    }
}

/// Build a parse table with the default [`BuildConfig`].
#[must_use]
pub fn build(grammar: &Grammar, algorithm: Algorithm) -> Table {
    build_with(grammar, algorithm, &BuildConfig::default())
}

/// Build a parse table.
///
/// Construction never fails: a well-formed grammar always yields a table,
/// and nondeterminism is resolved by the fixed policy and surfaced through
/// [`Table::conflicts`].
#[tracing::instrument(skip(grammar, config))]
#[must_use]
pub fn build_with(grammar: &Grammar, algorithm: Algorithm, config: &BuildConfig) -> Table {
    let sets = GrammarSets::compute(grammar);

    if algorithm == Algorithm::Ll1 {
        return Table::Ll(ll::table::assemble(grammar, &sets));
    }

    let collection = match algorithm {
        Algorithm::Lr0 | Algorithm::Slr1 => {
            automaton::canonical_collection(grammar, &sets, Flavor::Lr0)
        }
        Algorithm::Lalr1 => automaton::merge_lalr(automaton::canonical_collection(
            grammar,
            &sets,
            Flavor::Lr1,
        )),
        _ => automaton::canonical_collection(grammar, &sets, Flavor::Lr1),
    };

    let mut table = lr::table::assemble(grammar, &sets, &collection, algorithm);
    if config.prune_unreachable {
        optimizer::prune_unreachable(&mut table);
    }
    if config.default_reductions {
        optimizer::compress_defaults(&mut table);
    }
    Table::Lr(table)
}
