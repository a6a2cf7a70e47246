//! The LL(1) predictive table.
//!
//! For every production `A -> α`, PREDICT(A -> α) is FIRST(α), plus
//! FOLLOW(A) when α is nullable. Each terminal in the PREDICT set selects
//! the production in row A. Collisions keep the earlier production and are
//! recorded as first/first or first/follow conflicts depending on how the
//! terminal entered the losing set.
//!
//! There is no compression pass here: an LL table has no states to prune
//! and no forced moves to default.

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::backend::ll::parser::run as parser_run;
use crate::backend::lr::table::Action;
use crate::backend::{Algorithm, RuleMeta, SymbolMeta};
use crate::error::{Conflict, ConflictKind, ConflictSite, ParseError};
use crate::grammar::{Grammar, GrammarSets, ProductionId, SymbolId};
use crate::runtime::ParseConfig;
use crate::runtime::lexer::TokenSource;

/// A compiled LL(1) table: `(nonterminal, terminal) -> production`.
///
/// Self-contained like [`LrTable`](crate::backend::lr::LrTable): symbol
/// names and production shapes travel with the table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LlTable {
    /// Rows sorted by nonterminal id, entries sorted by terminal id.
    pub(crate) rows: Vec<(SymbolId, Vec<(SymbolId, ProductionId)>)>,
    pub(crate) symbols: Vec<SymbolMeta>,
    pub(crate) rules: Vec<RuleMeta>,
    pub(crate) start: SymbolId,
    pub(crate) conflicts: Vec<Conflict>,
}

impl LlTable {
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        Algorithm::Ll1
    }

    #[must_use]
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// The production predicted for `(nonterminal, terminal)`.
    #[must_use]
    pub fn predict(&self, nonterminal: SymbolId, terminal: SymbolId) -> Option<ProductionId> {
        let at = self
            .rows
            .binary_search_by_key(&nonterminal, |&(symbol, _)| symbol)
            .ok()?;
        let row = &self.rows[at].1;
        row.binary_search_by_key(&terminal, |&(symbol, _)| symbol)
            .ok()
            .map(|at| row[at].1)
    }

    #[must_use]
    pub fn symbol_name(&self, id: SymbolId) -> &str {
        &self.symbols[id.index()].name
    }

    /// Look a symbol up by name, for wiring lexers to table ids.
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols
            .iter()
            .position(|meta| meta.name == name)
            .map(|at| SymbolId::new(at as u32))
    }

    pub(crate) fn is_terminal(&self, id: SymbolId) -> bool {
        self.symbols[id.index()].terminal
    }

    /// Names of the terminals that select a production in the given row,
    /// sorted by symbol id.
    #[must_use]
    pub fn expected_terminals(&self, nonterminal: SymbolId) -> Vec<CompactString> {
        self.rows
            .binary_search_by_key(&nonterminal, |&(symbol, _)| symbol)
            .ok()
            .map(|at| {
                self.rows[at]
                    .1
                    .iter()
                    .map(|&(terminal, _)| self.symbols[terminal.index()].name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Run the predictive driver over `lexer`. Recognition only: LL tables
    /// carry no semantic-value stack.
    ///
    /// # Errors
    ///
    /// [`ParseError::Syntax`] on the first mismatch, plus the pass-through
    /// lexer and cancellation variants.
    pub fn parse<L: TokenSource>(
        &self,
        lexer: &mut L,
        config: &ParseConfig,
    ) -> Result<(), ParseError> {
        parser_run(self, lexer, config)
    }
}

/// Build the PREDICT table.
#[tracing::instrument(skip_all)]
pub(crate) fn assemble(grammar: &Grammar, sets: &GrammarSets) -> LlTable {
    let mut cells: HashMap<(SymbolId, SymbolId), ProductionId, ahash::RandomState> =
        HashMap::default();
    // Whether an entry was placed through the nullable/FOLLOW path, for
    // conflict classification.
    let mut via_follow: HashMap<(SymbolId, SymbolId), bool, ahash::RandomState> =
        HashMap::default();
    let mut conflicts = Vec::new();

    for production in grammar.productions() {
        // The augmentation never drives a predictive parse.
        if production.id() == ProductionId::AUGMENTED {
            continue;
        }
        let lhs = production.lhs();
        let (first, nullable) = sets.first_of_string(production.rhs());
        let mut predict: Vec<(SymbolId, bool)> = first
            .into_iter()
            .map(|terminal| (terminal, false))
            .collect();
        if nullable {
            for terminal in sets.follow_sorted(lhs) {
                if !predict.iter().any(|&(t, _)| t == terminal) {
                    predict.push((terminal, true));
                }
            }
        }
        predict.sort_unstable_by_key(|&(terminal, _)| terminal);

        for (terminal, from_follow) in predict {
            let key = (lhs, terminal);
            match cells.get(&key) {
                None => {
                    cells.insert(key, production.id());
                    via_follow.insert(key, from_follow);
                }
                Some(&kept) => {
                    let earlier_via_follow = via_follow.get(&key).copied().unwrap_or(false);
                    let kind = if from_follow || earlier_via_follow {
                        ConflictKind::FirstFollow
                    } else {
                        ConflictKind::FirstFirst
                    };
                    conflicts.push(Conflict {
                        site: ConflictSite::Nonterminal(lhs),
                        lookahead: terminal,
                        chosen: Action::Reduce(kept),
                        discarded: Action::Reduce(production.id()),
                        kind,
                    });
                }
            }
        }
    }

    let mut rows: HashMap<SymbolId, Vec<(SymbolId, ProductionId)>, ahash::RandomState> =
        HashMap::default();
    for ((nonterminal, terminal), production) in cells {
        rows.entry(nonterminal)
            .or_default()
            .push((terminal, production));
    }
    let mut rows: Vec<(SymbolId, Vec<(SymbolId, ProductionId)>)> = rows.into_iter().collect();
    for (_, row) in &mut rows {
        row.sort_unstable_by_key(|&(terminal, _)| terminal);
    }
    rows.sort_unstable_by_key(|&(nonterminal, _)| nonterminal);

    tracing::debug!(
        rows = rows.len(),
        conflicts = conflicts.len(),
        "assembled predictive table"
    );

    LlTable {
        rows,
        symbols: crate::backend::symbol_metas(grammar),
        rules: crate::backend::rule_metas(grammar),
        start: grammar.start(),
        conflicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Table, build};

    fn ll(table: Table) -> LlTable {
        match table {
            Table::Ll(t) => t,
            Table::Lr(_) => unreachable!("LL algorithm requested"),
        }
    }

    #[test]
    fn predict_sets_for_matched_pairs() {
        // S -> a S b | ε
        let grammar = Grammar::builder()
            .start("S")
            .tokens(["a", "b"])
            .rule("S", ["a", "S", "b"])
            .rule("S", Vec::<String>::new())
            .build()
            .unwrap();
        let table = ll(build(&grammar, Algorithm::Ll1));
        assert!(table.conflicts().is_empty());

        let s = table.symbol("S").unwrap();
        let a = table.symbol("a").unwrap();
        let b = table.symbol("b").unwrap();
        let recursive = grammar.productions_of(grammar.start())[0];
        let epsilon = grammar.productions_of(grammar.start())[1];

        assert_eq!(table.predict(s, a), Some(recursive));
        assert_eq!(table.predict(s, b), Some(epsilon));
        assert_eq!(table.predict(s, SymbolId::EOF), Some(epsilon));
        assert_eq!(table.predict(s, SymbolId::ERROR), None);
    }

    #[test]
    fn first_first_conflict_keeps_earlier_production() {
        // Two identical alternatives: the smallest non-LL(1) grammar.
        let grammar = Grammar::builder()
            .start("S")
            .tokens(["a"])
            .rule("S", ["a"])
            .rule("S", ["a"])
            .build()
            .unwrap();
        let table = ll(build(&grammar, Algorithm::Ll1));
        assert_eq!(table.conflicts().len(), 1);
        let conflict = table.conflicts()[0];
        assert_eq!(conflict.kind, ConflictKind::FirstFirst);
        let s = table.symbol("S").unwrap();
        let a = table.symbol("a").unwrap();
        let first_rule = grammar.productions_of(grammar.start())[0];
        assert_eq!(table.predict(s, a), Some(first_rule));
    }

    #[test]
    fn first_follow_conflict_is_classified() {
        // S -> A a ; A -> a | ε : `a` predicts both A alternatives.
        let grammar = Grammar::builder()
            .start("S")
            .tokens(["a"])
            .rule("S", ["A", "a"])
            .rule("A", ["a"])
            .rule("A", Vec::<String>::new())
            .build()
            .unwrap();
        let table = ll(build(&grammar, Algorithm::Ll1));
        assert_eq!(table.conflicts().len(), 1);
        assert_eq!(table.conflicts()[0].kind, ConflictKind::FirstFollow);
    }
}
