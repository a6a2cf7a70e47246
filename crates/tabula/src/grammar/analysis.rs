//! Nullability, FIRST and FOLLOW analysis.
//!
//! All three relations are computed by monotone fixed-point iteration: a
//! pass either grows at least one set or the loop terminates. FIRST sets
//! contain terminals only; ε is the nullable bit, never a sentinel symbol.

use hashbrown::HashSet;

use crate::grammar::{Grammar, SymbolId};

/// A set of terminal ids.
pub type TermSet = HashSet<SymbolId, ahash::RandomState>;

/// The solved nullable/FIRST/FOLLOW relations for one grammar.
pub struct GrammarSets {
    nullable: Vec<bool>,
    first: Vec<TermSet>,
    follow: Vec<TermSet>,
}

impl GrammarSets {
    /// Solve the three relations for `grammar`.
    #[tracing::instrument(skip_all)]
    #[must_use]
    pub fn compute(grammar: &Grammar) -> Self {
        let n = grammar.symbol_count();
        let mut sets = Self {
            nullable: vec![false; n],
            first: (0..n).map(|_| TermSet::default()).collect(),
            follow: (0..n).map(|_| TermSet::default()).collect(),
        };
        sets.solve_nullable(grammar);
        sets.solve_first(grammar);
        sets.solve_follow(grammar);
        sets
    }

    /// Whether the symbol derives ε. Always false for terminals.
    #[must_use]
    pub fn nullable(&self, symbol: SymbolId) -> bool {
        self.nullable[symbol.index()]
    }

    /// The terminals that can begin a string derived from `symbol`.
    #[must_use]
    pub fn first(&self, symbol: SymbolId) -> &TermSet {
        &self.first[symbol.index()]
    }

    /// The terminals that can immediately follow `symbol` in a sentential
    /// form derived from the augmented start.
    #[must_use]
    pub fn follow(&self, symbol: SymbolId) -> &TermSet {
        &self.follow[symbol.index()]
    }

    /// FOLLOW as a sorted list, for deterministic iteration.
    #[must_use]
    pub fn follow_sorted(&self, symbol: SymbolId) -> Vec<SymbolId> {
        let mut out: Vec<SymbolId> = self.follow[symbol.index()].iter().copied().collect();
        out.sort_unstable();
        out
    }

    /// FIRST of a symbol string, plus whether the whole string is nullable.
    #[must_use]
    pub fn first_of_string(&self, symbols: &[SymbolId]) -> (TermSet, bool) {
        let mut first = TermSet::default();
        for &symbol in symbols {
            first.extend(self.first[symbol.index()].iter().copied());
            if !self.nullable[symbol.index()] {
                return (first, false);
            }
        }
        (first, true)
    }

    #[must_use]
    pub fn nullable_string(&self, symbols: &[SymbolId]) -> bool {
        symbols.iter().all(|&s| self.nullable[s.index()])
    }

    fn solve_nullable(&mut self, grammar: &Grammar) {
        let mut changed = true;
        while changed {
            changed = false;
            for production in grammar.productions() {
                let lhs = production.lhs().index();
                if !self.nullable[lhs] && self.nullable_string(production.rhs()) {
                    self.nullable[lhs] = true;
                    changed = true;
                }
            }
        }
    }

    fn solve_first(&mut self, grammar: &Grammar) {
        for terminal in grammar.terminals() {
            self.first[terminal.index()].insert(terminal);
        }
        let mut changed = true;
        let mut passes = 0u32;
        while changed {
            changed = false;
            passes += 1;
            for production in grammar.productions() {
                let lhs = production.lhs().index();
                for &symbol in production.rhs() {
                    let before = self.first[lhs].len();
                    // The borrow is split by cloning the source set; FIRST
                    // sets are small.
                    let from: Vec<SymbolId> =
                        self.first[symbol.index()].iter().copied().collect();
                    self.first[lhs].extend(from);
                    if self.first[lhs].len() != before {
                        changed = true;
                    }
                    if !self.nullable[symbol.index()] {
                        break;
                    }
                }
            }
        }
        tracing::trace!(passes, "FIRST sets converged");
    }

    fn solve_follow(&mut self, grammar: &Grammar) {
        // EOF seeds the augmented start and propagates to the user start
        // through `$accept -> start`.
        self.follow[SymbolId::ACCEPT.index()].insert(SymbolId::EOF);
        let mut changed = true;
        let mut passes = 0u32;
        while changed {
            changed = false;
            passes += 1;
            for production in grammar.productions() {
                let lhs = production.lhs();
                let rhs = production.rhs();
                for (i, &symbol) in rhs.iter().enumerate() {
                    if !grammar.is_nonterminal(symbol) {
                        continue;
                    }
                    let (suffix_first, suffix_nullable) = self.first_of_string(&rhs[i + 1..]);
                    let target = symbol.index();
                    let before = self.follow[target].len();
                    self.follow[target].extend(suffix_first);
                    if suffix_nullable {
                        let from: Vec<SymbolId> =
                            self.follow[lhs.index()].iter().copied().collect();
                        self.follow[target].extend(from);
                    }
                    if self.follow[target].len() != before {
                        changed = true;
                    }
                }
            }
        }
        tracing::trace!(passes, "FOLLOW sets converged");
    }
}
