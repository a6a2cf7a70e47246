//! LR items and the closure/goto algebra.
//!
//! An item is a production with a dot position and a lookahead set. The
//! LR(0) flavor carries empty lookaheads; the LR(1) flavor propagates
//! lookaheads through closure via FIRST of the suffix after the dot.
//!
//! Items with the same `(production, dot)` core are always merged by
//! lookahead union before a state is keyed. Without per-core merging the
//! LR(1) collection explodes and the LALR merge gets harder, so the merge
//! is done eagerly here.
//!
//! Everything is canonicalized by sorting (items by core, lookaheads as
//! sorted unique sequences) so that state keys, and therefore state
//! numbering and the finished tables, are deterministic across runs.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::grammar::{Grammar, GrammarSets, ProductionId, SymbolId};

/// Sorted, deduplicated lookahead terminals.
pub(crate) type Lookahead = SmallVec<[SymbolId; 4]>;

/// Which item flavor an automaton is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavor {
    /// Cores only; lookahead sets stay empty.
    Lr0,
    /// Full LR(1) lookahead propagation.
    Lr1,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Item {
    pub production: ProductionId,
    pub dot: u32,
    pub lookahead: Lookahead,
}

impl Item {
    pub(crate) fn new(production: ProductionId, dot: u32, lookahead: Lookahead) -> Self {
        Self {
            production,
            dot,
            lookahead,
        }
    }

    pub(crate) const fn core(&self) -> (ProductionId, u32) {
        (self.production, self.dot)
    }

    /// The symbol right after the dot, if the dot is not at the end.
    pub(crate) fn next_symbol(&self, grammar: &Grammar) -> Option<SymbolId> {
        grammar
            .production(self.production)
            .rhs()
            .get(self.dot as usize)
            .copied()
    }

    pub(crate) fn is_complete(&self, grammar: &Grammar) -> bool {
        self.dot as usize == grammar.production(self.production).len()
    }
}

/// A state key: the sorted kernel with per-core lookaheads. For the LR(0)
/// flavor the lookahead components are empty, which makes the key exactly
/// the LR(0) core.
pub(crate) type StateKey = Vec<(ProductionId, u32, Lookahead)>;

/// The LR(0) core of a kernel, used to group states for the LALR merge.
pub(crate) type CoreKey = Vec<(ProductionId, u32)>;

pub(crate) fn state_key(kernel: &[Item]) -> StateKey {
    kernel
        .iter()
        .map(|item| (item.production, item.dot, item.lookahead.clone()))
        .collect()
}

pub(crate) fn core_key(kernel: &[Item]) -> CoreKey {
    kernel.iter().map(Item::core).collect()
}

/// Sort items by core and union the lookaheads of equal cores.
pub(crate) fn merge_cores(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_unstable_by_key(Item::core);
    let mut merged: Vec<Item> = Vec::with_capacity(items.len());
    for item in items {
        match merged.last_mut() {
            Some(last) if last.core() == item.core() => {
                last.lookahead.extend(item.lookahead);
            }
            _ => merged.push(item),
        }
    }
    for item in &mut merged {
        item.lookahead.sort_unstable();
        item.lookahead.dedup();
    }
    merged
}

/// The ε-closure of a kernel.
///
/// For every `[A -> α.Bβ, L]` and production `B -> γ`, the item `[B -> .γ]`
/// joins the set; in the LR(1) flavor its lookahead is
/// `FIRST(β) ∪ (L when β is nullable)`. Runs to fixpoint because lookaheads
/// can keep flowing into already-present cores.
pub(crate) fn closure(
    grammar: &Grammar,
    sets: &GrammarSets,
    kernel: &[Item],
    flavor: Flavor,
) -> Vec<Item> {
    let mut lookaheads: HashMap<(ProductionId, u32), HashSet<SymbolId, ahash::RandomState>, ahash::RandomState> =
        HashMap::default();
    for item in kernel {
        lookaheads
            .entry(item.core())
            .or_default()
            .extend(item.lookahead.iter().copied());
    }

    let mut changed = true;
    while changed {
        changed = false;
        let cores: Vec<(ProductionId, u32)> = lookaheads.keys().copied().collect();
        for (production, dot) in cores {
            let rhs = grammar.production(production).rhs();
            let Some(&next) = rhs.get(dot as usize) else {
                continue;
            };
            if !grammar.is_nonterminal(next) {
                continue;
            }

            let mut propagated: Vec<SymbolId> = Vec::new();
            if flavor == Flavor::Lr1 {
                let beta = &rhs[dot as usize + 1..];
                let (first, nullable) = sets.first_of_string(beta);
                propagated.extend(first);
                if nullable && let Some(parent) = lookaheads.get(&(production, dot)) {
                    propagated.extend(parent.iter().copied());
                }
            }

            for &expansion in grammar.productions_of(next) {
                let entry = lookaheads.entry((expansion, 0));
                match entry {
                    hashbrown::hash_map::Entry::Vacant(slot) => {
                        slot.insert(propagated.iter().copied().collect());
                        changed = true;
                    }
                    hashbrown::hash_map::Entry::Occupied(mut slot) => {
                        let set = slot.get_mut();
                        let before = set.len();
                        set.extend(propagated.iter().copied());
                        if set.len() != before {
                            changed = true;
                        }
                    }
                }
            }
        }
    }

    let mut items: Vec<Item> = lookaheads
        .into_iter()
        .map(|((production, dot), lookahead)| {
            let mut lookahead: Lookahead = lookahead.into_iter().collect();
            lookahead.sort_unstable();
            Item::new(production, dot, lookahead)
        })
        .collect();
    items.sort_unstable_by_key(Item::core);
    items
}

/// The kernel reached by advancing every dot that sits before `symbol`.
/// Returns the merged, sorted kernel; the caller closes it.
pub(crate) fn goto_kernel(grammar: &Grammar, items: &[Item], symbol: SymbolId) -> Vec<Item> {
    let advanced: Vec<Item> = items
        .iter()
        .filter(|item| item.next_symbol(grammar) == Some(symbol))
        .map(|item| Item::new(item.production, item.dot + 1, item.lookahead.clone()))
        .collect();
    merge_cores(advanced)
}

/// The symbols that appear right after a dot, sorted and deduplicated.
pub(crate) fn transition_symbols(grammar: &Grammar, items: &[Item]) -> Vec<SymbolId> {
    let mut symbols: Vec<SymbolId> = items
        .iter()
        .filter_map(|item| item.next_symbol(grammar))
        .collect();
    symbols.sort_unstable();
    symbols.dedup();
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use smallvec::smallvec;

    fn expression_grammar() -> Grammar {
        Grammar::builder()
            .start("E")
            .tokens(["+", "id"])
            .rule("E", ["E", "+", "T"])
            .rule("E", ["T"])
            .rule("T", ["id"])
            .build()
            .unwrap()
    }

    fn start_kernel() -> Vec<Item> {
        vec![Item::new(
            ProductionId::AUGMENTED,
            0,
            smallvec![SymbolId::EOF],
        )]
    }

    #[test]
    fn closure_is_idempotent() {
        let grammar = expression_grammar();
        let sets = GrammarSets::compute(&grammar);
        for flavor in [Flavor::Lr0, Flavor::Lr1] {
            let once = closure(&grammar, &sets, &start_kernel(), flavor);
            let twice = closure(&grammar, &sets, &once, flavor);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn closure_expands_nonterminals_after_the_dot() {
        let grammar = expression_grammar();
        let sets = GrammarSets::compute(&grammar);
        let items = closure(&grammar, &sets, &start_kernel(), Flavor::Lr1);
        // $accept -> .E plus every production of E and T at dot 0.
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|item| item.dot == 0));
    }

    #[test]
    fn lr1_closure_propagates_lookaheads() {
        let grammar = expression_grammar();
        let sets = GrammarSets::compute(&grammar);
        let items = closure(&grammar, &sets, &start_kernel(), Flavor::Lr1);
        let plus = grammar.symbol("+").unwrap();
        let e = grammar.symbol("E").unwrap();
        // Items expanding E see both $end (from the kernel) and `+`
        // (from E -> E.+T once the dot closure runs).
        let e_item = items
            .iter()
            .find(|item| grammar.production(item.production).lhs() == e && item.production != ProductionId::AUGMENTED)
            .unwrap();
        assert!(e_item.lookahead.contains(&SymbolId::EOF));
        assert!(e_item.lookahead.contains(&plus));
    }

    #[test]
    fn goto_is_deterministic_and_unique() {
        let grammar = expression_grammar();
        let sets = GrammarSets::compute(&grammar);
        let items = closure(&grammar, &sets, &start_kernel(), Flavor::Lr1);
        let e = grammar.symbol("E").unwrap();
        let first = goto_kernel(&grammar, &items, e);
        let second = goto_kernel(&grammar, &items, e);
        assert_eq!(first, second);
        assert!(!first.is_empty());
        // Advancing over a symbol no dot precedes yields nothing.
        assert!(goto_kernel(&grammar, &items, SymbolId::ERROR).is_empty());
    }

    #[test]
    fn merge_cores_unions_lookaheads() {
        let p = ProductionId::AUGMENTED;
        let a = SymbolId::new(3);
        let b = SymbolId::new(4);
        let merged = merge_cores(vec![
            Item::new(p, 1, smallvec![b]),
            Item::new(p, 1, smallvec![a, b]),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(&merged[0].lookahead[..], &[a, b]);
    }
}
