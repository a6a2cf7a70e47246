//! Canonical state collection and the LALR merge.

use std::collections::VecDeque;

use hashbrown::HashMap;
use smallvec::smallvec;

use crate::backend::lr::StateId;
use crate::backend::lr::item::{
    self, CoreKey, Flavor, Item, StateKey, closure, goto_kernel, state_key, transition_symbols,
};
use crate::grammar::{Grammar, GrammarSets, ProductionId, SymbolId};

/// One state: its kernel, its closure, and its outgoing transitions
/// (sorted by symbol, targets as ids so cycles are free).
pub(crate) struct State {
    pub id: StateId,
    pub kernel: Vec<Item>,
    pub items: Vec<Item>,
    pub transitions: Vec<(SymbolId, StateId)>,
}

pub(crate) struct Automaton {
    pub states: Vec<State>,
}

/// Build the canonical collection by breadth-first closure-and-goto from
/// `closure({[$accept -> .start, {$end}]})`.
///
/// States are keyed by their sorted kernel: the LR(0) core for the `Lr0`
/// flavor, core plus lookaheads for `Lr1`. BFS order plus sorted transition
/// symbols make state numbering deterministic.
#[tracing::instrument(skip_all)]
pub(crate) fn canonical_collection(
    grammar: &Grammar,
    sets: &GrammarSets,
    flavor: Flavor,
) -> Automaton {
    let start_lookahead = match flavor {
        Flavor::Lr0 => smallvec![],
        Flavor::Lr1 => smallvec![SymbolId::EOF],
    };
    let start_kernel = vec![Item::new(ProductionId::AUGMENTED, 0, start_lookahead)];

    let mut states: Vec<State> = Vec::new();
    let mut by_key: HashMap<StateKey, StateId, ahash::RandomState> = HashMap::default();
    let mut queue: VecDeque<StateId> = VecDeque::new();

    let mut intern_state =
        |kernel: Vec<Item>, states: &mut Vec<State>, queue: &mut VecDeque<StateId>| -> StateId {
            let key = state_key(&kernel);
            if let Some(&id) = by_key.get(&key) {
                return id;
            }
            let id = StateId::new(states.len() as u32);
            let items = closure(grammar, sets, &kernel, flavor);
            states.push(State {
                id,
                kernel,
                items,
                transitions: Vec::new(),
            });
            by_key.insert(key, id);
            queue.push_back(id);
            id
        };

    intern_state(start_kernel, &mut states, &mut queue);

    while let Some(id) = queue.pop_front() {
        let symbols = transition_symbols(grammar, &states[id.index()].items);
        let mut transitions = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let kernel = goto_kernel(grammar, &states[id.index()].items, symbol);
            let target = intern_state(kernel, &mut states, &mut queue);
            transitions.push((symbol, target));
        }
        states[id.index()].transitions = transitions;
    }

    tracing::debug!(states = states.len(), ?flavor, "built canonical collection");
    Automaton { states }
}

/// Merge an LR(1) collection into its LALR(1) quotient: states with equal
/// LR(0) kernel cores collapse into one, lookaheads union per item, and
/// every transition is redirected to the merged target.
///
/// The merge can introduce reduce/reduce conflicts that canonical LR(1)
/// does not have; those surface later during table assembly.
#[tracing::instrument(skip_all)]
pub(crate) fn merge_lalr(automaton: Automaton) -> Automaton {
    let before = automaton.states.len();

    let mut representative: HashMap<CoreKey, StateId, ahash::RandomState> = HashMap::default();
    let mut remap: Vec<StateId> = Vec::with_capacity(before);
    let mut merged_count = 0u32;
    for state in &automaton.states {
        let core = item::core_key(&state.kernel);
        let id = *representative.entry(core).or_insert_with(|| {
            let id = StateId::new(merged_count);
            merged_count += 1;
            id
        });
        remap.push(id);
    }

    let mut merged: Vec<State> = Vec::with_capacity(merged_count as usize);
    for (old_index, state) in automaton.states.into_iter().enumerate() {
        let new_id = remap[old_index];
        let transitions: Vec<(SymbolId, StateId)> = state
            .transitions
            .into_iter()
            .map(|(symbol, target)| (symbol, remap[target.index()]))
            .collect();
        if new_id.index() == merged.len() {
            merged.push(State {
                id: new_id,
                kernel: state.kernel,
                items: state.items,
                transitions,
            });
        } else {
            let slot = &mut merged[new_id.index()];
            let kernel = std::mem::take(&mut slot.kernel);
            slot.kernel = item::merge_cores(kernel.into_iter().chain(state.kernel).collect());
            let items = std::mem::take(&mut slot.items);
            slot.items = item::merge_cores(items.into_iter().chain(state.items).collect());
            slot.transitions.extend(transitions);
            slot.transitions.sort_unstable();
            slot.transitions.dedup();
        }
    }

    tracing::debug!(before, after = merged.len(), "merged LALR states");
    Automaton { states: merged }
}
