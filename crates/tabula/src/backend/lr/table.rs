//! ACTION/GOTO table assembly and conflict resolution.
//!
//! ## Conflict policy
//!
//! When a reduction collides with a shift, precedence and associativity are
//! consulted first: a production outranking the terminal reduces, an
//! outranked one shifts, a tie resolves by the terminal's associativity
//! (`left` reduces, `right` shifts, `nonassoc` writes an explicit error
//! cell). Only when either side has no declared precedence does the builder
//! fall back to keeping the shift, and that fallback is what gets recorded
//! as a conflict. Reduce/reduce collisions keep the production declared
//! first. Construction never fails on conflicts.

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::backend::lr::StateId;
use crate::backend::lr::automaton::Automaton;
use crate::backend::lr::item::Item;
use crate::backend::{Algorithm, RuleMeta, SymbolMeta};
use crate::error::{Conflict, ConflictKind, ConflictSite, ParseError};
use crate::grammar::{Assoc, Grammar, GrammarSets, ProductionId, SymbolId};
use crate::runtime::lexer::TokenSource;
use crate::runtime::semantics::Semantics;
use crate::runtime::{self, ParseConfig};

/// A parse action for one `(state, terminal)` cell.
///
/// An absent cell is the implicit error; the `Error` variant is the
/// *explicit* error produced by `nonassoc` resolution and is never
/// overwritten by later assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    Shift(StateId),
    Reduce(ProductionId),
    Accept,
    Error,
}

/// A compiled LR parse table.
///
/// Self-contained: symbol names and production shapes are copied out of the
/// grammar, so the table can be handed to the runtime (or serialized) on
/// its own. Rows are sorted by symbol id and looked up by binary search,
/// which also makes two builds of the same grammar compare equal.
///
/// Immutable after construction; sharing one table across threads for
/// concurrent parses is fine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LrTable {
    /// Terminal columns per state, sorted by symbol id.
    pub(crate) actions: Vec<Vec<(SymbolId, Action)>>,
    /// Nonterminal columns per state, sorted by symbol id.
    pub(crate) gotos: Vec<Vec<(SymbolId, StateId)>>,
    /// Forced reduction per state, taken without reading a lookahead.
    pub(crate) defaults: Vec<Option<ProductionId>>,
    pub(crate) symbols: Vec<SymbolMeta>,
    pub(crate) rules: Vec<RuleMeta>,
    pub(crate) conflicts: Vec<Conflict>,
    algorithm: Algorithm,
}

impl LrTable {
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// The action for `(state, terminal)`, or `None` for the implicit
    /// error.
    #[must_use]
    pub fn action(&self, state: StateId, terminal: SymbolId) -> Option<Action> {
        let row = self.actions.get(state.index())?;
        row.binary_search_by_key(&terminal, |&(symbol, _)| symbol)
            .ok()
            .map(|at| row[at].1)
    }

    /// The goto target for `(state, nonterminal)`.
    #[must_use]
    pub fn goto(&self, state: StateId, nonterminal: SymbolId) -> Option<StateId> {
        let row = self.gotos.get(state.index())?;
        row.binary_search_by_key(&nonterminal, |&(symbol, _)| symbol)
            .ok()
            .map(|at| row[at].1)
    }

    /// The forced reduction for a state, if its row was compressed away.
    #[must_use]
    pub fn default_reduction(&self, state: StateId) -> Option<ProductionId> {
        self.defaults.get(state.index()).copied().flatten()
    }

    /// Every populated action cell, in `(state, symbol)` order.
    pub fn actions(&self) -> impl Iterator<Item = (StateId, SymbolId, Action)> + '_ {
        self.actions.iter().enumerate().flat_map(|(state, row)| {
            row.iter()
                .map(move |&(symbol, action)| (StateId::new(state as u32), symbol, action))
        })
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

    /// Names of the terminals with a defined action in `state`, sorted.
    /// The `error` placeholder is never reported.
    #[must_use]
    pub fn expected_terminals(&self, state: StateId) -> Vec<CompactString> {
        let Some(row) = self.actions.get(state.index()) else {
            return Vec::new();
        };
        row.iter()
            .filter(|&&(symbol, action)| symbol != SymbolId::ERROR && action != Action::Error)
            .map(|&(symbol, _)| self.symbols[symbol.index()].name.clone())
            .collect()
    }

    /// Run the shift-reduce interpreter over `lexer`.
    ///
    /// `shared` is an opaque value threaded through every [`Semantics`]
    /// callback; it never participates in parser control flow.
    ///
    /// # Errors
    ///
    /// [`ParseError::Syntax`] for unrecovered syntax errors, plus the
    /// pass-through lexer, semantic and cancellation variants.
    pub fn parse<L, S>(
        &self,
        lexer: &mut L,
        semantics: &mut S,
        shared: &mut S::Shared,
        config: &ParseConfig,
    ) -> Result<S::Value, ParseError>
    where
        L: TokenSource,
        S: Semantics,
    {
        runtime::run(self, lexer, semantics, shared, config)
    }
}

/// Scratch rows used while assembling one state.
struct RowBuilder<'g> {
    grammar: &'g Grammar,
    state: StateId,
    cells: HashMap<SymbolId, Action, ahash::RandomState>,
    conflicts: Vec<Conflict>,
}

impl<'g> RowBuilder<'g> {
    fn new(grammar: &'g Grammar, state: StateId) -> Self {
        Self {
            grammar,
            state,
            cells: HashMap::default(),
            conflicts: Vec::new(),
        }
    }

    fn shift(&mut self, terminal: SymbolId, target: StateId) {
        // Shifts are assigned first, one per transition symbol, so they
        // never collide with each other.
        self.cells.insert(terminal, Action::Shift(target));
    }

    fn accept(&mut self) {
        match self.cells.get(&SymbolId::EOF) {
            None => {
                self.cells.insert(SymbolId::EOF, Action::Accept);
            }
            Some(&existing) => {
                self.record(ConflictKind::ReduceReduce, SymbolId::EOF, Action::Accept, existing);
                self.cells.insert(SymbolId::EOF, Action::Accept);
            }
        }
    }

    fn reduce(&mut self, terminal: SymbolId, production: ProductionId) {
        let incoming = Action::Reduce(production);
        let Some(&existing) = self.cells.get(&terminal) else {
            self.cells.insert(terminal, incoming);
            return;
        };
        match existing {
            Action::Shift(_) => {
                let resolution = self.resolve_shift_reduce(terminal, production);
                match resolution {
                    Some(action) => {
                        self.cells.insert(terminal, action);
                    }
                    None => {
                        // No usable precedence: keep the shift, record it.
                        self.record(ConflictKind::ShiftReduce, terminal, existing, incoming);
                    }
                }
            }
            Action::Reduce(kept) => {
                if kept == production {
                    return;
                }
                // Earlier-declared production wins.
                let (winner, loser) = if kept < production {
                    (kept, production)
                } else {
                    (production, kept)
                };
                self.cells.insert(terminal, Action::Reduce(winner));
                self.record(
                    ConflictKind::ReduceReduce,
                    terminal,
                    Action::Reduce(winner),
                    Action::Reduce(loser),
                );
            }
            Action::Accept => {
                self.record(ConflictKind::ReduceReduce, terminal, Action::Accept, incoming);
            }
            // A nonassoc error cell is a resolution, not an open slot.
            Action::Error => {}
        }
    }

    /// Precedence resolution for a shift/reduce collision. `Some` is a
    /// silent resolution; `None` means no precedence applied.
    fn resolve_shift_reduce(
        &self,
        terminal: SymbolId,
        production: ProductionId,
    ) -> Option<Action> {
        let terminal_prec = self.grammar.terminal_precedence(terminal)?;
        let production_prec = self.grammar.production(production).precedence()?;
        if production_prec.level > terminal_prec.level {
            return Some(Action::Reduce(production));
        }
        if production_prec.level < terminal_prec.level {
            return Some(Action::Shift(self.shift_target(terminal)?));
        }
        match terminal_prec.assoc {
            Assoc::Left => Some(Action::Reduce(production)),
            Assoc::Right => Some(Action::Shift(self.shift_target(terminal)?)),
            Assoc::NonAssoc => Some(Action::Error),
        }
    }

    fn shift_target(&self, terminal: SymbolId) -> Option<StateId> {
        match self.cells.get(&terminal) {
            Some(&Action::Shift(target)) => Some(target),
            _ => None,
        }
    }

    fn record(&mut self, kind: ConflictKind, lookahead: SymbolId, chosen: Action, discarded: Action) {
        self.conflicts.push(Conflict {
            site: ConflictSite::State(self.state),
            lookahead,
            chosen,
            discarded,
            kind,
        });
    }

    fn finish(self) -> (Vec<(SymbolId, Action)>, Vec<Conflict>) {
        let mut row: Vec<(SymbolId, Action)> = self.cells.into_iter().collect();
        row.sort_unstable_by_key(|&(symbol, _)| symbol);
        (row, self.conflicts)
    }
}

/// Assemble the ACTION/GOTO table from a state collection.
///
/// The lookahead source for a completed item depends on the algorithm:
/// every terminal for LR(0), FOLLOW of the left-hand side for SLR(1), the
/// item's own lookahead set for LR(1)/LALR(1).
#[tracing::instrument(skip_all)]
pub(crate) fn assemble(
    grammar: &Grammar,
    sets: &GrammarSets,
    collection: &Automaton,
    algorithm: Algorithm,
) -> LrTable {
    // Reducing on `error` would fire recovery rules without a real fault.
    let all_terminals: Vec<SymbolId> = grammar
        .terminals()
        .filter(|&t| t != SymbolId::ERROR)
        .collect();

    let mut actions = Vec::with_capacity(collection.states.len());
    let mut gotos = Vec::with_capacity(collection.states.len());
    let mut conflicts = Vec::new();

    for state in &collection.states {
        let mut row = RowBuilder::new(grammar, state.id);
        let mut goto_row: Vec<(SymbolId, StateId)> = Vec::new();

        for &(symbol, target) in &state.transitions {
            if grammar.is_terminal(symbol) {
                row.shift(symbol, target);
            } else {
                goto_row.push((symbol, target));
            }
        }

        for item in completed_items(grammar, &state.items) {
            if item.production == ProductionId::AUGMENTED {
                row.accept();
                continue;
            }
            match algorithm {
                Algorithm::Lr0 => {
                    for &terminal in &all_terminals {
                        row.reduce(terminal, item.production);
                    }
                }
                Algorithm::Slr1 => {
                    let lhs = grammar.production(item.production).lhs();
                    for terminal in sets.follow_sorted(lhs) {
                        row.reduce(terminal, item.production);
                    }
                }
                _ => {
                    for &terminal in &item.lookahead {
                        row.reduce(terminal, item.production);
                    }
                }
            }
        }

        let (cells, row_conflicts) = row.finish();
        conflicts.extend(row_conflicts);
        actions.push(cells);
        goto_row.sort_unstable_by_key(|&(symbol, _)| symbol);
        gotos.push(goto_row);
    }

    tracing::debug!(
        states = actions.len(),
        conflicts = conflicts.len(),
        %algorithm,
        "assembled action table"
    );

    let defaults = vec![None; actions.len()];
    LrTable {
        actions,
        gotos,
        defaults,
        symbols: crate::backend::symbol_metas(grammar),
        rules: crate::backend::rule_metas(grammar),
        conflicts,
        algorithm,
    }
}

/// Completed items in production-id order, so conflict resolution sees
/// earlier-declared productions first.
fn completed_items<'s>(grammar: &Grammar, items: &'s [Item]) -> Vec<&'s Item> {
    let mut completed: Vec<&Item> = items
        .iter()
        .filter(|item| item.is_complete(grammar))
        .collect();
    completed.sort_unstable_by_key(|item| item.production);
    completed
}
