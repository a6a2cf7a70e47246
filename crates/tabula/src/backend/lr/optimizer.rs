//! Table compression: unreachable-state pruning and default reductions.
//!
//! Pruning runs first. Precedence and nonassoc resolution can strand
//! states whose only way in was a shift that resolution removed; the sweep
//! renumbers the survivors densely and remaps every shift target, goto
//! target, default slot and conflict site, so the runtime never sees a
//! dangling id.

use crate::backend::lr::table::{Action, LrTable};
use crate::backend::lr::StateId;
use crate::error::ConflictSite;
use crate::grammar::ProductionId;

/// Drop states unreachable from state 0 and renumber densely.
#[tracing::instrument(skip_all)]
pub(crate) fn prune_unreachable(table: &mut LrTable) {
    let count = table.actions.len();
    let mut reachable = vec![false; count];
    let mut worklist = vec![StateId::START];
    reachable[StateId::START.index()] = true;
    while let Some(state) = worklist.pop() {
        for &(_, action) in &table.actions[state.index()] {
            if let Action::Shift(target) = action
                && !reachable[target.index()]
            {
                reachable[target.index()] = true;
                worklist.push(target);
            }
        }
        for &(_, target) in &table.gotos[state.index()] {
            if !reachable[target.index()] {
                reachable[target.index()] = true;
                worklist.push(target);
            }
        }
    }

    if reachable.iter().all(|&r| r) {
        return;
    }

    // Dense renumbering in old-id order.
    let mut remap: Vec<Option<StateId>> = Vec::with_capacity(count);
    let mut next = 0u32;
    for &alive in &reachable {
        if alive {
            remap.push(Some(StateId::new(next)));
            next += 1;
        } else {
            remap.push(None);
        }
    }

    let map_state = |state: StateId| -> StateId {
        remap[state.index()].unwrap_or(StateId::START)
    };

    let old_actions = std::mem::take(&mut table.actions);
    let old_gotos = std::mem::take(&mut table.gotos);
    let old_defaults = std::mem::take(&mut table.defaults);

    for (index, row) in old_actions.into_iter().enumerate() {
        if remap[index].is_none() {
            continue;
        }
        table.actions.push(
            row.into_iter()
                .map(|(symbol, action)| match action {
                    Action::Shift(target) => (symbol, Action::Shift(map_state(target))),
                    other => (symbol, other),
                })
                .collect(),
        );
    }
    for (index, row) in old_gotos.into_iter().enumerate() {
        if remap[index].is_none() {
            continue;
        }
        table.gotos.push(
            row.into_iter()
                .map(|(symbol, target)| (symbol, map_state(target)))
                .collect(),
        );
    }
    for (index, slot) in old_defaults.into_iter().enumerate() {
        if remap[index].is_some() {
            table.defaults.push(slot);
        }
    }

    // Conflicts in dropped states are moot; survivors keep their records
    // under the new numbering so sites stay indexable.
    let old_conflicts = std::mem::take(&mut table.conflicts);
    table.conflicts = old_conflicts
        .into_iter()
        .filter_map(|mut conflict| {
            if let ConflictSite::State(state) = conflict.site {
                conflict.site = ConflictSite::State(remap[state.index()]?);
            }
            conflict.chosen = remap_action(conflict.chosen, &remap);
            conflict.discarded = remap_action(conflict.discarded, &remap);
            Some(conflict)
        })
        .collect();

    tracing::debug!(
        removed = count - table.actions.len(),
        remaining = table.actions.len(),
        "pruned unreachable states"
    );
}

fn remap_action(action: Action, remap: &[Option<StateId>]) -> Action {
    match action {
        Action::Shift(target) => {
            Action::Shift(remap[target.index()].unwrap_or(StateId::START))
        }
        other => other,
    }
}

/// Replace rows whose only action is a single reduction with a default
/// action, letting the runtime skip lexing where the move is forced.
///
/// Rows containing a shift, an accept, or an explicit error cell are left
/// alone: defaulting those would change observable behavior.
#[tracing::instrument(skip_all)]
pub(crate) fn compress_defaults(table: &mut LrTable) {
    let mut compressed = 0usize;
    for (index, row) in table.actions.iter_mut().enumerate() {
        let mut sole: Option<ProductionId> = None;
        let mut defaultable = !row.is_empty();
        for &(_, action) in row.iter() {
            match action {
                Action::Reduce(production) => match sole {
                    None => sole = Some(production),
                    Some(previous) if previous == production => {}
                    Some(_) => {
                        defaultable = false;
                        break;
                    }
                },
                _ => {
                    defaultable = false;
                    break;
                }
            }
        }
        if defaultable && let Some(production) = sole {
            table.defaults[index] = Some(production);
            row.clear();
            compressed += 1;
        }
    }
    tracing::debug!(compressed, "installed default reductions");
}
