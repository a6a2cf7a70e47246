//! # Parse Runtime
//!
//! The table-driven shift-reduce interpreter.
//!
//! ## Overview
//!
//! State is three parallel stacks (parser states, semantic values, source
//! locations) plus a small recovery counter. Each iteration consults the
//! state's default reduction first; only when the next move actually
//! depends on input does the loop pull a token from the lexer. Undefined
//! `(state, lookahead)` cells trigger panic-mode recovery through the
//! reserved `error` terminal (see [`run`]); a caller-supplied cancellation
//! flag is checked once per iteration.
//!
//! A compiled table is immutable, so any number of parses may run against
//! it concurrently; each call owns its stacks and its lexer.

pub mod lexer;
pub mod semantics;

pub use lexer::{IterTokens, Location, Scanned, TokenSource};
pub use semantics::{ErrorDisposition, Recognize, Reduced, ReduceContext, Semantics};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use compact_str::CompactString;
use smallvec::{SmallVec, smallvec};

use crate::backend::lr::table::{Action, LrTable};
use crate::backend::lr::StateId;
use crate::error::{ParseError, SyntaxError};
use crate::grammar::SymbolId;

/// Shifts that must succeed after an `error` shift before syntax errors
/// are reported again.
const RECOVERY_SHIFTS: u32 = 3;

/// Per-parse options.
#[derive(Debug, Clone, Default)]
pub struct ParseConfig {
    /// Cooperative cancellation: checked at the top of every iteration and
    /// after each `next_token`. Raising it aborts the parse with
    /// [`ParseError::Cancelled`].
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ParseConfig {
    pub(crate) fn check_cancelled(&self) -> Result<(), ParseError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(ParseError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Stable fingerprint of a diagnostic context, so callers can dedup
/// repeated reports of the same fault. Fixed seeds keep it identical
/// across runs.
pub(crate) fn context_fingerprint(site: u32, terminal: SymbolId, line: u32, column: u32) -> u64 {
    use std::hash::{BuildHasher, Hash, Hasher};
    let mut hasher = ahash::RandomState::with_seeds(
        0x746a_62_756c_61,
        0x7461_62_6c65,
        u64::from(site),
        u64::from(terminal.raw()),
    )
    .build_hasher();
    (site, terminal.raw(), line, column).hash(&mut hasher);
    hasher.finish()
}

/// Drive the interpreter over `lexer` until accept, fatal error or
/// cancellation.
///
/// Panic-mode recovery: on an undefined cell with the recovery counter at
/// zero, a structured [`SyntaxError`] goes to `Semantics::syntax_error`;
/// if recovery is possible and accepted, states are popped until one can
/// shift `error`, the synthesized `error` token is shifted, and the
/// counter is set to [`RECOVERY_SHIFTS`]. While the counter is nonzero,
/// offending lookaheads are discarded instead of reported ($end is never
/// discarded; hitting it re-raises the error as fatal).
pub(crate) fn run<L, S>(
    table: &LrTable,
    lexer: &mut L,
    semantics: &mut S,
    shared: &mut S::Shared,
    config: &ParseConfig,
) -> Result<S::Value, ParseError>
where
    L: TokenSource,
    S: Semantics,
{
    let mut states: SmallVec<[StateId; 32]> = smallvec![StateId::START];
    let mut values: Vec<S::Value> = Vec::new();
    let mut locations: Vec<Location> = Vec::new();
    let mut lookahead: Option<Scanned> = None;
    let mut recovering: u32 = 0;

    loop {
        config.check_cancelled()?;
        let state = states.last().copied().unwrap_or(StateId::START);

        let action = if let Some(production) = table.default_reduction(state) {
            // Forced move: no lookahead needed, the lexer stays untouched.
            Some(Action::Reduce(production))
        } else {
            let token = match lookahead.take() {
                Some(token) => token,
                None => {
                    let token = lexer.next_token()?;
                    config.check_cancelled()?;
                    token
                }
            };
            let action = table.action(state, token.terminal);
            lookahead = Some(token);
            action
        };

        match action {
            Some(Action::Shift(target)) => {
                if let Some(token) = lookahead.take() {
                    tracing::trace!(?state, ?target, terminal = ?token.terminal, "shift");
                    states.push(target);
                    values.push(semantics.token_value(&token, shared));
                    locations.push(token.location);
                    if recovering > 0 {
                        recovering -= 1;
                    }
                }
            }

            Some(Action::Reduce(production)) => {
                let rule = &table.rules[production.index()];
                let count = rule.rhs.len();
                let base = values.len().saturating_sub(count);
                let span = if count == 0 {
                    locations
                        .last()
                        .map_or_else(Location::default, Location::end_point)
                } else {
                    Location::span(locations[base], locations[locations.len() - 1])
                };
                tracing::trace!(?state, ?production, pops = count, "reduce");

                let ctx = ReduceContext {
                    production,
                    lhs: rule.lhs,
                    values: &values[base..],
                    locations: &locations[base..],
                    span,
                };
                let reduced = semantics.reduce(&ctx, shared)?;

                states.truncate(states.len().saturating_sub(count));
                values.truncate(base);
                locations.truncate(base);

                let value = match reduced {
                    Reduced::Finished(value) => return Ok(value),
                    Reduced::Value(value) => value,
                };

                let top = states.last().copied().unwrap_or(StateId::START);
                let Some(target) = table.goto(top, rule.lhs) else {
                    return Err(ParseError::Syntax(internal_fault(
                        table, top, rule.lhs, &locations,
                    )));
                };
                states.push(target);
                values.push(value);
                locations.push(span);
            }

            Some(Action::Accept) => {
                tracing::trace!("accept");
                return match values.pop() {
                    Some(value) => Ok(value),
                    None => Err(ParseError::Syntax(internal_fault(
                        table,
                        state,
                        SymbolId::ACCEPT,
                        &locations,
                    ))),
                };
            }

            // Explicit nonassoc error cells fail like missing ones.
            Some(Action::Error) | None => {
                let Some(token) = lookahead.take() else {
                    continue;
                };

                if recovering > 0 {
                    // Panic mode: throw tokens away until something parses.
                    if token.terminal == SymbolId::EOF {
                        let error = syntax_error(table, state, &token, false, lexer.show_position());
                        return Err(ParseError::Syntax(error));
                    }
                    tracing::trace!(terminal = ?token.terminal, "discarding token during recovery");
                    continue;
                }

                let recoverable = states.iter().any(|&s| {
                    matches!(table.action(s, SymbolId::ERROR), Some(Action::Shift(_)))
                });
                let error =
                    syntax_error(table, state, &token, recoverable, lexer.show_position());

                if semantics.syntax_error(&error, shared) == ErrorDisposition::Fail || !recoverable
                {
                    return Err(ParseError::Syntax(error));
                }

                // Synchronize: pop to a state that shifts `error`.
                loop {
                    let top = states.last().copied().unwrap_or(StateId::START);
                    if let Some(Action::Shift(target)) = table.action(top, SymbolId::ERROR) {
                        let synthesized = Scanned::new(
                            SymbolId::ERROR,
                            token.text.clone(),
                            token.location,
                        );
                        tracing::trace!(?top, ?target, "shifting error token");
                        states.push(target);
                        values.push(semantics.token_value(&synthesized, shared));
                        locations.push(synthesized.location);
                        recovering = RECOVERY_SHIFTS;
                        break;
                    }
                    if states.len() <= 1 {
                        return Err(ParseError::Syntax(error));
                    }
                    states.pop();
                    values.pop();
                    locations.pop();
                }

                // The offending lookahead is retried against the recovery
                // state; if it still has no action it is discarded above.
                lookahead = Some(token);
            }
        }
    }
}

/// Build the message line shared by the LR and LL drivers.
pub(crate) fn format_syntax_message(
    line: u32,
    shown: &str,
    expected: &[CompactString],
    position: Option<String>,
) -> String {
    let mut message = format!("parse error on line {line}: unexpected `{shown}`");
    if !expected.is_empty() {
        message.push_str(", expecting ");
        for (index, name) in expected.iter().enumerate() {
            if index > 0 {
                message.push_str(", ");
            }
            message.push('`');
            message.push_str(name);
            message.push('`');
        }
    }
    if let Some(position) = position {
        message.push('\n');
        message.push_str(&position);
    }
    message
}

/// The text shown for a token in diagnostics; `$end` has no text of its
/// own.
pub(crate) fn shown_text(token: &Scanned) -> CompactString {
    if token.terminal == SymbolId::EOF {
        CompactString::const_new("$end")
    } else {
        token.text.clone()
    }
}

fn syntax_error(
    table: &LrTable,
    state: StateId,
    token: &Scanned,
    recoverable: bool,
    position: Option<String>,
) -> SyntaxError {
    let expected = table.expected_terminals(state);
    let line = token.location.first_line;
    let column = token.location.first_column;
    let message = format_syntax_message(line, &shown_text(token), &expected, position);

    SyntaxError {
        message,
        token: token.terminal,
        text: token.text.clone(),
        line,
        column,
        expected,
        recoverable,
        context_hash: context_fingerprint(state.index() as u32, token.terminal, line, column),
    }
}

/// An impossible table state: a missing goto or an empty value stack at
/// accept. Kept as a structured error instead of a panic so embedders see
/// a diagnostic rather than an abort.
fn internal_fault(
    table: &LrTable,
    state: StateId,
    symbol: SymbolId,
    locations: &[Location],
) -> SyntaxError {
    let location = locations.last().copied().unwrap_or_default();
    SyntaxError {
        message: format!(
            "internal parser fault: no transition from state {} on `{}`",
            state.index(),
            table.symbol_name(symbol),
        ),
        token: symbol,
        text: CompactString::const_new(""),
        line: location.last_line,
        column: location.last_column,
        expected: Vec::new(),
        recoverable: false,
        context_hash: context_fingerprint(
            state.index() as u32,
            symbol,
            location.last_line,
            location.last_column,
        ),
    }
}
