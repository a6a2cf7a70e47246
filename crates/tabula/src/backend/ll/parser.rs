//! The predictive driver: a symbol stack against a PREDICT table.

use compact_str::CompactString;
use smallvec::{SmallVec, smallvec};

use crate::backend::ll::table::LlTable;
use crate::error::{ParseError, SyntaxError};
use crate::grammar::SymbolId;
use crate::runtime::lexer::{Scanned, TokenSource};
use crate::runtime::{ParseConfig, context_fingerprint, format_syntax_message, shown_text};

/// Top-down recognition: expand nonterminals by table prediction, match
/// terminals against the stream. Accepts when the stack is empty and the
/// lookahead is `$end`. No recovery; the first mismatch is fatal.
pub(crate) fn run<L: TokenSource>(
    table: &LlTable,
    lexer: &mut L,
    config: &ParseConfig,
) -> Result<(), ParseError> {
    let mut stack: SmallVec<[SymbolId; 16]> = smallvec![table.start];
    let mut lookahead = lexer.next_token()?;

    loop {
        config.check_cancelled()?;
        let Some(top) = stack.pop() else {
            if lookahead.terminal == SymbolId::EOF {
                return Ok(());
            }
            return Err(ParseError::Syntax(mismatch(
                &lookahead,
                vec![CompactString::const_new("$end")],
                lexer.show_position(),
            )));
        };

        if table.is_terminal(top) {
            if top != lookahead.terminal {
                return Err(ParseError::Syntax(mismatch(
                    &lookahead,
                    vec![CompactString::from(table.symbol_name(top))],
                    lexer.show_position(),
                )));
            }
            if top != SymbolId::EOF {
                lookahead = lexer.next_token()?;
            }
            continue;
        }

        match table.predict(top, lookahead.terminal) {
            Some(production) => {
                tracing::trace!(nonterminal = ?top, ?production, "predict");
                for &symbol in table.rules[production.index()].rhs.iter().rev() {
                    stack.push(symbol);
                }
            }
            None => {
                return Err(ParseError::Syntax(mismatch(
                    &lookahead,
                    table.expected_terminals(top),
                    lexer.show_position(),
                )));
            }
        }
    }
}

fn mismatch(
    token: &Scanned,
    expected: Vec<CompactString>,
    position: Option<String>,
) -> SyntaxError {
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
        recoverable: false,
        context_hash: context_fingerprint(token.terminal.raw(), token.terminal, line, column),
    }
}
