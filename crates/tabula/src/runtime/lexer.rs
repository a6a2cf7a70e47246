//! The pull-style lexer contract.
//!
//! The runtime never owns tokenization: it pulls [`Scanned`] tokens from
//! any [`TokenSource`] one at a time. A source must yield the reserved
//! `$end` terminal exactly once when its input is exhausted; what it
//! returns after that is its own business (the runtime never asks).
//!
//! Binding input text or shared lexer state happens in the implementor's
//! constructor; the parser side of the contract is pull-only.

use compact_str::CompactString;

use crate::error::LexError;
use crate::grammar::SymbolId;

/// A source span in line/column form, with optional byte offsets.
///
/// Lines are 1-based, columns 0-based. `range` carries `[start, end)` byte
/// offsets when the lexer tracks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub first_line: u32,
    pub first_column: u32,
    pub last_line: u32,
    pub last_column: u32,
    pub range: Option<(u32, u32)>,
}

impl Location {
    /// A zero-width location at a line/column point.
    #[must_use]
    pub const fn point(line: u32, column: u32) -> Self {
        Self {
            first_line: line,
            first_column: column,
            last_line: line,
            last_column: column,
            range: None,
        }
    }

    /// The location covering everything from the start of `first` to the
    /// end of `last`.
    #[must_use]
    pub fn span(first: Self, last: Self) -> Self {
        Self {
            first_line: first.first_line,
            first_column: first.first_column,
            last_line: last.last_line,
            last_column: last.last_column,
            range: match (first.range, last.range) {
                (Some((start, _)), Some((_, end))) => Some((start, end)),
                _ => None,
            },
        }
    }

    /// The zero-width location at this location's end.
    #[must_use]
    pub fn end_point(&self) -> Self {
        Self {
            first_line: self.last_line,
            first_column: self.last_column,
            last_line: self.last_line,
            last_column: self.last_column,
            range: self.range.map(|(_, end)| (end, end)),
        }
    }
}

/// One token as delivered by a lexer: terminal id, matched text, span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanned {
    pub terminal: SymbolId,
    pub text: CompactString,
    pub location: Location,
}

impl Scanned {
    #[must_use]
    pub fn new(terminal: SymbolId, text: impl Into<CompactString>, location: Location) -> Self {
        Self {
            terminal,
            text: text.into(),
            location,
        }
    }

    /// The end-of-input token.
    #[must_use]
    pub fn eof(location: Location) -> Self {
        Self {
            terminal: SymbolId::EOF,
            text: CompactString::const_new(""),
            location,
        }
    }
}

/// A pull-style token source.
pub trait TokenSource {
    /// Produce the next token. Must return [`Scanned::eof`] exactly once at
    /// the end of input.
    ///
    /// # Errors
    ///
    /// [`LexError`] for unscannable input; the runtime treats it as fatal.
    fn next_token(&mut self) -> Result<Scanned, LexError>;

    /// A human-oriented rendering of the current position, spliced into
    /// syntax-error messages when available.
    fn show_position(&self) -> Option<String> {
        None
    }
}

/// Adapts any iterator of [`Scanned`] tokens into a [`TokenSource`],
/// appending `$end` after the last item. Handy for tests and for feeding a
/// pre-tokenized buffer through the parser.
pub struct IterTokens<I> {
    inner: I,
    last_location: Location,
}

impl<I: Iterator<Item = Scanned>> IterTokens<I> {
    pub fn new(tokens: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: tokens.into_iter(),
            last_location: Location::default(),
        }
    }
}

impl<I: Iterator<Item = Scanned>> TokenSource for IterTokens<I> {
    fn next_token(&mut self) -> Result<Scanned, LexError> {
        match self.inner.next() {
            Some(token) => {
                self.last_location = token.location;
                Ok(token)
            }
            None => Ok(Scanned::eof(self.last_location.end_point())),
        }
    }
}
