//! A small infix calculator: a hand-written lexer, an evaluating
//! `Semantics`, and a LALR(1) table built at startup.
//!
//! Run with: `cargo run --example calculator -- "1+2*(3+4)"`

use tabula::{
    Algorithm, Grammar, LexError, Location, ParseConfig, ReduceContext, Reduced, Scanned,
    SemanticError, Semantics, TokenSource, build,
};

/// Tokenizes an arithmetic expression, one character of lookahead.
struct CalcLexer<'s> {
    input: &'s str,
    offset: usize,
    num: tabula::SymbolId,
    ops: [(char, tabula::SymbolId); 4],
}

impl<'s> CalcLexer<'s> {
    fn new(table: &tabula::LrTable, input: &'s str) -> Self {
        let sym = |name: &str| table.symbol(name).expect("terminal exists");
        Self {
            input,
            offset: 0,
            num: sym("num"),
            ops: [('+', sym("+")), ('*', sym("*")), ('(', sym("(")), (')', sym(")"))],
        }
    }

    fn location(&self, start: usize, end: usize) -> Location {
        Location {
            first_line: 1,
            first_column: start as u32,
            last_line: 1,
            last_column: end as u32,
            range: Some((start as u32, end as u32)),
        }
    }
}

impl TokenSource for CalcLexer<'_> {
    fn next_token(&mut self) -> Result<Scanned, LexError> {
        let bytes = self.input.as_bytes();
        while self.offset < bytes.len() && bytes[self.offset].is_ascii_whitespace() {
            self.offset += 1;
        }
        if self.offset >= bytes.len() {
            return Ok(Scanned::eof(self.location(self.offset, self.offset)));
        }
        let start = self.offset;
        let c = bytes[start] as char;
        if c.is_ascii_digit() {
            while self.offset < bytes.len() && bytes[self.offset].is_ascii_digit() {
                self.offset += 1;
            }
            return Ok(Scanned::new(
                self.num,
                &self.input[start..self.offset],
                self.location(start, self.offset),
            ));
        }
        if let Some(&(_, terminal)) = self.ops.iter().find(|&&(op, _)| op == c) {
            self.offset += 1;
            return Ok(Scanned::new(
                terminal,
                &self.input[start..self.offset],
                self.location(start, self.offset),
            ));
        }
        Err(LexError::new(format!("unexpected character `{c}`"), 1, start as u32))
    }

    fn show_position(&self) -> Option<String> {
        let mut caret = String::from(self.input);
        caret.push('\n');
        caret.push_str(&" ".repeat(self.offset.saturating_sub(1)));
        caret.push('^');
        Some(caret)
    }
}

/// Evaluates as it reduces.
struct Eval;

impl Semantics for Eval {
    type Value = i64;
    type Shared = ();

    fn token_value(&mut self, token: &Scanned, _shared: &mut ()) -> i64 {
        token.text.parse().unwrap_or(0)
    }

    fn reduce(
        &mut self,
        ctx: &ReduceContext<'_, i64>,
        _shared: &mut (),
    ) -> Result<Reduced<i64>, SemanticError> {
        let value = match (ctx.production.index(), ctx.values) {
            (1, [lhs, _, rhs]) => lhs
                .checked_add(*rhs)
                .ok_or_else(|| SemanticError::new("addition overflow"))?,
            (2, [lhs, _, rhs]) => lhs
                .checked_mul(*rhs)
                .ok_or_else(|| SemanticError::new("multiplication overflow"))?,
            (3, [_, inner, _]) => *inner,
            (_, values) => values.first().copied().unwrap_or(0),
        };
        Ok(Reduced::Value(value))
    }
}

fn main() {
    let grammar = Grammar::builder()
        .start("E")
        .tokens(["+", "*", "(", ")", "num"])
        .left(["+"])
        .left(["*"])
        .rule("E", ["E", "+", "E"])
        .rule("E", ["E", "*", "E"])
        .rule("E", ["(", "E", ")"])
        .rule("E", ["num"])
        .build()
        .expect("grammar builds");
    let table = build(&grammar, Algorithm::Lalr1);
    assert!(table.conflicts().is_empty(), "calculator grammar is clean");
    let table = table.as_lr().expect("LALR is an LR table");

    let input = std::env::args().nth(1).unwrap_or_else(|| "1+2*(3+4)".to_string());
    let mut lexer = CalcLexer::new(table, &input);
    match table.parse(&mut lexer, &mut Eval, &mut (), &ParseConfig::default()) {
        Ok(value) => println!("{input} = {value}"),
        Err(err) => eprintln!("{err}"),
    }
}
