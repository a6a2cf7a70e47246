//! Shift-reduce runtime tests: acceptance, rejection with expected sets,
//! semantic actions, precedence-driven tree shape, early accept,
//! cancellation, concurrent sharing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tabula::{
    Algorithm, Grammar, IterTokens, Location, LrTable, ParseConfig, ParseError, Recognize,
    ReduceContext, Reduced, Scanned, SemanticError, Semantics, build,
};

/// One [`Scanned`] per name, with the name as text and one column each.
fn tokens(table: &LrTable, names: &[&str]) -> IterTokens<std::vec::IntoIter<Scanned>> {
    let scanned: Vec<Scanned> = names
        .iter()
        .enumerate()
        .map(|(column, name)| {
            let terminal = table
                .symbol(name)
                .unwrap_or_else(|| panic!("unknown terminal `{name}`"));
            Scanned::new(terminal, *name, Location::point(1, column as u32))
        })
        .collect();
    IterTokens::new(scanned)
}

fn simple_table() -> LrTable {
    let grammar = Grammar::builder()
        .start("S")
        .tokens(["a", "b", "c"])
        .rule("S", ["a", "B"])
        .rule("B", ["b"])
        .rule("B", ["c"])
        .build()
        .unwrap();
    build(&grammar, Algorithm::Lalr1).as_lr().unwrap().clone()
}

fn recognize(table: &LrTable, names: &[&str]) -> Result<(), ParseError> {
    let mut lexer = tokens(table, names);
    table.parse(&mut lexer, &mut Recognize, &mut (), &ParseConfig::default())
}

#[test]
fn accepts_valid_inputs() {
    let table = simple_table();
    assert!(recognize(&table, &["a", "b"]).is_ok());
    assert!(recognize(&table, &["a", "c"]).is_ok());
}

#[test]
fn premature_end_reports_the_expected_set() {
    let table = simple_table();
    let err = recognize(&table, &["a"]).unwrap_err();
    let syntax = err.as_syntax().expect("syntax error");
    assert_eq!(syntax.expected, vec!["b", "c"]);
    assert!(!syntax.recoverable);
    assert_eq!(syntax.line, 1);
}

#[test]
fn trailing_input_reports_expected_end() {
    let table = simple_table();
    let err = recognize(&table, &["a", "b", "c"]).unwrap_err();
    let syntax = err.as_syntax().expect("syntax error");
    assert_eq!(syntax.expected, vec!["$end"]);
    assert_eq!(syntax.text, "c");
}

#[test]
fn wrong_first_token_reports_position() {
    let table = simple_table();
    let err = recognize(&table, &["b"]).unwrap_err();
    let syntax = err.as_syntax().expect("syntax error");
    assert_eq!(syntax.expected, vec!["a"]);
    assert_eq!(syntax.column, 0);
    assert!(syntax.message.contains("unexpected `b`"));
}

#[test]
fn same_fault_has_a_stable_fingerprint() {
    let table = simple_table();
    let first = recognize(&table, &["b"]).unwrap_err();
    let second = recognize(&table, &["b"]).unwrap_err();
    assert_eq!(
        first.as_syntax().unwrap().context_hash,
        second.as_syntax().unwrap().context_hash
    );
    let elsewhere = recognize(&table, &["a"]).unwrap_err();
    assert_ne!(
        first.as_syntax().unwrap().context_hash,
        elsewhere.as_syntax().unwrap().context_hash
    );
}

/// Builds parenthesized expression strings, so the tree shape is
/// observable.
struct ExprText;

impl Semantics for ExprText {
    type Value = String;
    type Shared = ();

    fn token_value(&mut self, token: &Scanned, _shared: &mut ()) -> String {
        token.text.to_string()
    }

    fn reduce(
        &mut self,
        ctx: &ReduceContext<'_, String>,
        _shared: &mut (),
    ) -> Result<Reduced<String>, SemanticError> {
        let value = match (ctx.production.index(), ctx.values) {
            (1, [lhs, _, rhs]) => format!("({lhs}+{rhs})"),
            (2, [lhs, _, rhs]) => format!("({lhs}*{rhs})"),
            (3, [_, inner, _]) => inner.clone(),
            (_, values) => values.first().cloned().unwrap_or_default(),
        };
        Ok(Reduced::Value(value))
    }
}

fn expression_table() -> LrTable {
    let grammar = Grammar::builder()
        .start("E")
        .tokens(["+", "*", "(", ")", "id"])
        .left(["+"])
        .left(["*"])
        .rule("E", ["E", "+", "E"])
        .rule("E", ["E", "*", "E"])
        .rule("E", ["(", "E", ")"])
        .rule("E", ["id"])
        .build()
        .unwrap();
    build(&grammar, Algorithm::Lalr1).as_lr().unwrap().clone()
}

#[test]
fn precedence_shapes_the_tree() {
    let table = expression_table();
    let mut lexer = tokens(&table, &["id", "+", "id", "*", "id"]);
    let tree = table
        .parse(&mut lexer, &mut ExprText, &mut (), &ParseConfig::default())
        .unwrap();
    assert_eq!(tree, "(id+(id*id))");
}

#[test]
fn left_associativity_shapes_the_tree() {
    let table = expression_table();
    let mut lexer = tokens(&table, &["id", "+", "id", "+", "id"]);
    let tree = table
        .parse(&mut lexer, &mut ExprText, &mut (), &ParseConfig::default())
        .unwrap();
    assert_eq!(tree, "((id+id)+id)");
}

#[test]
fn parentheses_override_precedence() {
    let table = expression_table();
    let mut lexer = tokens(&table, &["(", "id", "+", "id", ")", "*", "id"]);
    let tree = table
        .parse(&mut lexer, &mut ExprText, &mut (), &ParseConfig::default())
        .unwrap();
    assert_eq!(tree, "((id+id)*id)");
}

#[test]
fn reduce_spans_cover_the_whole_handle() {
    struct SpanCheck;
    impl Semantics for SpanCheck {
        type Value = Location;
        type Shared = ();

        fn token_value(&mut self, token: &Scanned, _shared: &mut ()) -> Location {
            token.location
        }

        fn reduce(
            &mut self,
            ctx: &ReduceContext<'_, Location>,
            _shared: &mut (),
        ) -> Result<Reduced<Location>, SemanticError> {
            if let (Some(first), Some(last)) = (ctx.locations.first(), ctx.locations.last()) {
                assert_eq!(ctx.span.first_column, first.first_column);
                assert_eq!(ctx.span.last_column, last.last_column);
            }
            Ok(Reduced::Value(ctx.span))
        }
    }

    let table = expression_table();
    let mut lexer = tokens(&table, &["id", "+", "id"]);
    let span = table
        .parse(&mut lexer, &mut SpanCheck, &mut (), &ParseConfig::default())
        .unwrap();
    assert_eq!(span.first_column, 0);
    assert_eq!(span.last_column, 2);
}

#[test]
fn early_accept_short_circuits_the_parse() {
    struct Bail;
    impl Semantics for Bail {
        type Value = &'static str;
        type Shared = ();

        fn token_value(&mut self, _token: &Scanned, _shared: &mut ()) -> &'static str {
            "token"
        }

        fn reduce(
            &mut self,
            _ctx: &ReduceContext<'_, &'static str>,
            _shared: &mut (),
        ) -> Result<Reduced<&'static str>, SemanticError> {
            Ok(Reduced::Finished("bailed"))
        }
    }

    let table = simple_table();
    // The tail of the stream is garbage the parser never reaches.
    let mut lexer = tokens(&table, &["a", "b", "c", "c", "c"]);
    let value = table
        .parse(&mut lexer, &mut Bail, &mut (), &ParseConfig::default())
        .unwrap();
    assert_eq!(value, "bailed");
}

#[test]
fn semantic_errors_propagate_unchanged() {
    struct Refuse;
    impl Semantics for Refuse {
        type Value = ();
        type Shared = ();

        fn token_value(&mut self, _token: &Scanned, _shared: &mut ()) {}

        fn reduce(
            &mut self,
            _ctx: &ReduceContext<'_, ()>,
            _shared: &mut (),
        ) -> Result<Reduced<()>, SemanticError> {
            Err(SemanticError::new("value out of range"))
        }
    }

    let table = simple_table();
    let mut lexer = tokens(&table, &["a", "b"]);
    let err = table
        .parse(&mut lexer, &mut Refuse, &mut (), &ParseConfig::default())
        .unwrap_err();
    assert!(matches!(err, ParseError::Semantic(e) if e.message == "value out of range"));
}

#[test]
fn cancellation_aborts_the_parse() {
    let table = simple_table();
    let flag = Arc::new(AtomicBool::new(true));
    let config = ParseConfig {
        cancel: Some(Arc::clone(&flag)),
    };
    let mut lexer = tokens(&table, &["a", "b"]);
    let err = table
        .parse(&mut lexer, &mut Recognize, &mut (), &config)
        .unwrap_err();
    assert_eq!(err, ParseError::Cancelled);

    flag.store(false, Ordering::Relaxed);
    let mut lexer = tokens(&table, &["a", "b"]);
    assert!(table.parse(&mut lexer, &mut Recognize, &mut (), &config).is_ok());
}

#[test]
fn one_table_serves_concurrent_parses() {
    let table = expression_table();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let mut lexer = tokens(&table, &["id", "*", "(", "id", "+", "id", ")"]);
                let tree = table
                    .parse(&mut lexer, &mut ExprText, &mut (), &ParseConfig::default())
                    .unwrap();
                assert_eq!(tree, "(id*(id+id))");
            });
        }
    });
}

#[test]
fn default_reductions_do_not_change_the_language() {
    use tabula::BuildConfig;

    let grammar = Grammar::builder()
        .start("S")
        .tokens(["a", "b", "c"])
        .rule("S", ["a", "B"])
        .rule("B", ["b"])
        .rule("B", ["c"])
        .build()
        .unwrap();
    let compressed = build(&grammar, Algorithm::Lalr1).as_lr().unwrap().clone();
    let plain_config = BuildConfig {
        default_reductions: false,
        prune_unreachable: false,
    };
    let plain = tabula::build_with(&grammar, Algorithm::Lalr1, &plain_config)
        .as_lr()
        .unwrap()
        .clone();

    for input in [
        &["a", "b"][..],
        &["a", "c"][..],
        &["a"][..],
        &["b"][..],
        &["a", "b", "c"][..],
    ] {
        let with = recognize(&compressed, input).is_ok();
        let without = recognize(&plain, input).is_ok();
        assert_eq!(with, without, "{input:?}");
    }
}
