//! Table-construction tests: grammar validation, conflict detection and
//! resolution, determinism.

use tabula::{
    Action, Algorithm, Assoc, ConflictKind, Grammar, GrammarError, SymbolId, Table, build,
};

fn simple_grammar() -> Grammar {
    // S -> a B ; B -> b | c
    Grammar::builder()
        .start("S")
        .tokens(["a", "b", "c"])
        .rule("S", ["a", "B"])
        .rule("B", ["b"])
        .rule("B", ["c"])
        .build()
        .expect("grammar builds")
}

fn expression_grammar() -> Grammar {
    // E -> E + E | E * E | ( E ) | id, with * binding tighter than +.
    Grammar::builder()
        .start("E")
        .tokens(["+", "*", "(", ")", "id"])
        .left(["+"])
        .left(["*"])
        .rule("E", ["E", "+", "E"])
        .rule("E", ["E", "*", "E"])
        .rule("E", ["(", "E", ")"])
        .rule("E", ["id"])
        .build()
        .expect("grammar builds")
}

const LR_ALGORITHMS: [Algorithm; 4] = [
    Algorithm::Lr0,
    Algorithm::Slr1,
    Algorithm::Lalr1,
    Algorithm::Lr1,
];

#[test]
fn empty_grammar_fails() {
    let err = Grammar::builder().start("S").build().unwrap_err();
    assert_eq!(err, GrammarError::EmptyGrammar);
}

#[test]
fn missing_start_fails() {
    let err = Grammar::builder()
        .token("a")
        .rule("S", ["a"])
        .build()
        .unwrap_err();
    assert_eq!(err, GrammarError::NoStart);
}

#[test]
fn undeclared_symbol_fails_with_its_name() {
    // S -> A with no production for A.
    let err = Grammar::builder()
        .start("S")
        .rule("S", ["A"])
        .build()
        .unwrap_err();
    assert_eq!(err, GrammarError::UndeclaredSymbol("A".to_string()));
}

#[test]
fn simple_grammar_is_conflict_free_above_lr0() {
    for algorithm in [Algorithm::Slr1, Algorithm::Lalr1, Algorithm::Lr1] {
        let table = build(&simple_grammar(), algorithm);
        assert!(table.conflicts().is_empty(), "{algorithm}");
    }
}

#[test]
fn builds_are_deterministic() {
    for algorithm in LR_ALGORITHMS {
        let first = build(&simple_grammar(), algorithm);
        let second = build(&simple_grammar(), algorithm);
        assert_eq!(first, second, "{algorithm}");

        let first = build(&expression_grammar(), algorithm);
        let second = build(&expression_grammar(), algorithm);
        assert_eq!(first, second, "{algorithm}");
    }
    let first = build(&simple_grammar(), Algorithm::Ll1);
    let second = build(&simple_grammar(), Algorithm::Ll1);
    assert_eq!(first, second);
}

#[test]
fn accept_is_unique() {
    for algorithm in LR_ALGORITHMS {
        let table = build(&expression_grammar(), algorithm);
        let table = table.as_lr().unwrap();
        let accepts = table
            .actions()
            .filter(|&(_, symbol, action)| {
                assert!(
                    action != Action::Accept || symbol == SymbolId::EOF,
                    "accept off the $end column"
                );
                action == Action::Accept
            })
            .count();
        assert_eq!(accepts, 1, "{algorithm}");
    }
}

#[test]
fn lr0_reports_conflicts_that_slr_resolves() {
    // S -> A ; A -> a A | ε. In LR(0) the start state both shifts `a` and
    // reduces the ε-production on every terminal; SLR narrows the
    // reduction to FOLLOW(A) = {$end}.
    let grammar = Grammar::builder()
        .start("S")
        .tokens(["a"])
        .rule("S", ["A"])
        .rule("A", ["a", "A"])
        .rule("A", Vec::<String>::new())
        .build()
        .unwrap();

    let lr0 = build(&grammar, Algorithm::Lr0);
    assert!(
        lr0.conflicts()
            .iter()
            .any(|c| c.kind == ConflictKind::ShiftReduce)
    );

    let slr = build(&grammar, Algorithm::Slr1);
    assert!(slr.conflicts().is_empty());
}

#[test]
fn ambiguous_grammar_reports_reduce_reduce_on_eof() {
    // S -> a B | a C ; B -> b ; C -> b. The input `ab` has two parses, so
    // every LR variant ends up with both completed items live on $end.
    let grammar = Grammar::builder()
        .start("S")
        .tokens(["a", "b"])
        .rule("S", ["a", "B"])
        .rule("S", ["a", "C"])
        .rule("B", ["b"])
        .rule("C", ["b"])
        .build()
        .unwrap();

    for algorithm in [Algorithm::Lalr1, Algorithm::Lr1] {
        let table = build(&grammar, algorithm);
        let reduce_reduce: Vec<_> = table
            .conflicts()
            .iter()
            .filter(|c| c.kind == ConflictKind::ReduceReduce)
            .collect();
        assert!(!reduce_reduce.is_empty(), "{algorithm}");
        assert!(
            reduce_reduce.iter().all(|c| c.lookahead == SymbolId::EOF),
            "{algorithm}"
        );
        // Resolution keeps the earlier production.
        let b = grammar.symbol("B").unwrap();
        let kept = match reduce_reduce[0].chosen {
            Action::Reduce(p) => grammar.production(p).lhs(),
            other => panic!("unexpected resolution {other:?}"),
        };
        assert_eq!(kept, b);
    }
}

#[test]
fn lalr_merging_introduces_conflicts_lr1_does_not_have() {
    // The textbook LALR/LR(1) separator: merging the `e`-states unions
    // lookaheads {c} and {d} on both reductions.
    let grammar = Grammar::builder()
        .start("S")
        .tokens(["a", "b", "c", "d", "e"])
        .rule("S", ["a", "E", "c"])
        .rule("S", ["a", "F", "d"])
        .rule("S", ["b", "F", "c"])
        .rule("S", ["b", "E", "d"])
        .rule("E", ["e"])
        .rule("F", ["e"])
        .build()
        .unwrap();

    let lr1 = build(&grammar, Algorithm::Lr1);
    assert!(lr1.conflicts().is_empty());

    let lalr = build(&grammar, Algorithm::Lalr1);
    assert!(
        lalr.conflicts()
            .iter()
            .any(|c| c.kind == ConflictKind::ReduceReduce)
    );
}

#[test]
fn lalr_state_count_never_exceeds_lr1() {
    for grammar in [simple_grammar(), expression_grammar()] {
        let lr1 = build(&grammar, Algorithm::Lr1);
        let lalr = build(&grammar, Algorithm::Lalr1);
        let (Table::Lr(lr1), Table::Lr(lalr)) = (lr1, lalr) else {
            panic!("LR algorithms yield LR tables");
        };
        assert!(lalr.state_count() <= lr1.state_count());
    }
}

#[test]
fn precedence_resolves_the_expression_grammar_silently() {
    for algorithm in [Algorithm::Slr1, Algorithm::Lalr1, Algorithm::Lr1] {
        let table = build(&expression_grammar(), algorithm);
        assert_eq!(table.conflicts().len(), 0, "{algorithm}");
    }
}

#[test]
fn without_precedence_the_expression_grammar_conflicts() {
    let grammar = Grammar::builder()
        .start("E")
        .tokens(["+", "id"])
        .rule("E", ["E", "+", "E"])
        .rule("E", ["id"])
        .build()
        .unwrap();
    let table = build(&grammar, Algorithm::Lalr1);
    let conflicts = table.conflicts();
    assert!(!conflicts.is_empty());
    // The fallback keeps the shift.
    assert!(
        conflicts
            .iter()
            .all(|c| matches!(c.chosen, Action::Shift(_)))
    );
}

#[test]
fn nonassoc_writes_explicit_error_cells() {
    // E -> E < E | id with `<` nonassociative: `a < b < c` must be a
    // syntax error, expressed as an explicit error cell.
    let grammar = Grammar::builder()
        .start("E")
        .tokens(["<", "id"])
        .nonassoc(["<"])
        .rule("E", ["E", "<", "E"])
        .rule("E", ["id"])
        .build()
        .unwrap();
    let table = build(&grammar, Algorithm::Lalr1);
    assert!(table.conflicts().is_empty());
    let table = table.as_lr().unwrap();
    let has_error_cell = table
        .actions()
        .any(|(_, _, action)| action == Action::Error);
    assert!(has_error_cell);
}

#[test]
fn left_associativity_prefers_reduce() {
    let table = build(&expression_grammar(), Algorithm::Lalr1);
    let table = table.as_lr().unwrap();
    let plus = table.symbol("+").unwrap();
    // Some state must reduce E -> E + E on `+` itself: that is what left
    // associativity means.
    let grammar = expression_grammar();
    let e = grammar.symbol("E").unwrap();
    let add = grammar.productions_of(e)[0];
    let reduces_add_on_plus = table.actions().any(|(_, symbol, action)| {
        symbol == plus && action == Action::Reduce(add)
    });
    assert!(reduces_add_on_plus);
}

#[test]
fn assoc_levels_are_distinct() {
    let grammar = expression_grammar();
    let plus = grammar.symbol("+").unwrap();
    let star = grammar.symbol("*").unwrap();
    let plus_prec = grammar.terminal_precedence(plus).unwrap();
    let star_prec = grammar.terminal_precedence(star).unwrap();
    assert_eq!(plus_prec.assoc, Assoc::Left);
    assert!(star_prec.level > plus_prec.level);
}
