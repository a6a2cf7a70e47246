//! Grammar construction from a structured description.
//!
//! The builder accepts the same shape a grammar file parses into: a start
//! symbol, declared tokens, productions as name sequences, and operator
//! lines. `build()` interns every name, classifies it, augments the start
//! rule and resolves per-production precedence.

use hashbrown::HashMap;
use lasso::Rodeo;
use smallvec::SmallVec;

use crate::error::GrammarError;
use crate::grammar::{
    Assoc, Grammar, Precedence, Production, ProductionId, SymbolEntry, SymbolId, SymbolKind,
};

struct RawRule {
    lhs: String,
    rhs: Vec<String>,
    prec: Option<String>,
}

/// Builder for [`Grammar`].
///
/// Classification rules: declared tokens (plus the reserved `error` and
/// `$end`) are terminals; every rule's left-hand side is a nonterminal; a
/// right-hand-side name that is neither fails with
/// [`GrammarError::UndeclaredSymbol`].
#[derive(Default)]
pub struct GrammarBuilder {
    start: Option<String>,
    tokens: Vec<String>,
    rules: Vec<RawRule>,
    operators: Vec<(Assoc, Vec<String>)>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: None,
            tokens: Vec::new(),
            rules: Vec::new(),
            operators: Vec::new(),
        }
    }

    /// Declare the start symbol.
    #[must_use]
    pub fn start(mut self, name: impl Into<String>) -> Self {
        self.start = Some(name.into());
        self
    }

    /// Declare a single terminal.
    #[must_use]
    pub fn token(mut self, name: impl Into<String>) -> Self {
        self.tokens.push(name.into());
        self
    }

    /// Declare several terminals at once.
    #[must_use]
    pub fn tokens<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add a production. An empty `rhs` declares an ε-production.
    #[must_use]
    pub fn rule<I, S>(mut self, lhs: impl Into<String>, rhs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push(RawRule {
            lhs: lhs.into(),
            rhs: rhs.into_iter().map(Into::into).collect(),
            prec: None,
        });
        self
    }

    /// Add a production whose precedence is pinned to the given terminal
    /// instead of being inferred from its right-hand side.
    #[must_use]
    pub fn rule_with_prec<I, S>(
        mut self,
        lhs: impl Into<String>,
        rhs: I,
        prec: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push(RawRule {
            lhs: lhs.into(),
            rhs: rhs.into_iter().map(Into::into).collect(),
            prec: Some(prec.into()),
        });
        self
    }

    /// Declare a left-associative operator line. Each operator line binds
    /// tighter than the ones before it.
    #[must_use]
    pub fn left<I, S>(self, terminals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operator_line(Assoc::Left, terminals)
    }

    /// Declare a right-associative operator line.
    #[must_use]
    pub fn right<I, S>(self, terminals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operator_line(Assoc::Right, terminals)
    }

    /// Declare a non-associative operator line.
    #[must_use]
    pub fn nonassoc<I, S>(self, terminals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operator_line(Assoc::NonAssoc, terminals)
    }

    fn operator_line<I, S>(mut self, assoc: Assoc, terminals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operators
            .push((assoc, terminals.into_iter().map(Into::into).collect()));
        self
    }

    /// Build the grammar.
    ///
    /// # Errors
    ///
    /// - [`GrammarError::EmptyGrammar`] if no rules were added.
    /// - [`GrammarError::NoStart`] if no start symbol was declared.
    /// - [`GrammarError::TokenDefinedAsRule`] if a declared token appears as
    ///   a left-hand side.
    /// - [`GrammarError::UndeclaredSymbol`] if a right-hand side, operator
    ///   line, `%prec` annotation or the start symbol names something that
    ///   cannot be classified.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }
        let start_name = self.start.ok_or(GrammarError::NoStart)?;

        type IdMap = HashMap<lasso::Spur, SymbolId, ahash::RandomState>;

        fn define(
            interner: &mut Rodeo,
            symbols: &mut Vec<SymbolEntry>,
            ids: &mut IdMap,
            name: &str,
            kind: SymbolKind,
        ) -> SymbolId {
            let spur = interner.get_or_intern(name);
            *ids.entry(spur).or_insert_with(|| {
                let id = SymbolId::new(symbols.len() as u32);
                symbols.push(SymbolEntry { name: spur, kind });
                id
            })
        }

        fn lookup(interner: &Rodeo, ids: &IdMap, name: &str) -> Option<SymbolId> {
            interner.get(name).and_then(|spur| ids.get(&spur).copied())
        }

        let mut interner = Rodeo::new();
        let mut symbols = Vec::new();
        let mut ids: IdMap = HashMap::default();

        // Reserved ids 0..=2.
        define(&mut interner, &mut symbols, &mut ids, "$accept", SymbolKind::Nonterminal);
        define(&mut interner, &mut symbols, &mut ids, "$end", SymbolKind::Terminal);
        define(&mut interner, &mut symbols, &mut ids, "error", SymbolKind::Terminal);

        for token in &self.tokens {
            define(&mut interner, &mut symbols, &mut ids, token, SymbolKind::Terminal);
        }

        // Left-hand sides become nonterminals; a name already interned as a
        // terminal cannot be classified consistently.
        for rule in &self.rules {
            let id = define(&mut interner, &mut symbols, &mut ids, &rule.lhs, SymbolKind::Nonterminal);
            if symbols[id.index()].kind == SymbolKind::Terminal {
                return Err(GrammarError::TokenDefinedAsRule(rule.lhs.clone()));
            }
        }

        let start = lookup(&interner, &ids, &start_name)
            .filter(|&id| symbols[id.index()].kind == SymbolKind::Nonterminal)
            .ok_or_else(|| GrammarError::UndeclaredSymbol(start_name.clone()))?;

        // Operator lines assign increasing precedence levels.
        let mut operators: HashMap<SymbolId, Precedence, ahash::RandomState> = HashMap::default();
        for (line, (assoc, terminals)) in self.operators.iter().enumerate() {
            let level = line as u32 + 1;
            for name in terminals {
                let id = lookup(&interner, &ids, name)
                    .filter(|&id| symbols[id.index()].kind == SymbolKind::Terminal)
                    .ok_or_else(|| GrammarError::UndeclaredSymbol(name.clone()))?;
                operators.insert(id, Precedence { level, assoc: *assoc });
            }
        }

        let mut productions = Vec::with_capacity(self.rules.len() + 1);
        productions.push(Production::new(
            ProductionId::AUGMENTED,
            SymbolId::ACCEPT,
            SmallVec::from_slice(&[start]),
            None,
        ));

        for rule in &self.rules {
            let lhs = lookup(&interner, &ids, &rule.lhs)
                .ok_or_else(|| GrammarError::UndeclaredSymbol(rule.lhs.clone()))?;
            let mut rhs: SmallVec<[SymbolId; 4]> = SmallVec::with_capacity(rule.rhs.len());
            for name in &rule.rhs {
                let id = lookup(&interner, &ids, name)
                    .ok_or_else(|| GrammarError::UndeclaredSymbol(name.clone()))?;
                rhs.push(id);
            }

            let precedence = match &rule.prec {
                Some(name) => {
                    let id = lookup(&interner, &ids, name)
                        .filter(|&id| symbols[id.index()].kind == SymbolKind::Terminal)
                        .ok_or_else(|| GrammarError::UndeclaredSymbol(name.clone()))?;
                    operators.get(&id).copied()
                }
                // Rightmost terminal with a declared precedence.
                None => rhs
                    .iter()
                    .rev()
                    .filter(|&&sym| symbols[sym.index()].kind == SymbolKind::Terminal)
                    .find_map(|sym| operators.get(sym).copied()),
            };

            let id = ProductionId::new(productions.len() as u32);
            productions.push(Production::new(id, lhs, rhs, precedence));
        }

        Ok(Grammar::from_parts(
            interner,
            symbols,
            ids,
            productions,
            start,
            operators,
        ))
    }
}
