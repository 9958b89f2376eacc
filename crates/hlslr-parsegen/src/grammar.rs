//! Typed grammar builder.
//!
//! Productions are ordinary functions. The builder reads the right-hand side
//! from the parameter types and the left-hand side from the return type:
//!
//! ```ignore
//! grammar.rule(|list: DeclarationList, decl: AnyDecl| list.with(decl));
//! grammar.rule(|| MaybeSpace);
//! grammar.token(Pattern::Literal(";"), |_| Semicolon);
//! ```
//!
//! A zero-argument function declares an empty production. Registration order
//! fixes production numbering and the first production's left-hand side is
//! the start symbol.

use crate::automaton::{self, Tables};
use crate::engine::Parser;
use crate::error::{ActionError, GrammarError, ReduceError, WiringError};
use crate::lexer::{LexerSpec, Pattern, TokenRule};
use crate::symbol::{Symbol, SymbolRegistry};
use crate::value::{Typed, ValueSet};

pub(crate) type ReduceFn<V> = Box<dyn Fn(Vec<V>) -> Result<V, ReduceError> + Send + Sync>;

/// A registered production.
pub struct Production<V> {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
    pub(crate) action: ReduceFn<V>,
}

impl<V> Production<V> {
    pub fn arity(&self) -> usize {
        self.rhs.len()
    }
}

/// Functions usable as an infallible production.
pub trait Rule<V: ValueSet, Args>: Send + Sync + 'static {
    type Output: Typed<V>;

    fn rhs(registry: &mut SymbolRegistry<V::Kind>) -> Vec<Symbol>;

    fn apply(&self, children: Vec<V>) -> Result<V, ReduceError>;
}

/// Functions usable as a production that may reject its children.
pub trait TryRule<V: ValueSet, Args>: Send + Sync + 'static {
    type Output: Typed<V>;

    fn rhs(registry: &mut SymbolRegistry<V::Kind>) -> Vec<Symbol>;

    fn apply(&self, children: Vec<V>) -> Result<V, ReduceError>;
}

fn restore<V, T>(child: Option<V>) -> Result<T, WiringError>
where
    V: ValueSet,
    T: Typed<V>,
{
    let child = child.ok_or_else(|| WiringError::MissingChild {
        expected: format!("{:?}", T::KIND),
    })?;
    T::restore(child).map_err(|found| WiringError::Mismatch {
        expected: format!("{:?}", T::KIND),
        found: format!("{:?}", found.kind()),
    })
}

macro_rules! impl_rules {
    ($($arg:ident $val:ident),*) => {
        impl<V, F, R, $($arg,)*> Rule<V, ($($arg,)*)> for F
        where
            V: ValueSet,
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: Typed<V>,
            $($arg: Typed<V>,)*
        {
            type Output = R;

            #[allow(unused_variables)]
            fn rhs(registry: &mut SymbolRegistry<V::Kind>) -> Vec<Symbol> {
                vec![$(registry.identify(<$arg as Typed<V>>::KIND)),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn apply(&self, children: Vec<V>) -> Result<V, ReduceError> {
                let mut children = children.into_iter();
                $(let $val = restore::<V, $arg>(children.next())?;)*
                Ok((self)($($val),*).erase())
            }
        }

        impl<V, F, R, $($arg,)*> TryRule<V, ($($arg,)*)> for F
        where
            V: ValueSet,
            F: Fn($($arg),*) -> Result<R, ActionError> + Send + Sync + 'static,
            R: Typed<V>,
            $($arg: Typed<V>,)*
        {
            type Output = R;

            #[allow(unused_variables)]
            fn rhs(registry: &mut SymbolRegistry<V::Kind>) -> Vec<Symbol> {
                vec![$(registry.identify(<$arg as Typed<V>>::KIND)),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn apply(&self, children: Vec<V>) -> Result<V, ReduceError> {
                let mut children = children.into_iter();
                $(let $val = restore::<V, $arg>(children.next())?;)*
                Ok((self)($($val),*)?.erase())
            }
        }
    };
}

impl_rules!();
impl_rules!(A1 a1);
impl_rules!(A1 a1, A2 a2);
impl_rules!(A1 a1, A2 a2, A3 a3);
impl_rules!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_rules!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_rules!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_rules!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_rules!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);
impl_rules!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9);
impl_rules!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10);
impl_rules!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11);
impl_rules!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11, A12 a12);

/// Symbols, productions and token rules of a language over the value set `V`.
pub struct Grammar<V: ValueSet> {
    pub(crate) registry: SymbolRegistry<V::Kind>,
    pub(crate) productions: Vec<Production<V>>,
    pub(crate) lexer: LexerSpec<V>,
}

impl<V: ValueSet> Grammar<V> {
    pub fn new() -> Self {
        Self {
            registry: SymbolRegistry::new(),
            productions: Vec::new(),
            lexer: LexerSpec::new(),
        }
    }

    /// Registers `production` with symbols taken from its signature.
    pub fn rule<Args, P>(&mut self, production: P) -> &mut Self
    where
        P: Rule<V, Args>,
    {
        let lhs = self
            .registry
            .identify(<P::Output as Typed<V>>::KIND);
        let rhs = P::rhs(&mut self.registry);
        self.productions.push(Production {
            lhs,
            rhs,
            action: Box::new(move |children| production.apply(children)),
        });
        self
    }

    /// Like [`rule`](Self::rule), for productions returning `Result`.
    pub fn try_rule<Args, P>(&mut self, production: P) -> &mut Self
    where
        P: TryRule<V, Args>,
    {
        let lhs = self
            .registry
            .identify(<P::Output as Typed<V>>::KIND);
        let rhs = P::rhs(&mut self.registry);
        self.productions.push(Production {
            lhs,
            rhs,
            action: Box::new(move |children| production.apply(children)),
        });
        self
    }

    /// Registers a token rule producing `T` from the matched text.
    pub fn token<T, F>(&mut self, pattern: Pattern, convert: F) -> &mut Self
    where
        T: Typed<V>,
        F: Fn(&str) -> T + Send + Sync + 'static,
    {
        let symbol = self.registry.identify(T::KIND);
        self.lexer.push(TokenRule {
            symbol,
            pattern,
            convert: Box::new(move |lexeme| Ok(convert(lexeme).erase())),
        });
        self
    }

    /// Registers a token rule whose conversion may reject the lexeme.
    pub fn try_token<T, F>(&mut self, pattern: Pattern, convert: F) -> &mut Self
    where
        T: Typed<V>,
        F: Fn(&str) -> Result<T, ActionError> + Send + Sync + 'static,
    {
        let symbol = self.registry.identify(T::KIND);
        self.lexer.push(TokenRule {
            symbol,
            pattern,
            convert: Box::new(move |lexeme| convert(lexeme).map(|value| value.erase())),
        });
        self
    }

    pub fn registry(&self) -> &SymbolRegistry<V::Kind> {
        &self.registry
    }

    pub fn productions(&self) -> &[Production<V>] {
        &self.productions
    }

    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        symbol == Symbol::END || self.lexer.produces(symbol)
    }

    /// Human-readable form of production `index`, e.g. `Sum -> Sum Plus Number`.
    pub fn describe(&self, index: usize) -> String {
        let production = &self.productions[index];
        let mut text = format!("{} ->", self.registry.name(production.lhs));
        if production.rhs.is_empty() {
            text.push_str(" ε");
        }
        for symbol in &production.rhs {
            text.push(' ');
            text.push_str(self.registry.name(*symbol));
        }
        text
    }

    /// Checks the grammar and builds its LR(1) tables.
    pub fn compile(self) -> Result<Parser<V>, GrammarError> {
        self.validate()?;
        let tables: Tables = automaton::build(&self)?;
        tracing::debug!(
            symbols = self.registry.len(),
            productions = self.productions.len(),
            tokens = self.lexer.len(),
            states = tables.state_count(),
            "compiled grammar"
        );
        Ok(Parser::new(self, tables))
    }

    fn validate(&self) -> Result<(), GrammarError> {
        if self.productions.is_empty() {
            return Err(GrammarError::Empty);
        }
        for (index, production) in self.productions.iter().enumerate() {
            if self.is_terminal(production.lhs) {
                return Err(GrammarError::TokenProduction {
                    symbol: self.registry.name(production.lhs).to_string(),
                    production: index,
                });
            }
            for symbol in &production.rhs {
                let defined = self.is_terminal(*symbol)
                    || self.productions.iter().any(|p| p.lhs == *symbol);
                if !defined {
                    return Err(GrammarError::UndefinedSymbol {
                        symbol: self.registry.name(*symbol).to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<V: ValueSet> Default for Grammar<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_set;

    #[derive(Debug, PartialEq)]
    struct Num(i64);
    #[derive(Debug)]
    struct Plus;
    #[derive(Debug, PartialEq)]
    struct Sum(i64);

    value_set! {
        enum Calc: CalcKind {
            Num(Num),
            Plus(Plus),
            Sum(Sum),
        }
    }

    #[test]
    fn test_symbols_come_from_signature() {
        let mut grammar: Grammar<Calc> = Grammar::new();
        grammar.rule(|a: Sum, _: Plus, b: Num| Sum(a.0 + b.0));
        grammar.rule(|n: Num| Sum(n.0));

        let sum = grammar.registry().get(CalcKind::Sum).unwrap();
        let plus = grammar.registry().get(CalcKind::Plus).unwrap();
        let num = grammar.registry().get(CalcKind::Num).unwrap();
        assert_eq!(grammar.productions()[0].lhs, sum);
        assert_eq!(grammar.productions()[0].rhs, vec![sum, plus, num]);
        assert_eq!(grammar.productions()[1].rhs, vec![num]);
        assert_eq!(grammar.describe(0), "Sum -> Sum Plus Num");
    }

    #[test]
    fn test_action_restores_and_erases() {
        let mut grammar: Grammar<Calc> = Grammar::new();
        grammar.rule(|a: Sum, _: Plus, b: Num| Sum(a.0 + b.0));
        let out = (grammar.productions()[0].action)(vec![
            Calc::Sum(Sum(2)),
            Calc::Plus(Plus),
            Calc::Num(Num(3)),
        ])
        .unwrap();
        assert!(matches!(out, Calc::Sum(Sum(5))));
    }

    #[test]
    fn test_action_reports_wiring_mismatch() {
        let mut grammar: Grammar<Calc> = Grammar::new();
        grammar.rule(|n: Num| Sum(n.0));
        let err = (grammar.productions()[0].action)(vec![Calc::Plus(Plus)]).unwrap_err();
        assert_eq!(
            err,
            ReduceError::Wiring(WiringError::Mismatch {
                expected: "Num".into(),
                found: "Plus".into(),
            })
        );
    }

    #[test]
    fn test_try_rule_surfaces_action_error() {
        let mut grammar: Grammar<Calc> = Grammar::new();
        grammar.try_rule(|n: Num| {
            if n.0 < 0 {
                Err(ActionError::new("negative"))
            } else {
                Ok(Sum(n.0))
            }
        });
        let err = (grammar.productions()[0].action)(vec![Calc::Num(Num(-1))]).unwrap_err();
        assert_eq!(err, ReduceError::Action(ActionError::new("negative")));
    }

    #[test]
    fn test_empty_production() {
        let mut grammar: Grammar<Calc> = Grammar::new();
        grammar.rule(|| Sum(0));
        assert!(grammar.productions()[0].rhs.is_empty());
        assert_eq!(grammar.describe(0), "Sum -> ε");
    }

    #[test]
    fn test_validate_rejects_undefined_symbol() {
        let mut grammar: Grammar<Calc> = Grammar::new();
        grammar.rule(|n: Num| Sum(n.0));
        let err = grammar.compile().err().unwrap();
        assert_eq!(
            err,
            GrammarError::UndefinedSymbol {
                symbol: "Num".into()
            }
        );
    }

    #[test]
    fn test_validate_rejects_token_on_lhs() {
        let mut grammar: Grammar<Calc> = Grammar::new();
        grammar.rule(|_: Plus| Num(0));
        grammar.token(Pattern::Literal("+"), |_| Plus);
        grammar.token(Pattern::Literal("1"), |_| Num(1));
        let err = grammar.compile().err().unwrap();
        assert!(matches!(err, GrammarError::TokenProduction { production: 0, .. }));
    }

    #[test]
    fn test_validate_rejects_empty_grammar() {
        let grammar: Grammar<Calc> = Grammar::new();
        assert_eq!(grammar.compile().err(), Some(GrammarError::Empty));
    }
}
