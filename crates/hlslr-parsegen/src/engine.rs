//! Shift-reduce driver over compiled tables.

use std::ops::Range;

use crate::automaton::{Action, Tables};
use crate::error::{ParseError, ReduceError, WiringError};
use crate::grammar::Grammar;
use crate::lexer::LexerSpec;
use crate::symbol::{Symbol, SymbolRegistry};
use crate::value::{Typed, ValueSet};

const CONTEXT_CHARS: usize = 16;

struct Lexeme<V> {
    symbol: Symbol,
    value: Option<V>,
    start: usize,
    end: usize,
}

/// Lazily tokenizes the input as the parser asks for lookahead.
struct Tokens<'a, V> {
    spec: &'a LexerSpec<V>,
    input: &'a str,
    cursor: usize,
}

impl<'a, V> Tokens<'a, V> {
    fn next(&mut self) -> Result<Lexeme<V>, ParseError> {
        let start = self.cursor;
        let rest = &self.input[start..];
        if rest.is_empty() {
            return Ok(Lexeme {
                symbol: Symbol::END,
                value: None,
                start,
                end: start,
            });
        }
        let Some(found) = self.spec.longest_match(rest) else {
            return Err(ParseError::Lexical {
                offset: start,
                context: rest.chars().take(CONTEXT_CHARS).collect(),
            });
        };
        let lexeme = &rest[..found.len];
        let value = self
            .spec
            .convert(found.rule, lexeme)
            .map_err(|err| ParseError::Action {
                offset: start,
                message: err.message,
            })?;
        self.cursor += found.len;
        Ok(Lexeme {
            symbol: found.symbol,
            value: Some(value),
            start,
            end: self.cursor,
        })
    }
}

/// A token produced by [`Parser::tokenize`].
#[derive(Debug)]
pub struct Lexed<V> {
    pub symbol: Symbol,
    pub value: V,
    pub span: Range<usize>,
}

/// A compiled grammar. Immutable, so one instance can serve any number of
/// parses, from any number of threads.
pub struct Parser<V: ValueSet> {
    grammar: Grammar<V>,
    tables: Tables,
}

impl<V: ValueSet> Parser<V> {
    pub(crate) fn new(grammar: Grammar<V>, tables: Tables) -> Self {
        Self { grammar, tables }
    }

    pub fn registry(&self) -> &SymbolRegistry<V::Kind> {
        self.grammar.registry()
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn grammar(&self) -> &Grammar<V> {
        &self.grammar
    }

    fn name(&self, symbol: Symbol) -> String {
        if symbol == Symbol::END {
            "end of input".to_string()
        } else {
            self.registry().name(symbol).to_string()
        }
    }

    /// Runs only the lexer over `input`.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Lexed<V>>, ParseError> {
        let mut tokens = Tokens {
            spec: &self.grammar.lexer,
            input,
            cursor: 0,
        };
        let mut out = Vec::new();
        loop {
            let lexeme = tokens.next()?;
            let Some(value) = lexeme.value else {
                return Ok(out);
            };
            out.push(Lexed {
                symbol: lexeme.symbol,
                value,
                span: lexeme.start..lexeme.end,
            });
        }
    }

    /// Parses `input` as a whole and returns the start symbol's value.
    pub fn parse<T: Typed<V>>(&self, input: &str) -> Result<T, ParseError> {
        let mut tokens = Tokens {
            spec: &self.grammar.lexer,
            input,
            cursor: 0,
        };
        let mut states: Vec<usize> = vec![0];
        let mut values: Vec<V> = Vec::new();
        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut lookahead = tokens.next()?;

        loop {
            let state = states.last().copied().unwrap_or(0);
            match self.tables.action(state, lookahead.symbol) {
                Action::Shift(target) => {
                    tracing::trace!(state, target, token = %self.name(lookahead.symbol), "shift");
                    let value = lookahead.value.take().ok_or_else(|| {
                        WiringError::MissingChild {
                            expected: self.name(lookahead.symbol),
                        }
                    })?;
                    states.push(target);
                    values.push(value);
                    spans.push((lookahead.start, lookahead.end));
                    lookahead = tokens.next()?;
                }
                Action::Reduce(index) => {
                    let production = &self.grammar.productions[index];
                    let arity = production.arity();
                    let split = values.len().checked_sub(arity).ok_or_else(|| {
                        WiringError::MissingChild {
                            expected: self.name(production.lhs),
                        }
                    })?;
                    tracing::trace!(state, production = index, arity, "reduce");

                    let span = if arity == 0 {
                        (lookahead.start, lookahead.start)
                    } else {
                        (spans[split].0, spans[spans.len() - 1].1)
                    };
                    let children = values.split_off(split);
                    spans.truncate(split);
                    states.truncate(states.len() - arity);

                    let value = (production.action)(children).map_err(|err| match err {
                        ReduceError::Action(err) => ParseError::Action {
                            offset: span.0,
                            message: err.message,
                        },
                        ReduceError::Wiring(err) => ParseError::Wiring(err),
                    })?;

                    let top = states.last().copied().unwrap_or(0);
                    let target = self.tables.goto(top, production.lhs).ok_or_else(|| {
                        WiringError::MissingGoto {
                            state: top,
                            symbol: self.name(production.lhs),
                        }
                    })?;
                    states.push(target);
                    values.push(value);
                    spans.push(span);
                }
                Action::Accept => {
                    tracing::trace!(state, "accept");
                    let value = values.pop().ok_or_else(|| WiringError::MissingChild {
                        expected: format!("{:?}", T::KIND),
                    })?;
                    return T::restore(value).map_err(|found| {
                        ParseError::Wiring(WiringError::Mismatch {
                            expected: format!("{:?}", T::KIND),
                            found: format!("{:?}", found.kind()),
                        })
                    });
                }
                Action::Error => {
                    let expected = self
                        .tables
                        .expected(state)
                        .into_iter()
                        .map(|symbol| self.name(symbol))
                        .collect();
                    return Err(ParseError::Syntax {
                        offset: lookahead.start,
                        found: self.name(lookahead.symbol),
                        expected,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::lexer::{patterns, Pattern};
    use crate::value_set;

    #[derive(Debug)]
    struct Space;
    #[derive(Debug)]
    struct Plus;
    #[derive(Debug)]
    struct Times;
    #[derive(Debug, PartialEq)]
    struct Num(i64);
    #[derive(Debug, PartialEq)]
    struct Term(i64);
    #[derive(Debug, PartialEq)]
    struct Sum(i64);

    value_set! {
        enum Calc: CalcKind {
            Space(Space),
            Plus(Plus),
            Times(Times),
            Num(Num),
            Term(Term),
            Sum(Sum),
        }
    }

    fn calculator() -> Parser<Calc> {
        let mut grammar: Grammar<Calc> = Grammar::new();
        grammar
            .rule(|a: Sum, _: Plus, b: Term| Sum(a.0 + b.0))
            .rule(|t: Term| Sum(t.0))
            .rule(|a: Term, _: Times, b: Num| Term(a.0 * b.0))
            .try_rule(|n: Num| {
                if n.0 > 1000 {
                    Err(ActionError::new("operand too large"))
                } else {
                    Ok(Term(n.0))
                }
            })
            .token(Pattern::Literal("+"), |_| Plus)
            .token(Pattern::Literal("*"), |_| Times)
            .try_token(Pattern::Scan(patterns::signed_integer), |text| {
                text.parse()
                    .map(Num)
                    .map_err(|_| ActionError::new(format!("bad number {text}")))
            })
            .token(Pattern::Scan(patterns::whitespace), |_| Space);
        grammar.compile().unwrap()
    }

    #[test]
    fn test_precedence_from_grammar_shape() {
        let parser = calculator();
        assert_eq!(parser.parse::<Sum>("2+3*4").unwrap(), Sum(14));
        assert_eq!(parser.parse::<Sum>("2*3+4").unwrap(), Sum(10));
        assert_eq!(parser.parse::<Sum>("7").unwrap(), Sum(7));
    }

    #[test]
    fn test_parser_is_reusable_after_errors() {
        let parser = calculator();
        assert!(parser.parse::<Sum>("2+").is_err());
        assert!(parser.parse::<Sum>("2#").is_err());
        assert_eq!(parser.parse::<Sum>("1+1").unwrap(), Sum(2));
    }

    #[test]
    fn test_syntax_error_at_end_of_input() {
        let parser = calculator();
        let err = parser.parse::<Sum>("2+").unwrap_err();
        assert_eq!(
            err,
            ParseError::Syntax {
                offset: 2,
                found: "end of input".into(),
                expected: vec!["Num".into()],
            }
        );
    }

    #[test]
    fn test_unreferenced_token_is_syntax_error() {
        let parser = calculator();
        let err = parser.parse::<Sum>("1 +1").unwrap_err();
        match err {
            ParseError::Syntax { offset, found, .. } => {
                assert_eq!(offset, 1);
                assert_eq!(found, "Space");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_lexical_error() {
        let parser = calculator();
        let err = parser.parse::<Sum>("1+?2").unwrap_err();
        assert_eq!(
            err,
            ParseError::Lexical {
                offset: 2,
                context: "?2".into(),
            }
        );
    }

    #[test]
    fn test_action_error_points_at_reduced_span() {
        let parser = calculator();
        let err = parser.parse::<Sum>("1+2000").unwrap_err();
        assert_eq!(
            err,
            ParseError::Action {
                offset: 2,
                message: "operand too large".into(),
            }
        );
    }

    #[test]
    fn test_token_conversion_error() {
        let parser = calculator();
        let err = parser.parse::<Sum>("1+99999999999999999999").unwrap_err();
        assert!(matches!(err, ParseError::Action { offset: 2, .. }));
    }

    #[test]
    fn test_wrong_result_type_is_wiring_error() {
        let parser = calculator();
        let err = parser.parse::<Term>("3").unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_tokenize_reports_spans() {
        let parser = calculator();
        let tokens = parser.tokenize("12 *3").unwrap();
        let spans: Vec<_> = tokens.iter().map(|t| t.span.clone()).collect();
        assert_eq!(spans, vec![0..2, 2..3, 3..4, 4..5]);
        assert!(matches!(tokens[0].value, Calc::Num(Num(12))));
        assert!(matches!(tokens[1].value, Calc::Space(Space)));
        assert!(parser.tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_parser_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Parser<Calc>>();
    }
}
