//! Canonical LR(1) table construction.
//!
//! States are sets of LR(1) items, kept as a map from core item to its
//! lookahead set so two states are equal exactly when both cores and
//! lookaheads agree. The augmented production `$accept -> start` is numbered
//! after the user productions.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::symbol::Symbol;
use crate::value::ValueSet;

/// Parser table entry for a state and a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Error,
    Shift(usize),
    Reduce(usize),
    Accept,
}

/// Dense action and goto tables, indexed by state then symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    width: usize,
    actions: Vec<Action>,
    gotos: Vec<Option<usize>>,
    terminals: Vec<bool>,
}

impl Tables {
    pub fn state_count(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.actions.len() / self.width
        }
    }

    pub fn action(&self, state: usize, symbol: Symbol) -> Action {
        self.actions
            .get(state * self.width + symbol.index())
            .copied()
            .unwrap_or(Action::Error)
    }

    pub fn goto(&self, state: usize, symbol: Symbol) -> Option<usize> {
        self.gotos
            .get(state * self.width + symbol.index())
            .copied()
            .flatten()
    }

    /// Terminals with a non-error action in `state`, in symbol order.
    pub fn expected(&self, state: usize) -> Vec<Symbol> {
        (0..self.width)
            .filter(|index| self.terminals[*index])
            .map(Symbol::from_index)
            .filter(|symbol| self.action(state, *symbol) != Action::Error)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Item {
    production: usize,
    dot: usize,
}

type State = BTreeMap<Item, BTreeSet<Symbol>>;

struct Builder<'g, V: ValueSet> {
    grammar: &'g Grammar<V>,
    rules: Vec<(Symbol, Vec<Symbol>)>,
    by_lhs: HashMap<Symbol, Vec<usize>>,
    nullable: Vec<bool>,
    first: Vec<BTreeSet<Symbol>>,
    terminals: Vec<bool>,
}

impl<'g, V: ValueSet> Builder<'g, V> {
    fn new(grammar: &'g Grammar<V>) -> Self {
        let width = grammar.registry.len();
        let mut rules: Vec<(Symbol, Vec<Symbol>)> = grammar
            .productions
            .iter()
            .map(|p| (p.lhs, p.rhs.clone()))
            .collect();
        let start = rules[0].0;
        rules.push((Symbol::ACCEPT, vec![start]));

        let mut by_lhs: HashMap<Symbol, Vec<usize>> = HashMap::new();
        for (index, (lhs, _)) in rules.iter().enumerate() {
            by_lhs.entry(*lhs).or_default().push(index);
        }

        let terminals: Vec<bool> = grammar
            .registry
            .symbols()
            .map(|symbol| grammar.is_terminal(symbol))
            .collect();

        let mut builder = Self {
            grammar,
            rules,
            by_lhs,
            nullable: vec![false; width],
            first: vec![BTreeSet::new(); width],
            terminals,
        };
        builder.compute_first();
        builder
    }

    fn compute_first(&mut self) {
        for index in 0..self.terminals.len() {
            if self.terminals[index] {
                self.first[index].insert(Symbol::from_index(index));
            }
        }
        let mut changed = true;
        while changed {
            changed = false;
            for (lhs, rhs) in &self.rules {
                let target = lhs.index();
                let mut all_nullable = true;
                for symbol in rhs {
                    let additions: Vec<Symbol> = self.first[symbol.index()]
                        .difference(&self.first[target])
                        .copied()
                        .collect();
                    if !additions.is_empty() {
                        self.first[target].extend(additions);
                        changed = true;
                    }
                    if !self.nullable[symbol.index()] {
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable && !self.nullable[target] {
                    self.nullable[target] = true;
                    changed = true;
                }
            }
        }
    }

    /// FIRST of `sequence` followed by `tail`.
    fn first_of(&self, sequence: &[Symbol], tail: &BTreeSet<Symbol>) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        for symbol in sequence {
            out.extend(self.first[symbol.index()].iter().copied());
            if !self.nullable[symbol.index()] {
                return out;
            }
        }
        out.extend(tail.iter().copied());
        out
    }

    fn next_symbol(&self, item: Item) -> Option<Symbol> {
        self.rules[item.production].1.get(item.dot).copied()
    }

    fn closure(&self, mut state: State) -> State {
        let mut pending: Vec<Item> = state.keys().copied().collect();
        while let Some(item) = pending.pop() {
            let Some(next) = self.next_symbol(item) else {
                continue;
            };
            if self.terminals[next.index()] {
                continue;
            }
            let rest = &self.rules[item.production].1[item.dot + 1..];
            let lookahead = self.first_of(rest, &state[&item]);
            for production in self.by_lhs.get(&next).into_iter().flatten() {
                let candidate = Item {
                    production: *production,
                    dot: 0,
                };
                let entry = state.entry(candidate).or_default();
                let before = entry.len();
                entry.extend(lookahead.iter().copied());
                if entry.len() != before {
                    pending.push(candidate);
                }
            }
        }
        state
    }

    fn advance(&self, state: &State, symbol: Symbol) -> State {
        let kernel: State = state
            .iter()
            .filter(|(item, _)| self.next_symbol(**item) == Some(symbol))
            .map(|(item, lookahead)| {
                (
                    Item {
                        production: item.production,
                        dot: item.dot + 1,
                    },
                    lookahead.clone(),
                )
            })
            .collect();
        self.closure(kernel)
    }

    fn build(self) -> Result<Tables, GrammarError> {
        let width = self.terminals.len();
        let accept_rule = self.rules.len() - 1;

        let mut initial = State::new();
        initial.insert(
            Item {
                production: accept_rule,
                dot: 0,
            },
            BTreeSet::from([Symbol::END]),
        );
        let mut states = vec![self.closure(initial)];
        let mut index_of: HashMap<State, usize> = HashMap::new();
        index_of.insert(states[0].clone(), 0);
        let mut transitions: Vec<Vec<(Symbol, usize)>> = Vec::new();

        let mut cursor = 0;
        while cursor < states.len() {
            let outgoing: BTreeSet<Symbol> = states[cursor]
                .keys()
                .filter_map(|item| self.next_symbol(*item))
                .collect();
            let mut edges = Vec::with_capacity(outgoing.len());
            for symbol in outgoing {
                let target = self.advance(&states[cursor], symbol);
                let next = match index_of.get(&target) {
                    Some(existing) => *existing,
                    None => {
                        states.push(target.clone());
                        index_of.insert(target, states.len() - 1);
                        states.len() - 1
                    }
                };
                edges.push((symbol, next));
            }
            transitions.push(edges);
            cursor += 1;
        }

        let mut actions = vec![Action::Error; states.len() * width];
        let mut gotos = vec![None; states.len() * width];
        for (state_index, state) in states.iter().enumerate() {
            for (symbol, target) in &transitions[state_index] {
                let cell = state_index * width + symbol.index();
                if self.terminals[symbol.index()] {
                    self.set(&mut actions, state_index, *symbol, Action::Shift(*target))?;
                } else {
                    gotos[cell] = Some(*target);
                }
            }
            for (item, lookahead) in state {
                if item.dot < self.rules[item.production].1.len() {
                    continue;
                }
                let action = if item.production == accept_rule {
                    Action::Accept
                } else {
                    Action::Reduce(item.production)
                };
                for symbol in lookahead {
                    self.set(&mut actions, state_index, *symbol, action)?;
                }
            }
        }

        Ok(Tables {
            width,
            actions,
            gotos,
            terminals: self.terminals,
        })
    }

    fn set(
        &self,
        actions: &mut [Action],
        state: usize,
        symbol: Symbol,
        action: Action,
    ) -> Result<(), GrammarError> {
        let width = self.terminals.len();
        let cell = &mut actions[state * width + symbol.index()];
        if *cell == Action::Error || *cell == action {
            *cell = action;
            return Ok(());
        }
        Err(GrammarError::Conflict {
            state,
            symbol: self.grammar.registry.name(symbol).to_string(),
            existing: self.describe(*cell),
            incoming: self.describe(action),
        })
    }

    fn describe(&self, action: Action) -> String {
        match action {
            Action::Error => "error".to_string(),
            Action::Shift(target) => format!("shift to state {target}"),
            Action::Reduce(production) => format!("reduce {}", self.grammar.describe(production)),
            Action::Accept => "accept".to_string(),
        }
    }
}

pub(crate) fn build<V: ValueSet>(grammar: &Grammar<V>) -> Result<Tables, GrammarError> {
    Builder::new(grammar).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Pattern;
    use crate::value_set;

    #[derive(Debug)]
    struct Id;
    #[derive(Debug)]
    struct Plus;
    #[derive(Debug)]
    struct Expr;
    #[derive(Debug)]
    struct Opt;

    value_set! {
        enum Toy: ToyKind {
            Id(Id),
            Plus(Plus),
            Expr(Expr),
            Opt(Opt),
        }
    }

    fn symbol(grammar: &Grammar<Toy>, kind: ToyKind) -> Symbol {
        grammar.registry.get(kind).unwrap()
    }

    #[test]
    fn test_first_and_nullable() {
        let mut grammar: Grammar<Toy> = Grammar::new();
        grammar.rule(|_: Opt, _: Id| Expr);
        grammar.rule(|| Opt);
        grammar.rule(|_: Plus| Opt);
        grammar.token(Pattern::Literal("x"), |_| Id);
        grammar.token(Pattern::Literal("+"), |_| Plus);

        let builder = Builder::new(&grammar);
        let opt = symbol(&grammar, ToyKind::Opt);
        let expr = symbol(&grammar, ToyKind::Expr);
        let id = symbol(&grammar, ToyKind::Id);
        let plus = symbol(&grammar, ToyKind::Plus);
        assert!(builder.nullable[opt.index()]);
        assert!(!builder.nullable[expr.index()]);
        assert_eq!(builder.first[expr.index()], BTreeSet::from([id, plus]));
    }

    #[test]
    fn test_left_recursive_grammar_builds() {
        let mut grammar: Grammar<Toy> = Grammar::new();
        grammar.rule(|_: Expr, _: Plus, _: Id| Expr);
        grammar.rule(|_: Id| Expr);
        grammar.token(Pattern::Literal("x"), |_| Id);
        grammar.token(Pattern::Literal("+"), |_| Plus);

        let tables = build(&grammar).unwrap();
        let id = symbol(&grammar, ToyKind::Id);
        let plus = symbol(&grammar, ToyKind::Plus);
        assert!(matches!(tables.action(0, id), Action::Shift(_)));
        assert_eq!(tables.action(0, plus), Action::Error);
        assert_eq!(tables.expected(0), vec![id]);
    }

    #[test]
    fn test_ambiguous_grammar_reports_conflict() {
        let mut grammar: Grammar<Toy> = Grammar::new();
        grammar.rule(|_: Expr, _: Plus, _: Expr| Expr);
        grammar.rule(|_: Id| Expr);
        grammar.token(Pattern::Literal("x"), |_| Id);
        grammar.token(Pattern::Literal("+"), |_| Plus);

        let err = build(&grammar).unwrap_err();
        match err {
            GrammarError::Conflict {
                symbol,
                existing,
                incoming,
                ..
            } => {
                assert_eq!(symbol, "Plus");
                let both = format!("{existing} / {incoming}");
                assert!(both.contains("shift"));
                assert!(both.contains("reduce Expr -> Expr Plus Expr"));
            }
            other => panic!("expected a conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_reduce_reduce_conflict() {
        let mut grammar: Grammar<Toy> = Grammar::new();
        grammar.rule(|_: Opt| Expr);
        grammar.rule(|_: Id| Expr);
        grammar.rule(|_: Id| Opt);
        grammar.token(Pattern::Literal("x"), |_| Id);

        assert!(matches!(
            build(&grammar),
            Err(GrammarError::Conflict { .. })
        ));
    }
}
