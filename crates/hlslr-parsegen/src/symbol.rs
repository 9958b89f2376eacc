//! Grammar symbols and the registry that hands them out.
//!
//! Every distinct value kind used by a grammar is assigned exactly one
//! [`Symbol`] the first time it is referenced. Terminals and nonterminals share
//! the same numbering; which one a symbol is depends on whether a token rule or
//! a production produces it.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Identifier of a grammar category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// End of input. Never produced by a token rule.
    pub const END: Symbol = Symbol(0);
    /// Augmented start symbol used by the automaton to accept.
    pub const ACCEPT: Symbol = Symbol(1);

    pub(crate) const RESERVED: usize = 2;

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Symbol(index as u32)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Entry<K> {
    kind: Option<K>,
    name: String,
}

/// Bijection between value kinds and symbols.
///
/// Owned by a single [`Grammar`](crate::Grammar); once the grammar is compiled
/// the registry moves into the [`Parser`](crate::Parser) and can no longer be
/// extended.
#[derive(Debug, Clone)]
pub struct SymbolRegistry<K> {
    by_kind: HashMap<K, Symbol>,
    entries: Vec<Entry<K>>,
}

impl<K> SymbolRegistry<K>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            by_kind: HashMap::new(),
            entries: vec![
                Entry {
                    kind: None,
                    name: "$end".to_string(),
                },
                Entry {
                    kind: None,
                    name: "$accept".to_string(),
                },
            ],
        }
    }

    /// Returns the symbol for `kind`, allocating the next one on first use.
    pub fn identify(&mut self, kind: K) -> Symbol {
        if let Some(symbol) = self.by_kind.get(&kind) {
            return *symbol;
        }
        let symbol = Symbol::from_index(self.entries.len());
        self.entries.push(Entry {
            kind: Some(kind),
            name: format!("{:?}", kind),
        });
        self.by_kind.insert(kind, symbol);
        symbol
    }

    /// Looks up a symbol without allocating.
    pub fn get(&self, kind: K) -> Option<Symbol> {
        self.by_kind.get(&kind).copied()
    }

    /// The value kind behind a symbol, `None` for the reserved symbols.
    pub fn kind_of(&self, symbol: Symbol) -> Option<K> {
        self.entries.get(symbol.index()).and_then(|entry| entry.kind)
    }

    pub fn name(&self, symbol: Symbol) -> &str {
        self.entries
            .get(symbol.index())
            .map(|entry| entry.name.as_str())
            .unwrap_or("<unknown>")
    }

    /// Number of symbols, reserved ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == Symbol::RESERVED
    }

    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        (0..self.entries.len()).map(Symbol::from_index)
    }
}

impl<K> Default for SymbolRegistry<K>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Number,
        Plus,
        Sum,
    }

    #[test]
    fn test_identify_is_stable() {
        let mut registry = SymbolRegistry::new();
        let number = registry.identify(Kind::Number);
        let plus = registry.identify(Kind::Plus);
        assert_ne!(number, plus);
        assert_eq!(registry.identify(Kind::Number), number);
        assert_eq!(registry.len(), Symbol::RESERVED + 2);
    }

    #[test]
    fn test_numbering_follows_first_use() {
        let mut registry = SymbolRegistry::new();
        let sum = registry.identify(Kind::Sum);
        let number = registry.identify(Kind::Number);
        assert_eq!(sum.index(), Symbol::RESERVED);
        assert_eq!(number.index(), Symbol::RESERVED + 1);
    }

    #[test]
    fn test_reverse_lookup() {
        let mut registry = SymbolRegistry::new();
        let plus = registry.identify(Kind::Plus);
        assert_eq!(registry.kind_of(plus), Some(Kind::Plus));
        assert_eq!(registry.name(plus), "Plus");
        assert_eq!(registry.name(Symbol::END), "$end");
        assert_eq!(registry.kind_of(Symbol::ACCEPT), None);
        assert_eq!(registry.get(Kind::Sum), None);
    }

    #[test]
    fn test_symbols_cover_reserved_and_allocated() {
        let mut registry = SymbolRegistry::new();
        let number = registry.identify(Kind::Number);
        let sum = registry.identify(Kind::Sum);
        let all: Vec<Symbol> = registry.symbols().collect();
        assert_eq!(all, vec![Symbol::END, Symbol::ACCEPT, number, sum]);
        assert_eq!(all.len(), registry.len());
    }
}
