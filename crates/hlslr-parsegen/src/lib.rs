//! # hlslr-parsegen
//!
//! A typed grammar framework with a canonical LR(1) shift-reduce engine.
//!
//! Grammar authors declare a closed set of value types with [`value_set!`],
//! then register productions as plain functions over those types. Symbols are
//! derived from the function signatures, so there is no separate symbol table
//! to keep in sync with the semantic actions. Compiling the grammar yields a
//! [`Parser`] that is immutable and can be shared between threads.

pub mod automaton;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod symbol;
pub mod value;

pub use automaton::{Action, Tables};
pub use engine::{Lexed, Parser};
pub use error::{ActionError, GrammarError, ParseError, ReduceError, WiringError};
pub use grammar::{Grammar, Production, Rule, TryRule};
pub use lexer::{patterns, LexerSpec, Match, Pattern};
pub use symbol::{Symbol, SymbolRegistry};
pub use value::{Typed, ValueSet};
