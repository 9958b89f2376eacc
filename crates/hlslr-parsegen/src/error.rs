/// Error types for grammar construction and parsing.

/// A token or production action rejected its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A stored value did not have the kind its consumer was declared with.
///
/// The automaton only ever hands a production the symbols of its right-hand
/// side, so this indicates a defect in the grammar framework itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WiringError {
    #[error("expected a {expected} value but found {found}")]
    Mismatch { expected: String, found: String },

    #[error("production expected a {expected} child but the stack was exhausted")]
    MissingChild { expected: String },

    #[error("no goto from state {state} on {symbol}")]
    MissingGoto { state: usize, symbol: String },
}

/// Failure inside a reduce action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReduceError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Wiring(#[from] WiringError),
}

/// Build-time grammar defects. Never caused by parser input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("grammar has no productions")]
    Empty,

    #[error("symbol {symbol} is used but has neither a token rule nor a production")]
    UndefinedSymbol { symbol: String },

    #[error("token symbol {symbol} also appears on the left of production {production}")]
    TokenProduction { symbol: String, production: usize },

    #[error("conflict in state {state} on {symbol}: {existing} vs {incoming}")]
    Conflict {
        state: usize,
        symbol: String,
        existing: String,
        incoming: String,
    },
}

/// Per-input failure. The parser stays usable after any of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no token matches at offset {offset} near {context:?}")]
    Lexical { offset: usize, context: String },

    #[error("unexpected {found} at offset {offset}{}", expected_suffix(.expected))]
    Syntax {
        offset: usize,
        found: String,
        expected: Vec<String>,
    },

    #[error("{message} (at offset {offset})")]
    Action { offset: usize, message: String },

    #[error("internal wiring error: {0}")]
    Wiring(#[from] WiringError),
}

impl ParseError {
    /// Byte offset the error is tied to, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::Lexical { offset, .. }
            | ParseError::Syntax { offset, .. }
            | ParseError::Action { offset, .. } => Some(*offset),
            ParseError::Wiring(_) => None,
        }
    }

    /// True when the failure points at a framework defect rather than input.
    pub fn is_internal(&self) -> bool {
        matches!(self, ParseError::Wiring(_))
    }
}

fn expected_suffix(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(", expected one of: {}", expected.join(", "))
    }
}
