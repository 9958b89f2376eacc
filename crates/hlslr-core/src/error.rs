/// Core error types for hlslr.
use hlslr_parsegen::{GrammarError, ParseError};
use std::path::PathBuf;

use crate::span::{locate, SourcePos};

/// A specialized Result type for hlslr operations.
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Top-level error type encompassing all hlslr stages.
#[derive(Debug, thiserror::Error)]
pub enum ReflectError {
    #[error("parse error: {message} at {file}:{pos}")]
    Parse {
        message: String,
        file: String,
        pos: SourcePos,
    },

    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {message} ({path:?})")]
    Io {
        message: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("emit error: {0}")]
    Emit(String),
}

impl ReflectError {
    /// Create a parse error with source location.
    pub fn parse(message: impl Into<String>, file: impl Into<String>, pos: SourcePos) -> Self {
        ReflectError::Parse {
            message: message.into(),
            file: file.into(),
            pos,
        }
    }

    /// Where a parse error points, `None` for every other kind.
    pub fn position(&self) -> Option<SourcePos> {
        match self {
            ReflectError::Parse { pos, .. } => Some(*pos),
            _ => None,
        }
    }

    /// Convert an engine error for `file`, resolving its offset in `source`.
    ///
    /// Wiring failures are framework defects and become [`ReflectError::Internal`].
    pub fn from_parse(err: ParseError, file: impl Into<String>, source: &str) -> Self {
        match err.offset() {
            Some(offset) if !err.is_internal() => {
                let pos = locate(source, offset);
                let message = match &err {
                    ParseError::Action { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                Self::parse(message, file, pos)
            }
            _ => ReflectError::Internal(err.to_string()),
        }
    }

    /// Create an IO error tied to a path.
    pub fn io(message: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReflectError::Io {
            message: message.into(),
            path: path.into(),
            source,
        }
    }
}
