//! # hlslr-core
//!
//! Foundational types shared across the hlslr crates: the workspace error
//! type, the tool configuration, and mapping byte offsets to source positions.

pub mod config;
pub mod error;
pub mod span;

pub use config::*;

pub use error::{ReflectError, ReflectResult};
pub use span::{locate, SourcePos};
