//! # hlslr-lang
//!
//! HLSL declaration reflection.
//! Strips comments and directives from a shader, parses its global
//! declarations into an AST, then emits a C++ header describing them.

pub mod ast;
pub mod emitter;
pub mod grammar;
pub mod preprocess;
pub mod tokens;

pub use ast::{AnyDecl, DeclShape, FDecl, FunctionAttrib, Program, VarDecl};
pub use emitter::{Bytecode, Emitter};
pub use grammar::{declaration_grammar, token_text, HlslParser, Node};
pub use preprocess::{preprocess, DefinesContext, Preprocessed};

use hlslr_core::{EmitConfig, ReflectError, ReflectResult};

/// Preprocesses and parses `source`. `file` only labels diagnostics.
pub fn parse_source(source: &str, file: &str) -> ReflectResult<(Program, DefinesContext)> {
    let pre = preprocess(source);
    let parser = HlslParser::shared()?;
    let program = parser
        .parse(&pre.text)
        .map_err(|err| ReflectError::from_parse(err, file, source))?;
    tracing::debug!(
        declarations = program.declarations.len(),
        directives = pre.defines.lines.len(),
        "parsed {}",
        file
    );
    Ok((program, pre.defines))
}

/// Runs the whole pipeline and returns the header text.
pub fn reflect(
    source: &str,
    file: &str,
    bytecode: Option<&Bytecode>,
    config: &EmitConfig,
) -> ReflectResult<String> {
    let (program, defines) = parse_source(source, file)?;
    Emitter::new(config).emit(&program, &defines, bytecode, file)
}
