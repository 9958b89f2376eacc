//! C++ reflection header generation.
//!
//! The header defines a `Generator` template parameterized over the host's
//! vector, buffer and context types. Its nested `Program` struct mirrors the
//! shader's global declarations.

use hlslr_core::{EmitConfig, ReflectError, ReflectResult};

use crate::ast::*;
use crate::preprocess::DefinesContext;

/// Compiled shader bytes, zero-padded to [`Bytecode::ALIGN`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytecode {
    data: Vec<u8>,
    len: usize,
}

impl Bytecode {
    pub const ALIGN: usize = 8;

    /// An empty blob still gets one aligned block, since C++ arrays cannot be
    /// zero-sized.
    pub fn new(mut bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        let padded = len.div_ceil(Self::ALIGN).max(1) * Self::ALIGN;
        bytes.resize(padded, 0);
        Self { data: bytes, len }
    }

    /// Size before padding.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn padded(&self) -> &[u8] {
        &self.data
    }
}

const BYTES_PER_LINE: usize = 16;

const VECTOR_ALIASES: &[(&str, &str)] = &[
    ("float", "float"),
    ("int", "int32_t"),
    ("uint", "uint32_t"),
    ("double", "double"),
];

/// A compute entry point and its dispatch size.
struct DispatchEntry<'a> {
    function: &'a str,
    size: [&'a str; 3],
}

pub struct Emitter<'c> {
    config: &'c EmitConfig,
    indent_level: usize,
    output: String,
}

impl<'c> Emitter<'c> {
    pub fn new(config: &'c EmitConfig) -> Self {
        Self {
            config,
            indent_level: 0,
            output: String::new(),
        }
    }

    fn indent(&mut self) {
        self.output
            .push_str(&" ".repeat(self.config.indent * self.indent_level));
    }

    fn push_line(&mut self, text: &str) {
        self.indent();
        self.output.push_str(text);
        self.output.push('\n');
    }

    /// Writes `text` without indentation, as preprocessor lines need.
    fn push_raw_line(&mut self, text: &str) {
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn blank(&mut self) {
        self.output.push('\n');
    }

    pub fn emit(
        mut self,
        program: &Program,
        defines: &DefinesContext,
        bytecode: Option<&Bytecode>,
        source_name: &str,
    ) -> ReflectResult<String> {
        self.push_line(&format!(
            "// Generated by hlslr from {source_name}. Do not edit."
        ));
        self.push_line("#pragma once");
        self.blank();
        self.push_line("#include <cstddef>");
        self.push_line("#include <cstdint>");
        self.blank();
        self.emit_prelude();

        self.indent_level = 1;
        self.push_line("struct Program {");
        self.indent_level = 2;

        for line in defines.defines() {
            self.push_raw_line(line);
        }

        let (structs, variables) = classify(program)?;
        for shape in &structs {
            self.emit_struct(shape)?;
            self.blank();
        }
        for shape in &variables {
            self.push_line(&variable_line(shape));
        }
        if !variables.is_empty() {
            self.blank();
        }

        let entries = self.dispatch_entries(program)?;
        for entry in &entries {
            let name = if entries.len() == 1 {
                "InvokeSize".to_string()
            } else {
                format!("{}InvokeSize", entry.function)
            };
            let [x, y, z] = entry.size;
            self.push_line(&format!(
                "static constexpr uint3 {name} = uint3({x}, {y}, {z});"
            ));
        }
        if !entries.is_empty() {
            self.blank();
        }

        self.emit_constructor(&variables);

        if let Some(bytecode) = bytecode {
            self.blank();
            self.emit_bytecode(bytecode);
        }

        for line in defines.undefs() {
            self.push_raw_line(&line);
        }

        self.indent_level = 1;
        self.push_line("};");
        self.indent_level = 0;
        self.push_line("};");

        tracing::debug!(
            structs = structs.len(),
            variables = variables.len(),
            entries = entries.len(),
            "emitted reflection header for {}",
            source_name
        );
        Ok(self.output)
    }

    fn emit_prelude(&mut self) {
        self.push_line("template<");
        self.indent_level = 1;
        self.push_line("typename VectorConfig,");
        self.push_line("typename BufferConfig,");
        self.push_line("typename Context");
        self.indent_level = 0;
        self.push_line(">");
        self.push_line("struct Generator {");
        self.indent_level = 1;

        for (hlsl, scalar) in VECTOR_ALIASES {
            self.push_line(&format!("using {hlsl}1 = {scalar};"));
            for n in 2..=4 {
                self.push_line(&format!(
                    "using {hlsl}{n} = typename VectorConfig::template Vector<{n}, {scalar}>::Type;"
                ));
            }
        }
        self.push_line("using float4x4 = typename VectorConfig::template Matrix<4, float>::Type;");

        let config = self.config;
        for buffer in &config.buffer_types {
            let kind = if buffer.starts_with("RW") {
                "RWBuffer"
            } else {
                "Buffer"
            };
            self.blank();
            self.push_line("template<typename T>");
            self.push_line(&format!(
                "using {buffer} = typename BufferConfig::template {kind}<T>::Type;"
            ));
        }
        self.blank();
    }

    fn emit_struct(&mut self, shape: &StructShape<'_>) -> ReflectResult<()> {
        if shape.members.is_empty() {
            self.push_line(&format!("struct {} {{ }};", shape.name));
            return Ok(());
        }
        self.push_line(&format!("struct {} {{", shape.name));
        self.indent_level += 1;
        for member in shape.members {
            match member {
                AnyDecl::Var(decl) => match checked_shape(decl)? {
                    DeclShape::Struct(inner) => self.emit_struct(&inner)?,
                    DeclShape::Variable(var) => self.push_line(&variable_line(&var)),
                },
                AnyDecl::Function(function) => {
                    tracing::debug!(
                        "skipping function `{}` inside `{}`",
                        function.name(),
                        shape.name
                    );
                }
                AnyDecl::Attribute(attrib) => {
                    tracing::debug!("skipping attribute `{}` inside `{}`", attrib.name, shape.name);
                }
            }
        }
        self.indent_level -= 1;
        self.push_line("};");
        Ok(())
    }

    fn dispatch_entries<'p>(&self, program: &'p Program) -> ReflectResult<Vec<DispatchEntry<'p>>> {
        let mut pending: Option<&FunctionAttrib> = None;
        let mut entries = Vec::new();
        for decl in program.declarations.iter() {
            match decl {
                AnyDecl::Attribute(attrib) => {
                    if attrib
                        .name
                        .eq_ignore_ascii_case(&self.config.dispatch_attribute)
                    {
                        pending = Some(attrib);
                    } else {
                        tracing::warn!("ignoring unknown function attribute `{}`", attrib.name);
                    }
                }
                AnyDecl::Function(function) => {
                    let Some(attrib) = pending.take() else {
                        continue;
                    };
                    let mut size = [""; 3];
                    for (slot, arg) in size.iter_mut().zip(&attrib.args) {
                        let scalar = arg.as_scalar().ok_or_else(|| {
                            ReflectError::Emit(format!(
                                "dispatch size of `{}` must be three scalars",
                                function.name()
                            ))
                        })?;
                        *slot = scalar.text.as_str();
                    }
                    entries.push(DispatchEntry {
                        function: function.name(),
                        size,
                    });
                }
                AnyDecl::Var(_) => {}
            }
        }
        if let Some(attrib) = pending {
            tracing::warn!("attribute `{}` is not followed by a function", attrib.name);
        }
        Ok(entries)
    }

    fn emit_constructor(&mut self, variables: &[VariableShape<'_>]) {
        self.push_line("inline Program(Context& ctx)");
        self.indent_level += 1;
        let config = self.config;
        let bindings = variables
            .iter()
            .filter(|var| config.buffer_types.iter().any(|b| *b == var.ty.name));
        for (i, var) in bindings.enumerate() {
            let lead = if i == 0 { ":" } else { "," };
            self.push_line(&format!("{lead} {}", binding_initializer(var)));
        }
        self.indent_level -= 1;
        self.push_line("{ }");
    }

    fn emit_bytecode(&mut self, bytecode: &Bytecode) {
        self.push_line(&format!(
            "alignas({}) static constexpr uint8_t Bytecode[{}] = {{",
            Bytecode::ALIGN,
            bytecode.padded().len()
        ));
        self.indent_level += 1;
        for chunk in bytecode.padded().chunks(BYTES_PER_LINE) {
            let line: Vec<String> = chunk.iter().map(|b| format!("0x{b:02x},")).collect();
            self.push_line(&line.join(" "));
        }
        self.indent_level -= 1;
        self.push_line("};");
        self.push_line(&format!(
            "static constexpr size_t BytecodeSize = {};",
            bytecode.len()
        ));
    }
}

fn checked_shape(decl: &VarDecl) -> ReflectResult<DeclShape<'_>> {
    decl.shape().map_err(|err| {
        ReflectError::Internal(format!("declaration reached the emitter malformed: {err}"))
    })
}

/// Splits top-level declarations into aggregates and variables.
fn classify(program: &Program) -> ReflectResult<(Vec<StructShape<'_>>, Vec<VariableShape<'_>>)> {
    let mut structs = Vec::new();
    let mut variables = Vec::new();
    for decl in program.declarations.iter() {
        if let AnyDecl::Var(decl) = decl {
            match checked_shape(decl)? {
                DeclShape::Struct(shape) => structs.push(shape),
                DeclShape::Variable(shape) => variables.push(shape),
            }
        }
    }
    Ok((structs, variables))
}

/// `Name(ctx, "Name", "profile", "kind", index)`, trailing parts optional.
fn binding_initializer(var: &VariableShape<'_>) -> String {
    let mut args = vec!["ctx".to_string(), format!("\"{}\"", var.name)];
    let registers = var.semantic.map(Semantic::registers).unwrap_or(&[]);
    if let Some(profile) = registers.first() {
        args.push(format!("\"{}\"", profile.name));
    }
    if let Some(kind) = registers.get(1) {
        args.push(format!("\"{}\"", kind.name));
        if let Some(index) = &kind.index {
            args.push(index.text().to_string());
        }
    }
    format!("{}({})", var.name, args.join(", "))
}

fn variable_line(var: &VariableShape<'_>) -> String {
    let mut line = String::new();
    if var.default.is_some() && var.has_modifier("const") {
        if var.has_modifier("static") {
            line.push_str("static constexpr ");
        } else {
            line.push_str("const ");
        }
    }
    line.push_str(&type_text(var.ty));
    line.push(' ');
    line.push_str(var.name);
    for dim in var.dims {
        line.push_str(&format!("[{}]", dim));
    }
    if let Some(value) = var.default {
        line.push_str(" = ");
        line.push_str(&cpp_literal(value));
    }
    line.push(';');
    line
}

fn type_text(link: &ChainLink) -> String {
    match &link.template {
        Some(arg) => format!("{}<{}>", link.name, cpp_literal(arg)),
        None => link.name.clone(),
    }
}

/// Literal text valid in C++. Half-precision suffixes become `f`.
fn cpp_literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Scalar(scalar) if scalar.kind == ScalarKind::Float => {
            match scalar.text.strip_suffix(['h', 'H']) {
                Some(stem) => format!("{stem}f"),
                None => scalar.text.clone(),
            }
        }
        LiteralValue::Scalar(scalar) => scalar.text.clone(),
        LiteralValue::Tree(tree) => {
            let children: Vec<String> = tree.children.iter().map(cpp_literal).collect();
            format!("{{ {} }}", children.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::HlslParser;
    use crate::preprocess::preprocess;

    fn emit(src: &str, bytecode: Option<&Bytecode>) -> String {
        let pre = preprocess(src);
        let program = HlslParser::shared().unwrap().parse(&pre.text).unwrap();
        Emitter::new(&EmitConfig::default())
            .emit(&program, &pre.defines, bytecode, "test.hlsl")
            .unwrap()
    }

    #[test]
    fn test_bytecode_padding() {
        let code = Bytecode::new(vec![1, 2, 3]);
        assert_eq!(code.len(), 3);
        assert_eq!(code.padded(), &[1, 2, 3, 0, 0, 0, 0, 0]);
        assert_eq!(Bytecode::new(vec![7; 8]).padded().len(), 8);
        assert_eq!(Bytecode::new(vec![7; 9]).padded().len(), 16);
        let empty = Bytecode::new(Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.padded().len(), 8);
    }

    #[test]
    fn test_prelude_and_banner() {
        let out = emit("", None);
        assert!(out.starts_with("// Generated by hlslr from test.hlsl. Do not edit.\n#pragma once\n"));
        assert!(out.contains("    using float3 = typename VectorConfig::template Vector<3, float>::Type;\n"));
        assert!(out.contains("    using uint1 = uint32_t;\n"));
        assert!(out.contains(
            "    using RWStructuredBuffer = typename BufferConfig::template RWBuffer<T>::Type;\n"
        ));
        assert!(out.contains("        inline Program(Context& ctx)\n        { }\n"));
        assert!(out.ends_with("    };\n};\n"));
    }

    #[test]
    fn test_structs_and_variables() {
        let out = emit(
            "struct Inner { float2 uv; };\ncbuffer Globals : register(b0) { float4x4 view; struct Nested { int n; }; };\nstatic const float scale = 2.5h;\ngroupshared float cache[64];\nuniform int flags = 3;",
            None,
        );
        assert!(out.contains("        struct Inner {\n            float2 uv;\n        };\n"));
        assert!(out.contains(
            "        struct Globals {\n            float4x4 view;\n            struct Nested {\n                int n;\n            };\n        };\n"
        ));
        assert!(out.contains("        static constexpr float scale = 2.5f;\n"));
        assert!(out.contains("        float cache[64];\n"));
        assert!(out.contains("        int flags = 3;\n"));
        assert!(!out.contains("register"));
    }

    #[test]
    fn test_defines_are_bracketed() {
        let out = emit("#define N 4\n#include \"common.hlsl\"\nfloat data[N];", None);
        let define = out.find("#define N 4\n").unwrap();
        let decl = out.find("float data[N];").unwrap();
        let undef = out.find("#undef N\n").unwrap();
        assert!(define < decl && decl < undef);
        assert!(!out.contains("common.hlsl"));
        let includes: Vec<&str> = out.lines().filter(|l| l.starts_with("#include")).collect();
        assert_eq!(includes, vec!["#include <cstddef>", "#include <cstdint>"]);
    }

    #[test]
    fn test_bindings_and_single_dispatch() {
        let out = emit(
            "struct Particle { float3 pos; };\nStructuredBuffer<Particle> Particles : register(t0, space1[2]);\nRWStructuredBuffer<Particle> Out;\n[numthreads(64, 1, 1)]\nvoid main(uint3 id : SV_DispatchThreadID) { Out[id.x] = Particles[id.x]; }",
            None,
        );
        assert!(out.contains("        StructuredBuffer<Particle> Particles;\n"));
        assert!(out.contains("        static constexpr uint3 InvokeSize = uint3(64, 1, 1);\n"));
        assert!(out.contains(
            "        inline Program(Context& ctx)\n            : Particles(ctx, \"Particles\", \"t0\", \"space1\", 2)\n            , Out(ctx, \"Out\")\n        { }\n"
        ));
    }

    #[test]
    fn test_multiple_entries_are_named() {
        let out = emit(
            "[NumThreads(8, 8, 1)] void blur() {}\n[unroll(1, 2, 3)] void helper() {}\n[numthreads(1, 1, 1)] void clear() {}",
            None,
        );
        assert!(out.contains("static constexpr uint3 blurInvokeSize = uint3(8, 8, 1);"));
        assert!(out.contains("static constexpr uint3 clearInvokeSize = uint3(1, 1, 1);"));
        assert!(!out.contains("helperInvokeSize"));
    }

    #[test]
    fn test_dispatch_needs_scalars() {
        let program = HlslParser::shared()
            .unwrap()
            .parse("[numthreads({1}, 1, 1)] void main() {}")
            .unwrap();
        let err = Emitter::new(&EmitConfig::default())
            .emit(&program, &DefinesContext::default(), None, "x.hlsl")
            .unwrap_err();
        assert!(matches!(err, ReflectError::Emit(_)));
    }

    #[test]
    fn test_bytecode_block() {
        let code = Bytecode::new((0u8..18).collect());
        let out = emit("int x;", Some(&code));
        assert!(out.contains("        alignas(8) static constexpr uint8_t Bytecode[24] = {\n"));
        assert!(out.contains(
            "            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,\n"
        ));
        assert!(out.contains("            0x10, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,\n"));
        assert!(out.contains("        static constexpr size_t BytecodeSize = 18;\n"));
    }
}
