//! Declaration tree for the supported HLSL subset.
//!
//! Nodes are built bottom-up by the grammar actions and own their children.
//! Function bodies are not represented.

use serde::Serialize;
use std::fmt;

/// Root of a parsed file.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Program {
    pub declarations: DeclarationList,
}

/// Declarations in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct DeclarationList {
    pub items: Vec<AnyDecl>,
}

impl DeclarationList {
    pub fn iter(&self) -> std::slice::Iter<'_, AnyDecl> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AnyDecl {
    Var(VarDecl),
    Function(FDecl),
    Attribute(FunctionAttrib),
}

/// One name of an identifier chain, optionally with a single template
/// argument as in `StructuredBuffer<Particle>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainLink {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<LiteralValue>,
}

impl ChainLink {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: None,
        }
    }

    pub fn is_templated(&self) -> bool {
        self.template.is_some()
    }
}

impl fmt::Display for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.template {
            Some(arg) => write!(f, "{}<{}>", self.name, arg),
            None => f.write_str(&self.name),
        }
    }
}

/// Whitespace-separated names in front of a declaration: storage, qualifiers,
/// type and name, in that order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct IdentifierChain {
    pub links: Vec<ChainLink>,
}

impl IdentifierChain {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.links.iter().map(|link| link.name.as_str())
    }
}

/// Size of one array dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArrayDim {
    Literal(String),
    Named(String),
}

impl ArrayDim {
    pub fn text(&self) -> &str {
        match self {
            ArrayDim::Literal(text) | ArrayDim::Named(text) => text,
        }
    }
}

impl fmt::Display for ArrayDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ArrayQualifiers {
    pub dims: Vec<ArrayDim>,
}

impl ArrayQualifiers {
    pub fn texts(&self) -> Vec<&str> {
        self.dims.iter().map(ArrayDim::text).collect()
    }
}

/// `register(t0, space1)` style parameter: a name and at most one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterParam {
    pub name: String,
    pub index: Option<ArrayDim>,
}

/// `: NAME` or `: NAME(params)` after a declarator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Semantic {
    pub name: String,
    pub registers: Option<Vec<RegisterParam>>,
}

impl Semantic {
    pub fn registers(&self) -> &[RegisterParam] {
        self.registers.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScalarKind {
    Int,
    Float,
    Bool,
    Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scalar {
    pub kind: ScalarKind,
    pub text: String,
}

/// A literal: one scalar or a brace-enclosed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LiteralValue {
    Scalar(Scalar),
    Tree(LiteralTree),
}

impl LiteralValue {
    pub fn scalar(kind: ScalarKind, text: impl Into<String>) -> Self {
        LiteralValue::Scalar(Scalar {
            kind,
            text: text.into(),
        })
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            LiteralValue::Scalar(scalar) => Some(scalar),
            LiteralValue::Tree(_) => None,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Scalar(scalar) => f.write_str(&scalar.text),
            LiteralValue::Tree(tree) => write!(f, "{}", tree),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct LiteralTree {
    pub children: Vec<LiteralValue>,
}

impl fmt::Display for LiteralTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", child)?;
        }
        f.write_str(" }")
    }
}

/// What follows the declarator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DeclMode {
    Absent,
    Default(LiteralValue),
    Struct(Option<DeclarationList>),
}

/// A variable, struct or cbuffer declaration as written.
///
/// Both forms share one production; [`VarDecl::shape`] tells them apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarDecl {
    pub chain: IdentifierChain,
    pub dims: Option<ArrayQualifiers>,
    pub semantic: Option<Semantic>,
    pub mode: DeclMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggregateKind {
    Struct,
    CBuffer,
}

impl AggregateKind {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "struct" => Some(AggregateKind::Struct),
            "cbuffer" => Some(AggregateKind::CBuffer),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            AggregateKind::Struct => "struct",
            AggregateKind::CBuffer => "cbuffer",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructShape<'a> {
    pub kind: AggregateKind,
    pub name: &'a str,
    pub semantic: Option<&'a Semantic>,
    pub members: &'a [AnyDecl],
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableShape<'a> {
    pub storage: Option<&'a str>,
    pub qualifiers: Vec<&'a str>,
    pub ty: &'a ChainLink,
    pub name: &'a str,
    pub dims: &'a [ArrayDim],
    pub semantic: Option<&'a Semantic>,
    pub default: Option<&'a LiteralValue>,
}

impl VariableShape<'_> {
    /// True when `word` appears as storage or qualifier.
    pub fn has_modifier(&self, word: &str) -> bool {
        self.storage == Some(word) || self.qualifiers.contains(&word)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclShape<'a> {
    Struct(StructShape<'a>),
    Variable(VariableShape<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("declaration of `{name}` has no type")]
    MissingType { name: String },

    #[error("declared name `{name}` cannot take a template argument")]
    TemplatedName { name: String },

    #[error("{keyword} `{name}` is missing its body")]
    IncompleteAggregate { keyword: &'static str, name: String },

    #[error("`{name}` is not a struct or cbuffer but has a body")]
    UnexpectedBody { name: String },
}

impl VarDecl {
    /// Classifies the declaration by chain length, leading keyword and mode.
    pub fn shape(&self) -> Result<DeclShape<'_>, ShapeError> {
        let links = &self.chain.links;
        let Some(last) = links.last() else {
            return Err(ShapeError::MissingType {
                name: String::new(),
            });
        };
        if links.len() < 2 {
            return Err(ShapeError::MissingType {
                name: last.name.clone(),
            });
        }
        if last.is_templated() {
            return Err(ShapeError::TemplatedName {
                name: last.to_string(),
            });
        }

        let aggregate = match &links[0] {
            link if !link.is_templated() => AggregateKind::from_keyword(&link.name),
            _ => None,
        };
        match (&self.mode, aggregate, links.len()) {
            (DeclMode::Struct(body), Some(kind), 2) => Ok(DeclShape::Struct(StructShape {
                kind,
                name: &last.name,
                semantic: self.semantic.as_ref(),
                members: body.as_ref().map(|list| list.items.as_slice()).unwrap_or(&[]),
            })),
            (DeclMode::Struct(_), _, _) => Err(ShapeError::UnexpectedBody {
                name: last.name.clone(),
            }),
            (_, Some(kind), 2) => Err(ShapeError::IncompleteAggregate {
                keyword: kind.keyword(),
                name: last.name.clone(),
            }),
            (mode, _, len) => {
                let storage = (len >= 3).then(|| links[0].name.as_str());
                let middle = if len >= 3 { &links[1..len - 2] } else { &[][..] };
                Ok(DeclShape::Variable(VariableShape {
                    storage,
                    qualifiers: middle.iter().map(|link| link.name.as_str()).collect(),
                    ty: &links[len - 2],
                    name: &last.name,
                    dims: self.dims.as_ref().map(|d| d.dims.as_slice()).unwrap_or(&[]),
                    semantic: self.semantic.as_ref(),
                    default: match mode {
                        DeclMode::Default(value) => Some(value),
                        _ => None,
                    },
                }))
            }
        }
    }
}

/// `[name(a, b, c)]` in front of a function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionAttrib {
    pub name: String,
    pub args: [LiteralValue; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionParam {
    pub chain: IdentifierChain,
    pub dims: Option<ArrayQualifiers>,
    pub semantic: Option<Semantic>,
}

/// A function signature. The body is parsed but discarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FDecl {
    pub chain: IdentifierChain,
    pub params: Vec<FunctionParam>,
    pub semantic: Option<Semantic>,
}

impl FDecl {
    pub fn name(&self) -> &str {
        self.chain
            .links
            .last()
            .map(|link| link.name.as_str())
            .unwrap_or_default()
    }

    pub fn return_type(&self) -> Option<&ChainLink> {
        let len = self.chain.links.len();
        len.checked_sub(2).map(|i| &self.chain.links[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(names: &[&str]) -> IdentifierChain {
        IdentifierChain {
            links: names.iter().map(|n| ChainLink::plain(*n)).collect(),
        }
    }

    fn var(names: &[&str], mode: DeclMode) -> VarDecl {
        VarDecl {
            chain: chain(names),
            dims: None,
            semantic: None,
            mode,
        }
    }

    #[test]
    fn test_shape_plain_variable() {
        let decl = var(&["int", "x"], DeclMode::Absent);
        match decl.shape().unwrap() {
            DeclShape::Variable(v) => {
                assert_eq!(v.storage, None);
                assert!(v.qualifiers.is_empty());
                assert_eq!(v.ty.name, "int");
                assert_eq!(v.name, "x");
            }
            other => panic!("expected variable, got {other:?}"),
        }
    }

    #[test]
    fn test_shape_storage_and_qualifiers() {
        let default = LiteralValue::scalar(ScalarKind::Float, "2.5");
        let decl = var(
            &["static", "const", "row_major", "float4x4", "m"],
            DeclMode::Default(default.clone()),
        );
        let DeclShape::Variable(v) = decl.shape().unwrap() else {
            panic!("expected variable");
        };
        assert_eq!(v.storage, Some("static"));
        assert_eq!(v.qualifiers, vec!["const", "row_major"]);
        assert_eq!(v.ty.name, "float4x4");
        assert_eq!(v.default, Some(&default));
        assert!(v.has_modifier("const"));
        assert!(!v.has_modifier("volatile"));
    }

    #[test]
    fn test_shape_struct_and_cbuffer() {
        let members = DeclarationList {
            items: vec![AnyDecl::Var(var(&["int", "x"], DeclMode::Absent))],
        };
        let decl = var(&["cbuffer", "Globals"], DeclMode::Struct(Some(members)));
        let DeclShape::Struct(s) = decl.shape().unwrap() else {
            panic!("expected struct");
        };
        assert_eq!(s.kind, AggregateKind::CBuffer);
        assert_eq!(s.name, "Globals");
        assert_eq!(s.members.len(), 1);

        let empty = var(&["struct", "Empty"], DeclMode::Struct(None));
        assert!(matches!(empty.shape(), Ok(DeclShape::Struct(s)) if s.members.is_empty()));
    }

    #[test]
    fn test_shape_rejections() {
        assert_eq!(
            var(&["x"], DeclMode::Absent).shape().unwrap_err(),
            ShapeError::MissingType { name: "x".into() }
        );
        assert_eq!(
            var(&["struct", "Foo"], DeclMode::Absent).shape().unwrap_err(),
            ShapeError::IncompleteAggregate {
                keyword: "struct",
                name: "Foo".into()
            }
        );
        assert_eq!(
            var(&["int", "x"], DeclMode::Struct(None)).shape().unwrap_err(),
            ShapeError::UnexpectedBody { name: "x".into() }
        );

        let mut templated = var(&["int", "x"], DeclMode::Absent);
        templated.chain.links[1].template = Some(LiteralValue::scalar(ScalarKind::Int, "2"));
        assert!(matches!(
            templated.shape(),
            Err(ShapeError::TemplatedName { .. })
        ));
    }

    #[test]
    fn test_literal_display() {
        let tree = LiteralValue::Tree(LiteralTree {
            children: vec![
                LiteralValue::scalar(ScalarKind::Float, "1.0"),
                LiteralValue::Tree(LiteralTree {
                    children: vec![LiteralValue::scalar(ScalarKind::Bool, "true")],
                }),
            ],
        });
        assert_eq!(tree.to_string(), "{ 1.0, { true } }");
    }

    #[test]
    fn test_function_name_and_return_type() {
        let decl = FDecl {
            chain: chain(&["inline", "float4", "shade"]),
            params: vec![],
            semantic: None,
        };
        assert_eq!(decl.name(), "shade");
        assert_eq!(decl.return_type().map(|l| l.name.as_str()), Some("float4"));
    }
}
