//! The HLSL declaration grammar.
//!
//! Every production is a plain function over the value types below; the
//! framework reads the symbols from the signatures. Optional whitespace is
//! threaded explicitly through [`MaybeSpace`], so a production only accepts
//! space where it names it.

use std::sync::OnceLock;

use hlslr_parsegen::{
    patterns, value_set, ActionError, Grammar, GrammarError, Lexed, ParseError, Parser, Pattern,
};

use crate::ast::*;
use crate::tokens::*;

/// Optional whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct MaybeSpace;

/// `,` with optional whitespace on both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSeparator;

/// One `[dim]` with its trailing whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscript(pub ArrayDim);

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterList(pub Vec<RegisterParam>);

/// Parenthesized register parameters of a semantic.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterParams(pub Vec<RegisterParam>);

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValue(pub LiteralValue);

#[derive(Debug, Clone, PartialEq)]
pub struct StructBody(pub Option<DeclarationList>);

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralList(pub Vec<LiteralValue>);

#[derive(Debug, Clone, PartialEq)]
pub struct AttribArgs(pub [LiteralValue; 3]);

/// A function up to its body.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub chain: IdentifierChain,
    pub params: Vec<FunctionParam>,
    pub semantic: Option<Semantic>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamList(pub Vec<FunctionParam>);

#[derive(Debug, Clone, PartialEq)]
pub struct Params(pub Vec<FunctionParam>);

/// A balanced `{ ... }` whose contents are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope;

#[derive(Debug, Clone, PartialEq)]
pub struct AnyToken;

#[derive(Debug, Clone, PartialEq)]
pub struct AnyTokens;

#[derive(Debug, Clone, PartialEq)]
pub struct AnyOp;

value_set! {
    /// Every value the declaration grammar puts on the parse stack.
    #[derive(PartialEq)]
    pub enum Node: NodeKind {
        Space(Space),
        Semicolon(Semicolon),
        Equals(Equals),
        Colon(Colon),
        Comma(Comma),
        Ident(Ident),
        IntLit(IntLit),
        FloatLit(FloatLit),
        Op(Op),
        LBrace(LBrace),
        RBrace(RBrace),
        LBrack(LBrack),
        RBrack(RBrack),
        LParen(LParen),
        RParen(RParen),
        Less(Less),
        Greater(Greater),

        MaybeSpace(MaybeSpace),
        ListSeparator(ListSeparator),

        ChainLink(ChainLink),
        IdentifierChain(IdentifierChain),
        ArrayDim(ArrayDim),
        Subscript(Subscript),
        ArrayQualifiers(ArrayQualifiers),
        MaybeArrayQualifiers(Option<ArrayQualifiers>),

        Semantic(Semantic),
        MaybeSemantic(Option<Semantic>),
        RegisterParam(RegisterParam),
        RegisterList(RegisterList),
        RegisterParams(RegisterParams),
        MaybeRegisterParams(Option<RegisterParams>),

        DefaultValue(DefaultValue),
        StructBody(StructBody),
        DeclMode(DeclMode),
        VarDecl(VarDecl),
        FDecl(FDecl),
        FunctionAttrib(FunctionAttrib),
        AnyDecl(AnyDecl),
        DeclarationList(DeclarationList),
        MaybeDeclarationList(Option<DeclarationList>),
        Program(Program),

        LiteralValue(LiteralValue),
        LiteralList(LiteralList),

        AttribArgs(AttribArgs),
        Signature(Signature),
        ParamList(ParamList),
        Params(Params),
        MaybeParams(Option<Params>),
        FunctionParam(FunctionParam),

        Scope(Scope),
        AnyToken(AnyToken),
        AnyTokens(AnyTokens),
        AnyOp(AnyOp),
    }
}

/// Source text of a token value, `None` for nonterminals.
pub fn token_text(node: &Node) -> Option<String> {
    let text = match node {
        Node::Space(_) => Space.to_string(),
        Node::Semicolon(t) => t.to_string(),
        Node::Equals(t) => t.to_string(),
        Node::Colon(t) => t.to_string(),
        Node::Comma(t) => t.to_string(),
        Node::Ident(t) => t.to_string(),
        Node::IntLit(t) => t.to_string(),
        Node::FloatLit(t) => t.to_string(),
        Node::Op(t) => t.to_string(),
        Node::LBrace(t) => t.to_string(),
        Node::RBrace(t) => t.to_string(),
        Node::LBrack(t) => t.to_string(),
        Node::RBrack(t) => t.to_string(),
        Node::LParen(t) => t.to_string(),
        Node::RParen(t) => t.to_string(),
        Node::Less(t) => t.to_string(),
        Node::Greater(t) => t.to_string(),
        _ => return None,
    };
    Some(text)
}

fn register_param(
    id: Ident,
    _: MaybeSpace,
    dims: Option<ArrayQualifiers>,
) -> Result<RegisterParam, ActionError> {
    let mut dims = dims.map(|q| q.dims).unwrap_or_default();
    if dims.len() > 1 {
        return Err(ActionError::new(format!(
            "register parameter `{}` takes at most one index, found {}",
            id.0,
            dims.len()
        )));
    }
    Ok(RegisterParam {
        name: id.0,
        index: dims.pop(),
    })
}

fn var_decl(
    chain: IdentifierChain,
    _: MaybeSpace,
    dims: Option<ArrayQualifiers>,
    semantic: Option<Semantic>,
    mode: DeclMode,
    _: Semicolon,
    _: MaybeSpace,
) -> Result<VarDecl, ActionError> {
    let decl = VarDecl {
        chain,
        dims,
        semantic,
        mode,
    };
    if let Err(err) = decl.shape() {
        return Err(ActionError::new(err.to_string()));
    }
    Ok(decl)
}

fn signature(
    chain: IdentifierChain,
    _: MaybeSpace,
    params: ParamList,
    _: MaybeSpace,
    semantic: Option<Semantic>,
) -> Result<Signature, ActionError> {
    match chain.links.last() {
        Some(name) if chain.len() < 2 => {
            return Err(ActionError::new(format!(
                "function `{}` needs a return type",
                name.name
            )))
        }
        Some(name) if name.is_templated() => {
            return Err(ActionError::new(format!(
                "function name `{}` cannot take a template argument",
                name
            )))
        }
        _ => {}
    }
    Ok(Signature {
        chain,
        params: params.0,
        semantic,
    })
}

fn add_declarations(g: &mut Grammar<Node>) {
    g.rule(|_: MaybeSpace, list: Option<DeclarationList>| Program {
        declarations: list.unwrap_or_default(),
    })
    .rule(|| None::<DeclarationList>)
    .rule(|list: DeclarationList| Some(list))
    .rule(|decl: AnyDecl| DeclarationList { items: vec![decl] })
    .rule(|mut list: DeclarationList, decl: AnyDecl| {
        list.items.push(decl);
        list
    })
    .rule(|decl: VarDecl| AnyDecl::Var(decl))
    .rule(|decl: FDecl| AnyDecl::Function(decl))
    .rule(|attrib: FunctionAttrib| AnyDecl::Attribute(attrib));

    g.rule(|| MaybeSpace)
        .rule(|_: Space| MaybeSpace)
        .rule(|_: MaybeSpace, _: Comma, _: MaybeSpace| ListSeparator);
}

fn add_literals(g: &mut Grammar<Node>) {
    g.rule(|n: IntLit| LiteralValue::scalar(ScalarKind::Int, n.text))
        .rule(|f: FloatLit| LiteralValue::scalar(ScalarKind::Float, f.text))
        .rule(|id: Ident| {
            let kind = if matches!(id.0.as_str(), "true" | "false") {
                ScalarKind::Bool
            } else {
                ScalarKind::Identifier
            };
            LiteralValue::scalar(kind, id.0)
        })
        .rule(
            |_: LBrace, _: MaybeSpace, list: LiteralList, _: MaybeSpace, _: RBrace| {
                LiteralValue::Tree(LiteralTree { children: list.0 })
            },
        )
        .rule(|value: LiteralValue| LiteralList(vec![value]))
        .rule(|mut list: LiteralList, _: ListSeparator, value: LiteralValue| {
            list.0.push(value);
            list
        });
}

fn add_variables(g: &mut Grammar<Node>) {
    // int a[4][N] : register(b0, space1) = { 0 };
    g.rule(|id: Ident| ChainLink::plain(id.0))
        .rule(
            |id: Ident, _: Less, _: MaybeSpace, arg: LiteralValue, _: MaybeSpace, _: Greater| {
                ChainLink {
                    name: id.0,
                    template: Some(arg),
                }
            },
        )
        .rule(|link: ChainLink| IdentifierChain { links: vec![link] })
        .rule(|mut chain: IdentifierChain, _: MaybeSpace, link: ChainLink| {
            chain.links.push(link);
            chain
        });

    g.rule(|n: IntLit| ArrayDim::Literal(n.text))
        .rule(|id: Ident| ArrayDim::Named(id.0))
        .rule(
            |_: LBrack, _: MaybeSpace, dim: ArrayDim, _: MaybeSpace, _: RBrack, _: MaybeSpace| {
                Subscript(dim)
            },
        )
        .rule(|s: Subscript| ArrayQualifiers { dims: vec![s.0] })
        .rule(|mut q: ArrayQualifiers, s: Subscript| {
            q.dims.push(s.0);
            q
        })
        .rule(|| None::<ArrayQualifiers>)
        .rule(|q: ArrayQualifiers| Some(q));

    g.try_rule(register_param)
        .rule(|p: RegisterParam| RegisterList(vec![p]))
        .rule(
            |mut list: RegisterList, _: Comma, _: MaybeSpace, p: RegisterParam| {
                list.0.push(p);
                list
            },
        )
        .rule(
            |_: LParen, _: MaybeSpace, list: RegisterList, _: RParen, _: MaybeSpace| {
                RegisterParams(list.0)
            },
        )
        .rule(|| None::<RegisterParams>)
        .rule(|p: RegisterParams| Some(p))
        .rule(
            |_: Colon, _: MaybeSpace, id: Ident, _: MaybeSpace, regs: Option<RegisterParams>| {
                Semantic {
                    name: id.0,
                    registers: regs.map(|r| r.0),
                }
            },
        )
        .rule(|| None::<Semantic>)
        .rule(|s: Semantic| Some(s));

    g.rule(|_: Equals, _: MaybeSpace, value: LiteralValue, _: MaybeSpace| DefaultValue(value))
        .rule(
            |_: LBrace, _: MaybeSpace, body: Option<DeclarationList>, _: RBrace, _: MaybeSpace| {
                StructBody(body)
            },
        )
        .rule(|| DeclMode::Absent)
        .rule(|d: DefaultValue| DeclMode::Default(d.0))
        .rule(|b: StructBody| DeclMode::Struct(b.0))
        .try_rule(var_decl);
}

fn add_functions(g: &mut Grammar<Node>) {
    // [numthreads(8, 8, 1)]
    g.rule(
        |_: LParen,
         _: MaybeSpace,
         x: LiteralValue,
         _: ListSeparator,
         y: LiteralValue,
         _: ListSeparator,
         z: LiteralValue,
         _: MaybeSpace,
         _: RParen| AttribArgs([x, y, z]),
    )
    .rule(
        |_: LBrack,
         _: MaybeSpace,
         id: Ident,
         _: MaybeSpace,
         args: AttribArgs,
         _: MaybeSpace,
         _: RBrack,
         _: MaybeSpace| FunctionAttrib {
            name: id.0,
            args: args.0,
        },
    );

    g.rule(
        |chain: IdentifierChain, _: MaybeSpace, dims: Option<ArrayQualifiers>, semantic: Option<Semantic>| {
            FunctionParam {
                chain,
                dims,
                semantic,
            }
        },
    )
    .rule(|p: FunctionParam| Params(vec![p]))
    .rule(|mut params: Params, _: Comma, _: MaybeSpace, p: FunctionParam| {
        params.0.push(p);
        params
    })
    .rule(|| None::<Params>)
    .rule(|p: Params| Some(p))
    .rule(|_: LParen, _: MaybeSpace, params: Option<Params>, _: RParen| {
        ParamList(params.map(|p| p.0).unwrap_or_default())
    })
    .try_rule(signature)
    .rule(|sig: Signature, _: Scope, _: MaybeSpace| FDecl {
        chain: sig.chain,
        params: sig.params,
        semantic: sig.semantic,
    });

    // Bodies are balanced braces over any token.
    g.rule(|_: LBrace, _: RBrace| Scope)
        .rule(|_: LBrace, _: AnyTokens, _: RBrace| Scope)
        .rule(|_: AnyToken| AnyTokens)
        .rule(|_: AnyTokens, _: AnyToken| AnyTokens)
        .rule(|_: LParen| AnyToken)
        .rule(|_: RParen| AnyToken)
        .rule(|_: LBrack| AnyToken)
        .rule(|_: RBrack| AnyToken)
        .rule(|_: Equals| AnyToken)
        .rule(|_: Semicolon| AnyToken)
        .rule(|_: Colon| AnyToken)
        .rule(|_: AnyOp| AnyToken)
        .rule(|_: Ident| AnyToken)
        .rule(|_: FloatLit| AnyToken)
        .rule(|_: IntLit| AnyToken)
        .rule(|_: Scope| AnyToken)
        .rule(|_: Space| AnyToken)
        .rule(|_: Op| AnyOp)
        .rule(|_: Comma| AnyOp)
        .rule(|_: Less| AnyOp)
        .rule(|_: Greater| AnyOp);
}

fn add_tokens(g: &mut Grammar<Node>) {
    g.token(Pattern::Scan(patterns::whitespace), |_| Space)
        .token(Pattern::Literal(";"), |_| Semicolon)
        .token(Pattern::Literal("="), |_| Equals)
        .token(Pattern::Literal(":"), |_| Colon)
        .token(Pattern::Literal(","), |_| Comma)
        .token(Pattern::Scan(patterns::identifier), |text| {
            Ident(text.to_string())
        })
        .token(Pattern::Scan(patterns::signed_float), |text| FloatLit {
            text: text.to_string(),
        })
        .try_token(Pattern::Scan(patterns::signed_integer), IntLit::from_text)
        .token(Pattern::AnyOf(OPERATORS), |text| {
            Op(text.chars().next().unwrap_or_default())
        })
        .token(Pattern::Literal("{"), |_| LBrace)
        .token(Pattern::Literal("}"), |_| RBrace)
        .token(Pattern::Literal("["), |_| LBrack)
        .token(Pattern::Literal("]"), |_| RBrack)
        .token(Pattern::Literal("("), |_| LParen)
        .token(Pattern::Literal(")"), |_| RParen)
        .token(Pattern::Literal("<"), |_| Less)
        .token(Pattern::Literal(">"), |_| Greater);
}

/// Builds the uncompiled declaration grammar. `Program` is the start symbol.
pub fn declaration_grammar() -> Grammar<Node> {
    let mut g = Grammar::new();
    add_declarations(&mut g);
    add_literals(&mut g);
    add_variables(&mut g);
    add_functions(&mut g);
    add_tokens(&mut g);
    g
}

static SHARED: OnceLock<Result<HlslParser, GrammarError>> = OnceLock::new();

/// Compiled declaration grammar, reusable across files.
pub struct HlslParser {
    parser: Parser<Node>,
}

impl HlslParser {
    pub fn new() -> Result<Self, GrammarError> {
        let parser = declaration_grammar().compile()?;
        Ok(Self { parser })
    }

    /// Process-wide instance, compiled on first use.
    pub fn shared() -> Result<&'static HlslParser, GrammarError> {
        SHARED
            .get_or_init(HlslParser::new)
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Parses preprocessed text.
    pub fn parse(&self, text: &str) -> Result<Program, ParseError> {
        self.parser.parse::<Program>(text)
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<Lexed<Node>>, ParseError> {
        self.parser.tokenize(text)
    }

    pub fn parser(&self) -> &Parser<Node> {
        &self.parser
    }
}
