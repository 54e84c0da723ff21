// AST node types for isoc .adl declaration files.
//
// Mirrors the declaration language grammar: type declarations, extensions,
// members with attributes, and member bodies made of access statements.
// Every node carries a `SimpleSpan` for error reporting in downstream phases.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Root ──

/// A complete declaration file: an optional module header and its items.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub module: Option<Ident>,
    pub items: Vec<Item>,
    pub span: Span,
}

/// A top-level item with the attributes written before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub attrs: Vec<Attribute>,
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Type(TypeDecl),
    Extension(ExtensionDecl),
    /// Top-level function or variable.
    Member(Member),
}

// ── Attributes ──

/// `@name` or `@name(arg)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: Ident,
    pub arg: Option<Ident>,
    pub span: Span,
}

// ── Types ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Actor,
    GlobalActor,
    Class,
    Struct,
    Protocol,
}

/// `actor Name : Base, Proto { members }`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: Ident,
    pub inherits: Vec<Ident>,
    pub members: Vec<Member>,
}

/// `extension Name : Proto { members }`
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionDecl {
    pub target: Ident,
    pub conforms: Vec<Ident>,
    pub members: Vec<Member>,
}

// ── Members ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Let,
    Var,
    ComputedVar,
    Subscript,
    Func,
    Init,
    Deinit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub attrs: Vec<Attribute>,
    pub is_static: bool,
    pub is_async: bool,
    pub kind: MemberKind,
    /// Synthesized as `init` / `deinit` / `subscript` for unnamed members.
    pub name: Ident,
    pub params: Vec<Param>,
    pub ty: Option<TypeRef>,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeRef,
}

/// Escapability of a closure-typed parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Escapability {
    /// `fn`: may only be invoked during the call.
    NonEscaping,
    /// `escaping fn`: may be stored or invoked after the call returns.
    Escaping,
    /// `concurrent fn`: may be invoked in parallel with the caller.
    Concurrent,
}

impl Escapability {
    pub fn escapes(self) -> bool {
        !matches!(self, Escapability::NonEscaping)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Named(Ident),
    Closure(Escapability, Span),
}

impl TypeRef {
    pub fn span(&self) -> Span {
        match self {
            TypeRef::Named(id) => id.span,
            TypeRef::Closure(_, span) => *span,
        }
    }
}

// ── Bodies ──

/// `{ stmt* }`: a member body or a closure literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Read(Ref),
    Write(Ref),
    /// `call f(args)` / `await f(args)`.
    Call {
        callee: Ref,
        args: Vec<Arg>,
        is_await: bool,
    },
    /// `let name = expr`
    Let { name: Ident, value: Expr },
    Return(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `&ref`: passed by mutable reference.
    Inout(Ref),
    Value(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Closure(Block),
    Ref(Ref),
}

/// `name` or `base.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ref {
    pub base: Option<Ident>,
    pub name: Ident,
    pub span: Span,
}

// ── Identifier ──

/// An identifier with its source text and span.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}
