// hir.rs: Resolved member bodies
//
// Normalized representation of member bodies after name resolution: every
// reference points at a `DeclId`, local binding, or parameter; closure
// literals and partial applications are lifted into `ClosureInfo` entries
// with stable `ClosureId`s; every call argument carries the escapability of
// the parameter that receives it.
//
// Preconditions: produced by `resolve::resolve` from the AST.
// Postconditions: no unresolved names remain (unresolvable ones are dropped
//   after a diagnostic).
// Failure modes: none (data-only module).
// Side effects: none.

use crate::ast::{Escapability, Span};
use crate::id::{ClosureId, DeclId, LocalId, TypeId};

/// A body: the statements of a member or of a closure literal.
#[derive(Debug, Clone, Default)]
pub struct HirBody {
    pub stmts: Vec<HirStmt>,
}

/// How the accessed declaration is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// `self.x` or an implicit member of the enclosing type.
    SelfValue,
    /// Through a parameter of nominal type, e.g. `other.balance`.
    Param(String, TypeId),
    /// Through a type name, e.g. `Logger.shared`.
    Type(TypeId),
    /// A top-level declaration.
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
    Call,
    /// Passed by mutable reference (`&x`).
    Inout,
    /// Referenced without being called (partial application).
    Reference,
}

#[derive(Debug, Clone)]
pub struct AccessSite {
    pub target: DeclId,
    pub receiver: Receiver,
    pub kind: AccessKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum HirValue {
    Closure(ClosureId),
    Local(LocalId),
    Param(String),
    /// A property read used as a value.
    Access(AccessSite),
    /// A type name or other value with no isolation relevance.
    Opaque,
}

#[derive(Debug, Clone)]
pub enum HirArg {
    Inout(AccessSite),
    /// `sink` is the escapability of the receiving parameter; arguments to
    /// non-closure or unknown parameters are treated as escaping.
    Value {
        value: HirValue,
        sink: Escapability,
        span: Span,
    },
}

#[derive(Debug, Clone)]
pub enum Callee {
    Decl(AccessSite),
    Local(LocalId),
    Param(String),
}

#[derive(Debug, Clone)]
pub enum HirStmt {
    /// `read` / `write` of a declaration.
    Access(AccessSite),
    Call {
        callee: Callee,
        args: Vec<HirArg>,
        is_await: bool,
        span: Span,
    },
    Bind {
        local: LocalId,
        value: HirValue,
        span: Span,
    },
    Return {
        value: HirValue,
        span: Span,
    },
    /// `read` / `write` / `&` of a local or parameter.
    Use {
        value: HirValue,
        span: Span,
    },
}

#[derive(Debug, Clone)]
pub enum ClosureKind {
    Literal(HirBody),
    /// A method referenced as a value, e.g. `self.deposit`.
    PartialApplication(AccessSite),
}

#[derive(Debug, Clone)]
pub struct ClosureInfo {
    pub id: ClosureId,
    /// Declaration whose body forms the closure.
    pub owner: DeclId,
    /// Closure whose body forms this one, if nested.
    pub parent: Option<ClosureId>,
    pub kind: ClosureKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LocalInfo {
    pub id: LocalId,
    pub name: String,
    pub owner: DeclId,
    /// Closure whose body declares the binding (`None` for the member body).
    pub scope: Option<ClosureId>,
    pub span: Span,
}
