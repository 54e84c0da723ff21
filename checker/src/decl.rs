// decl.rs: Declaration model
//
// In-memory representation of modules, nominal types and declarations after
// name resolution: attributes, owning type, sync/async, stored/computed,
// static/instance, override and witness links, and resolved bodies.
// This is the substrate every later pass queries.
//
// Preconditions: produced by `resolve::resolve`.
// Postconditions: every `DeclId`/`TypeId` stored in the table indexes into it.
// Failure modes: none (data-only module).
// Side effects: none.

use std::collections::HashMap;

use serde::Serialize;

use crate::ast::{Escapability, Span, TypeKind};
use crate::hir::{ClosureInfo, HirBody, LocalInfo};
use crate::id::{ClosureId, DeclId, LocalId, ModuleId, TypeId};
use crate::isolation::IsolationCategory;

// ── Attributes ──────────────────────────────────────────────────────────────

/// The explicit isolation attribute written on a declaration, type or
/// extension. At most one survives resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExplicitAttr {
    None,
    GlobalActor(TypeId),
    ActorIndependent,
    ActorIndependentUnsafe,
}

impl ExplicitAttr {
    pub fn is_none(self) -> bool {
        self == ExplicitAttr::None
    }

    /// The category an explicit attribute forces, if any.
    pub fn category(self) -> Option<IsolationCategory> {
        match self {
            ExplicitAttr::None => None,
            ExplicitAttr::GlobalActor(t) => Some(IsolationCategory::GlobalActorIsolated(t)),
            ExplicitAttr::ActorIndependent => Some(IsolationCategory::Independent),
            ExplicitAttr::ActorIndependentUnsafe => Some(IsolationCategory::IndependentUnsafe),
        }
    }
}

// ── Modules and types ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub id: ModuleId,
    pub name: String,
}

/// A protocol conformance declared on a type or one of its extensions.
#[derive(Debug, Clone)]
pub struct Conformance {
    pub protocol: TypeId,
    /// Module in which the conformance is declared.
    pub module: ModuleId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: String,
    pub kind: TypeKind,
    pub module: ModuleId,
    pub explicit: ExplicitAttr,
    pub superclass: Option<TypeId>,
    /// Inherits from the configured foreign base class.
    pub foreign_base: bool,
    pub conformances: Vec<Conformance>,
    /// Members declared in the type body and in all of its extensions.
    pub members: Vec<DeclId>,
    pub span: Span,
}

impl TypeInfo {
    /// Actor-shaped types own a serial queue per instance.
    pub fn is_actor(&self) -> bool {
        matches!(self.kind, TypeKind::Actor | TypeKind::GlobalActor)
    }

    pub fn is_value_type(&self) -> bool {
        self.kind == TypeKind::Struct
    }
}

// ── Declarations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    StoredProperty { mutable: bool },
    ComputedProperty,
    Subscript,
    Method,
    Initializer,
    Deinitializer,
}

impl DeclKind {
    /// Kinds that may override or witness each other share a family.
    pub fn family(self) -> u8 {
        match self {
            DeclKind::StoredProperty { .. } | DeclKind::ComputedProperty => 0,
            DeclKind::Subscript => 1,
            DeclKind::Method => 2,
            DeclKind::Initializer => 3,
            DeclKind::Deinitializer => 4,
        }
    }

    pub fn is_callable(self) -> bool {
        matches!(
            self,
            DeclKind::Method | DeclKind::Initializer | DeclKind::Deinitializer
        )
    }
}

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamTy {
    /// Builtin scalar, foreign or unresolved type.
    Opaque(String),
    Nominal(TypeId),
    Closure(Escapability),
}

#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub ty: ParamTy,
}

/// A protocol requirement satisfied by a declaration.
#[derive(Debug, Clone)]
pub struct Witnessed {
    pub requirement: DeclId,
    /// Module that declares the conformance.
    pub conforming_module: ModuleId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclKind,
    pub is_async: bool,
    pub is_static: bool,
    pub explicit: ExplicitAttr,
    /// Attribute inherited by default from an enclosing extension.
    pub extension_attr: ExplicitAttr,
    pub owner: Option<TypeId>,
    pub module: ModuleId,
    /// For properties: the declared type has value semantics.
    pub value_semantic: bool,
    pub overridden: Option<DeclId>,
    pub witnessed: Vec<Witnessed>,
    pub params: Vec<ParamInfo>,
    pub body: Option<HirBody>,
    pub span: Span,
}

impl Decl {
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn is_stored(&self) -> bool {
        matches!(self.kind, DeclKind::StoredProperty { .. })
    }

    pub fn explicit_attribute(&self) -> ExplicitAttr {
        self.explicit
    }

    pub fn overrides(&self) -> Option<DeclId> {
        self.overridden
    }

    pub fn witnesses(&self) -> &[Witnessed] {
        &self.witnessed
    }

    pub fn is_instance_member(&self) -> bool {
        self.owner.is_some() && !self.is_static
    }

    /// `let` of a value-semantic type: isolation-free by construction.
    pub fn is_value_constant(&self) -> bool {
        matches!(self.kind, DeclKind::StoredProperty { mutable: false }) && self.value_semantic
    }
}

// ── Table ───────────────────────────────────────────────────────────────────

/// All resolved modules, types, declarations, closures and locals.
#[derive(Debug, Default)]
pub struct DeclTable {
    pub modules: Vec<ModuleInfo>,
    pub types: Vec<TypeInfo>,
    pub decls: Vec<Decl>,
    pub closures: Vec<ClosureInfo>,
    pub locals: Vec<LocalInfo>,
    pub type_names: HashMap<String, TypeId>,
    /// Top-level declarations by name.
    pub globals: HashMap<String, DeclId>,
}

impl DeclTable {
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0 as usize]
    }

    pub fn ty(&self, id: TypeId) -> &TypeInfo {
        &self.types[id.0 as usize]
    }

    pub fn closure(&self, id: ClosureId) -> &ClosureInfo {
        &self.closures[id.0 as usize]
    }

    pub fn local(&self, id: LocalId) -> &LocalInfo {
        &self.locals[id.0 as usize]
    }

    pub fn module_name(&self, id: ModuleId) -> &str {
        &self.modules[id.0 as usize].name
    }

    pub fn lookup_type(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    /// Superclass chain starting at `ty` (inclusive). Stops on cycles.
    pub fn ancestry(&self, ty: TypeId) -> Vec<TypeId> {
        let mut chain = vec![ty];
        let mut cur = self.ty(ty).superclass;
        while let Some(next) = cur {
            if chain.contains(&next) {
                break;
            }
            chain.push(next);
            cur = self.ty(next).superclass;
        }
        chain
    }

    /// Find a member by name on `ty` or its superclasses.
    pub fn find_member(&self, ty: TypeId, name: &str) -> Option<DeclId> {
        self.ancestry(ty).into_iter().find_map(|t| {
            self.ty(t)
                .members
                .iter()
                .copied()
                .find(|&d| self.decl(d).name == name)
        })
    }

    /// Qualified display name, e.g. `BankAccount.deposit`.
    pub fn decl_path(&self, id: DeclId) -> String {
        let decl = self.decl(id);
        match decl.owner {
            Some(owner) => format!("{}.{}", self.ty(owner).name, decl.name),
            None => decl.name.clone(),
        }
    }

    /// Human-readable category, naming actor types.
    pub fn describe(&self, category: IsolationCategory) -> String {
        match category {
            IsolationCategory::InstanceIsolated(t) => {
                format!("isolated to actor '{}'", self.ty(t).name)
            }
            IsolationCategory::GlobalActorIsolated(t) => {
                format!("isolated to global actor '{}'", self.ty(t).name)
            }
            IsolationCategory::Independent => "actor-independent".to_string(),
            IsolationCategory::IndependentUnsafe => "actor-independent (unsafe)".to_string(),
            IsolationCategory::Unknown => "of unknown isolation".to_string(),
        }
    }

    /// Short tag used in reports and snapshots, e.g. `global(UIActor)`.
    pub fn category_tag(&self, category: IsolationCategory) -> String {
        match category {
            IsolationCategory::InstanceIsolated(t) => format!("instance({})", self.ty(t).name),
            IsolationCategory::GlobalActorIsolated(t) => format!("global({})", self.ty(t).name),
            IsolationCategory::Independent => "independent".to_string(),
            IsolationCategory::IndependentUnsafe => "independent(unsafe)".to_string(),
            IsolationCategory::Unknown => "unknown".to_string(),
        }
    }
}
