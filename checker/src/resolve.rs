// resolve.rs: Name resolution and declaration model construction
//
// Walks the parsed modules, builds the declaration table (types, members,
// extension members, conformances), links overrides and protocol witnesses,
// and lowers member bodies to HIR access sites.
//
// Preconditions: every module is a well-formed AST from the parser.
// Postconditions: returns the declaration table, the static global actor
//                 registry, and all accumulated diagnostics.
// Failure modes: unknown names, duplicate definitions, malformed attribute
//                combinations and inheritance mismatches produce `Diagnostic`
//                entries. Resolution continues past errors.
// Side effects: none.

use std::collections::HashMap;

use crate::ast::{
    Arg, Attribute, Block, Escapability, Expr, Ident, ItemKind, Member, MemberKind, Program, Ref,
    Span, StmtKind, TypeKind, TypeRef,
};
use crate::decl::{
    Conformance, Decl, DeclKind, DeclTable, ExplicitAttr, ModuleInfo, ParamInfo, ParamTy,
    TypeInfo, Witnessed,
};
use crate::diag::{codes, DiagCode, Diagnostic};
use crate::hir::{
    AccessKind, AccessSite, Callee, ClosureInfo, ClosureKind, HirArg, HirBody, HirStmt, HirValue,
    LocalInfo, Receiver,
};
use crate::id::{ClosureId, DeclId, IdAllocator, LocalId, ModuleId, TypeId};
use crate::pipeline::CheckOptions;
use crate::registry::GlobalActorRegistry;

/// Builtin scalar types. All are value-semantic.
pub const VALUE_TYPES: &[&str] = &[
    "Int", "Int8", "Int16", "Int32", "Int64", "UInt", "UInt8", "UInt16", "UInt32", "UInt64",
    "Float", "Double", "Bool", "String", "Character", "Void",
];

// ── Public types ────────────────────────────────────────────────────────────

/// One parsed input file.
#[derive(Debug, Clone)]
pub struct SourceModule {
    pub name: String,
    pub program: Program,
}

/// Result of name resolution.
#[derive(Debug)]
pub struct ResolveResult {
    pub table: DeclTable,
    pub registry: GlobalActorRegistry,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Resolve all modules together. Type names share one namespace.
pub fn resolve(modules: &[SourceModule], options: &CheckOptions) -> ResolveResult {
    let mut ctx = ResolveCtx::new(options);

    let ids: Vec<ModuleId> = modules.iter().map(|m| ctx.declare_module(&m.name)).collect();
    for (m, &mid) in modules.iter().zip(&ids) {
        ctx.current = mid;
        ctx.collect_types(&m.program);
    }
    for (m, &mid) in modules.iter().zip(&ids) {
        ctx.current = mid;
        ctx.link_types(&m.program);
    }
    ctx.check_inheritance_cycles();
    for (m, &mid) in modules.iter().zip(&ids) {
        ctx.current = mid;
        ctx.collect_members(&m.program);
    }
    ctx.link_overrides();
    ctx.link_witnesses();
    ctx.resolve_bodies();

    let (registry, registry_diags) = GlobalActorRegistry::build(&ctx.table);
    ctx.diagnostics.extend(registry_diags);

    tracing::debug!(
        modules = ctx.table.modules.len(),
        types = ctx.table.types.len(),
        decls = ctx.table.decls.len(),
        closures = ctx.table.closures.len(),
        "resolved declarations"
    );

    ResolveResult {
        table: ctx.table,
        registry,
        diagnostics: ctx.diagnostics,
    }
}

// ── Internal context ────────────────────────────────────────────────────────

struct PendingBody<'a> {
    decl: DeclId,
    module: ModuleId,
    block: &'a Block,
}

/// A `let` scope: the member body or one closure literal.
struct Frame {
    closure: Option<ClosureId>,
    locals: HashMap<String, LocalId>,
}

struct BodyScope {
    decl: DeclId,
    owner: Option<TypeId>,
    frames: Vec<Frame>,
}

impl BodyScope {
    fn current_closure(&self) -> Option<ClosureId> {
        self.frames.last().and_then(|f| f.closure)
    }

    fn lookup_local(&self, name: &str) -> Option<LocalId> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.locals.get(name).copied())
    }
}

/// What a reference names.
enum Named {
    SelfValue,
    Local(LocalId),
    Param(String),
    Member(DeclId, Receiver),
    Type(TypeId),
}

struct ResolveCtx<'a> {
    options: &'a CheckOptions,
    table: DeclTable,
    diagnostics: Vec<Diagnostic>,
    ids: IdAllocator,
    current: ModuleId,
    /// (module, item index) → declared type.
    type_items: HashMap<(ModuleId, usize), TypeId>,
    /// (module, item index) → extended type and the extension's attribute.
    extensions: HashMap<(ModuleId, usize), (TypeId, ExplicitAttr)>,
    pending: Vec<PendingBody<'a>>,
}

impl<'a> ResolveCtx<'a> {
    fn new(options: &'a CheckOptions) -> Self {
        ResolveCtx {
            options,
            table: DeclTable::default(),
            diagnostics: Vec::new(),
            ids: IdAllocator::new(),
            current: ModuleId(0),
            type_items: HashMap::new(),
            extensions: HashMap::new(),
            pending: Vec::new(),
        }
    }

    fn report(&mut self, diag: Diagnostic) {
        let module = self.table.module_name(self.current).to_string();
        self.diagnostics.push(diag.in_module(module));
    }

    fn error(&mut self, code: DiagCode, span: Span, message: String) {
        self.report(Diagnostic::error(code, span, message));
    }

    fn declare_module(&mut self, name: &str) -> ModuleId {
        let id = self.ids.alloc_module();
        self.table.modules.push(ModuleInfo {
            id,
            name: name.to_string(),
        });
        id
    }

    // ── Pass 1: collect types ───────────────────────────────────────────

    fn collect_types(&mut self, program: &Program) {
        for (i, item) in program.items.iter().enumerate() {
            let ItemKind::Type(td) = &item.kind else {
                continue;
            };
            let name = &td.name.name;
            if let Some(prev) = self.table.lookup_type(name) {
                let prev_info = self.table.ty(prev);
                let label = format!(
                    "previously declared in module '{}'",
                    self.table.module_name(prev_info.module)
                );
                let prev_span = prev_info.span;
                self.report(
                    Diagnostic::error(
                        codes::E0003,
                        td.name.span,
                        format!("type '{}' is declared more than once", name),
                    )
                    .with_related(prev_span, label),
                );
                continue;
            }
            let id = self.ids.alloc_type();
            self.table.types.push(TypeInfo {
                id,
                name: name.clone(),
                kind: td.kind,
                module: self.current,
                explicit: ExplicitAttr::None,
                superclass: None,
                foreign_base: false,
                conformances: Vec::new(),
                members: Vec::new(),
                span: td.name.span,
            });
            self.table.type_names.insert(name.clone(), id);
            self.type_items.insert((self.current, i), id);
        }
    }

    // ── Pass 2: attributes, inheritance, extensions ─────────────────────

    fn link_types(&mut self, program: &Program) {
        for (i, item) in program.items.iter().enumerate() {
            match &item.kind {
                ItemKind::Type(td) => {
                    let Some(&ty) = self.type_items.get(&(self.current, i)) else {
                        continue;
                    };
                    let explicit = self.resolve_attrs(&item.attrs);
                    let explicit = self.reject_actor_global_attr(ty, explicit, item.span);
                    self.table.types[ty.0 as usize].explicit = explicit;
                    self.link_inherits(ty, &td.inherits);
                }
                ItemKind::Extension(ext) => {
                    let Some(ty) = self.table.lookup_type(&ext.target.name) else {
                        self.error(
                            codes::E0001,
                            ext.target.span,
                            format!("cannot extend unknown type '{}'", ext.target.name),
                        );
                        continue;
                    };
                    let attr = self.resolve_attrs(&item.attrs);
                    let attr = self.reject_actor_global_attr(ty, attr, item.span);
                    for proto in &ext.conforms {
                        self.add_extension_conformance(ty, proto);
                    }
                    self.extensions.insert((self.current, i), (ty, attr));
                }
                ItemKind::Member(_) => {}
            }
        }
    }

    /// Actor types own their isolation; a global actor attribute on one is
    /// a conflict.
    fn reject_actor_global_attr(
        &mut self,
        ty: TypeId,
        attr: ExplicitAttr,
        span: Span,
    ) -> ExplicitAttr {
        let info = self.table.ty(ty);
        if info.is_actor() && matches!(attr, ExplicitAttr::GlobalActor(_)) {
            let msg = format!(
                "actor type '{}' cannot carry a global actor attribute",
                info.name
            );
            self.report(
                Diagnostic::error(codes::E0100, span, msg)
                    .with_hint("remove the attribute; actor members are isolated to the instance"),
            );
            return ExplicitAttr::None;
        }
        attr
    }

    fn link_inherits(&mut self, ty: TypeId, inherits: &[Ident]) {
        let kind = self.table.ty(ty).kind;
        let ty_name = self.table.ty(ty).name.clone();
        for base in inherits {
            let Some(base_ty) = self.table.lookup_type(&base.name) else {
                if base.name == self.options.foreign_base {
                    self.set_foreign_base(ty, base);
                } else {
                    self.error(
                        codes::E0001,
                        base.span,
                        format!("cannot find type '{}'", base.name),
                    );
                }
                continue;
            };
            let base_kind = self.table.ty(base_ty).kind;
            if base_kind == TypeKind::Protocol {
                self.table.types[ty.0 as usize].conformances.push(Conformance {
                    protocol: base_ty,
                    module: self.current,
                    span: base.span,
                });
                continue;
            }
            let allowed = matches!(
                (kind, base_kind),
                (TypeKind::Class, TypeKind::Class)
                    | (TypeKind::Actor | TypeKind::GlobalActor, TypeKind::Actor)
            );
            if !allowed {
                let mut diag = Diagnostic::error(
                    codes::E0102,
                    base.span,
                    format!(
                        "{} '{}' cannot inherit from {} '{}'",
                        kind_word(kind),
                        ty_name,
                        kind_word(base_kind),
                        base.name
                    ),
                );
                if matches!(kind, TypeKind::Actor | TypeKind::GlobalActor) {
                    diag = diag.with_hint(format!(
                        "actors may only inherit from another actor or from '{}'",
                        self.options.foreign_base
                    ));
                }
                self.report(diag);
                continue;
            }
            let info = &self.table.types[ty.0 as usize];
            if info.superclass.is_some() || info.foreign_base {
                self.error(
                    codes::E0102,
                    base.span,
                    format!("'{}' has more than one superclass", ty_name),
                );
                continue;
            }
            self.table.types[ty.0 as usize].superclass = Some(base_ty);
        }
    }

    fn set_foreign_base(&mut self, ty: TypeId, base: &Ident) {
        let info = &self.table.types[ty.0 as usize];
        let (kind, name) = (info.kind, info.name.clone());
        if !matches!(
            kind,
            TypeKind::Class | TypeKind::Actor | TypeKind::GlobalActor
        ) {
            self.error(
                codes::E0102,
                base.span,
                format!(
                    "{} '{}' cannot inherit from class '{}'",
                    kind_word(kind),
                    name,
                    base.name
                ),
            );
        } else if info.superclass.is_some() || info.foreign_base {
            self.error(
                codes::E0102,
                base.span,
                format!("'{}' has more than one superclass", name),
            );
        } else {
            self.table.types[ty.0 as usize].foreign_base = true;
        }
    }

    fn add_extension_conformance(&mut self, ty: TypeId, proto: &Ident) {
        match self.table.lookup_type(&proto.name) {
            Some(p) if self.table.ty(p).kind == TypeKind::Protocol => {
                self.table.types[ty.0 as usize].conformances.push(Conformance {
                    protocol: p,
                    module: self.current,
                    span: proto.span,
                });
            }
            Some(_) => self.error(
                codes::E0102,
                proto.span,
                format!(
                    "extension of '{}' can only add protocol conformances, '{}' is not a protocol",
                    self.table.ty(ty).name,
                    proto.name
                ),
            ),
            None => self.error(
                codes::E0001,
                proto.span,
                format!("cannot find type '{}'", proto.name),
            ),
        }
    }

    fn check_inheritance_cycles(&mut self) {
        for start in 0..self.table.types.len() {
            let start_id = TypeId(start as u32);
            let mut seen = vec![start_id];
            let mut cur = self.table.ty(start_id).superclass;
            while let Some(next) = cur {
                if next == start_id {
                    let info = self.table.ty(start_id);
                    let (module, span, name) = (info.module, info.span, info.name.clone());
                    self.current = module;
                    self.error(
                        codes::E0102,
                        span,
                        format!("circular inheritance involving '{}'", name),
                    );
                    self.table.types[start].superclass = None;
                    break;
                }
                if seen.contains(&next) {
                    break;
                }
                seen.push(next);
                cur = self.table.ty(next).superclass;
            }
        }
    }

    // ── Attributes ──────────────────────────────────────────────────────

    fn resolve_attrs(&mut self, attrs: &[Attribute]) -> ExplicitAttr {
        let mut result = ExplicitAttr::None;
        let mut first: Option<&Attribute> = None;
        for attr in attrs {
            let Some(parsed) = self.resolve_attr(attr) else {
                continue;
            };
            match first {
                None => {
                    result = parsed;
                    first = Some(attr);
                }
                Some(prev) => {
                    let msg = format!(
                        "conflicting isolation attributes '{}' and '{}'",
                        attr_text(prev),
                        attr_text(attr)
                    );
                    self.report(
                        Diagnostic::error(codes::E0100, attr.span, msg)
                            .with_related(prev.span, "first attribute here"),
                    );
                }
            }
        }
        result
    }

    fn resolve_attr(&mut self, attr: &Attribute) -> Option<ExplicitAttr> {
        let name = attr.name.name.as_str();
        if name == "actorIndependent" {
            return match attr.arg.as_ref().map(|a| a.name.as_str()) {
                None => Some(ExplicitAttr::ActorIndependent),
                Some("unsafe") => Some(ExplicitAttr::ActorIndependentUnsafe),
                Some(other) => {
                    self.error(
                        codes::E0100,
                        attr.span,
                        format!("unknown argument '{}' to '@actorIndependent'", other),
                    );
                    None
                }
            };
        }
        let Some(ty) = self.table.lookup_type(name) else {
            self.error(
                codes::E0001,
                attr.name.span,
                format!("unknown attribute '@{}'", name),
            );
            return None;
        };
        if self.table.ty(ty).kind != TypeKind::GlobalActor {
            self.report(
                Diagnostic::error(
                    codes::E0100,
                    attr.span,
                    format!("'{}' is not a global actor", name),
                )
                .with_hint("declare it with `global actor`"),
            );
            return None;
        }
        if attr.arg.is_some() {
            self.error(
                codes::E0100,
                attr.span,
                format!("global actor attribute '@{}' takes no argument", name),
            );
            return None;
        }
        Some(ExplicitAttr::GlobalActor(ty))
    }

    // ── Pass 3: collect members ─────────────────────────────────────────

    fn collect_members(&mut self, program: &'a Program) {
        for (i, item) in program.items.iter().enumerate() {
            match &item.kind {
                ItemKind::Type(td) => {
                    if let Some(&ty) = self.type_items.get(&(self.current, i)) {
                        for m in &td.members {
                            self.declare_member(m, Some(ty), ExplicitAttr::None);
                        }
                    }
                }
                ItemKind::Extension(ext) => {
                    if let Some(&(ty, attr)) = self.extensions.get(&(self.current, i)) {
                        for m in &ext.members {
                            self.declare_member(m, Some(ty), attr);
                        }
                    }
                }
                ItemKind::Member(m) => self.declare_member(m, None, ExplicitAttr::None),
            }
        }
    }

    fn declare_member(&mut self, m: &'a Member, owner: Option<TypeId>, extension_attr: ExplicitAttr) {
        let kind = match m.kind {
            MemberKind::Let => DeclKind::StoredProperty { mutable: false },
            MemberKind::Var => DeclKind::StoredProperty { mutable: true },
            MemberKind::ComputedVar => DeclKind::ComputedProperty,
            MemberKind::Subscript => DeclKind::Subscript,
            MemberKind::Func => DeclKind::Method,
            MemberKind::Init => DeclKind::Initializer,
            MemberKind::Deinit => DeclKind::Deinitializer,
        };
        let name = &m.name.name;

        let previous = match owner {
            Some(ty) if kind != DeclKind::Initializer => {
                self.table.ty(ty).members.iter().copied().find(|&d| {
                    let p = self.table.decl(d);
                    p.name == *name && p.kind.family() == kind.family()
                })
            }
            Some(_) => None,
            None => self.table.globals.get(name).copied(),
        };
        if let Some(prev) = previous {
            let path = match owner {
                Some(ty) => format!("{}.{}", self.table.ty(ty).name, name),
                None => name.clone(),
            };
            let prev_span = self.table.decl(prev).span;
            self.report(
                Diagnostic::error(
                    codes::E0003,
                    m.name.span,
                    format!("invalid redeclaration of '{}'", path),
                )
                .with_related(prev_span, "previous declaration here"),
            );
            return;
        }

        let explicit = self.resolve_attrs(&m.attrs);
        let params: Vec<ParamInfo> = m
            .params
            .iter()
            .map(|p| ParamInfo {
                name: p.name.name.clone(),
                ty: self.param_ty(&p.ty),
            })
            .collect();
        let value_semantic = match (kind, &m.ty) {
            (DeclKind::StoredProperty { .. } | DeclKind::ComputedProperty, Some(ty)) => {
                self.is_value_type(ty)
            }
            (_, Some(ty)) => {
                self.is_value_type(ty);
                false
            }
            _ => false,
        };

        let id = self.ids.alloc_decl();
        self.table.decls.push(Decl {
            id,
            name: name.clone(),
            kind,
            is_async: m.is_async,
            is_static: m.is_static && owner.is_some(),
            explicit,
            extension_attr,
            owner,
            module: self.current,
            value_semantic,
            overridden: None,
            witnessed: Vec::new(),
            params,
            body: None,
            span: m.name.span,
        });
        match owner {
            Some(ty) => self.table.types[ty.0 as usize].members.push(id),
            None => {
                self.table.globals.insert(name.clone(), id);
            }
        }
        if let Some(block) = &m.body {
            self.pending.push(PendingBody {
                decl: id,
                module: self.current,
                block,
            });
        }
    }

    fn param_ty(&mut self, ty: &TypeRef) -> ParamTy {
        match ty {
            TypeRef::Closure(esc, _) => ParamTy::Closure(*esc),
            TypeRef::Named(id) => match self.table.lookup_type(&id.name) {
                Some(t) => ParamTy::Nominal(t),
                None => {
                    self.check_opaque_type(id);
                    ParamTy::Opaque(id.name.clone())
                }
            },
        }
    }

    /// Whether `ty` has value semantics. Reports unknown type names.
    fn is_value_type(&mut self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Closure(..) => false,
            TypeRef::Named(id) => match self.table.lookup_type(&id.name) {
                Some(t) => self.table.ty(t).is_value_type(),
                None => self.check_opaque_type(id),
            },
        }
    }

    /// Builtins are value types; the foreign base is a reference type; any
    /// other undeclared name is an error.
    fn check_opaque_type(&mut self, id: &Ident) -> bool {
        if VALUE_TYPES.contains(&id.name.as_str()) {
            return true;
        }
        if id.name != self.options.foreign_base {
            self.error(
                codes::E0001,
                id.span,
                format!("cannot find type '{}'", id.name),
            );
        }
        false
    }

    // ── Pass 4: override and witness links ─────────────────────────────

    fn link_overrides(&mut self) {
        let mut links = Vec::new();
        for info in &self.table.types {
            let Some(superclass) = info.superclass else {
                continue;
            };
            for &d in &info.members {
                let decl = self.table.decl(d);
                if decl.is_static || decl.kind == DeclKind::Deinitializer {
                    continue;
                }
                let found = self.table.ancestry(superclass).into_iter().find_map(|t| {
                    self.table.ty(t).members.iter().copied().find(|&m| {
                        let base = self.table.decl(m);
                        !base.is_static
                            && base.name == decl.name
                            && base.kind.family() == decl.kind.family()
                    })
                });
                if let Some(overridden) = found {
                    links.push((d, overridden));
                }
            }
        }
        for (d, overridden) in links {
            self.table.decls[d.0 as usize].overridden = Some(overridden);
        }
    }

    /// Requirements of a protocol and of the protocols it refines.
    fn requirements(&self, proto: TypeId) -> Vec<DeclId> {
        let mut visited = vec![proto];
        let mut queue = vec![proto];
        let mut reqs = Vec::new();
        while let Some(p) = queue.pop() {
            let info = self.table.ty(p);
            reqs.extend(info.members.iter().copied());
            for c in &info.conformances {
                if !visited.contains(&c.protocol) {
                    visited.push(c.protocol);
                    queue.push(c.protocol);
                }
            }
        }
        reqs
    }

    fn link_witnesses(&mut self) {
        let mut links: Vec<(DeclId, Witnessed)> = Vec::new();
        for info in &self.table.types {
            if info.kind == TypeKind::Protocol {
                continue;
            }
            for conf in &info.conformances {
                for req in self.requirements(conf.protocol) {
                    let rd = self.table.decl(req);
                    let witness = self.table.ancestry(info.id).into_iter().find_map(|t| {
                        self.table.ty(t).members.iter().copied().find(|&m| {
                            let md = self.table.decl(m);
                            md.name == rd.name
                                && md.kind.family() == rd.kind.family()
                                && md.is_static == rd.is_static
                        })
                    });
                    let Some(witness) = witness else {
                        continue;
                    };
                    let duplicate = links
                        .iter()
                        .any(|(w, l)| *w == witness && l.requirement == req);
                    if !duplicate {
                        links.push((
                            witness,
                            Witnessed {
                                requirement: req,
                                conforming_module: conf.module,
                                span: conf.span,
                            },
                        ));
                    }
                }
            }
        }
        for (witness, link) in links {
            self.table.decls[witness.0 as usize].witnessed.push(link);
        }
    }

    // ── Pass 5: bodies ──────────────────────────────────────────────────

    fn resolve_bodies(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for body in pending {
            self.current = body.module;
            let mut scope = BodyScope {
                decl: body.decl,
                owner: self.table.decl(body.decl).owner,
                frames: vec![Frame {
                    closure: None,
                    locals: HashMap::new(),
                }],
            };
            let hir = self.resolve_block(body.block, &mut scope);
            self.table.decls[body.decl.0 as usize].body = Some(hir);
        }
    }

    fn resolve_block(&mut self, block: &Block, scope: &mut BodyScope) -> HirBody {
        let mut stmts = Vec::new();
        for stmt in &block.stmts {
            if let Some(s) = self.resolve_stmt(&stmt.kind, stmt.span, scope) {
                stmts.push(s);
            }
        }
        HirBody { stmts }
    }

    fn resolve_stmt(
        &mut self,
        stmt: &StmtKind,
        span: Span,
        scope: &mut BodyScope,
    ) -> Option<HirStmt> {
        match stmt {
            StmtKind::Read(r) | StmtKind::Write(r) => {
                let kind = if matches!(stmt, StmtKind::Read(_)) {
                    AccessKind::Read
                } else {
                    AccessKind::Write
                };
                match self.resolve_ref(r, scope)? {
                    Named::Member(target, receiver) => Some(HirStmt::Access(AccessSite {
                        target,
                        receiver,
                        kind,
                        span: r.span,
                    })),
                    Named::Local(l) => Some(HirStmt::Use {
                        value: HirValue::Local(l),
                        span: r.span,
                    }),
                    Named::Param(p) => Some(HirStmt::Use {
                        value: HirValue::Param(p),
                        span: r.span,
                    }),
                    Named::SelfValue | Named::Type(_) => None,
                }
            }
            StmtKind::Call {
                callee,
                args,
                is_await,
            } => {
                let callee = match self.resolve_ref(callee, scope)? {
                    Named::Member(target, receiver) => Callee::Decl(AccessSite {
                        target,
                        receiver,
                        kind: AccessKind::Call,
                        span: callee.span,
                    }),
                    Named::Local(l) => Callee::Local(l),
                    Named::Param(p) => Callee::Param(p),
                    Named::Type(t) => {
                        let Some(init) = self.table.find_member(t, "init") else {
                            return None;
                        };
                        Callee::Decl(AccessSite {
                            target: init,
                            receiver: Receiver::Type(t),
                            kind: AccessKind::Call,
                            span: callee.span,
                        })
                    }
                    Named::SelfValue => return None,
                };
                let params = match &callee {
                    Callee::Decl(site) => self.table.decl(site.target).params.clone(),
                    _ => Vec::new(),
                };
                let mut hir_args = Vec::new();
                for (i, arg) in args.iter().enumerate() {
                    match arg {
                        Arg::Inout(r) => match self.resolve_ref(r, scope) {
                            Some(Named::Member(target, receiver)) => {
                                hir_args.push(HirArg::Inout(AccessSite {
                                    target,
                                    receiver,
                                    kind: AccessKind::Inout,
                                    span: r.span,
                                }));
                            }
                            // A local passed by reference may be stored anywhere.
                            Some(Named::Local(l)) => hir_args.push(HirArg::Value {
                                value: HirValue::Local(l),
                                sink: Escapability::Escaping,
                                span: r.span,
                            }),
                            _ => {}
                        },
                        Arg::Value(expr) => {
                            let value = self.resolve_expr(expr, scope);
                            let sink = match params.get(i).map(|p| &p.ty) {
                                Some(ParamTy::Closure(esc)) => *esc,
                                _ => Escapability::Escaping,
                            };
                            hir_args.push(HirArg::Value {
                                value,
                                sink,
                                span: expr_span(expr),
                            });
                        }
                    }
                }
                Some(HirStmt::Call {
                    callee,
                    args: hir_args,
                    is_await: *is_await,
                    span,
                })
            }
            StmtKind::Let { name, value } => {
                let value = self.resolve_expr(value, scope);
                let local = self.ids.alloc_local();
                self.table.locals.push(LocalInfo {
                    id: local,
                    name: name.name.clone(),
                    owner: scope.decl,
                    scope: scope.current_closure(),
                    span: name.span,
                });
                if let Some(frame) = scope.frames.last_mut() {
                    frame.locals.insert(name.name.clone(), local);
                }
                Some(HirStmt::Bind { local, value, span })
            }
            StmtKind::Return(expr) => Some(HirStmt::Return {
                value: self.resolve_expr(expr, scope),
                span,
            }),
        }
    }

    fn resolve_expr(&mut self, expr: &Expr, scope: &mut BodyScope) -> HirValue {
        match expr {
            Expr::Closure(block) => {
                let id = self.ids.alloc_closure();
                self.table.closures.push(ClosureInfo {
                    id,
                    owner: scope.decl,
                    parent: scope.current_closure(),
                    kind: ClosureKind::Literal(HirBody::default()),
                    span: block.span,
                });
                scope.frames.push(Frame {
                    closure: Some(id),
                    locals: HashMap::new(),
                });
                let body = self.resolve_block(block, scope);
                scope.frames.pop();
                self.table.closures[id.0 as usize].kind = ClosureKind::Literal(body);
                HirValue::Closure(id)
            }
            Expr::Ref(r) => match self.resolve_ref(r, scope) {
                None | Some(Named::Type(_)) | Some(Named::SelfValue) => HirValue::Opaque,
                Some(Named::Local(l)) => HirValue::Local(l),
                Some(Named::Param(p)) => HirValue::Param(p),
                Some(Named::Member(target, receiver)) => {
                    if self.table.decl(target).kind == DeclKind::Method {
                        let id = self.ids.alloc_closure();
                        self.table.closures.push(ClosureInfo {
                            id,
                            owner: scope.decl,
                            parent: scope.current_closure(),
                            kind: ClosureKind::PartialApplication(AccessSite {
                                target,
                                receiver,
                                kind: AccessKind::Reference,
                                span: r.span,
                            }),
                            span: r.span,
                        });
                        HirValue::Closure(id)
                    } else {
                        HirValue::Access(AccessSite {
                            target,
                            receiver,
                            kind: AccessKind::Read,
                            span: r.span,
                        })
                    }
                }
            },
        }
    }

    fn resolve_ref(&mut self, r: &Ref, scope: &BodyScope) -> Option<Named> {
        let name = &r.name.name;
        let Some(base) = &r.base else {
            return self.resolve_bare(name, r.span, scope);
        };

        let (ty, receiver) = if base.name == "self" {
            match scope.owner {
                Some(owner) => (owner, Receiver::SelfValue),
                None => {
                    self.self_outside_type(base.span);
                    return None;
                }
            }
        } else if scope.lookup_local(&base.name).is_some() {
            self.error(
                codes::E0002,
                r.name.span,
                format!("value '{}' has no member '{}'", base.name, name),
            );
            return None;
        } else if let Some(p) = self.param(scope.decl, &base.name) {
            match p.ty {
                ParamTy::Nominal(t) => (t, Receiver::Param(base.name.clone(), t)),
                _ => {
                    self.error(
                        codes::E0002,
                        r.name.span,
                        format!("value '{}' has no member '{}'", base.name, name),
                    );
                    return None;
                }
            }
        } else if let Some(t) = self.table.lookup_type(&base.name) {
            (t, Receiver::Type(t))
        } else {
            self.error(
                codes::E0002,
                base.span,
                format!("cannot find '{}' in scope", base.name),
            );
            return None;
        };

        match self.table.find_member(ty, name) {
            Some(d) => Some(Named::Member(d, receiver)),
            None => {
                let ty_name = self.table.ty(ty).name.clone();
                self.error(
                    codes::E0002,
                    r.name.span,
                    format!("type '{}' has no member '{}'", ty_name, name),
                );
                None
            }
        }
    }

    fn resolve_bare(&mut self, name: &str, span: Span, scope: &BodyScope) -> Option<Named> {
        if name == "self" {
            if scope.owner.is_some() {
                return Some(Named::SelfValue);
            }
            self.self_outside_type(span);
            return None;
        }
        if let Some(l) = scope.lookup_local(name) {
            return Some(Named::Local(l));
        }
        if self.param(scope.decl, name).is_some() {
            return Some(Named::Param(name.to_string()));
        }
        if let Some(owner) = scope.owner {
            if let Some(d) = self.table.find_member(owner, name) {
                let receiver = if self.table.decl(d).is_static {
                    Receiver::Type(owner)
                } else {
                    Receiver::SelfValue
                };
                return Some(Named::Member(d, receiver));
            }
        }
        if let Some(&d) = self.table.globals.get(name) {
            return Some(Named::Member(d, Receiver::Global));
        }
        if let Some(t) = self.table.lookup_type(name) {
            return Some(Named::Type(t));
        }
        self.error(
            codes::E0002,
            span,
            format!("cannot find '{}' in scope", name),
        );
        None
    }

    fn param(&self, decl: DeclId, name: &str) -> Option<ParamInfo> {
        self.table
            .decl(decl)
            .params
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    fn self_outside_type(&mut self, span: Span) {
        self.report(
            Diagnostic::error(codes::E0004, span, "'self' used outside of a type")
                .with_hint("top-level functions have no 'self'"),
        );
    }
}

fn kind_word(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Actor => "actor",
        TypeKind::GlobalActor => "global actor",
        TypeKind::Class => "class",
        TypeKind::Struct => "struct",
        TypeKind::Protocol => "protocol",
    }
}

fn attr_text(attr: &Attribute) -> String {
    match &attr.arg {
        Some(arg) => format!("@{}({})", attr.name.name, arg.name),
        None => format!("@{}", attr.name.name),
    }
}

fn expr_span(expr: &Expr) -> Span {
    match expr {
        Expr::Closure(block) => block.span,
        Expr::Ref(r) => r.span,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
