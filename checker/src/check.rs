// check.rs: Isolation compatibility checking
//
// Applies the access, override and conformance judgments to every edge the
// resolved program contains: member bodies and closure bodies are walked with
// their source category, overrides and witnesses are compared pairwise.
// Also records every awaited call into another executor as an executor hop.
//
// Preconditions: categories and closure captures are complete.
// Postconditions: `CheckResult` holds every violation plus the hop list.
// Failure modes: E0200, E0201, E0202, E0203 errors.
// Side effects: none.

use crate::ast::Span;
use crate::classify::Categories;
use crate::decl::DeclTable;
use crate::diag::{codes, Diagnostic};
use crate::escape::EscapeResult;
use crate::hir::{
    AccessKind, AccessSite, Callee, ClosureKind, HirArg, HirBody, HirStmt, HirValue, Receiver,
};
use crate::id::{ClosureId, DeclId, TypeId};
use crate::isolation::{
    compatible, shares_executor, valid_override, valid_witness, IsolationCategory,
};

// ── Public types ────────────────────────────────────────────────────────────

/// The executor an awaited call is enqueued on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopExecutor {
    /// The actor instance reached through `receiver`.
    Instance { actor: TypeId, receiver: String },
    Global { actor: TypeId },
}

/// An awaited call lowered to an enqueue on another executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorHop {
    pub caller: DeclId,
    pub target: DeclId,
    pub executor: HopExecutor,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct CheckResult {
    pub diagnostics: Vec<Diagnostic>,
    pub hops: Vec<ExecutorHop>,
}

/// Check every declaration in the table.
pub fn check(table: &DeclTable, categories: &Categories, escape: &EscapeResult) -> CheckResult {
    let mut ctx = CheckCtx {
        table,
        categories,
        escape,
        result: CheckResult::default(),
    };
    for decl in &table.decls {
        ctx.check_decl(decl.id);
    }
    tracing::debug!(
        diagnostics = ctx.result.diagnostics.len(),
        hops = ctx.result.hops.len(),
        "isolation check complete"
    );
    ctx.result
}

// ── Internal context ────────────────────────────────────────────────────────

/// The code currently being checked.
#[derive(Debug, Clone, Copy)]
struct Source {
    decl: DeclId,
    closure: Option<ClosureId>,
    category: IsolationCategory,
}

struct CheckCtx<'a> {
    table: &'a DeclTable,
    categories: &'a Categories,
    escape: &'a EscapeResult,
    result: CheckResult,
}

impl<'a> CheckCtx<'a> {
    fn push(&mut self, decl: DeclId, diag: Diagnostic) {
        let module = self.table.module_name(self.table.decl(decl).module);
        self.result.diagnostics.push(diag.in_module(module));
    }

    fn check_decl(&mut self, id: DeclId) {
        let table = self.table;
        let decl = table.decl(id);
        let category = self.categories.get(id);

        if let Some(overridden) = decl.overrides() {
            self.check_override(id, overridden);
        }
        for link in decl.witnesses() {
            self.check_witness(id, link.requirement);
        }
        if let Some(body) = &decl.body {
            let source = Source {
                decl: id,
                closure: None,
                category,
            };
            self.walk(body, source);
        }
    }

    // ── Override and conformance ────────────────────────────────────────

    /// Categories of the same actor family compare equal: members inherited
    /// from a superclass actor run on the subclass instance.
    fn normalize(&self, category: IsolationCategory, relative_to: IsolationCategory) -> IsolationCategory {
        match (category, relative_to) {
            (IsolationCategory::InstanceIsolated(t), IsolationCategory::InstanceIsolated(s))
                if self.table.ancestry(s).contains(&t) || self.table.ancestry(t).contains(&s) =>
            {
                relative_to
            }
            _ => category,
        }
    }

    fn check_override(&mut self, id: DeclId, overridden: DeclId) {
        let table = self.table;
        let own = self.categories.get(id);
        let base = self.normalize(self.categories.get(overridden), own);
        if valid_override(own, base) {
            return;
        }
        let diag = Diagnostic::error(
            codes::E0202,
            table.decl(id).span,
            format!(
                "'{}' ({}) cannot override '{}' ({})",
                table.decl_path(id),
                table.describe(own),
                table.decl_path(overridden),
                table.describe(base)
            ),
        )
        .with_related(table.decl(overridden).span, "overridden declaration here")
        .with_cause(
            "an override must keep the overridden isolation or be actor-independent",
            None,
        );
        self.push(id, diag);
    }

    fn check_witness(&mut self, id: DeclId, requirement: DeclId) {
        let table = self.table;
        let witness = self.categories.get(id);
        let required = self.categories.get(requirement);
        let both_async = table.decl(id).is_async() && table.decl(requirement).is_async();
        if valid_witness(witness, required, both_async) {
            return;
        }
        let mut diag = Diagnostic::error(
            codes::E0203,
            table.decl(id).span,
            format!(
                "'{}' ({}) cannot satisfy requirement '{}' ({})",
                table.decl_path(id),
                table.describe(witness),
                table.decl_path(requirement),
                table.describe(required)
            ),
        )
        .with_related(table.decl(requirement).span, "requirement declared here");
        if required == IsolationCategory::Unknown {
            diag = diag.with_hint(format!(
                "mark '{}' @actorIndependent or make both declarations async",
                table.decl_path(id)
            ));
        }
        self.push(id, diag);
    }

    // ── Bodies ──────────────────────────────────────────────────────────

    fn walk(&mut self, body: &HirBody, source: Source) {
        for stmt in &body.stmts {
            match stmt {
                HirStmt::Access(site) => self.check_site(site, source),
                HirStmt::Call {
                    callee,
                    args,
                    is_await,
                    span,
                } => {
                    // A call into an async declaration suspends whether or
                    // not it is spelled with `await`.
                    let suspends = *is_await
                        || match callee {
                            Callee::Decl(site) => self.table.decl(site.target).is_async(),
                            Callee::Local(_) | Callee::Param(_) => false,
                        };
                    if let Callee::Decl(site) = callee {
                        self.check_site(site, source);
                        if suspends {
                            self.record_hop(site, source);
                        }
                    }
                    for arg in args {
                        match arg {
                            HirArg::Inout(site) => {
                                self.check_site(site, source);
                                if suspends {
                                    self.check_inout_across_await(site, callee, *span, source);
                                }
                            }
                            HirArg::Value { value, .. } => self.check_value(value, source),
                        }
                    }
                }
                HirStmt::Bind { value, .. }
                | HirStmt::Return { value, .. }
                | HirStmt::Use { value, .. } => self.check_value(value, source),
            }
        }
    }

    fn check_value(&mut self, value: &HirValue, source: Source) {
        match value {
            HirValue::Access(site) => self.check_site(site, source),
            HirValue::Closure(c) => self.check_closure(*c, source),
            HirValue::Local(_) | HirValue::Param(_) | HirValue::Opaque => {}
        }
    }

    fn check_closure(&mut self, closure: ClosureId, outer: Source) {
        let table = self.table;
        let capture = self.escape.get(closure);
        let source = Source {
            decl: outer.decl,
            closure: Some(closure),
            category: capture.isolation,
        };
        match &table.closure(closure).kind {
            ClosureKind::Literal(body) => self.walk(body, source),
            ClosureKind::PartialApplication(site) => self.check_site(site, source),
        }
    }

    fn check_site(&mut self, site: &AccessSite, source: Source) {
        let table = self.table;
        let target = table.decl(site.target);
        let raw = self.categories.get(site.target);
        let target_cat = if site.receiver == Receiver::SelfValue {
            self.normalize(raw, source.category)
        } else {
            raw
        };

        // Unsafe code is exempt from isolation checks.
        if source.category == IsolationCategory::IndependentUnsafe {
            return;
        }
        // Async targets are reached through an enqueue.
        if target.is_async() {
            return;
        }

        let other_instance = matches!(target_cat, IsolationCategory::InstanceIsolated(_))
            && site.receiver != Receiver::SelfValue;
        if !other_instance && compatible(source.category, target_cat) {
            return;
        }

        let mut diag = Diagnostic::error(
            codes::E0200,
            site.span,
            format!(
                "cannot {} '{}' ({}) from {} ({})",
                verb(site.kind),
                table.decl_path(site.target),
                table.describe(target_cat),
                self.source_label(source),
                table.describe(source.category)
            ),
        )
        .with_related(target.span, "target declared here");

        diag = if other_instance {
            diag.with_cause(
                format!(
                    "'{}' belongs to the actor instance '{}', not to `self`",
                    table.decl_path(site.target),
                    receiver_name(table, &site.receiver)
                ),
                Some(site.span),
            )
        } else if let Some(c) = source.closure.filter(|c| self.escape.get(*c).escaping) {
            diag.with_cause(
                "the closure may run after the enclosing call returns, outside the actor",
                Some(table.closure(c).span),
            )
        } else {
            diag.with_cause(
                "synchronous access requires the source to share the target's isolation",
                None,
            )
        };
        if target.kind.is_callable() {
            diag = diag.with_hint(format!(
                "make '{}' async and call it with `await`",
                table.decl_path(site.target)
            ));
        } else {
            diag = diag.with_hint("access the state from an async method of its actor");
        }
        self.push(source.decl, diag);
    }

    fn check_inout_across_await(
        &mut self,
        site: &AccessSite,
        callee: &Callee,
        span: Span,
        source: Source,
    ) {
        let table = self.table;
        if source.category == IsolationCategory::IndependentUnsafe {
            return;
        }
        let target = table.decl(site.target);
        let isolated = matches!(
            self.categories.get(site.target),
            IsolationCategory::InstanceIsolated(_)
        );
        if !isolated || !target.is_stored() {
            return;
        }
        let callee_name = match callee {
            Callee::Decl(c) => table.decl_path(c.target),
            Callee::Local(l) => table.local(*l).name.clone(),
            Callee::Param(p) => p.clone(),
        };
        let diag = Diagnostic::error(
            codes::E0201,
            site.span,
            format!(
                "cannot pass actor-isolated property '{}' by reference into async call to '{}'",
                table.decl_path(site.target),
                callee_name
            ),
        )
        .with_related(span, "suspension point here")
        .with_cause(
            "the actor may run other tasks while the call is suspended",
            None,
        )
        .with_hint("copy the value into a local before the call and write it back after");
        self.push(source.decl, diag);
    }

    /// Record an awaited call that is enqueued on a different executor.
    fn record_hop(&mut self, site: &AccessSite, source: Source) {
        let raw = self.categories.get(site.target);
        if shares_executor(source.category, raw, site.receiver == Receiver::SelfValue) {
            return;
        }
        let executor = match raw {
            IsolationCategory::InstanceIsolated(actor) => HopExecutor::Instance {
                actor,
                receiver: receiver_name(self.table, &site.receiver),
            },
            IsolationCategory::GlobalActorIsolated(actor) => HopExecutor::Global { actor },
            _ => return,
        };
        tracing::trace!(
            caller = %self.table.decl_path(source.decl),
            target = %self.table.decl_path(site.target),
            "executor hop"
        );
        self.result.hops.push(ExecutorHop {
            caller: source.decl,
            target: site.target,
            executor,
            span: site.span,
        });
    }

    fn source_label(&self, source: Source) -> String {
        let path = self.table.decl_path(source.decl);
        match source.closure {
            Some(_) => format!("a closure in '{}'", path),
            None => format!("'{}'", path),
        }
    }
}

fn verb(kind: AccessKind) -> &'static str {
    match kind {
        AccessKind::Read => "read",
        AccessKind::Write => "write",
        AccessKind::Call => "call",
        AccessKind::Inout => "pass",
        AccessKind::Reference => "reference",
    }
}

fn receiver_name(table: &DeclTable, receiver: &Receiver) -> String {
    match receiver {
        Receiver::SelfValue => "self".to_string(),
        Receiver::Param(name, _) => name.clone(),
        Receiver::Type(t) => table.ty(*t).name.clone(),
        Receiver::Global => "global".to_string(),
    }
}
