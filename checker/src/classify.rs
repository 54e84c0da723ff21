// classify.rs: Isolation classification
//
// Assigns every declaration exactly one `IsolationCategory`. Classification
// is demand-driven: a declaration's category may depend on the category of
// the declaration it overrides, of the requirements it witnesses, and on its
// owning type's effective attribute. Results are memoized so the outcome is
// independent of the order in which declarations are visited.
//
// Preconditions: `table` was produced by resolve without blocking errors.
// Postconditions: `Categories` holds one category per `DeclId`.
// Failure modes: propagation sources naming different global actors → E0101.
// Side effects: none.

use std::collections::{HashMap, HashSet};

use crate::ast::{Span, TypeKind};
use crate::decl::{DeclTable, ExplicitAttr};
use crate::diag::{codes, Diagnostic};
use crate::id::{DeclId, TypeId};
use crate::isolation::IsolationCategory;

// ── Public types ────────────────────────────────────────────────────────────

/// The resolved category of every declaration, indexed by `DeclId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categories {
    by_decl: Vec<IsolationCategory>,
}

impl Categories {
    pub fn get(&self, decl: DeclId) -> IsolationCategory {
        self.by_decl[decl.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, IsolationCategory)> + '_ {
        self.by_decl
            .iter()
            .enumerate()
            .map(|(i, c)| (DeclId(i as u32), *c))
    }

    pub fn len(&self) -> usize {
        self.by_decl.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_decl.is_empty()
    }
}

#[derive(Debug)]
pub struct ClassifyResult {
    pub categories: Categories,
    pub diagnostics: Vec<Diagnostic>,
}

/// Classify every declaration in the table, in declaration order.
pub fn classify_all(table: &DeclTable) -> ClassifyResult {
    let order: Vec<DeclId> = table.decls.iter().map(|d| d.id).collect();
    classify_in_order(table, &order)
}

/// Classify every declaration, visiting them in `order` first. Any
/// declaration missing from `order` is classified afterwards.
pub fn classify_in_order(table: &DeclTable, order: &[DeclId]) -> ClassifyResult {
    let mut classifier = Classifier::new(table);
    for &d in order {
        classifier.classify(d);
    }
    classifier.finish()
}

// ── Classifier ──────────────────────────────────────────────────────────────

/// A category inherited from another declaration or type, with its origin.
struct Source {
    category: IsolationCategory,
    what: String,
    span: Span,
}

pub struct Classifier<'t> {
    table: &'t DeclTable,
    memo: HashMap<DeclId, IsolationCategory>,
    in_progress: HashSet<DeclId>,
    type_memo: HashMap<TypeId, Option<IsolationCategory>>,
    types_in_progress: HashSet<TypeId>,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> Classifier<'t> {
    pub fn new(table: &'t DeclTable) -> Self {
        Classifier {
            table,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
            type_memo: HashMap::new(),
            types_in_progress: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Category of `decl`, computing and memoizing it on first request.
    pub fn classify(&mut self, decl: DeclId) -> IsolationCategory {
        if let Some(&c) = self.memo.get(&decl) {
            return c;
        }
        if !self.in_progress.insert(decl) {
            return IsolationCategory::Unknown;
        }
        let category = self.compute(decl);
        self.in_progress.remove(&decl);
        self.memo.insert(decl, category);
        tracing::trace!(
            decl = %self.table.decl_path(decl),
            category = %self.table.category_tag(category),
            "classified"
        );
        category
    }

    pub fn finish(mut self) -> ClassifyResult {
        let table = self.table;
        for info in &table.types {
            self.type_default(info.id);
        }
        let by_decl = (0..self.table.decls.len())
            .map(|i| self.classify(DeclId(i as u32)))
            .collect();
        ClassifyResult {
            categories: Categories { by_decl },
            diagnostics: self.diagnostics,
        }
    }

    fn compute(&mut self, id: DeclId) -> IsolationCategory {
        let table = self.table;
        let decl = table.decl(id);

        // Explicit attributes always win.
        if let Some(category) = decl.explicit_attribute().category() {
            return category;
        }

        if let Some(owner) = decl.owner {
            let info = table.ty(owner);
            if info.is_actor() && decl.is_instance_member() && !decl.is_value_constant() {
                return if info.kind == TypeKind::GlobalActor {
                    IsolationCategory::GlobalActorIsolated(owner)
                } else {
                    IsolationCategory::InstanceIsolated(owner)
                };
            }
        }

        if decl.is_value_constant() {
            return IsolationCategory::Independent;
        }

        // Mandatory inheritance.
        let mut sources = Vec::new();
        if let Some(overridden) = decl.overrides() {
            let category = self.classify(overridden);
            if category != IsolationCategory::Unknown {
                sources.push(Source {
                    category,
                    what: format!("overridden declaration '{}'", table.decl_path(overridden)),
                    span: table.decl(overridden).span,
                });
            }
        }
        for link in decl.witnesses() {
            if link.conforming_module != decl.module {
                continue;
            }
            let category = self.classify(link.requirement);
            if category != IsolationCategory::Unknown {
                sources.push(Source {
                    category,
                    what: format!("protocol requirement '{}'", table.decl_path(link.requirement)),
                    span: table.decl(link.requirement).span,
                });
            }
        }

        // Default from the extension, then the owning type.
        let default = match decl.extension_attr.category() {
            Some(category) => Some(Source {
                category,
                what: "enclosing extension".to_string(),
                span: decl.span,
            }),
            None => decl.owner.and_then(|owner| {
                self.type_default(owner).map(|category| Source {
                    category,
                    what: format!("type '{}'", table.ty(owner).name),
                    span: table.ty(owner).span,
                })
            }),
        };

        if let Some(first) = sources.first() {
            let chosen = first.category;
            let mut all: Vec<&Source> = sources.iter().collect();
            all.extend(default.iter());
            self.check_global_actor_agreement(id, &all);
            return chosen;
        }

        default
            .map(|s| s.category)
            .unwrap_or(IsolationCategory::Unknown)
    }

    /// Report when inherited sources resolve to different global actors.
    fn check_global_actor_agreement(&mut self, id: DeclId, sources: &[&Source]) {
        let Some(first) = sources.iter().find(|s| s.category.global_actor().is_some()) else {
            return;
        };
        let Some(other) = sources.iter().find(|s| {
            s.category.global_actor().is_some() && s.category != first.category
        }) else {
            return;
        };
        let table = self.table;
        let decl = table.decl(id);
        let diag = Diagnostic::error(
            codes::E0101,
            decl.span,
            format!(
                "conflicting global actor isolation for '{}'",
                table.decl_path(id)
            ),
        )
        .in_module(table.module_name(decl.module))
        .with_cause(
            format!("{} is {}", first.what, table.describe(first.category)),
            Some(first.span),
        )
        .with_cause(
            format!("{} is {}", other.what, table.describe(other.category)),
            Some(other.span),
        )
        .with_hint("add an explicit isolation attribute to the declaration");
        self.diagnostics.push(diag);
    }

    /// Effective default isolation a type gives its members.
    ///
    /// Global actor attributes propagate from a class to all subclasses;
    /// `@actorIndependent` on a class stops that propagation.
    fn type_default(&mut self, ty: TypeId) -> Option<IsolationCategory> {
        if let Some(&c) = self.type_memo.get(&ty) {
            return c;
        }
        if !self.types_in_progress.insert(ty) {
            return None;
        }
        let table = self.table;
        let info = table.ty(ty);
        let inherited = match info.superclass {
            Some(sup) => self
                .type_default(sup)
                .filter(|c| c.global_actor().is_some()),
            None => None,
        };
        let result = match (info.explicit, inherited) {
            (ExplicitAttr::GlobalActor(own), Some(parent)) if parent.global_actor() != Some(own) => {
                let sup = info.superclass.map(|s| table.ty(s));
                let mut diag = Diagnostic::error(
                    codes::E0101,
                    info.span,
                    format!(
                        "class '{}' is {} but its superclass is {}",
                        info.name,
                        table.describe(IsolationCategory::GlobalActorIsolated(own)),
                        table.describe(parent)
                    ),
                )
                .in_module(table.module_name(info.module))
                .with_hint("a subclass must keep its superclass's global actor");
                if let Some(sup) = sup {
                    diag = diag.with_related(sup.span, "superclass declared here");
                }
                self.diagnostics.push(diag);
                Some(IsolationCategory::GlobalActorIsolated(own))
            }
            (ExplicitAttr::None, inherited) => inherited,
            (explicit, _) => explicit.category(),
        };
        self.types_in_progress.remove(&ty);
        self.type_memo.insert(ty, result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::tests::{resolve_modules, resolve_str};
    use IsolationCategory::*;

    const UI: &str = "global actor UIActor { static let shared: UIActor }\n\
                      global actor DbActor { static let shared: DbActor }\n";

    fn classify_src(source: &str) -> (DeclTable, ClassifyResult) {
        let r = resolve_str(source);
        assert!(
            r.diagnostics.iter().all(|d| !d.is_error()),
            "resolve errors: {:#?}",
            r.diagnostics
        );
        let result = classify_all(&r.table);
        (r.table, result)
    }

    fn cat(table: &DeclTable, result: &ClassifyResult, ty: &str, member: &str) -> IsolationCategory {
        let t = table.lookup_type(ty).expect("type");
        let d = table.ty(t).members.iter().copied().find(|&d| table.decl(d).name == member);
        result.categories.get(d.expect("member"))
    }

    fn ty(table: &DeclTable, name: &str) -> TypeId {
        table.lookup_type(name).expect("type")
    }

    #[test]
    fn actor_members_are_instance_isolated() {
        let (t, r) = classify_src(
            "actor BankAccount {\n\
               let accountNumber: Int\n\
               var balance: Double\n\
               let owner: BankAccount\n\
               static func make() { }\n\
               func deposit(amount: Double) { }\n\
               async func transfer(amount: Double) { }\n\
               init() { }\n\
               deinit { }\n\
             }",
        );
        let acct = ty(&t, "BankAccount");
        assert_eq!(cat(&t, &r, "BankAccount", "accountNumber"), Independent);
        assert_eq!(cat(&t, &r, "BankAccount", "balance"), InstanceIsolated(acct));
        assert_eq!(cat(&t, &r, "BankAccount", "owner"), InstanceIsolated(acct));
        assert_eq!(cat(&t, &r, "BankAccount", "make"), Unknown);
        assert_eq!(cat(&t, &r, "BankAccount", "deposit"), InstanceIsolated(acct));
        assert_eq!(cat(&t, &r, "BankAccount", "transfer"), InstanceIsolated(acct));
        assert_eq!(cat(&t, &r, "BankAccount", "init"), InstanceIsolated(acct));
        assert_eq!(cat(&t, &r, "BankAccount", "deinit"), InstanceIsolated(acct));
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn explicit_attributes_win() {
        let (t, r) = classify_src(&format!(
            "{UI}actor A {{\n\
               @actorIndependent func id() {{ }}\n\
               @actorIndependent(unsafe) func peek() {{ }}\n\
             }}\n\
             @UIActor func draw() {{ }}"
        ));
        assert_eq!(cat(&t, &r, "A", "id"), Independent);
        assert_eq!(cat(&t, &r, "A", "peek"), IndependentUnsafe);
        let draw = t.globals["draw"];
        assert_eq!(r.categories.get(draw), GlobalActorIsolated(ty(&t, "UIActor")));
    }

    #[test]
    fn global_actor_members_are_global_isolated() {
        let (t, r) = classify_src(&format!("{UI}extension UIActor {{ func layout() {{ }} }}"));
        let ui = ty(&t, "UIActor");
        assert_eq!(cat(&t, &r, "UIActor", "layout"), GlobalActorIsolated(ui));
        assert_eq!(cat(&t, &r, "UIActor", "shared"), Unknown);
    }

    #[test]
    fn override_inherits_global_actor() {
        let (t, r) = classify_src(&format!(
            "{UI}class View {{ @UIActor func render() {{ }} }}\n\
             class Button : View {{ func render() {{ }} }}"
        ));
        let ui = ty(&t, "UIActor");
        assert_eq!(cat(&t, &r, "Button", "render"), GlobalActorIsolated(ui));
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn class_attribute_propagates_to_subclasses_and_members() {
        let (t, r) = classify_src(&format!(
            "{UI}@UIActor class View {{ func layout() {{ }} }}\n\
             class Label : View {{ func text() {{ }}\n static func make() {{ }} }}"
        ));
        let ui = ty(&t, "UIActor");
        assert_eq!(cat(&t, &r, "View", "layout"), GlobalActorIsolated(ui));
        assert_eq!(cat(&t, &r, "Label", "text"), GlobalActorIsolated(ui));
        assert_eq!(cat(&t, &r, "Label", "make"), GlobalActorIsolated(ui));
    }

    #[test]
    fn independent_class_stops_propagation_but_overrides_inherit() {
        let (t, r) = classify_src(&format!(
            "{UI}@UIActor class View {{ func render() {{ }} }}\n\
             @actorIndependent class Model : View {{ func render() {{ }}\n func compute() {{ }} }}"
        ));
        let ui = ty(&t, "UIActor");
        assert_eq!(cat(&t, &r, "Model", "render"), GlobalActorIsolated(ui));
        assert_eq!(cat(&t, &r, "Model", "compute"), Independent);
    }

    #[test]
    fn subclass_naming_different_global_actor_conflicts() {
        let (_, r) = classify_src(&format!(
            "{UI}@UIActor class View {{ }}\n@DbActor class Grid : View {{ }}"
        ));
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].code, Some(codes::E0101));
    }

    #[test]
    fn extension_attribute_is_default() {
        let (t, r) = classify_src(&format!(
            "{UI}class Widget {{ }}\n\
             @UIActor extension Widget {{ func paint() {{ }}\n @actorIndependent func size() {{ }} }}"
        ));
        assert_eq!(cat(&t, &r, "Widget", "paint"), GlobalActorIsolated(ty(&t, "UIActor")));
        assert_eq!(cat(&t, &r, "Widget", "size"), Independent);
    }

    #[test]
    fn protocol_attribute_reaches_requirements_and_same_module_witnesses() {
        let (t, r) = classify_src(&format!(
            "{UI}@UIActor protocol Drawable {{ func draw() }}\n\
             class Canvas : Drawable {{ func draw() {{ }} }}"
        ));
        let ui = ty(&t, "UIActor");
        assert_eq!(cat(&t, &r, "Drawable", "draw"), GlobalActorIsolated(ui));
        assert_eq!(cat(&t, &r, "Canvas", "draw"), GlobalActorIsolated(ui));
    }

    #[test]
    fn witness_in_other_module_does_not_inherit() {
        let r = resolve_modules(&[
            (
                "Lib",
                "global actor UIActor { static let shared: UIActor }\n\
                 @UIActor protocol Drawable { func draw() }\n\
                 class Canvas { func draw() { } }",
            ),
            ("App", "extension Canvas : Drawable { }"),
        ]);
        let result = classify_all(&r.table);
        let canvas = r.table.lookup_type("Canvas").expect("Canvas");
        let draw = r.table.find_member(canvas, "draw").expect("draw");
        assert_eq!(result.categories.get(draw), Unknown);
    }

    #[test]
    fn conflicting_mandatory_sources() {
        let (_, r) = classify_src(&format!(
            "{UI}@DbActor protocol Store {{ func save() }}\n\
             class Base {{ @UIActor func save() {{ }} }}\n\
             class Doc : Base, Store {{ func save() {{ }} }}"
        ));
        let conflicts: Vec<_> = r
            .diagnostics
            .iter()
            .filter(|d| d.code == Some(codes::E0101))
            .collect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].cause_chain.len(), 2);
    }

    #[test]
    fn legacy_code_is_unknown() {
        let (t, r) = classify_src("class Legacy { var x: Int\n func f() { } }\nfunc g() { }");
        assert_eq!(cat(&t, &r, "Legacy", "x"), Unknown);
        assert_eq!(cat(&t, &r, "Legacy", "f"), Unknown);
        assert_eq!(r.categories.get(t.globals["g"]), Unknown);
    }

    #[test]
    fn classification_is_idempotent_and_order_independent() {
        let (t, forward) = classify_src(&format!(
            "{UI}@UIActor class View {{ func render() {{ }} }}\n\
             class Button : View {{ func render() {{ }} }}\n\
             class Tiny : Button {{ func render() {{ }} }}"
        ));
        let reversed: Vec<DeclId> = t.decls.iter().rev().map(|d| d.id).collect();
        let backward = classify_in_order(&t, &reversed);
        assert_eq!(forward.categories, backward.categories);
        let again = classify_all(&t);
        assert_eq!(forward.categories, again.categories);
    }
}
