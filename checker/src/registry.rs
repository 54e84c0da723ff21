// registry.rs: Static global actor registry
//
// Collects every `global actor` type declared across the checked modules and
// its singleton accessor (`static let shared`). Attributes such as `@UIActor`
// are resolved against this registry; identity is by declared type, never by
// spelling or by the instance the accessor happens to return.
//
// Preconditions: `table` has types and members collected by resolve.
// Postconditions: one entry per global actor type that has a valid accessor.
// Failure modes: missing or malformed accessor → E0103.
// Side effects: none.

use std::collections::BTreeMap;

use crate::ast::TypeKind;
use crate::decl::{DeclKind, DeclTable};
use crate::diag::{codes, Diagnostic};
use crate::id::{DeclId, ModuleId, TypeId};

/// Name of the singleton accessor every global actor must declare.
pub const SINGLETON_ACCESSOR: &str = "shared";

// ── Data types ──────────────────────────────────────────────────────────────

/// Metadata for one global actor type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalActorInfo {
    pub ty: TypeId,
    pub name: String,
    pub module: ModuleId,
    /// The `static let shared` declaration.
    pub accessor: DeclId,
}

/// Registry of global actor types, keyed by declared name.
#[derive(Debug, Default)]
pub struct GlobalActorRegistry {
    by_name: BTreeMap<String, GlobalActorInfo>,
}

impl GlobalActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the declaration table and register every global actor type.
    pub fn build(table: &DeclTable) -> (Self, Vec<Diagnostic>) {
        let mut registry = Self::new();
        let mut diagnostics = Vec::new();

        for info in table.types.iter().filter(|t| t.kind == TypeKind::GlobalActor) {
            let accessor = info
                .members
                .iter()
                .copied()
                .find(|&d| table.decl(d).name == SINGLETON_ACCESSOR);
            let module = table.module_name(info.module).to_string();
            match accessor {
                None => diagnostics.push(
                    Diagnostic::error(
                        codes::E0103,
                        info.span,
                        format!(
                            "global actor '{}' does not declare a singleton accessor",
                            info.name
                        ),
                    )
                    .in_module(module)
                    .with_hint(format!(
                        "add `static let {}: {}`",
                        SINGLETON_ACCESSOR, info.name
                    )),
                ),
                Some(d) => {
                    let decl = table.decl(d);
                    let valid = decl.is_static
                        && decl.kind == DeclKind::StoredProperty { mutable: false };
                    if !valid {
                        diagnostics.push(
                            Diagnostic::error(
                                codes::E0103,
                                decl.span,
                                format!(
                                    "singleton accessor '{}.{}' must be a `static let`",
                                    info.name, SINGLETON_ACCESSOR
                                ),
                            )
                            .in_module(module)
                            .with_related(info.span, "global actor declared here"),
                        );
                        continue;
                    }
                    tracing::trace!(global_actor = %info.name, "registered global actor");
                    registry.by_name.insert(
                        info.name.clone(),
                        GlobalActorInfo {
                            ty: info.id,
                            name: info.name.clone(),
                            module: info.module,
                            accessor: d,
                        },
                    );
                }
            }
        }

        (registry, diagnostics)
    }

    pub fn resolve(&self, name: &str) -> Option<&GlobalActorInfo> {
        self.by_name.get(name)
    }

    pub fn get(&self, ty: TypeId) -> Option<&GlobalActorInfo> {
        self.by_name.values().find(|info| info.ty == ty)
    }

    /// Two references denote the same global actor iff they name the same
    /// declared type.
    pub fn same_actor(&self, a: TypeId, b: TypeId) -> bool {
        a == b
    }

    pub fn global_actors(&self) -> impl Iterator<Item = &GlobalActorInfo> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::diag::codes;
    use crate::resolve::tests::resolve_str;

    #[test]
    fn registers_global_actor_with_accessor() {
        let r = resolve_str("global actor UIActor { static let shared: UIActor }");
        assert!(r.diagnostics.is_empty(), "{:#?}", r.diagnostics);
        let info = r.registry.resolve("UIActor").expect("registered");
        assert_eq!(info.name, "UIActor");
        assert_eq!(r.table.decl(info.accessor).name, "shared");
        assert_eq!(r.registry.get(info.ty).map(|i| i.ty), Some(info.ty));
        assert_eq!(r.registry.len(), 1);
    }

    #[test]
    fn missing_accessor_is_an_error() {
        let r = resolve_str("global actor DbActor { }");
        assert!(r
            .diagnostics
            .iter()
            .any(|d| d.code == Some(codes::E0103) && d.message.contains("DbActor")));
        assert!(r.registry.is_empty());
    }

    #[test]
    fn mutable_accessor_is_an_error() {
        let r = resolve_str("global actor DbActor { static var shared: DbActor }");
        assert!(r.diagnostics.iter().any(|d| d.code == Some(codes::E0103)));
        assert!(r.registry.resolve("DbActor").is_none());
    }

    #[test]
    fn identity_is_by_declared_type() {
        let r = resolve_str(
            "global actor A { static let shared: A }\n\
             global actor B { static let shared: A }",
        );
        let a = r.registry.resolve("A").expect("A").ty;
        let b = r.registry.resolve("B").expect("B").ty;
        assert!(!r.registry.same_actor(a, b));
        assert!(r.registry.same_actor(a, a));
    }

    #[test]
    fn ordinary_actors_are_not_registered() {
        let r = resolve_str("actor Counter { var n: Int }");
        assert!(r.registry.resolve("Counter").is_none());
    }
}
