// Property-based tests for checker invariants.
//
// Two categories:
// 1. Compatibility judgments: exhaustive check over all category pairs
// 2. Classification: generated class hierarchies classify the same way in
//    any order, and inherited categories follow overrides
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use isoc::classify::{classify_all, classify_in_order};
use isoc::decl::DeclTable;
use isoc::id::{DeclId, TypeId};
use isoc::isolation::{compatible, valid_override, valid_witness, IsolationCategory};
use isoc::pipeline::{parse_module, CheckOptions};
use isoc::resolve::resolve;
use proptest::prelude::*;

// ── Compatibility tables ────────────────────────────────────────────────────

const ACTOR: TypeId = TypeId(0);
const GLOBAL: TypeId = TypeId(1);

fn categories() -> [IsolationCategory; 5] {
    IsolationCategory::all(ACTOR, GLOBAL)
}

/// Rows are sources, columns targets, both in `IsolationCategory::all` order:
/// instance, global, independent, unsafe, unknown.
const ACCESS: [[bool; 5]; 5] = [
    [true, false, true, true, true],
    [false, true, true, true, true],
    [false, false, true, true, true],
    [true, true, true, true, true],
    [false, false, true, true, true],
];

#[test]
fn access_table_is_exact() {
    let all = categories();
    for (i, &source) in all.iter().enumerate() {
        for (j, &target) in all.iter().enumerate() {
            assert_eq!(
                compatible(source, target),
                ACCESS[i][j],
                "compatible({:?}, {:?})",
                source,
                target
            );
        }
    }
}

#[test]
fn distinct_actor_types_never_mix() {
    let other = TypeId(7);
    assert!(!compatible(
        IsolationCategory::InstanceIsolated(ACTOR),
        IsolationCategory::InstanceIsolated(other)
    ));
    assert!(!compatible(
        IsolationCategory::GlobalActorIsolated(GLOBAL),
        IsolationCategory::GlobalActorIsolated(other)
    ));
}

#[test]
fn override_and_witness_tables() {
    let all = categories();
    for &overriding in &all {
        for &overridden in &all {
            let expected = overriding == overridden || overriding == IsolationCategory::Independent;
            assert_eq!(valid_override(overriding, overridden), expected);
        }
    }
    for &witness in &all {
        for &requirement in &all {
            for both_async in [false, true] {
                let expected = witness == requirement
                    || (requirement == IsolationCategory::Unknown
                        && (both_async || witness == IsolationCategory::Independent));
                assert_eq!(
                    valid_witness(witness, requirement, both_async),
                    expected,
                    "witness {:?} for {:?} (async: {})",
                    witness,
                    requirement,
                    both_async
                );
            }
        }
    }
}

// ── Program generator ───────────────────────────────────────────────────────

const PRELUDE: &str = "global actor UIActor { static let shared: UIActor }\n\
                       global actor DbActor { static let shared: DbActor }\n";

const ATTRS: [&str; 5] = [
    "",
    "@UIActor ",
    "@DbActor ",
    "@actorIndependent ",
    "@actorIndependent(unsafe) ",
];

/// One generated class: attribute index, optional superclass offset,
/// and one attribute index per member.
#[derive(Debug, Clone)]
struct ClassSpec {
    attr: usize,
    parent: Option<usize>,
    members: Vec<usize>,
}

fn arb_class() -> impl Strategy<Value = ClassSpec> {
    (
        0..ATTRS.len(),
        prop::option::of(0usize..8),
        prop::collection::vec(0..ATTRS.len(), 1..=3),
    )
        .prop_map(|(attr, parent, members)| ClassSpec {
            attr,
            parent,
            members,
        })
}

/// Render classes `C0..Cn`. Each class may inherit from an earlier one, and
/// every class declares methods `m0..mk`, so subclasses override.
fn render(classes: &[ClassSpec]) -> String {
    let mut out = PRELUDE.to_string();
    for (i, c) in classes.iter().enumerate() {
        out.push_str(ATTRS[c.attr]);
        out.push_str(&format!("class C{}", i));
        if let (Some(offset), true) = (c.parent, i > 0) {
            out.push_str(&format!(" : C{}", offset % i));
        }
        out.push_str(" {\n");
        for (k, attr) in c.members.iter().enumerate() {
            out.push_str(&format!("  {}func m{}() {{ }}\n", ATTRS[*attr], k));
        }
        out.push_str("}\n");
    }
    out
}

fn resolve_source(source: &str) -> DeclTable {
    let module = parse_module("Main", source).expect("generated program parses");
    resolve(&[module], &CheckOptions::default()).table
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn classification_is_order_independent(
        classes in prop::collection::vec(arb_class(), 1..6),
        keys in prop::collection::vec(any::<u32>(), 32),
    ) {
        let table = resolve_source(&render(&classes));
        let baseline = classify_all(&table);

        let mut order: Vec<DeclId> = table.decls.iter().map(|d| d.id).collect();
        order.sort_by_key(|d| (keys[d.0 as usize % keys.len()], d.0));
        let shuffled = classify_in_order(&table, &order);

        prop_assert_eq!(&baseline.categories, &shuffled.categories);
        prop_assert_eq!(baseline.diagnostics.len(), shuffled.diagnostics.len());
        prop_assert_eq!(baseline.categories.len(), table.decls.len());
    }

    #[test]
    fn unattributed_overrides_inherit(
        classes in prop::collection::vec(arb_class(), 2..6),
    ) {
        let table = resolve_source(&render(&classes));
        let result = classify_all(&table);
        for decl in &table.decls {
            let Some(overridden) = decl.overrides() else { continue };
            if !decl.explicit_attribute().is_none() {
                continue;
            }
            let parent = result.categories.get(overridden);
            if parent == IsolationCategory::Unknown {
                continue;
            }
            prop_assert_eq!(
                result.categories.get(decl.id),
                parent,
                "{} should inherit from {}",
                table.decl_path(decl.id),
                table.decl_path(overridden)
            );
        }
    }
}
