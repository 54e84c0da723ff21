// isolation.rs: Isolation categories and the three compatibility judgments
//
// `IsolationCategory` is a closed five-case variant. The access, override and
// conformance judgments are total functions over it so that the whole
// compatibility matrix can be enumerated in tests.
//
// Preconditions: categories come from the classifier.
// Postconditions: none (pure functions).
// Failure modes: none.
// Side effects: none.

use serde::Serialize;

use crate::id::TypeId;

/// The isolation category of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "category", content = "type")]
pub enum IsolationCategory {
    /// Isolated to the instance of the given actor type.
    InstanceIsolated(TypeId),
    /// Isolated to the singleton of the given global actor type.
    GlobalActorIsolated(TypeId),
    /// Touches no actor state; callable from anywhere.
    Independent,
    /// Callable from anywhere; body exempt from isolation checks.
    IndependentUnsafe,
    /// Legacy code with no isolation information.
    Unknown,
}

impl IsolationCategory {
    /// All category shapes over the given actor and global actor types.
    pub fn all(actor: TypeId, global_actor: TypeId) -> [IsolationCategory; 5] {
        [
            IsolationCategory::InstanceIsolated(actor),
            IsolationCategory::GlobalActorIsolated(global_actor),
            IsolationCategory::Independent,
            IsolationCategory::IndependentUnsafe,
            IsolationCategory::Unknown,
        ]
    }

    pub fn is_independent(self) -> bool {
        matches!(
            self,
            IsolationCategory::Independent | IsolationCategory::IndependentUnsafe
        )
    }

    /// True for categories whose state is owned by some actor queue.
    pub fn is_actor_isolated(self) -> bool {
        matches!(
            self,
            IsolationCategory::InstanceIsolated(_) | IsolationCategory::GlobalActorIsolated(_)
        )
    }

    pub fn global_actor(self) -> Option<TypeId> {
        match self {
            IsolationCategory::GlobalActorIsolated(t) => Some(t),
            _ => None,
        }
    }
}

/// Which clause of the access judgment admitted an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessClause {
    SameIsolation,
    IndependentTarget,
    UnsafeSource,
    UnknownTarget,
}

/// Classify a synchronous access from `source` code to a `target` declaration.
///
/// Returns the first admitting clause, or `None` when the access is a
/// violation. Only meaningful for non-async targets.
pub fn access_clause(
    source: IsolationCategory,
    target: IsolationCategory,
) -> Option<AccessClause> {
    use IsolationCategory::*;
    if source == target {
        return Some(AccessClause::SameIsolation);
    }
    match (source, target) {
        (_, Independent | IndependentUnsafe) => Some(AccessClause::IndependentTarget),
        (IndependentUnsafe, _) => Some(AccessClause::UnsafeSource),
        (_, Unknown) => Some(AccessClause::UnknownTarget),
        _ => None,
    }
}

/// Access judgment for a synchronous access.
pub fn compatible(source: IsolationCategory, target: IsolationCategory) -> bool {
    access_clause(source, target).is_some()
}

/// Override judgment: the overriding declaration must keep the overridden
/// category, or drop to `Independent`.
pub fn valid_override(overriding: IsolationCategory, overridden: IsolationCategory) -> bool {
    overriding == overridden || overriding == IsolationCategory::Independent
}

/// Conformance judgment for a witness satisfying a protocol requirement.
///
/// `both_async` is true when both the witness and the requirement are async.
pub fn valid_witness(
    witness: IsolationCategory,
    requirement: IsolationCategory,
    both_async: bool,
) -> bool {
    if witness == requirement {
        return true;
    }
    if requirement != IsolationCategory::Unknown {
        return false;
    }
    both_async || witness == IsolationCategory::Independent
}

/// Whether code running under `source` reaches `target` without leaving its
/// executor. `via_self` is set when the target is reached through `self`.
pub fn shares_executor(
    source: IsolationCategory,
    target: IsolationCategory,
    via_self: bool,
) -> bool {
    use IsolationCategory::*;
    match (source, target) {
        (InstanceIsolated(_), InstanceIsolated(_)) => via_self,
        (GlobalActorIsolated(a), GlobalActorIsolated(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use IsolationCategory::*;

    const A: TypeId = TypeId(0);
    const B: TypeId = TypeId(1);
    const G: TypeId = TypeId(2);

    #[test]
    fn same_actor_type_is_compatible() {
        assert_eq!(
            access_clause(InstanceIsolated(A), InstanceIsolated(A)),
            Some(AccessClause::SameIsolation)
        );
        assert!(!compatible(InstanceIsolated(A), InstanceIsolated(B)));
    }

    #[test]
    fn unknown_source_cannot_reach_isolated_state() {
        assert!(!compatible(Unknown, InstanceIsolated(A)));
        assert!(!compatible(Unknown, GlobalActorIsolated(G)));
        assert!(compatible(InstanceIsolated(A), Unknown));
    }

    #[test]
    fn unsafe_source_reaches_anything() {
        assert_eq!(
            access_clause(IndependentUnsafe, InstanceIsolated(A)),
            Some(AccessClause::UnsafeSource)
        );
        assert!(!compatible(Independent, InstanceIsolated(A)));
    }

    #[test]
    fn override_rules() {
        assert!(valid_override(GlobalActorIsolated(G), GlobalActorIsolated(G)));
        assert!(valid_override(Independent, GlobalActorIsolated(G)));
        assert!(!valid_override(Unknown, GlobalActorIsolated(G)));
        assert!(!valid_override(IndependentUnsafe, InstanceIsolated(A)));
    }

    #[test]
    fn witness_rules() {
        assert!(valid_witness(InstanceIsolated(A), InstanceIsolated(A), false));
        assert!(valid_witness(InstanceIsolated(A), Unknown, true));
        assert!(!valid_witness(InstanceIsolated(A), Unknown, false));
        assert!(valid_witness(Independent, Unknown, false));
        assert!(!valid_witness(Independent, GlobalActorIsolated(G), false));
    }

    #[test]
    fn executor_sharing() {
        assert!(shares_executor(InstanceIsolated(A), InstanceIsolated(A), true));
        assert!(!shares_executor(InstanceIsolated(A), InstanceIsolated(A), false));
        assert!(shares_executor(GlobalActorIsolated(G), GlobalActorIsolated(G), false));
        assert!(!shares_executor(InstanceIsolated(A), GlobalActorIsolated(G), true));
        assert!(!shares_executor(InstanceIsolated(A), Independent, true));
        assert!(!shares_executor(Unknown, Unknown, false));
    }
}
