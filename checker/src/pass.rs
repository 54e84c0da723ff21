// pass.rs: Pass descriptor module: metadata, dependency resolution, artifact IDs
//
// Declares the checker's semantic passes (parse is outside the runner),
// their dependency edges, and the artifacts they produce. Used by the pipeline
// runner to compute minimal pass subsets for each --emit target.

use std::collections::HashSet;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

/// Identifies each checker pass (parse excluded, handled before the runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Resolve,
    Classify,
    Escape,
    Check,
}

/// Machine-readable artifact identifiers. Each maps to a concrete type
/// in the compilation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Declarations, // DeclTable
    Registry,     // GlobalActorRegistry
    Categories,   // Categories
    Captures,     // EscapeResult
    Hops,         // Vec<ExecutorHop>
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a checker pass.
pub struct PassDescriptor {
    /// Human-readable name for diagnostics/verbose output.
    pub name: &'static str,
    /// Pass dependencies (other passes whose outputs this pass consumes).
    pub inputs: &'static [PassId],
    /// Artifacts this pass produces.
    pub outputs: &'static [ArtifactId],
    /// Pre/post conditions (documentation only).
    pub invariants: &'static str,
    /// Whether error diagnostics from this pass stop the pipeline. Passes
    /// that still produce complete artifacts let later passes report too.
    pub halts_on_error: bool,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Resolve => PassDescriptor {
            name: "resolve",
            inputs: &[],
            outputs: &[ArtifactId::Declarations, ArtifactId::Registry],
            invariants: "all names resolved, override and witness links built",
            halts_on_error: true,
        },
        PassId::Classify => PassDescriptor {
            name: "classify",
            inputs: &[PassId::Resolve],
            outputs: &[ArtifactId::Categories],
            invariants: "exactly one category per declaration",
            halts_on_error: false,
        },
        PassId::Escape => PassDescriptor {
            name: "escape",
            inputs: &[PassId::Classify],
            outputs: &[ArtifactId::Captures],
            invariants: "one capture record per closure",
            halts_on_error: false,
        },
        PassId::Check => PassDescriptor {
            name: "check",
            inputs: &[PassId::Classify, PassId::Escape],
            outputs: &[ArtifactId::Hops],
            invariants: "every access, override and witness edge judged",
            halts_on_error: true,
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order (used for iteration).
pub const ALL_PASSES: [PassId; 4] = [
    PassId::Resolve,
    PassId::Classify,
    PassId::Escape,
    PassId::Check,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────
