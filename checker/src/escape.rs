// escape.rs: Closure and partial-application escape analysis
//
// Builds a capture graph over closures and local bindings, then decides for
// every closure whether it may run after the enclosing call returns. An
// escaping closure formed in actor-isolated code loses the actor's isolation
// and is checked as actor-independent code.
//
// Graph:
//   nodes  closures (literals and partial applications) and `let` locals
//   edges  value flow, `let x = c` (c → x) and `let y = x` (x → y), plus
//          capture of a local inside another closure (x → closure)
//   sinks  call arguments (escaping iff the receiving parameter escapes, or
//          the call suspends into another executor) and `return` (always
//          escaping)
//
// Preconditions: `table` bodies are resolved; `categories` is complete.
// Postconditions: one `ClosureCapture` per `ClosureId`, in id order.
// Failure modes: none. The analysis is conservative: a closure is only
//   non-escaping when every flow from it ends in a non-escaping argument.
// Side effects: none.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::classify::Categories;
use crate::decl::DeclTable;
use crate::hir::{Callee, ClosureKind, HirArg, HirBody, HirStmt, HirValue, Receiver};
use crate::id::{ClosureId, LocalId};
use crate::isolation::{shares_executor, IsolationCategory};

// ── Public types ────────────────────────────────────────────────────────────

/// Outcome of the analysis for one closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureResult {
    /// Stays inside the enclosing actor's isolation.
    Isolated,
    /// Checked as actor-independent code.
    Independent,
}

/// Capture facts for one closure literal or partial application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureCapture {
    pub closure: ClosureId,
    /// Formed in actor-isolated code.
    pub captures_isolated: bool,
    pub escaping: bool,
    /// Category the closure body is checked under.
    pub isolation: IsolationCategory,
}

impl ClosureCapture {
    pub fn result(&self) -> CaptureResult {
        if self.captures_isolated && !self.escaping {
            CaptureResult::Isolated
        } else {
            CaptureResult::Independent
        }
    }
}

#[derive(Debug, Default)]
pub struct EscapeResult {
    captures: Vec<ClosureCapture>,
}

impl EscapeResult {
    pub fn get(&self, closure: ClosureId) -> &ClosureCapture {
        &self.captures[closure.0 as usize]
    }

    pub fn captures(&self) -> &[ClosureCapture] {
        &self.captures
    }
}

/// Node of the capture graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Closure(ClosureId),
    Local(LocalId),
}

/// Value-flow graph between closures and locals, with the nodes that flow
/// directly into an escaping sink.
#[derive(Debug, Default)]
pub struct CaptureGraph {
    edges: HashMap<Node, Vec<Node>>,
    escaping_sinks: HashSet<Node>,
}

impl CaptureGraph {
    /// Build the graph from every resolved body in the table.
    pub fn build(table: &DeclTable, categories: &Categories) -> Self {
        let mut graph = CaptureGraph::default();
        for decl in &table.decls {
            if let Some(body) = &decl.body {
                let mut walker = Walker {
                    table,
                    categories,
                    owner: categories.get(decl.id),
                    graph: &mut graph,
                };
                walker.walk(body, None);
            }
        }
        graph
    }

    /// Every node from which an escaping sink is reachable.
    pub fn escaping_nodes(&self) -> HashSet<Node> {
        let mut reverse: HashMap<Node, Vec<Node>> = HashMap::new();
        for (from, tos) in &self.edges {
            for to in tos {
                reverse.entry(*to).or_default().push(*from);
            }
        }
        let mut seen: HashSet<Node> = self.escaping_sinks.clone();
        let mut queue: VecDeque<Node> = self.escaping_sinks.iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            for &pred in reverse.get(&node).into_iter().flatten() {
                if seen.insert(pred) {
                    queue.push_back(pred);
                }
            }
        }
        seen
    }
}

/// Walks the bodies of one declaration, adding its flows to the graph.
struct Walker<'a> {
    table: &'a DeclTable,
    categories: &'a Categories,
    /// Category of the declaration whose body is walked.
    owner: IsolationCategory,
    graph: &'a mut CaptureGraph,
}

impl Walker<'_> {
    fn edge(&mut self, from: Node, to: Node) {
        self.graph.edges.entry(from).or_default().push(to);
    }

    fn sink(&mut self, node: Node) {
        self.graph.escaping_sinks.insert(node);
    }

    /// The node a value denotes, if it is tracked.
    fn node_of(&mut self, value: &HirValue, ctx: Option<ClosureId>) -> Option<Node> {
        match value {
            HirValue::Closure(c) => Some(Node::Closure(*c)),
            HirValue::Local(l) => {
                self.capture(*l, ctx);
                Some(Node::Local(*l))
            }
            HirValue::Param(_) | HirValue::Access(_) | HirValue::Opaque => None,
        }
    }

    /// A local referenced inside a closure it was not declared in flows into
    /// that closure.
    fn capture(&mut self, local: LocalId, ctx: Option<ClosureId>) {
        let Some(closure) = ctx else {
            return;
        };
        if self.table.local(local).scope != Some(closure) {
            self.edge(Node::Local(local), Node::Closure(closure));
        }
    }

    /// Whether a call suspends into an executor other than the caller's.
    /// Arguments of such a call run while the caller's actor is free.
    fn hops_away(&self, callee: &Callee, is_await: bool) -> bool {
        match callee {
            Callee::Decl(site) => {
                let target = self.table.decl(site.target);
                (is_await || target.is_async())
                    && !shares_executor(
                        self.owner,
                        self.categories.get(site.target),
                        site.receiver == Receiver::SelfValue,
                    )
            }
            Callee::Local(_) | Callee::Param(_) => is_await,
        }
    }

    fn walk(&mut self, body: &HirBody, ctx: Option<ClosureId>) {
        for stmt in &body.stmts {
            match stmt {
                HirStmt::Access(_) => {}
                HirStmt::Use { value, .. } => {
                    self.node_of(value, ctx);
                }
                HirStmt::Call {
                    callee,
                    args,
                    is_await,
                    ..
                } => {
                    if let Callee::Local(l) = callee {
                        self.capture(*l, ctx);
                    }
                    let hop = self.hops_away(callee, *is_await);
                    for arg in args {
                        if let HirArg::Value { value, sink, .. } = arg {
                            self.enter(value);
                            if let Some(node) = self.node_of(value, ctx) {
                                if sink.escapes() || hop {
                                    self.sink(node);
                                }
                            }
                        }
                    }
                }
                HirStmt::Bind { local, value, .. } => {
                    self.enter(value);
                    if let Some(node) = self.node_of(value, ctx) {
                        self.edge(node, Node::Local(*local));
                    }
                }
                HirStmt::Return { value, .. } => {
                    self.enter(value);
                    if let Some(node) = self.node_of(value, ctx) {
                        self.sink(node);
                    }
                }
            }
        }
    }

    /// Walk the body of a closure literal formed by `value`.
    fn enter(&mut self, value: &HirValue) {
        if let HirValue::Closure(c) = value {
            if let ClosureKind::Literal(body) = &self.table.closure(*c).kind {
                self.walk(body, Some(*c));
            }
        }
    }
}

// ── Analysis ────────────────────────────────────────────────────────────────

/// Decide the checking isolation of a single closure given whether it
/// escapes and the isolation of the code that forms it.
pub fn analyze(escaping: bool, enclosing: IsolationCategory) -> ClosureCapture {
    let captures_isolated = enclosing.is_actor_isolated();
    let isolation = if captures_isolated && escaping {
        IsolationCategory::Independent
    } else {
        enclosing
    };
    ClosureCapture {
        closure: ClosureId(0),
        captures_isolated,
        escaping,
        isolation,
    }
}

/// Analyze every closure in the table.
pub fn analyze_all(table: &DeclTable, categories: &Categories) -> EscapeResult {
    let graph = CaptureGraph::build(table, categories);
    let escaping = graph.escaping_nodes();

    // Parents are allocated before their children, so id order suffices.
    let mut captures: Vec<ClosureCapture> = Vec::with_capacity(table.closures.len());
    for info in &table.closures {
        let enclosing = match info.parent {
            Some(parent) => captures[parent.0 as usize].isolation,
            None => categories.get(info.owner),
        };
        let capture = ClosureCapture {
            closure: info.id,
            ..analyze(escaping.contains(&Node::Closure(info.id)), enclosing)
        };
        tracing::trace!(
            closure = info.id.0,
            owner = %table.decl_path(info.owner),
            escaping = capture.escaping,
            result = ?capture.result(),
            "analyzed closure"
        );
        captures.push(capture);
    }
    EscapeResult { captures }
}
