//! Override resolution
//!
//! Walks a composed tree and eliminates every override node by applying its
//! function against the final tree, recursively, until no markers remain.
//! Resolution is a pure function of the input tree: no global state, and no
//! reliance on sibling iteration order.

use std::cell::{Cell, RefCell};

use strata_tree::{
    Node, NodePath, OverlayNode, ResolveError, ResolveView, Table, DEFAULT_STEP_BUDGET,
};

/// Resolves override markers out of a configuration tree.
///
/// Construct one per resolution request; the resolver owns no state that
/// outlives a [`resolve`](Resolver::resolve) call.
#[derive(Debug, Clone)]
pub struct Resolver {
    step_budget: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// A resolver with the default step budget.
    pub fn new() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
        }
    }

    /// Override the bound on override-function applications per request.
    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget;
        self
    }

    /// The configured step budget.
    pub fn step_budget(&self) -> usize {
        self.step_budget
    }

    /// Resolve `tree` to a marker-free tree.
    ///
    /// Leaves pass through unchanged; tables are rebuilt with every child
    /// resolved; override nodes are applied against the final tree and
    /// their results resolved recursively. Errors are fatal: no partial
    /// tree is returned.
    pub fn resolve(&self, tree: &Node) -> Result<Node, ResolveError> {
        let state = ResolveState {
            root: tree,
            budget: self.step_budget,
            stack: RefCell::new(Vec::new()),
            steps: Cell::new(0),
        };
        resolve_node(tree, &NodePath::root(), &state)
    }
}

/// Per-request resolution state: the original root, the in-flight override
/// paths, and the step counter.
struct ResolveState<'a> {
    root: &'a Node,
    budget: usize,
    stack: RefCell<Vec<NodePath>>,
    steps: Cell<usize>,
}

impl ResolveState<'_> {
    fn cycle_error(&self, path: &NodePath) -> ResolveError {
        let mut chain: Vec<String> = self
            .stack
            .borrow()
            .iter()
            .map(NodePath::to_string)
            .collect();
        chain.push(path.to_string());
        ResolveError::Cycle {
            path: path.to_string(),
            chain: chain.join(" -> "),
            limit: self.budget,
        }
    }

    /// True if `path` is an ancestor of (or equal to) the innermost
    /// in-flight override.
    fn on_own_chain(&self, path: &NodePath) -> bool {
        self.stack
            .borrow()
            .last()
            .is_some_and(|top| top.segments().starts_with(path.segments()))
    }
}

fn resolve_node(
    node: &Node,
    path: &NodePath,
    state: &ResolveState<'_>,
) -> Result<Node, ResolveError> {
    match node {
        Node::Leaf(_) => Ok(node.clone()),
        Node::Table(entries) => {
            let mut resolved = Table::new();
            for (key, child) in entries {
                resolved.insert(key.clone(), resolve_node(child, &path.child(key), state)?);
            }
            Ok(Node::Table(resolved))
        }
        Node::Overlay(overlay) => resolve_overlay(overlay, path, state),
    }
}

fn resolve_overlay(
    overlay: &OverlayNode,
    path: &NodePath,
    state: &ResolveState<'_>,
) -> Result<Node, ResolveError> {
    let in_flight = state.stack.borrow().iter().any(|p| p == path);
    if in_flight {
        // An override reading back through its own subtree layers on top
        // of its base; re-entering any other in-flight override cannot
        // terminate.
        if state.on_own_chain(path) {
            return resolve_node(&Node::Table(overlay.base.clone()), path, state);
        }
        return Err(state.cycle_error(path));
    }

    let steps = state.steps.get() + 1;
    state.steps.set(steps);
    if steps > state.budget {
        return Err(state.cycle_error(path));
    }

    state.stack.borrow_mut().push(path.clone());
    let view = FinalView { state };
    let produced = overlay
        .func
        .apply(&view, &Node::Table(overlay.base.clone()));
    state.stack.borrow_mut().pop();

    // The produced tree may itself contain further overrides.
    resolve_node(&produced?, path, state)
}

/// The view of the final tree handed to override functions.
struct FinalView<'a, 'b> {
    state: &'b ResolveState<'a>,
}

impl ResolveView for FinalView<'_, '_> {
    fn get(&self, path: &NodePath) -> Result<Node, ResolveError> {
        let node = locate(self.state, path)?;
        resolve_node(&node, path, self.state)
    }
}

/// Walk the original root to `path`, resolving overrides encountered en
/// route so that keys they introduce are visible to the descent.
fn locate(state: &ResolveState<'_>, path: &NodePath) -> Result<Node, ResolveError> {
    let mut current = state.root.clone();
    let mut walked = NodePath::root();

    for segment in path.segments() {
        if matches!(current, Node::Overlay(_)) {
            current = resolve_node(&current, &walked, state)?;
        }
        current = match current {
            Node::Table(mut entries) => {
                entries.remove(segment).ok_or_else(|| ResolveError::MissingKey {
                    path: walked.to_string(),
                    key: segment.clone(),
                })?
            }
            other => {
                return Err(ResolveError::NotATable {
                    path: walked.to_string(),
                    kind: other.kind(),
                })
            }
        };
        walked.push(segment);
    }

    Ok(current)
}
