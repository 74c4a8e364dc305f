//! Command chains: arena-allocated graphs of command steps.
//!
//! A chain describes an entire interactive exchange (login, run command,
//! confirm prompt, ...). Nodes live in a flat arena and reference each other
//! through [`NodeHandle`] indices; "previous" links are navigation-only and
//! never own anything. A node's successor is either fixed or computed at run
//! time from the accumulated response text, which is how conditional
//! branches and bounded retry loops are expressed.

pub mod builder;
pub mod criterion;
pub mod step;

use std::fmt;
use std::sync::Arc;

pub use builder::ChainBuilder;
pub use criterion::{MatchCriterion, MatchOp};
pub use step::CommandStep;

/// Interrupt byte sent to break a running command (ETX / Ctrl-C).
pub const CTRL_C: u8 = 0x03;

/// Index of a node within a [`Chain`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub(crate) usize);

impl NodeHandle {
    /// The arena index of this handle.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// What a computed successor decided for the active node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Transition to the given node (may be an earlier node, forming a loop).
    Goto(NodeHandle),
    /// Poll again on the same node; bounded by the per-node retry budget.
    Stay,
    /// End the chain.
    Finish,
}

/// Signature of a computed successor.
///
/// Computed successors are pure over the active node handle and the full
/// text accumulated so far; they must not capture mutable state that outlives
/// one execution.
pub type ComputedNext = dyn Fn(NodeHandle, &str) -> Decision + Send + Sync;

/// Where control flows after a node completes.
#[derive(Clone)]
pub enum Successor {
    /// End of the chain.
    Terminal,
    /// Fixed next node.
    Fixed(NodeHandle),
    /// Successor computed from the accumulated response text.
    Computed(Arc<ComputedNext>),
}

impl fmt::Debug for Successor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal => write!(f, "Terminal"),
            Self::Fixed(handle) => write!(f, "Fixed({})", handle.index()),
            Self::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

/// One element of a command chain.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) step: CommandStep,
    pub(crate) previous: Option<NodeHandle>,
    pub(crate) next: Successor,
}

impl Node {
    /// The command step carried by this node.
    #[must_use]
    pub const fn step(&self) -> &CommandStep {
        &self.step
    }

    /// Back-reference to the predecessor, navigation only.
    #[must_use]
    pub const fn previous(&self) -> Option<NodeHandle> {
        self.previous
    }

    /// This node's successor.
    #[must_use]
    pub const fn next(&self) -> &Successor {
        &self.next
    }
}

/// A built command chain.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    nodes: Vec<Node>,
    root: Option<NodeHandle>,
}

impl Chain {
    pub(crate) fn from_nodes(nodes: Vec<Node>, root: Option<NodeHandle>) -> Self {
        Self { nodes, root }
    }

    /// The node execution starts from: the main flow's first node.
    ///
    /// `None` for an empty chain. Detached branch nodes recorded before the
    /// main flow do not shift the root.
    #[must_use]
    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    /// Look up a node by handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this chain.
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> &Node {
        &self.nodes[handle.0]
    }

    /// Number of nodes in the arena (all segments included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the chain has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The first non-empty criterion reachable from `from` by fixed links.
    ///
    /// This is the condition a send step polls for: the criterion lives on
    /// the await node that follows it.
    #[must_use]
    pub fn criterion_from(&self, from: NodeHandle) -> Option<&MatchCriterion> {
        let mut current = Some(from);
        while let Some(handle) = current {
            let node = &self.nodes[handle.0];
            if let Some(criterion) = &node.step.criterion {
                if !criterion.pattern().is_empty() {
                    return Some(criterion);
                }
            }
            current = match node.next {
                Successor::Fixed(next) => Some(next),
                _ => None,
            };
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_has_no_root() {
        let chain = Chain::default();
        assert!(chain.is_empty());
        assert!(chain.root().is_none());
    }

    #[test]
    fn criterion_from_walks_fixed_links() {
        let chain = ChainBuilder::new()
            .send("show vlan")
            .ends_with("->")
            .build();
        let root = chain.root().unwrap();
        let criterion = chain.criterion_from(root).unwrap();
        assert_eq!(criterion.pattern(), "->");
        assert_eq!(criterion.op(), MatchOp::EndsWith);
    }

    #[test]
    fn criterion_from_skips_empty_patterns() {
        let chain = ChainBuilder::new()
            .send("a")
            .contains("")
            .send("b")
            .contains("done")
            .build();
        let criterion = chain.criterion_from(chain.root().unwrap()).unwrap();
        assert_eq!(criterion.pattern(), "done");
    }

    #[test]
    fn successor_debug_is_compact() {
        let fixed = Successor::Fixed(NodeHandle(3));
        assert_eq!(format!("{fixed:?}"), "Fixed(3)");
        let computed = Successor::Computed(Arc::new(|_, _| Decision::Finish));
        assert_eq!(format!("{computed:?}"), "Computed(..)");
    }
}
