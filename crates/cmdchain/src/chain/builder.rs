//! Fluent chain construction.
//!
//! The builder accumulates a flat instruction list and only materializes the
//! node graph at [`ChainBuilder::build`]. Send producers and await producers
//! alternate naturally: each `send`/`wait`/`ctrl_break`/`enter` appends a
//! send node, each `equals`/`starts_with`/`ends_with`/`contains`/`regex`
//! appends an await node carrying the criterion for the preceding send.

use std::sync::Arc;
use std::time::Duration;

use super::criterion::MatchCriterion;
use super::step::CommandStep;
use super::{CTRL_C, Chain, ComputedNext, Decision, Node, NodeHandle, Successor};

struct PendingNode {
    step: CommandStep,
    computed: Option<Arc<ComputedNext>>,
    segment: usize,
}

/// Builds a [`Chain`] from a fluent description.
///
/// ```
/// use cmdchain::chain::ChainBuilder;
///
/// let chain = ChainBuilder::new()
///     .send("show chassis")
///     .ends_with("->")
///     .send("show vlan")
///     .ends_with("->")
///     .build();
/// assert_eq!(chain.len(), 4);
/// ```
pub struct ChainBuilder {
    nodes: Vec<PendingNode>,
    segment: usize,
    next_segment: usize,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            segment: 0,
            next_segment: 1,
        }
    }

    fn push(&mut self, step: CommandStep) -> &mut Self {
        self.nodes.push(PendingNode {
            step,
            computed: None,
            segment: self.segment,
        });
        self
    }

    /// Append a send node with a text payload.
    pub fn send(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(CommandStep::text(text))
    }

    /// Append a send node whose receive timeout is extended by `extra`.
    pub fn send_timed(&mut self, text: impl Into<String>, extra: Duration) -> &mut Self {
        self.push(CommandStep::text(text).with_wait(extra))
    }

    /// Append a send node with a raw byte payload.
    pub fn send_bytes(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.push(CommandStep::bytes(bytes))
    }

    /// Append a raw-byte send node whose receive timeout is extended by
    /// `extra`.
    pub fn send_bytes_timed(&mut self, bytes: impl Into<Vec<u8>>, extra: Duration) -> &mut Self {
        self.push(CommandStep::bytes(bytes).with_wait(extra))
    }

    /// Append a wait-only node: a pause between keystrokes.
    pub fn wait(&mut self, pause: Duration) -> &mut Self {
        self.push(CommandStep::pause(pause))
    }

    /// Append a send node emitting a single interrupt byte.
    pub fn ctrl_break(&mut self) -> &mut Self {
        self.push(CommandStep::bytes([CTRL_C]))
    }

    /// Append a send node emitting a bare newline.
    pub fn enter(&mut self) -> &mut Self {
        self.push(CommandStep::text("\n"))
    }

    /// Append an await node with an explicit criterion.
    pub fn expect(&mut self, criterion: MatchCriterion) -> &mut Self {
        self.push(CommandStep::default().with_criterion(criterion))
    }

    /// Await: trimmed response equals the pattern.
    pub fn equals(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.expect(MatchCriterion::equals(pattern))
    }

    /// Await: trimmed response starts with the pattern.
    pub fn starts_with(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.expect(MatchCriterion::starts_with(pattern))
    }

    /// Await: trimmed response ends with the pattern.
    pub fn ends_with(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.expect(MatchCriterion::ends_with(pattern))
    }

    /// Await: trimmed response contains the pattern.
    pub fn contains(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.expect(MatchCriterion::contains(pattern))
    }

    /// Await: the regex pattern matches the trimmed response.
    pub fn regex(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.expect(MatchCriterion::regex(pattern))
    }

    /// Append a junction node with a computed successor.
    ///
    /// `next` receives the active node handle and the full accumulated text
    /// and returns a [`Decision`]: jump to a node (typically a handle from
    /// [`branch`](Self::branch) or [`mark`](Self::mark)), stay for another
    /// poll round (bounded by the per-node retry budget), or finish. Nodes
    /// appended after a junction in the same segment are only reachable by
    /// jumping to them.
    pub fn custom(
        &mut self,
        next: impl Fn(NodeHandle, &str) -> Decision + Send + Sync + 'static,
    ) -> &mut Self {
        self.nodes.push(PendingNode {
            step: CommandStep::default(),
            computed: Some(Arc::new(next)),
            segment: self.segment,
        });
        self
    }

    /// Record a detached branch in the same arena and return its root handle.
    ///
    /// Branch nodes are not linked into the surrounding flow; control only
    /// reaches them through a [`Decision::Goto`] from a `custom` junction.
    /// The branch's last node terminates the chain unless it jumps elsewhere.
    pub fn branch(&mut self, build: impl FnOnce(&mut Self)) -> NodeHandle {
        let root = NodeHandle(self.nodes.len());
        let outer = self.segment;
        self.segment = self.next_segment;
        self.next_segment += 1;
        build(self);
        self.segment = outer;
        root
    }

    /// Handle the next appended node will receive.
    ///
    /// Useful for self-referencing loops: capture the mark, then build the
    /// node and jump back to it from a `custom` closure.
    #[must_use]
    pub fn mark(&self) -> NodeHandle {
        NodeHandle(self.nodes.len())
    }

    /// Materialize the node graph.
    ///
    /// Within each segment, nodes link to the next node of the same segment;
    /// a segment's last node is terminal. Junction nodes keep their computed
    /// successor instead.
    pub fn build(&mut self) -> Chain {
        let pending = std::mem::take(&mut self.nodes);
        let segments: Vec<usize> = pending.iter().map(|node| node.segment).collect();
        let count = pending.len();

        let next_in_segment = |idx: usize| {
            (idx + 1..count)
                .find(|&candidate| segments[candidate] == segments[idx])
                .map(NodeHandle)
        };
        let previous_in_segment = |idx: usize| {
            (0..idx)
                .rev()
                .find(|&candidate| segments[candidate] == segments[idx])
                .map(NodeHandle)
        };

        let nodes = pending
            .into_iter()
            .enumerate()
            .map(|(idx, node)| {
                let next = node.computed.map_or_else(
                    || next_in_segment(idx).map_or(Successor::Terminal, Successor::Fixed),
                    Successor::Computed,
                );
                Node {
                    step: node.step,
                    previous: previous_in_segment(idx),
                    next,
                }
            })
            .collect();
        // The main flow (segment 0) owns the root even when a detached
        // branch was recorded first.
        let root = segments
            .iter()
            .position(|&segment| segment == 0)
            .or(if count > 0 { Some(0) } else { None })
            .map(NodeHandle);
        Chain::from_nodes(nodes, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternating_send_await_links_sequentially() {
        let chain = ChainBuilder::new()
            .send("user")
            .contains("Password:")
            .send("secret")
            .ends_with("->")
            .build();

        assert_eq!(chain.len(), 4);
        let root = chain.root().unwrap();
        assert!(chain.node(root).step().has_payload());
        let Successor::Fixed(second) = *chain.node(root).next() else {
            panic!("expected fixed successor");
        };
        assert_eq!(second.index(), 1);
        assert_eq!(chain.node(second).previous(), Some(root));
        assert!(matches!(
            chain.node(NodeHandle(3)).next(),
            Successor::Terminal
        ));
    }

    #[test]
    fn wait_and_control_nodes() {
        let chain = ChainBuilder::new()
            .ctrl_break()
            .wait(Duration::from_millis(100))
            .enter()
            .build();

        assert_eq!(chain.node(NodeHandle(0)).step().bytes, Some(vec![CTRL_C]));
        assert!(chain.node(NodeHandle(1)).step().is_wait_only());
        assert_eq!(chain.node(NodeHandle(2)).step().text.as_deref(), Some("\n"));
    }

    #[test]
    fn branch_is_detached_from_main_flow() {
        let mut builder = ChainBuilder::new();
        let retry = builder.branch(|b| {
            b.send("admin").contains("Password:");
        });
        builder
            .send("probe")
            .contains("login:")
            .custom(move |_, text| {
                if text.contains("denied") {
                    Decision::Goto(retry)
                } else {
                    Decision::Finish
                }
            });
        let chain = builder.build();

        assert_eq!(chain.len(), 5);
        // Branch root is recorded first and its tail terminates.
        assert_eq!(retry.index(), 0);
        assert!(matches!(chain.node(NodeHandle(1)).next(), Successor::Terminal));
        // Main flow starts after the branch and skips over it.
        let main_root = chain.root().unwrap();
        assert_eq!(main_root.index(), 2);
        assert_eq!(chain.node(main_root).step().text.as_deref(), Some("probe"));
        let Successor::Fixed(after_probe) = *chain.node(main_root).next() else {
            panic!("expected fixed successor");
        };
        assert_eq!(after_probe.index(), 3);
        assert!(matches!(chain.node(NodeHandle(4)).next(), Successor::Computed(_)));
    }

    #[test]
    fn nested_branch_keeps_outer_links() {
        let mut builder = ChainBuilder::new();
        let outer = builder.branch(|b| {
            b.send("one");
            let inner = b.branch(|inner| {
                inner.send("two");
            });
            b.send("three").custom(move |_, _| Decision::Goto(inner));
        });
        builder.send("main");
        let chain = builder.build();

        // "one" links past the interleaved inner branch to "three".
        assert_eq!(outer.index(), 0);
        let Successor::Fixed(next) = *chain.node(NodeHandle(0)).next() else {
            panic!("expected fixed successor");
        };
        assert_eq!(chain.node(next).step().text.as_deref(), Some("three"));
        assert!(matches!(chain.node(NodeHandle(1)).next(), Successor::Terminal));
    }

    #[test]
    fn mark_names_the_next_node() {
        let mut builder = ChainBuilder::new();
        builder.send("first");
        let here = builder.mark();
        builder.send("second");
        let chain = builder.build();
        assert_eq!(chain.node(here).step().text.as_deref(), Some("second"));
    }

    #[test]
    fn builder_is_reusable_after_build() {
        let mut builder = ChainBuilder::new();
        builder.send("a");
        let first = builder.build();
        let second = builder.build();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
