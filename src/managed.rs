//! Managed word graphs: liveness, cascading merges, standardisation.
//!
//! `ManagedGraph` composes the sourced graph with the node manager and a
//! union-find, and owns the coincidence drain. The drain is logically a
//! breadth-first closure over an implicit equality graph, driven by an
//! explicit LIFO stack; it never recurses and never allocates nodes.
//!
//! # Invariants
//! - Between public operations every defined edge of an active node points
//!   at an active node, predecessor lists are exact, and the coincidence
//!   stack is empty outside [`ManagedGraph::process_coincidences`].
//! - Node `0` is never retired: the drain always folds the larger
//!   representative onto the smaller.
//!
//! # Determinism
//! - The drain pops the stack in LIFO order and each merge's side effects
//!   follow the label order of the sourced layer, so the surviving concrete
//!   identifiers are a function of the operation sequence alone.

use tracing::debug;

use crate::node_manager::NodeManager;
use crate::sources::SourcedWordGraph;
use crate::union_find::UnionFind;
use crate::word_graph::{Letter, Node, WordGraph};

/// Monotone counters used by the driver to detect clean passes and to
/// report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphStats {
    /// Bumped on every mutation of any kind.
    pub revision: u64,
    /// Edges defined, transplanted or rewired.
    pub edges_defined: u64,
    /// Nodes created.
    pub nodes_created: u64,
    /// Nodes retired by merges.
    pub merges: u64,
}

/// A sourced word graph with node liveness and a merge engine.
#[derive(Debug, Clone)]
pub struct ManagedGraph {
    graph: SourcedWordGraph,
    manager: NodeManager,
    uf: UnionFind,
    stats: GraphStats,
}

impl ManagedGraph {
    /// Creates a graph with `nodes` active node slots and out-degree
    /// `out_degree`, no edges.
    pub fn with_nodes(nodes: usize, out_degree: usize) -> Self {
        debug_assert!(nodes > 0);
        Self {
            graph: SourcedWordGraph::new(nodes, out_degree),
            manager: NodeManager::with_active_nodes(nodes),
            uf: UnionFind::new(nodes),
            stats: GraphStats::default(),
        }
    }

    /// Read-only view of the transition table.
    #[inline]
    pub fn word_graph(&self) -> &WordGraph {
        self.graph.graph()
    }

    /// The sourced layer, for predecessor iteration.
    #[inline]
    pub fn sourced(&self) -> &SourcedWordGraph {
        &self.graph
    }

    /// Current mutation counters.
    #[inline]
    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    /// Number of active nodes.
    #[inline]
    pub fn number_active(&self) -> usize {
        self.manager.number_active()
    }

    /// Whether `c` is active.
    #[inline]
    pub fn is_active(&self, c: Node) -> bool {
        self.manager.is_active(c)
    }

    /// Head of the active list.
    #[inline]
    pub fn first_active_node(&self) -> Node {
        self.manager.first_active_node()
    }

    /// Successor of `c` on the active list.
    #[inline]
    pub fn next_active_node(&self, c: Node) -> Node {
        self.manager.next_active_node(c)
    }

    /// Returns `δ(c, x)`.
    #[inline]
    pub fn target(&self, c: Node, x: Letter) -> Node {
        self.graph.target(c, x)
    }

    /// Follows `word` from `from` as far as defined.
    #[inline]
    pub fn follow_path(&self, from: Node, word: &[Letter]) -> (Node, usize) {
        self.graph.graph().follow_path(from, word)
    }

    /// Defines the edge `(c, x) → d` between active nodes.
    pub fn add_edge(&mut self, c: Node, x: Letter, d: Node) {
        debug_assert!(self.manager.is_active(c) && self.manager.is_active(d));
        self.graph.add_edge(c, x, d);
        self.stats.edges_defined += 1;
        self.stats.revision += 1;
    }

    /// Activates a fresh node, growing all tables geometrically when the
    /// free list is exhausted.
    pub fn new_node(&mut self) -> Node {
        if self.manager.free_list_is_empty() {
            let old = self.manager.capacity();
            let new = 2 * old;
            self.graph.add_nodes(new - old);
            self.manager.grow(new);
            self.uf.grow(new);
        }
        let c = self.manager.new_node();
        self.uf.reset(c);
        self.stats.nodes_created += 1;
        self.stats.revision += 1;
        c
    }

    /// Schedules the coincidence `{u, v}`.
    #[inline]
    pub fn coincide(&mut self, u: Node, v: Node) {
        self.manager.coincide(u, v);
    }

    /// Representative of `c` under the merges performed so far.
    ///
    /// Only meaningful until the identifier is recycled; callers must
    /// resolve the identifiers they track right after each drain.
    #[inline]
    pub fn representative(&mut self, c: Node) -> Node {
        self.uf.find(c)
    }

    /// Drains the coincidence stack to quiescence.
    ///
    /// Pops pairs, resolves both sides through the union-find, and folds
    /// the larger representative onto the smaller. Conflicting targets
    /// discovered while folding are pushed back onto the stack, so a single
    /// call resolves the whole cascade. Returns `true` if any merge
    /// happened.
    pub fn process_coincidences(&mut self) -> bool {
        let mut merged_any = false;
        let mut drained = 0u64;
        while let Some((u, v)) = self.manager.pop_coincidence() {
            let ru = self.uf.find(u);
            let rv = self.uf.find(v);
            if ru == rv {
                continue;
            }
            let (min, max) = if ru < rv { (ru, rv) } else { (rv, ru) };
            debug_assert!(self.manager.is_active(min) && self.manager.is_active(max));
            let stats = &mut self.stats;
            let manager = &mut self.manager;
            self.graph.merge_nodes(
                min,
                max,
                &mut |_p, _x| {
                    stats.edges_defined += 1;
                    stats.revision += 1;
                },
                &mut |a, b| manager.coincide(a, b),
            );
            self.manager.free_node(max);
            self.uf.union_into(min, max);
            self.stats.merges += 1;
            self.stats.revision += 1;
            merged_any = true;
            drained += 1;
        }
        if drained > 1 {
            debug!(drained, active = self.manager.number_active(), "coincidence cascade resolved");
        }
        merged_any
    }

    /// Renames the nodes so a breadth-first traversal from node `0`, taking
    /// labels in ascending order, visits them as `0, 1, 2, …`, then shrinks
    /// the tables to the active count.
    ///
    /// Returns the renaming `q` (old id → new id) over the old capacity so
    /// the caller can re-point the identifiers it tracks; unreached slots
    /// map past the active count and are dropped. Applying this twice
    /// yields the same graph as applying it once.
    ///
    /// # Panics
    /// Panics in debug builds if some active node is unreachable from `0`.
    pub fn standardize(&mut self) -> Vec<Node> {
        let capacity = self.graph.number_of_nodes();
        let degree = self.graph.out_degree() as Letter;
        let mut order: Vec<Node> = Vec::with_capacity(self.manager.number_active());
        let mut q: Vec<Node> = vec![Node::UNDEFINED; capacity];
        let root = Node::new(0);
        debug_assert!(self.manager.is_active(root));
        q[root.index()] = Node::new(0);
        order.push(root);
        let mut head = 0;
        while head < order.len() {
            let c = order[head];
            head += 1;
            for x in 0..degree {
                let t = self.graph.target(c, x);
                if !t.is_undefined() && q[t.index()].is_undefined() {
                    q[t.index()] = Node::from_index(order.len());
                    order.push(t);
                }
            }
        }
        let n = order.len();
        debug_assert_eq!(n, self.manager.number_active(), "active node unreachable from the start node");
        // Complete the permutation over the free slots, in id order.
        let mut p = order;
        for i in 0..capacity {
            if q[i].is_undefined() {
                q[i] = Node::from_index(p.len());
                p.push(Node::from_index(i));
            }
        }
        self.graph.permute_nodes(&p, n);
        self.manager = NodeManager::with_active_nodes(n);
        self.uf = UnionFind::new(n);
        self.stats.revision += 1;
        q
    }

    /// Checks the liveness and predecessor invariants; test support.
    #[cfg(test)]
    pub(crate) fn assert_valid(&self) {
        let degree = self.graph.out_degree() as Letter;
        assert!(!self.manager.has_coincidence(), "stack not drained");
        for c in 0..self.graph.number_of_nodes() as u32 {
            let c = Node::new(c);
            for x in 0..degree {
                let t = self.graph.target(c, x);
                if self.manager.is_active(c) {
                    if !t.is_undefined() {
                        assert!(self.manager.is_active(t), "dangling edge {c} -{x}-> {t}");
                        assert!(self.graph.is_source(t, c, x));
                    }
                } else {
                    assert!(t.is_undefined(), "inactive {c} has an edge");
                    assert!(self.graph.first_source(c, x).is_undefined(), "inactive {c} has sources");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: u32) -> Node {
        Node::new(i)
    }

    #[test]
    fn merge_cascades_through_conflicts() {
        // Two parallel chains from 0: 0-a->1-a->2 and 0-b->3-a->4.
        // Coinciding 1 and 3 must cascade into 2 = 4.
        let mut g = ManagedGraph::with_nodes(5, 2);
        g.add_edge(n(0), 0, n(1));
        g.add_edge(n(1), 0, n(2));
        g.add_edge(n(0), 1, n(3));
        g.add_edge(n(3), 0, n(4));
        g.coincide(n(1), n(3));
        assert!(g.process_coincidences());
        g.assert_valid();
        assert_eq!(g.number_active(), 3);
        assert_eq!(g.representative(n(3)), n(1));
        assert_eq!(g.representative(n(4)), n(2));
        assert_eq!(g.target(n(0), 0), n(1));
        assert_eq!(g.target(n(0), 1), n(1));
        assert_eq!(g.target(n(1), 0), n(2));
    }

    #[test]
    fn smaller_identifier_survives() {
        let mut g = ManagedGraph::with_nodes(3, 1);
        g.add_edge(n(0), 0, n(2));
        g.coincide(n(2), n(0));
        g.process_coincidences();
        g.assert_valid();
        assert!(g.is_active(n(0)));
        assert!(!g.is_active(n(2)));
        // The edge 0 -> 2 became a self-loop at 0.
        assert_eq!(g.target(n(0), 0), n(0));
    }

    #[test]
    fn growth_preserves_contents() {
        let mut g = ManagedGraph::with_nodes(2, 1);
        g.add_edge(n(0), 0, n(1));
        let c = g.new_node();
        assert_eq!(c, n(2));
        assert_eq!(g.word_graph().number_of_nodes(), 4);
        assert_eq!(g.target(n(0), 0), n(1));
        g.add_edge(n(1), 0, c);
        g.assert_valid();
    }

    #[test]
    fn retired_identifier_is_recycled_with_a_fresh_class() {
        let mut g = ManagedGraph::with_nodes(3, 1);
        g.add_edge(n(0), 0, n(1));
        g.add_edge(n(1), 0, n(2));
        g.coincide(n(1), n(2));
        g.process_coincidences();
        assert_eq!(g.representative(n(2)), n(1));
        let c = g.new_node();
        assert_eq!(c, n(2));
        assert_eq!(g.representative(n(2)), n(2));
    }

    #[test]
    fn standardize_renames_in_bfs_order() {
        // 0 -b-> 3, 0 -a-> 2, 2 -a-> 1: BFS over labels a,b gives
        // 0, 2, 3, 1 so the renaming is 0->0, 2->1, 3->2, 1->3.
        let mut g = ManagedGraph::with_nodes(4, 2);
        g.add_edge(n(0), 1, n(3));
        g.add_edge(n(0), 0, n(2));
        g.add_edge(n(2), 0, n(1));
        let q = g.standardize();
        g.assert_valid();
        assert_eq!(q[0], n(0));
        assert_eq!(q[2], n(1));
        assert_eq!(q[3], n(2));
        assert_eq!(q[1], n(3));
        assert_eq!(g.target(n(0), 0), n(1));
        assert_eq!(g.target(n(0), 1), n(2));
        assert_eq!(g.target(n(1), 0), n(3));
    }

    #[test]
    fn standardize_is_idempotent() {
        let mut g = ManagedGraph::with_nodes(4, 2);
        g.add_edge(n(0), 1, n(3));
        g.add_edge(n(0), 0, n(2));
        g.add_edge(n(2), 0, n(1));
        g.add_edge(n(3), 1, n(3));
        g.standardize();
        let once = g.clone();
        let q = g.standardize();
        assert_eq!(g.word_graph(), once.word_graph());
        for (i, &v) in q.iter().enumerate() {
            assert_eq!(v.index(), i);
        }
    }

    #[test]
    fn standardize_drops_retired_slots() {
        let mut g = ManagedGraph::with_nodes(4, 1);
        g.add_edge(n(0), 0, n(1));
        g.add_edge(n(1), 0, n(2));
        g.coincide(n(3), n(0));
        g.process_coincidences();
        assert_eq!(g.number_active(), 3);
        g.standardize();
        g.assert_valid();
        assert_eq!(g.word_graph().number_of_nodes(), 3);
        assert_eq!(g.number_active(), 3);
        assert_eq!(g.target(n(0), 0), n(1));
        assert_eq!(g.target(n(1), 0), n(2));
    }
}
