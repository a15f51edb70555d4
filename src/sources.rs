//! Word graphs with a predecessor index.
//!
//! `SourcedWordGraph` extends [`WordGraph`] with, for every `(node, label)`
//! pair, a singly-linked list of the nodes with an edge into that node under
//! that label. The list for `(c, x)` has its head in `preim_init[c][x]` and
//! its successor links in `preim_next[p][x]`, both terminated by
//! [`Node::UNDEFINED`]. Every mutation of the transition table goes through
//! this layer so the index stays exact.
//!
//! # Invariants
//! - `p` appears on the list of `(c, x)` if and only if `δ(p, x) = c`, and
//!   then exactly once. Lists carry no ordering guarantee.
//! - `preim_next[c][x] = c` never holds; lists are simple chains.
//!
//! Validity (liveness) of nodes is not tracked here; the managed layer is
//! responsible for only passing live nodes where the contracts require it.

use crate::table::DynamicTable2;
use crate::word_graph::{Letter, Node, WordGraph};

/// A deterministic word graph doubly indexed by target and by source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedWordGraph {
    graph: WordGraph,
    preim_init: DynamicTable2<Node>,
    preim_next: DynamicTable2<Node>,
}

impl SourcedWordGraph {
    /// Creates a graph with `nodes` node slots and out-degree `out_degree`,
    /// no edges and empty predecessor lists.
    pub fn new(nodes: usize, out_degree: usize) -> Self {
        Self {
            graph: WordGraph::new(nodes, out_degree),
            preim_init: DynamicTable2::new(nodes, out_degree, Node::UNDEFINED),
            preim_next: DynamicTable2::new(nodes, out_degree, Node::UNDEFINED),
        }
    }

    /// Read-only view of the underlying transition table.
    #[inline]
    pub fn graph(&self) -> &WordGraph {
        &self.graph
    }

    /// Number of node slots.
    #[inline]
    pub fn number_of_nodes(&self) -> usize {
        self.graph.number_of_nodes()
    }

    /// Number of labels.
    #[inline]
    pub fn out_degree(&self) -> usize {
        self.graph.out_degree()
    }

    /// Returns `δ(c, x)`.
    #[inline]
    pub fn target(&self, c: Node, x: Letter) -> Node {
        self.graph.target(c, x)
    }

    /// Head of the predecessor list of `(c, x)`.
    #[inline]
    pub fn first_source(&self, c: Node, x: Letter) -> Node {
        self.preim_init.get(c.index(), x as usize)
    }

    /// Successor of `p` on the predecessor list it sits on under `x`.
    #[inline]
    pub fn next_source(&self, p: Node, x: Letter) -> Node {
        self.preim_next.get(p.index(), x as usize)
    }

    /// Whether `d` is a source of `c` under `x`. Linear in the list length;
    /// intended for debug assertions only.
    pub fn is_source(&self, c: Node, d: Node, x: Letter) -> bool {
        let mut p = self.first_source(c, x);
        while !p.is_undefined() {
            if p == d {
                return true;
            }
            p = self.next_source(p, x);
        }
        false
    }

    /// Defines the edge `(c, x) → d` and records `c` on `d`'s predecessor
    /// list.
    ///
    /// # Panics
    /// Panics in debug builds if `δ(c, x)` is already defined.
    pub fn add_edge(&mut self, c: Node, x: Letter, d: Node) {
        self.graph.add_edge_unchecked(c, x, d);
        self.add_source(d, x, c);
    }

    /// Removes the edge `(c, x)` and unlinks `c` from the target's
    /// predecessor list.
    ///
    /// # Panics
    /// Panics in debug builds if `δ(c, x)` is undefined.
    pub fn remove_edge(&mut self, c: Node, x: Letter) {
        let d = self.graph.target(c, x);
        self.remove_source(d, x, c);
        self.graph.remove_edge_unchecked(c, x);
    }

    /// Appends `k` node slots.
    pub fn add_nodes(&mut self, k: usize) {
        self.graph.add_nodes(k);
        self.preim_init.add_rows(k);
        self.preim_next.add_rows(k);
    }

    /// Widens the out-degree by `k` labels.
    pub fn add_to_out_degree(&mut self, k: usize) {
        self.graph.add_to_out_degree(k);
        self.preim_init.add_cols(k);
        self.preim_next.add_cols(k);
    }

    /// Truncates to the first `m` node slots.
    pub fn restrict(&mut self, m: usize) {
        self.graph.restrict(m);
        self.preim_init.shrink_rows_to(m);
        self.preim_next.shrink_rows_to(m);
    }

    /// Prepends `d` to the predecessor list of `(c, x)`.
    pub(crate) fn add_source(&mut self, c: Node, x: Letter, d: Node) {
        debug_assert!(!self.is_source(c, d, x));
        let head = self.first_source(c, x);
        self.preim_next.set(d.index(), x as usize, head);
        self.preim_init.set(c.index(), x as usize, d);
    }

    /// Unlinks `d` from the predecessor list of `(cx, x)`.
    ///
    /// If the head equals `d` the head is replaced; otherwise the link of
    /// the prior element is rewritten. Linear in the list length.
    pub(crate) fn remove_source(&mut self, cx: Node, x: Letter, d: Node) {
        let e = self.first_source(cx, x);
        if e == d {
            let after = self.next_source(d, x);
            self.preim_init.set(cx.index(), x as usize, after);
        } else {
            let mut p = e;
            debug_assert!(!p.is_undefined());
            while self.next_source(p, x) != d {
                p = self.next_source(p, x);
                debug_assert!(!p.is_undefined());
            }
            let after = self.next_source(d, x);
            self.preim_next.set(p.index(), x as usize, after);
        }
        self.preim_next.set(d.index(), x as usize, Node::UNDEFINED);
    }

    /// Rewrites `δ(p, x) = c` to `δ(p, x) = d` for every predecessor `p` of
    /// `(c, x)`, leaving the lists themselves untouched.
    fn replace_target(&mut self, c: Node, d: Node, x: Letter) {
        let mut p = self.first_source(c, x);
        while !p.is_undefined() {
            debug_assert_eq!(self.graph.target(p, x), c);
            self.graph.replace_target_unchecked(p, x, d);
            p = self.next_source(p, x);
        }
    }

    /// Replaces the single occurrence of value `old` with `new` on the
    /// predecessor list of `(t, x)`.
    fn rename_source(&mut self, old: Node, new: Node, x: Letter, t: Node) {
        if self.first_source(t, x) == old {
            self.preim_init.set(t.index(), x as usize, new);
            return;
        }
        let mut p = self.first_source(t, x);
        while !p.is_undefined() {
            if self.next_source(p, x) == old {
                self.preim_next.set(p.index(), x as usize, new);
                return;
            }
            p = self.next_source(p, x);
        }
        debug_assert!(false, "rename_source: {old} not on the list of ({t}, {x})");
    }

    /// Swaps every occurrence of the values `c` and `d` on the predecessor
    /// list of `(t, x)` in a single pass.
    fn swap_source_values(&mut self, c: Node, d: Node, x: Letter, t: Node) {
        let head = self.first_source(t, x);
        if head == c {
            self.preim_init.set(t.index(), x as usize, d);
        } else if head == d {
            self.preim_init.set(t.index(), x as usize, c);
        }
        let mut p = self.first_source(t, x);
        while !p.is_undefined() {
            let nxt = self.next_source(p, x);
            if nxt == c {
                self.preim_next.set(p.index(), x as usize, d);
            } else if nxt == d {
                self.preim_next.set(p.index(), x as usize, c);
            }
            p = self.next_source(p, x);
        }
    }

    /// Exchanges the identifiers `c` and `d` globally.
    ///
    /// Both are assumed live. Every incoming edge of `c` is rewired to `d`
    /// and vice versa, the outgoing rows and both predecessor rows are
    /// swapped, and occurrences of `c`/`d` as values on the targets'
    /// predecessor lists are exchanged. Self-loops (`c → c` becomes
    /// `d → d`) and mutual edges (`c ↔ d`) stay consistent.
    pub fn swap_nodes(&mut self, c: Node, d: Node) {
        debug_assert_ne!(c, d);
        let degree = self.out_degree() as Letter;
        for x in 0..degree {
            self.replace_target(c, d, x);
            self.replace_target(d, c, x);
        }
        self.graph.swap_rows(c, d);
        self.preim_init.swap_rows(c.index(), d.index());
        self.preim_next.swap_rows(c.index(), d.index());
        for x in 0..degree {
            // After the row swap, row d carries the old row of c, so the
            // lists holding value c are those of d's current targets.
            let t_of_old_c = self.graph.target(d, x);
            let t_of_old_d = self.graph.target(c, x);
            if t_of_old_c == t_of_old_d {
                if !t_of_old_c.is_undefined() {
                    self.swap_source_values(c, d, x, t_of_old_c);
                }
            } else {
                if !t_of_old_c.is_undefined() {
                    self.rename_source(c, d, x, t_of_old_c);
                }
                if !t_of_old_d.is_undefined() {
                    self.rename_source(d, c, x, t_of_old_d);
                }
            }
        }
    }

    /// Renames `c` to `d`: a one-sided [`SourcedWordGraph::swap_nodes`].
    ///
    /// Assumes `c` is live and `d` is a free identifier with no edges and
    /// empty predecessor rows. Afterwards `d` has exactly the in- and
    /// out-edges `c` had, and `c` is disconnected.
    pub fn rename_node(&mut self, c: Node, d: Node) {
        debug_assert_ne!(c, d);
        let degree = self.out_degree() as Letter;
        for x in 0..degree {
            self.replace_target(c, d, x);
        }
        self.graph.swap_rows(c, d);
        self.preim_init.swap_rows(c.index(), d.index());
        self.preim_next.swap_rows(c.index(), d.index());
        for x in 0..degree {
            let t = self.graph.target(d, x);
            if !t.is_undefined() {
                self.rename_source(c, d, x, t);
            }
        }
    }

    /// Folds the node `max` onto `min`, per the coincidence contract.
    ///
    /// Every incoming edge of `max` is redirected to `min` (reported
    /// through `on_new_edge`); every outgoing edge of `max` is transplanted
    /// onto `min` where `(min, x)` is undefined (also reported), dropped
    /// where the targets already agree, and reported through `on_incompat`
    /// where they disagree, with the victim's entry always unlinked.
    /// Afterwards `max` is fully disconnected; retiring its identifier is
    /// the caller's job.
    ///
    /// # Panics
    /// Panics in debug builds unless `min < max`.
    pub fn merge_nodes<F, G>(&mut self, min: Node, max: Node, on_new_edge: &mut F, on_incompat: &mut G)
    where
        F: FnMut(Node, Letter),
        G: FnMut(Node, Node),
    {
        debug_assert!(min < max);
        let degree = self.out_degree() as Letter;
        // Incoming edges of max, one label at a time. Taking the list head
        // repeatedly keeps each unlink O(1).
        for x in 0..degree {
            loop {
                let p = self.first_source(max, x);
                if p.is_undefined() {
                    break;
                }
                debug_assert_eq!(self.graph.target(p, x), max);
                self.remove_source(max, x, p);
                self.graph.replace_target_unchecked(p, x, min);
                self.add_source(min, x, p);
                on_new_edge(p, x);
            }
        }
        // Outgoing edges of max. Note an old self-loop at max has already
        // become an edge max → min by the pass above.
        for x in 0..degree {
            let t = self.graph.target(max, x);
            if t.is_undefined() {
                continue;
            }
            let min_t = self.graph.target(min, x);
            self.remove_source(t, x, max);
            self.graph.remove_edge_unchecked(max, x);
            if min_t.is_undefined() {
                self.graph.add_edge_unchecked(min, x, t);
                self.add_source(t, x, min);
                on_new_edge(min, x);
            } else if min_t != t {
                on_incompat(min_t, t);
            }
        }
    }

    /// Unlinks `c` from every predecessor list it sits on, by walking its
    /// outgoing edges and scanning each target's list.
    pub fn clear_sources(&mut self, c: Node) {
        let degree = self.out_degree() as Letter;
        for x in 0..degree {
            let t = self.graph.target(c, x);
            if !t.is_undefined() {
                self.remove_source(t, x, c);
            }
        }
    }

    /// [`SourcedWordGraph::clear_sources`] followed by clearing `c`'s
    /// outgoing row.
    pub fn clear_sources_and_targets(&mut self, c: Node) {
        let degree = self.out_degree() as Letter;
        for x in 0..degree {
            let t = self.graph.target(c, x);
            if !t.is_undefined() {
                self.remove_source(t, x, c);
                self.graph.remove_edge_unchecked(c, x);
            }
        }
    }

    /// Wipes the predecessor contributions of the nodes in `[first, last)`
    /// and re-inserts them by scanning their outgoing edges.
    ///
    /// All edges out of the range must also land in the range; used after
    /// bulk permutations.
    pub fn rebuild_sources(&mut self, first: usize, last: usize) {
        let degree = self.out_degree();
        for r in first..last {
            for x in 0..degree {
                self.preim_init.set(r, x, Node::UNDEFINED);
                self.preim_next.set(r, x, Node::UNDEFINED);
            }
        }
        for r in first..last {
            let c = Node::from_index(r);
            for x in 0..degree as Letter {
                let t = self.graph.target(c, x);
                if !t.is_undefined() {
                    debug_assert!((first..last).contains(&t.index()));
                    self.add_source(t, x, c);
                }
            }
        }
    }

    /// Applies the permutation `p` (new id → old id, covering all `total`
    /// slots) as a product of transpositions via
    /// [`SourcedWordGraph::swap_nodes`], truncates to the first `n` slots
    /// and rebuilds their predecessor index.
    pub fn permute_nodes(&mut self, p: &[Node], n: usize) {
        let total = self.number_of_nodes();
        debug_assert_eq!(p.len(), total);
        // pos[j] = current slot of the node originally at slot j;
        // at[s] = original node currently in slot s.
        let mut pos: Vec<u32> = (0..total as u32).collect();
        let mut at: Vec<u32> = (0..total as u32).collect();
        for i in 0..total {
            let want = p[i].as_u32();
            let s = pos[want as usize] as usize;
            if s != i {
                self.swap_nodes(Node::from_index(i), Node::from_index(s));
                let displaced = at[i];
                at[i] = want;
                at[s] = displaced;
                pos[want as usize] = i as u32;
                pos[displaced as usize] = s as u32;
            }
        }
        self.restrict(n);
        self.rebuild_sources(0, n);
    }
}
