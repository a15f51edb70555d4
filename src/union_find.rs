//! Union-find over node identifiers for the coincidence drain.
//!
//! The merge engine chooses which representative survives (the smaller
//! identifier), so this union-find exposes an explicit
//! [`UnionFind::union_into`] rather than union-by-rank. `find` uses
//! path halving and never recurses.

use crate::word_graph::Node;

/// Disjoint sets keyed by node id.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    /// Creates `n` singleton classes.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    /// Extends to `n` slots, the new ones as singletons.
    pub fn grow(&mut self, n: usize) {
        let old = self.parent.len();
        debug_assert!(n >= old);
        self.parent.extend(old as u32..n as u32);
    }

    /// Returns the representative of `c`'s class.
    pub fn find(&mut self, c: Node) -> Node {
        let mut i = c.as_u32();
        loop {
            let p = self.parent[i as usize];
            if p == i {
                return Node::new(i);
            }
            let gp = self.parent[p as usize];
            self.parent[i as usize] = gp;
            i = gp;
        }
    }

    /// Makes `survivor` the representative of `victim`'s class.
    ///
    /// Both must currently be representatives.
    pub fn union_into(&mut self, survivor: Node, victim: Node) {
        debug_assert_eq!(self.parent[survivor.index()], survivor.as_u32());
        debug_assert_eq!(self.parent[victim.index()], victim.as_u32());
        self.parent[victim.index()] = survivor.as_u32();
    }

    /// Detaches `c` into a fresh singleton class.
    ///
    /// Called when a retired identifier is reallocated; stale links into
    /// the old class must already have been resolved by then.
    pub fn reset(&mut self, c: Node) {
        self.parent[c.index()] = c.as_u32();
    }
}
