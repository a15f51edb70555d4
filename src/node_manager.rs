//! Node liveness, identifier reuse and the coincidence stack.
//!
//! The manager owns the set of active node identifiers as a doubly-linked
//! list threaded through `next_active`/`prev_active` arrays, a free list of
//! retired identifiers threaded through `next_free`, and the LIFO stack of
//! coincidences awaiting the merge engine.
//!
//! # Determinism
//! - `active_nodes` iterates in list order: creation order, minus retired
//!   nodes, with reused identifiers re-appended at the tail.
//! - `new_node` pops the most recently freed identifier first.

use crate::word_graph::Node;

/// Active-node list, free list and coincidence stack.
#[derive(Debug, Clone)]
pub struct NodeManager {
    next_active: Vec<Node>,
    prev_active: Vec<Node>,
    next_free: Vec<Node>,
    active: Vec<bool>,
    first_active: Node,
    last_active: Node,
    free_head: Node,
    active_count: usize,
    coincidences: Vec<(Node, Node)>,
}

impl NodeManager {
    /// Creates a manager with `m` identifiers, all active, in id order.
    pub fn with_active_nodes(m: usize) -> Self {
        let mut mgr = Self {
            next_active: vec![Node::UNDEFINED; m],
            prev_active: vec![Node::UNDEFINED; m],
            next_free: vec![Node::UNDEFINED; m],
            active: vec![true; m],
            first_active: Node::UNDEFINED,
            last_active: Node::UNDEFINED,
            free_head: Node::UNDEFINED,
            active_count: m,
            coincidences: Vec::new(),
        };
        if m > 0 {
            mgr.first_active = Node::new(0);
            mgr.last_active = Node::from_index(m - 1);
            for i in 0..m {
                if i + 1 < m {
                    mgr.next_active[i] = Node::from_index(i + 1);
                }
                if i > 0 {
                    mgr.prev_active[i] = Node::from_index(i - 1);
                }
            }
        }
        mgr
    }

    /// Total identifier capacity (active plus free).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.active.len()
    }

    /// Number of active identifiers.
    #[inline]
    pub fn number_active(&self) -> usize {
        self.active_count
    }

    /// Whether `c` is currently active.
    #[inline]
    pub fn is_active(&self, c: Node) -> bool {
        self.active[c.index()]
    }

    /// First node of the active list, or [`Node::UNDEFINED`] when empty.
    #[inline]
    pub fn first_active_node(&self) -> Node {
        self.first_active
    }

    /// Successor of `c` on the active list, or [`Node::UNDEFINED`] at the
    /// tail.
    ///
    /// # Panics
    /// Panics in debug builds if `c` is not active.
    #[inline]
    pub fn next_active_node(&self, c: Node) -> Node {
        debug_assert!(self.is_active(c));
        self.next_active[c.index()]
    }

    /// Whether the free list is empty, in which case [`NodeManager::grow`]
    /// must run before [`NodeManager::new_node`].
    #[inline]
    pub fn free_list_is_empty(&self) -> bool {
        self.free_head.is_undefined()
    }

    /// Extends the identifier range to `new_capacity`, pushing the new
    /// identifiers onto the free list so the lowest is popped first.
    pub fn grow(&mut self, new_capacity: usize) {
        let old = self.capacity();
        debug_assert!(new_capacity > old);
        self.next_active.resize(new_capacity, Node::UNDEFINED);
        self.prev_active.resize(new_capacity, Node::UNDEFINED);
        self.next_free.resize(new_capacity, Node::UNDEFINED);
        self.active.resize(new_capacity, false);
        for i in (old..new_capacity).rev() {
            self.next_free[i] = self.free_head;
            self.free_head = Node::from_index(i);
        }
    }

    /// Activates a free identifier and appends it to the active list tail.
    ///
    /// # Panics
    /// Panics if the free list is empty.
    pub fn new_node(&mut self) -> Node {
        let c = self.free_head;
        assert!(!c.is_undefined(), "new_node called with an empty free list");
        self.free_head = self.next_free[c.index()];
        self.next_free[c.index()] = Node::UNDEFINED;
        self.active[c.index()] = true;
        self.next_active[c.index()] = Node::UNDEFINED;
        self.prev_active[c.index()] = self.last_active;
        if self.last_active.is_undefined() {
            self.first_active = c;
        } else {
            self.next_active[self.last_active.index()] = c;
        }
        self.last_active = c;
        self.active_count += 1;
        c
    }

    /// Retires `c`: unlinks it from the active list and pushes it on the
    /// free list.
    ///
    /// # Panics
    /// Panics in debug builds if `c` is not active.
    pub fn free_node(&mut self, c: Node) {
        debug_assert!(self.is_active(c));
        let p = self.prev_active[c.index()];
        let nx = self.next_active[c.index()];
        if p.is_undefined() {
            self.first_active = nx;
        } else {
            self.next_active[p.index()] = nx;
        }
        if nx.is_undefined() {
            self.last_active = p;
        } else {
            self.prev_active[nx.index()] = p;
        }
        self.active[c.index()] = false;
        self.next_active[c.index()] = Node::UNDEFINED;
        self.prev_active[c.index()] = Node::UNDEFINED;
        self.next_free[c.index()] = self.free_head;
        self.free_head = c;
        self.active_count -= 1;
    }

    /// Iterates the active nodes in list order.
    pub fn active_nodes(&self) -> ActiveNodes<'_> {
        ActiveNodes {
            manager: self,
            cursor: self.first_active,
        }
    }

    /// Pushes the coincidence `{u, v}` unless `u == v`.
    #[inline]
    pub fn coincide(&mut self, u: Node, v: Node) {
        debug_assert!(!u.is_undefined() && !v.is_undefined());
        if u != v {
            self.coincidences.push((u, v));
        }
    }

    /// Whether any coincidence is pending.
    #[inline]
    pub fn has_coincidence(&self) -> bool {
        !self.coincidences.is_empty()
    }

    /// Pops the most recently pushed coincidence.
    #[inline]
    pub fn pop_coincidence(&mut self) -> Option<(Node, Node)> {
        self.coincidences.pop()
    }
}

/// Forward iterator over the active list. See
/// [`NodeManager::active_nodes`].
pub struct ActiveNodes<'a> {
    manager: &'a NodeManager,
    cursor: Node,
}

impl Iterator for ActiveNodes<'_> {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        if self.cursor.is_undefined() {
            return None;
        }
        let c = self.cursor;
        self.cursor = self.manager.next_active[c.index()];
        Some(c)
    }
}
