//! Path enumeration and counting in word graphs.
//!
//! [`Paths`] enumerates, in short-lex order, the label words of paths with
//! a fixed source, an optional fixed target, and length in a half-open
//! window. [`number_of_paths`] counts them, detecting when the count is
//! infinite instead of looping.
//!
//! # Determinism
//! - Words are produced strictly in short-lex order: by length, then
//!   lexicographically by label.
//! - The iterator is restartable: it is `Clone`, and a fresh one started
//!   with the same arguments yields the same sequence.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::word_graph::{Letter, Node, Word, WordGraph};

/// A possibly-infinite count of paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Count {
    /// Exactly this many paths (saturating at `u64::MAX`).
    Finite(u64),
    /// A cycle lies on a counted path, so there are infinitely many.
    Infinite,
}

impl Count {
    /// Whether the count is finite.
    pub fn is_finite(&self) -> bool {
        matches!(self, Count::Finite(_))
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Finite(k) => write!(f, "{k}"),
            Count::Infinite => write!(f, "infinity"),
        }
    }
}

/// Short-lex iterator over the label words of paths in a word graph.
///
/// With a target, yields exactly the words labelling paths from `source`
/// to `target`; without one, the words labelling any path from `source`
/// (the left factors, at the driver level). Lengths are restricted to
/// `[min, max)`, with `max = None` meaning unbounded; an unbounded
/// iterator over a graph with a cycle reachable from the source does not
/// terminate on its own.
#[derive(Debug, Clone)]
pub struct Paths<'a> {
    graph: &'a WordGraph,
    source: Node,
    target: Option<Node>,
    max: Option<usize>,
    /// Current length band.
    len: usize,
    /// Labels of the current DFS prefix.
    labels: Word,
    /// Nodes visited by the prefix; `nodes[0]` is the source.
    nodes: Vec<Node>,
    /// Next label to try at the DFS frontier.
    next_label: Letter,
    /// Whether some path reached the full band length.
    reached_depth: bool,
    /// Whether the zero-length band still has its single path to offer.
    band_fresh: bool,
    done: bool,
}

impl<'a> Paths<'a> {
    /// Starts an enumeration from `source`.
    pub fn new(
        graph: &'a WordGraph,
        source: Node,
        target: Option<Node>,
        min: usize,
        max: Option<usize>,
    ) -> Self {
        let done = matches!(max, Some(m) if min >= m);
        Self {
            graph,
            source,
            target,
            max,
            len: min,
            labels: Word::new(),
            nodes: vec![source],
            next_label: 0,
            reached_depth: false,
            band_fresh: true,
            done,
        }
    }

    fn matches(&self, end: Node) -> bool {
        match self.target {
            Some(t) => end == t,
            None => true,
        }
    }

    /// Moves to the next length band, or finishes when the current band
    /// proves no longer path can exist.
    fn bump_band(&mut self) {
        if !self.reached_depth {
            self.done = true;
            return;
        }
        self.len += 1;
        if matches!(self.max, Some(m) if self.len >= m) {
            self.done = true;
            return;
        }
        self.labels.clear();
        self.nodes.truncate(1);
        self.next_label = 0;
        self.reached_depth = false;
        self.band_fresh = true;
    }

    /// Produces the next path of the current band in lex order, if any.
    fn next_in_band(&mut self) -> Option<Word> {
        let degree = self.graph.out_degree() as Letter;
        if self.len == 0 {
            if self.band_fresh {
                self.band_fresh = false;
                self.reached_depth = true;
                if self.matches(self.source) {
                    return Some(Word::new());
                }
            }
            return None;
        }
        loop {
            if self.labels.len() == self.len {
                // Full-depth candidate: record it, then step the odometer.
                self.reached_depth = true;
                let end = *self.nodes.last().expect("nodes is never empty");
                let word = self.labels.clone();
                let last = self.labels.pop().expect("band length is positive");
                self.nodes.pop();
                self.next_label = last + 1;
                if self.matches(end) {
                    return Some(word);
                }
                continue;
            }
            let from = *self.nodes.last().expect("nodes is never empty");
            let mut x = self.next_label;
            while x < degree && self.graph.target(from, x).is_undefined() {
                x += 1;
            }
            if x < degree {
                let t = self.graph.target(from, x);
                self.labels.push(x);
                self.nodes.push(t);
                self.next_label = 0;
            } else {
                match self.labels.pop() {
                    Some(last) => {
                        self.nodes.pop();
                        self.next_label = last + 1;
                    }
                    None => return None,
                }
            }
        }
    }
}

impl Iterator for Paths<'_> {
    type Item = Word;

    fn next(&mut self) -> Option<Word> {
        while !self.done {
            if let Some(w) = self.next_in_band() {
                return Some(w);
            }
            self.bump_band();
        }
        None
    }
}

/// Nodes reachable from `source` by following edges forwards.
fn reachable(graph: &WordGraph, source: Node) -> Vec<bool> {
    let mut seen = vec![false; graph.number_of_nodes()];
    let mut stack = vec![source];
    seen[source.index()] = true;
    while let Some(c) = stack.pop() {
        for (_, t) in graph.targets_of(c) {
            if !seen[t.index()] {
                seen[t.index()] = true;
                stack.push(t);
            }
        }
    }
    seen
}

/// Nodes from which `target` is reachable.
fn coreachable(graph: &WordGraph, target: Node) -> Vec<bool> {
    let n = graph.number_of_nodes();
    let mut rev: Vec<Vec<Node>> = vec![Vec::new(); n];
    for c in 0..n {
        let c = Node::from_index(c);
        for (_, t) in graph.targets_of(c) {
            rev[t.index()].push(c);
        }
    }
    let mut seen = vec![false; n];
    let mut stack = vec![target];
    seen[target.index()] = true;
    while let Some(c) = stack.pop() {
        for &p in &rev[c.index()] {
            if !seen[p.index()] {
                seen[p.index()] = true;
                stack.push(p);
            }
        }
    }
    seen
}

/// Whether the subgraph induced by `mask` contains a directed cycle.
fn has_cycle(graph: &WordGraph, mask: &[bool]) -> bool {
    const WHITE: u8 = 0;
    const GREY: u8 = 1;
    const BLACK: u8 = 2;
    let n = graph.number_of_nodes();
    let degree = graph.out_degree() as Letter;
    let mut colour = vec![WHITE; n];
    for start in 0..n {
        if !mask[start] || colour[start] != WHITE {
            continue;
        }
        // Iterative DFS; the stack holds (node, adjacency cursor) and each
        // loop iteration consumes one edge.
        let mut stack: Vec<(Node, Letter)> = vec![(Node::from_index(start), 0)];
        colour[start] = GREY;
        while let Some(top) = stack.last_mut() {
            let (c, x) = *top;
            if x >= degree {
                colour[c.index()] = BLACK;
                stack.pop();
                continue;
            }
            top.1 += 1;
            let t = graph.target(c, x);
            if t.is_undefined() || !mask[t.index()] {
                continue;
            }
            match colour[t.index()] {
                GREY => return true,
                WHITE => {
                    colour[t.index()] = GREY;
                    stack.push((t, 0));
                }
                _ => {}
            }
        }
    }
    false
}

/// Counts the paths from `source` (to `target`, when given) with length in
/// `[min, max)`, where `max = None` means unbounded.
///
/// The count is [`Count::Infinite`] exactly when the window is unbounded
/// and a cycle lies on some counted path; otherwise finite, saturating at
/// `u64::MAX`.
pub fn number_of_paths(
    graph: &WordGraph,
    source: Node,
    target: Option<Node>,
    min: usize,
    max: Option<usize>,
) -> Count {
    let reach = reachable(graph, source);
    if let Some(t) = target {
        if !reach[t.index()] {
            return Count::Finite(0);
        }
    }
    let mask: Vec<bool> = match target {
        Some(t) => {
            let co = coreachable(graph, t);
            reach.iter().zip(co.iter()).map(|(&a, &b)| a && b).collect()
        }
        None => reach,
    };
    let horizon = match max {
        Some(m) => m,
        None => {
            if has_cycle(graph, &mask) {
                return Count::Infinite;
            }
            // In a DAG no path revisits a node, so lengths are bounded by
            // the number of relevant nodes.
            mask.iter().filter(|&&b| b).count()
        }
    };
    if min >= horizon {
        return Count::Finite(0);
    }
    let n = graph.number_of_nodes();
    let mut ways: Vec<u64> = vec![0; n];
    ways[source.index()] = 1;
    let mut total: u64 = 0;
    let count_band = |ways: &[u64]| -> u64 {
        match target {
            Some(t) => ways[t.index()],
            None => ways.iter().fold(0u64, |acc, &w| acc.saturating_add(w)),
        }
    };
    if min == 0 {
        total = total.saturating_add(count_band(&ways));
    }
    for len in 1..horizon {
        let mut next: Vec<u64> = vec![0; n];
        for c in 0..n {
            if ways[c] == 0 || !mask[c] {
                continue;
            }
            let c_node = Node::from_index(c);
            for (_, t) in graph.targets_of(c_node) {
                if mask[t.index()] {
                    next[t.index()] = next[t.index()].saturating_add(ways[c]);
                }
            }
        }
        ways = next;
        if len >= min {
            total = total.saturating_add(count_band(&ways));
        }
        if ways.iter().all(|&w| w == 0) {
            break;
        }
    }
    Count::Finite(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: u32) -> Node {
        Node::new(i)
    }

    /// 0 -a-> 1 -b-> 2, plus 0 -b-> 2.
    fn small_dag() -> WordGraph {
        let mut g = WordGraph::new(3, 2);
        g.add_edge_unchecked(n(0), 0, n(1));
        g.add_edge_unchecked(n(1), 1, n(2));
        g.add_edge_unchecked(n(0), 1, n(2));
        g
    }

    #[test]
    fn enumerates_in_short_lex_order() {
        let g = small_dag();
        let words: Vec<Word> = Paths::new(&g, n(0), None, 0, None).collect();
        assert_eq!(
            words,
            vec![vec![], vec![0], vec![1], vec![0, 1]],
        );
    }

    #[test]
    fn target_restricts_to_accepted_paths() {
        let g = small_dag();
        let words: Vec<Word> = Paths::new(&g, n(0), Some(n(2)), 0, None).collect();
        assert_eq!(words, vec![vec![1], vec![0, 1]]);
    }

    #[test]
    fn window_is_half_open() {
        let g = small_dag();
        let words: Vec<Word> = Paths::new(&g, n(0), None, 1, Some(2)).collect();
        assert_eq!(words, vec![vec![0], vec![1]]);
        assert_eq!(Paths::new(&g, n(0), None, 2, Some(2)).count(), 0);
    }

    #[test]
    fn iterator_is_restartable() {
        let g = small_dag();
        let first: Vec<Word> = Paths::new(&g, n(0), None, 0, None).collect();
        let again: Vec<Word> = Paths::new(&g, n(0), None, 0, None).collect();
        assert_eq!(first, again);
        let mut it = Paths::new(&g, n(0), None, 0, None);
        it.next();
        let resumed: Vec<Word> = it.clone().collect();
        assert_eq!(resumed, first[1..].to_vec());
    }

    #[test]
    fn cycle_bounded_enumeration() {
        // 0 -a-> 1 -a-> 0: words of a's with even length return to 0.
        let mut g = WordGraph::new(2, 1);
        g.add_edge_unchecked(n(0), 0, n(1));
        g.add_edge_unchecked(n(1), 0, n(0));
        let words: Vec<Word> = Paths::new(&g, n(0), Some(n(0)), 0, Some(5)).collect();
        assert_eq!(words, vec![vec![], vec![0, 0], vec![0, 0, 0, 0]]);
    }

    #[test]
    fn counting_matches_enumeration_on_dags() {
        let g = small_dag();
        assert_eq!(number_of_paths(&g, n(0), None, 0, None), Count::Finite(4));
        assert_eq!(number_of_paths(&g, n(0), Some(n(2)), 0, None), Count::Finite(2));
        assert_eq!(number_of_paths(&g, n(0), None, 1, Some(2)), Count::Finite(2));
        assert_eq!(number_of_paths(&g, n(0), Some(n(1)), 0, None), Count::Finite(1));
    }

    #[test]
    fn counting_detects_cycles() {
        let mut g = WordGraph::new(2, 1);
        g.add_edge_unchecked(n(0), 0, n(1));
        g.add_edge_unchecked(n(1), 0, n(0));
        assert_eq!(number_of_paths(&g, n(0), None, 0, None), Count::Infinite);
        assert_eq!(number_of_paths(&g, n(0), Some(n(0)), 0, None), Count::Infinite);
        // A bounded window over a cyclic graph is still finite.
        assert_eq!(
            number_of_paths(&g, n(0), Some(n(0)), 0, Some(5)),
            Count::Finite(3)
        );
    }

    #[test]
    fn cycle_off_the_counted_paths_stays_finite() {
        // 0 -a-> 1 and a separate loop 2 -a-> 2 unreachable from 0.
        let mut g = WordGraph::new(3, 1);
        g.add_edge_unchecked(n(0), 0, n(1));
        g.add_edge_unchecked(n(2), 0, n(2));
        assert_eq!(number_of_paths(&g, n(0), None, 0, None), Count::Finite(2));
        // Reachable cycle that cannot reach the target does not count
        // either: 0 -a-> 1, 0 -b-> 3 -a-> 3, target 1.
        let mut h = WordGraph::new(4, 2);
        h.add_edge_unchecked(n(0), 0, n(1));
        h.add_edge_unchecked(n(0), 1, n(3));
        h.add_edge_unchecked(n(3), 0, n(3));
        assert_eq!(number_of_paths(&h, n(0), Some(n(1)), 0, None), Count::Finite(1));
    }

    #[test]
    fn unreachable_target_counts_zero() {
        let g = small_dag();
        let mut h = g.clone();
        h.add_nodes(1);
        assert_eq!(number_of_paths(&h, n(0), Some(n(3)), 0, None), Count::Finite(0));
    }
}
