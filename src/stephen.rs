//! Stephen's procedure.
//!
//! Given a finitely presented semigroup (or inverse monoid) and a word `w`,
//! [`Stephen`] saturates a word graph, seeded with the linear path for `w`,
//! until it is closed under every rule of the presentation. On termination
//! the paths from node `0` are exactly the left factors of `w` and the
//! paths from `0` to the accept state are exactly the words equal to `w`.
//!
//! The procedure is semi-decidable: for infinite semigroups it may never
//! reach a clean pass. Callers bound it with [`Stephen::run_bounded`] or a
//! shared cancellation flag; an interrupted run leaves the graph in a
//! consistent state and resumes where it stopped.
//!
//! # Determinism
//! - A pass visits nodes in active-list order; per node, rules are applied
//!   in presentation order; per rule, the left side is traced before the
//!   right. These orderings fix which identifier survives every merge.
//! - If the node under scan is itself retired by a cascade, the pass is
//!   abandoned and the next pass rescans from node `0`; the pass was dirty,
//!   so this costs no information.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::managed::ManagedGraph;
use crate::presentation::{InversePresentation, Presentation, PresentationError};
use crate::word_graph::{Letter, Node, Word, WordGraph};

/// Errors raised by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StephenError {
    /// The presentation or an input word failed validation.
    Presentation(PresentationError),
    /// `run` was called before `set_word`.
    MissingWord,
    /// The involution audit failed after saturation: some edge `c → d` has
    /// no matching reverse edge under the formal inverse of its label. The
    /// input is not a valid inverse-monoid presentation.
    IncompatibleInverse {
        /// The node the offending edge points at.
        expected: Node,
        /// What the reverse edge points at instead (possibly undefined).
        found: Node,
    },
}

impl fmt::Display for StephenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StephenError::Presentation(e) => write!(f, "{e}"),
            StephenError::MissingWord => write!(f, "no word has been set; call set_word first"),
            StephenError::IncompatibleInverse { expected, found } => write!(
                f,
                "inverse edge mismatch: expected {expected}, found {found}; \
                 the presentation is not a valid inverse-monoid presentation"
            ),
        }
    }
}

impl std::error::Error for StephenError {}

impl From<PresentationError> for StephenError {
    fn from(e: PresentationError) -> Self {
        StephenError::Presentation(e)
    }
}

/// How a bounded or cancellable run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// A clean pass completed; the word graph is final.
    Finished,
    /// The pass bound or the cancellation flag stopped the run first.
    Stopped,
}

/// The two presentation kinds the driver specialises on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationVariant {
    /// An ordinary semigroup or monoid presentation.
    Plain(Presentation),
    /// A presentation with a formal involution on the alphabet.
    Inverse(InversePresentation),
}

impl PresentationVariant {
    /// The underlying presentation of either variant.
    pub fn presentation(&self) -> &Presentation {
        match self {
            PresentationVariant::Plain(p) => p,
            PresentationVariant::Inverse(ip) => ip.presentation(),
        }
    }
}

/// Stephen's procedure for one presentation and one word at a time.
#[derive(Debug, Clone)]
pub struct Stephen {
    variant: PresentationVariant,
    /// Rules with letters translated to alphabet indices.
    rules: Vec<(Word, Word)>,
    /// Label-level involution for inverse presentations.
    inv_labels: Option<Vec<Letter>>,
    word: Word,
    graph: ManagedGraph,
    accept: Node,
    finished: bool,
    word_set: bool,
    cancel: Arc<AtomicBool>,
    report_interval: Option<Duration>,
}

impl Stephen {
    /// Creates an instance for a plain presentation.
    pub fn new(presentation: Presentation) -> Result<Self, StephenError> {
        presentation.validate()?;
        Self::build(PresentationVariant::Plain(presentation), None)
    }

    /// Creates an instance for an inverse presentation.
    pub fn new_inverse(presentation: InversePresentation) -> Result<Self, StephenError> {
        presentation.presentation().validate()?;
        let p = presentation.presentation();
        let inv_labels = presentation
            .inverses()
            .iter()
            .map(|&b| p.letter_index(b).ok_or(PresentationError::InvalidInverses))
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(PresentationVariant::Inverse(presentation), Some(inv_labels))
    }

    fn build(
        variant: PresentationVariant,
        inv_labels: Option<Vec<Letter>>,
    ) -> Result<Self, StephenError> {
        let p = variant.presentation();
        let rules = p
            .rules()
            .iter()
            .map(|(u, v)| Ok((p.word_to_indices(u)?, p.word_to_indices(v)?)))
            .collect::<Result<Vec<_>, PresentationError>>()?;
        let out_degree = p.alphabet().len();
        Ok(Self {
            variant,
            rules,
            inv_labels,
            word: Word::new(),
            graph: ManagedGraph::with_nodes(1, out_degree),
            accept: Node::new(0),
            finished: false,
            word_set: false,
            cancel: Arc::new(AtomicBool::new(false)),
            report_interval: None,
        })
    }

    /// The presentation this instance was built from.
    #[inline]
    pub fn presentation(&self) -> &Presentation {
        self.variant.presentation()
    }

    /// The inverse presentation, for the inverse variant.
    pub fn inverse_presentation(&self) -> Option<&InversePresentation> {
        match &self.variant {
            PresentationVariant::Plain(_) => None,
            PresentationVariant::Inverse(ip) => Some(ip),
        }
    }

    /// Whether this instance carries an involution.
    #[inline]
    pub fn is_inverse(&self) -> bool {
        self.inv_labels.is_some()
    }

    /// The word set by [`Stephen::set_word`].
    #[inline]
    pub fn word(&self) -> &Word {
        &self.word
    }

    /// The word graph in its current state. Does not trigger the
    /// procedure.
    #[inline]
    pub fn word_graph(&self) -> &WordGraph {
        self.graph.word_graph()
    }

    /// Number of currently active nodes.
    #[inline]
    pub fn number_of_nodes_active(&self) -> usize {
        self.graph.number_active()
    }

    /// Whether a clean pass has completed for the current word.
    #[inline]
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// A shared flag that stops the run at the next pass boundary when
    /// set. The flag is never cleared by the driver.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Enables (or disables, with `None`) periodic progress reports.
    pub fn report_every(&mut self, interval: Option<Duration>) -> &mut Self {
        self.report_interval = interval;
        self
    }

    /// Sets the word whose left factors and equivalent words are sought.
    ///
    /// Resets the graph to the path for `w` from node `0` (folded under the
    /// involution for inverse presentations) and tentatively marks its
    /// endpoint as the accept state.
    pub fn set_word(&mut self, w: Word) -> Result<&mut Self, StephenError> {
        self.presentation().validate_word(&w)?;
        let labels = self.presentation().word_to_indices(&w)?;
        let out_degree = self.presentation().alphabet().len();
        self.graph = ManagedGraph::with_nodes(1, out_degree);
        self.word = w;
        self.finished = false;
        self.word_set = true;
        let end = self.complete_from(Node::new(0), &labels);
        if self.graph.process_coincidences() {
            self.accept = self.graph.representative(end);
        } else {
            self.accept = end;
        }
        Ok(self)
    }

    /// Runs until a clean pass completes or the cancellation flag is set.
    ///
    /// Non-termination is possible: the word problem this procedure
    /// semi-decides is undecidable in general.
    pub fn run(&mut self) -> Result<Outcome, StephenError> {
        self.run_impl(None)
    }

    /// Runs at most `max_passes` passes. The graph remains consistent and
    /// a later call picks up where this one stopped.
    pub fn run_bounded(&mut self, max_passes: usize) -> Result<Outcome, StephenError> {
        self.run_impl(Some(max_passes))
    }

    /// The accept state of the word graph.
    ///
    /// Triggers [`Stephen::run`] if the procedure has not finished. If the
    /// run is stopped by the cancellation flag the tentative accept state
    /// of the partial graph is returned.
    pub fn accept_state(&mut self) -> Result<Node, StephenError> {
        if !self.finished {
            self.run()?;
        }
        Ok(self.accept)
    }

    fn run_impl(&mut self, max_passes: Option<usize>) -> Result<Outcome, StephenError> {
        if !self.word_set {
            return Err(StephenError::MissingWord);
        }
        if self.finished {
            return Ok(Outcome::Finished);
        }
        let start = Instant::now();
        let mut last_report = start;
        let mut passes = 0usize;
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                debug!(passes, active = self.graph.number_active(), "run cancelled");
                return Ok(Outcome::Stopped);
            }
            if let Some(m) = max_passes {
                if passes >= m {
                    debug!(passes, active = self.graph.number_active(), "pass bound reached");
                    return Ok(Outcome::Stopped);
                }
            }
            let before = self.graph.stats().revision;
            let rules = std::mem::take(&mut self.rules);
            self.scan_pass(&rules, &mut last_report);
            self.rules = rules;
            passes += 1;
            if self.graph.stats().revision == before {
                break;
            }
        }
        if self.is_inverse() {
            self.audit_involution()?;
        }
        let q = self.graph.standardize();
        self.accept = q[self.accept.index()];
        self.finished = true;
        if self.report_interval.is_some() {
            let stats = self.graph.stats();
            info!(
                passes,
                nodes = self.graph.number_active(),
                edges = self.word_graph().number_of_edges(),
                merges = stats.merges,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "stephen: finished"
            );
        }
        Ok(Outcome::Finished)
    }

    /// One pass over the active list.
    ///
    /// Only as many nodes are scanned as were active when the pass began:
    /// nodes created mid-pass are appended at the list tail and picked up
    /// by the next pass, which keeps every pass finite even when the
    /// procedure as a whole does not terminate. Returns early if the node
    /// under scan is retired by a cascade; the pass was dirty, so the
    /// caller rescans.
    fn scan_pass(&mut self, rules: &[(Word, Word)], last_report: &mut Instant) {
        let mut remaining = self.graph.number_active();
        let mut c = self.graph.first_active_node();
        while !c.is_undefined() && remaining > 0 {
            remaining -= 1;
            self.report_status(last_report);
            for (u, v) in rules {
                self.apply_rule(c, u, v);
                if !self.graph.is_active(c) {
                    return;
                }
            }
            c = self.graph.next_active_node(c);
        }
    }

    /// Applies the rule `u = v` at node `c`.
    ///
    /// Both sides are traced as far as defined, the left first. If both
    /// trace completely the endpoints are coincided; if exactly one does,
    /// the stuck side is completed with fresh nodes and the endpoints are
    /// coincided. If neither side traces completely the rule does not
    /// apply at `c`.
    fn apply_rule(&mut self, c: Node, u: &[Letter], v: &[Letter]) {
        let (cu, i) = self.graph.follow_path(c, u);
        let (cv, j) = self.graph.follow_path(c, v);
        let u_done = i == u.len();
        let v_done = j == v.len();
        if u_done && v_done {
            self.graph.coincide(cu, cv);
        } else if u_done {
            let ev = self.complete_from(cv, &v[j..]);
            self.graph.coincide(cu, ev);
        } else if v_done {
            let eu = self.complete_from(cu, &u[i..]);
            self.graph.coincide(cv, eu);
        } else {
            return;
        }
        if self.graph.process_coincidences() {
            self.accept = self.graph.representative(self.accept);
        }
    }

    /// Extends the graph so the whole of `labels` is readable from `from`,
    /// defining fresh nodes where edges are missing, and returns the node
    /// reached. Existing edges, including involution mirrors defined along
    /// the way, are followed rather than redefined.
    fn complete_from(&mut self, from: Node, labels: &[Letter]) -> Node {
        let mut cur = from;
        for &x in labels {
            let t = self.graph.target(cur, x);
            cur = if t.is_undefined() {
                let d = self.graph.new_node();
                self.def_edge(cur, x, d);
                d
            } else {
                t
            };
        }
        cur
    }

    /// Defines `(c, x) → d`; for inverse presentations also defines the
    /// mirror edge `(d, x⁻¹) → c` when that slot is free, and schedules a
    /// coincidence with its current target otherwise.
    fn def_edge(&mut self, c: Node, x: Letter, d: Node) {
        self.graph.add_edge(c, x, d);
        if let Some(inv) = &self.inv_labels {
            let xi = inv[x as usize];
            let t = self.graph.target(d, xi);
            if t.is_undefined() {
                self.graph.add_edge(d, xi, c);
            } else if t != c {
                self.graph.coincide(t, c);
            }
        }
    }

    /// Verifies that the saturated graph respects the involution: every
    /// edge `c → d` labelled `x` must be mirrored by `d → c` labelled
    /// `x⁻¹`. A valid inverse presentation cannot fail this; a failure
    /// aborts the run.
    fn audit_involution(&self) -> Result<(), StephenError> {
        let inv = self.inv_labels.as_ref().expect("inverse variant");
        let degree = self.presentation().alphabet().len() as Letter;
        let mut c = self.graph.first_active_node();
        while !c.is_undefined() {
            for x in 0..degree {
                let d = self.graph.target(c, x);
                if !d.is_undefined() {
                    let back = self.graph.target(d, inv[x as usize]);
                    if back != c {
                        return Err(StephenError::IncompatibleInverse {
                            expected: c,
                            found: back,
                        });
                    }
                }
            }
            c = self.graph.next_active_node(c);
        }
        Ok(())
    }

    fn report_status(&self, last_report: &mut Instant) {
        let Some(interval) = self.report_interval else {
            return;
        };
        if last_report.elapsed() >= interval {
            let stats = self.graph.stats();
            info!(
                nodes = self.graph.number_active(),
                edges = self.word_graph().number_of_edges(),
                defined = stats.edges_defined,
                merges = stats.merges,
                "stephen: saturating"
            );
            *last_report = Instant::now();
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_graph_valid(&self) {
        self.graph.assert_valid();
    }
}

impl fmt::Display for Stephen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Stephen for a {} letter word with {} nodes and {} edges>",
            self.word.len(),
            self.word_graph().number_of_nodes(),
            self.word_graph().number_of_edges()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: u32) -> Node {
        Node::new(i)
    }

    fn free_semigroup(letters: u32) -> Presentation {
        let mut p = Presentation::new();
        p.alphabet_size(letters);
        p
    }

    #[test]
    fn run_before_set_word_is_an_error() {
        let mut s = Stephen::new(free_semigroup(2)).unwrap();
        assert_eq!(s.run().err(), Some(StephenError::MissingWord));
    }

    #[test]
    fn empty_alphabet_is_rejected() {
        let err = Stephen::new(Presentation::new()).err();
        assert_eq!(
            err,
            Some(StephenError::Presentation(PresentationError::EmptyAlphabet))
        );
    }

    #[test]
    fn set_word_rejects_foreign_letters() {
        let mut s = Stephen::new(free_semigroup(2)).unwrap();
        let err = s.set_word(vec![0, 5]).err();
        assert_eq!(
            err,
            Some(StephenError::Presentation(PresentationError::InvalidLetter(5)))
        );
        // The instance stays usable.
        assert!(s.set_word(vec![0, 1]).is_ok());
    }

    #[test]
    fn free_semigroup_word_is_a_chain() {
        let mut s = Stephen::new(free_semigroup(2)).unwrap();
        s.set_word(vec![0, 1]).unwrap();
        assert_eq!(s.run().unwrap(), Outcome::Finished);
        assert!(s.finished());
        s.assert_graph_valid();
        assert_eq!(s.word_graph().number_of_nodes(), 3);
        assert_eq!(s.word_graph().number_of_edges(), 2);
        assert_eq!(s.accept_state().unwrap(), n(2));
        assert_eq!(s.word_graph().target(n(0), 0), n(1));
        assert_eq!(s.word_graph().target(n(1), 1), n(2));
    }

    #[test]
    fn trivial_monoid_collapses_to_one_node() {
        let mut p = Presentation::new();
        p.alphabet_size(1);
        p.contains_empty_word(true);
        p.add_rule(vec![0], vec![]);
        let mut s = Stephen::new(p).unwrap();
        s.set_word(vec![0, 0, 0, 0]).unwrap();
        assert_eq!(s.run().unwrap(), Outcome::Finished);
        s.assert_graph_valid();
        assert_eq!(s.word_graph().number_of_nodes(), 1);
        assert_eq!(s.accept_state().unwrap(), n(0));
        // Accepts every power of the generator.
        for k in 0..6 {
            let w: Word = vec![0; k];
            let (end, used) = s.word_graph().follow_path(n(0), &w);
            assert_eq!((end, used), (n(0), k));
        }
    }

    #[test]
    fn cyclic_group_of_order_three() {
        // a^3 = e with e a two-sided identity; the a-edges close into a
        // cycle of length 3.
        let mut p = Presentation::new();
        p.alphabet_size(2);
        p.add_rule(vec![0, 0, 0], vec![1]);
        p.add_rule(vec![0, 1], vec![0]);
        p.add_rule(vec![1, 0], vec![0]);
        p.add_rule(vec![1, 1], vec![1]);
        let mut s = Stephen::new(p).unwrap();
        s.set_word(vec![0, 0]).unwrap();
        assert_eq!(s.run().unwrap(), Outcome::Finished);
        s.assert_graph_valid();
        let accept = s.accept_state().unwrap();
        let g = s.word_graph();
        // a^n reaches the accept state exactly when n = 2 (mod 3).
        for len in 0..10usize {
            let w: Word = vec![0; len];
            let (end, used) = g.follow_path(n(0), &w);
            assert_eq!(used, len, "a^{len} must be a left factor");
            assert_eq!(end == accept, len % 3 == 2, "a^{len}");
        }
        // The a-cycle itself has three nodes.
        let c1 = g.target(n(0), 0);
        let c2 = g.target(c1, 0);
        let c3 = g.target(c2, 0);
        assert_ne!(c1, c2);
        assert_ne!(c2, c3);
        assert_eq!(g.target(c3, 0), c1);
    }

    #[test]
    fn plactic_like_rewriting() {
        let mut p = Presentation::new();
        p.set_alphabet(vec![1, 2]).unwrap();
        p.add_rule(vec![1, 2, 1], vec![2, 1, 2]);
        let mut s = Stephen::new(p).unwrap();
        s.set_word(vec![1, 2, 1]).unwrap();
        assert_eq!(s.run().unwrap(), Outcome::Finished);
        s.assert_graph_valid();
        let accept = s.accept_state().unwrap();
        let g = s.word_graph();
        let labels_212 = [1, 0, 1];
        let (end, used) = g.follow_path(n(0), &labels_212);
        assert_eq!(used, 3);
        assert_eq!(end, accept);
        let labels_112 = [0, 0, 1];
        let (end, used) = g.follow_path(n(0), &labels_112);
        assert!(used < 3 || end != accept);
    }

    #[test]
    fn inverse_monoid_one_generator() {
        // A = {a, a⁻¹} with a⁻¹a a = a implied; the Munn tree of a is the
        // two-node path with mirrored edges.
        let mut p = Presentation::new();
        p.alphabet_size(2);
        p.contains_empty_word(true);
        p.add_rule(vec![0, 1, 0], vec![0]);
        let ip = InversePresentation::new(p, vec![1, 0]).unwrap();
        let mut s = Stephen::new_inverse(ip).unwrap();
        s.set_word(vec![0]).unwrap();
        assert_eq!(s.run().unwrap(), Outcome::Finished);
        s.assert_graph_valid();
        let accept = s.accept_state().unwrap();
        let g = s.word_graph();
        assert_eq!(g.number_of_nodes(), 2);
        // Reachable by a and by a a⁻¹ a.
        assert_eq!(g.follow_path(n(0), &[0]), (accept, 1));
        assert_eq!(g.follow_path(n(0), &[0, 1, 0]), (accept, 3));
        // a⁻¹ is not a left factor of a here.
        assert_eq!(g.follow_path(n(0), &[1]).1, 0);
    }

    #[test]
    fn bicyclic_monoid_does_not_terminate_in_bounded_passes() {
        // ⟨b, c | bc = ε⟩: saturation from w = b grows a fresh node per
        // pass forever.
        let mut p = Presentation::new();
        p.alphabet_size(2);
        p.contains_empty_word(true);
        p.add_rule(vec![0, 1], vec![]);
        let mut s = Stephen::new(p).unwrap();
        s.set_word(vec![0]).unwrap();
        assert_eq!(s.run_bounded(8).unwrap(), Outcome::Stopped);
        assert!(!s.finished());
        // Partial graph still satisfies the structural invariants.
        s.assert_graph_valid();
        // Resuming makes progress instead of restarting.
        let nodes_before = s.number_of_nodes_active();
        assert_eq!(s.run_bounded(2).unwrap(), Outcome::Stopped);
        assert!(s.number_of_nodes_active() > nodes_before);
    }

    #[test]
    fn cancellation_stops_at_a_pass_boundary() {
        let mut p = Presentation::new();
        p.alphabet_size(2);
        p.contains_empty_word(true);
        p.add_rule(vec![0, 1], vec![]);
        let mut s = Stephen::new(p).unwrap();
        s.set_word(vec![0]).unwrap();
        s.cancel_token().store(true, Ordering::Relaxed);
        assert_eq!(s.run().unwrap(), Outcome::Stopped);
        assert!(!s.finished());
        s.assert_graph_valid();
        // Clearing the flag lets the run continue.
        s.cancel_token().store(false, Ordering::Relaxed);
        assert_eq!(s.run_bounded(3).unwrap(), Outcome::Stopped);
    }

    #[test]
    fn set_word_resets_a_finished_instance() {
        let mut s = Stephen::new(free_semigroup(2)).unwrap();
        s.set_word(vec![0]).unwrap();
        s.run().unwrap();
        assert!(s.finished());
        s.set_word(vec![1, 1]).unwrap();
        assert!(!s.finished());
        s.run().unwrap();
        assert_eq!(s.word_graph().number_of_nodes(), 3);
        assert_eq!(s.accept_state().unwrap(), n(2));
    }

    #[test]
    fn display_summarises_the_instance() {
        let mut s = Stephen::new(free_semigroup(2)).unwrap();
        s.set_word(vec![0, 1]).unwrap();
        s.run().unwrap();
        assert_eq!(
            s.to_string(),
            "<Stephen for a 2 letter word with 3 nodes and 2 edges>"
        );
    }

    #[test]
    fn standardized_identifiers_follow_bfs_order() {
        // Whatever intermediate identifiers the merges produce, the final
        // graph is renamed so BFS from 0 visits 0, 1, 2, …
        let mut p = Presentation::new();
        p.alphabet_size(2);
        p.add_rule(vec![0, 0], vec![1]);
        let mut s = Stephen::new(p).unwrap();
        s.set_word(vec![0, 0, 0]).unwrap();
        s.run().unwrap();
        s.assert_graph_valid();
        let g = s.word_graph();
        let mut seen = vec![false; g.number_of_nodes()];
        let mut queue = vec![n(0)];
        seen[0] = true;
        let mut next_expected = 1u32;
        let mut head = 0;
        while head < queue.len() {
            let c = queue[head];
            head += 1;
            for (_, t) in g.targets_of(c) {
                if !seen[t.index()] {
                    assert_eq!(t.as_u32(), next_expected);
                    next_expected += 1;
                    seen[t.index()] = true;
                    queue.push(t);
                }
            }
        }
        assert!(seen.iter().all(|&b| b));
    }
}
