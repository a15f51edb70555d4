//! Stephen's procedure for finitely presented semigroups and inverse
//! monoids.
//!
//! Given a presentation `⟨A | R⟩` and a word `w ∈ A*`, this crate builds a
//! deterministic word graph (a finite, partially-defined automaton over
//! `A`) whose paths from the start node are exactly the left factors of
//! `w`, and whose paths from the start node to the accept state are
//! exactly the words equal to `w` in the presented semigroup. The
//! algorithm is closely related to Todd-Coxeter coset enumeration and
//! originates in J. B. Stephen's work on applications of automata theory
//! to presentations of monoids and inverse monoids.
//!
//! # Architecture
//!
//! The crate is layered bottom-up:
//! - [`table`]: resizable row-major tables backing all graph storage.
//! - [`word_graph`]: the partial deterministic transition table.
//! - [`sources`]: the same graph doubly indexed with per-(node, label)
//!   predecessor lists, making in-edge rewiring cheap.
//! - [`node_manager`] and [`union_find`]: liveness, identifier reuse and
//!   the coincidence stack.
//! - [`managed`]: the merge engine draining cascades of coincidences, and
//!   the canonical breadth-first standardisation.
//! - [`presentation`]: the input container and rule-synthesis helpers.
//! - [`stephen`]: the driver saturating the graph against the rules.
//! - [`paths`] and [`operations`]: short-lex enumeration and counting of
//!   accepted words and left factors.
//!
//! # Determinism
//!
//! All iteration orders (active nodes, labels, rules, path enumeration)
//! are fixed, so the same inputs always produce the same graph, including
//! its concrete node identifiers.
//!
//! # Example
//!
//! ```
//! use stephen::prelude::*;
//!
//! let mut p = Presentation::new();
//! p.alphabet_size(2);
//! p.add_rule(vec![0, 1], vec![1, 0]);
//! let mut s = Stephen::new(p).unwrap();
//! s.set_word(vec![0, 1]).unwrap();
//! assert!(accepts(&mut s, &[1, 0]).unwrap());
//! ```
//!
//! # References
//!
//! - Stephen, "Applications of automata theory to presentations of
//!   monoids and inverse monoids" (1987)
//! - Todd, Coxeter, "A practical method for enumerating cosets of a
//!   finite abstract group" (1936)

pub mod managed;
pub mod node_manager;
pub mod operations;
pub mod paths;
pub mod presentation;
pub mod sources;
pub mod stephen;
pub mod table;
pub mod union_find;
pub mod word_graph;

pub use crate::managed::ManagedGraph;
pub use crate::paths::{number_of_paths, Count, Paths};
pub use crate::presentation::{InversePresentation, Presentation, PresentationError};
pub use crate::sources::SourcedWordGraph;
pub use crate::stephen::{Outcome, PresentationVariant, Stephen, StephenError};
pub use crate::word_graph::{Letter, Node, Word, WordGraph};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::operations::{
        accepts, equivalent, is_left_factor, left_factors, number_of_left_factors,
        number_of_words_accepted, words_accepted,
    };
    pub use crate::paths::{number_of_paths, Count, Paths};
    pub use crate::presentation::{
        add_identity_rules, add_inverse_rules, add_zero_rules, InversePresentation,
        Presentation, PresentationError,
    };
    pub use crate::stephen::{Outcome, Stephen, StephenError};
    pub use crate::word_graph::{Letter, Node, Word, WordGraph};
}
