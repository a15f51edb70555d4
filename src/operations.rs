//! Helper operations over [`Stephen`] instances.
//!
//! These free functions trigger the procedure on demand and then interrogate
//! the finished word graph: membership of the accepted language, left
//! factors, and short-lex enumeration and counting of both. Words are taken
//! and produced over the presentation's letters, not over internal labels.

use crate::paths::{number_of_paths, Count, Paths};
use crate::stephen::{Stephen, StephenError};
use crate::word_graph::{Letter, Node, Word};

/// Whether `w` is equal to the instance's word in the presented semigroup.
///
/// Triggers the procedure. A word using letters outside the alphabet is
/// never equal.
pub fn accepts(s: &mut Stephen, w: &[Letter]) -> Result<bool, StephenError> {
    let accept = s.accept_state()?;
    let Ok(labels) = s.presentation().word_to_indices(w) else {
        return Ok(false);
    };
    let (end, used) = s.word_graph().follow_path(Node::new(0), &labels);
    Ok(used == labels.len() && end == accept)
}

/// Whether `w` is a left factor of the instance's word, that is whether
/// some `v` exists with `wv` equal to the word.
pub fn is_left_factor(s: &mut Stephen, w: &[Letter]) -> Result<bool, StephenError> {
    s.accept_state()?;
    let Ok(labels) = s.presentation().word_to_indices(w) else {
        return Ok(false);
    };
    let (_, used) = s.word_graph().follow_path(Node::new(0), &labels);
    Ok(used == labels.len())
}

/// The words equal to the instance's word with length in `[min, max)`, in
/// short-lex order.
pub fn words_accepted(
    s: &mut Stephen,
    min: usize,
    max: Option<usize>,
) -> Result<impl Iterator<Item = Word> + '_, StephenError> {
    let accept = s.accept_state()?;
    let alphabet = s.presentation().alphabet().clone();
    let paths = Paths::new(s.word_graph(), Node::new(0), Some(accept), min, max);
    Ok(paths.map(move |labels| labels.iter().map(|&x| alphabet[x as usize]).collect()))
}

/// The left factors of the instance's word with length in `[min, max)`, in
/// short-lex order.
pub fn left_factors(
    s: &mut Stephen,
    min: usize,
    max: Option<usize>,
) -> Result<impl Iterator<Item = Word> + '_, StephenError> {
    s.accept_state()?;
    let alphabet = s.presentation().alphabet().clone();
    let paths = Paths::new(s.word_graph(), Node::new(0), None, min, max);
    Ok(paths.map(move |labels| labels.iter().map(|&x| alphabet[x as usize]).collect()))
}

/// Number of words equal to the instance's word with length in
/// `[min, max)`.
pub fn number_of_words_accepted(
    s: &mut Stephen,
    min: usize,
    max: Option<usize>,
) -> Result<Count, StephenError> {
    let accept = s.accept_state()?;
    Ok(number_of_paths(s.word_graph(), Node::new(0), Some(accept), min, max))
}

/// Number of left factors of the instance's word with length in
/// `[min, max)`.
pub fn number_of_left_factors(
    s: &mut Stephen,
    min: usize,
    max: Option<usize>,
) -> Result<Count, StephenError> {
    s.accept_state()?;
    Ok(number_of_paths(s.word_graph(), Node::new(0), None, min, max))
}

/// Whether two instances define the same element: each accepts the other's
/// word. Runs both procedures, so both instances are mutable.
pub fn equivalent(a: &mut Stephen, b: &mut Stephen) -> Result<bool, StephenError> {
    let word_b = b.word().clone();
    let word_a = a.word().clone();
    Ok(accepts(a, &word_b)? && accepts(b, &word_a)?)
}
