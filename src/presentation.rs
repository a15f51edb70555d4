//! Semigroup and inverse-monoid presentations.
//!
//! A [`Presentation`] is an ordered alphabet of letters (small non-negative
//! integers) together with a list of rewriting rules (pairs of words) and a
//! flag recording whether the empty word is a valid word (monoid versus
//! semigroup presentations). An [`InversePresentation`] additionally carries
//! an involution on the alphabet designating each letter's formal inverse.
//!
//! The engine borrows presentations immutably for the duration of a run;
//! everything here is plain data plus validation.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use crate::word_graph::{Letter, Word};

/// Errors raised while building or validating presentations and input
/// words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationError {
    /// The alphabet has no letters.
    EmptyAlphabet,
    /// A letter occurs twice in the alphabet.
    DuplicateLetter(Letter),
    /// A word contains a letter outside the alphabet.
    InvalidLetter(Letter),
    /// A rule side is empty but the presentation does not contain the
    /// empty word.
    EmptyWord,
    /// The inverse assignment is not an involution on the alphabet.
    InvalidInverses,
}

impl fmt::Display for PresentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresentationError::EmptyAlphabet => write!(f, "the alphabet must contain at least one letter"),
            PresentationError::DuplicateLetter(a) => {
                write!(f, "letter {a} occurs more than once in the alphabet")
            }
            PresentationError::InvalidLetter(a) => {
                write!(f, "letter {a} does not belong to the alphabet")
            }
            PresentationError::EmptyWord => {
                write!(f, "empty words are not valid in this presentation")
            }
            PresentationError::InvalidInverses => {
                write!(f, "the inverse assignment is not an involution on the alphabet")
            }
        }
    }
}

impl std::error::Error for PresentationError {}

/// A finite semigroup or monoid presentation `⟨A | R⟩`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    alphabet: Word,
    index: HashMap<Letter, u32>,
    rules: Vec<(Word, Word)>,
    contains_empty_word: bool,
}

impl Presentation {
    /// Creates an empty presentation with no alphabet and no rules.
    pub fn new() -> Self {
        Self {
            alphabet: Word::new(),
            index: HashMap::new(),
            rules: Vec::new(),
            contains_empty_word: false,
        }
    }

    /// Sets the alphabet to `[0, n)`.
    pub fn alphabet_size(&mut self, n: u32) -> &mut Self {
        self.alphabet = (0..n).collect();
        self.index = (0..n).map(|i| (i, i)).collect();
        self
    }

    /// Sets the alphabet to the letters of `letters`, in order.
    ///
    /// Fails with [`PresentationError::DuplicateLetter`] if a letter
    /// repeats.
    pub fn set_alphabet(&mut self, letters: Word) -> Result<&mut Self, PresentationError> {
        let mut index = HashMap::with_capacity(letters.len());
        for (i, &a) in letters.iter().enumerate() {
            if index.insert(a, i as u32).is_some() {
                return Err(PresentationError::DuplicateLetter(a));
            }
        }
        self.alphabet = letters;
        self.index = index;
        Ok(self)
    }

    /// The alphabet, in order.
    #[inline]
    pub fn alphabet(&self) -> &Word {
        &self.alphabet
    }

    /// Index of `a` in the alphabet, if it belongs to it.
    #[inline]
    pub fn letter_index(&self, a: Letter) -> Option<u32> {
        self.index.get(&a).copied()
    }

    /// Whether `a` belongs to the alphabet.
    #[inline]
    pub fn in_alphabet(&self, a: Letter) -> bool {
        self.index.contains_key(&a)
    }

    /// Declares whether the empty word is a valid word (monoid
    /// presentations).
    pub fn contains_empty_word(&mut self, value: bool) -> &mut Self {
        self.contains_empty_word = value;
        self
    }

    /// Whether the empty word is a valid word.
    #[inline]
    pub fn has_empty_word(&self) -> bool {
        self.contains_empty_word
    }

    /// Appends the rule `lhs = rhs` without validation.
    pub fn add_rule(&mut self, lhs: Word, rhs: Word) -> &mut Self {
        self.rules.push((lhs, rhs));
        self
    }

    /// Appends the rule `lhs = rhs`, validating both sides first.
    pub fn add_rule_checked(&mut self, lhs: Word, rhs: Word) -> Result<&mut Self, PresentationError> {
        self.validate_word(&lhs)?;
        self.validate_word(&rhs)?;
        Ok(self.add_rule(lhs, rhs))
    }

    /// The rules, in order.
    #[inline]
    pub fn rules(&self) -> &[(Word, Word)] {
        &self.rules
    }

    /// Checks that `w` is a valid word over this presentation.
    pub fn validate_word(&self, w: &[Letter]) -> Result<(), PresentationError> {
        if w.is_empty() && !self.contains_empty_word {
            return Err(PresentationError::EmptyWord);
        }
        for &a in w {
            if !self.in_alphabet(a) {
                return Err(PresentationError::InvalidLetter(a));
            }
        }
        Ok(())
    }

    /// Checks the whole presentation: non-empty alphabet and valid rules.
    pub fn validate(&self) -> Result<(), PresentationError> {
        if self.alphabet.is_empty() {
            return Err(PresentationError::EmptyAlphabet);
        }
        for (lhs, rhs) in &self.rules {
            self.validate_word(lhs)?;
            self.validate_word(rhs)?;
        }
        Ok(())
    }

    /// Translates `w` from letters to alphabet indices.
    pub fn word_to_indices(&self, w: &[Letter]) -> Result<Word, PresentationError> {
        w.iter()
            .map(|&a| self.letter_index(a).ok_or(PresentationError::InvalidLetter(a)))
            .collect()
    }
}

impl Default for Presentation {
    fn default() -> Self {
        Self::new()
    }
}

/// A presentation together with a formal inverse for every letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InversePresentation {
    presentation: Presentation,
    inverses: Word,
}

impl InversePresentation {
    /// Wraps `presentation` with the inverse assignment `inverses`, where
    /// `inverses[i]` is the formal inverse of the `i`-th alphabet letter.
    ///
    /// Fails with [`PresentationError::InvalidInverses`] unless the
    /// assignment is an involution on the alphabet.
    pub fn new(presentation: Presentation, inverses: Word) -> Result<Self, PresentationError> {
        if inverses.len() != presentation.alphabet().len() {
            return Err(PresentationError::InvalidInverses);
        }
        for (i, &b) in inverses.iter().enumerate() {
            let Some(j) = presentation.letter_index(b) else {
                return Err(PresentationError::InvalidInverses);
            };
            let a = presentation.alphabet()[i];
            if inverses[j as usize] != a {
                return Err(PresentationError::InvalidInverses);
            }
        }
        Ok(Self {
            presentation,
            inverses,
        })
    }

    /// The underlying presentation.
    #[inline]
    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    /// The inverse assignment, indexed like the alphabet.
    #[inline]
    pub fn inverses(&self) -> &Word {
        &self.inverses
    }

    /// The formal inverse of `a`.
    pub fn inverse_of(&self, a: Letter) -> Option<Letter> {
        let i = self.presentation.letter_index(a)?;
        Some(self.inverses[i as usize])
    }
}

/// Adds the rules making `e` an identity: `ee = e` and `ae = a`, `ea = a`
/// for every other letter `a`.
pub fn add_identity_rules(p: &mut Presentation, e: Letter) -> Result<(), PresentationError> {
    if !p.in_alphabet(e) {
        return Err(PresentationError::InvalidLetter(e));
    }
    for &a in &p.alphabet().clone() {
        if a == e {
            p.add_rule(vec![e, e], vec![e]);
        } else {
            p.add_rule(vec![a, e], vec![a]);
            p.add_rule(vec![e, a], vec![a]);
        }
    }
    Ok(())
}

/// Adds the rules making `z` a zero: `zz = z` and `az = z`, `za = z` for
/// every other letter `a`.
pub fn add_zero_rules(p: &mut Presentation, z: Letter) -> Result<(), PresentationError> {
    if !p.in_alphabet(z) {
        return Err(PresentationError::InvalidLetter(z));
    }
    for &a in &p.alphabet().clone() {
        if a == z {
            p.add_rule(vec![z, z], vec![z]);
        } else {
            p.add_rule(vec![a, z], vec![z]);
            p.add_rule(vec![z, a], vec![z]);
        }
    }
    Ok(())
}

/// Adds the rules `a·a⁻¹ = e` for every letter, where `inverses[i]` is the
/// inverse of the `i`-th letter and `e` is the identity; with `e = None`
/// the right-hand sides are the empty word and the presentation must
/// contain it.
pub fn add_inverse_rules(
    p: &mut Presentation,
    inverses: &[Letter],
    e: Option<Letter>,
) -> Result<(), PresentationError> {
    if inverses.len() != p.alphabet().len() {
        return Err(PresentationError::InvalidInverses);
    }
    let rhs: Word = match e {
        Some(e) if p.in_alphabet(e) => vec![e],
        Some(e) => return Err(PresentationError::InvalidLetter(e)),
        None if p.has_empty_word() => Word::new(),
        None => return Err(PresentationError::EmptyWord),
    };
    for (i, &b) in inverses.iter().enumerate() {
        if !p.in_alphabet(b) {
            return Err(PresentationError::InvalidInverses);
        }
        let a = p.alphabet()[i];
        p.add_rule(vec![a, b], rhs.clone());
    }
    Ok(())
}

/// Removes rules whose two sides are equal.
pub fn remove_trivial_rules(p: &mut Presentation) {
    p.rules.retain(|(lhs, rhs)| lhs != rhs);
}

/// Removes duplicated rules, treating `u = v` and `v = u` as the same
/// rule. Keeps the first occurrence of each.
pub fn remove_duplicate_rules(p: &mut Presentation) {
    let mut seen: Vec<(Word, Word)> = Vec::new();
    p.rules.retain(|(lhs, rhs)| {
        let key = if lhs <= rhs {
            (lhs.clone(), rhs.clone())
        } else {
            (rhs.clone(), lhs.clone())
        };
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

/// Length of the longest rule side, or `0` with no rules.
pub fn longest_rule_length(p: &Presentation) -> usize {
    p.rules()
        .iter()
        .map(|(lhs, rhs)| lhs.len().max(rhs.len()))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_by_size_and_lookup() {
        let mut p = Presentation::new();
        p.alphabet_size(3);
        assert_eq!(p.alphabet(), &vec![0, 1, 2]);
        assert_eq!(p.letter_index(2), Some(2));
        assert_eq!(p.letter_index(3), None);
    }

    #[test]
    fn explicit_alphabet_rejects_duplicates() {
        let mut p = Presentation::new();
        assert!(p.set_alphabet(vec![5, 7]).is_ok());
        assert_eq!(p.letter_index(7), Some(1));
        let mut q = Presentation::new();
        assert_eq!(
            q.set_alphabet(vec![1, 1]).err(),
            Some(PresentationError::DuplicateLetter(1))
        );
    }

    #[test]
    fn validate_catches_foreign_letters_and_empty_sides() {
        let mut p = Presentation::new();
        p.alphabet_size(2);
        p.add_rule(vec![0, 1], vec![1]);
        assert!(p.validate().is_ok());
        p.add_rule(vec![0, 9], vec![1]);
        assert_eq!(p.validate(), Err(PresentationError::InvalidLetter(9)));
        let mut q = Presentation::new();
        q.alphabet_size(1);
        q.add_rule(vec![0], Word::new());
        assert_eq!(q.validate(), Err(PresentationError::EmptyWord));
        q.contains_empty_word(true);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn identity_and_zero_rules() {
        let mut p = Presentation::new();
        p.alphabet_size(2);
        add_identity_rules(&mut p, 1).unwrap();
        assert_eq!(
            p.rules(),
            &[(vec![0, 1], vec![0]), (vec![1, 0], vec![0]), (vec![1, 1], vec![1])]
        );
        let mut z = Presentation::new();
        z.alphabet_size(2);
        add_zero_rules(&mut z, 0).unwrap();
        assert_eq!(
            z.rules(),
            &[(vec![0, 0], vec![0]), (vec![1, 0], vec![0]), (vec![0, 1], vec![0])]
        );
    }

    #[test]
    fn inverse_rules_and_involution_check() {
        let mut p = Presentation::new();
        p.alphabet_size(2);
        p.contains_empty_word(true);
        add_inverse_rules(&mut p, &[1, 0], None).unwrap();
        assert_eq!(p.rules(), &[(vec![0, 1], vec![]), (vec![1, 0], vec![])]);

        let mut q = Presentation::new();
        q.alphabet_size(2);
        let ip = InversePresentation::new(q.clone(), vec![1, 0]).unwrap();
        assert_eq!(ip.inverse_of(0), Some(1));
        assert_eq!(ip.inverse_of(1), Some(0));
        assert_eq!(
            InversePresentation::new(q.clone(), vec![0, 0]).err(),
            Some(PresentationError::InvalidInverses)
        );
        assert_eq!(
            InversePresentation::new(q, vec![1]).err(),
            Some(PresentationError::InvalidInverses)
        );
    }

    #[test]
    fn rule_hygiene_helpers() {
        let mut p = Presentation::new();
        p.alphabet_size(2);
        p.add_rule(vec![0], vec![0]);
        p.add_rule(vec![0, 1], vec![1]);
        p.add_rule(vec![1], vec![0, 1]);
        p.add_rule(vec![0, 1], vec![1]);
        remove_trivial_rules(&mut p);
        remove_duplicate_rules(&mut p);
        assert_eq!(p.rules(), &[(vec![0, 1], vec![1])]);
        assert_eq!(longest_rule_length(&p), 2);
    }

    #[test]
    fn word_to_indices_translates_sparse_alphabets() {
        let mut p = Presentation::new();
        p.set_alphabet(vec![3, 8]).unwrap();
        assert_eq!(p.word_to_indices(&[8, 3, 8]), Ok(vec![1, 0, 1]));
        assert_eq!(
            p.word_to_indices(&[4]),
            Err(PresentationError::InvalidLetter(4))
        );
    }
}
