// src/services/identity.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::question::Question;

/// Identity of a question set, derived from its question texts.
///
/// Stored as the decimal string used for the `userQuizzes/{user}/{quizId}`
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizId(String);

impl QuizId {
    /// Wraps an identity received from a client or read back from the store.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the identity of `questions`.
///
/// The ordered texts are serialized as a compact JSON array and folded with
/// `h = 31 * h + unit` over UTF-16 code units in wrapping 32-bit arithmetic;
/// the absolute value is rendered in decimal. Answers and the correct index
/// do not take part, so only a change of question text (or order) starts a
/// new quiz. This is a revision tag, not a collision-resistant digest.
pub fn compute_identity(questions: &[Question]) -> QuizId {
    let texts: Vec<&str> = questions.iter().map(|q| q.text.as_str()).collect();
    // Serializing a list of strings cannot fail.
    let serialized = serde_json::to_string(&texts).unwrap_or_default();
    QuizId(fold(&serialized).to_string())
}

fn fold(input: &str) -> i64 {
    let hash = input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(i32::from(unit))
    });
    // Widen first so `i32::MIN` has an absolute value.
    i64::from(hash).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::default_questions;

    #[test]
    fn known_values() {
        // "[]" and "[\"a\"]" folded by hand.
        assert_eq!(compute_identity(&[]).as_str(), "2914");
        let one = [Question::new("a", &["x", "y"], 0)];
        assert_eq!(compute_identity(&one).as_str(), "85147669");
    }

    #[test]
    fn answers_and_correct_index_do_not_matter() {
        let a = default_questions();
        let mut b = default_questions();
        for q in &mut b {
            q.answers.reverse();
            q.answers.push("extra".to_owned());
            q.correct_answer = 0;
        }
        assert_eq!(compute_identity(&a), compute_identity(&b));
    }

    #[test]
    fn text_edits_and_reordering_change_identity() {
        let base = default_questions();
        let id = compute_identity(&base);

        let mut edited = base.clone();
        edited[0].text.push('!');
        assert_ne!(compute_identity(&edited), id);

        let mut reordered = base.clone();
        reordered.swap(0, 1);
        assert_ne!(compute_identity(&reordered), id);

        let shorter = &base[..4];
        assert_ne!(compute_identity(shorter), id);
    }

    #[test]
    fn non_ascii_text_is_hashed_by_utf16_units() {
        let arabic = [Question::new("ما هي عاصمة مصر؟", &["a", "b"], 0)];
        let emoji = [Question::new("🌍?", &["a", "b"], 0)];
        assert_ne!(compute_identity(&arabic), compute_identity(&emoji));
        assert!(compute_identity(&emoji).as_str().parse::<u64>().is_ok());
    }

    #[test]
    fn overflow_wraps_instead_of_panicking() {
        let long: Vec<Question> = (0..200)
            .map(|i| Question::new(&format!("Question number {i} with a fairly long text"), &["a", "b"], 0))
            .collect();
        let id = compute_identity(&long);
        assert!(id.as_str().parse::<i64>().unwrap() >= 0);
        assert_eq!(id, compute_identity(&long));
    }
}
