// src/models/attempt.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Player names become store path keys, so the characters a key cannot hold
/// (plus control characters) are refused up front.
pub static PLAYER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^./#$\[\]\x00-\x1F\x7F]+$").expect("player name pattern is valid"));

/// Completion marker stored at `userQuizzes/{user}/{quizId}`. Its presence
/// is what makes a later attempt at the same quiz a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptMarker {
    pub score: u32,
    pub total_questions: u32,
    /// Unix milliseconds.
    pub timestamp: i64,
}

/// Raw result appended to the `users` collection for every recorded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub name: String,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
    pub points: u32,
    pub quiz_id: String,
    pub timestamp: i64,
}

/// One entry of a player's completed quizzes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedQuiz {
    pub quiz_id: String,
    pub score: u32,
    pub total_questions: u32,
    pub timestamp: i64,
}

/// `round(score / total * 100)`, or 0 for an empty quiz.
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(score) / f64::from(total) * 100.0).round() as u32
}

/// DTO for submitting a finished quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    #[validate(
        length(min = 1, max = 40, message = "Name must be between 1 and 40 characters."),
        regex(path = *PLAYER_NAME, message = "Name contains characters that are not allowed.")
    )]
    pub name: String,

    /// Selected option per question, in order. `null` or a missing tail
    /// means the question was left unanswered.
    #[serde(default)]
    pub answers: Vec<Option<usize>>,

    /// Identity of the question set the player was shown. When present it
    /// must match the current set.
    pub quiz_id: Option<String>,
}

/// Query for endpoints keyed by a player name.
#[derive(Debug, Deserialize, Validate)]
pub struct PlayerQuery {
    #[validate(
        length(min = 1, max = 40, message = "Name must be between 1 and 40 characters."),
        regex(path = *PLAYER_NAME, message = "Name contains characters that are not allowed.")
    )]
    pub name: String,
}

/// Response for a graded submission.
#[derive(Debug, Serialize)]
pub struct SubmitQuizResponse {
    pub quiz_id: String,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
    pub already_completed: bool,
    pub recorded: bool,
    pub points_awarded: u32,
    /// Cumulative points after this submission, when known.
    pub total_points: Option<i64>,
    pub message: String,
    pub review: Vec<crate::services::session::AnswerReview>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(4, 5), 80);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn player_name_rules() {
        let ok = PlayerQuery { name: "Sara Ahmed".to_owned() };
        assert!(ok.validate().is_ok());

        for bad in ["", "a/b", "a.b", "x#", "$", "[x]", "tab\there"] {
            let q = PlayerQuery { name: bad.to_owned() };
            assert!(q.validate().is_err(), "{bad:?} should be rejected");
        }

        let long = PlayerQuery { name: "x".repeat(41) };
        assert!(long.validate().is_err());
    }
}
