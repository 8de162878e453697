// src/models/question.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::MIN_ANSWERS;

/// One multiple-choice question as stored under `questions`.
///
/// Field names on the wire (`question`, `answers`, `correctAnswer`) are the
/// ones every client of the shared store already reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// The text shown to the player. Also the only input of the quiz identity.
    #[serde(rename = "question")]
    #[validate(custom(function = validate_text))]
    pub text: String,

    /// Options in display order.
    #[validate(custom(function = validate_answers))]
    pub answers: Vec<String>,

    /// Index into `answers`. Kept signed so an unset (`-1`) index coming from
    /// an editor survives deserialization and is reported by validation.
    pub correct_answer: i64,
}

impl Question {
    pub fn new(text: &str, answers: &[&str], correct_answer: usize) -> Self {
        Self {
            text: text.to_owned(),
            answers: answers.iter().map(|a| (*a).to_owned()).collect(),
            correct_answer: correct_answer as i64,
        }
    }

    /// The correct answer's index, if it points at an existing option.
    pub fn correct_index(&self) -> Option<usize> {
        usize::try_from(self.correct_answer)
            .ok()
            .filter(|i| *i < self.answers.len())
    }
}

/// Question as sent to players: the correct answer stays on the server.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub question: String,
    pub answers: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            question: q.text.clone(),
            answers: q.answers.clone(),
        }
    }
}

fn validate_text(text: &str) -> Result<(), validator::ValidationError> {
    if text.trim().is_empty() {
        return Err(validator::ValidationError::new("empty_question"));
    }
    Ok(())
}

fn validate_answers(answers: &[String]) -> Result<(), validator::ValidationError> {
    if answers.len() < MIN_ANSWERS {
        return Err(validator::ValidationError::new("too_few_answers"));
    }
    if answers.iter().any(|a| a.trim().is_empty()) {
        return Err(validator::ValidationError::new("empty_answer"));
    }
    Ok(())
}

/// First rule a question set breaks. `Display` is the message shown to the
/// editor; question numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionFault {
    NoQuestions,
    EmptyText(usize),
    TooFewAnswers(usize),
    EmptyAnswer(usize),
    NoCorrectAnswer(usize),
}

impl fmt::Display for QuestionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionFault::NoQuestions => write!(f, "The quiz must contain at least one question"),
            QuestionFault::EmptyText(n) => write!(f, "Question {n} is empty"),
            QuestionFault::TooFewAnswers(n) => write!(f, "Question {n} must have at least two answers"),
            QuestionFault::EmptyAnswer(n) => write!(f, "Question {n} contains an empty answer"),
            QuestionFault::NoCorrectAnswer(n) => write!(f, "Question {n} has no correct answer selected"),
        }
    }
}

/// Checks a whole question set. Saving is all-or-nothing, so the first fault
/// aborts it.
pub fn validate_question_set(questions: &[Question]) -> Result<(), QuestionFault> {
    if questions.is_empty() {
        return Err(QuestionFault::NoQuestions);
    }

    for (i, question) in questions.iter().enumerate() {
        let n = i + 1;
        if let Err(errors) = question.validate() {
            let codes: Vec<_> = errors
                .field_errors()
                .into_values()
                .flatten()
                .map(|e| e.code.clone())
                .collect();
            let has = |code: &str| codes.iter().any(|c| c == code);

            if has("empty_question") {
                return Err(QuestionFault::EmptyText(n));
            }
            if has("too_few_answers") {
                return Err(QuestionFault::TooFewAnswers(n));
            }
            if has("empty_answer") {
                return Err(QuestionFault::EmptyAnswer(n));
            }
        }
        if question.correct_index().is_none() {
            return Err(QuestionFault::NoCorrectAnswer(n));
        }
    }
    Ok(())
}

/// The built-in question set used when neither the shared store nor the
/// local cache has one.
pub fn default_questions() -> Vec<Question> {
    vec![
        Question::new("What is the capital of Egypt?", &["Cairo", "Alexandria", "Giza", "Aswan"], 0),
        Question::new("How many continents are there in the world?", &["5", "6", "7", "8"], 2),
        Question::new(
            "What is the largest ocean in the world?",
            &["Atlantic Ocean", "Pacific Ocean", "Indian Ocean", "Arctic Ocean"],
            1,
        ),
        Question::new("In which year was the Internet created?", &["1960", "1970", "1980", "1990"], 1),
        Question::new(
            "What is the longest river in the world?",
            &["Nile", "Amazon", "Mississippi", "Yangtze"],
            0,
        ),
    ]
}
