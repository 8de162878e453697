// src/services/session.rs

use std::fmt;

use serde::Serialize;

use crate::{
    config::POINTS_PER_CORRECT,
    models::{attempt::percentage, question::Question},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Every question has already been passed.
    Finished,
    /// The selected option does not exist on the current question.
    AnswerOutOfRange { question: usize, answer: usize },
    /// More answers were submitted than the quiz has questions.
    TooManyAnswers { expected: usize, got: usize },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Finished => write!(f, "The quiz is already finished"),
            SessionError::AnswerOutOfRange { question, answer } => {
                write!(f, "Question {question} has no answer {answer}")
            }
            SessionError::TooManyAnswers { expected, got } => {
                write!(f, "Expected at most {expected} answers, got {got}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Progress of one player through one question set.
#[derive(Debug, Clone)]
pub struct SessionState {
    questions: Vec<Question>,
    current: usize,
    answers: Vec<Option<usize>>,
}

/// How one question was answered, for the result page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerReview {
    pub question: String,
    pub selected: Option<usize>,
    pub selected_text: Option<String>,
    pub correct_answer: usize,
    pub correct_text: String,
    pub is_correct: bool,
}

/// Graded result of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizOutcome {
    /// Number of correct answers.
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
    /// Points this outcome is worth if it gets recorded.
    pub points: u32,
    pub review: Vec<AnswerReview>,
}

impl SessionState {
    pub fn new(questions: Vec<Question>) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            questions,
            current: 0,
            answers,
        }
    }

    /// Rebuilds a session from a full list of submitted answers. Missing
    /// trailing answers count as unanswered.
    pub fn replay(questions: Vec<Question>, answers: &[Option<usize>]) -> Result<Self, SessionError> {
        if answers.len() > questions.len() {
            return Err(SessionError::TooManyAnswers {
                expected: questions.len(),
                got: answers.len(),
            });
        }

        let mut session = Self::new(questions);
        for answer in answers {
            if let Some(answer) = answer {
                session.select(*answer)?;
            }
            session.advance()?;
        }
        Ok(session)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.questions.len()
    }

    /// Selects an option on the current question, replacing any earlier
    /// selection.
    pub fn select(&mut self, answer: usize) -> Result<(), SessionError> {
        let question = self.current_question().ok_or(SessionError::Finished)?;
        if answer >= question.answers.len() {
            return Err(SessionError::AnswerOutOfRange {
                question: self.current + 1,
                answer,
            });
        }
        self.answers[self.current] = Some(answer);
        Ok(())
    }

    /// Moves to the next question. Returns whether one remains.
    pub fn advance(&mut self) -> Result<bool, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        self.current += 1;
        Ok(!self.is_finished())
    }

    /// Grades every question, answered or not.
    pub fn finish(self) -> QuizOutcome {
        let review: Vec<AnswerReview> = self
            .questions
            .iter()
            .zip(&self.answers)
            .map(|(question, selected)| {
                let correct = question.correct_index();
                AnswerReview {
                    question: question.text.clone(),
                    selected: *selected,
                    selected_text: selected.and_then(|i| question.answers.get(i).cloned()),
                    correct_answer: correct.unwrap_or_default(),
                    correct_text: correct
                        .and_then(|i| question.answers.get(i).cloned())
                        .unwrap_or_default(),
                    is_correct: selected.is_some() && *selected == correct,
                }
            })
            .collect();

        let score = review.iter().filter(|r| r.is_correct).count() as u32;
        let total_questions = self.questions.len() as u32;

        QuizOutcome {
            score,
            total_questions,
            percentage: percentage(score, total_questions),
            points: score * POINTS_PER_CORRECT,
            review,
        }
    }
}
