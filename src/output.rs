//! The canonical result of one analysis run.
//!
//! Field names follow the wire format the model is constrained to
//! (`timeAllotted`, `questionNumber`); the Rust side uses snake_case and
//! serde maps between the two. [`crate::schema::response_schema`] describes
//! exactly this shape and a unit test there keeps the two in lockstep.

use serde::{Deserialize, Serialize};

/// A fully extracted, translated and solved test.
///
/// Immutable once parsed. The order of `questions` is whatever the model
/// returned; use [`TestResult::sorted_questions`] for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Main title of the test, e.g. "SYNTAX TEST".
    pub title: String,
    /// Time allotted, verbatim from the paper, e.g. "60 minutes".
    pub time_allotted: String,
    pub questions: Vec<Question>,
}

/// One question with its translation and bilingual solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Sort and display key. Expected to be unique within a result, though
    /// nothing enforces it.
    pub question_number: i64,
    pub english: QuestionContent,
    pub vietnamese: QuestionContent,
    pub solution: SolutionContent,
}

/// Prompt and body of a question in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionContent {
    /// The instruction, e.g. "Identify the subject of the sentence."
    pub prompt: String,
    /// The material the instruction applies to, e.g. the sentence itself.
    pub content: String,
}

/// Step-by-step solution in both languages. Newlines are significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionContent {
    pub english: String,
    pub vietnamese: String,
}

impl TestResult {
    /// Questions ordered by `question_number`, ascending.
    ///
    /// The sort is stable, so questions sharing a number keep the order the
    /// model returned them in. The result itself is left untouched.
    pub fn sorted_questions(&self) -> Vec<&Question> {
        let mut questions: Vec<&Question> = self.questions.iter().collect();
        questions.sort_by_key(|q| q.question_number);
        questions
    }
}
