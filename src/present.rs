//! Plain-text rendering of a [`TestResult`] in one of three view modes.
//!
//! Rendering never mutates the result and never re-fetches: switching mode
//! is just calling [`render_view`] again with a different [`ViewMode`].
//! Questions are always shown in ascending `questionNumber` order.

use crate::output::{Question, TestResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Which face of the result to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Original English prompts and content. (default)
    #[default]
    English,
    /// Vietnamese translation of prompts and content.
    Vietnamese,
    /// Bilingual solutions side by side.
    Solution,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::English, ViewMode::Vietnamese, ViewMode::Solution];

    /// Tab label.
    pub fn label(self) -> &'static str {
        match self {
            ViewMode::English => "English Test",
            ViewMode::Vietnamese => "Bản dịch Tiếng Việt",
            ViewMode::Solution => "Solutions & Guide",
        }
    }
}

/// Render `result` as terminal text in the given mode.
pub fn render_view(result: &TestResult, mode: ViewMode) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", result.title);
    let _ = writeln!(out, "Time Allotted: {}", result.time_allotted);
    let _ = writeln!(out, "[{}]", mode.label());

    for question in result.sorted_questions() {
        out.push('\n');
        let _ = writeln!(out, "Question {}", question.question_number);
        render_question(&mut out, question, mode);
    }
    out
}

fn render_question(out: &mut String, q: &Question, mode: ViewMode) {
    match mode {
        ViewMode::English => {
            let _ = writeln!(out, "  {}", q.english.prompt);
            push_indented(out, &q.english.content, "  ");
        }
        ViewMode::Vietnamese => {
            let _ = writeln!(out, "  {}", q.vietnamese.prompt);
            push_indented(out, &q.vietnamese.content, "  ");
        }
        ViewMode::Solution => {
            let _ = writeln!(out, "  Solution (English)");
            push_indented(out, &q.solution.english, "    ");
            let _ = writeln!(out, "  Giải thích (Tiếng Việt)");
            push_indented(out, &q.solution.vietnamese, "    ");
        }
    }
}

/// Append `text` line by line with `indent`, preserving blank lines.
fn push_indented(out: &mut String, text: &str, indent: &str) {
    for line in text.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "{indent}{line}");
        }
    }
}
