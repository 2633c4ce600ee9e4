//! Response validation: raw reply text → [`TestResult`].
//!
//! Validation is structural only. The text must be a JSON object of the
//! declared shape; nothing checks that question numbers are unique,
//! monotonic or that strings are non-empty.

use crate::error::SolverError;
use crate::output::TestResult;
use tracing::error;

/// Parse the reply text into a [`TestResult`].
///
/// Surrounding whitespace is trimmed first. On failure the raw text is
/// logged and kept in [`SolverError::InvalidResponse`]; the error's message
/// stays generic.
pub fn parse_response(raw: &str) -> Result<TestResult, SolverError> {
    serde_json::from_str::<TestResult>(raw.trim()).map_err(|source| {
        error!("Failed to parse JSON response: {}", raw);
        SolverError::InvalidResponse {
            raw: raw.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::INVALID_FORMAT_MESSAGE;

    const VALID: &str = r#"
        {
          "title": "SYNTAX TEST",
          "timeAllotted": "45 minutes",
          "questions": [
            {
              "questionNumber": 2,
              "english": {"prompt": "Underline the verb.", "content": "She runs."},
              "vietnamese": {"prompt": "Gạch chân động từ.", "content": "Cô ấy chạy."},
              "solution": {"english": "Step 1\nStep 2", "vietnamese": "Bước 1\nBước 2"}
            },
            {
              "questionNumber": 1,
              "english": {"prompt": "Find the subject.", "content": "Dogs bark."},
              "vietnamese": {"prompt": "Tìm chủ ngữ.", "content": "Chó sủa."},
              "solution": {"english": "Dogs", "vietnamese": "Chó"}
            }
          ]
        }
    "#;

    #[test]
    fn parses_valid_payload_verbatim() {
        let r = parse_response(VALID).unwrap();
        assert_eq!(r.title, "SYNTAX TEST");
        assert_eq!(r.time_allotted, "45 minutes");
        assert_eq!(r.questions.len(), 2);
        // Order as returned, not sorted.
        assert_eq!(r.questions[0].question_number, 2);
        assert_eq!(r.questions[0].solution.english, "Step 1\nStep 2");
        assert_eq!(r.questions[1].vietnamese.content, "Chó sủa.");
    }

    #[test]
    fn no_semantic_checks() {
        let raw = r#"{"title":"","timeAllotted":"","questions":[
            {"questionNumber":7,"english":{"prompt":"","content":""},"vietnamese":{"prompt":"","content":""},"solution":{"english":"","vietnamese":""}},
            {"questionNumber":7,"english":{"prompt":"","content":""},"vietnamese":{"prompt":"","content":""},"solution":{"english":"","vietnamese":""}}
        ]}"#;
        let r = parse_response(raw).unwrap();
        assert_eq!(r.questions.len(), 2);
    }

    #[test]
    fn fenced_payload_is_rejected() {
        let raw = format!("```json\n{}\n```", VALID.trim());
        let err = parse_response(&raw).unwrap_err();
        assert_eq!(err.to_string(), INVALID_FORMAT_MESSAGE);
        assert_eq!(err.raw_response(), Some(raw.as_str()));
    }

    #[test]
    fn missing_field_is_rejected() {
        let err = parse_response(r#"{"title":"T","questions":[]}"#).unwrap_err();
        assert!(matches!(err, SolverError::InvalidResponse { .. }));
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(parse_response("   \n").is_err());
    }
}
