//! Response-shape descriptor sent with every request.
//!
//! Gemini constrains its output to this schema when `responseSchema` is set
//! alongside `responseMimeType: application/json`. The dialect is Gemini's
//! OpenAPI subset: upper-case type names, `properties`, `items`, `required`.
//!
//! The descriptor must mirror [`crate::output::TestResult`] field for field.
//! Every object level lists all of its properties as `required`, so the
//! service cannot drop a field the parser depends on.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

static RESPONSE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "The main title of the test, e.g., \"SYNTAX TEST\"."
            },
            "timeAllotted": {
                "type": "STRING",
                "description": "The time allotted for the test, e.g., \"60 minutes\"."
            },
            "questions": {
                "type": "ARRAY",
                "description": "An array of all questions found in the test.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "questionNumber": {
                            "type": "INTEGER",
                            "description": "The number of the question, e.g., 1, 2, 3."
                        },
                        "english": language_block(
                            "The instruction or prompt for the question in English.",
                            "The specific content of the question, like the sentence to be analyzed."
                        ),
                        "vietnamese": language_block(
                            "A precise Vietnamese translation of the question prompt.",
                            "A precise Vietnamese translation of the question content."
                        ),
                        "solution": {
                            "type": "OBJECT",
                            "properties": {
                                "english": {
                                    "type": "STRING",
                                    "description": "A detailed, step-by-step solution and explanation for the question in English. Use newlines for formatting."
                                },
                                "vietnamese": {
                                    "type": "STRING",
                                    "description": "A precise Vietnamese translation of the solution. Use newlines for formatting."
                                }
                            },
                            "required": ["english", "vietnamese"]
                        }
                    },
                    "required": ["questionNumber", "english", "vietnamese", "solution"]
                }
            }
        },
        "required": ["title", "timeAllotted", "questions"]
    })
});

fn language_block(prompt: &str, content: &str) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "prompt": { "type": "STRING", "description": prompt },
            "content": { "type": "STRING", "description": content }
        },
        "required": ["prompt", "content"]
    })
}

/// The static response schema. Built once, shared by every request.
pub fn response_schema() -> &'static Value {
    &RESPONSE_SCHEMA
}
