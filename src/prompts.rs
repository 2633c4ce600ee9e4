//! Instruction text sent ahead of the test images.
//!
//! Callers can override the default via
//! [`crate::config::SolverConfig::instructions`]; the constant here is used
//! only when no override is provided.

/// Default instructions for extracting, translating and solving a syntax test.
///
/// Rule 5 is the pure-JSON directive; the request additionally sets
/// `responseMimeType` to [`RESPONSE_MIME_TYPE`].
pub const DEFAULT_INSTRUCTIONS: &str = r#"You are an expert in English syntax and a helpful teaching assistant. Your task is to analyze the provided images of an English syntax test, extract the questions, translate them to Vietnamese, and provide detailed solutions for each.

Follow these instructions carefully:
1.  Accurately extract all questions, including their numbers and any associated text or sentences.
2.  For each question, provide a precise Vietnamese translation.
3.  For each question, write a clear, step-by-step solution. Explain the grammatical rules and concepts involved. Use markdown for formatting if needed.
4.  Translate the solution into Vietnamese.
5.  Format the entire output as a single JSON object that strictly adheres to the provided schema. Do not include any text or markdown formatting (like ```json) outside of the JSON object itself. Ensure all text, especially content with multiple lines or special characters, is correctly escaped within the JSON strings."#;

/// MIME type requested for the reply body.
pub const RESPONSE_MIME_TYPE: &str = "application/json";
