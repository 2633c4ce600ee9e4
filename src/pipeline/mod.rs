//! Pipeline stages for one analysis run.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ request ──▶ llm ──▶ parse
//! (path/URL) (base64)  (+schema)   (Gemini) (TestResult)
//! ```
//!
//! 1. [`input`]  : load paths, URLs and data URIs into `UploadedImage`s
//! 2. [`encode`] : base64-wrap each image; fan-out on the blocking pool,
//!    fan-in in selection order
//! 3. [`request`]: assemble instructions, image parts and response schema
//! 4. [`llm`]    : the only stage with model I/O; timeout and retry policy
//! 5. [`parse`]  : structural validation into the canonical result type

pub mod encode;
pub mod input;
pub mod llm;
pub mod parse;
pub mod request;
