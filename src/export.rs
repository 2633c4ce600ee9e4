//! Static document export.
//!
//! [`export_html`] is a pure function of the [`TestResult`]: a single
//! self-contained HTML document that Word opens when served as
//! [`EXPORT_MIME_TYPE`] under [`EXPORT_FILE_NAME`]. All text is
//! HTML-escaped; solution newlines become `<br/>`.

use crate::error::SolverError;
use crate::output::TestResult;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Fixed download name of the export.
pub const EXPORT_FILE_NAME: &str = "test-review.doc";

/// MIME type the export is served with.
pub const EXPORT_MIME_TYPE: &str = "application/msword";

const STYLE: &str = "\
      body { font-family: 'Times New Roman', Times, serif; }
      h1, h2, h3 { color: #333; }
      .question { margin-bottom: 2em; border-bottom: 1px solid #ccc; padding-bottom: 1em; }
      .section-title { font-weight: bold; margin-top: 1em; }
";

/// Escape text for HTML element content and attribute values.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape, then turn every line break into `<br/>`.
fn escape_multiline(text: &str) -> String {
    escape_html(&text.replace("\r\n", "\n")).replace('\n', "<br/>")
}

/// Render the whole result as one HTML document.
///
/// Questions appear in ascending `questionNumber` order, the same order the
/// views use.
pub fn export_html(result: &TestResult) -> String {
    let title = escape_html(&result.title);
    let mut html = String::new();

    let _ = write!(
        html,
        "<!DOCTYPE html>
<html lang=\"en\">
  <head>
    <meta charset=\"UTF-8\">
    <title>{title}</title>
    <style>
{STYLE}    </style>
  </head>
  <body>
    <h1>{title}</h1>
    <p><strong>Time Allotted:</strong> {time}</p>
    <hr/>
",
        time = escape_html(&result.time_allotted),
    );

    for q in result.sorted_questions() {
        let _ = write!(
            html,
            "    <div class=\"question\">
      <h2>Question {number}</h2>

      <p class=\"section-title\">English:</p>
      <p><em>{en_prompt}</em></p>
      <p>{en_content}</p>

      <p class=\"section-title\">Vietnamese Translation:</p>
      <p><em>{vi_prompt}</em></p>
      <p>{vi_content}</p>

      <p class=\"section-title\">Solution (English):</p>
      <div>{en_solution}</div>

      <p class=\"section-title\">Solution (Vietnamese):</p>
      <div>{vi_solution}</div>
    </div>
",
            number = q.question_number,
            en_prompt = escape_html(&q.english.prompt),
            en_content = escape_html(&q.english.content),
            vi_prompt = escape_html(&q.vietnamese.prompt),
            vi_content = escape_html(&q.vietnamese.content),
            en_solution = escape_multiline(&q.solution.english),
            vi_solution = escape_multiline(&q.solution.vietnamese),
        );
    }

    html.push_str("  </body>\n</html>\n");
    html
}

/// Write the export document to `path` and return the final file path.
///
/// When `path` is an existing directory the file is created inside it as
/// [`EXPORT_FILE_NAME`]. The write is atomic: temp file, then rename.
pub async fn write_export(result: &TestResult, path: impl AsRef<Path>) -> Result<PathBuf, SolverError> {
    let requested = path.as_ref();
    let target = if tokio::fs::metadata(requested)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        requested.join(EXPORT_FILE_NAME)
    } else {
        requested.to_path_buf()
    };

    let write_err = |source: std::io::Error| SolverError::ExportWriteFailed {
        path: target.clone(),
        source,
    };

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let html = export_html(result);
    let tmp_path = target.with_extension("doc.tmp");
    tokio::fs::write(&tmp_path, html.as_bytes())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &target)
        .await
        .map_err(write_err)?;

    info!("Exported {} bytes → {}", html.len(), target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures::result;

    #[test]
    fn questions_exported_in_ascending_order() {
        let html = export_html(&result(&[3, 1, 2]));
        let p1 = html.find("<h2>Question 1</h2>").unwrap();
        let p2 = html.find("<h2>Question 2</h2>").unwrap();
        let p3 = html.find("<h2>Question 3</h2>").unwrap();
        assert!(p1 < p2 && p2 < p3);
    }

    #[test]
    fn solution_newlines_become_line_breaks() {
        let mut r = result(&[1]);
        r.questions[0].solution.english = "A\nB".into();
        r.questions[0].solution.vietnamese = "C\r\nD".into();
        let html = export_html(&r);
        assert!(html.contains("<div>A<br/>B</div>"));
        assert!(html.contains("<div>C<br/>D</div>"));
        assert!(!html.contains("A\nB"));
    }

    #[test]
    fn every_field_is_embedded() {
        let html = export_html(&result(&[1]));
        for needle in [
            "<title>SYNTAX TEST</title>",
            "<h1>SYNTAX TEST</h1>",
            "<strong>Time Allotted:</strong> 60 minutes",
            "<em>Prompt 1</em>",
            "<p>Content 1</p>",
            "<em>Yêu cầu 1</em>",
            "<p>Nội dung 1</p>",
            "<div>Solution 1</div>",
            "<div>Lời giải 1</div>",
        ] {
            assert!(html.contains(needle), "missing {needle}");
        }
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn markup_in_model_text_is_escaped() {
        let mut r = result(&[1]);
        r.questions[0].english.content = "<script>alert('x')</script> & co".into();
        let html = export_html(&r);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; co"));
    }

    #[test]
    fn export_is_deterministic() {
        let r = result(&[2, 1]);
        assert_eq!(export_html(&r), export_html(&r));
    }

    #[tokio::test]
    async fn write_export_into_directory_uses_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_export(&result(&[1]), dir.path()).await.unwrap();
        assert_eq!(written, dir.path().join(EXPORT_FILE_NAME));
        let body = std::fs::read_to_string(&written).unwrap();
        assert!(body.contains("<h2>Question 1</h2>"));
        assert!(!dir.path().join("test-review.doc.tmp").exists());
    }

    #[tokio::test]
    async fn write_export_to_explicit_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out/nested/review.doc");
        let written = write_export(&result(&[1]), &target).await.unwrap();
        assert_eq!(written, target);
        assert!(target.exists());
    }
}
