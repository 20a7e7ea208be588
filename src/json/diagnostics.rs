//! JSON error diagnostics with source-annotated messages

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// JSON syntax error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("JSON syntax error in {filename}: {message}")]
#[diagnostic(code(wkshop::json::syntax))]
pub struct JsonSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    filename: String,

    /// The underlying error message
    message: String,
}

impl JsonSyntaxError {
    /// Create a syntax error from a serde_json error
    pub fn from_serde_error(err: &serde_json::Error, source: &str, filename: &str) -> Self {
        // serde_json reports line 0 for errors without a position (e.g. type errors at EOF)
        let line = err.line().max(1);
        let column = err.column().max(1);

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = generate_help(err, &message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            filename: filename.to_string(),
            message,
        }
    }

    /// The underlying error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Convert serde_json's line/column (1-based, column counted in bytes) to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum::<usize>();

    if line_start >= source.len() {
        return source.len().saturating_sub(1);
    }

    let line_text = source[line_start..].lines().next().unwrap_or("");
    let mut offset = line_start + column.saturating_sub(1).min(line_text.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Generate helpful suggestions based on the error category and message
fn generate_help(err: &serde_json::Error, message: &str) -> Option<String> {
    use serde_json::error::Category;

    match err.classify() {
        Category::Eof => {
            return Some(
                "The file ends early. It may have been truncated while writing; \
                 restore a copy with `wkshop backup restore`."
                    .to_string(),
            )
        }
        Category::Data => {
            return Some(
                "The JSON is well-formed but a record does not have the expected shape."
                    .to_string(),
            )
        }
        _ => {}
    }

    let msg_lower = message.to_lowercase();

    if msg_lower.contains("trailing comma") {
        return Some("Remove the comma after the last entry of the object or list.".to_string());
    }

    if msg_lower.contains("key must be a string") {
        return Some("Object keys must be quoted: \"id_1\": { ... }".to_string());
    }

    if msg_lower.contains("expected `,` or `}`") || msg_lower.contains("expected `,` or `]`") {
        return Some("Add commas between entries: {\"a\": 1, \"b\": 2}".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_to_offset() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_col_to_offset(source, 1, 1), 0);
        assert_eq!(line_col_to_offset(source, 2, 1), 6);
        assert_eq!(line_col_to_offset(source, 3, 2), 13);
    }

    #[test]
    fn test_offset_is_clamped() {
        let source = "{}";
        assert_eq!(line_col_to_offset(source, 9, 9), 1);
    }

    #[test]
    fn test_byte_columns_after_multibyte_text() {
        let source = "{\n  \"name\": \"Półka dębowa\" x\n}";
        let err = serde_json::from_str::<serde_json::Value>(source).unwrap_err();
        let diag = JsonSyntaxError::from_serde_error(&err, source, "data.json");
        assert!(source[diag.span.offset()..].starts_with('x'));

        // A column inside a multi-byte character moves back to its start
        assert_eq!(line_col_to_offset("ół", 1, 2), 0);
    }

    #[test]
    fn test_syntax_error_from_serde() {
        let source = "{\n  \"Items\": {,}\n}";
        let err = serde_json::from_str::<serde_json::Value>(source).unwrap_err();
        let diag = JsonSyntaxError::from_serde_error(&err, source, "data.json");
        assert!(diag.to_string().contains("data.json"));
        assert!(!diag.message().is_empty());
    }

    #[test]
    fn test_help_for_truncated_file() {
        let source = "{\"Items\": {";
        let err = serde_json::from_str::<serde_json::Value>(source).unwrap_err();
        assert!(generate_help(&err, &err.to_string()).is_some());
    }
}
