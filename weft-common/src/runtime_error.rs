//! Pattern-runtime error formatting
//!
//! The audio-pattern runtime reports mini-notation parse failures as
//! multi-clause messages like
//! `Error: mini: syntax error at line 3 col 7: expected note name, got ">"`.
//! Those are actionable for the user, so they are reformatted into a
//! stable `parse error at line {n}: {detail}` shape before display.
//! Every other runtime message passes through unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

static SYNTAX_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)syntax error\s+at line (\d+)(?:\s+col\s+\d+)?:\s*(.+)").unwrap()
});

/// Reformat a runtime error message for display
///
/// Returns `parse error at line {n}: {detail}` for mini-notation
/// syntax errors and the input unchanged for everything else.
pub fn format_runtime_error(raw: &str) -> String {
    if let Some(caps) = SYNTAX_ERROR.captures(raw) {
        let line = &caps[1];
        let detail = caps[2].trim();
        return format!("parse error at line {}: {}", line, detail);
    }
    raw.to_string()
}

/// Whether a runtime message indicates a parse failure in the
/// generated code (actionable; the client keeps these visible until
/// the user dismisses them, unlike transient transport errors)
pub fn is_parse_failure(raw: &str) -> bool {
    SYNTAX_ERROR.is_match(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reformats_syntax_errors() {
        let raw = "Error: mini: syntax error at line 3 col 7: expected note name, got \">\"";
        assert_eq!(
            format_runtime_error(raw),
            "parse error at line 3: expected note name, got \">\""
        );
    }

    #[test]
    fn reformats_without_column() {
        let raw = "syntax error at line 12: unterminated angle group";
        assert_eq!(
            format_runtime_error(raw),
            "parse error at line 12: unterminated angle group"
        );
    }

    #[test]
    fn passes_other_messages_through() {
        let raw = "ReferenceError: blorp is not defined";
        assert_eq!(format_runtime_error(raw), raw);
        assert!(!is_parse_failure(raw));
    }

    #[test]
    fn detects_parse_failures() {
        assert!(is_parse_failure(
            "Error: mini: syntax error at line 1 col 2: unexpected token"
        ));
    }
}
