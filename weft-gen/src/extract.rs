//! Artifact extraction from raw model output
//!
//! Model responses mix prose with code. Extraction pulls exactly one
//! pattern-language artifact out of the raw text: normally a fenced
//! code block, with a heuristic fallback for models that answer in
//! bare code. Ambiguity (multiple blocks) is a hard failure; guessing
//! which block was intended risks hot-swapping the wrong pattern into
//! a live audio session.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::validators;

/// Fence tags recognized as pattern code (empty tag included)
const RECOGNIZED_TAGS: &[&str] = &["", "js", "javascript", "strudel"];

// Heuristic signals for unfenced code. At least two must match before
// bare text is treated as an artifact.
static HEURISTICS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bsetcpm\s*\(").unwrap(),
        Regex::new(r"\$:").unwrap(),
        Regex::new(r"\b(?:note|n)\s*\(").unwrap(),
        Regex::new(r"\b(?:s|sound|samples)\s*\(").unwrap(),
        Regex::new(r"\.gain\s*\(").unwrap(),
    ]
});

/// Result of one extraction call
///
/// Exactly one of `code` / `error` is set on terminating paths. The
/// raw model response rides along on failures for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    /// Whether an artifact was extracted
    pub success: bool,
    /// The artifact text, on success
    pub code: Option<String>,
    /// Failure description, on failure
    pub error: Option<String>,
    /// Raw model response, attached on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl ParseResult {
    fn ok(code: String) -> Self {
        Self {
            success: true,
            code: Some(code),
            error: None,
            raw_response: None,
        }
    }

    fn fail(error: impl Into<String>, raw: &str) -> Self {
        Self {
            success: false,
            code: None,
            error: Some(error.into()),
            raw_response: Some(raw.to_string()),
        }
    }
}

/// Extract exactly one code artifact from raw model text
///
/// - zero recognized fenced blocks: heuristic fallback over the whole
///   text, else "no code block found"
/// - one block: its trimmed inner text ("code block is empty" if blank)
/// - multiple blocks: failure naming the exact count
///
/// Prose outside the chosen block is ignored. Every success path also
/// runs the structural subset of the validator (voice presence, line
/// floor, tempo call, syntax balance); a failure there surfaces as a
/// parse failure, not a validation failure.
pub fn extract_code(raw: &str) -> ParseResult {
    let blocks = fenced_blocks(raw);

    match blocks.len() {
        0 => {
            let matched = HEURISTICS.iter().filter(|re| re.is_match(raw)).count();
            if matched >= 2 {
                finish(raw.trim().to_string(), raw)
            } else {
                ParseResult::fail("no code block found", raw)
            }
        }
        1 => {
            let code = blocks[0].trim().to_string();
            if code.is_empty() {
                ParseResult::fail("code block is empty", raw)
            } else {
                finish(code, raw)
            }
        }
        n => ParseResult::fail(
            format!("found {} code blocks; expected exactly one", n),
            raw,
        ),
    }
}

/// Structural gate applied to every successful extraction
fn finish(code: String, raw: &str) -> ParseResult {
    let structural = validators::structural_check(&code);
    if structural.valid {
        ParseResult::ok(code)
    } else {
        ParseResult::fail(
            format!("malformed code block: {}", structural.issues.join("; ")),
            raw,
        )
    }
}

/// Fence-scanner state
enum FenceState<'a> {
    Outside,
    /// Inside a recognized block, accumulating its lines
    Recognized(Vec<&'a str>),
    /// Inside a block with a foreign language tag; skipped entirely
    Foreign,
}

/// Collect the inner text of every recognized fenced block
fn fenced_blocks(raw: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut state = FenceState::Outside;

    for line in raw.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("```") {
            state = match std::mem::replace(&mut state, FenceState::Outside) {
                FenceState::Outside => {
                    let tag = rest.trim().to_ascii_lowercase();
                    if RECOGNIZED_TAGS.contains(&tag.as_str()) {
                        FenceState::Recognized(Vec::new())
                    } else {
                        FenceState::Foreign
                    }
                }
                FenceState::Recognized(lines) => {
                    blocks.push(lines.join("\n"));
                    FenceState::Outside
                }
                FenceState::Foreign => FenceState::Outside,
            };
            continue;
        }
        if let FenceState::Recognized(lines) = &mut state {
            lines.push(line);
        }
    }

    blocks
}

/// Normalize accepted code into canonical form
///
/// Un-escapes literal escaped quotes (both styles) and resolves the
/// textual `\n`, `\t`, `\r` sequences. Idempotent; applied only to
/// text that has already passed validation.
pub fn normalize_code(code: &str) -> String {
    code.replace("\\\"", "\"")
        .replace("\\'", "'")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
}
