//! Prompt construction for the model provider
//!
//! Pure string templating with three entry points: new composition,
//! edit of an existing composition, and the corrective retry issued
//! after a validation failure. Reference documentation is an optional
//! enrichment loaded from a local file; any lookup failure silently
//! omits the reference section; dataset unavailability must never
//! block generation.

use std::path::Path;
use tracing::debug;

/// Builds model-facing instruction text
///
/// Deterministic for a given builder state: the same inputs always
/// produce the same prompt text.
pub struct PromptBuilder {
    reference: Option<String>,
}

impl PromptBuilder {
    /// Create a builder, loading reference docs best-effort
    pub fn new(reference_path: Option<&Path>) -> Self {
        let reference = reference_path.and_then(|path| match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("Reference docs unavailable ({}): {}", path.display(), e);
                None
            }
        });
        Self { reference }
    }

    /// Builder with no reference material (tests, minimal deployments)
    pub fn bare() -> Self {
        Self { reference: None }
    }

    /// System prompt shared by all three request kinds
    pub fn system_prompt(&self) -> String {
        let mut prompt = String::from(
            "You are an expert in a live-coding pattern language for making music, \
             based on TidalCycles mini-notation.\n\n\
             Output contract; follow exactly:\n\
             - Reply with exactly ONE fenced ```javascript code block.\n\
             - The first line must be a setcpm() tempo call.\n\
             - Declare each concurrent voice with the `$:` marker.\n\
             - Chain transforms on pattern values, e.g. note(\"c3 e3\").s(\"piano\").slow(2).\n\
             - Never call methods on bare string literals.\n\
             - Do not load samples from URLs; use the built-in sample banks.\n",
        );

        if let Some(reference) = &self.reference {
            prompt.push_str("\nPattern language reference:\n");
            prompt.push_str(reference);
            prompt.push('\n');
        }

        prompt
    }

    /// Instruction text for a brand-new composition
    pub fn build_new(&self, user_request: &str) -> String {
        format!(
            "Create a complete new composition for this request:\n\n{}\n\n\
             Reply with one fenced code block containing the full pattern.",
            user_request
        )
    }

    /// Instruction text for editing an existing composition
    pub fn build_edit(&self, current_code: &str, user_request: &str) -> String {
        format!(
            "The user is working on this composition:\n\n```javascript\n{}\n```\n\n\
             Apply this change:\n\n{}\n\n\
             Reply with one fenced code block containing the complete updated pattern, \
             not a fragment.",
            current_code, user_request
        )
    }

    /// Corrective retry after a validation failure
    ///
    /// Enumerates every issue from the failed attempt so the model
    /// receives concrete, actionable feedback, then restates the two
    /// most commonly violated constraints.
    pub fn build_retry(&self, user_request: &str, issues: &[String]) -> String {
        let mut prompt = format!(
            "Your previous pattern for the request below failed validation.\n\n\
             Request:\n{}\n\n\
             Problems found:\n",
            user_request
        );
        for issue in issues {
            prompt.push_str(&format!("- {}\n", issue));
        }
        prompt.push_str(
            "\nFix every problem and reply with one corrected fenced code block.\n\
             Remember: never call methods on string literals (use note(\"c3\").fast(2), \
             not \"c3\".fast(2)), and .cutoff() does not exist; use .lpf().\n",
        );
        prompt
    }
}
