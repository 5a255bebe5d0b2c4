//! Saved-composition file format
//!
//! Compositions are persisted by the client as plain text files:
//! a title line, a creation-timestamp line, an optional prompt line,
//! and one fenced code block holding the pattern text. This module
//! exists for compatibility with that format; the service itself
//! never writes composition files.
//!
//! ```text
//! # Acid groove
//! Created: 2026-08-29T12:00:00Z
//! Prompt: a squelchy acid bassline at 140 bpm
//!
//! [fenced javascript block with the pattern text]
//! ```

use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// A saved composition as stored on disk by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    /// Display title
    pub title: String,
    /// Creation timestamp
    pub created: DateTime<Utc>,
    /// Prompt that produced the code, when recorded
    pub prompt: Option<String>,
    /// Pattern-language code
    pub code: String,
}

impl Composition {
    /// Render to the on-disk text format
    pub fn to_file_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n", self.title));
        out.push_str(&format!("Created: {}\n", self.created.to_rfc3339()));
        if let Some(prompt) = &self.prompt {
            out.push_str(&format!("Prompt: {}\n", prompt));
        }
        out.push('\n');
        out.push_str("```javascript\n");
        out.push_str(&self.code);
        if !self.code.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n");
        out
    }

    /// Parse the on-disk text format
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();

        let title = lines
            .next()
            .and_then(|l| l.strip_prefix("# "))
            .ok_or_else(|| Error::InvalidInput("composition file missing title line".into()))?
            .trim()
            .to_string();

        let created_line = lines
            .next()
            .and_then(|l| l.strip_prefix("Created: "))
            .ok_or_else(|| Error::InvalidInput("composition file missing Created: line".into()))?;
        let created = DateTime::parse_from_rfc3339(created_line.trim())
            .map_err(|e| Error::InvalidInput(format!("bad Created timestamp: {}", e)))?
            .with_timezone(&Utc);

        // Prompt line is optional; read forward to the opening fence either way.
        let mut prompt = None;
        let mut code_lines = Vec::new();
        let mut in_block = false;
        let mut saw_block = false;
        for line in lines {
            if !in_block {
                if let Some(rest) = line.strip_prefix("Prompt: ") {
                    prompt = Some(rest.trim().to_string());
                } else if line.trim_start().starts_with("```") {
                    in_block = true;
                    saw_block = true;
                }
                continue;
            }
            if line.trim_start().starts_with("```") {
                in_block = false;
                continue;
            }
            code_lines.push(line);
        }

        if !saw_block {
            return Err(Error::InvalidInput(
                "composition file missing code block".into(),
            ));
        }

        Ok(Self {
            title,
            created,
            prompt,
            code: code_lines.join("\n"),
        })
    }
}
