//! Configuration loading for the Weft service
//!
//! Configuration is read from a TOML file; a missing file yields
//! defaults. API keys may also arrive per-request or via environment
//! variables; resolution priority is handled by the service layer,
//! this module only supplies the file tier.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default HTTP port for the generation service
pub const DEFAULT_PORT: u16 = 5740;

/// Default model requested when the client names none
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Per-call validation limit overrides
///
/// Every field is optional; unset fields fall back to the documented
/// defaults (8 voices, 250 lines, 15 randomness ops, 8 effects/voice,
/// tempo required, remote samples rejected, feedback <= 0.7,
/// room <= 0.95). Field aliases accept the client-side camelCase
/// spellings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOverrides {
    /// Maximum number of voice declarations
    #[serde(alias = "maxVoices")]
    pub max_voices: Option<usize>,
    /// Maximum number of meaningful (non-blank, non-comment) lines
    #[serde(alias = "maxLines")]
    pub max_lines: Option<usize>,
    /// Maximum total randomness operations
    #[serde(alias = "maxRandomUsage")]
    pub max_random_usage: Option<usize>,
    /// Maximum effect calls on any single voice line
    #[serde(alias = "maxEffectsPerVoice")]
    pub max_effects_per_voice: Option<usize>,
    /// Whether a setcpm tempo call is required
    #[serde(alias = "requireSetcpm")]
    pub require_setcpm: Option<bool>,
    /// Whether remote/localhost sample URLs are rejected
    #[serde(alias = "rejectLocalhost")]
    pub reject_localhost: Option<bool>,
    /// Ceiling for .delayfeedback() amounts
    #[serde(alias = "maxDelayFeedback")]
    pub max_delay_feedback: Option<f64>,
    /// Ceiling for .room() sizes
    #[serde(alias = "maxRoomSize")]
    pub max_room_size: Option<f64>,
}

/// TOML configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP listen port (default 5740)
    pub port: Option<u16>,
    /// Model requested when the client names none
    pub default_model: Option<String>,
    /// Anthropic API key (lowest-priority tier)
    pub anthropic_api_key: Option<String>,
    /// OpenAI API key (lowest-priority tier)
    pub openai_api_key: Option<String>,
    /// Path to a local pattern-language reference document embedded
    /// into prompts when readable
    pub reference_docs: Option<String>,
    /// Validation limit overrides applied to every request
    pub validation: ValidationOverrides,
}

impl TomlConfig {
    /// Effective listen port
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Effective default model name
    pub fn default_model(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Load configuration from a TOML file
///
/// A missing file is not an error: the service runs on defaults and
/// environment-supplied keys. A present-but-malformed file is an
/// error; silently ignoring a typo'd config is worse than refusing
/// to start.
pub fn load_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        info!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config failed: {}", e)))?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/weft.toml")).unwrap();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.default_model(), DEFAULT_MODEL);
        assert_eq!(config.validation, ValidationOverrides::default());
    }

    #[test]
    fn parses_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 6000
default_model = "gpt-4o"
anthropic_api_key = "sk-test"

[validation]
max_voices = 4
require_setcpm = false
max_room_size = 0.8
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.port(), 6000);
        assert_eq!(config.default_model(), "gpt-4o");
        assert_eq!(config.anthropic_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.validation.max_voices, Some(4));
        assert_eq!(config.validation.require_setcpm, Some(false));
        assert_eq!(config.validation.max_room_size, Some(0.8));
        assert_eq!(config.validation.max_lines, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn camel_case_aliases_accepted() {
        let overrides: ValidationOverrides =
            serde_json::from_str(r#"{"maxVoices": 3, "rejectLocalhost": false}"#).unwrap();
        assert_eq!(overrides.max_voices, Some(3));
        assert_eq!(overrides.reject_localhost, Some(false));
    }
}
