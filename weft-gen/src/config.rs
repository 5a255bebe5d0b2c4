//! Credential resolution for weft-gen
//!
//! Multi-tier resolution with Request → ENV → TOML priority. The
//! request tier lets a client bring its own key; the environment and
//! TOML tiers configure the deployment. No key anywhere is a
//! configuration error rejected before any streaming begins.

use tracing::{info, warn};
use weft_common::config::TomlConfig;

use crate::providers::ModelFamily;
use crate::workflow::WorkflowError;

/// Resolve the API key for a model family
///
/// Priority: request-supplied → environment variable → TOML config.
pub fn resolve_api_key(
    family: ModelFamily,
    request_key: Option<&str>,
    config: &TomlConfig,
) -> Result<String, WorkflowError> {
    let env_var = family.api_key_env_var();
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = match family {
        ModelFamily::Claude => config.anthropic_api_key.clone(),
        ModelFamily::Gpt => config.openai_api_key.clone(),
    }
    .filter(|k| is_valid_key(k));
    let request_key = request_key.filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        request_key.map(|_| "request"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = request_key {
        info!("API key supplied with request");
        return Ok(key.to_string());
    }
    if let Some(key) = env_key {
        info!("API key loaded from environment variable {}", env_var);
        return Ok(key);
    }
    if let Some(key) = toml_key {
        info!("API key loaded from TOML config");
        return Ok(key);
    }

    Err(WorkflowError::Config(format!(
        "no API key configured. Supply one with the request, set {}, or add it to the config file",
        env_var
    )))
}

/// Validate an API key (non-empty, non-whitespace)
fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
