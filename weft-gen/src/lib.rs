//! weft-gen library interface
//!
//! Exposes the generation service's public APIs for integration
//! testing: router construction, the validation pipeline, extraction,
//! prompts, providers, and the generation workflow.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod providers;
pub mod validators;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use weft_common::config::TomlConfig;

use crate::prompt::PromptBuilder;
use crate::providers::{HttpProviderFactory, ProviderFactory};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Service configuration (immutable after startup)
    pub config: Arc<TomlConfig>,
    /// Prompt builder with reference docs loaded at startup
    pub prompts: Arc<PromptBuilder>,
    /// Provider factory; swapped for a scripted one in tests
    pub provider_factory: Arc<dyn ProviderFactory>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State backed by real HTTP providers
    pub fn new(config: TomlConfig) -> Self {
        let prompts = PromptBuilder::new(
            config.reference_docs.as_deref().map(std::path::Path::new),
        );
        Self {
            config: Arc::new(config),
            prompts: Arc::new(prompts),
            provider_factory: Arc::new(HttpProviderFactory),
            startup_time: Utc::now(),
        }
    }

    /// State with an injected provider factory (tests)
    pub fn with_provider_factory(
        config: TomlConfig,
        provider_factory: Arc<dyn ProviderFactory>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            prompts: Arc::new(PromptBuilder::bare()),
            provider_factory,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::generate_routes())
        .merge(api::validate_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
