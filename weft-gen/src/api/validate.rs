//! Direct validation endpoint
//!
//! Lets the client re-check code it has edited by hand against the
//! same rules the generation path enforces.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use weft_common::config::ValidationOverrides;

use crate::error::{ApiError, ApiResult};
use crate::validators::{self, ValidationPolicy, ValidationResult};
use crate::AppState;

/// POST /api/validate request
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// Pattern code to check
    pub code: String,
    /// Per-call limit overrides, merged over the server's policy
    #[serde(default)]
    pub options: ValidationOverrides,
}

/// POST /api/validate
///
/// Runs the full rule set and returns every issue found.
pub async fn validate_code(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> ApiResult<Json<ValidationResult>> {
    if request.code.trim().is_empty() {
        return Err(ApiError::BadRequest("code must not be empty".to_string()));
    }

    // Server config overrides apply first, then the request's.
    let policy = ValidationPolicy::default()
        .with_overrides(&state.config.validation)
        .with_overrides(&request.options);
    let result = validators::validate(&request.code, &policy);

    tracing::debug!(
        valid = result.valid,
        issue_count = result.issues.len(),
        "Direct validation complete"
    );
    Ok(Json(result))
}

/// Build validation routes
pub fn validate_routes() -> Router<AppState> {
    Router::new().route("/api/validate", post(validate_code))
}
