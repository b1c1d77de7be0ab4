//! Mapping of typed errors onto HTTP responses.

use actix_web::{HttpResponse, http::StatusCode};
use ingres_ai::AiError;
use ingres_analytics::{AnalyticsError, ErrorKind, orchestrator};
use ingres_server_models::ApiError;
use serde::Serialize;

/// Code reported for any text-generation failure.
pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";

fn json_error(status: StatusCode, error: String, code: String) -> HttpResponse {
    HttpResponse::build(status).json(ApiError { error, code })
}

/// Renders an [`AnalyticsError`] as `{error, code}` with its status.
/// Internal failures are logged and their details withheld from the body.
pub fn analytics_error(error: &AnalyticsError, action: &str) -> HttpResponse {
    let status = StatusCode::from_u16(orchestrator::http_status(error))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = if error.kind() == ErrorKind::Internal {
        log::error!("Failed to {action}: {error}");
        "Internal server error".to_string()
    } else {
        log::debug!("Rejected request to {action}: {error}");
        error.to_string()
    };

    json_error(status, message, error.code())
}

/// Renders a text-generation failure as 502.
pub fn upstream_error(error: &AiError) -> HttpResponse {
    log::warn!("Text generation failed: {error}");
    json_error(
        StatusCode::BAD_GATEWAY,
        format!("Text generation failed: {error}"),
        UPSTREAM_ERROR.to_string(),
    )
}

/// 200 with `value` as JSON, or the mapped error.
pub fn respond<T: Serialize>(result: Result<T, AnalyticsError>, action: &str) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => analytics_error(&e, action),
    }
}
