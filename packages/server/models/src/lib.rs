#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the INGRES groundwater server.
//!
//! Query parameters are kept as raw strings so that every value goes
//! through the same validation (and the same error codes) in
//! `ingres_analytics::params`, instead of failing early in the extractor.

use ingres_ai::insight::Insight;
use ingres_analytics_models::{QueryContext, QueryResult};
use serde::{Deserialize, Serialize};

/// Query parameters for `GET /api/groundwater/current-assessment`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentAssessmentParams {
    /// Restrict to one region.
    pub region_id: Option<String>,
    /// Restrict to one administrative level.
    pub region_type: Option<String>,
    /// Page size.
    pub limit: Option<String>,
    /// Page offset.
    pub offset: Option<String>,
}

/// Query parameters for `GET /api/groundwater/historical-data`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoricalDataParams {
    /// Region to read (required).
    pub region_id: Option<String>,
    /// Inclusive lower year bound.
    pub start_year: Option<String>,
    /// Inclusive upper year bound.
    pub end_year: Option<String>,
    /// Reading kind.
    pub parameter_type: Option<String>,
    /// Page size.
    pub limit: Option<String>,
    /// Page offset.
    pub offset: Option<String>,
}

/// Query parameters for `GET /api/groundwater/compare-regions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompareRegionsParams {
    /// Comma-separated region ids (required).
    pub region_ids: Option<String>,
    /// Comparison year; defaults to the newest year across the regions.
    pub year: Option<String>,
    /// Comma-separated parameter groups.
    pub parameters: Option<String>,
}

/// Query parameters for `GET /api/groundwater/critical-units`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CriticalUnitsParams {
    /// Comma-separated stages.
    pub stage: Option<String>,
    /// Restrict to districts of this state.
    pub state_id: Option<String>,
    /// Page size.
    pub limit: Option<String>,
    /// Page offset.
    pub offset: Option<String>,
}

/// Query parameters for `GET /api/groundwater/export`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportParams {
    /// `csv`, `json`, or `excel` (required).
    pub format: Option<String>,
    /// `assessments`, `historical`, `regions`, or `critical` (required).
    pub data_type: Option<String>,
    /// Comma-separated region ids.
    pub region_ids: Option<String>,
    /// Inclusive lower year bound.
    pub start_year: Option<String>,
    /// Inclusive upper year bound.
    pub end_year: Option<String>,
    /// Comma-separated stages.
    pub stage: Option<String>,
}

/// Query parameters for `GET /api/groundwater/simple-export`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimpleExportParams {
    /// `json` or `csv` (required).
    pub format: Option<String>,
    /// `assessments` or `regions` (required).
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    /// Restrict to one region.
    pub region_id: Option<String>,
}

/// Body of `POST /api/groundwater/chat-query` and `POST /api/groundwater/ask`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatQueryBody {
    /// Free-text question.
    pub query: Option<String>,
    /// Explicit region hints.
    pub context: Option<QueryContext>,
}

/// Body of `POST /api/ai/chat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiChatBody {
    /// Free-text question.
    pub query: Option<String>,
    /// Extra context appended to the prompt.
    pub context: Option<String>,
}

/// Response of `POST /api/ai/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiChatResponse {
    /// Generated text.
    pub text: String,
}

/// Response of `POST /api/groundwater/ask`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    /// Orchestrated answer over stored data.
    pub result: QueryResult,
    /// Explanation, stats, and chart for display.
    pub insight: Insight,
    /// Why generation fell back to placeholder content, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<String>,
}

/// Error body returned with every non-2xx JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable code.
    pub code: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
