#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Groundwater query engine.
//!
//! Maps loosely-typed region references to canonical regions, selects the
//! right assessment rows under year/stage/parameter filters, aggregates
//! cross-region comparisons and critical-unit rollups, and renders record
//! sets for export. Every operation reads through
//! [`ingres_database::GroundwaterStore`] and returns typed results from
//! `ingres_analytics_models`.

pub mod comparison;
pub mod critical;
pub mod export;
pub mod orchestrator;
pub mod params;
pub mod resolver;
pub mod selector;

use ingres_database::DbError;
use thiserror::Error;

pub use export::ExportError;

/// Broad class of an [`AnalyticsError`], used to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed.
    Validation,
    /// A referenced entity or the requested data does not exist.
    NotFound,
    /// Storage or encoding failed.
    Internal,
}

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A required request parameter was absent.
    #[error("Missing required parameter: {name}")]
    MissingParameter {
        /// Parameter name as it appears on the wire.
        name: &'static str,
    },

    /// A region identifier token did not parse as an integer.
    #[error("Invalid region identifier '{token}': must be an integer")]
    MalformedIdentifier {
        /// The offending token, trimmed.
        token: String,
    },

    /// Page size was not a positive integer.
    #[error("Invalid limit '{value}': must be a positive integer")]
    InvalidLimit {
        /// Raw value.
        value: String,
    },

    /// Page offset was not a non-negative integer.
    #[error("Invalid offset '{value}': must be a non-negative integer")]
    InvalidOffset {
        /// Raw value.
        value: String,
    },

    /// A year parameter was not an integer within bounds.
    #[error("Invalid {field} '{value}': must be an integer between {min} and {max}")]
    InvalidYear {
        /// Parameter name.
        field: &'static str,
        /// Raw value.
        value: String,
        /// Inclusive lower bound.
        min: i32,
        /// Inclusive upper bound.
        max: i32,
    },

    /// Start year is after end year.
    #[error("Invalid year range: start year {start} is after end year {end}")]
    InvalidRange {
        /// Start year.
        start: i32,
        /// End year.
        end: i32,
    },

    /// Unknown historical parameter type.
    #[error(
        "Invalid parameter type '{value}'. Valid types: recharge, extraction, water_level, quality"
    )]
    InvalidParameterType {
        /// Raw value.
        value: String,
    },

    /// Unknown comparison parameter names.
    #[error(
        "Invalid comparison parameters: {}. Valid parameters: recharge, extraction, stage, trend",
        .names.join(", ")
    )]
    InvalidParameters {
        /// Every unrecognised name, in input order.
        names: Vec<String>,
    },

    /// Unknown or disallowed stage.
    #[error("Invalid stage '{value}'. Valid stages: {allowed}")]
    InvalidStage {
        /// Raw value.
        value: String,
        /// Comma-separated allowed stages.
        allowed: String,
    },

    /// The stage list was empty after parsing.
    #[error("No valid stages provided")]
    NoValidStages,

    /// Unknown region type.
    #[error("Invalid region type '{value}'. Valid types: state, district, block, mandal, taluk")]
    InvalidRegionType {
        /// Raw value.
        value: String,
    },

    /// Unknown export format.
    #[error("Invalid format '{value}'. Valid formats: {allowed}")]
    InvalidFormat {
        /// Raw value.
        value: String,
        /// Comma-separated allowed formats.
        allowed: &'static str,
    },

    /// Unknown export data type.
    #[error("Invalid data type '{value}'. Valid types: {allowed}")]
    InvalidDataType {
        /// Raw value.
        value: String,
        /// Comma-separated allowed data types.
        allowed: &'static str,
    },

    /// Empty or whitespace-only conversational query.
    #[error("Query cannot be empty")]
    InvalidQuery,

    /// No region could be picked out of the free-text query.
    #[error(
        "Could not identify a region in your query. Please specify a state, district, or region."
    )]
    RegionNotIdentified,

    /// A region reference did not match any stored region.
    #[error("Region '{reference}' not found")]
    RegionNotFound {
        /// The id or name that was looked up.
        reference: String,
    },

    /// The parent-state filter names a region that does not exist.
    #[error("State with id {id} not found")]
    StateNotFound {
        /// Requested state id.
        id: i64,
    },

    /// None of the requested regions has any assessment.
    #[error("No assessment data found for the requested regions")]
    NoDataFound,

    /// None of the requested regions has an assessment at the given year.
    #[error("No assessment data found for year {year}")]
    NoDataForYear {
        /// Requested year.
        year: i32,
    },

    /// Storage read failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Export encoding failed.
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl AnalyticsError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RegionNotFound { .. }
            | Self::StateNotFound { .. }
            | Self::NoDataFound
            | Self::NoDataForYear { .. } => ErrorKind::NotFound,
            Self::Database(_) | Self::Export(_) => ErrorKind::Internal,
            _ => ErrorKind::Validation,
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::MissingParameter { name } => format!("MISSING_{}", name.to_uppercase()),
            Self::MalformedIdentifier { .. } => "INVALID_REGION_ID_FORMAT".to_string(),
            Self::InvalidLimit { .. } => "INVALID_LIMIT".to_string(),
            Self::InvalidOffset { .. } => "INVALID_OFFSET".to_string(),
            Self::InvalidYear { field, .. } => format!("INVALID_{}", field.to_uppercase()),
            Self::InvalidRange { .. } => "INVALID_YEAR_RANGE".to_string(),
            Self::InvalidParameterType { .. } => "INVALID_PARAMETER_TYPE".to_string(),
            Self::InvalidParameters { .. } => "INVALID_PARAMETERS".to_string(),
            Self::InvalidStage { .. } => "INVALID_STAGE".to_string(),
            Self::NoValidStages => "NO_VALID_STAGES".to_string(),
            Self::InvalidRegionType { .. } => "INVALID_REGION_TYPE".to_string(),
            Self::InvalidFormat { .. } => "INVALID_FORMAT".to_string(),
            Self::InvalidDataType { .. } => "INVALID_DATA_TYPE".to_string(),
            Self::InvalidQuery => "INVALID_QUERY".to_string(),
            Self::RegionNotIdentified | Self::RegionNotFound { .. } => {
                "REGION_NOT_FOUND".to_string()
            }
            Self::StateNotFound { .. } => "STATE_NOT_FOUND".to_string(),
            Self::NoDataFound => "NO_DATA_FOUND".to_string(),
            Self::NoDataForYear { .. } => "NO_DATA_FOR_YEAR".to_string(),
            Self::Database(_) => "INTERNAL_ERROR".to_string(),
            Self::Export(_) => "EXPORT_ENCODING_ERROR".to_string(),
        }
    }
}
