//! Parsing of loosely-typed request parameters.
//!
//! Query strings arrive as text. These helpers turn them into typed values
//! or the matching [`AnalyticsError`], so each operation validates its
//! inputs the same way regardless of transport. An empty or
//! whitespace-only value is treated as absent.

use chrono::Datelike as _;
use ingres_analytics_models::{ComparisonParameter, ExportDataType, ExportFormat};
use ingres_groundwater_models::{ParameterType, RegionType, StageOfExtraction};

use crate::AnalyticsError;

/// Earliest year any year parameter may name.
pub const MIN_YEAR: i32 = 1900;

/// Default and maximum page size of one kind of listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    /// Page size when no limit is given.
    pub default_limit: u32,
    /// Larger limits are clamped to this.
    pub max_limit: u32,
}

/// Raw historical readings.
pub const HISTORICAL_PAGE: PageBounds = PageBounds {
    default_limit: 100,
    max_limit: 1000,
};

/// Critical-unit listings.
pub const CRITICAL_PAGE: PageBounds = PageBounds {
    default_limit: 50,
    max_limit: 200,
};

/// General assessment listings.
pub const LISTING_PAGE: PageBounds = PageBounds {
    default_limit: 10,
    max_limit: 100,
};

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of rows.
    pub limit: u32,
    /// Number of rows to skip.
    pub offset: u32,
}

impl Page {
    /// Applies this window to an already ordered row set.
    #[must_use]
    pub fn apply<T>(self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The current calendar year (UTC).
#[must_use]
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Parses `limit`/`offset` against `bounds`.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidLimit`] if the limit is not a positive integer
/// * [`AnalyticsError::InvalidOffset`] if the offset is not a non-negative
///   integer
pub fn parse_page(
    limit: Option<&str>,
    offset: Option<&str>,
    bounds: PageBounds,
) -> Result<Page, AnalyticsError> {
    let limit = match present(limit) {
        None => bounds.default_limit,
        Some(raw) => {
            let value: i64 = raw.parse().map_err(|_| AnalyticsError::InvalidLimit {
                value: raw.to_string(),
            })?;
            if value <= 0 {
                return Err(AnalyticsError::InvalidLimit {
                    value: raw.to_string(),
                });
            }
            u32::try_from(value)
                .unwrap_or(u32::MAX)
                .min(bounds.max_limit)
        }
    };

    let offset = match present(offset) {
        None => 0,
        Some(raw) => raw.parse::<u32>().map_err(|_| AnalyticsError::InvalidOffset {
            value: raw.to_string(),
        })?,
    };

    Ok(Page { limit, offset })
}

/// Parses an optional year within `min..=max`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidYear`] naming `field` if the value is
/// not an integer in range.
pub fn parse_year(
    field: &'static str,
    value: Option<&str>,
    min: i32,
    max: i32,
) -> Result<Option<i32>, AnalyticsError> {
    let Some(raw) = present(value) else {
        return Ok(None);
    };
    match raw.parse::<i32>() {
        Ok(year) if (min..=max).contains(&year) => Ok(Some(year)),
        _ => Err(AnalyticsError::InvalidYear {
            field,
            value: raw.to_string(),
            min,
            max,
        }),
    }
}

/// Parses an optional `start_year`/`end_year` pair within `min..=max`.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidYear`] if either bound is malformed
/// * [`AnalyticsError::InvalidRange`] if the start is after the end
pub fn parse_year_range(
    start: Option<&str>,
    end: Option<&str>,
    min: i32,
    max: i32,
) -> Result<(Option<i32>, Option<i32>), AnalyticsError> {
    let start = parse_year("start_year", start, min, max)?;
    let end = parse_year("end_year", end, min, max)?;
    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        return Err(AnalyticsError::InvalidRange { start, end });
    }
    Ok((start, end))
}

/// Parses a single integer region identifier.
///
/// # Errors
///
/// Returns [`AnalyticsError::MalformedIdentifier`] if `token` is not an
/// integer.
pub fn parse_region_id(token: &str) -> Result<i64, AnalyticsError> {
    let token = token.trim();
    token
        .parse()
        .map_err(|_| AnalyticsError::MalformedIdentifier {
            token: token.to_string(),
        })
}

/// Parses a required region identifier parameter.
///
/// # Errors
///
/// * [`AnalyticsError::MissingParameter`] if absent
/// * [`AnalyticsError::MalformedIdentifier`] if not an integer
pub fn require_region_id(name: &'static str, value: Option<&str>) -> Result<i64, AnalyticsError> {
    present(value)
        .ok_or(AnalyticsError::MissingParameter { name })
        .and_then(parse_region_id)
}

/// Parses an optional region identifier parameter.
///
/// # Errors
///
/// Returns [`AnalyticsError::MalformedIdentifier`] if present but not an
/// integer.
pub fn optional_region_id(value: Option<&str>) -> Result<Option<i64>, AnalyticsError> {
    present(value).map(parse_region_id).transpose()
}

/// Parses a comma-separated identifier list. Every token is trimmed and
/// must be an integer; the first bad token is reported. Empty tokens are
/// skipped.
///
/// # Errors
///
/// Returns [`AnalyticsError::MalformedIdentifier`] naming the first token
/// that is not an integer.
pub fn parse_id_list(value: &str) -> Result<Vec<i64>, AnalyticsError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(parse_region_id)
        .collect()
}

/// Parses a comma-separated stage list, keeping only stages in `allowed`.
/// Matching is case-insensitive on the display form (`Over-Exploited`).
///
/// # Errors
///
/// * [`AnalyticsError::InvalidStage`] for an unknown or disallowed stage
/// * [`AnalyticsError::NoValidStages`] if the list is empty
pub fn parse_stage_list(
    value: &str,
    allowed: &[StageOfExtraction],
) -> Result<Vec<StageOfExtraction>, AnalyticsError> {
    let mut stages = Vec::new();
    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let stage = allowed
            .iter()
            .copied()
            .find(|s| s.as_ref().eq_ignore_ascii_case(token))
            .ok_or_else(|| AnalyticsError::InvalidStage {
                value: token.to_string(),
                allowed: allowed
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<&str>>()
                    .join(", "),
            })?;
        if !stages.contains(&stage) {
            stages.push(stage);
        }
    }
    if stages.is_empty() {
        return Err(AnalyticsError::NoValidStages);
    }
    Ok(stages)
}

/// Parses an optional historical parameter type.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameterType`] for an unknown value.
pub fn parse_parameter_type(value: Option<&str>) -> Result<Option<ParameterType>, AnalyticsError> {
    present(value)
        .map(|raw| {
            ParameterType::all()
                .iter()
                .copied()
                .find(|p| p.as_ref().eq_ignore_ascii_case(raw))
                .ok_or_else(|| AnalyticsError::InvalidParameterType {
                    value: raw.to_string(),
                })
        })
        .transpose()
}

/// Parses an optional region type.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidRegionType`] for an unknown value.
pub fn parse_region_type(value: Option<&str>) -> Result<Option<RegionType>, AnalyticsError> {
    present(value)
        .map(|raw| {
            RegionType::all()
                .iter()
                .copied()
                .find(|t| t.as_ref().eq_ignore_ascii_case(raw))
                .ok_or_else(|| AnalyticsError::InvalidRegionType {
                    value: raw.to_string(),
                })
        })
        .transpose()
}

/// Parses the comparison parameter subset. Absent means all four.
/// Duplicates collapse to their first occurrence.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameters`] listing every unknown name.
pub fn parse_comparison_parameters(
    value: Option<&str>,
) -> Result<Vec<ComparisonParameter>, AnalyticsError> {
    let Some(raw) = present(value) else {
        return Ok(ComparisonParameter::all().to_vec());
    };

    let mut parameters = Vec::new();
    let mut invalid = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.to_lowercase().parse::<ComparisonParameter>() {
            Ok(p) if !parameters.contains(&p) => parameters.push(p),
            Ok(_) => {}
            Err(_) => invalid.push(token.to_string()),
        }
    }

    if !invalid.is_empty() {
        return Err(AnalyticsError::InvalidParameters { names: invalid });
    }
    if parameters.is_empty() {
        return Ok(ComparisonParameter::all().to_vec());
    }
    Ok(parameters)
}

/// Parses an export format, restricted to `allowed`. Absent means `default`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidFormat`] for an unknown or disallowed
/// format.
pub fn parse_export_format(
    value: Option<&str>,
    allowed: &[ExportFormat],
    default: ExportFormat,
) -> Result<ExportFormat, AnalyticsError> {
    let Some(raw) = present(value) else {
        return Ok(default);
    };
    raw.to_lowercase()
        .parse::<ExportFormat>()
        .ok()
        .filter(|f| allowed.contains(f))
        .ok_or_else(|| AnalyticsError::InvalidFormat {
            value: raw.to_string(),
            allowed: if allowed.contains(&ExportFormat::Excel) {
                "csv, json, excel"
            } else {
                "json, csv"
            },
        })
}

/// Parses an export data type, restricted to `allowed`. Absent means
/// `default`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidDataType`] for an unknown or disallowed
/// data type.
pub fn parse_export_data_type(
    value: Option<&str>,
    allowed: &[ExportDataType],
    default: ExportDataType,
) -> Result<ExportDataType, AnalyticsError> {
    let Some(raw) = present(value) else {
        return Ok(default);
    };
    raw.to_lowercase()
        .parse::<ExportDataType>()
        .ok()
        .filter(|t| allowed.contains(t))
        .ok_or_else(|| AnalyticsError::InvalidDataType {
            value: raw.to_string(),
            allowed: if allowed.contains(&ExportDataType::Critical) {
                "assessments, historical, regions, critical"
            } else {
                "assessments, regions"
            },
        })
}
