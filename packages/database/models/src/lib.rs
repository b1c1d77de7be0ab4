#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Store query parameter definitions.
//!
//! Each struct describes one filtered read against the groundwater store.
//! An empty id list means "no id filter". Orderings are part of the
//! contract: every store implementation must return rows in the order the
//! `order` field (or the per-query documentation) names, with the primary
//! key as the final tiebreak.

use ingres_groundwater_models::{ParameterType, RegionType, StageOfExtraction};
use serde::{Deserialize, Serialize};

/// Row ordering for region reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionOrder {
    /// Ascending primary key.
    #[default]
    Id,
    /// Ascending name, then ascending primary key.
    Name,
}

/// Parameters for reading regions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionQuery {
    /// Restrict to these region IDs.
    pub ids: Vec<i64>,
    /// Restrict to one administrative level.
    pub region_type: Option<RegionType>,
    /// Case-insensitive substring that the region name must contain.
    pub name_contains: Option<String>,
    /// Row ordering.
    pub order: RegionOrder,
    /// Maximum number of rows.
    pub limit: Option<u32>,
}

/// Row ordering for assessment reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentOrder {
    /// Descending assessment year, then ascending primary key.
    #[default]
    YearDesc,
    /// Descending extraction ratio, then ascending primary key.
    ExtractionRatioDesc,
}

/// Parameters for reading assessments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentQuery {
    /// Restrict to these region IDs.
    pub region_ids: Vec<i64>,
    /// Exact assessment year.
    pub year: Option<i32>,
    /// Inclusive lower year bound.
    pub start_year: Option<i32>,
    /// Inclusive upper year bound.
    pub end_year: Option<i32>,
    /// Restrict to these stages.
    pub stages: Vec<StageOfExtraction>,
    /// Row ordering.
    pub order: AssessmentOrder,
    /// Maximum number of rows.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

impl AssessmentQuery {
    /// All assessments for a single region, newest first.
    #[must_use]
    pub fn for_region(region_id: i64) -> Self {
        Self {
            region_ids: vec![region_id],
            ..Self::default()
        }
    }
}

/// Parameters for reading each region's latest-year assessment rows.
///
/// The store returns every assessment whose year equals the maximum
/// assessment year of its own region, ordered by region ID then primary
/// key. Duplicate rows at that year are all returned; picking one is the
/// caller's decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestAssessmentQuery {
    /// Restrict to these region IDs.
    pub region_ids: Vec<i64>,
    /// Restrict to regions of one administrative level.
    pub region_type: Option<RegionType>,
    /// Restrict to the given state region and its direct children.
    pub within_state: Option<i64>,
}

/// Parameters for reading historical points.
///
/// Rows are ordered by descending year, then descending month with annual
/// (month-less) rows after monthly ones, then ascending primary key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalQuery {
    /// Restrict to these region IDs.
    pub region_ids: Vec<i64>,
    /// Inclusive lower year bound.
    pub start_year: Option<i32>,
    /// Inclusive upper year bound.
    pub end_year: Option<i32>,
    /// Restrict to one measured parameter.
    pub parameter_type: Option<ParameterType>,
    /// Maximum number of rows.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}
