#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Groundwater region, assessment, and historical reading types.
//!
//! These are the canonical record shapes shared by every other crate in the
//! workspace. Records are created and updated outside this system; everything
//! here is read-only from the service's point of view.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Administrative level of a [`Region`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RegionType {
    /// State or union territory.
    State,
    /// District within a state.
    District,
    /// Block within a district.
    Block,
    /// Mandal (used in Andhra Pradesh and Telangana).
    Mandal,
    /// Taluk (used in several southern states).
    Taluk,
}

impl RegionType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::State,
            Self::District,
            Self::Block,
            Self::Mandal,
            Self::Taluk,
        ]
    }
}

/// Categorical groundwater stress label of an assessment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum StageOfExtraction {
    /// Extraction comfortably below recharge.
    Safe,
    /// Extraction approaching the extractable resource.
    #[serde(rename = "Semi-Critical")]
    #[strum(serialize = "Semi-Critical")]
    SemiCritical,
    /// Extraction close to or at the extractable resource.
    Critical,
    /// Extraction exceeds the extractable resource.
    #[serde(rename = "Over-Exploited")]
    #[strum(serialize = "Over-Exploited")]
    OverExploited,
}

impl StageOfExtraction {
    /// Returns all variants of this enum, least stressed first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Safe,
            Self::SemiCritical,
            Self::Critical,
            Self::OverExploited,
        ]
    }

    /// Stages reported by default in critical-unit rollups and headline
    /// summaries.
    #[must_use]
    pub const fn headline() -> &'static [Self] {
        &[Self::Critical, Self::OverExploited]
    }

    /// Stages a caller may request in a critical-unit rollup.
    #[must_use]
    pub const fn reportable() -> &'static [Self] {
        &[Self::Critical, Self::OverExploited, Self::SemiCritical]
    }

    /// Whether this stage is anything other than [`Self::Safe`].
    #[must_use]
    pub const fn is_stressed(self) -> bool {
        !matches!(self, Self::Safe)
    }
}

/// Direction of change of groundwater levels over recent assessments.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Trend {
    /// Extraction or depletion is increasing.
    Increasing,
    /// No significant change.
    Stable,
    /// Extraction or depletion is declining.
    Declining,
}

/// Measured quantity of a [`HistoricalPoint`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParameterType {
    /// Groundwater recharge volume.
    Recharge,
    /// Groundwater extraction volume.
    Extraction,
    /// Depth to water level.
    WaterLevel,
    /// Water quality reading (typically annual).
    Quality,
}

impl ParameterType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Recharge,
            Self::Extraction,
            Self::WaterLevel,
            Self::Quality,
        ]
    }
}

/// An administrative region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Administrative level.
    #[serde(rename = "type")]
    pub region_type: RegionType,
    /// Parent region (a coarser administrative level), if any.
    pub parent_id: Option<i64>,
    /// Unique region code.
    pub code: String,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
}

/// A groundwater resource assessment for one region and year.
///
/// `extraction_ratio` is stored, not derived from the volumes, and may be
/// inconsistent with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    /// Primary key.
    pub id: i64,
    /// Region this assessment belongs to.
    pub region_id: i64,
    /// Assessment year.
    pub assessment_year: i32,
    /// Annual recharge in MCM.
    pub annual_recharge: f64,
    /// Extractable resources in MCM.
    pub extractable_resources: f64,
    /// Total extraction in MCM.
    pub total_extraction: f64,
    /// Stress stage.
    pub stage_of_extraction: StageOfExtraction,
    /// Extraction as a percentage of extractable resources.
    pub extraction_ratio: f64,
    /// Trend label.
    pub trend: Trend,
    /// Date the assessment was published.
    pub assessment_date: String,
    /// Publishing body (CGWB, state groundwater board, ...).
    pub data_source: String,
}

/// A single historical reading for a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPoint {
    /// Primary key.
    pub id: i64,
    /// Region this reading belongs to.
    pub region_id: i64,
    /// Year of the reading.
    pub year: i32,
    /// Month (1-12). `None` for annual figures.
    pub month: Option<u8>,
    /// What was measured.
    pub parameter_type: ParameterType,
    /// Measured value.
    pub value: f64,
    /// Unit of `value` (MCM, meters, mg/L, ...).
    pub unit: String,
}
