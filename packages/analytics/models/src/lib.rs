#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for the groundwater query engine.
//!
//! Every public operation of `ingres_analytics` returns one of these types.
//! They serialize to the camelCase JSON shapes served by the HTTP API.

use ingres_groundwater_models::{
    Assessment, HistoricalPoint, ParameterType, Region, RegionType, StageOfExtraction, Trend,
};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A row of tabular output, keyed in column order.
pub type ExportRow = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Region resolution
// ---------------------------------------------------------------------------

/// Regions resolved from an explicit ID list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSet {
    /// Regions found, in input order.
    pub regions: Vec<Region>,
    /// Requested IDs with no matching region, in input order.
    pub missing: Vec<i64>,
}

/// Caller-supplied hints for free-text resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Preferred location name. Checked first.
    pub location: Option<String>,
    /// Preferred region name.
    pub region: Option<String>,
}

// ---------------------------------------------------------------------------
// Assessment selection
// ---------------------------------------------------------------------------

/// Minimal region reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRef {
    /// Region ID.
    pub id: i64,
    /// Region name.
    pub name: String,
}

/// Region identity used in comparison rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSummary {
    /// Region ID.
    pub id: i64,
    /// Region name.
    pub name: String,
    /// Administrative level.
    #[serde(rename = "type")]
    pub region_type: RegionType,
    /// Region code.
    pub code: String,
}

impl From<&Region> for RegionSummary {
    fn from(region: &Region) -> Self {
        Self {
            id: region.id,
            name: region.name.clone(),
            region_type: region.region_type,
            code: region.code.clone(),
        }
    }
}

/// Region identity with coordinates, used in assessment listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDetail {
    /// Region ID.
    pub id: i64,
    /// Region name.
    pub name: String,
    /// Administrative level.
    #[serde(rename = "type")]
    pub region_type: RegionType,
    /// Region code.
    pub code: String,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
}

impl From<&Region> for RegionDetail {
    fn from(region: &Region) -> Self {
        Self {
            id: region.id,
            name: region.name.clone(),
            region_type: region.region_type,
            code: region.code.clone(),
            latitude: region.latitude,
            longitude: region.longitude,
        }
    }
}

/// Full assessment figures without the owning region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentDetail {
    /// Assessment year.
    pub year: i32,
    /// Annual recharge in MCM.
    pub annual_recharge: f64,
    /// Extractable resources in MCM.
    pub extractable_resources: f64,
    /// Total extraction in MCM.
    pub total_extraction: f64,
    /// Stress stage.
    pub stage_of_extraction: StageOfExtraction,
    /// Stored extraction ratio (%).
    pub extraction_ratio: f64,
    /// Trend label.
    pub trend: Trend,
    /// Publication date.
    pub assessment_date: String,
    /// Publishing body.
    pub data_source: String,
}

impl From<&Assessment> for AssessmentDetail {
    fn from(a: &Assessment) -> Self {
        Self {
            year: a.assessment_year,
            annual_recharge: a.annual_recharge,
            extractable_resources: a.extractable_resources,
            total_extraction: a.total_extraction,
            stage_of_extraction: a.stage_of_extraction,
            extraction_ratio: a.extraction_ratio,
            trend: a.trend,
            assessment_date: a.assessment_date.clone(),
            data_source: a.data_source.clone(),
        }
    }
}

/// One region's latest assessment, as listed by the current-assessment
/// endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentAssessmentEntry {
    /// The region.
    pub region: RegionDetail,
    /// Its latest assessment.
    pub assessment: AssessmentDetail,
}

/// A historical reading without its region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalReading {
    /// Year of the reading.
    pub year: i32,
    /// Month (1-12), absent for annual figures.
    pub month: Option<u8>,
    /// What was measured.
    pub parameter_type: ParameterType,
    /// Measured value.
    pub value: f64,
    /// Unit of `value`.
    pub unit: String,
}

impl From<&HistoricalPoint> for HistoricalReading {
    fn from(p: &HistoricalPoint) -> Self {
        Self {
            year: p.year,
            month: p.month,
            parameter_type: p.parameter_type,
            value: p.value,
            unit: p.unit.clone(),
        }
    }
}

/// Historical readings for one region. An empty `data` list is the typed
/// "no data" result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    /// The region.
    pub region: RegionRef,
    /// Readings, newest first.
    pub data: Vec<HistoricalReading>,
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// A group of assessment fields a comparison may include.
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
pub enum ComparisonParameter {
    /// `annualRecharge` and `extractableResources`.
    Recharge,
    /// `totalExtraction` and `extractionRatio`.
    Extraction,
    /// `stageOfExtraction`.
    Stage,
    /// `trend`.
    Trend,
}

impl ComparisonParameter {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Recharge, Self::Extraction, Self::Stage, Self::Trend]
    }
}

/// Assessment fields of one comparison row. Fields outside the requested
/// parameter groups are omitted; provenance is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparedAssessment {
    /// Annual recharge in MCM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_recharge: Option<f64>,
    /// Extractable resources in MCM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extractable_resources: Option<f64>,
    /// Total extraction in MCM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_extraction: Option<f64>,
    /// Stored extraction ratio (%).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_ratio: Option<f64>,
    /// Stress stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_of_extraction: Option<StageOfExtraction>,
    /// Trend label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    /// Publication date.
    pub assessment_date: String,
    /// Publishing body.
    pub data_source: String,
}

/// One region's row in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    /// The region.
    pub region: RegionSummary,
    /// Its assessment at the comparison year.
    pub assessment: ComparedAssessment,
}

/// Year-aligned comparison across a set of regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// The single year every row was taken from.
    pub comparison_year: i32,
    /// Number of rows returned.
    pub total_regions: usize,
    /// Number of IDs requested.
    pub requested_regions: usize,
    /// Requested IDs with no row at `comparison_year`.
    pub missing_regions: Vec<i64>,
    /// Parameter groups included in each row.
    pub parameters: Vec<ComparisonParameter>,
    /// One row per region, ordered by region name.
    pub regions: Vec<ComparisonEntry>,
}

// ---------------------------------------------------------------------------
// Critical units
// ---------------------------------------------------------------------------

/// Region identity of a critical unit, with its parent state's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalRegion {
    /// Region ID.
    pub id: i64,
    /// Region name.
    pub name: String,
    /// Administrative level.
    #[serde(rename = "type")]
    pub region_type: RegionType,
    /// Parent state name, or the region's own name when it has no parent.
    pub state: String,
    /// Region code.
    pub code: String,
}

/// Latest-year figures of a critical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalAssessment {
    /// Assessment year (the region's own latest).
    pub year: i32,
    /// Stress stage.
    pub stage_of_extraction: StageOfExtraction,
    /// Stored extraction ratio (%).
    pub extraction_ratio: f64,
    /// Total extraction in MCM.
    pub total_extraction: f64,
    /// Annual recharge in MCM.
    pub annual_recharge: f64,
    /// Trend label.
    pub trend: Trend,
}

/// A region whose latest stage is in the requested stress set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalUnit {
    /// The region.
    pub region: CriticalRegion,
    /// Its latest assessment.
    pub assessment: CriticalAssessment,
}

/// Headline counts over the Critical and Over-Exploited stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalSummary {
    /// Regions whose latest stage is Critical.
    pub total_critical: u64,
    /// Regions whose latest stage is Over-Exploited.
    pub total_over_exploited: u64,
}

/// Critical-unit listing plus headline counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalUnitsResult {
    /// Units ordered by descending extraction ratio.
    pub critical_units: Vec<CriticalUnit>,
    /// Headline counts (independent of the stage filter and pagination).
    pub summary: CriticalSummary,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Output encoding of an export.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    /// Delimited text.
    Csv,
    /// Structured object.
    Json,
    /// Structured object intended for client-side spreadsheet conversion.
    Excel,
}

/// Record set an export draws from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportDataType {
    /// Assessment rows with region identity.
    Assessments,
    /// Historical readings with region identity.
    Historical,
    /// Region rows.
    Regions,
    /// Critical and Over-Exploited assessment rows.
    Critical,
}

impl ExportDataType {
    /// Name used for the export envelope and attachment filename.
    #[must_use]
    pub const fn export_name(self) -> &'static str {
        match self {
            Self::Assessments => "assessments",
            Self::Historical => "historical",
            Self::Regions => "regions",
            Self::Critical => "critical_areas",
        }
    }
}

/// Structured export envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredExport {
    /// Export name (see [`ExportDataType::export_name`]).
    pub export_type: String,
    /// When the export was produced (RFC 3339).
    pub timestamp: String,
    /// Number of rows in `data`.
    pub record_count: usize,
    /// The rows.
    pub data: Vec<ExportRow>,
    /// Client guidance for formats rendered as structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversational queries
// ---------------------------------------------------------------------------

/// Intent of a free-text request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryIntent {
    /// Current status / latest assessment.
    Status,
    /// Historical readings / trends.
    Historical,
    /// Critical or over-exploited status.
    Critical,
}

/// Type tag of a conversational response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResponseType {
    /// Latest assessment figures.
    AssessmentData,
    /// Recent historical readings.
    HistoricalData,
    /// Critical status and stressed years.
    CriticalStatus,
    /// The region resolved but has no matching rows.
    NoData,
}

/// Latest assessment figures of a status answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSnapshot {
    /// Stress stage.
    pub stage_of_extraction: StageOfExtraction,
    /// Stored extraction ratio (%).
    pub extraction_ratio: f64,
    /// Trend label.
    pub trend: Trend,
    /// Assessment year.
    pub year: i32,
    /// Annual recharge in MCM.
    pub annual_recharge: f64,
    /// Total extraction in MCM.
    pub total_extraction: f64,
    /// Extractable resources in MCM.
    pub extractable_resources: f64,
}

/// Recent readings of a historical answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSnapshot {
    /// Readings, newest first.
    pub records: Vec<HistoricalReading>,
    /// Number of readings in `records`.
    pub total_records: usize,
}

/// One stressed year in a critical-status answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressedYear {
    /// Assessment year.
    pub year: i32,
    /// Stage that year.
    pub status: StageOfExtraction,
    /// Extraction ratio that year (%).
    pub extraction_ratio: f64,
}

/// Current and historical stress of a critical-status answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalStatusSnapshot {
    /// Whether any assessment year was stressed.
    pub is_critical: bool,
    /// Latest stage.
    pub current_status: StageOfExtraction,
    /// Latest extraction ratio (%).
    pub extraction_ratio: f64,
    /// Every stressed year, newest first.
    pub critical_years: Vec<StressedYear>,
}

/// Payload of a conversational response. `Empty` serializes as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Status answer.
    Assessment(AssessmentSnapshot),
    /// Historical answer.
    Historical(HistoricalSnapshot),
    /// Critical answer.
    Critical(CriticalStatusSnapshot),
    /// No data.
    Empty(EmptyData),
}

/// An empty JSON object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmptyData {}

/// Typed body of a conversational response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    /// Response type tag.
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    /// Display name of the resolved region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Typed payload.
    pub data: ResponseData,
    /// Templated one-sentence summary.
    pub summary: String,
}

/// Uniform envelope of a conversational query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// The original query text.
    pub query: String,
    /// The typed response.
    pub response: QueryResponse,
    /// When the response was produced (RFC 3339).
    pub timestamp: String,
}
