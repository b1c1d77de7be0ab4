//! Flat record sets for export.
//!
//! Each builder reads one record type, joins region identity onto it, and
//! flattens it into [`ExportRow`]s with a fixed column order.

use std::collections::BTreeMap;

use ingres_analytics_models::{ExportDataType, ExportRow};
use ingres_database::GroundwaterStore;
use ingres_database_models::{AssessmentOrder, AssessmentQuery, HistoricalQuery, RegionOrder, RegionQuery};
use ingres_groundwater_models::{Assessment, HistoricalPoint, Region, StageOfExtraction};
use serde_json::{Value, json};

use crate::{
    AnalyticsError,
    params::{self, MIN_YEAR},
};

/// How far past the current year export year bounds may reach.
const EXPORT_YEAR_HORIZON: i32 = 10;

/// Filters shared by all export data types. Filters that do not apply to
/// a data type are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFilters {
    /// Restrict to these regions.
    pub region_ids: Vec<i64>,
    /// Inclusive lower year bound.
    pub start_year: Option<i32>,
    /// Inclusive upper year bound.
    pub end_year: Option<i32>,
    /// Restrict assessments to these stages.
    pub stages: Vec<StageOfExtraction>,
}

impl ExportFilters {
    /// Parses raw request values. Years must fall in `1900..=` ten years past
    /// the current year.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::MalformedIdentifier`] for a non-integer region id
    /// * [`AnalyticsError::InvalidYear`] or [`AnalyticsError::InvalidRange`]
    ///   for bad year bounds
    /// * [`AnalyticsError::InvalidStage`] for an unknown stage
    pub fn parse(
        region_ids: Option<&str>,
        start_year: Option<&str>,
        end_year: Option<&str>,
        stage: Option<&str>,
    ) -> Result<Self, AnalyticsError> {
        let (start_year, end_year) = params::parse_year_range(
            start_year,
            end_year,
            MIN_YEAR,
            params::current_year() + EXPORT_YEAR_HORIZON,
        )?;
        let stages = match stage.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => params::parse_stage_list(raw, StageOfExtraction::all())?,
            None => vec![],
        };
        Ok(Self {
            region_ids: region_ids
                .map(params::parse_id_list)
                .transpose()?
                .unwrap_or_default(),
            start_year,
            end_year,
            stages,
        })
    }
}

/// Builds the full row set for `data_type`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if a read fails.
pub async fn build_rows(
    store: &dyn GroundwaterStore,
    data_type: ExportDataType,
    filters: &ExportFilters,
) -> Result<Vec<ExportRow>, AnalyticsError> {
    match data_type {
        ExportDataType::Assessments => {
            let query = AssessmentQuery {
                region_ids: filters.region_ids.clone(),
                start_year: filters.start_year,
                end_year: filters.end_year,
                stages: filters.stages.clone(),
                ..AssessmentQuery::default()
            };
            assessment_rows(store, &query, false).await
        }
        ExportDataType::Critical => {
            let query = AssessmentQuery {
                region_ids: filters.region_ids.clone(),
                start_year: filters.start_year,
                end_year: filters.end_year,
                stages: StageOfExtraction::headline().to_vec(),
                order: AssessmentOrder::ExtractionRatioDesc,
                ..AssessmentQuery::default()
            };
            assessment_rows(store, &query, false).await
        }
        ExportDataType::Historical => historical_rows(store, filters).await,
        ExportDataType::Regions => region_rows(store, &filters.region_ids).await,
    }
}

/// Builds the row set of the simple export: assessments of regions that
/// exist, or regions, optionally for one region.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if a read fails.
pub async fn build_simple_rows(
    store: &dyn GroundwaterStore,
    data_type: ExportDataType,
    region_id: Option<i64>,
) -> Result<Vec<ExportRow>, AnalyticsError> {
    let ids: Vec<i64> = region_id.into_iter().collect();
    match data_type {
        ExportDataType::Regions => region_rows(store, &ids).await,
        _ => {
            let query = AssessmentQuery {
                region_ids: ids,
                ..AssessmentQuery::default()
            };
            assessment_rows(store, &query, true).await
        }
    }
}

/// Reads the regions behind `ids`, keyed by id for per-row joins.
async fn regions_for(
    store: &dyn GroundwaterStore,
    mut ids: Vec<i64>,
) -> Result<BTreeMap<i64, Region>, AnalyticsError> {
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(store
        .regions(&RegionQuery {
            ids,
            ..RegionQuery::default()
        })
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect())
}

fn region_columns(row: &mut ExportRow, region: Option<&Region>) {
    row.insert(
        "regionName".to_string(),
        region.map_or(Value::Null, |r| json!(r.name)),
    );
    row.insert(
        "regionType".to_string(),
        region.map_or(Value::Null, |r| json!(r.region_type.as_ref())),
    );
    row.insert(
        "regionCode".to_string(),
        region.map_or(Value::Null, |r| json!(r.code)),
    );
}

async fn assessment_rows(
    store: &dyn GroundwaterStore,
    query: &AssessmentQuery,
    require_region: bool,
) -> Result<Vec<ExportRow>, AnalyticsError> {
    let assessments = store.assessments(query).await?;
    let regions = regions_for(store, assessments.iter().map(|a| a.region_id).collect()).await?;

    Ok(assessments
        .iter()
        .filter_map(|a| {
            let region = regions.get(&a.region_id);
            (!require_region || region.is_some()).then(|| assessment_row(a, region))
        })
        .collect())
}

fn assessment_row(a: &Assessment, region: Option<&Region>) -> ExportRow {
    let mut row = ExportRow::new();
    row.insert("id".to_string(), json!(a.id));
    row.insert("regionId".to_string(), json!(a.region_id));
    region_columns(&mut row, region);
    row.insert("assessmentYear".to_string(), json!(a.assessment_year));
    row.insert("annualRecharge".to_string(), json!(a.annual_recharge));
    row.insert(
        "extractableResources".to_string(),
        json!(a.extractable_resources),
    );
    row.insert("totalExtraction".to_string(), json!(a.total_extraction));
    row.insert(
        "stageOfExtraction".to_string(),
        json!(a.stage_of_extraction.as_ref()),
    );
    row.insert("extractionRatio".to_string(), json!(a.extraction_ratio));
    row.insert("trend".to_string(), json!(a.trend.as_ref()));
    row.insert("assessmentDate".to_string(), json!(a.assessment_date));
    row.insert("dataSource".to_string(), json!(a.data_source));
    row
}

async fn historical_rows(
    store: &dyn GroundwaterStore,
    filters: &ExportFilters,
) -> Result<Vec<ExportRow>, AnalyticsError> {
    let points = store
        .historical_points(&HistoricalQuery {
            region_ids: filters.region_ids.clone(),
            start_year: filters.start_year,
            end_year: filters.end_year,
            ..HistoricalQuery::default()
        })
        .await?;
    let regions = regions_for(store, points.iter().map(|p| p.region_id).collect()).await?;

    Ok(points
        .iter()
        .map(|p| historical_row(p, regions.get(&p.region_id)))
        .collect())
}

fn historical_row(p: &HistoricalPoint, region: Option<&Region>) -> ExportRow {
    let mut row = ExportRow::new();
    row.insert("id".to_string(), json!(p.id));
    row.insert("regionId".to_string(), json!(p.region_id));
    region_columns(&mut row, region);
    row.insert("year".to_string(), json!(p.year));
    row.insert("month".to_string(), json!(p.month));
    row.insert("parameterType".to_string(), json!(p.parameter_type.as_ref()));
    row.insert("value".to_string(), json!(p.value));
    row.insert("unit".to_string(), json!(p.unit));
    row
}

async fn region_rows(
    store: &dyn GroundwaterStore,
    ids: &[i64],
) -> Result<Vec<ExportRow>, AnalyticsError> {
    let regions = store
        .regions(&RegionQuery {
            ids: ids.to_vec(),
            order: RegionOrder::Name,
            ..RegionQuery::default()
        })
        .await?;

    Ok(regions
        .iter()
        .map(|r| {
            let mut row = ExportRow::new();
            row.insert("id".to_string(), json!(r.id));
            row.insert("name".to_string(), json!(r.name));
            row.insert("type".to_string(), json!(r.region_type.as_ref()));
            row.insert("parentId".to_string(), json!(r.parent_id));
            row.insert("code".to_string(), json!(r.code));
            row.insert("latitude".to_string(), json!(r.latitude));
            row.insert("longitude".to_string(), json!(r.longitude));
            row
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use ingres_database::memory::fixtures::{assessment, sample};

    use super::*;

    #[tokio::test]
    async fn assessment_rows_have_fixed_columns_and_filters() {
        let store = sample();
        let filters = ExportFilters::parse(Some("1,11"), Some("2023"), None, None).unwrap();
        let rows = build_rows(&store, ExportDataType::Assessments, &filters)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(
            columns,
            vec![
                "id",
                "regionId",
                "regionName",
                "regionType",
                "regionCode",
                "assessmentYear",
                "annualRecharge",
                "extractableResources",
                "totalExtraction",
                "stageOfExtraction",
                "extractionRatio",
                "trend",
                "assessmentDate",
                "dataSource",
            ]
        );
        assert_eq!(rows[0]["regionName"], json!("Karnataka"));
        assert_eq!(rows[0]["stageOfExtraction"], json!("Semi-Critical"));
    }

    #[tokio::test]
    async fn critical_rows_are_ratio_ordered_headline_stages() {
        let store = sample();
        let rows = build_rows(&store, ExportDataType::Critical, &ExportFilters::default())
            .await
            .unwrap();
        let ratios: Vec<f64> = rows
            .iter()
            .filter_map(|r| r["extractionRatio"].as_f64())
            .collect();
        assert_eq!(ratios.first().copied(), Some(165.0));
        assert!(ratios.windows(2).all(|w| w[0] >= w[1]));
        assert!(
            rows.iter()
                .all(|r| r["stageOfExtraction"] == json!("Critical")
                    || r["stageOfExtraction"] == json!("Over-Exploited"))
        );
    }

    #[tokio::test]
    async fn orphan_assessments_keep_null_region_columns_except_in_simple_export() {
        let store = sample().with_assessment(assessment(
            99,
            777,
            2023,
            StageOfExtraction::Safe,
            40.0,
        ));
        let filters = ExportFilters {
            region_ids: vec![777],
            ..ExportFilters::default()
        };
        let rows = build_rows(&store, ExportDataType::Assessments, &filters)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["regionName"], Value::Null);

        let rows = build_simple_rows(&store, ExportDataType::Assessments, Some(777))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn each_row_joins_its_own_region() {
        let store = sample();
        let rows = build_rows(&store, ExportDataType::Assessments, &ExportFilters::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 11);
        for row in &rows {
            let expected = match row["regionId"].as_i64().unwrap() {
                1 => "Karnataka",
                2 => "Punjab",
                3 => "Rajasthan",
                10 => "Bangalore Urban",
                11 => "Kolar",
                12 => "Mysuru",
                20 => "Ludhiana",
                30 => "Jaipur",
                other => panic!("unexpected region {other}"),
            };
            assert_eq!(row["regionName"], json!(expected));
        }

        let filters = ExportFilters::parse(Some("2,1"), None, None, None).unwrap();
        let rows = build_rows(&store, ExportDataType::Historical, &filters)
            .await
            .unwrap();
        assert!(rows.iter().any(|r| r["regionName"] == json!("Punjab")));
        assert!(
            rows.iter()
                .all(|r| (r["regionId"] == json!(1)) == (r["regionName"] == json!("Karnataka")))
        );
    }

    #[tokio::test]
    async fn region_rows_are_name_ordered() {
        let store = sample();
        let rows = build_rows(&store, ExportDataType::Regions, &ExportFilters::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0]["name"], json!("Bangalore Urban"));
        assert_eq!(rows[0]["parentId"], json!(1));
    }

    #[tokio::test]
    async fn historical_rows_carry_month_nulls() {
        let store = sample();
        let filters = ExportFilters::parse(Some("1"), None, None, None).unwrap();
        let rows = build_rows(&store, ExportDataType::Historical, &filters)
            .await
            .unwrap();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().any(|r| r["month"] == Value::Null));
    }

    #[test]
    fn filters_allow_future_years_within_horizon() {
        let next = params::current_year() + 5;
        let filters = ExportFilters::parse(None, None, Some(&next.to_string()), None).unwrap();
        assert_eq!(filters.end_year, Some(next));

        let far = params::current_year() + 11;
        assert!(ExportFilters::parse(None, None, Some(&far.to_string()), None).is_err());
        assert!(ExportFilters::parse(None, None, None, Some("Drought")).is_err());
    }
}
