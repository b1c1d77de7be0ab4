//! Year-aligned comparison across a region set.
//!
//! All rows of one comparison come from a single year: either the year the
//! caller asked for or the newest year any of the requested regions has
//! (see [`latest_year_across`]). This differs from the critical-unit
//! rollup, where each region reports its own newest year.

use std::collections::BTreeMap;

use ingres_analytics_models::{
    ComparedAssessment, ComparisonEntry, ComparisonParameter, ComparisonResult, RegionSummary,
};
use ingres_database::GroundwaterStore;
use ingres_database_models::AssessmentQuery;
use ingres_groundwater_models::Assessment;

use crate::{
    AnalyticsError,
    params::{self, MIN_YEAR},
    resolver,
};

/// Validated inputs of [`compare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRequest {
    /// Requested region ids, in input order.
    pub region_ids: Vec<i64>,
    /// Explicit comparison year.
    pub year: Option<i32>,
    /// Parameter groups to include.
    pub parameters: Vec<ComparisonParameter>,
}

impl ComparisonRequest {
    /// Parses raw request values. `region_ids` is required; `year` must fall
    /// in `1900..=` the current year.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::MissingParameter`] if `region_ids` is absent or
    ///   lists nothing
    /// * [`AnalyticsError::MalformedIdentifier`] for a non-integer id
    /// * [`AnalyticsError::InvalidYear`] for a bad year
    /// * [`AnalyticsError::InvalidParameters`] for unknown parameter names
    pub fn parse(
        region_ids: Option<&str>,
        year: Option<&str>,
        parameters: Option<&str>,
    ) -> Result<Self, AnalyticsError> {
        let region_ids = region_ids
            .map(params::parse_id_list)
            .transpose()?
            .filter(|ids| !ids.is_empty())
            .ok_or(AnalyticsError::MissingParameter { name: "region_ids" })?;

        Ok(Self {
            region_ids,
            year: params::parse_year("year", year, MIN_YEAR, params::current_year())?,
            parameters: params::parse_comparison_parameters(parameters)?,
        })
    }
}

/// Returns the newest assessment year across all `region_ids` combined, or
/// `None` if none of them has an assessment.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the read fails.
pub async fn latest_year_across(
    store: &dyn GroundwaterStore,
    region_ids: &[i64],
) -> Result<Option<i32>, AnalyticsError> {
    Ok(store.max_assessment_year(region_ids).await?)
}

/// Compares the given regions at one year.
///
/// Rows are ordered by region name, one per region. Every requested id
/// without a row at the comparison year lands in `missingRegions`.
///
/// # Errors
///
/// * [`AnalyticsError::MissingParameter`] if `region_ids` is empty
/// * [`AnalyticsError::NoDataFound`] if no year was given and none of the
///   regions has any assessment
/// * [`AnalyticsError::NoDataForYear`] if a year was given and no region has
///   a row for it
/// * [`AnalyticsError::Database`] if a read fails
pub async fn compare(
    store: &dyn GroundwaterStore,
    request: &ComparisonRequest,
) -> Result<ComparisonResult, AnalyticsError> {
    let mut region_ids: Vec<i64> = Vec::with_capacity(request.region_ids.len());
    for id in &request.region_ids {
        if !region_ids.contains(id) {
            region_ids.push(*id);
        }
    }
    if region_ids.is_empty() {
        return Err(AnalyticsError::MissingParameter { name: "region_ids" });
    }

    let year = match request.year {
        Some(year) => year,
        None => latest_year_across(store, &region_ids)
            .await?
            .ok_or(AnalyticsError::NoDataFound)?,
    };

    let assessment_query = AssessmentQuery {
        region_ids: region_ids.clone(),
        year: Some(year),
        ..AssessmentQuery::default()
    };

    let (region_set, assessments) = futures::try_join!(
        resolver::resolve_ids(store, &region_ids),
        async {
            store
                .assessments(&assessment_query)
                .await
                .map_err(AnalyticsError::from)
        },
    )?;

    // Rows arrive id-ascending within the year; the first per region wins.
    let mut by_region: BTreeMap<i64, &Assessment> = BTreeMap::new();
    for assessment in &assessments {
        by_region.entry(assessment.region_id).or_insert(assessment);
    }

    let mut entries: Vec<ComparisonEntry> = region_set
        .regions
        .iter()
        .filter_map(|region| {
            by_region.get(&region.id).map(|a| ComparisonEntry {
                region: RegionSummary::from(region),
                assessment: project(a, &request.parameters),
            })
        })
        .collect();

    if entries.is_empty() {
        return Err(if request.year.is_some() {
            AnalyticsError::NoDataForYear { year }
        } else {
            AnalyticsError::NoDataFound
        });
    }

    entries.sort_by(|a, b| {
        a.region
            .name
            .cmp(&b.region.name)
            .then(a.region.id.cmp(&b.region.id))
    });

    let missing_regions: Vec<i64> = region_ids
        .iter()
        .copied()
        .filter(|id| !entries.iter().any(|e| e.region.id == *id))
        .collect();

    if !missing_regions.is_empty() {
        log::warn!(
            "No data found for region IDs {missing_regions:?} in year {year}"
        );
    }

    Ok(ComparisonResult {
        comparison_year: year,
        total_regions: entries.len(),
        requested_regions: region_ids.len(),
        missing_regions,
        parameters: request.parameters.clone(),
        regions: entries,
    })
}

/// Keeps the fields of the requested parameter groups plus provenance.
fn project(assessment: &Assessment, parameters: &[ComparisonParameter]) -> ComparedAssessment {
    let has = |p: ComparisonParameter| parameters.contains(&p);
    let recharge = has(ComparisonParameter::Recharge);
    let extraction = has(ComparisonParameter::Extraction);

    ComparedAssessment {
        annual_recharge: recharge.then_some(assessment.annual_recharge),
        extractable_resources: recharge.then_some(assessment.extractable_resources),
        total_extraction: extraction.then_some(assessment.total_extraction),
        extraction_ratio: extraction.then_some(assessment.extraction_ratio),
        stage_of_extraction: has(ComparisonParameter::Stage)
            .then_some(assessment.stage_of_extraction),
        trend: has(ComparisonParameter::Trend).then_some(assessment.trend),
        assessment_date: assessment.assessment_date.clone(),
        data_source: assessment.data_source.clone(),
    }
}
