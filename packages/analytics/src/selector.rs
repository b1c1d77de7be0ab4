//! Assessment and historical-reading selection.
//!
//! Duplicate assessments for the same region and year are legal in the
//! store. Every selector here resolves them the same way: the row with the
//! lowest assessment id wins.

use ingres_analytics_models::{
    CurrentAssessmentEntry, HistoricalReading, HistoricalSeries, RegionDetail, RegionRef,
};
use ingres_database::GroundwaterStore;
use ingres_database_models::{AssessmentQuery, HistoricalQuery, LatestAssessmentQuery, RegionQuery};
use ingres_groundwater_models::{Assessment, ParameterType, RegionType};

use crate::{
    AnalyticsError,
    params::{self, HISTORICAL_PAGE, LISTING_PAGE, MIN_YEAR, Page},
    resolver,
};

/// Returns the assessment at the region's maximum year, or `None` if the
/// region has none.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the read fails.
pub async fn select_latest(
    store: &dyn GroundwaterStore,
    region_id: i64,
) -> Result<Option<Assessment>, AnalyticsError> {
    let query = AssessmentQuery {
        limit: Some(1),
        ..AssessmentQuery::for_region(region_id)
    };
    Ok(store.assessments(&query).await?.into_iter().next())
}

/// Returns the region's assessment for `year`, or `None`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the read fails.
pub async fn select_by_year(
    store: &dyn GroundwaterStore,
    region_id: i64,
    year: i32,
) -> Result<Option<Assessment>, AnalyticsError> {
    let query = AssessmentQuery {
        year: Some(year),
        limit: Some(1),
        ..AssessmentQuery::for_region(region_id)
    };
    Ok(store.assessments(&query).await?.into_iter().next())
}

/// Reads every region's latest-year assessment, one per region.
///
/// This is the per-region policy: each region contributes its own newest
/// year, so different regions may report different years. Rows come back
/// ordered by region id.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the read fails.
pub async fn latest_assessments_per_region(
    store: &dyn GroundwaterStore,
    query: &LatestAssessmentQuery,
) -> Result<Vec<Assessment>, AnalyticsError> {
    let rows = store.latest_assessments(query).await?;
    Ok(dedupe_by_region(rows))
}

/// Keeps the lowest-id row per region. Input must be ordered by region id
/// then assessment id.
fn dedupe_by_region(rows: Vec<Assessment>) -> Vec<Assessment> {
    let mut out: Vec<Assessment> = Vec::with_capacity(rows.len());
    for row in rows {
        if out.last().is_none_or(|prev| prev.region_id != row.region_id) {
            out.push(row);
        }
    }
    out
}

/// Filters for [`select_historical`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoricalFilters {
    /// Inclusive lower year bound.
    pub start_year: Option<i32>,
    /// Inclusive upper year bound.
    pub end_year: Option<i32>,
    /// Restrict to one measured parameter.
    pub parameter_type: Option<ParameterType>,
    /// Page window.
    pub page: Page,
}

impl Default for HistoricalFilters {
    fn default() -> Self {
        Self {
            start_year: None,
            end_year: None,
            parameter_type: None,
            page: Page {
                limit: HISTORICAL_PAGE.default_limit,
                offset: 0,
            },
        }
    }
}

impl HistoricalFilters {
    /// Parses raw request values. Years must fall in `1900..=` the current
    /// year, so a future year is rejected with
    /// [`AnalyticsError::InvalidYear`] rather than matching nothing.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::InvalidYear`] or [`AnalyticsError::InvalidRange`]
    ///   for bad year bounds
    /// * [`AnalyticsError::InvalidParameterType`] for an unknown parameter
    /// * [`AnalyticsError::InvalidLimit`] or [`AnalyticsError::InvalidOffset`]
    ///   for a bad page window
    pub fn parse(
        start_year: Option<&str>,
        end_year: Option<&str>,
        parameter_type: Option<&str>,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<Self, AnalyticsError> {
        let (start_year, end_year) =
            params::parse_year_range(start_year, end_year, MIN_YEAR, params::current_year())?;
        Ok(Self {
            start_year,
            end_year,
            parameter_type: params::parse_parameter_type(parameter_type)?,
            page: params::parse_page(limit, offset, HISTORICAL_PAGE)?,
        })
    }
}

/// Reads a region's historical readings, newest first (annual readings
/// after monthly ones within a year). An empty `data` list means the region
/// exists but nothing matched.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidRange`] if `start_year > end_year`
/// * [`AnalyticsError::RegionNotFound`] if the region does not exist
/// * [`AnalyticsError::Database`] if a read fails
pub async fn select_historical(
    store: &dyn GroundwaterStore,
    region_id: i64,
    filters: &HistoricalFilters,
) -> Result<HistoricalSeries, AnalyticsError> {
    if let (Some(start), Some(end)) = (filters.start_year, filters.end_year)
        && start > end
    {
        return Err(AnalyticsError::InvalidRange { start, end });
    }

    let region = resolver::resolve_id(store, region_id).await?;

    let points = store
        .historical_points(&HistoricalQuery {
            region_ids: vec![region_id],
            start_year: filters.start_year,
            end_year: filters.end_year,
            parameter_type: filters.parameter_type,
            limit: Some(filters.page.limit),
            offset: filters.page.offset,
        })
        .await?;

    Ok(HistoricalSeries {
        region: RegionRef {
            id: region.id,
            name: region.name,
        },
        data: points.iter().map(HistoricalReading::from).collect(),
    })
}

/// Filters for [`list_latest_assessments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestFilter {
    /// Restrict to one region.
    pub region_id: Option<i64>,
    /// Restrict to one administrative level.
    pub region_type: Option<RegionType>,
    /// Page window.
    pub page: Page,
}

impl LatestFilter {
    /// Parses raw request values.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::MalformedIdentifier`] for a bad region id
    /// * [`AnalyticsError::InvalidRegionType`] for an unknown region type
    /// * [`AnalyticsError::InvalidLimit`] or [`AnalyticsError::InvalidOffset`]
    ///   for a bad page window
    pub fn parse(
        region_id: Option<&str>,
        region_type: Option<&str>,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<Self, AnalyticsError> {
        Ok(Self {
            region_id: params::optional_region_id(region_id)?,
            region_type: params::parse_region_type(region_type)?,
            page: params::parse_page(limit, offset, LISTING_PAGE)?,
        })
    }
}

/// Lists each matching region's latest assessment, ordered by year
/// descending then region name.
///
/// # Errors
///
/// * [`AnalyticsError::RegionNotFound`] if `region_id` names no region
/// * [`AnalyticsError::Database`] if a read fails
pub async fn list_latest_assessments(
    store: &dyn GroundwaterStore,
    filter: &LatestFilter,
) -> Result<Vec<CurrentAssessmentEntry>, AnalyticsError> {
    let latest_query = LatestAssessmentQuery {
        region_ids: filter.region_id.into_iter().collect(),
        region_type: filter.region_type,
        within_state: None,
    };
    let region_query = RegionQuery {
        ids: filter.region_id.into_iter().collect(),
        region_type: filter.region_type,
        ..RegionQuery::default()
    };

    let (assessments, regions) = futures::try_join!(
        latest_assessments_per_region(store, &latest_query),
        async { store.regions(&region_query).await.map_err(AnalyticsError::from) },
    )?;

    if let Some(id) = filter.region_id
        && filter.region_type.is_none()
        && regions.is_empty()
    {
        return Err(AnalyticsError::RegionNotFound {
            reference: id.to_string(),
        });
    }

    let mut entries: Vec<CurrentAssessmentEntry> = assessments
        .iter()
        .filter_map(|a| {
            regions
                .iter()
                .find(|r| r.id == a.region_id)
                .map(|r| CurrentAssessmentEntry {
                    region: RegionDetail::from(r),
                    assessment: a.into(),
                })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.assessment
            .year
            .cmp(&a.assessment.year)
            .then_with(|| a.region.name.cmp(&b.region.name))
            .then(a.region.id.cmp(&b.region.id))
    });

    Ok(filter.page.apply(entries))
}
