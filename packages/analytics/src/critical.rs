//! Critical-unit rollup.
//!
//! Lists regions whose own latest assessment sits in a stressed stage,
//! optionally scoped to one state and its direct children, with headline
//! counts over the Critical and Over-Exploited stages.

use std::cmp::Ordering;

use ingres_analytics_models::{
    CriticalAssessment, CriticalRegion, CriticalSummary, CriticalUnit, CriticalUnitsResult,
};
use ingres_database::GroundwaterStore;
use ingres_database_models::{LatestAssessmentQuery, RegionQuery};
use ingres_groundwater_models::{Assessment, Region, StageOfExtraction};

use crate::{
    AnalyticsError,
    params::{self, CRITICAL_PAGE, Page},
    selector,
};

/// Display name used when a region's parent id points at nothing.
const UNKNOWN_STATE: &str = "Unknown";

/// Validated inputs of [`find_critical`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalRequest {
    /// Stages to list.
    pub stages: Vec<StageOfExtraction>,
    /// Restrict to this state and its direct children.
    pub state_id: Option<i64>,
    /// Page window.
    pub page: Page,
}

impl Default for CriticalRequest {
    fn default() -> Self {
        Self {
            stages: StageOfExtraction::headline().to_vec(),
            state_id: None,
            page: Page {
                limit: CRITICAL_PAGE.default_limit,
                offset: 0,
            },
        }
    }
}

impl CriticalRequest {
    /// Parses raw request values. An absent `stage` means Critical and
    /// Over-Exploited.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::InvalidStage`] for Safe or an unknown stage
    /// * [`AnalyticsError::NoValidStages`] for an empty stage list
    /// * [`AnalyticsError::MalformedIdentifier`] for a bad state id
    /// * [`AnalyticsError::InvalidLimit`] or [`AnalyticsError::InvalidOffset`]
    ///   for a bad page window
    pub fn parse(
        stage: Option<&str>,
        state_id: Option<&str>,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<Self, AnalyticsError> {
        let page = params::parse_page(limit, offset, CRITICAL_PAGE)?;
        let stages = match stage {
            Some(raw) => params::parse_stage_list(raw, StageOfExtraction::reportable())?,
            None => StageOfExtraction::headline().to_vec(),
        };
        Ok(Self {
            stages,
            state_id: params::optional_region_id(state_id)?,
            page,
        })
    }
}

/// Lists critical units ordered by extraction ratio descending, then
/// region name, then region id.
///
/// # Errors
///
/// * [`AnalyticsError::NoValidStages`] if `request.stages` is empty
/// * [`AnalyticsError::InvalidStage`] if `request.stages` contains Safe
/// * [`AnalyticsError::StateNotFound`] if the state filter names no region
/// * [`AnalyticsError::Database`] if a read fails
pub async fn find_critical(
    store: &dyn GroundwaterStore,
    request: &CriticalRequest,
) -> Result<CriticalUnitsResult, AnalyticsError> {
    if request.stages.is_empty() {
        return Err(AnalyticsError::NoValidStages);
    }
    if let Some(stage) = request.stages.iter().find(|s| !s.is_stressed()) {
        return Err(AnalyticsError::InvalidStage {
            value: stage.to_string(),
            allowed: "Critical, Over-Exploited, Semi-Critical".to_string(),
        });
    }

    let latest_query = LatestAssessmentQuery {
        within_state: request.state_id,
        ..LatestAssessmentQuery::default()
    };

    let (latest, state) = futures::try_join!(
        selector::latest_assessments_per_region(store, &latest_query),
        async {
            match request.state_id {
                Some(id) => store.region_by_id(id).await.map_err(AnalyticsError::from),
                None => Ok(None),
            }
        },
    )?;

    if let Some(id) = request.state_id
        && state.is_none()
    {
        return Err(AnalyticsError::StateNotFound { id });
    }

    let summary = summarize(&latest);

    let matching: Vec<&Assessment> = latest
        .iter()
        .filter(|a| request.stages.contains(&a.stage_of_extraction))
        .collect();

    let regions = if matching.is_empty() {
        vec![]
    } else {
        store
            .regions(&RegionQuery {
                ids: matching.iter().map(|a| a.region_id).collect(),
                ..RegionQuery::default()
            })
            .await?
    };

    let mut rows: Vec<(&Region, &Assessment)> = matching
        .into_iter()
        .filter_map(|a| regions.iter().find(|r| r.id == a.region_id).map(|r| (r, a)))
        .collect();

    rows.sort_by(|(ra, a), (rb, b)| {
        b.extraction_ratio
            .partial_cmp(&a.extraction_ratio)
            .unwrap_or(Ordering::Equal)
            .then_with(|| ra.name.cmp(&rb.name))
            .then(ra.id.cmp(&rb.id))
    });

    let page = request.page.apply(rows);

    let mut parent_ids: Vec<i64> = page.iter().filter_map(|(r, _)| r.parent_id).collect();
    parent_ids.sort_unstable();
    parent_ids.dedup();

    let parents = if parent_ids.is_empty() {
        vec![]
    } else {
        store
            .regions(&RegionQuery {
                ids: parent_ids,
                ..RegionQuery::default()
            })
            .await?
    };

    let critical_units = page
        .into_iter()
        .map(|(region, assessment)| CriticalUnit {
            region: CriticalRegion {
                id: region.id,
                name: region.name.clone(),
                region_type: region.region_type,
                state: state_name(region, &parents),
                code: region.code.clone(),
            },
            assessment: CriticalAssessment {
                year: assessment.assessment_year,
                stage_of_extraction: assessment.stage_of_extraction,
                extraction_ratio: assessment.extraction_ratio,
                total_extraction: assessment.total_extraction,
                annual_recharge: assessment.annual_recharge,
                trend: assessment.trend,
            },
        })
        .collect();

    Ok(CriticalUnitsResult {
        critical_units,
        summary,
    })
}

/// Counts regions per headline stage.
fn summarize(latest: &[Assessment]) -> CriticalSummary {
    latest
        .iter()
        .fold(CriticalSummary::default(), |mut summary, a| {
            match a.stage_of_extraction {
                StageOfExtraction::Critical => summary.total_critical += 1,
                StageOfExtraction::OverExploited => summary.total_over_exploited += 1,
                StageOfExtraction::Safe | StageOfExtraction::SemiCritical => {}
            }
            summary
        })
}

fn state_name(region: &Region, parents: &[Region]) -> String {
    region.parent_id.map_or_else(
        || region.name.clone(),
        |parent_id| {
            parents
                .iter()
                .find(|p| p.id == parent_id)
                .map_or_else(|| UNKNOWN_STATE.to_string(), |p| p.name.clone())
        },
    )
}

#[cfg(test)]
mod tests {
    use ingres_database::memory::fixtures::sample;

    use super::*;

    fn unit_names(result: &CriticalUnitsResult) -> Vec<&str> {
        result
            .critical_units
            .iter()
            .map(|u| u.region.name.as_str())
            .collect()
    }

    #[tokio::test]
    async fn default_stages_use_each_regions_own_latest_year() {
        let store = sample();
        let result = find_critical(&store, &CriticalRequest::default())
            .await
            .unwrap();

        // Karnataka (Semi-Critical) and Kolar (Semi-Critical in 2023) are
        // excluded; Rajasthan's latest year is 2022 and still counts.
        assert_eq!(
            unit_names(&result),
            vec![
                "Punjab",
                "Bangalore Urban",
                "Jaipur",
                "Ludhiana",
                "Rajasthan",
                "Mysuru",
            ]
        );
        assert_eq!(
            result.summary,
            CriticalSummary {
                total_critical: 4,
                total_over_exploited: 2,
            }
        );
    }

    #[tokio::test]
    async fn semi_critical_filter_keeps_summary_fixed() {
        let store = sample();
        let request = CriticalRequest::parse(Some("Semi-Critical"), None, None, None).unwrap();
        let result = find_critical(&store, &request).await.unwrap();

        assert_eq!(unit_names(&result), vec!["Kolar", "Karnataka"]);
        assert_eq!(result.summary.total_critical, 4);
        assert_eq!(result.summary.total_over_exploited, 2);
    }

    #[tokio::test]
    async fn state_filter_scopes_units_and_summary() {
        let store = sample();
        let request = CriticalRequest {
            state_id: Some(1),
            ..CriticalRequest::default()
        };
        let result = find_critical(&store, &request).await.unwrap();

        assert_eq!(unit_names(&result), vec!["Bangalore Urban", "Mysuru"]);
        assert!(
            result
                .critical_units
                .iter()
                .all(|u| u.region.state == "Karnataka")
        );
        assert_eq!(
            result.summary,
            CriticalSummary {
                total_critical: 1,
                total_over_exploited: 1,
            }
        );

        let request = CriticalRequest {
            state_id: Some(404),
            ..CriticalRequest::default()
        };
        let err = find_critical(&store, &request).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::StateNotFound { id: 404 }));
    }

    #[tokio::test]
    async fn state_display_falls_back() {
        let store = sample();
        let result = find_critical(&store, &CriticalRequest::default())
            .await
            .unwrap();
        let state_of = |name: &str| {
            result
                .critical_units
                .iter()
                .find(|u| u.region.name == name)
                .map(|u| u.region.state.clone())
        };
        assert_eq!(state_of("Punjab").as_deref(), Some("Punjab"));
        assert_eq!(state_of("Ludhiana").as_deref(), Some("Punjab"));
        assert_eq!(state_of("Jaipur").as_deref(), Some(UNKNOWN_STATE));
    }

    #[tokio::test]
    async fn pagination_applies_after_ordering() {
        let store = sample();
        let request = CriticalRequest::parse(None, None, Some("2"), Some("1")).unwrap();
        let result = find_critical(&store, &request).await.unwrap();
        assert_eq!(unit_names(&result), vec!["Bangalore Urban", "Jaipur"]);
        assert_eq!(result.summary.total_critical, 4);
    }

    #[tokio::test]
    async fn stage_validation() {
        let store = sample();
        assert!(matches!(
            CriticalRequest::parse(Some("Safe"), None, None, None),
            Err(AnalyticsError::InvalidStage { .. })
        ));
        assert!(matches!(
            CriticalRequest::parse(Some(""), None, None, None),
            Err(AnalyticsError::NoValidStages)
        ));

        let request = CriticalRequest {
            stages: vec![],
            ..CriticalRequest::default()
        };
        assert!(matches!(
            find_critical(&store, &request).await,
            Err(AnalyticsError::NoValidStages)
        ));
    }
}
