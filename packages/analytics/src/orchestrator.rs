//! Conversational query handling.
//!
//! A free-text request is classified by an ordered keyword rule table,
//! resolved to one region, answered by the matching handler, and wrapped in
//! a [`QueryResult`] envelope. Summaries are templated from the typed data
//! so they never depend on a text-generation service.

use chrono::Utc;
use ingres_analytics_models::{
    AssessmentSnapshot, CriticalStatusSnapshot, EmptyData, HistoricalReading, HistoricalSnapshot,
    QueryContext, QueryIntent, QueryResponse, QueryResult, ResponseData, ResponseType,
    StressedYear,
};
use ingres_database::GroundwaterStore;
use ingres_database_models::{AssessmentQuery, HistoricalQuery};
use ingres_groundwater_models::Region;

use crate::{AnalyticsError, ErrorKind, export, resolver, selector};

/// Number of readings returned for a historical question.
pub const RECENT_HISTORY_LIMIT: u32 = 10;

/// Intent rules, checked top to bottom. A query matches a rule if its
/// lower-cased text contains any of the rule's keywords. No match means
/// [`QueryIntent::Status`].
pub const INTENT_RULES: [(QueryIntent, &[&str]); 3] = [
    (QueryIntent::Status, &["status", "assessment", "current"]),
    (QueryIntent::Historical, &["historical", "trend", "over time"]),
    (QueryIntent::Critical, &["critical", "over-exploited", "safe"]),
];

/// Classifies a query by the first matching rule in [`INTENT_RULES`].
#[must_use]
pub fn classify(query: &str) -> QueryIntent {
    let query = query.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| query.contains(k)))
        .map_or(QueryIntent::Status, |(intent, _)| *intent)
}

/// Maps an error class to its HTTP status code.
#[must_use]
pub const fn status_for_kind(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::Validation => 400,
        ErrorKind::NotFound => 404,
        ErrorKind::Internal => 500,
    }
}

/// HTTP status code for `error`.
#[must_use]
pub const fn http_status(error: &AnalyticsError) -> u16 {
    status_for_kind(error.kind())
}

/// Answers a free-text groundwater question.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidQuery`] if `query` is blank
/// * [`AnalyticsError::RegionNotIdentified`] or
///   [`AnalyticsError::RegionNotFound`] if no region resolves
/// * [`AnalyticsError::Database`] if a read fails
pub async fn answer(
    store: &dyn GroundwaterStore,
    query: &str,
    context: Option<&QueryContext>,
) -> Result<QueryResult, AnalyticsError> {
    if query.trim().is_empty() {
        return Err(AnalyticsError::InvalidQuery);
    }

    let region = resolver::resolve_text(store, query, context).await?;
    let intent = classify(query);
    log::debug!(
        "Answering {intent} query for region {} ({})",
        region.name,
        region.id
    );

    let response = match intent {
        QueryIntent::Status => status_response(store, &region).await?,
        QueryIntent::Historical => historical_response(store, &region).await?,
        QueryIntent::Critical => critical_response(store, &region).await?,
    };

    Ok(QueryResult {
        query: query.to_string(),
        response,
        timestamp: export::timestamp(Utc::now()),
    })
}

fn no_data(region: &Region, summary: String) -> QueryResponse {
    QueryResponse {
        response_type: ResponseType::NoData,
        region: Some(region.name.clone()),
        data: ResponseData::Empty(EmptyData {}),
        summary,
    }
}

async fn status_response(
    store: &dyn GroundwaterStore,
    region: &Region,
) -> Result<QueryResponse, AnalyticsError> {
    let Some(a) = selector::select_latest(store, region.id).await? else {
        return Ok(no_data(
            region,
            format!(
                "No groundwater assessment data available for {}.",
                region.name
            ),
        ));
    };

    let summary = format!(
        "{} has {} groundwater extraction levels with {}% extraction ratio and {} trend as of {}.",
        region.name,
        a.stage_of_extraction,
        a.extraction_ratio,
        a.trend.as_ref().to_lowercase(),
        a.assessment_year
    );

    Ok(QueryResponse {
        response_type: ResponseType::AssessmentData,
        region: Some(region.name.clone()),
        data: ResponseData::Assessment(AssessmentSnapshot {
            stage_of_extraction: a.stage_of_extraction,
            extraction_ratio: a.extraction_ratio,
            trend: a.trend,
            year: a.assessment_year,
            annual_recharge: a.annual_recharge,
            total_extraction: a.total_extraction,
            extractable_resources: a.extractable_resources,
        }),
        summary,
    })
}

async fn historical_response(
    store: &dyn GroundwaterStore,
    region: &Region,
) -> Result<QueryResponse, AnalyticsError> {
    let points = store
        .historical_points(&HistoricalQuery {
            region_ids: vec![region.id],
            limit: Some(RECENT_HISTORY_LIMIT),
            ..HistoricalQuery::default()
        })
        .await?;

    if points.is_empty() {
        return Ok(no_data(
            region,
            format!("No historical groundwater data available for {}.", region.name),
        ));
    }

    let records: Vec<HistoricalReading> = points.iter().map(HistoricalReading::from).collect();
    let summary = format!(
        "Found {} historical data records for {} covering various groundwater parameters.",
        records.len(),
        region.name
    );

    Ok(QueryResponse {
        response_type: ResponseType::HistoricalData,
        region: Some(region.name.clone()),
        data: ResponseData::Historical(HistoricalSnapshot {
            total_records: records.len(),
            records,
        }),
        summary,
    })
}

async fn critical_response(
    store: &dyn GroundwaterStore,
    region: &Region,
) -> Result<QueryResponse, AnalyticsError> {
    let assessments = store
        .assessments(&AssessmentQuery::for_region(region.id))
        .await?;

    let Some(latest) = assessments.first() else {
        return Ok(no_data(
            region,
            format!(
                "No assessment data available to determine critical status for {}.",
                region.name
            ),
        ));
    };

    let critical_years: Vec<StressedYear> = assessments
        .iter()
        .filter(|a| a.stage_of_extraction.is_stressed())
        .map(|a| StressedYear {
            year: a.assessment_year,
            status: a.stage_of_extraction,
            extraction_ratio: a.extraction_ratio,
        })
        .collect();
    let is_critical = !critical_years.is_empty();

    let summary = if is_critical {
        format!(
            "{} has critical groundwater conditions with current status: {} ({}% extraction).",
            region.name, latest.stage_of_extraction, latest.extraction_ratio
        )
    } else {
        format!(
            "{} currently has {} groundwater status with {}% extraction ratio.",
            region.name, latest.stage_of_extraction, latest.extraction_ratio
        )
    };

    Ok(QueryResponse {
        response_type: ResponseType::CriticalStatus,
        region: Some(region.name.clone()),
        data: ResponseData::Critical(CriticalStatusSnapshot {
            is_critical,
            current_status: latest.stage_of_extraction,
            extraction_ratio: latest.extraction_ratio,
            critical_years,
        }),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use ingres_database::memory::{MemoryStore, fixtures};
    use ingres_groundwater_models::{RegionType, StageOfExtraction};
    use serde_json::json;

    use super::*;

    #[test]
    fn rule_order_decides_overlapping_keywords() {
        assert_eq!(classify("current trend in Punjab"), QueryIntent::Status);
        assert_eq!(classify("Historical critical years"), QueryIntent::Historical);
        assert_eq!(classify("is Kolar over-exploited?"), QueryIntent::Critical);
        assert_eq!(classify("tell me about Kolar"), QueryIntent::Status);
    }

    #[test]
    fn error_kinds_map_to_statuses() {
        assert_eq!(http_status(&AnalyticsError::InvalidQuery), 400);
        assert_eq!(http_status(&AnalyticsError::RegionNotIdentified), 400);
        assert_eq!(
            http_status(&AnalyticsError::RegionNotFound {
                reference: "x".to_string()
            }),
            404
        );
        assert_eq!(http_status(&AnalyticsError::NoDataFound), 404);
    }

    #[tokio::test]
    async fn karnataka_status_scenario() {
        let store = fixtures::sample();
        let result = answer(
            &store,
            "What is the current status of groundwater in Karnataka?",
            None,
        )
        .await
        .unwrap();

        assert_eq!(result.response.response_type, ResponseType::AssessmentData);
        assert_eq!(result.response.region.as_deref(), Some("Karnataka"));
        assert_eq!(
            result.response.summary,
            "Karnataka has Semi-Critical groundwater extraction levels with 78% extraction ratio and stable trend as of 2023."
        );

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["response"]["type"], json!("assessment_data"));
        assert_eq!(value["response"]["data"]["stageOfExtraction"], json!("Semi-Critical"));
        assert_eq!(value["response"]["data"]["year"], json!(2023));
    }

    #[tokio::test]
    async fn historical_answer_lists_recent_points() {
        let store = fixtures::sample();
        let result = answer(&store, "groundwater trend for punjab", None)
            .await
            .unwrap();
        assert_eq!(result.response.response_type, ResponseType::HistoricalData);
        let ResponseData::Historical(snapshot) = &result.response.data else {
            panic!("expected historical data");
        };
        assert_eq!(snapshot.total_records, 1);
        assert_eq!(
            result.response.summary,
            "Found 1 historical data records for Punjab covering various groundwater parameters."
        );
    }

    #[tokio::test]
    async fn critical_answer_lists_stressed_years() {
        let store = fixtures::sample();
        let context = QueryContext {
            location: Some("Kolar".to_string()),
            region: None,
        };
        let result = answer(&store, "is it critical?", Some(&context))
            .await
            .unwrap();
        let ResponseData::Critical(snapshot) = &result.response.data else {
            panic!("expected critical data");
        };
        assert!(snapshot.is_critical);
        assert_eq!(snapshot.current_status, StageOfExtraction::SemiCritical);
        let years: Vec<i32> = snapshot.critical_years.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2023, 2022]);
        assert_eq!(
            result.response.summary,
            "Kolar has critical groundwater conditions with current status: Semi-Critical (85% extraction)."
        );
    }

    #[tokio::test]
    async fn region_without_rows_is_no_data() {
        let store = MemoryStore::default().with_region(fixtures::region(
            5,
            "Goa",
            RegionType::State,
            None,
        ));
        let result = answer(&store, "status of goa", None).await.unwrap();
        assert_eq!(result.response.response_type, ResponseType::NoData);
        let value = serde_json::to_value(&result.response).unwrap();
        assert_eq!(value["data"], json!({}));
        assert_eq!(value["type"], json!("no_data"));
    }

    #[tokio::test]
    async fn unresolvable_queries_fail_distinctly() {
        let store = fixtures::sample();
        assert!(matches!(
            answer(&store, "   ", None).await,
            Err(AnalyticsError::InvalidQuery)
        ));
        assert!(matches!(
            answer(&store, "hello", None).await,
            Err(AnalyticsError::RegionNotIdentified)
        ));
        assert!(matches!(
            answer(&store, "status of kerala", None).await,
            Err(AnalyticsError::RegionNotFound { .. })
        ));
    }
}
