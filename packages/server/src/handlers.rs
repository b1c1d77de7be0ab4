//! HTTP handler functions for the groundwater API.

use actix_web::{HttpResponse, http::header, web};
use chrono::Utc;
use ingres_ai::{
    AiError,
    insight::{Insight, parse_insight},
    prompt::compose_prompt,
};
use ingres_analytics::{
    AnalyticsError,
    comparison::{self, ComparisonRequest},
    critical::{self, CriticalRequest},
    export::{self, EncodedExport, ExportFilters},
    orchestrator, params,
    selector::{self, HistoricalFilters, LatestFilter},
};
use ingres_analytics_models::{ExportDataType, ExportFormat, QueryResult};
use ingres_server_models::{
    AiChatBody, AiChatResponse, ApiHealth, AskResponse, ChatQueryBody, CompareRegionsParams,
    CriticalUnitsParams, CurrentAssessmentParams, ExportParams, HistoricalDataParams,
    SimpleExportParams,
};

use crate::{
    AppState,
    error::{analytics_error, respond, upstream_error},
};

const GENERATION_DISABLED: &str = "Text generation is not configured";

/// Returns a required, non-blank string parameter.
fn required<'a>(name: &'static str, value: Option<&'a str>) -> Result<&'a str, AnalyticsError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(AnalyticsError::MissingParameter { name })
}

fn csv_attachment(filename: &str, body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(body)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/groundwater/current-assessment`
///
/// Lists each region's latest assessment.
pub async fn current_assessment(
    state: web::Data<AppState>,
    params: web::Query<CurrentAssessmentParams>,
) -> HttpResponse {
    let result = async {
        let filter = LatestFilter::parse(
            params.region_id.as_deref(),
            params.region_type.as_deref(),
            params.limit.as_deref(),
            params.offset.as_deref(),
        )?;
        selector::list_latest_assessments(state.store.as_ref(), &filter).await
    }
    .await;

    respond(result, "list current assessments")
}

/// `GET /api/groundwater/historical-data`
pub async fn historical_data(
    state: web::Data<AppState>,
    params: web::Query<HistoricalDataParams>,
) -> HttpResponse {
    let result = async {
        let region_id = params::require_region_id("region_id", params.region_id.as_deref())?;
        let filters = HistoricalFilters::parse(
            params.start_year.as_deref(),
            params.end_year.as_deref(),
            params.parameter_type.as_deref(),
            params.limit.as_deref(),
            params.offset.as_deref(),
        )?;
        selector::select_historical(state.store.as_ref(), region_id, &filters).await
    }
    .await;

    respond(result, "read historical data")
}

/// `GET /api/groundwater/compare-regions`
pub async fn compare_regions(
    state: web::Data<AppState>,
    params: web::Query<CompareRegionsParams>,
) -> HttpResponse {
    let result = async {
        let request = ComparisonRequest::parse(
            params.region_ids.as_deref(),
            params.year.as_deref(),
            params.parameters.as_deref(),
        )?;
        comparison::compare(state.store.as_ref(), &request).await
    }
    .await;

    respond(result, "compare regions")
}

/// `GET /api/groundwater/critical-units`
pub async fn critical_units(
    state: web::Data<AppState>,
    params: web::Query<CriticalUnitsParams>,
) -> HttpResponse {
    let result = async {
        let request = CriticalRequest::parse(
            params.stage.as_deref(),
            params.state_id.as_deref(),
            params.limit.as_deref(),
            params.offset.as_deref(),
        )?;
        critical::find_critical(state.store.as_ref(), &request).await
    }
    .await;

    respond(result, "list critical units")
}

/// `GET /api/groundwater/export`
///
/// CSV is returned as an attachment; `json` and `excel` as the structured
/// envelope, the latter tagged with `X-Export-Format: excel-json`.
pub async fn export(state: web::Data<AppState>, params: web::Query<ExportParams>) -> HttpResponse {
    let result = async {
        let format = params::parse_export_format(
            Some(required("format", params.format.as_deref())?),
            &[ExportFormat::Csv, ExportFormat::Json, ExportFormat::Excel],
            ExportFormat::Json,
        )?;
        let data_type = params::parse_export_data_type(
            Some(required("data_type", params.data_type.as_deref())?),
            &[
                ExportDataType::Assessments,
                ExportDataType::Historical,
                ExportDataType::Regions,
                ExportDataType::Critical,
            ],
            ExportDataType::Assessments,
        )?;
        let filters = ExportFilters::parse(
            params.region_ids.as_deref(),
            params.start_year.as_deref(),
            params.end_year.as_deref(),
            params.stage.as_deref(),
        )?;

        let rows = export::build_rows(state.store.as_ref(), data_type, &filters).await?;
        log::debug!("Exporting {} {data_type} rows as {format}", rows.len());
        Ok::<_, AnalyticsError>((format, export::encode(data_type, rows, format, Utc::now())?))
    }
    .await;

    match result {
        Ok((_, EncodedExport::Csv { filename, body })) => csv_attachment(&filename, body),
        Ok((ExportFormat::Excel, EncodedExport::Structured(envelope))) => HttpResponse::Ok()
            .insert_header(("X-Export-Format", "excel-json"))
            .json(envelope),
        Ok((_, EncodedExport::Structured(envelope))) => HttpResponse::Ok().json(envelope),
        Err(e) => analytics_error(&e, "export data"),
    }
}

/// `GET /api/groundwater/simple-export`
///
/// JSON is the bare row array; CSV an attachment named
/// `<type>_export.csv`.
pub async fn simple_export(
    state: web::Data<AppState>,
    params: web::Query<SimpleExportParams>,
) -> HttpResponse {
    let result = async {
        let format = params::parse_export_format(
            Some(required("format", params.format.as_deref())?),
            &[ExportFormat::Json, ExportFormat::Csv],
            ExportFormat::Json,
        )?;
        let data_type = params::parse_export_data_type(
            Some(required("type", params.data_type.as_deref())?),
            &[ExportDataType::Assessments, ExportDataType::Regions],
            ExportDataType::Assessments,
        )?;
        let region_id = params::optional_region_id(params.region_id.as_deref())?;

        let rows = export::build_simple_rows(state.store.as_ref(), data_type, region_id).await?;
        Ok::<_, AnalyticsError>((format, data_type, rows))
    }
    .await;

    match result {
        Ok((ExportFormat::Csv, data_type, rows)) => match export::encode_csv(&rows) {
            Ok(body) => csv_attachment(&format!("{}_export.csv", data_type.export_name()), body),
            Err(e) => analytics_error(&AnalyticsError::from(e), "export data"),
        },
        Ok((_, _, rows)) => HttpResponse::Ok().json(rows),
        Err(e) => analytics_error(&e, "export data"),
    }
}

async fn orchestrate(state: &AppState, body: &ChatQueryBody) -> Result<QueryResult, AnalyticsError> {
    let query = required("query", body.query.as_deref())?;
    orchestrator::answer(state.store.as_ref(), query, body.context.as_ref()).await
}

/// `POST /api/groundwater/chat-query`
///
/// Answers a free-text question from stored data.
pub async fn chat_query(
    state: web::Data<AppState>,
    body: web::Json<ChatQueryBody>,
) -> HttpResponse {
    respond(orchestrate(&state, &body).await, "answer query")
}

async fn generate(state: &AppState, query: &str, context: Option<&str>) -> Result<String, AiError> {
    let generator = state.generator.as_ref().ok_or_else(|| AiError::Config {
        message: GENERATION_DISABLED.to_string(),
    })?;
    generator.generate(&compose_prompt(query, context)).await
}

/// `POST /api/ai/chat`
///
/// Passes the question to the text-generation provider and returns the raw
/// text.
pub async fn ai_chat(state: web::Data<AppState>, body: web::Json<AiChatBody>) -> HttpResponse {
    let query = match required("query", body.query.as_deref()) {
        Ok(query) => query,
        Err(e) => return analytics_error(&e, "generate text"),
    };

    match generate(&state, query, body.context.as_deref()).await {
        Ok(text) => HttpResponse::Ok().json(AiChatResponse { text }),
        Err(e) => upstream_error(&e),
    }
}

/// `POST /api/groundwater/ask`
///
/// Answers from stored data, then asks the provider for an explanation with
/// stats and a chart, using the data summary as context. Generation
/// failures degrade to placeholder insight content.
pub async fn ask(state: web::Data<AppState>, body: web::Json<ChatQueryBody>) -> HttpResponse {
    let result = match orchestrate(&state, &body).await {
        Ok(result) => result,
        Err(e) => return analytics_error(&e, "answer query"),
    };

    let summary = result.response.summary.clone();
    let generated = generate(&state, &result.query, Some(summary.as_str())).await;
    let (insight, generation_error) = match generated {
        Ok(text) => (parse_insight(&text), None),
        Err(e) => {
            log::warn!("Falling back to placeholder insight: {e}");
            (Insight::placeholder(summary), Some(e.to_string()))
        }
    };

    HttpResponse::Ok().json(AskResponse {
        result,
        insight,
        generation_error,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test};
    use ingres_ai::providers::LlmProvider;
    use ingres_database::memory::fixtures;
    use serde_json::Value;

    use super::*;

    struct CannedProvider(Option<&'static str>);

    #[async_trait::async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn generate(&self, prompt: &str) -> Result<String, AiError> {
            assert!(prompt.contains("User query:"));
            self.0.map(ToString::to_string).ok_or_else(|| AiError::Provider {
                message: "quota exceeded".to_string(),
            })
        }
    }

    fn state(generator: Option<Arc<dyn LlmProvider>>) -> web::Data<AppState> {
        web::Data::new(AppState {
            store: Arc::new(fixtures::sample()),
            generator,
        })
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state).configure(crate::configure)).await
        };
    }

    async fn get_json(state: web::Data<AppState>, uri: &str) -> (u16, Value) {
        let app = app!(state);
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = resp.status().as_u16();
        (status, test::read_body_json(resp).await)
    }

    async fn post_json(state: web::Data<AppState>, uri: &str, body: Value) -> (u16, Value) {
        let app = app!(state);
        let req = test::TestRequest::post().uri(uri).set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status().as_u16();
        (status, test::read_body_json(resp).await)
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let (status, body) = get_json(state(None), "/api/health").await;
        assert_eq!(status, 200);
        assert_eq!(body["healthy"], true);
    }

    #[actix_web::test]
    async fn current_assessment_lists_latest_rows() {
        let (status, body) = get_json(
            state(None),
            "/api/groundwater/current-assessment?region_type=state",
        )
        .await;
        assert_eq!(status, 200);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["region"]["name"].as_str().unwrap())
            .collect();
        // 2023 rows first, then 2022.
        assert_eq!(names, ["Karnataka", "Punjab", "Rajasthan"]);
        assert_eq!(body[0]["assessment"]["stageOfExtraction"], "Semi-Critical");
    }

    #[actix_web::test]
    async fn historical_data_requires_region_id() {
        let (status, body) = get_json(state(None), "/api/groundwater/historical-data").await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "MISSING_REGION_ID");

        let (status, body) =
            get_json(state(None), "/api/groundwater/historical-data?region_id=abc").await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "INVALID_REGION_ID_FORMAT");

        let (status, body) =
            get_json(state(None), "/api/groundwater/historical-data?region_id=404").await;
        assert_eq!(status, 404);
        assert_eq!(body["code"], "REGION_NOT_FOUND");
    }

    #[actix_web::test]
    async fn historical_data_filters_by_parameter() {
        let (status, body) = get_json(
            state(None),
            "/api/groundwater/historical-data?region_id=1&parameter_type=recharge&limit=2",
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["region"]["name"], "Karnataka");
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][0]["parameterType"], "recharge");
    }

    #[actix_web::test]
    async fn compare_regions_reports_missing_ids() {
        let (status, body) = get_json(
            state(None),
            "/api/groundwater/compare-regions?region_ids=3,11,999&parameters=stage",
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["comparisonYear"], 2023);
        assert_eq!(body["requestedRegions"], 3);
        assert_eq!(body["regions"][0]["region"]["name"], "Kolar");
        assert!(body["regions"][0]["assessment"].get("annualRecharge").is_none());
        let missing: Vec<i64> = body["missingRegions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        assert_eq!(missing, [3, 999]);
    }

    #[actix_web::test]
    async fn compare_regions_rejects_bad_input() {
        let (status, body) = get_json(state(None), "/api/groundwater/compare-regions").await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "MISSING_REGION_IDS");

        let (status, body) = get_json(
            state(None),
            "/api/groundwater/compare-regions?region_ids=1&parameters=depth",
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "INVALID_PARAMETERS");
    }

    #[actix_web::test]
    async fn critical_units_default_and_state_filter() {
        let (status, body) = get_json(state(None), "/api/groundwater/critical-units").await;
        assert_eq!(status, 200);
        assert_eq!(body["criticalUnits"][0]["region"]["name"], "Punjab");
        assert_eq!(body["summary"]["totalCritical"], 4);
        assert_eq!(body["summary"]["totalOverExploited"], 2);

        let (status, body) =
            get_json(state(None), "/api/groundwater/critical-units?state_id=77").await;
        assert_eq!(status, 404);
        assert_eq!(body["code"], "STATE_NOT_FOUND");

        let (status, body) =
            get_json(state(None), "/api/groundwater/critical-units?stage=Safe").await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "INVALID_STAGE");
    }

    #[actix_web::test]
    async fn export_csv_is_an_attachment() {
        let app = app!(state(None));
        let req = test::TestRequest::get()
            .uri("/api/groundwater/export?format=csv&data_type=regions&region_ids=10,11")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);

        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"regions_"));
        assert!(disposition.ends_with(".csv\""));

        let body = test::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            ["id", "name", "type", "parentId", "code", "latitude", "longitude"]
        );
        assert_eq!(reader.records().count(), 2);
    }

    #[actix_web::test]
    async fn export_excel_is_tagged_json() {
        let app = app!(state(None));
        let req = test::TestRequest::get()
            .uri("/api/groundwater/export?format=excel&data_type=critical")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(resp.headers().get("X-Export-Format").unwrap(), "excel-json");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["exportType"], "critical_areas");
        assert_eq!(body["recordCount"], body["data"].as_array().unwrap().len());
        assert!(body["note"].is_string());
    }

    #[actix_web::test]
    async fn export_validates_required_parameters() {
        let (status, body) =
            get_json(state(None), "/api/groundwater/export?data_type=regions").await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "MISSING_FORMAT");

        let (status, body) = get_json(
            state(None),
            "/api/groundwater/export?format=xml&data_type=regions",
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "INVALID_FORMAT");

        let (status, body) = get_json(
            state(None),
            "/api/groundwater/export?format=json&data_type=regions&start_year=2024&end_year=2020",
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "INVALID_YEAR_RANGE");
    }

    #[actix_web::test]
    async fn simple_export_json_is_a_bare_array() {
        let (status, body) = get_json(
            state(None),
            "/api/groundwater/simple-export?format=json&type=assessments&region_id=11",
        )
        .await;
        assert_eq!(status, 200);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["regionName"] == "Kolar"));

        let (status, body) = get_json(
            state(None),
            "/api/groundwater/simple-export?format=excel&type=regions",
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "INVALID_FORMAT");
    }

    #[actix_web::test]
    async fn simple_export_csv_uses_type_filename() {
        let app = app!(state(None));
        let req = test::TestRequest::get()
            .uri("/api/groundwater/simple-export?format=csv&type=regions&region_id=12")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"regions_export.csv\""
        );
        let body = test::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("Mysuru"));
    }

    #[actix_web::test]
    async fn chat_query_answers_status() {
        let (status, body) = post_json(
            state(None),
            "/api/groundwater/chat-query",
            serde_json::json!({ "query": "What is the groundwater status in Karnataka?" }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["response"]["type"], "assessment_data");
        assert_eq!(
            body["response"]["summary"],
            "Karnataka has Semi-Critical groundwater extraction levels with 78% extraction ratio and stable trend as of 2023."
        );
    }

    #[actix_web::test]
    async fn chat_query_errors() {
        let (status, body) = post_json(
            state(None),
            "/api/groundwater/chat-query",
            serde_json::json!({ "query": "   " }),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "INVALID_QUERY");

        let (status, body) = post_json(
            state(None),
            "/api/groundwater/chat-query",
            serde_json::json!({ "query": "how is it going" }),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "REGION_NOT_FOUND");

        let (status, body) = post_json(
            state(None),
            "/api/groundwater/chat-query",
            serde_json::json!({ "query": "status", "context": { "region": "Atlantis" } }),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(body["code"], "REGION_NOT_FOUND");
    }

    #[actix_web::test]
    async fn ai_chat_without_provider_is_upstream_error() {
        let (status, body) = post_json(
            state(None),
            "/api/ai/chat",
            serde_json::json!({ "query": "hello" }),
        )
        .await;
        assert_eq!(status, 502);
        assert_eq!(body["code"], "UPSTREAM_ERROR");

        let (status, body) = post_json(state(None), "/api/ai/chat", serde_json::json!({})).await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "MISSING_QUERY");
    }

    #[actix_web::test]
    async fn ai_chat_returns_generated_text() {
        let provider: Arc<dyn LlmProvider> = Arc::new(CannedProvider(Some("Groundwater is low.")));
        let (status, body) = post_json(
            state(Some(provider)),
            "/api/ai/chat",
            serde_json::json!({ "query": "hello", "context": "none" }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["text"], "Groundwater is low.");
    }

    #[actix_web::test]
    async fn ask_parses_generated_insight() {
        let provider: Arc<dyn LlmProvider> = Arc::new(CannedProvider(Some(
            "Details.\n```json\n{\"explanation\": \"Kolar is stressed.\", \"stats\": [{\"label\": \"Ratio\", \"value\": 85}], \"chart\": {\"type\": \"line\", \"data\": [{\"name\": \"2023\", \"value\": 85}]}}\n```",
        )));
        let (status, body) = post_json(
            state(Some(provider)),
            "/api/groundwater/ask",
            serde_json::json!({ "query": "is it critical here", "context": { "location": "Kolar" } }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["result"]["response"]["type"], "critical_status");
        assert_eq!(body["insight"]["explanation"], "Kolar is stressed.");
        assert_eq!(body["insight"]["chart"]["type"], "line");
        assert_eq!(body["insight"]["placeholder"], false);
        assert!(body.get("generationError").is_none());
    }

    #[actix_web::test]
    async fn ask_degrades_to_placeholder_on_failure() {
        let provider: Arc<dyn LlmProvider> = Arc::new(CannedProvider(None));
        let (status, body) = post_json(
            state(Some(provider)),
            "/api/groundwater/ask",
            serde_json::json!({ "query": "status of Punjab" }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["insight"]["placeholder"], true);
        assert_eq!(
            body["insight"]["explanation"],
            body["result"]["response"]["summary"]
        );
        assert!(
            body["generationError"]
                .as_str()
                .unwrap()
                .contains("quota exceeded")
        );
    }

    #[actix_web::test]
    async fn ask_without_generator_uses_placeholder() {
        let (status, body) = post_json(
            state(None),
            "/api/groundwater/ask",
            serde_json::json!({ "query": "status of Punjab" }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["result"]["query"], "status of Punjab");

        let insight = &body["insight"];
        assert_eq!(insight["placeholder"], true);
        assert_eq!(insight["stats"][0]["label"], "Extraction Ratio");
        assert_eq!(insight["stats"][0]["value"], 92.0);
        assert_eq!(insight["chart"]["title"], "Demo: Extraction vs Recharge");
        assert!(
            body["generationError"]
                .as_str()
                .unwrap()
                .contains(GENERATION_DISABLED)
        );
    }
}
