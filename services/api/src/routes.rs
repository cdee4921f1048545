use crate::infra::{region_table, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use fund_allocation::allocation::{
    AllocatedRegion, AllocationDiagnostic, AllocationEngine, RedistributionSummary, RegionRecord,
    Scenario,
};
use fund_allocation::analysis::{compare_scenarios, ScenarioComparison};
use fund_allocation::config::AllocationConfig;
use fund_allocation::equity::EquitySummary;
use fund_allocation::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct AllocationRequest {
    #[serde(default)]
    pub(crate) regions: Option<Vec<RegionRecord>>,
    #[serde(default)]
    pub(crate) regions_csv: Option<String>,
    #[serde(default)]
    pub(crate) scenario: Option<String>,
    #[serde(default)]
    pub(crate) config: Option<AllocationConfig>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AllocationResponse {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) scenario: Scenario,
    pub(crate) requested_scenario: String,
    pub(crate) redistribution: RedistributionSummary,
    pub(crate) diagnostics: Vec<AllocationDiagnostic>,
    pub(crate) equity: EquitySummary,
    pub(crate) rows: Vec<AllocatedRegion>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScenarioComparisonRequest {
    #[serde(default)]
    pub(crate) regions: Option<Vec<RegionRecord>>,
    #[serde(default)]
    pub(crate) regions_csv: Option<String>,
    /// Scenario labels; empty runs every named scenario.
    #[serde(default)]
    pub(crate) scenarios: Vec<String>,
    #[serde(default)]
    pub(crate) config: Option<AllocationConfig>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScenarioComparisonResponse {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) scenarios: Vec<ScenarioComparison>,
}

pub(crate) fn allocation_routes() -> axum::Router {
    axum::Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/allocations", post(allocation_endpoint))
        .route(
            "/api/v1/allocations/scenarios",
            post(scenario_comparison_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn allocation_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<AllocationRequest>,
) -> Result<Json<AllocationResponse>, AppError> {
    let AllocationRequest {
        regions,
        regions_csv,
        scenario,
        config,
    } = payload;

    let table = region_table(regions, regions_csv)?;
    let config = config.unwrap_or_else(|| state.allocation.as_ref().clone());
    let scenario = scenario.unwrap_or_else(|| Scenario::BaseCase.label().to_string());

    let outcome = AllocationEngine::new(config.clone()).allocate(&table, &scenario)?;
    let equity = EquitySummary::from_outcome(&outcome, &config.equity);

    Ok(Json(AllocationResponse {
        generated_at: Utc::now(),
        scenario: outcome.scenario,
        requested_scenario: outcome.requested_scenario,
        redistribution: outcome.redistribution,
        diagnostics: outcome.diagnostics,
        equity,
        rows: outcome.rows,
    }))
}

pub(crate) async fn scenario_comparison_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ScenarioComparisonRequest>,
) -> Result<Json<ScenarioComparisonResponse>, AppError> {
    let ScenarioComparisonRequest {
        regions,
        regions_csv,
        scenarios,
        config,
    } = payload;

    let table = region_table(regions, regions_csv)?;
    let scenarios = scenarios
        .iter()
        .map(|label| {
            Scenario::from_label(label)
                .ok_or_else(|| AppError::InvalidRequest(format!("unknown scenario '{label}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let config = config.unwrap_or_else(|| state.allocation.as_ref().clone());

    let comparisons = compare_scenarios(&AllocationEngine::new(config), &table, &scenarios)?;

    Ok(Json(ScenarioComparisonResponse {
        generated_at: Utc::now(),
        scenarios: comparisons,
    }))
}
