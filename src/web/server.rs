use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::Config;
use crate::dashboard::{CircuitDetail, CircuitListing, Dashboard, RecommendationOutcome};
use crate::error::{ApiError, ApiResult};
use crate::filter::CircuitFilter;
use crate::record::{CircuitRecord, FieldAccess, CIRCUIT_ID};

/// Web UI server - circuit risk dashboard
/// Table of scored circuits with filters, a KPI detail panel and on-demand AI advice
pub struct WebServer {
    dashboard: Arc<Dashboard>,
    config: Arc<Config>,
}

#[derive(Clone)]
struct AppState {
    dashboard: Arc<Dashboard>,
}

#[derive(Deserialize)]
struct KpiQuery {
    circuit_id: Option<String>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    circuit_id: Option<String>,
    limit: Option<usize>,
}

impl WebServer {
    pub fn new(dashboard: Arc<Dashboard>, config: Arc<Config>) -> Self {
        Self { dashboard, config }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            dashboard: self.dashboard.clone(),
        };

        Router::new()
            .route("/", get(dashboard_page))
            .route("/api/health", get(api_health))
            .route("/api/circuits", get(api_circuits))
            .route("/api/circuits/:id", get(api_circuit))
            .route("/api/circuits/:id/recommendation", post(api_recommend))
            .route("/api/kpis", get(api_kpis))
            .route("/api/recommendations", get(api_history))
            .route("/api/reload", post(api_reload))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        if !self.config.web.enabled {
            info!("Web UI disabled");
            return Ok(());
        }

        let addr = format!("{}:{}", self.config.web.address, self.config.web.port);
        info!("🌐 Web UI listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// Dashboard HTML - embedded single-page app
async fn dashboard_page() -> Html<&'static str> {
    Html(include_str!("../../static/dashboard.html"))
}

async fn api_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.dashboard.get_stats())
}

/// Scored circuits with region / SLA / risk filters
async fn api_circuits(
    State(state): State<AppState>,
    Query(filter): Query<CircuitFilter>,
) -> ApiResult<Json<CircuitListing>> {
    if let Some(min_risk) = filter.min_risk {
        if !(0.0..=100.0).contains(&min_risk) {
            return Err(ApiError::BadRequest(format!(
                "min_risk must be between 0 and 100, got {}",
                min_risk
            )));
        }
    }
    Ok(Json(state.dashboard.list(&filter)))
}

async fn api_circuit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CircuitDetail>> {
    state
        .dashboard
        .circuit(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("circuit '{}' not found", id)))
}

async fn api_recommend(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecommendationOutcome>> {
    state
        .dashboard
        .recommend(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("circuit '{}' not found", id)))
}

/// KPI readings, optionally for one circuit
async fn api_kpis(
    State(state): State<AppState>,
    Query(params): Query<KpiQuery>,
) -> Json<serde_json::Value> {
    let dataset = state.dashboard.provider.fetch_kpis().await;
    let readings: Vec<CircuitRecord> = match params.circuit_id.as_deref() {
        Some(id) if !id.is_empty() => dataset
            .rows
            .into_iter()
            .filter(|r| r.text(CIRCUIT_ID).as_deref() == Some(id))
            .collect(),
        _ => dataset.rows,
    };
    Json(serde_json::json!({
        "source": dataset.source,
        "count": readings.len(),
        "readings": readings,
    }))
}

async fn api_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(20);
    let entries = state
        .dashboard
        .history
        .search(params.circuit_id.as_deref(), limit);
    Json(serde_json::json!({
        "entries": entries,
        "stats": state.dashboard.history.get_stats(),
    }))
}

async fn api_reload(State(state): State<AppState>) -> Json<serde_json::Value> {
    let dataset = state.dashboard.reload().await;
    Json(serde_json::json!({
        "source": dataset.source,
        "circuits": dataset.len(),
    }))
}
