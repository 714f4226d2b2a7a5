use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use services::{AppServices, PlanOverview, RebalanceError};
use study_core::document::PlanDocument;
use study_core::model::{PlanId, UserId};
use study_core::time::{parse_today_iso, today_session_index};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl From<RebalanceError> for AppError {
    fn from(err: RebalanceError) -> Self {
        match err {
            RebalanceError::NotFound(_) => Self::not_found(err.to_string()),
            RebalanceError::Conflict(_) => Self::conflict(err.to_string()),
            other => {
                tracing::error!(error = %other, "rebalance request failed");
                Self::internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceRequest {
    pub plan_id: String,
    pub user_id: String,
    #[serde(rename = "todayISO")]
    pub today_iso: String,
}

#[derive(Debug, Serialize)]
pub struct RebalanceResponse {
    pub plan: PlanDocument,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct PlanDetailResponse {
    pub plan: PlanDocument,
    pub version: u64,
    pub overview: PlanOverview,
}

fn parse_ids(plan_id: &str, user_id: &str) -> Result<(PlanId, UserId), AppError> {
    let plan_id = plan_id
        .parse::<PlanId>()
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    let user_id = user_id
        .parse::<UserId>()
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    Ok((plan_id, user_id))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(services: AppServices) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/plans/rebalance", post(rebalance_plan))
        .route("/api/plans/{id}", get(get_plan))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(services)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(services: AppServices, bind: &str, port: u16) -> Result<()> {
    let app = build_router(services);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("study-plan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("study-plan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn rebalance_plan(
    State(services): State<AppServices>,
    payload: Result<Json<RebalanceRequest>, JsonRejection>,
) -> Result<Json<RebalanceResponse>, AppError> {
    let Json(request) = payload?;
    let (plan_id, user_id) = parse_ids(&request.plan_id, &request.user_id)?;
    let today =
        parse_today_iso(&request.today_iso).map_err(|e| AppError::bad_request(e.to_string()))?;

    let outcome = services
        .rebalance()
        .rebalance_stored(&plan_id, &user_id, today)
        .await?;

    Ok(Json(RebalanceResponse {
        plan: PlanDocument::from(&outcome.plan),
    }))
}

async fn get_plan(
    State(services): State<AppServices>,
    Path(id): Path<String>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> Result<Json<PlanDetailResponse>, AppError> {
    let Query(owner) = query?;
    let (plan_id, user_id) = parse_ids(&id, &owner.user_id)?;

    let stored = services.rebalance().get_plan(&plan_id, &user_id).await?;
    let today_index = today_session_index(stored.plan.created_at(), services.clock().today());

    Ok(Json(PlanDetailResponse {
        plan: PlanDocument::from(&stored.plan),
        version: stored.version,
        overview: PlanOverview::from_plan(&stored.plan, today_index),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
