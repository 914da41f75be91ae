//! HTTP server for job queries.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness plus index readiness |
//! | `POST` | `/api/job-query` | Answer a question against a résumé |
//!
//! # Error Contract
//!
//! All error responses share one shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `no_match` (422),
//! `internal` (500), `not_ready` (503). Messages never carry internal detail.
//! Bodies that are not valid JSON for the endpoint are `bad_request` too.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use job_match_core::models::FacetSummary;
use job_match_core::orchestrator::{QueryError, QueryOrchestrator, UNEXPECTED_MESSAGE};

use crate::config::Config;
use crate::migrate;
use crate::query_cmd::build_orchestrator;
use crate::resume::{ResumeSource, SqliteResumeStore};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<QueryOrchestrator>,
    pub resumes: Arc<dyn ResumeSource>,
}

/// Build the router over prepared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/job-query", post(handle_job_query))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = migrate::open_database(&config.index.path).await?;

    let orchestrator = build_orchestrator(config, pool.clone()).await?;
    let readiness = orchestrator.readiness().await?;
    if !readiness.ready {
        tracing::warn!(
            collection = %config.index.collection,
            "index is not ready; queries will fail until `jobmatch index build` completes"
        );
    }

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        resumes: Arc::new(SqliteResumeStore::new(pool)),
    };

    info!(
        bind = %config.server.bind,
        documents = readiness.document_count,
        "starting server"
    );
    println!("Job match server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    app_error(StatusCode::NOT_FOUND, "not_found", message)
}

fn internal() -> AppError {
    app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", UNEXPECTED_MESSAGE)
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match &err {
            QueryError::NotReady => {
                app_error(StatusCode::SERVICE_UNAVAILABLE, "not_ready", err.user_message())
            }
            QueryError::NoMatch => {
                app_error(StatusCode::UNPROCESSABLE_ENTITY, "no_match", err.user_message())
            }
            QueryError::Unexpected(e) => {
                error!(error = %e, "query failed");
                internal()
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    ready: bool,
    document_count: i64,
}

async fn handle_health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let readiness = state.orchestrator.readiness().await.map_err(|e| {
        error!(error = %e, "readiness check failed");
        internal()
    })?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ready: readiness.ready,
        document_count: readiness.document_count,
    }))
}

// ============ POST /api/job-query ============

/// Request body for `POST /api/job-query`. Inline `resume_text` wins over
/// `user_id` when both are given.
#[derive(Deserialize)]
pub struct JobQueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct JobQueryResponse {
    pub success: bool,
    pub query: String,
    pub response: String,
    pub total_matches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub job_data: FacetSummary,
}

async fn handle_job_query(
    State(state): State<AppState>,
    payload: Result<Json<JobQueryRequest>, JsonRejection>,
) -> Result<Json<JobQueryResponse>, AppError> {
    let Json(req) = payload?;
    let query = req.query.trim();
    if query.is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let inline = req
        .resume_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let user_id = req
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    let resume_text = match (inline, user_id) {
        (Some(text), _) => text.to_string(),
        (None, Some(user_id)) => state
            .resumes
            .resume_text(user_id)
            .await
            .map_err(|e| {
                error!(error = %e, "resume lookup failed");
                internal()
            })?
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| not_found("no valid resume found for this user"))?,
        (None, None) => return Err(bad_request("resume_text or user_id is required")),
    };

    let answer = state.orchestrator.try_process(query, &resume_text).await?;
    info!(total_matches = answer.job_data.total_matches, "job query served");

    Ok(Json(JobQueryResponse {
        success: true,
        query: query.to_string(),
        response: answer.response,
        total_matches: answer.job_data.total_matches,
        user_id: user_id.map(str::to_string),
        job_data: answer.job_data,
    }))
}
