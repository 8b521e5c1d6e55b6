//! Jobs HTTP Server.
//!
//! Thin axum boundary over the job service: submit analyses, poll status,
//! cancel, and fetch reports, artifacts and run history.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::models::{RunSummary, ServerConfig};
use crate::services::{
    AnalyzeRequest, CapabilityReport, JobService, JobStatusView, JobSummary, SubmitResponse,
};

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Response to a cancellation request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub job_id: Uuid,
    pub cancel_requested: bool,
}

/// Response carrying the generated report.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub job_id: Uuid,
    pub report_markdown: String,
}

/// Query parameters for the run-history lookup.
#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub repo_url: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

fn domain_error(e: &DomainError) -> ApiError {
    if e.is_not_found() {
        return api_error(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string());
    }
    match e {
        DomainError::ValidationFailed(_) => {
            api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
        }
        _ => {
            tracing::error!(error = %e, "request failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", e.to_string())
        }
    }
}

/// Unparseable ids cannot name a registered job.
fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        api_error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Job not found: {raw}"),
        )
    })
}

/// Build the router.
pub fn router(service: Arc<JobService>, enable_cors: bool) -> Router {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/tools", get(list_tools))
        .route("/api/v1/capabilities", get(list_capabilities))
        .route("/api/v1/analyze", post(submit_analysis))
        .route("/api/v1/jobs", get(list_jobs))
        .route("/api/v1/jobs/{id}", get(get_job))
        .route("/api/v1/jobs/{id}/cancel", post(cancel_job))
        .route("/api/v1/jobs/{id}/report", get(get_report))
        .route("/api/v1/jobs/{id}/artifacts/{name}", get(get_artifact))
        .route("/api/v1/runs", get(get_last_run))
        .with_state(service);

    if enable_cors {
        app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(TraceLayer::new_for_http())
    } else {
        app.layer(TraceLayer::new_for_http())
    }
}

/// Jobs HTTP Server.
pub struct JobsHttpServer {
    config: ServerConfig,
    service: Arc<JobService>,
}

impl JobsHttpServer {
    pub fn new(service: Arc<JobService>, config: ServerConfig) -> Self {
        Self { config, service }
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let app = router(self.service, self.config.enable_cors);

        tracing::info!("Analyzer HTTP server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

// Handler functions

async fn health_check() -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_tools(
    State(service): State<Arc<JobService>>,
) -> Json<std::collections::BTreeMap<String, bool>> {
    Json(service.tools().await)
}

async fn list_capabilities(State(service): State<Arc<JobService>>) -> Json<CapabilityReport> {
    Json(service.capabilities().await)
}

async fn submit_analysis(
    State(service): State<Arc<JobService>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(req) = body.map_err(|rejection| {
        api_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            rejection.body_text(),
        )
    })?;
    let accepted = service.submit(req).await.map_err(|e| domain_error(&e))?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

async fn list_jobs(State(service): State<Arc<JobService>>) -> Json<Vec<JobSummary>> {
    Json(service.list_jobs().await)
}

async fn get_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusView>, ApiError> {
    let id = parse_job_id(&id)?;
    service
        .status(id)
        .await
        .map(Json)
        .map_err(|e| domain_error(&e))
}

async fn cancel_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<CancelResponse>), ApiError> {
    let id = parse_job_id(&id)?;
    service.cancel(id).await.map_err(|e| domain_error(&e))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            job_id: id,
            cancel_requested: true,
        }),
    ))
}

async fn get_report(
    State(service): State<Arc<JobService>>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let id = parse_job_id(&id)?;
    let report_markdown = service.report(id).await.map_err(|e| domain_error(&e))?;
    Ok(Json(ReportResponse {
        job_id: id,
        report_markdown,
    }))
}

async fn get_artifact(
    State(service): State<Arc<JobService>>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let id = parse_job_id(&id)?;
    let bytes = service
        .artifact(id, &name)
        .await
        .map_err(|e| domain_error(&e))?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

async fn get_last_run(
    State(service): State<Arc<JobService>>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<RunSummary>, ApiError> {
    service.last_run(&query.repo_url).await.map(Json).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "No run recorded for this repository",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::JobStatus;

    #[test]
    fn test_domain_error_mapping() {
        let (status, body) = domain_error(&DomainError::JobNotFound(Uuid::nil()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");

        let (status, body) = domain_error(&DomainError::ValidationFailed("bad url".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "VALIDATION_ERROR");

        let (status, _) = domain_error(&DomainError::InvalidStateTransition {
            from: JobStatus::Succeeded,
            to: JobStatus::Running,
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bad_id_is_not_found() {
        let (status, _) = parse_job_id("not-a-uuid").unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(parse_job_id(&Uuid::new_v4().to_string()).is_ok());
    }

    #[test]
    fn test_cancel_response_serialization() {
        let json = serde_json::to_value(CancelResponse {
            job_id: Uuid::nil(),
            cancel_requested: true,
        })
        .unwrap();
        assert_eq!(json["cancel_requested"], true);
    }
}
