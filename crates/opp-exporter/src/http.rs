//! HTTP surface of the exporter.
//!
//! ```text
//! GET /graph/{trace_id}?gateway=
//! GET /validate/{trace_id}?gateway=&kid=
//! GET /passport/{trace_id}?gateway=
//! GET /policy/{trace_id}?gateway=
//! GET /healthz
//! ```

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use opp_exporter_core::{Passport, PolicyReport};
use opp_exporter_gateway::Gateway;

use crate::error::ExportError;
use crate::exporter::{Exporter, GraphView, Health, ValidationReport};

/// Query-string parameters shared by the trace endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct TraceQuery {
    /// Gateway base URL overriding the configured default.
    pub gateway: Option<String>,
    /// Key id filter (validate only).
    pub kid: Option<String>,
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ExportError::Fetch(_) => (StatusCode::BAD_GATEWAY, "gateway fetch failed"),
            ExportError::MalformedBundle(_) => (StatusCode::BAD_GATEWAY, "malformed bundle"),
            ExportError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration error"),
        };
        warn!(status = status.as_u16(), error = %self, "query failed");
        (status, Json(json!({ "error": error, "detail": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ExportError>;

/// Build the router for an exporter.
pub fn router<G: Gateway + 'static>(exporter: Arc<Exporter<G>>) -> Router {
    Router::new()
        .route("/graph/{trace_id}", get(graph::<G>))
        .route("/validate/{trace_id}", get(validate::<G>))
        .route("/passport/{trace_id}", get(passport::<G>))
        .route("/policy/{trace_id}", get(policy::<G>))
        .route("/healthz", get(healthz::<G>))
        .with_state(exporter)
}

async fn graph<G: Gateway + 'static>(
    State(exporter): State<Arc<Exporter<G>>>,
    Path(trace_id): Path<String>,
    Query(query): Query<TraceQuery>,
) -> ApiResult<GraphView> {
    let view = exporter.graph(&trace_id, query.gateway.as_deref()).await?;
    Ok(Json(view))
}

async fn validate<G: Gateway + 'static>(
    State(exporter): State<Arc<Exporter<G>>>,
    Path(trace_id): Path<String>,
    Query(query): Query<TraceQuery>,
) -> ApiResult<ValidationReport> {
    let report = exporter
        .validate(&trace_id, query.gateway.as_deref(), query.kid.as_deref())
        .await?;
    Ok(Json(report))
}

async fn passport<G: Gateway + 'static>(
    State(exporter): State<Arc<Exporter<G>>>,
    Path(trace_id): Path<String>,
    Query(query): Query<TraceQuery>,
) -> ApiResult<Passport> {
    let passport = exporter
        .passport(&trace_id, query.gateway.as_deref())
        .await?;
    Ok(Json(passport))
}

async fn policy<G: Gateway + 'static>(
    State(exporter): State<Arc<Exporter<G>>>,
    Path(trace_id): Path<String>,
    Query(query): Query<TraceQuery>,
) -> ApiResult<PolicyReport> {
    let report = exporter.policy(&trace_id, query.gateway.as_deref()).await?;
    Ok(Json(report))
}

async fn healthz<G: Gateway + 'static>(State(exporter): State<Arc<Exporter<G>>>) -> Json<Health> {
    Json(exporter.health())
}
