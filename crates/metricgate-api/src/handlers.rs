//! REST API handlers.
//!
//! Every read and write goes through the `CatalogueHandle`; handlers never
//! touch storage directly. Responses use the `{success, data, error}`
//! envelope, except the text exposition.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use metricgate_aggregator::AggregatorError;
use metricgate_core::{MetricInput, Rejection};
use metricgate_exposition::{parse_exposition, render_exposition};

use crate::ApiState;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// Bad names and filters are the caller's fault; anything else is ours.
fn catalogue_error(e: AggregatorError) -> Response {
    let status = match &e {
        AggregatorError::Invalid(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %e, "catalogue request failed");
    }
    error_response(&e.to_string(), status).into_response()
}

fn header_contains(headers: &HeaderMap, name: header::HeaderName, needle: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(needle))
}

/// Split a JSON push body (one metric or an array of them) into usable
/// inputs and per-item rejections.
fn json_batch(body: &serde_json::Value) -> (Vec<MetricInput>, Vec<Rejection>) {
    let items = match body {
        serde_json::Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };

    let mut batch = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for item in items {
        match MetricInput::from_json(item) {
            Ok(input) => batch.push(input),
            Err(e) => {
                let metric = item
                    .get("name")
                    .and_then(|n| n.as_str())
                    .unwrap_or_default()
                    .to_string();
                warn!(%metric, error = %e, "metric rejected");
                rejected.push(Rejection {
                    metric,
                    reason: e.to_string(),
                });
            }
        }
    }
    (batch, rejected)
}

// ── Catalogue ──────────────────────────────────────────────────

/// GET /metrics
pub async fn list_metrics(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let catalogue = match state.catalogue.snapshot().await {
        Ok(catalogue) => catalogue,
        Err(e) => return catalogue_error(e),
    };

    let wants_text = params.get("format").is_some_and(|f| f == "text")
        || header_contains(&headers, header::ACCEPT, "text/plain");
    if wants_text {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
            render_exposition(&catalogue),
        )
            .into_response();
    }

    ApiResponse::ok(catalogue).into_response()
}

/// GET /metrics/{name}
pub async fn get_metric(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.catalogue.get(&name).await {
        Ok(record) => ApiResponse::ok(record).into_response(),
        Err(e) => catalogue_error(e),
    }
}

/// POST /metrics
pub async fn push_metrics(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let (batch, mut rejected) = if header_contains(&headers, header::CONTENT_TYPE, "text/plain") {
        (parse_exposition(&body), Vec::new())
    } else {
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => json_batch(&value),
            Err(e) => {
                warn!(error = %e, "malformed push body");
                return error_response(&format!("invalid body: {e}"), StatusCode::BAD_REQUEST)
                    .into_response();
            }
        }
    };

    match state.catalogue.ingest(batch).await {
        Ok(mut report) => {
            rejected.append(&mut report.rejected);
            report.rejected = rejected;
            ApiResponse::ok(report).into_response()
        }
        Err(e) => catalogue_error(e),
    }
}

/// POST /metrics/{name}/increment
pub async fn increment_metric(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(labels): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match state.catalogue.increment(&name, labels).await {
        Ok(report) if report.metrics == 0 => {
            let reason = report
                .rejected
                .first()
                .map(|r| r.reason.clone())
                .unwrap_or_else(|| "increment rejected".to_string());
            error_response(&reason, StatusCode::BAD_REQUEST).into_response()
        }
        Ok(report) => ApiResponse::ok(report).into_response(),
        Err(e) => catalogue_error(e),
    }
}

/// DELETE /metrics/{name}
pub async fn delete_metric(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(filter): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match state.catalogue.delete(&name, filter).await {
        Ok(outcome) => ApiResponse::ok(outcome).into_response(),
        Err(e) => catalogue_error(e),
    }
}

// ── Export ─────────────────────────────────────────────────────

/// POST /export
pub async fn trigger_export(State(state): State<ApiState>) -> impl IntoResponse {
    let Some(exporter) = state.exporter.as_ref() else {
        return error_response("remote write is not configured", StatusCode::NOT_FOUND)
            .into_response();
    };
    match exporter.export().await {
        Ok(report) => ApiResponse::ok(report).into_response(),
        Err(e) => {
            error!(error = %e, "on-demand export failed");
            error_response(&e.to_string(), StatusCode::BAD_GATEWAY).into_response()
        }
    }
}
