//! metricgate-api — REST API for the metric gateway.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Whole catalogue (JSON, or text with `?format=text` / `Accept: text/plain`) |
//! | POST | `/metrics` | Push a batch (JSON array or text exposition) |
//! | GET | `/metrics/{name}` | One metric |
//! | DELETE | `/metrics/{name}` | Delete a metric, or samples matching the query labels; `__all` wipes |
//! | POST | `/metrics/{name}/increment` | Add 1 to the counter sample named by the query labels |
//! | POST | `/export` | Run one remote-write cycle now |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use metricgate_aggregator::CatalogueHandle;
use metricgate_export::Exporter;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub catalogue: CatalogueHandle,
    /// `None` when remote write is not configured.
    pub exporter: Option<Arc<Exporter>>,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/metrics",
            get(handlers::list_metrics).post(handlers::push_metrics),
        )
        .route(
            "/metrics/{name}",
            get(handlers::get_metric).delete(handlers::delete_metric),
        )
        .route("/metrics/{name}/increment", post(handlers::increment_metric))
        .route("/export", post(handlers::trigger_export))
        .with_state(state)
}
