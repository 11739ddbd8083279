//! HTTP adapter exposing a [`CabService`] over REST.
//!
//! # Endpoints
//!
//! - `PUT|POST /cabs/:id` - Create or replace a cab
//! - `GET /cabs/:id` - Fetch a cab
//! - `GET /cabs?latitude=&longitude=&radius=&limit=&unit=` - Proximity query
//! - `DELETE /cabs/:id` - Remove a cab
//! - `DELETE /cabs` - Remove every cab
//! - `GET /health` - Server health and version
//!
//! Errors come back as JSON `{"error": …}` bodies: `NotFound` maps to 404,
//! `BadParameter` to 400, anything else to 500. Malformed request
//! parameters are rejected here, before any backend sees them.

use crate::geo::{DistanceUnit, Location};
use crate::model::{Cab, CabId, ProximityQuery};
use crate::service::{CabService, ServiceError};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Error response body.
#[derive(Debug, serde::Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Proximity query parameters.
///
/// `latitude`, `longitude` and `radius` are required; `limit` and `unit`
/// fall back to the backend's defaults (8 results, meters).
#[derive(Debug, Deserialize)]
struct QueryParams {
    latitude: f64,
    longitude: f64,
    radius: f64,
    limit: Option<usize>,
    unit: Option<String>,
}

/// Build the REST router over the given backend.
///
/// Every response carries permissive CORS headers so browser dashboards
/// on other origins can call the API directly.
pub fn router(service: Arc<dyn CabService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/cabs/:id",
            get(get_cab)
                .put(upsert_cab)
                .post(upsert_cab)
                .delete(delete_cab),
        )
        .route("/cabs", get(query_cabs).delete(delete_all_cabs))
        .route("/health", get(health))
        .layer(cors)
        .with_state(service)
}

/// Serve the REST API until SIGINT/SIGTERM, then close the backend.
///
/// In-flight requests drain before the listener shuts down.
pub async fn serve(
    listener: TcpListener,
    service: Arc<dyn CabService>,
) -> std::io::Result<()> {
    let app = router(Arc::clone(&service));
    info!(addr = %listener.local_addr()?, "serving cab API");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.close();
    info!("backend closed, server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

fn error_response(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::BadParameter(_) => StatusCode::BAD_REQUEST,
        ServiceError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// PUT|POST /cabs/:id - Create or fully replace a cab.
///
/// A body without an id (or with the zero sentinel) gets the id from the
/// URL; a body id that contradicts the URL is rejected.
async fn upsert_cab(
    State(service): State<Arc<dyn CabService>>,
    Path(id): Path<u64>,
    Json(mut cab): Json<Cab>,
) -> Response {
    if cab.id.is_unset() {
        cab.id = CabId(id);
    }
    if cab.id != CabId(id) {
        return error_response(ServiceError::BadParameter(
            "cab id and URL mismatch".to_string(),
        ));
    }

    match service.upsert(cab) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /cabs/:id - Fetch a single cab.
async fn get_cab(
    State(service): State<Arc<dyn CabService>>,
    Path(id): Path<u64>,
) -> Response {
    match service.read(CabId(id)) {
        Ok(cab) => (StatusCode::OK, Json(cab)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /cabs - Proximity query; empty result is `[]`, not an error.
async fn query_cabs(
    State(service): State<Arc<dyn CabService>>,
    Query(params): Query<QueryParams>,
) -> Response {
    if params.radius < 0.0 {
        return error_response(ServiceError::BadParameter(
            "radius must be non-negative".to_string(),
        ));
    }
    let unit = match params.unit.as_deref() {
        None => None,
        Some(name) => match name.parse::<DistanceUnit>() {
            Ok(unit) => Some(unit),
            Err(err) => return error_response(ServiceError::BadParameter(err.to_string())),
        },
    };

    let mut query = ProximityQuery::new(
        Location::new(params.latitude, params.longitude),
        params.radius,
    );
    query.unit = unit;
    query.limit = params.limit;

    match service.query(query) {
        Ok(cabs) => (StatusCode::OK, Json(cabs)).into_response(),
        Err(err) => error_response(err),
    }
}

/// DELETE /cabs/:id - Remove a cab; 200 even if it was never present.
async fn delete_cab(
    State(service): State<Arc<dyn CabService>>,
    Path(id): Path<u64>,
) -> Response {
    match service.delete(CabId(id)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}

/// DELETE /cabs - Remove every cab.
async fn delete_all_cabs(State(service): State<Arc<dyn CabService>>) -> Response {
    match service.delete_all() {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /health - Liveness probe with the running version.
async fn health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "version": crate::VERSION,
        })),
    )
        .into_response()
}
