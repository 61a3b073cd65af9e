#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::info;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::access::FixedIdentity;
use crate::dashboard::DashboardService;
use crate::error::DashError;

/// Header carrying the caller's email, set by the fronting proxy.
pub const IDENTITY_HEADER: &str = "x-user-email";

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct SubmitRequest {
    code: String,
}

fn identity_from(headers: &HeaderMap) -> FixedIdentity {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(FixedIdentity::new)
        .unwrap_or_else(FixedIdentity::anonymous)
}

fn error_status(error: &DashError) -> StatusCode {
    match error {
        DashError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        DashError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DashError::SourceNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn router(service: Arc<DashboardService>) -> Router {
    Router::new()
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/search", get(search))
        .route("/api/submit", post(submit))
        .route("/api/access", get(access))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

pub async fn run(service: Arc<DashboardService>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = service.config().bind_addr.clone();
    let app = router(service);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_dashboard(
    State(service): State<Arc<DashboardService>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let who = identity_from(&headers);
    Json(service.get_dashboard_data(&who))
}

async fn search(
    State(service): State<Arc<DashboardService>>,
    Query(params): Query<SearchQuery>,
) -> impl IntoResponse {
    Json(service.search_campaign_by_type(&params.q))
}

async fn submit(
    State(service): State<Arc<DashboardService>>,
    headers: HeaderMap,
    Json(payload): Json<SubmitRequest>,
) -> Response {
    let who = identity_from(&headers);
    match service.submit_entry(&who, &payload.code) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => (
            error_status(&e),
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn access(
    State(service): State<Arc<DashboardService>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let who = identity_from(&headers);
    Json(serde_json::json!({ "hasAccess": service.has_access(&who) }))
}
