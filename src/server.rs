use axum::{
    extract::Query,
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::app::session::{ContactSession, RunStatus, SessionState};
use crate::constants::{role_color, PROJECT_ROLES};
use crate::error::{ContactMapError, FetchError, Result};
use crate::infra::HubSpotClient;
use crate::metrics::PROXY_REQUESTS_TOTAL;
use crate::pipeline::{FilterCriteria, RunId};
use crate::types::EnrichedContact;

/// Shared handles for the HTTP handlers
pub struct AppState {
    pub hubspot: Arc<HubSpotClient>,
    pub session: ContactSession,
    pub metrics: Option<PrometheusHandle>,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "contact_map",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Credential-hiding passthrough of the HubSpot contacts page
async fn proxy_contacts(Extension(state): Extension<Arc<AppState>>) -> Response {
    counter!(PROXY_REQUESTS_TOTAL).increment(1);
    match state.hubspot.fetch_contacts_raw().await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!("Error proxying request to HubSpot: {}", e);
            proxy_error_response(&e)
        }
    }
}

/// Map a fetch failure onto the status/body shape the map frontend expects
pub fn proxy_error_response(e: &FetchError) -> Response {
    match e {
        FetchError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "HubSpot API error: 401", "message": e.to_string()})),
        )
            .into_response(),
        FetchError::Upstream { status, body } => {
            let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            let message = serde_json::from_str::<Value>(body)
                .unwrap_or_else(|_| Value::String(body.clone()));
            (
                code,
                Json(json!({"error": format!("HubSpot API error: {status}"), "message": message})),
            )
                .into_response()
        }
        FetchError::Transport(_) | FetchError::InvalidResponse(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal Server Error", "message": e.to_string()})),
        )
            .into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub roles: Option<String>,
    pub location: Option<String>,
}

#[derive(Serialize)]
struct ContactMarker<'a> {
    #[serde(flatten)]
    contact: &'a EnrichedContact,
    marker_color: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
    unauthorized: bool,
}

#[derive(Serialize)]
struct ContactsView<'a> {
    run_id: RunId,
    status: RunStatus,
    total: Option<usize>,
    loaded: usize,
    visible: usize,
    error: Option<ErrorBody>,
    updated_at: chrono::DateTime<chrono::Utc>,
    filters: &'a FilterCriteria,
    contacts: Vec<ContactMarker<'a>>,
}

/// Serialize the derived view of a session state
pub fn render_view(state: &SessionState, criteria: &FilterCriteria) -> serde_json::Result<Value> {
    let contacts: Vec<ContactMarker> = state
        .view(criteria)
        .into_iter()
        .map(|c| ContactMarker { contact: c, marker_color: c.marker_color() })
        .collect();
    serde_json::to_value(ContactsView {
        run_id: state.run_id,
        status: state.status,
        total: state.total,
        loaded: state.contacts.len(),
        visible: contacts.len(),
        error: state.error.as_ref().map(|e| ErrorBody {
            kind: e.kind(),
            message: e.to_string(),
            unauthorized: e.is_unauthorized(),
        }),
        updated_at: state.updated_at,
        filters: criteria,
        contacts,
    })
}

/// Filtered contacts for the map
async fn contacts_view(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Response {
    let criteria = FilterCriteria::from_parts(query.roles.as_deref(), query.location.as_deref());
    let snapshot = state.session.snapshot();
    match render_view(&snapshot, &criteria) {
        Ok(body) => Json(body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Start a fresh fetch, superseding whatever is loading
async fn refresh_contacts(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let run_id = state.session.refresh();
    (StatusCode::ACCEPTED, Json(json!({ "run_id": run_id })))
}

/// Role legend
async fn roles() -> impl IntoResponse {
    let roles: Vec<Value> = PROJECT_ROLES
        .iter()
        .map(|r| json!({"role": r, "color": role_color(r)}))
        .collect();
    Json(json!({ "roles": roles }))
}

async fn render_metrics(Extension(state): Extension<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Create the HTTP server with all routes
pub fn create_server(state: Arc<AppState>, allowed_origin: &str) -> Result<Router> {
    let origin = allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ContactMapError::Config(format!("invalid allowed_origin: {e}")))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/health", get(health))
        .route("/api/hubspot/contacts", get(proxy_contacts))
        .route("/api/contacts", get(contacts_view))
        .route("/api/contacts/refresh", post(refresh_contacts))
        .route("/api/roles", get(roles))
        .route("/metrics", get(render_metrics))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Start the HTTP server on the specified port
pub async fn start_server(app: Router, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("🚀 Proxy server running on http://localhost:{port}");
    info!("💚 Health check: http://localhost:{port}/health");
    info!("🗺️  Contacts:     http://localhost:{port}/api/contacts");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ContactMapError::Server(e.to_string()))
}
