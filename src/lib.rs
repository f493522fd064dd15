use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod aggregator;
pub mod auth;
pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod views;

// Routing segregated by guard (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use views::{HtmlViews, RendererState, ViewRenderer};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "lotto.sid";

/// AppState
///
/// The single shared container handed to every handler: the store, the view
/// renderer and the loaded configuration. Cloned per request (all cheap clones).
#[derive(Clone)]
pub struct AppState {
    /// Query layer over the relational store.
    pub repo: RepositoryState,
    /// Turns a view name and data object into HTML.
    pub views: RendererState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets extractors and handlers pull single components out of AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for RendererState {
    fn from_ref(app_state: &AppState) -> RendererState {
        app_state.views.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the full routing tree: the three guarded route groups, static file
/// fallback, the optional base path prefix, server-side sessions and the
/// request-id/tracing stack.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let x_request_id = HeaderName::from_static("x-request-id");

    let app = Router::new()
        // Public Routes: no guard.
        .merge(public::public_routes())
        // Authenticated Routes: anonymous requests are redirected to /login.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_authenticated,
            )),
        )
        // Admin Routes: login first, then the admin role (403 otherwise).
        .nest(
            "/crud",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_admin,
            )),
        )
        // Static assets (css, images) for anything no route claimed.
        .fallback_service(ServeDir::new(&config.static_dir))
        .with_state(state);

    // `nest` rejects an empty prefix, so only wrap when one is configured.
    let app = if config.base_path.is_empty() {
        app
    } else {
        Router::new().nest(&config.base_path, app)
    };

    // Sessions live server-side; the cookie only carries the opaque id.
    let session_path = if config.base_path.is_empty() {
        "/".to_string()
    } else {
        config.base_path.clone()
    };
    // `load` validates the range; hand-built configs are clamped into it.
    let idle_hours = config
        .session_idle_hours
        .clamp(1, crate::config::MAX_SESSION_IDLE_HOURS);
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_path(session_path)
        .with_secure(config.session_secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::hours(idle_hours)));

    app.layer(session_layer).layer(
        ServiceBuilder::new()
            // Request ID Generation: a UUID per incoming request.
            .layer(SetRequestIdLayer::new(
                x_request_id.clone(),
                MakeRequestUuid,
            ))
            // Request Tracing: one span per request, carrying the request id.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // Request ID Propagation: echo x-request-id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, uri and the `x-request-id` assigned by
/// `SetRequestIdLayer`, so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
