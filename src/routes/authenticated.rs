use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Pages for any logged-in user. The `require_authenticated` route layer applied
/// in `create_router` redirects anonymous requests to the login page before
/// these handlers run.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /uzenetek
        // Contact messages, newest first.
        .route("/uzenetek", get(handlers::messages))
}
