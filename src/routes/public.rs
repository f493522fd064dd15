use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Pages that need no login: the landing page, the published results, the
/// contact form, and the login/registration flow itself.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; never touches the store.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(handlers::home))
        // GET /adatbazis
        // The 50 newest result rows (draw x number x prize).
        .route("/adatbazis", get(handlers::database))
        // GET/POST /kapcsolat
        // Contact form; POST stores the message and re-renders with the outcome.
        .route(
            "/kapcsolat",
            get(handlers::contact_form).post(handlers::send_message),
        )
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
}
