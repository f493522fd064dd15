use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// The draw administration panel, mounted at `/crud`. The `require_admin` route
/// layer sends anonymous requests to the login page and answers logged-in
/// non-admins with 403.
///
/// Deletes are GET requests so they work as plain links from the listing.
/// Every write redirects back to `/crud`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /crud
        // All draws with their numbers and prizes (in-memory join of three queries).
        .route("/", get(handlers::crud_list))
        // POST /crud/add
        // New draw from `ev` + `het`; both required.
        .route("/add", post(handlers::add_draw))
        // GET /crud/delete/{id}
        // Deletes the draw; numbers and prizes go with it (store cascade).
        .route("/delete/{id}", get(handlers::delete_draw))
        .route("/add-number/{id}", post(handlers::add_number))
        .route("/delete-number/{id}", get(handlers::delete_number))
        .route("/add-prize/{id}", post(handlers::add_prize))
        .route("/delete-prize/{id}", get(handlers::delete_prize))
}
