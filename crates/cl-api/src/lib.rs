//! # cl-api
//!
//! The JSON-over-HTTP surface for crumblog.

pub mod error;
pub mod handlers;
pub mod middleware;

use axum::routing::{get, post, put};
use axum::Router;

pub use error::ApiError;
pub use handlers::AppState;

/// Builds the full application router.
///
/// # Developer Note
/// Returned as a plain `Router` so the binary can nest it under a prefix
/// (e.g. `/api/v1/`) if needed.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Catalog and composed views
        .route("/breads", get(handlers::list_breads))
        .route("/breads/featured", get(handlers::featured_bread))
        .route("/breads/new", get(handlers::new_breads))
        .route("/breads/meta", get(handlers::catalog_meta))
        .route("/breads/{id}", get(handlers::view_bread))
        // Ratings
        .route("/breads/{id}/ratings", post(handlers::rate_bread))
        .route("/breads/{id}/ratings/{user_id}", get(handlers::user_rating))
        // Moderation queue
        .route(
            "/submissions",
            post(handlers::submit_recipe).get(handlers::list_submissions),
        )
        .route("/submissions/{id}", get(handlers::get_submission))
        .route("/submissions/{id}/approve", post(handlers::approve_submission))
        .route("/submissions/{id}/reject", post(handlers::reject_submission))
        // Accounts
        .route("/users", post(handlers::register))
        .route("/sessions", post(handlers::login))
        .route("/users/{id}", get(handlers::get_user))
        .route(
            "/users/{id}/favorites/{bread_id}",
            put(handlers::add_favorite).delete(handlers::remove_favorite),
        )
        .with_state(state)
        .layer(middleware::cors_policy())
        .layer(middleware::trace_layer())
}
