use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in). These routes are read-only data access plus the
/// registration gateway.
///
/// Security Mandate:
/// Every feed here applies the static visibility filter (published post,
/// published category, publication time passed) in its repository query, and
/// the detail endpoint runs the visibility predicate against the explicit
/// optional viewer. Hidden records are indistinguishable from missing ones
/// (404) so their existence never leaks.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load
        // balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // New user creation via the external auth provider, mirrored into the
        // local users table.
        .route("/register", post(handlers::register_user))
        // GET /posts?page=...
        // The global feed of publicly visible posts, paginated (10 per page).
        .route("/posts", get(handlers::list_posts))
        // GET /posts/{id}
        // A single post with its comment thread. The visibility predicate
        // decides between 200 and 404, depending on who is looking.
        .route("/posts/{id}", get(handlers::post_detail))
        // GET /categories/{slug}/posts?page=...
        // The feed of a published category; missing and unpublished categories
        // are both 404.
        .route("/categories/{slug}/posts", get(handlers::category_posts))
        // GET /profiles/{username}
        // A user's public profile record.
        .route("/profiles/{username}", get(handlers::get_profile))
        // GET /profiles/{username}/posts?page=...
        // A user's post feed: all posts for the owner, visible ones for
        // everyone else.
        .route("/profiles/{username}/posts", get(handlers::user_posts))
}
