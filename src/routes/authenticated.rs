use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has passed the
/// authentication layer: post submission and maintenance, commenting, profile
/// self-edit and the image upload pipeline.
///
/// Access Control Strategy:
/// Every handler here relies on the `AuthUser` extractor middleware layered
/// above this module, so each receives a validated identity used for the
/// author-gated checks. An ownership failure never surfaces as an error: the
/// handler answers with a silent redirect to the record's detail view.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me — the authenticated user's own record.
        // PUT /me — profile self-edit; redirects to the own profile feed.
        .route("/me", get(handlers::get_me).put(handlers::edit_profile))
        // POST /posts
        // Submits a new post. The author is resolved from the session.
        .route("/posts", post(handlers::create_post))
        // PUT /posts/{id}
        // Edits an own post. Non-authors are redirected to the detail view.
        .route("/posts/{id}", put(handlers::update_post))
        // GET /posts/{id}/delete — confirmation payload (no state change).
        // POST /posts/{id}/delete — commits the deletion, cascading comments.
        .route(
            "/posts/{id}/delete",
            get(handlers::delete_post_confirm).post(handlers::delete_post),
        )
        // POST /posts/{id}/comments
        // Posts a new comment; author and post keys are set server-side.
        .route("/posts/{id}/comments", post(handlers::add_comment))
        // PUT /comments/{id}
        // Edits an own comment, addressed by the comment id alone.
        .route("/comments/{id}", put(handlers::update_comment))
        // GET /comments/{id}/delete — confirmation payload.
        // POST /comments/{id}/delete — commits the deletion.
        .route(
            "/comments/{id}/delete",
            get(handlers::delete_comment_confirm).post(handlers::delete_comment),
        )
        // POST /upload/presigned
        // Generates a short-lived (10-minute) presigned URL so the client can
        // upload a post image directly to object storage, bypassing this
        // server.
        .route("/upload/presigned", post(handlers::get_presigned_url))
}
