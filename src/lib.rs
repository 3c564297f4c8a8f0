use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;
pub mod visibility;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use auth::AuthUser; // The resolved authenticated user identity.
use routes::{authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point.
pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application. It aggregates all API paths and data schemas decorated with
/// the `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros. The
/// resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_posts, handlers::category_posts, handlers::post_detail,
        handlers::get_profile, handlers::user_posts, handlers::register_user,
        handlers::create_post, handlers::update_post, handlers::delete_post_confirm,
        handlers::delete_post, handlers::add_comment, handlers::update_comment,
        handlers::delete_comment_confirm, handlers::delete_comment,
        handlers::get_me, handlers::edit_profile, handlers::get_presigned_url
    ),
    components(
        schemas(
            models::User, models::Category, models::Post, models::Comment,
            models::PostSummary, models::PostPage, models::PostDetail,
            models::CategoryFeed, models::ProfileFeed,
            models::CreatePostRequest, models::UpdatePostRequest,
            models::CommentRequest, models::UpdateProfileRequest,
            models::RegisterUserRequest,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
        )
    ),
    tags(
        (name = "blog-portal", description = "Blog publishing API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all essential
/// application services and configuration, shared across all incoming
/// requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Storage Layer: Abstracts object storage access for post images.
    pub storage: StorageState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow handlers and extractors to selectively pull
// components from the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the authenticated route module.
///
/// *Mechanism*: It attempts to extract `AuthUser` from the request. Since
/// `AuthUser` implements `FromRequestParts`, if authentication (JWT
/// validation, DB lookup) fails, the extractor rejects the request with 401
/// before the handler runs. On success the request proceeds unchanged.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: Protected by the `auth_middleware`.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in
                // a tracing span carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: returns the x-request-id header
                // to the client and downstream services.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the `TraceLayer` span creation: extracts the `x-request-id`
/// header (if present) and includes it in the structured logging metadata
/// alongside the HTTP method and URI, so every log line for a single request
/// is correlated by a unique ID.
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
