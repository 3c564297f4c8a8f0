use crate::{
    AppState,
    auth::{AuthUser, MaybeAuthUser},
    forms,
    models::{
        CategoryFeed, Comment, CommentRequest, CreatePostRequest, Post, PostDetail, PostPage,
        PresignedUrlRequest, PresignedUrlResponse, ProfileFeed, RegisterUserRequest,
        UpdatePostRequest, UpdateProfileRequest, User,
    },
    visibility,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// PageQuery
///
/// The accepted query parameter for paginated list endpoints. Used by Axum's
/// Query extractor to safely bind the page number.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    /// 1-based page number; absent or out-of-range values clamp to 1.
    pub page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// AuthProviderResponse
///
/// Minimal struct to deserialize the response from the external auth
/// provider's signup endpoint, capturing the newly created user's UUID.
#[derive(Deserialize)]
struct AuthProviderResponse {
    id: Uuid,
}

// --- Redirect Targets ---

// Ownership-check failures and successful mutations both answer with a
// redirect (303) to one of these, mirroring the render-or-redirect flow of a
// server-rendered app.
fn post_detail_redirect(post_id: Uuid) -> Response {
    Redirect::to(&format!("/posts/{}", post_id)).into_response()
}

fn profile_redirect(username: &str) -> Response {
    Redirect::to(&format!("/profiles/{}/posts", username)).into_response()
}

// --- Public Handlers ---

/// list_posts
///
/// [Public Route] The global feed: publicly visible posts, newest publication
/// first, comment-count annotated, 10 per page.
#[utoipa::path(
    get,
    path = "/posts",
    params(PageQuery),
    responses((status = 200, description = "A page of visible posts", body = PostPage))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Json<PostPage> {
    Json(state.repo.list_published_posts(query.page()).await)
}

/// category_posts
///
/// [Public Route] The feed of one published category. A missing and an
/// unpublished category are both answered with 404.
#[utoipa::path(
    get,
    path = "/categories/{slug}/posts",
    params(("slug" = String, Path, description = "Category slug"), PageQuery),
    responses(
        (status = 200, description = "Category and a page of its posts", body = CategoryFeed),
        (status = 404, description = "Category missing or unpublished")
    )
)]
pub async fn category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CategoryFeed>, StatusCode> {
    let category = state
        .repo
        .get_published_category(&slug)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    let posts = state
        .repo
        .list_category_posts(category.id, query.page())
        .await;
    Ok(Json(CategoryFeed { category, posts }))
}

/// post_detail
///
/// [Public Route] A single post with its comment thread. The visibility
/// predicate is evaluated against the explicit (optional) viewer: a hidden
/// post is 404 for everyone but its author, never a permission error.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post and comments", body = PostDetail),
        (status = 404, description = "Missing or not visible to this viewer")
    )
)]
pub async fn post_detail(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostDetail>, StatusCode> {
    let post = state.repo.get_post(id).await.ok_or(StatusCode::NOT_FOUND)?;

    if !visibility::is_visible_to(&post, viewer.viewer_id(), Utc::now()) {
        return Err(StatusCode::NOT_FOUND);
    }

    let comments = state.repo.get_post_comments(id).await;
    Ok(Json(PostDetail { post, comments }))
}

/// get_profile
///
/// [Public Route] A user's profile record by username.
#[utoipa::path(
    get,
    path = "/profiles/{username}",
    params(("username" = String, Path, description = "Profile username")),
    responses(
        (status = 200, description = "Profile", body = User),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, StatusCode> {
    match state.repo.get_user_by_username(&username).await {
        Some(user) => Ok(Json(user)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// user_posts
///
/// [Public Route] A user's post feed. Branches on viewer == profile owner:
/// the owner sees all of their posts (including unpublished and future-dated
/// ones), everyone else only the fully visible subset.
#[utoipa::path(
    get,
    path = "/profiles/{username}/posts",
    params(("username" = String, Path, description = "Profile username"), PageQuery),
    responses(
        (status = 200, description = "Profile and a page of their posts", body = ProfileFeed),
        (status = 404, description = "No such user")
    )
)]
pub async fn user_posts(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfileFeed>, StatusCode> {
    let profile = state
        .repo
        .get_user_by_username(&username)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let is_owner = viewer.viewer_id() == Some(profile.id);
    let posts = state
        .repo
        .list_user_posts(profile.id, is_owner, query.page())
        .await;

    Ok(Json(ProfileFeed { profile, posts }))
}

/// register_user
///
/// [Public Route] Handles initial user registration via the external auth
/// provider, then mirrors the returned canonical UUID into the local `users`
/// table so primary keys stay synchronized.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered", body = User),
        (status = 400, description = "Rejected by the auth provider"),
        (status = 422, description = "Validation errors")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Response {
    let errors = forms::validate_registration(&payload.username, &payload.email);
    if !errors.is_empty() {
        return forms::validation_response(errors);
    }

    let provider_url = match std::env::var("AUTH_PROVIDER_URL") {
        Ok(url) => url,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };
    let provider_key = match std::env::var("AUTH_PROVIDER_KEY") {
        Ok(key) => key,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    // Step 1: Call the external auth provider. The password goes there and
    // nowhere else.
    let client = reqwest::Client::new();
    let signup_url = format!("{}/auth/v1/signup", provider_url);

    let response = match client
        .post(signup_url)
        .header("apikey", provider_key)
        .header("Content-Type", "application/json")
        .json(&serde_json::json!({ "email": payload.email, "password": payload.password }))
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("auth provider signup error: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !response.status().is_success() {
        // Provider rejected the user (e.g., email already exists, weak password).
        return StatusCode::BAD_REQUEST.into_response();
    }

    // Step 2: Extract the canonical user ID from the external response.
    let provider_user = match response.json::<AuthProviderResponse>().await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("auth provider response error: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Step 3: Create the mirrored record in the local users table.
    let new_user = User {
        id: provider_user.id,
        username: payload.username,
        email: payload.email,
        first_name: None,
        last_name: None,
    };

    match state.repo.create_user(new_user).await {
        Some(created) => Json(created).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

// --- Authenticated Handlers ---

/// create_post
///
/// [Authenticated Route] Submits a new post. The author is taken from the
/// session identity, never from the payload. Success answers with a redirect
/// to the author's own profile feed; invalid data re-renders as 422 with
/// field errors.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 303, description = "Created; redirect to own profile"),
        (status = 422, description = "Validation errors")
    )
)]
pub async fn create_post(
    AuthUser { id, username }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Response {
    let mut errors = forms::validate_post(&payload.title, &payload.text);
    if state.repo.get_category(payload.category_id).await.is_none() {
        forms::add_error(&mut errors, "category", "unknown category");
    }
    if !errors.is_empty() {
        return forms::validation_response(errors);
    }

    match state.repo.create_post(payload, id).await {
        Some(_) => profile_redirect(&username),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// update_post
///
/// [Authenticated Route] Edits a post. The author-gated mutation pattern:
/// load, silently redirect non-authors to the detail view, validate, persist,
/// redirect to the detail view.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 303, description = "Redirect to the post detail"),
        (status = 404, description = "No such post"),
        (status = 422, description = "Validation errors")
    )
)]
pub async fn update_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Response {
    let post = match state.repo.get_post(id).await {
        Some(post) => post,
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    if post.author_id != user_id {
        return post_detail_redirect(id);
    }

    let mut errors = forms::validate_post_update(&payload);
    if let Some(category_id) = payload.category_id {
        if state.repo.get_category(category_id).await.is_none() {
            forms::add_error(&mut errors, "category", "unknown category");
        }
    }
    if !errors.is_empty() {
        return forms::validation_response(errors);
    }

    match state.repo.update_post(id, payload).await {
        Some(_) => post_detail_redirect(id),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// delete_post_confirm
///
/// [Authenticated Route] The read half of the delete flow: renders the
/// confirmation payload (the post itself) for the author, redirects anyone
/// else to the detail view. No state change.
#[utoipa::path(
    get,
    path = "/posts/{id}/delete",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Confirmation payload", body = Post),
        (status = 303, description = "Non-author; redirect to the post detail"),
        (status = 404, description = "No such post")
    )
)]
pub async fn delete_post_confirm(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    let post = match state.repo.get_post(id).await {
        Some(post) => post,
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    if post.author_id != user_id {
        return post_detail_redirect(id);
    }

    Json(post).into_response()
}

/// delete_post
///
/// [Authenticated Route] The write half of the delete flow. Deleting a post
/// also deletes its comments (the post exclusively owns them). Success
/// redirects to the author's own profile feed.
#[utoipa::path(
    post,
    path = "/posts/{id}/delete",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 303, description = "Deleted; redirect to own profile"),
        (status = 404, description = "No such post")
    )
)]
pub async fn delete_post(
    AuthUser { id: user_id, username }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    let post = match state.repo.get_post(id).await {
        Some(post) => post,
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    if post.author_id != user_id {
        return post_detail_redirect(id);
    }

    if state.repo.delete_post(id).await {
        profile_redirect(&username)
    } else {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// add_comment
///
/// [Authenticated Route] Posts a new comment on a post. Author and target
/// post are set from context; any author field in the payload is ignored.
/// Invalid text surfaces as a 422 instead of being silently dropped.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CommentRequest,
    responses(
        (status = 303, description = "Created; redirect to the post detail"),
        (status = 404, description = "No such post"),
        (status = 422, description = "Validation errors")
    )
)]
pub async fn add_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Response {
    if state.repo.get_post(post_id).await.is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let errors = forms::validate_comment(&payload.text);
    if !errors.is_empty() {
        return forms::validation_response(errors);
    }

    match state
        .repo
        .create_comment(post_id, user_id, payload.text)
        .await
    {
        Some(_) => post_detail_redirect(post_id),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// update_comment
///
/// [Authenticated Route] Edits a comment, addressed by a single consistent
/// comment identifier. Non-authors are silently redirected to the parent
/// post's detail view.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body = CommentRequest,
    responses(
        (status = 303, description = "Redirect to the parent post detail"),
        (status = 404, description = "No such comment"),
        (status = 422, description = "Validation errors")
    )
)]
pub async fn update_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CommentRequest>,
) -> Response {
    let comment = match state.repo.get_comment(id).await {
        Some(comment) => comment,
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    if comment.author_id != user_id {
        return post_detail_redirect(comment.post_id);
    }

    let errors = forms::validate_comment(&payload.text);
    if !errors.is_empty() {
        return forms::validation_response(errors);
    }

    match state.repo.update_comment(id, payload.text).await {
        Some(_) => post_detail_redirect(comment.post_id),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// delete_comment_confirm
///
/// [Authenticated Route] The read half of the comment delete flow: the
/// confirmation payload for the author, a redirect for anyone else.
#[utoipa::path(
    get,
    path = "/comments/{id}/delete",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Confirmation payload", body = Comment),
        (status = 303, description = "Non-author; redirect to the parent post detail"),
        (status = 404, description = "No such comment")
    )
)]
pub async fn delete_comment_confirm(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    let comment = match state.repo.get_comment(id).await {
        Some(comment) => comment,
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    if comment.author_id != user_id {
        return post_detail_redirect(comment.post_id);
    }

    Json(comment).into_response()
}

/// delete_comment
///
/// [Authenticated Route] The write half of the comment delete flow. Success
/// redirects to the parent post's detail view.
#[utoipa::path(
    post,
    path = "/comments/{id}/delete",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 303, description = "Deleted; redirect to the parent post detail"),
        (status = 404, description = "No such comment")
    )
)]
pub async fn delete_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    let comment = match state.repo.get_comment(id).await {
        Some(comment) => comment,
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    if comment.author_id != user_id {
        return post_detail_redirect(comment.post_id);
    }

    if state.repo.delete_comment(id).await {
        post_detail_redirect(comment.post_id)
    } else {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// get_me
///
/// [Authenticated Route] The authenticated user's own record.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Current user", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, StatusCode> {
    match state.repo.get_user(id).await {
        Some(user) => Ok(Json(user)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// edit_profile
///
/// [Authenticated Route] Binds the editable subset of User fields to the
/// session's own user; success redirects to the (possibly renamed) own
/// profile feed.
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 303, description = "Updated; redirect to own profile"),
        (status = 422, description = "Validation errors")
    )
)]
pub async fn edit_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Response {
    let errors = forms::validate_profile(&payload);
    if !errors.is_empty() {
        return forms::validation_response(errors);
    }

    match state.repo.update_profile(id, payload).await {
        Some(user) => profile_redirect(&user.username),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// get_presigned_url
///
/// [Authenticated Route] Generates a temporary, secure URL for direct
/// client-to-cloud upload of a post image. The URL is short-lived (10
/// minutes), constrained to the specified `file_type`, and uses a unique
/// object key.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses((status = 200, description = "URL", body = PresignedUrlResponse))
)]
pub async fn get_presigned_url(
    AuthUser { id: _user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> impl IntoResponse {
    // Generate a unique, structured object key (e.g., 'post-images/UUID.ext').
    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    let unique_id = Uuid::new_v4();
    let object_key = format!("post-images/{}.{}", unique_id, extension);

    match state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
    {
        Ok(url) => {
            let response = PresignedUrlResponse {
                upload_url: url,
                resource_key: object_key,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("storage error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed").into_response()
        }
    }
}
