use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Fixed number of list items returned per paginated response.
pub const PAGE_SIZE: i64 = 10;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A registered author/commenter from the `users` table. The `username` is the
/// unique public handle used in profile URLs; the name fields are optional
/// display data.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Category
///
/// A named grouping of posts from the `categories` table. The `slug` is unique
/// and used in category feed URLs. An unpublished category hides every post in
/// it from non-authors, regardless of the posts' own flags.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub is_published: bool,
}

/// Post
///
/// A post record from the `posts` table, joined with its category's published
/// flag so the visibility rule can be evaluated without a second query.
///
/// A post is publicly visible only when `is_published`, the category is
/// published, and `pub_date` has passed; otherwise only its author sees it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    // FK to users.id (the author). Always set server-side from the session.
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub text: String,
    // Optional object key for an attached image (uploaded via the presigned flow).
    pub image: Option<String>,
    // Scheduled publication time. Future-dated posts stay author-only until then.
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    // Loaded via a JOIN with categories in every post query.
    pub category_is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Comment
///
/// A comment record from the `comments` table, augmented with the author's
/// username (a join operation).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // This field is loaded via a JOIN in the repository query.
    #[sqlx(default)]
    pub author_username: Option<String>,
}

/// PostSummary
///
/// A single row of a paginated feed: the post's headline data joined with the
/// author's username and category slug, annotated with its comment count.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub author_username: String,
    pub category_slug: String,
    pub image: Option<String>,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    pub comment_count: i64,
}

/// PostPage
///
/// The pagination envelope for post feeds. `page_size` is always `PAGE_SIZE`
/// (10); `total_pages` is derived from `total_items` and never zero, so an
/// empty feed still reports one (empty) page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostPage {
    pub items: Vec<PostSummary>,
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl PostPage {
    /// Builds the envelope for an already-sliced page of items.
    pub fn new(items: Vec<PostSummary>, page: i64, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            1
        } else {
            (total_items + PAGE_SIZE - 1) / PAGE_SIZE
        };
        Self {
            items,
            page,
            page_size: PAGE_SIZE,
            total_items,
            total_pages,
        }
    }
}

// --- Composite Response Schemas (Output) ---

/// PostDetail
///
/// The detail view payload: the full post plus its comment thread.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// CategoryFeed
///
/// Output of the category feed endpoint: the (published) category record and a
/// page of its visible posts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryFeed {
    pub category: Category,
    pub posts: PostPage,
}

/// ProfileFeed
///
/// Output of the profile feed endpoint: the profile owner and a page of their
/// posts. When the viewer is the owner the page includes unpublished and
/// future-dated posts; other viewers get only fully visible ones.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProfileFeed {
    pub profile: User,
    pub posts: PostPage,
}

// --- Request Payloads (Input Schemas) ---

/// CreatePostRequest
///
/// Input payload for submitting a new post (POST /posts). The author is never
/// part of the payload; it is resolved from the authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub text: String,
    pub category_id: Uuid,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    // Object key resulting from the presigned upload flow.
    pub image_key: Option<String>,
}

/// UpdatePostRequest
///
/// Partial update payload for modifying an existing post (PUT /posts/{id}).
/// Uses `Option<T>` for all fields so only provided fields are changed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub pub_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
}

/// CommentRequest
///
/// Input payload for creating or editing a comment. Only the text is
/// client-controlled; author and post foreign keys are set server-side, so any
/// extra fields in the submitted JSON are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentRequest {
    pub text: String,
}

/// UpdateProfileRequest
///
/// The editable subset of User fields for the profile self-edit endpoint
/// (PUT /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// RegisterUserRequest
///
/// Input payload for the public registration endpoint (POST /register).
/// The password is only passed through to the external auth provider and never
/// persisted or logged by this application.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL for a post image
/// (POST /upload/presigned).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "cover.jpg")]
    pub filename: String,
    /// The MIME type, used to constrain the upload to the allowed type.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// PresignedUrlResponse
///
/// Output schema containing the temporary URL for client-to-cloud file transfer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key where the file will be stored (referenced as the post's image).
    pub resource_key: String,
}
