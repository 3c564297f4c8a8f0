use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use blog_portal::{
    AppState,
    auth::{AuthUser, MaybeAuthUser},
    config::AppConfig,
    handlers::{self, PageQuery},
    models::{
        Category, Comment, CommentRequest, CreatePostRequest, PAGE_SIZE, Post, PostDetail,
        PostPage, PostSummary, UpdatePostRequest, UpdateProfileRequest, User,
    },
    repository::Repository,
    storage::MockStorageService,
    visibility,
};
use chrono::{Duration, Utc};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};
use tokio::test;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// An in-memory implementation of the Repository trait backed by Mutex-guarded
// Vecs, so tests can assert on state after a handler ran (cascade deletes,
// unchanged records, comment counts).
pub struct MockRepository {
    users: Mutex<Vec<User>>,
    categories: Mutex<Vec<Category>>,
    posts: Mutex<Vec<Post>>,
    comments: Mutex<Vec<Comment>>,
    next_comment_id: AtomicI64,
}

impl MockRepository {
    fn new() -> Self {
        Self {
            users: Mutex::new(vec![]),
            categories: Mutex::new(vec![]),
            posts: Mutex::new(vec![]),
            comments: Mutex::new(vec![]),
            next_comment_id: AtomicI64::new(1),
        }
    }

    fn with_user(self, user: &User) -> Self {
        self.users.lock().unwrap().push(user.clone());
        self
    }

    fn with_category(self, category: &Category) -> Self {
        self.categories.lock().unwrap().push(category.clone());
        self
    }

    fn with_post(self, post: &Post) -> Self {
        self.posts.lock().unwrap().push(post.clone());
        self
    }

    fn summarize(&self, post: &Post) -> PostSummary {
        let users = self.users.lock().unwrap();
        let categories = self.categories.lock().unwrap();
        let comments = self.comments.lock().unwrap();
        PostSummary {
            id: post.id,
            title: post.title.clone(),
            author_username: users
                .iter()
                .find(|u| u.id == post.author_id)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            category_slug: categories
                .iter()
                .find(|c| c.id == post.category_id)
                .map(|c| c.slug.clone())
                .unwrap_or_default(),
            image: post.image.clone(),
            pub_date: post.pub_date,
            comment_count: comments.iter().filter(|c| c.post_id == post.id).count() as i64,
        }
    }

    fn paginate(&self, posts: Vec<Post>, page: i64) -> PostPage {
        let page = page.max(1);
        let mut items: Vec<PostSummary> = posts.iter().map(|p| self.summarize(p)).collect();
        items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        let total_items = items.len() as i64;
        let start = ((page - 1) * PAGE_SIZE) as usize;
        let sliced: Vec<PostSummary> = items
            .into_iter()
            .skip(start)
            .take(PAGE_SIZE as usize)
            .collect();
        PostPage::new(sliced, page, total_items)
    }

    fn visible_posts(&self) -> Vec<Post> {
        let now = Utc::now();
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| visibility::is_visible_to(p, None, now))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn list_published_posts(&self, page: i64) -> PostPage {
        self.paginate(self.visible_posts(), page)
    }

    async fn list_category_posts(&self, category_id: Uuid, page: i64) -> PostPage {
        let posts = self
            .visible_posts()
            .into_iter()
            .filter(|p| p.category_id == category_id)
            .collect();
        self.paginate(posts, page)
    }

    async fn list_user_posts(&self, author_id: Uuid, include_hidden: bool, page: i64) -> PostPage {
        let posts: Vec<Post> = if include_hidden {
            self.posts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.author_id == author_id)
                .cloned()
                .collect()
        } else {
            self.visible_posts()
                .into_iter()
                .filter(|p| p.author_id == author_id)
                .collect()
        };
        self.paginate(posts, page)
    }

    async fn get_category(&self, id: Uuid) -> Option<Category> {
        self.categories
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    async fn get_published_category(&self, slug: &str) -> Option<Category> {
        self.categories
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.slug == slug && c.is_published)
            .cloned()
    }

    async fn get_post(&self, id: Uuid) -> Option<Post> {
        self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned()
    }

    async fn create_post(&self, req: CreatePostRequest, author_id: Uuid) -> Option<Post> {
        let category_is_published = self
            .categories
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == req.category_id)
            .map(|c| c.is_published)?;
        let post = Post {
            id: Uuid::new_v4(),
            author_id,
            category_id: req.category_id,
            title: req.title,
            text: req.text,
            image: req.image_key,
            pub_date: req.pub_date,
            is_published: req.is_published,
            category_is_published,
            created_at: Utc::now(),
        };
        self.posts.lock().unwrap().push(post.clone());
        Some(post)
    }

    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> Option<Post> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts.iter_mut().find(|p| p.id == id)?;
        if let Some(title) = req.title {
            post.title = title;
        }
        if let Some(text) = req.text {
            post.text = text;
        }
        if let Some(category_id) = req.category_id {
            post.category_id = category_id;
        }
        if let Some(pub_date) = req.pub_date {
            post.pub_date = pub_date;
        }
        if let Some(is_published) = req.is_published {
            post.is_published = is_published;
        }
        if let Some(image_key) = req.image_key {
            post.image = Some(image_key);
        }
        Some(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> bool {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != id);
        let deleted = posts.len() < before;
        if deleted {
            self.comments.lock().unwrap().retain(|c| c.post_id != id);
        }
        deleted
    }

    async fn get_post_comments(&self, post_id: Uuid) -> Vec<Comment> {
        self.comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect()
    }

    async fn get_comment(&self, id: i64) -> Option<Comment> {
        self.comments
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: String,
    ) -> Option<Comment> {
        let author_username = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == author_id)
            .map(|u| u.username.clone());
        let comment = Comment {
            id: self.next_comment_id.fetch_add(1, Ordering::SeqCst),
            post_id,
            author_id,
            text,
            created_at: Utc::now(),
            author_username,
        };
        self.comments.lock().unwrap().push(comment.clone());
        Some(comment)
    }

    async fn update_comment(&self, id: i64, text: String) -> Option<Comment> {
        let mut comments = self.comments.lock().unwrap();
        let comment = comments.iter_mut().find(|c| c.id == id)?;
        comment.text = text;
        Some(comment.clone())
    }

    async fn delete_comment(&self, id: i64) -> bool {
        let mut comments = self.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|c| c.id != id);
        comments.len() < before
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    async fn create_user(&self, user: User) -> Option<User> {
        self.users.lock().unwrap().push(user.clone());
        Some(user)
    }

    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Option<User> {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.id == id)?;
        user.username = req.username;
        user.email = req.email;
        user.first_name = req.first_name;
        user.last_name = req.last_name;
        Some(user.clone())
    }
}

// --- TEST UTILITIES ---

fn test_user(username: &str) -> User {
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        first_name: None,
        last_name: None,
    }
}

fn test_category(slug: &str, is_published: bool) -> Category {
    Category {
        id: Uuid::new_v4(),
        title: slug.to_string(),
        slug: slug.to_string(),
        description: String::new(),
        is_published,
    }
}

fn test_post(author: &User, category: &Category, is_published: bool, hours_ago: i64) -> Post {
    Post {
        id: Uuid::new_v4(),
        author_id: author.id,
        category_id: category.id,
        title: "A post".to_string(),
        text: "Body".to_string(),
        image: None,
        pub_date: Utc::now() - Duration::hours(hours_ago),
        is_published,
        category_is_published: category.is_published,
        created_at: Utc::now(),
    }
}

fn auth(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        username: user.username.clone(),
    }
}

fn viewer(user: &User) -> MaybeAuthUser {
    MaybeAuthUser(Some(auth(user)))
}

fn anonymous() -> MaybeAuthUser {
    MaybeAuthUser(None)
}

fn page(n: i64) -> Query<PageQuery> {
    Query(PageQuery { page: Some(n) })
}

// Creates an AppState sharing the given mock, so tests can inspect the mock's
// state through `state.repo` after a handler ran.
fn state_with(repo: &Arc<MockRepository>) -> AppState {
    AppState {
        repo: repo.clone(),
        storage: Arc::new(MockStorageService::new()),
        config: AppConfig::default(),
    }
}

fn location_header(response: &Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .expect("expected a Location header")
        .to_str()
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- VISIBILITY / DETAIL TESTS ---

#[test]
async fn test_post_detail_visible_to_anonymous() {
    let author = test_user("alice");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_category(&category)
            .with_post(&post),
    );

    let result =
        handlers::post_detail(anonymous(), State(state_with(&repo)), Path(post.id)).await;

    let detail: PostDetail = body_json(result.unwrap().into_response()).await;
    assert_eq!(detail.post.id, post.id);
}

#[test]
async fn test_post_detail_unpublished_hidden_from_stranger() {
    let author = test_user("alice");
    let stranger = test_user("bob");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, false, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_user(&stranger)
            .with_category(&category)
            .with_post(&post),
    );

    let result =
        handlers::post_detail(viewer(&stranger), State(state_with(&repo)), Path(post.id)).await;
    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);

    let result = handlers::post_detail(anonymous(), State(state_with(&repo)), Path(post.id)).await;
    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_post_detail_future_post_visible_to_author_only() {
    let author = test_user("alice");
    let category = test_category("travel", true);
    // Scheduled 24h into the future.
    let post = test_post(&author, &category, true, -24);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_category(&category)
            .with_post(&post),
    );

    let result = handlers::post_detail(anonymous(), State(state_with(&repo)), Path(post.id)).await;
    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);

    let result =
        handlers::post_detail(viewer(&author), State(state_with(&repo)), Path(post.id)).await;
    let detail: PostDetail = body_json(result.unwrap().into_response()).await;
    assert_eq!(detail.post.title, post.title);
}

#[test]
async fn test_post_detail_unpublished_category_hides_post() {
    let author = test_user("alice");
    let stranger = test_user("bob");
    let category = test_category("drafts", false);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_user(&stranger)
            .with_category(&category)
            .with_post(&post),
    );

    let result =
        handlers::post_detail(viewer(&stranger), State(state_with(&repo)), Path(post.id)).await;
    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);

    // The author still sees it.
    let result =
        handlers::post_detail(viewer(&author), State(state_with(&repo)), Path(post.id)).await;
    assert!(result.is_ok());
}

// --- FEED TESTS ---

#[test]
async fn test_category_feed_unpublished_category_is_not_found() {
    let category = test_category("drafts", false);
    let repo = Arc::new(MockRepository::new().with_category(&category));

    let result = handlers::category_posts(
        State(state_with(&repo)),
        Path("drafts".to_string()),
        page(1),
    )
    .await;

    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_list_posts_never_exceeds_page_size() {
    let author = test_user("alice");
    let category = test_category("travel", true);
    let mut repo = MockRepository::new()
        .with_user(&author)
        .with_category(&category);
    for hour in 1..=13 {
        repo = repo.with_post(&test_post(&author, &category, true, hour));
    }
    let repo = Arc::new(repo);

    let first = handlers::list_posts(State(state_with(&repo)), page(1)).await.0;
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.total_items, 13);
    assert_eq!(first.total_pages, 2);
    // Ordered by publication time descending.
    assert!(
        first
            .items
            .windows(2)
            .all(|pair| pair[0].pub_date >= pair[1].pub_date)
    );

    let second = handlers::list_posts(State(state_with(&repo)), page(2)).await.0;
    assert_eq!(second.items.len(), 3);
}

#[test]
async fn test_profile_feed_owner_sees_hidden_posts() {
    let owner = test_user("alice");
    let stranger = test_user("bob");
    let category = test_category("travel", true);
    let visible = test_post(&owner, &category, true, 1);
    let unpublished = test_post(&owner, &category, false, 2);
    let future = test_post(&owner, &category, true, -24);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&owner)
            .with_user(&stranger)
            .with_category(&category)
            .with_post(&visible)
            .with_post(&unpublished)
            .with_post(&future),
    );

    let own = handlers::user_posts(
        viewer(&owner),
        State(state_with(&repo)),
        Path("alice".to_string()),
        page(1),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(own.posts.total_items, 3);

    let theirs = handlers::user_posts(
        viewer(&stranger),
        State(state_with(&repo)),
        Path("alice".to_string()),
        page(1),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(theirs.posts.total_items, 1);
    assert_eq!(theirs.posts.items[0].id, visible.id);
}

#[test]
async fn test_profile_feed_unknown_user_is_not_found() {
    let repo = Arc::new(MockRepository::new());

    let result = handlers::user_posts(
        anonymous(),
        State(state_with(&repo)),
        Path("nobody".to_string()),
        page(1),
    )
    .await;

    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
}

// --- POST MUTATION TESTS ---

#[test]
async fn test_create_post_redirects_to_own_profile() {
    let author = test_user("alice");
    let category = test_category("travel", true);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_category(&category),
    );

    let payload = CreatePostRequest {
        title: "Fresh".to_string(),
        text: "Body".to_string(),
        category_id: category.id,
        pub_date: Utc::now(),
        is_published: true,
        image_key: None,
    };
    let response = handlers::create_post(
        auth(&author),
        State(state_with(&repo)),
        axum::Json(payload),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&response), "/profiles/alice/posts");

    // The author was set from the session.
    let feed = repo.list_user_posts(author.id, true, 1).await;
    assert_eq!(feed.total_items, 1);
    assert_eq!(feed.items[0].author_username, "alice");
}

#[test]
async fn test_create_post_unknown_category_is_validation_error() {
    let author = test_user("alice");
    let repo = Arc::new(MockRepository::new().with_user(&author));

    let payload = CreatePostRequest {
        title: "Fresh".to_string(),
        text: "Body".to_string(),
        category_id: Uuid::new_v4(),
        pub_date: Utc::now(),
        is_published: true,
        image_key: None,
    };
    let response = handlers::create_post(
        auth(&author),
        State(state_with(&repo)),
        axum::Json(payload),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let errors: serde_json::Value = body_json(response).await;
    assert!(errors.get("category").is_some());
}

#[test]
async fn test_update_post_non_author_redirected_and_record_unchanged() {
    let author = test_user("alice");
    let intruder = test_user("mallory");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_user(&intruder)
            .with_category(&category)
            .with_post(&post),
    );

    let payload = UpdatePostRequest {
        title: Some("Hijacked".to_string()),
        ..UpdatePostRequest::default()
    };
    let response = handlers::update_post(
        auth(&intruder),
        State(state_with(&repo)),
        Path(post.id),
        axum::Json(payload),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&response), format!("/posts/{}", post.id));
    assert_eq!(repo.get_post(post.id).await.unwrap().title, "A post");
}

#[test]
async fn test_update_post_author_succeeds() {
    let author = test_user("alice");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_category(&category)
            .with_post(&post),
    );

    let payload = UpdatePostRequest {
        title: Some("Edited".to_string()),
        ..UpdatePostRequest::default()
    };
    let response = handlers::update_post(
        auth(&author),
        State(state_with(&repo)),
        Path(post.id),
        axum::Json(payload),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(repo.get_post(post.id).await.unwrap().title, "Edited");
}

#[test]
async fn test_delete_post_confirm_returns_post_without_deleting() {
    let author = test_user("alice");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_category(&category)
            .with_post(&post),
    );

    let response =
        handlers::delete_post_confirm(auth(&author), State(state_with(&repo)), Path(post.id))
            .await;

    assert_eq!(response.status(), StatusCode::OK);
    let confirmed: Post = body_json(response).await;
    assert_eq!(confirmed.id, post.id);
    // Read half of the flow: nothing was deleted.
    assert!(repo.get_post(post.id).await.is_some());
}

#[test]
async fn test_delete_post_cascades_comments() {
    let author = test_user("alice");
    let commenter = test_user("bob");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_user(&commenter)
            .with_category(&category)
            .with_post(&post),
    );
    repo.create_comment(post.id, commenter.id, "first".to_string())
        .await
        .unwrap();
    repo.create_comment(post.id, commenter.id, "second".to_string())
        .await
        .unwrap();

    let response =
        handlers::delete_post(auth(&author), State(state_with(&repo)), Path(post.id)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&response), "/profiles/alice/posts");
    assert!(repo.get_post(post.id).await.is_none());
    assert!(repo.get_post_comments(post.id).await.is_empty());
}

#[test]
async fn test_delete_post_non_author_redirected_and_post_survives() {
    let author = test_user("alice");
    let intruder = test_user("mallory");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_user(&intruder)
            .with_category(&category)
            .with_post(&post),
    );

    let response =
        handlers::delete_post(auth(&intruder), State(state_with(&repo)), Path(post.id)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&response), format!("/posts/{}", post.id));
    assert!(repo.get_post(post.id).await.is_some());
}

// --- COMMENT TESTS ---

#[test]
async fn test_add_comment_sets_author_from_session() {
    let author = test_user("alice");
    let commenter = test_user("bob");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_user(&commenter)
            .with_category(&category)
            .with_post(&post),
    );

    let response = handlers::add_comment(
        auth(&commenter),
        State(state_with(&repo)),
        Path(post.id),
        axum::Json(CommentRequest {
            text: "Nice trip".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&response), format!("/posts/{}", post.id));

    let comments = repo.get_post_comments(post.id).await;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author_id, commenter.id);
    assert_eq!(comments[0].author_username.as_deref(), Some("bob"));
}

#[test]
async fn test_add_comment_empty_text_is_validation_error() {
    let author = test_user("alice");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_category(&category)
            .with_post(&post),
    );

    let response = handlers::add_comment(
        auth(&author),
        State(state_with(&repo)),
        Path(post.id),
        axum::Json(CommentRequest {
            text: "   ".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(repo.get_post_comments(post.id).await.is_empty());
}

#[test]
async fn test_update_comment_non_author_redirected_and_unchanged() {
    let author = test_user("alice");
    let commenter = test_user("bob");
    let intruder = test_user("mallory");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_user(&commenter)
            .with_user(&intruder)
            .with_category(&category)
            .with_post(&post),
    );
    let comment = repo
        .create_comment(post.id, commenter.id, "original".to_string())
        .await
        .unwrap();

    let response = handlers::update_comment(
        auth(&intruder),
        State(state_with(&repo)),
        Path(comment.id),
        axum::Json(CommentRequest {
            text: "defaced".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&response), format!("/posts/{}", post.id));
    assert_eq!(repo.get_comment(comment.id).await.unwrap().text, "original");
}

#[test]
async fn test_delete_comment_flow() {
    let author = test_user("alice");
    let commenter = test_user("bob");
    let category = test_category("travel", true);
    let post = test_post(&author, &category, true, 1);
    let repo = Arc::new(
        MockRepository::new()
            .with_user(&author)
            .with_user(&commenter)
            .with_category(&category)
            .with_post(&post),
    );
    let comment = repo
        .create_comment(post.id, commenter.id, "to be removed".to_string())
        .await
        .unwrap();

    // Confirmation payload for the author, no state change.
    let response = handlers::delete_comment_confirm(
        auth(&commenter),
        State(state_with(&repo)),
        Path(comment.id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(repo.get_comment(comment.id).await.is_some());

    // Commit.
    let response =
        handlers::delete_comment(auth(&commenter), State(state_with(&repo)), Path(comment.id))
            .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&response), format!("/posts/{}", post.id));
    assert!(repo.get_comment(comment.id).await.is_none());
}

// --- PROFILE TESTS ---

#[test]
async fn test_edit_profile_redirects_to_renamed_profile() {
    let user = test_user("alice");
    let repo = Arc::new(MockRepository::new().with_user(&user));

    let response = handlers::edit_profile(
        auth(&user),
        State(state_with(&repo)),
        axum::Json(UpdateProfileRequest {
            username: "alice2".to_string(),
            email: "alice2@example.com".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&response), "/profiles/alice2/posts");
    assert_eq!(repo.get_user(user.id).await.unwrap().username, "alice2");
}

#[test]
async fn test_edit_profile_bad_email_is_validation_error() {
    let user = test_user("alice");
    let repo = Arc::new(MockRepository::new().with_user(&user));

    let response = handlers::edit_profile(
        auth(&user),
        State(state_with(&repo)),
        axum::Json(UpdateProfileRequest {
            username: "alice".to_string(),
            email: "not-an-email".to_string(),
            first_name: None,
            last_name: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(repo.get_user(user.id).await.unwrap().email, "alice@example.com");
}

// --- UPLOAD TESTS ---

#[test]
async fn test_get_presigned_url_for_post_image() {
    let user = test_user("alice");
    let repo = Arc::new(MockRepository::new().with_user(&user));

    let response = handlers::get_presigned_url(
        auth(&user),
        State(state_with(&repo)),
        axum::Json(blog_portal::models::PresignedUrlRequest {
            filename: "cover.jpg".to_string(),
            file_type: "image/jpeg".to_string(),
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body: blog_portal::models::PresignedUrlResponse = body_json(response).await;
    assert!(body.resource_key.starts_with("post-images/"));
    assert!(body.resource_key.ends_with(".jpg"));
    assert!(body.upload_url.contains(&body.resource_key));
}
