use crate::models::{
    Category, Comment, CreatePostRequest, PAGE_SIZE, Post, PostPage, PostSummary,
    UpdatePostRequest, UpdateProfileRequest, User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing the
/// handlers to interact with the data layer without knowing the specific
/// implementation (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's asynchronous task
/// boundaries.
///
/// Authorization note: the visibility filter for lists is applied here, inside
/// the queries; author-gated *mutations* are authorized in the handlers (load,
/// compare author, then persist), so the mutation methods themselves carry no
/// viewer parameter.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Feeds ---
    // Global feed: publicly visible posts only, newest publication first,
    // comment-count annotated, pages of PAGE_SIZE.
    async fn list_published_posts(&self, page: i64) -> PostPage;
    // Category feed: same visibility filter, restricted to one category.
    async fn list_category_posts(&self, category_id: Uuid, page: i64) -> PostPage;
    // Profile feed. `include_hidden` is true only when the viewer is the
    // profile owner, relaxing the visibility filter to all of their posts.
    async fn list_user_posts(&self, author_id: Uuid, include_hidden: bool, page: i64) -> PostPage;

    // --- Categories ---
    async fn get_category(&self, id: Uuid) -> Option<Category>;
    // Published categories only; an unpublished category is indistinguishable
    // from a missing one.
    async fn get_published_category(&self, slug: &str) -> Option<Category>;

    // --- Posts ---
    // Retrieval by id with the category's published flag joined in. No
    // visibility filter: the caller applies the visibility predicate.
    async fn get_post(&self, id: Uuid) -> Option<Post>;
    async fn create_post(&self, req: CreatePostRequest, author_id: Uuid) -> Option<Post>;
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> Option<Post>;
    // Deletes the post and all of its comments in one transaction.
    async fn delete_post(&self, id: Uuid) -> bool;

    // --- Comments ---
    async fn get_post_comments(&self, post_id: Uuid) -> Vec<Comment>;
    async fn get_comment(&self, id: i64) -> Option<Comment>;
    async fn create_comment(&self, post_id: Uuid, author_id: Uuid, text: String)
    -> Option<Comment>;
    async fn update_comment(&self, id: i64, text: String) -> Option<Comment>;
    async fn delete_comment(&self, id: i64) -> bool;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_user_by_username(&self, username: &str) -> Option<User>;
    async fn create_user(&self, user: User) -> Option<User>;
    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Option<User>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

// Shared SELECT list for feed rows: headline columns joined with the author's
// username and category slug, annotated with the comment count.
const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.title, u.username AS author_username, c.slug AS category_slug,
           p.image, p.pub_date, COUNT(cm.id) AS comment_count
    FROM posts p
    JOIN users u ON p.author_id = u.id
    JOIN categories c ON p.category_id = c.id
    LEFT JOIN comments cm ON cm.post_id = p.id
"#;

const SUMMARY_GROUP_ORDER: &str = r#"
    GROUP BY p.id, u.username, c.slug
    ORDER BY p.pub_date DESC
    LIMIT $1 OFFSET $2
"#;

// The static visibility filter applied to non-owner feed queries.
const VISIBLE_WHERE: &str =
    " WHERE p.is_published = true AND c.is_published = true AND p.pub_date <= NOW() ";

const POST_SELECT: &str = r#"
    SELECT p.id, p.author_id, p.category_id, p.title, p.text, p.image,
           p.pub_date, p.is_published, c.is_published AS category_is_published,
           p.created_at
    FROM posts p
    JOIN categories c ON p.category_id = c.id
"#;

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn offset(page: i64) -> i64 {
        (page.max(1) - 1) * PAGE_SIZE
    }

    /// Runs a (rows, count) query pair and assembles the page envelope.
    /// Database errors are logged and degrade to an empty page.
    async fn fetch_page(
        &self,
        rows_sql: &str,
        count_sql: &str,
        binds: &[Uuid],
        page: i64,
    ) -> PostPage {
        let page = page.max(1);

        let mut rows_query = sqlx::query_as::<_, PostSummary>(rows_sql)
            .bind(PAGE_SIZE)
            .bind(Self::offset(page));
        let mut count_query = sqlx::query_scalar::<_, i64>(count_sql);
        for bind in binds {
            rows_query = rows_query.bind(*bind);
            count_query = count_query.bind(*bind);
        }

        let items = match rows_query.fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("feed query error: {:?}", e);
                vec![]
            }
        };
        let total_items = match count_query.fetch_one(&self.pool).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("feed count error: {:?}", e);
                items.len() as i64
            }
        };

        PostPage::new(items, page, total_items)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_published_posts
    ///
    /// The global feed. The visibility conditions are applied statically in
    /// the WHERE clause; there is no owner relaxation here.
    async fn list_published_posts(&self, page: i64) -> PostPage {
        let rows_sql = format!("{SUMMARY_SELECT}{VISIBLE_WHERE}{SUMMARY_GROUP_ORDER}");
        let count_sql = format!(
            "SELECT COUNT(*) FROM posts p JOIN categories c ON p.category_id = c.id{VISIBLE_WHERE}"
        );
        self.fetch_page(&rows_sql, &count_sql, &[], page).await
    }

    /// list_category_posts
    ///
    /// The category feed. The caller has already resolved the category through
    /// `get_published_category`, but the full visibility filter is still
    /// applied here so a concurrently unpublished category leaks nothing.
    async fn list_category_posts(&self, category_id: Uuid, page: i64) -> PostPage {
        let rows_sql =
            format!("{SUMMARY_SELECT}{VISIBLE_WHERE} AND p.category_id = $3{SUMMARY_GROUP_ORDER}");
        let count_sql = format!(
            "SELECT COUNT(*) FROM posts p JOIN categories c ON p.category_id = c.id{VISIBLE_WHERE} AND p.category_id = $1"
        );
        self.fetch_page(&rows_sql, &count_sql, &[category_id], page)
            .await
    }

    /// list_user_posts
    ///
    /// The profile feed. For the owner (`include_hidden`) the visibility
    /// filter is dropped entirely: they see their unpublished and future-dated
    /// posts. Everyone else gets the same static filter as the global feed.
    async fn list_user_posts(&self, author_id: Uuid, include_hidden: bool, page: i64) -> PostPage {
        let (rows_sql, count_sql) = if include_hidden {
            (
                format!("{SUMMARY_SELECT} WHERE p.author_id = $3{SUMMARY_GROUP_ORDER}"),
                "SELECT COUNT(*) FROM posts p WHERE p.author_id = $1".to_string(),
            )
        } else {
            (
                format!("{SUMMARY_SELECT}{VISIBLE_WHERE} AND p.author_id = $3{SUMMARY_GROUP_ORDER}"),
                format!(
                    "SELECT COUNT(*) FROM posts p JOIN categories c ON p.category_id = c.id{VISIBLE_WHERE} AND p.author_id = $1"
                ),
            )
        };
        self.fetch_page(&rows_sql, &count_sql, &[author_id], page)
            .await
    }

    async fn get_category(&self, id: Uuid) -> Option<Category> {
        sqlx::query_as::<_, Category>(
            "SELECT id, title, slug, description, is_published FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_category error: {:?}", e);
            None
        })
    }

    /// get_published_category
    ///
    /// Retrieves a category *only* if it is published. Used by the category
    /// feed handler: a hidden category yields not-found.
    async fn get_published_category(&self, slug: &str) -> Option<Category> {
        sqlx::query_as::<_, Category>(
            r#"SELECT id, title, slug, description, is_published
               FROM categories WHERE slug = $1 AND is_published = true"#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_published_category error: {:?}", e);
            None
        })
    }

    /// get_post
    ///
    /// Retrieval of any post by ID with no visibility filter: the handler runs
    /// the visibility predicate (or the author check) on the result.
    async fn get_post(&self, id: Uuid) -> Option<Post> {
        let sql = format!("{POST_SELECT} WHERE p.id = $1");
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_post error: {:?}", e);
                None
            })
    }

    /// create_post
    ///
    /// Inserts a new post with the author taken from the session identity,
    /// then re-reads it through `get_post` to pick up the joined category flag.
    async fn create_post(&self, req: CreatePostRequest, author_id: Uuid) -> Option<Post> {
        let new_id = Uuid::new_v4();
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO posts (id, author_id, category_id, title, text, image,
                                  pub_date, is_published, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
               RETURNING id"#,
        )
        .bind(new_id)
        .bind(author_id)
        .bind(req.category_id)
        .bind(&req.title)
        .bind(&req.text)
        .bind(&req.image_key)
        .bind(req.pub_date)
        .bind(req.is_published)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(id) => self.get_post(id).await,
            Err(e) => {
                tracing::error!("create_post error: {:?}", e);
                None
            }
        }
    }

    /// update_post
    ///
    /// Uses the PostgreSQL `COALESCE` function to handle `Option<T>` fields,
    /// only updating a column if the corresponding field in `req` is `Some`.
    /// The author check happened in the handler before this call.
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> Option<Post> {
        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"UPDATE posts
               SET title = COALESCE($2, title),
                   text = COALESCE($3, text),
                   category_id = COALESCE($4, category_id),
                   pub_date = COALESCE($5, pub_date),
                   is_published = COALESCE($6, is_published),
                   image = COALESCE($7, image)
               WHERE id = $1
               RETURNING id"#,
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.text)
        .bind(req.category_id)
        .bind(req.pub_date)
        .bind(req.is_published)
        .bind(&req.image_key)
        .fetch_optional(&self.pool)
        .await;

        match updated {
            Ok(Some(id)) => self.get_post(id).await,
            Ok(None) => None,
            Err(e) => {
                tracing::error!("update_post error: {:?}", e);
                None
            }
        }
    }

    /// delete_post
    ///
    /// Deletes the post's comments and then the post inside one transaction,
    /// so no orphaned comments can remain. The schema's ON DELETE CASCADE
    /// covers the same invariant for out-of-band deletions.
    async fn delete_post(&self, id: Uuid) -> bool {
        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::error!("delete_post begin error: {:?}", e);
                return false;
            }
        };

        if let Err(e) = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
        {
            tracing::error!("delete_post comments error: {:?}", e);
            return false;
        }

        let deleted = match sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_post error: {:?}", e);
                return false;
            }
        };

        if deleted {
            tx.commit().await.is_ok()
        } else {
            let _ = tx.rollback().await;
            false
        }
    }

    /// get_post_comments
    ///
    /// Retrieves a post's comment thread, oldest first, with each author's
    /// username joined in.
    async fn get_post_comments(&self, post_id: Uuid) -> Vec<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"SELECT cm.id, cm.post_id, cm.author_id, cm.text, cm.created_at,
                      u.username AS author_username
               FROM comments cm
               JOIN users u ON cm.author_id = u.id
               WHERE cm.post_id = $1
               ORDER BY cm.created_at ASC"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_post_comments error: {:?}", e);
            vec![]
        })
    }

    async fn get_comment(&self, id: i64) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"SELECT cm.id, cm.post_id, cm.author_id, cm.text, cm.created_at,
                      u.username AS author_username
               FROM comments cm
               JOIN users u ON cm.author_id = u.id
               WHERE cm.id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_comment error: {:?}", e);
            None
        })
    }

    /// create_comment
    ///
    /// Inserts a new comment and immediately joins with `users` to return the
    /// enriched `Comment` model. Uses a CTE to perform the insert and join in
    /// one query. Author and post keys come from the arguments, never from
    /// client data.
    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: String,
    ) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"WITH inserted AS (
                   INSERT INTO comments (post_id, author_id, text, created_at)
                   VALUES ($1, $2, $3, NOW())
                   RETURNING id, post_id, author_id, text, created_at
               )
               SELECT i.id, i.post_id, i.author_id, i.text, i.created_at,
                      u.username AS author_username
               FROM inserted i JOIN users u ON i.author_id = u.id"#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(&text)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_comment error: {:?}", e);
            None
        })
    }

    async fn update_comment(&self, id: i64, text: String) -> Option<Comment> {
        let updated = sqlx::query_scalar::<_, i64>(
            "UPDATE comments SET text = $2 WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(&text)
        .fetch_optional(&self.pool)
        .await;

        match updated {
            Ok(Some(id)) => self.get_comment(id).await,
            Ok(None) => None,
            Err(e) => {
                tracing::error!("update_comment error: {:?}", e);
                None
            }
        }
    }

    async fn delete_comment(&self, id: i64) -> bool {
        match sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_comment error: {:?}", e);
                false
            }
        }
    }

    /// get_user
    ///
    /// Retrieves a user record; also the final verification step of the
    /// authentication extractor.
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, first_name, last_name FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user error: {:?}", e);
            None
        })
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, first_name, last_name FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user_by_username error: {:?}", e);
            None
        })
    }

    /// create_user
    ///
    /// Creates the mirroring user record after external auth signup success.
    async fn create_user(&self, user: User) -> Option<User> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, username, email, first_name, last_name)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, username, email, first_name, last_name"#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_user error: {:?}", e);
            None
        })
    }

    /// update_profile
    ///
    /// Full update of the editable profile fields for the session's own user.
    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Option<User> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET username = $2, email = $3, first_name = $4, last_name = $5
               WHERE id = $1
               RETURNING id, username, email, first_name, last_name"#,
        )
        .bind(id)
        .bind(&req.username)
        .bind(&req.email)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_profile error: {:?}", e);
            None
        })
    }
}
