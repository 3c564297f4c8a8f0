use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Post;

/// is_visible_to
///
/// The single visibility rule for posts, shared by the detail handler and the
/// tests. A post is publicly visible when it is published, its category is
/// published, and its publication time has passed. Otherwise it is visible
/// only to its author.
///
/// The viewer is passed explicitly (`None` for anonymous requests) so the rule
/// stays a pure function of its inputs. Callers that gate retrieval on this
/// predicate must answer a failed check with *not-found*, never with a
/// permission error: the existence of a hidden post is itself hidden.
pub fn is_visible_to(post: &Post, viewer: Option<Uuid>, now: DateTime<Utc>) -> bool {
    if post.is_published && post.category_is_published && post.pub_date <= now {
        return true;
    }
    viewer == Some(post.author_id)
}
