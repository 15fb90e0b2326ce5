//! Store access layer
//!
//! - `FeedStore` is the seam every service talks to.
//! - `PgStore` implements it over PostgreSQL with sqlx.
//! - `MemoryStore` implements it in-process for the test suites; it is only
//!   compiled for tests or with the `test-support` feature.
//!
//! Creates that may collide with a uniqueness constraint return `Option`:
//! `None` means the edge already existed and nothing was written.
//!
//! Writes that owe the recipient a notification take it as an argument. The
//! edge and the notification commit together or not at all, and a duplicate
//! edge writes neither. A missing user or post surfaces as `NotFound`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Comment, Follow, Like, NewComment, NewNotification, Notification, Post, PostChanges,
    SavedPost, User,
};

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Row filter applied to the posts relation by the feed composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    /// Every post
    All,
    /// Posts whose author is in the set
    AuthorIn(Vec<Uuid>),
    /// Posts whose author is not in the set
    AuthorNotIn(Vec<Uuid>),
    /// Posts bookmarked by the user
    SavedBy(Uuid),
    /// Case-sensitive substring over caption, location, author username and full name
    Search(String),
}

#[async_trait]
pub trait FeedStore: Send + Sync {
    // Users & posts

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Fetch several users at once; missing ids are skipped
    async fn find_users(&self, user_ids: &[Uuid]) -> Result<Vec<User>>;

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>>;

    /// Posts matching `filter`, newest first, ties in stable order
    async fn query_posts(&self, filter: &PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>>;

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64>;

    /// Apply owner edits; `None` when the post no longer exists
    async fn update_post(&self, post_id: Uuid, changes: &PostChanges) -> Result<Option<Post>>;

    // Follows

    /// Ids the user follows (excluding the user)
    async fn following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    async fn create_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        notification: Option<&NewNotification>,
    ) -> Result<Option<Follow>>;

    /// Returns true when an edge was removed
    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    /// Users following `user_id`, most recent edge first, with the total
    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64)>;

    /// Users `user_id` follows, most recent edge first, with the total
    async fn list_following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64)>;

    /// Returns (followers, following)
    async fn count_follows(&self, user_id: Uuid) -> Result<(i64, i64)>;

    // Likes & saves

    async fn create_like(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        notification: Option<&NewNotification>,
    ) -> Result<Option<Like>>;

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    /// Subset of `post_ids` the user has liked
    async fn liked_post_ids(&self, user_id: Uuid, post_ids: &[Uuid]) -> Result<HashSet<Uuid>>;

    /// Like counts keyed by post id; posts without likes may be absent
    async fn count_likes_batch(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>>;

    async fn create_saved_post(&self, user_id: Uuid, post_id: Uuid)
        -> Result<Option<SavedPost>>;

    async fn delete_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    /// Subset of `post_ids` the user has saved
    async fn saved_post_ids(&self, user_id: Uuid, post_ids: &[Uuid]) -> Result<HashSet<Uuid>>;

    // Comments

    async fn create_comment(
        &self,
        comment: &NewComment,
        notification: Option<&NewNotification>,
    ) -> Result<Comment>;

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>>;

    /// Top-level comments of a post, newest first
    async fn list_top_level_comments(
        &self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>>;

    async fn count_top_level_comments(&self, post_id: Uuid) -> Result<i64>;

    /// Up to `per_parent` replies for each parent, oldest first
    async fn list_replies(&self, parent_ids: &[Uuid], per_parent: i64) -> Result<Vec<Comment>>;

    async fn count_replies_batch(&self, parent_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>>;

    /// All comments (replies included) keyed by post id
    async fn count_comments_batch(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>>;

    // Notifications

    /// Newest first
    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>>;

    /// Returns (total, unread)
    async fn count_notifications(&self, recipient_id: Uuid) -> Result<(i64, i64)>;

    /// Marks every unread notification read; returns rows changed
    async fn mark_notifications_read(&self, recipient_id: Uuid) -> Result<u64>;

    /// Readiness check
    async fn ping(&self) -> Result<()>;
}
