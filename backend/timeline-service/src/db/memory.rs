use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FeedStore, PostFilter};
use crate::error::{AppError, Result};
use crate::models::{
    Comment, Follow, Like, NewComment, NewNotification, Notification, Post, PostChanges,
    SavedPost, User,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    follows: Vec<Follow>,
    likes: Vec<Like>,
    saved: Vec<SavedPost>,
    comments: Vec<Comment>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn user_exists(&self, user_id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == user_id)
    }

    fn post_exists(&self, post_id: Uuid) -> bool {
        self.posts.iter().any(|p| p.id == post_id)
    }

    /// Foreign keys and the no-self check of the notifications table
    fn check_notification(&self, notification: &NewNotification) -> Result<()> {
        if !self.user_exists(notification.recipient_id)
            || !self.user_exists(notification.actor_id)
            || notification.post_id.is_some_and(|id| !self.post_exists(id))
        {
            return Err(AppError::missing_reference());
        }
        if notification.recipient_id == notification.actor_id {
            return Err(AppError::Internal(
                "notifications_no_self constraint violated".to_string(),
            ));
        }
        Ok(())
    }

    /// Callers run `check_notification` first so a failed write changes nothing
    fn push_notification(&mut self, notification: Option<&NewNotification>) {
        let Some(notification) = notification else {
            return;
        };
        self.notifications.push(Notification {
            id: Uuid::new_v4(),
            recipient_id: notification.recipient_id,
            actor_id: notification.actor_id,
            kind: notification.kind,
            post_id: notification.post_id,
            message: notification.message.clone(),
            is_read: false,
            created_at: Utc::now(),
        });
    }
}

/// In-process store with the same uniqueness and foreign-key rules as the
/// relational schema.
///
/// Rows keep insertion order, so sorting by `created_at` with a stable sort
/// breaks ties by insertion, as the `seq` column does in PostgreSQL.
/// `call_count` reports how many `FeedStore` operations have been issued.
/// Every write holds one lock and validates before mutating, so an edge and
/// its notification land together or not at all.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `FeedStore` operations served so far (seeding excluded)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn insert_user(&self, username: &str, full_name: Option<&str>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: full_name.map(str::to_string),
            avatar_url: None,
            bio: None,
            is_private: false,
            is_verified: false,
            created_at: Utc::now(),
        };
        self.tables.write().await.users.push(user.clone());
        user
    }

    pub async fn insert_post(
        &self,
        user_id: Uuid,
        caption: Option<&str>,
        location: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Post {
        let post = Post {
            id: Uuid::new_v4(),
            user_id,
            image_url: format!("https://cdn.example.com/{}.jpg", Uuid::new_v4()),
            caption: caption.map(str::to_string),
            location: location.map(str::to_string),
            created_at,
            updated_at: created_at,
        };
        self.tables.write().await.posts.push(post.clone());
        post
    }

    /// Inserts a comment with an explicit timestamp
    pub async fn insert_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Comment {
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            content: content.to_string(),
            parent_id,
            created_at,
        };
        self.tables.write().await.comments.push(comment.clone());
        comment
    }

    /// Every notification row, in insertion order
    pub async fn notifications(&self) -> Vec<Notification> {
        self.tables.read().await.notifications.clone()
    }

    pub async fn follow_exists(&self, follower_id: Uuid, following_id: Uuid) -> bool {
        self.tables
            .read()
            .await
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id)
    }
}

fn matches_filter(tables: &Tables, post: &Post, filter: &PostFilter) -> bool {
    match filter {
        PostFilter::All => true,
        PostFilter::AuthorIn(ids) => ids.contains(&post.user_id),
        PostFilter::AuthorNotIn(ids) => !ids.contains(&post.user_id),
        PostFilter::SavedBy(user_id) => tables
            .saved
            .iter()
            .any(|s| s.user_id == *user_id && s.post_id == post.id),
        PostFilter::Search(term) => {
            let contains = |field: Option<&str>| field.is_some_and(|v| v.contains(term.as_str()));
            let author = tables.users.iter().find(|u| u.id == post.user_id);

            contains(post.caption.as_deref())
                || contains(post.location.as_deref())
                || contains(author.map(|u| u.username.as_str()))
                || contains(author.and_then(|u| u.full_name.as_deref()))
        }
    }
}

fn page<T: Clone>(rows: Vec<&T>, limit: i64, offset: i64) -> Vec<T> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

fn newest_first<T>(rows: &mut [&T], key: impl Fn(&T) -> DateTime<Utc>) {
    rows.sort_by(|a, b| key(*b).cmp(&key(*a)));
}

fn users_by_edge(
    tables: &Tables,
    mut edges: Vec<&Follow>,
    pick: impl Fn(&Follow) -> Uuid,
    limit: i64,
    offset: i64,
) -> (Vec<User>, i64) {
    let total = edges.len() as i64;
    newest_first(&mut edges, |f| f.created_at);

    let users = page(edges, limit, offset)
        .into_iter()
        .filter_map(|f| tables.users.iter().find(|u| u.id == pick(&f)).cloned())
        .collect();

    (users, total)
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_users(&self, user_ids: &[Uuid]) -> Result<Vec<User>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| user_ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == post_id).cloned())
    }

    async fn query_posts(&self, filter: &PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>> {
        self.touch();
        let tables = self.tables.read().await;
        let mut rows: Vec<&Post> = tables
            .posts
            .iter()
            .filter(|p| matches_filter(&tables, p, filter))
            .collect();
        newest_first(&mut rows, |p| p.created_at);
        Ok(page(rows, limit, offset))
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| matches_filter(&tables, p, filter))
            .count() as i64)
    }

    async fn update_post(&self, post_id: Uuid, changes: &PostChanges) -> Result<Option<Post>> {
        self.touch();
        let mut tables = self.tables.write().await;
        let Some(post) = tables.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(None);
        };

        if let Some(caption) = &changes.caption {
            post.caption = Some(caption.clone());
        }
        if let Some(location) = &changes.location {
            post.location = Some(location.clone());
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .map(|f| f.following_id)
            .collect())
    }

    async fn create_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        notification: Option<&NewNotification>,
    ) -> Result<Option<Follow>> {
        self.touch();
        if follower_id == following_id {
            return Err(AppError::Internal(
                "follows_no_self_follow constraint violated".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        if !tables.user_exists(follower_id) || !tables.user_exists(following_id) {
            return Err(AppError::missing_reference());
        }
        if tables
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id)
        {
            return Ok(None);
        }
        if let Some(notification) = notification {
            tables.check_notification(notification)?;
        }

        let follow = Follow {
            id: Uuid::new_v4(),
            follower_id,
            following_id,
            created_at: Utc::now(),
        };
        tables.follows.push(follow.clone());
        tables.push_notification(notification);
        Ok(Some(follow))
    }

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        self.touch();
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(tables.follows.len() < before)
    }

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id))
    }

    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64)> {
        self.touch();
        let tables = self.tables.read().await;
        let edges = tables
            .follows
            .iter()
            .filter(|f| f.following_id == user_id)
            .collect();
        Ok(users_by_edge(&tables, edges, |f| f.follower_id, limit, offset))
    }

    async fn list_following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64)> {
        self.touch();
        let tables = self.tables.read().await;
        let edges = tables
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .collect();
        Ok(users_by_edge(&tables, edges, |f| f.following_id, limit, offset))
    }

    async fn count_follows(&self, user_id: Uuid) -> Result<(i64, i64)> {
        self.touch();
        let tables = self.tables.read().await;
        let followers = tables.follows.iter().filter(|f| f.following_id == user_id).count();
        let following = tables.follows.iter().filter(|f| f.follower_id == user_id).count();
        Ok((followers as i64, following as i64))
    }

    async fn create_like(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        notification: Option<&NewNotification>,
    ) -> Result<Option<Like>> {
        self.touch();
        let mut tables = self.tables.write().await;
        if !tables.user_exists(user_id) || !tables.post_exists(post_id) {
            return Err(AppError::missing_reference());
        }
        if tables
            .likes
            .iter()
            .any(|l| l.user_id == user_id && l.post_id == post_id)
        {
            return Ok(None);
        }
        if let Some(notification) = notification {
            tables.check_notification(notification)?;
        }

        let like = Like {
            id: Uuid::new_v4(),
            user_id,
            post_id,
            created_at: Utc::now(),
        };
        tables.likes.push(like.clone());
        tables.push_notification(notification);
        Ok(Some(like))
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        self.touch();
        let mut tables = self.tables.write().await;
        let before = tables.likes.len();
        tables
            .likes
            .retain(|l| !(l.user_id == user_id && l.post_id == post_id));
        Ok(tables.likes.len() < before)
    }

    async fn liked_post_ids(&self, user_id: Uuid, post_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .likes
            .iter()
            .filter(|l| l.user_id == user_id && post_ids.contains(&l.post_id))
            .map(|l| l.post_id)
            .collect())
    }

    async fn count_likes_batch(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        self.touch();
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for like in tables.likes.iter().filter(|l| post_ids.contains(&l.post_id)) {
            *counts.entry(like.post_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn create_saved_post(
        &self,
        user_id: Uuid,
        post_id: Uuid,
    ) -> Result<Option<SavedPost>> {
        self.touch();
        let mut tables = self.tables.write().await;
        if !tables.user_exists(user_id) || !tables.post_exists(post_id) {
            return Err(AppError::missing_reference());
        }
        if tables
            .saved
            .iter()
            .any(|s| s.user_id == user_id && s.post_id == post_id)
        {
            return Ok(None);
        }

        let saved = SavedPost {
            id: Uuid::new_v4(),
            user_id,
            post_id,
            created_at: Utc::now(),
        };
        tables.saved.push(saved.clone());
        Ok(Some(saved))
    }

    async fn delete_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        self.touch();
        let mut tables = self.tables.write().await;
        let before = tables.saved.len();
        tables
            .saved
            .retain(|s| !(s.user_id == user_id && s.post_id == post_id));
        Ok(tables.saved.len() < before)
    }

    async fn saved_post_ids(&self, user_id: Uuid, post_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .saved
            .iter()
            .filter(|s| s.user_id == user_id && post_ids.contains(&s.post_id))
            .map(|s| s.post_id)
            .collect())
    }

    async fn create_comment(
        &self,
        comment: &NewComment,
        notification: Option<&NewNotification>,
    ) -> Result<Comment> {
        self.touch();
        let mut tables = self.tables.write().await;
        let parent_missing = comment
            .parent_id
            .is_some_and(|id| !tables.comments.iter().any(|c| c.id == id));
        if !tables.user_exists(comment.user_id)
            || !tables.post_exists(comment.post_id)
            || parent_missing
        {
            return Err(AppError::missing_reference());
        }
        if let Some(notification) = notification {
            tables.check_notification(notification)?;
        }

        let created = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            user_id: comment.user_id,
            content: comment.content.clone(),
            parent_id: comment.parent_id,
            created_at: Utc::now(),
        };
        tables.comments.push(created.clone());
        tables.push_notification(notification);
        Ok(created)
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == comment_id).cloned())
    }

    async fn list_top_level_comments(
        &self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>> {
        self.touch();
        let tables = self.tables.read().await;
        let mut rows: Vec<&Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.parent_id.is_none())
            .collect();
        newest_first(&mut rows, |c| c.created_at);
        Ok(page(rows, limit, offset))
    }

    async fn count_top_level_comments(&self, post_id: Uuid) -> Result<i64> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.parent_id.is_none())
            .count() as i64)
    }

    async fn list_replies(&self, parent_ids: &[Uuid], per_parent: i64) -> Result<Vec<Comment>> {
        self.touch();
        let tables = self.tables.read().await;
        let mut replies = Vec::new();
        for parent_id in parent_ids {
            let mut rows: Vec<&Comment> = tables
                .comments
                .iter()
                .filter(|c| c.parent_id == Some(*parent_id))
                .collect();
            rows.sort_by_key(|c| c.created_at);
            replies.extend(page(rows, per_parent, 0));
        }
        Ok(replies)
    }

    async fn count_replies_batch(&self, parent_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        self.touch();
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for parent_id in tables.comments.iter().filter_map(|c| c.parent_id) {
            if parent_ids.contains(&parent_id) {
                *counts.entry(parent_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn count_comments_batch(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        self.touch();
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for comment in tables.comments.iter().filter(|c| post_ids.contains(&c.post_id)) {
            *counts.entry(comment.post_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>> {
        self.touch();
        let tables = self.tables.read().await;
        let mut rows: Vec<&Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .collect();
        newest_first(&mut rows, |n| n.created_at);
        Ok(page(rows, limit, offset))
    }

    async fn count_notifications(&self, recipient_id: Uuid) -> Result<(i64, i64)> {
        self.touch();
        let tables = self.tables.read().await;
        let mine: Vec<&Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .collect();
        let unread = mine.iter().filter(|n| !n.is_read).count();
        Ok((mine.len() as i64, unread as i64))
    }

    async fn mark_notifications_read(&self, recipient_id: Uuid) -> Result<u64> {
        self.touch();
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        {
            n.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn ping(&self) -> Result<()> {
        self.touch();
        Ok(())
    }
}
