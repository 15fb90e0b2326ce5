//! Comment service - threaded comments with one level of replies

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::NotificationService;
use crate::db::FeedStore;
use crate::error::{AppError, Result};
use crate::metrics::feed::record_interaction;
use crate::models::{
    Comment, CommentSummary, NewComment, NotificationKind, PageRequest, Pagination, UserSummary,
};

pub const COMMENTS_DEFAULT_LIMIT: i64 = 20;

/// Replies embedded under each top-level comment
pub const REPLIES_PER_COMMENT: i64 = 3;

const MAX_COMMENT_LENGTH: usize = 2200;

/// Characters of the comment copied into the owner's notification
const NOTIFICATION_PREVIEW_CHARS: usize = 100;

pub struct CommentService {
    store: Arc<dyn FeedStore>,
}

fn preview(content: &str) -> String {
    content.chars().take(NOTIFICATION_PREVIEW_CHARS).collect()
}

fn validate_content(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Validation(
            "Comment content cannot be empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::Validation(format!(
            "Comment content exceeds maximum length of {MAX_COMMENT_LENGTH}"
        )));
    }
    Ok(content.to_string())
}

impl CommentService {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    pub async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<CommentSummary> {
        let content = validate_content(content)?;

        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        let author = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if let Some(parent_id) = parent_id {
            let parent = self
                .store
                .find_comment(parent_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Parent comment not found".to_string()))?;

            if parent.post_id != post_id {
                return Err(AppError::Validation(
                    "Parent comment belongs to a different post".to_string(),
                ));
            }
            if parent.parent_id.is_some() {
                return Err(AppError::Validation(
                    "Replies can only be made to top-level comments".to_string(),
                ));
            }
        }

        let notification = NotificationService::pending(
            post.user_id,
            user_id,
            NotificationKind::Comment,
            Some(post_id),
            Some(preview(&content)),
        );
        let comment = self
            .store
            .create_comment(
                &NewComment {
                    post_id,
                    user_id,
                    content,
                    parent_id,
                },
                notification.as_ref(),
            )
            .await?;
        record_interaction("comment", "created");
        NotificationService::delivered(notification.as_ref());

        tracing::info!(post_id = %post_id, comment_id = %comment.id, user_id = %user_id, "Comment created");

        Ok(summarize(comment, Some(UserSummary::from(&author)), Vec::new(), 0))
    }

    /// Top-level comments newest first, each with its oldest replies
    pub async fn list_comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<CommentSummary>, Pagination)> {
        if self.store.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let (top_level, total) = tokio::try_join!(
            self.store
                .list_top_level_comments(post_id, page.limit, page.offset()),
            self.store.count_top_level_comments(post_id),
        )?;

        let parent_ids: Vec<Uuid> = top_level.iter().map(|c| c.id).collect();
        let (replies, reply_counts) = if parent_ids.is_empty() {
            (Vec::new(), HashMap::new())
        } else {
            tokio::try_join!(
                self.store.list_replies(&parent_ids, REPLIES_PER_COMMENT),
                self.store.count_replies_batch(&parent_ids),
            )?
        };

        let mut author_ids: Vec<Uuid> = top_level
            .iter()
            .chain(replies.iter())
            .map(|c| c.user_id)
            .collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<Uuid, UserSummary> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .find_users(&author_ids)
                .await?
                .iter()
                .map(|u| (u.id, UserSummary::from(u)))
                .collect()
        };

        let mut replies_by_parent: HashMap<Uuid, Vec<CommentSummary>> = HashMap::new();
        for reply in replies {
            if let Some(parent_id) = reply.parent_id {
                let author = authors.get(&reply.user_id).cloned();
                replies_by_parent
                    .entry(parent_id)
                    .or_default()
                    .push(summarize(reply, author, Vec::new(), 0));
            }
        }

        let comments = top_level
            .into_iter()
            .map(|comment| {
                let author = authors.get(&comment.user_id).cloned();
                let replies = replies_by_parent.remove(&comment.id).unwrap_or_default();
                let replies_count = reply_counts.get(&comment.id).copied().unwrap_or(0);
                summarize(comment, author, replies, replies_count)
            })
            .collect();

        Ok((comments, Pagination::with_has_next(page, total)))
    }
}

fn summarize(
    comment: Comment,
    user: Option<UserSummary>,
    replies: Vec<CommentSummary>,
    replies_count: i64,
) -> CommentSummary {
    CommentSummary {
        id: comment.id,
        post_id: comment.post_id,
        parent_id: comment.parent_id,
        content: comment.content,
        created_at: comment.created_at,
        user,
        replies,
        replies_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::{Duration, Utc};

    #[test]
    fn test_content_validation() {
        assert_eq!(validate_content("  hi  ").unwrap(), "hi");
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"a".repeat(MAX_COMMENT_LENGTH)).is_ok());
        assert!(validate_content(&"a".repeat(MAX_COMMENT_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_preview_counts_characters() {
        let text = "é".repeat(150);
        let short = preview(&text);
        assert_eq!(short.chars().count(), 100);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_comment_notifies_owner_with_preview() {
        let store = Arc::new(MemoryStore::new());
        let owner = store.insert_user("owner", None).await;
        let fan = store.insert_user("fan", None).await;
        let post = store.insert_post(owner.id, None, None, Utc::now()).await;
        let service = CommentService::new(store.clone());

        let long = "x".repeat(250);
        let created = service
            .create_comment(post.id, fan.id, &long, None)
            .await
            .unwrap();
        assert_eq!(created.content.len(), 250);
        assert_eq!(created.user.map(|u| u.id), Some(fan.id));

        let notifications = store.notifications().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Comment);
        assert_eq!(notifications[0].message.as_deref(), Some("x".repeat(100).as_str()));

        // Commenting on your own post is silent
        service
            .create_comment(post.id, owner.id, "thanks", None)
            .await
            .unwrap();
        assert_eq!(store.notifications().await.len(), 1);
    }

    #[tokio::test]
    async fn test_comment_requires_known_author() {
        let store = Arc::new(MemoryStore::new());
        let owner = store.insert_user("owner", None).await;
        let post = store.insert_post(owner.id, None, None, Utc::now()).await;
        let service = CommentService::new(store.clone());

        let err = service
            .create_comment(post.id, Uuid::new_v4(), "hi", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "User not found"));
        assert_eq!(store.count_top_level_comments(post.id).await.unwrap(), 0);
        assert!(store.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_reply_rules() {
        let store = Arc::new(MemoryStore::new());
        let owner = store.insert_user("owner", None).await;
        let post = store.insert_post(owner.id, None, None, Utc::now()).await;
        let other = store.insert_post(owner.id, None, None, Utc::now()).await;
        let service = CommentService::new(store.clone());

        let top = service
            .create_comment(post.id, owner.id, "top", None)
            .await
            .unwrap();
        let reply = service
            .create_comment(post.id, owner.id, "reply", Some(top.id))
            .await
            .unwrap();
        assert_eq!(reply.parent_id, Some(top.id));

        let nested = service
            .create_comment(post.id, owner.id, "nested", Some(reply.id))
            .await
            .unwrap_err();
        assert!(matches!(nested, AppError::Validation(_)));

        let cross = service
            .create_comment(other.id, owner.id, "elsewhere", Some(top.id))
            .await
            .unwrap_err();
        assert!(matches!(cross, AppError::Validation(_)));

        let missing = service
            .create_comment(post.id, owner.id, "ghost", Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listing_embeds_three_oldest_replies() {
        let store = Arc::new(MemoryStore::new());
        let owner = store.insert_user("owner", None).await;
        let post = store.insert_post(owner.id, None, None, Utc::now()).await;
        let base = Utc::now();

        let older = store
            .insert_comment(post.id, owner.id, "older", None, base)
            .await;
        let newer = store
            .insert_comment(post.id, owner.id, "newer", None, base + Duration::seconds(10))
            .await;
        for i in 0..5 {
            store
                .insert_comment(
                    post.id,
                    owner.id,
                    &format!("reply {i}"),
                    Some(older.id),
                    base + Duration::seconds(20 + i),
                )
                .await;
        }

        let service = CommentService::new(store);
        let (comments, pagination) = service
            .list_comments(post.id, PageRequest::new(1, 20))
            .await
            .unwrap();

        assert_eq!(pagination.total, 2);
        assert_eq!(pagination.has_next, Some(false));
        assert_eq!(comments[0].id, newer.id);
        assert_eq!(comments[1].id, older.id);
        assert_eq!(comments[1].replies_count, 5);

        let contents: Vec<&str> = comments[1].replies.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["reply 0", "reply 1", "reply 2"]);
        assert!(comments[0].replies.is_empty());
    }
}
