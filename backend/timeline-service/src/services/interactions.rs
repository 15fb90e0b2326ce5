//! Like, save and follow mutations
//!
//! Creates are guarded by the store's uniqueness constraint: a create that
//! writes nothing surfaces as `Conflict`. The acting user must exist. Any
//! notification is written by the same store call as the edge. Deletes are
//! unconditional and never fail on a missing edge.

use std::sync::Arc;

use uuid::Uuid;

use super::NotificationService;
use crate::db::FeedStore;
use crate::error::{AppError, Result};
use crate::metrics::feed::record_interaction;
use crate::models::{FollowState, LikeState, NotificationKind, Post, SaveState};

pub struct InteractionService {
    store: Arc<dyn FeedStore>,
}

impl InteractionService {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    async fn require_user(&self, user_id: Uuid) -> Result<()> {
        match self.store.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("User not found".to_string())),
        }
    }

    async fn require_post(&self, post_id: Uuid) -> Result<Post> {
        self.store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    async fn likes_count(&self, post_id: Uuid) -> Result<i64> {
        let counts = self.store.count_likes_batch(&[post_id]).await?;
        Ok(counts.get(&post_id).copied().unwrap_or(0))
    }

    pub async fn like_post(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeState> {
        let post = self.require_post(post_id).await?;
        self.require_user(user_id).await?;

        let notification = NotificationService::pending(
            post.user_id,
            user_id,
            NotificationKind::Like,
            Some(post_id),
            None,
        );
        if self
            .store
            .create_like(user_id, post_id, notification.as_ref())
            .await?
            .is_none()
        {
            record_interaction("like", "conflict");
            return Err(AppError::Conflict("Post already liked".to_string()));
        }
        record_interaction("like", "created");
        NotificationService::delivered(notification.as_ref());

        tracing::info!(post_id = %post_id, user_id = %user_id, "Post liked");
        Ok(LikeState {
            is_liked: true,
            likes_count: self.likes_count(post_id).await?,
        })
    }

    /// Removing a like that does not exist is not an error
    pub async fn unlike_post(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeState> {
        let removed = self.store.delete_like(user_id, post_id).await?;
        record_interaction("unlike", if removed { "removed" } else { "noop" });

        Ok(LikeState {
            is_liked: false,
            likes_count: self.likes_count(post_id).await?,
        })
    }

    pub async fn save_post(&self, post_id: Uuid, user_id: Uuid) -> Result<SaveState> {
        self.require_post(post_id).await?;
        self.require_user(user_id).await?;

        if self.store.create_saved_post(user_id, post_id).await?.is_none() {
            record_interaction("save", "conflict");
            return Err(AppError::Conflict("Post already saved".to_string()));
        }
        record_interaction("save", "created");

        tracing::info!(post_id = %post_id, user_id = %user_id, "Post saved");
        Ok(SaveState { is_saved: true })
    }

    pub async fn unsave_post(&self, post_id: Uuid, user_id: Uuid) -> Result<SaveState> {
        let removed = self.store.delete_saved_post(user_id, post_id).await?;
        record_interaction("unsave", if removed { "removed" } else { "noop" });

        Ok(SaveState { is_saved: false })
    }

    pub async fn follow_user(&self, follower_id: Uuid, following_id: Uuid) -> Result<FollowState> {
        if follower_id == following_id {
            record_interaction("follow", "rejected");
            return Err(AppError::Validation("Cannot follow yourself".to_string()));
        }

        self.require_user(following_id).await?;
        self.require_user(follower_id).await?;

        let notification = NotificationService::pending(
            following_id,
            follower_id,
            NotificationKind::Follow,
            None,
            None,
        );
        if self
            .store
            .create_follow(follower_id, following_id, notification.as_ref())
            .await?
            .is_none()
        {
            record_interaction("follow", "conflict");
            return Err(AppError::Conflict("Already following this user".to_string()));
        }
        record_interaction("follow", "created");
        NotificationService::delivered(notification.as_ref());

        let (followers_count, _) = self.store.count_follows(following_id).await?;
        tracing::info!(follower_id = %follower_id, following_id = %following_id, "User followed");

        Ok(FollowState {
            is_following: true,
            followers_count,
        })
    }

    pub async fn unfollow_user(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<FollowState> {
        let removed = self.store.delete_follow(follower_id, following_id).await?;
        record_interaction("unfollow", if removed { "removed" } else { "noop" });

        let (followers_count, _) = self.store.count_follows(following_id).await?;
        Ok(FollowState {
            is_following: false,
            followers_count,
        })
    }
}
