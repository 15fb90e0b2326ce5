//! Profiles and follow lists

use std::sync::Arc;

use uuid::Uuid;

use crate::db::{FeedStore, PostFilter};
use crate::error::{AppError, Result};
use crate::models::{PageRequest, Pagination, User, UserProfile, UserSummary};

pub const FOLLOW_LIST_DEFAULT_LIMIT: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowDirection {
    Followers,
    Following,
}

pub struct UserService {
    store: Arc<dyn FeedStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    async fn require_user(&self, user_id: Uuid) -> Result<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Profile with counts; `isFollowing` is false without a viewer or on one's own profile
    pub async fn get_profile(&self, user_id: Uuid, viewer_id: Option<Uuid>) -> Result<UserProfile> {
        let user = self.require_user(user_id).await?;

        let following_check = async {
            match viewer_id {
                Some(viewer_id) if viewer_id != user_id => {
                    self.store.is_following(viewer_id, user_id).await
                }
                _ => Ok(false),
            }
        };

        let posts_filter = PostFilter::AuthorIn(vec![user_id]);
        let (posts_count, (followers_count, following_count), is_following) = tokio::try_join!(
            self.store.count_posts(&posts_filter),
            self.store.count_follows(user_id),
            following_check,
        )?;

        Ok(UserProfile {
            user: UserSummary::from(&user),
            bio: user.bio,
            is_private: user.is_private,
            posts_count,
            followers_count,
            following_count,
            is_following,
        })
    }

    pub async fn list_follows(
        &self,
        user_id: Uuid,
        direction: FollowDirection,
        page: PageRequest,
    ) -> Result<(Vec<UserSummary>, Pagination)> {
        self.require_user(user_id).await?;

        let (users, total) = match direction {
            FollowDirection::Followers => {
                self.store
                    .list_followers(user_id, page.limit, page.offset())
                    .await?
            }
            FollowDirection::Following => {
                self.store
                    .list_following(user_id, page.limit, page.offset())
                    .await?
            }
        };

        Ok((
            users.iter().map(UserSummary::from).collect(),
            Pagination::with_has_more(page, total),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::Utc;

    #[tokio::test]
    async fn test_profile_counts() {
        let store = Arc::new(MemoryStore::new());
        let star = store.insert_user("star", Some("Star")).await;
        let fan = store.insert_user("fan", None).await;
        store.insert_post(star.id, None, None, Utc::now()).await;
        store.insert_post(star.id, None, None, Utc::now()).await;
        store.create_follow(fan.id, star.id, None).await.unwrap();

        let service = UserService::new(store);

        let profile = service.get_profile(star.id, Some(fan.id)).await.unwrap();
        assert_eq!(profile.posts_count, 2);
        assert_eq!(profile.followers_count, 1);
        assert_eq!(profile.following_count, 0);
        assert!(profile.is_following);

        let own = service.get_profile(star.id, Some(star.id)).await.unwrap();
        assert!(!own.is_following);

        let anonymous = service.get_profile(star.id, None).await.unwrap();
        assert!(!anonymous.is_following);
    }

    #[tokio::test]
    async fn test_follow_lists() {
        let store = Arc::new(MemoryStore::new());
        let star = store.insert_user("star", None).await;
        for name in ["a", "b", "c"] {
            let fan = store.insert_user(name, None).await;
            store.create_follow(fan.id, star.id, None).await.unwrap();
        }

        let service = UserService::new(store);
        let (followers, pagination) = service
            .list_follows(star.id, FollowDirection::Followers, PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(followers.len(), 2);
        assert_eq!(pagination.total, 3);
        assert_eq!(pagination.has_more, Some(true));

        let (following, _) = service
            .list_follows(star.id, FollowDirection::Following, PageRequest::new(1, 20))
            .await
            .unwrap();
        assert!(following.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let service = UserService::new(Arc::new(MemoryStore::new()));
        let err = service.get_profile(Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
