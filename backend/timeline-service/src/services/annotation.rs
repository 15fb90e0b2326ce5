//! Per-viewer annotation of a page of posts
//!
//! Every lookup is keyed by the ids on the page, so the cost follows the
//! page size rather than the size of the corpus.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::db::FeedStore;
use crate::error::Result;
use crate::models::{Post, PostSummary, UserSummary};

pub struct Annotator {
    store: Arc<dyn FeedStore>,
}

impl Annotator {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    pub async fn annotate(&self, posts: Vec<Post>, viewer_id: Option<Uuid>) -> Result<Vec<PostSummary>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.user_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let (authors, like_counts, comment_counts, (liked, saved)) = tokio::try_join!(
            self.store.find_users(&author_ids),
            self.store.count_likes_batch(&post_ids),
            self.store.count_comments_batch(&post_ids),
            self.viewer_edges(viewer_id, &post_ids),
        )?;

        let authors: HashMap<Uuid, UserSummary> = authors
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();

        Ok(posts
            .into_iter()
            .map(|post| PostSummary {
                user: authors.get(&post.user_id).cloned(),
                likes_count: like_counts.get(&post.id).copied().unwrap_or(0),
                comments_count: comment_counts.get(&post.id).copied().unwrap_or(0),
                is_liked: liked.contains(&post.id),
                is_saved: saved.contains(&post.id),
                id: post.id,
                user_id: post.user_id,
                image_url: post.image_url,
                caption: post.caption,
                location: post.location,
                created_at: post.created_at,
            })
            .collect())
    }

    /// Like and save edges for the viewer; both empty without a viewer
    async fn viewer_edges(
        &self,
        viewer_id: Option<Uuid>,
        post_ids: &[Uuid],
    ) -> Result<(HashSet<Uuid>, HashSet<Uuid>)> {
        match viewer_id {
            Some(viewer_id) => tokio::try_join!(
                self.store.liked_post_ids(viewer_id, post_ids),
                self.store.saved_post_ids(viewer_id, post_ids),
            ),
            None => Ok((HashSet::new(), HashSet::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::Utc;

    #[tokio::test]
    async fn test_annotations_follow_edges() {
        let store = Arc::new(MemoryStore::new());
        let author = store.insert_user("author", Some("The Author")).await;
        let viewer = store.insert_user("viewer", None).await;
        let other = store.insert_user("other", None).await;
        let liked = store.insert_post(author.id, Some("one"), None, Utc::now()).await;
        let plain = store.insert_post(author.id, Some("two"), None, Utc::now()).await;

        store.create_like(viewer.id, liked.id, None).await.unwrap();
        store.create_like(other.id, liked.id, None).await.unwrap();
        store.create_saved_post(viewer.id, plain.id).await.unwrap();
        store
            .insert_comment(plain.id, other.id, "nice", None, Utc::now())
            .await;

        let annotator = Annotator::new(store);
        let page = annotator
            .annotate(vec![liked.clone(), plain.clone()], Some(viewer.id))
            .await
            .unwrap();

        assert_eq!(page[0].id, liked.id);
        assert!(page[0].is_liked);
        assert!(!page[0].is_saved);
        assert_eq!(page[0].likes_count, 2);
        assert_eq!(page[0].comments_count, 0);
        assert_eq!(page[0].user.as_ref().map(|u| u.username.as_str()), Some("author"));

        assert!(!page[1].is_liked);
        assert!(page[1].is_saved);
        assert_eq!(page[1].likes_count, 0);
        assert_eq!(page[1].comments_count, 1);
    }

    #[tokio::test]
    async fn test_anonymous_viewer_sees_counts_only() {
        let store = Arc::new(MemoryStore::new());
        let author = store.insert_user("author", None).await;
        let post = store.insert_post(author.id, None, None, Utc::now()).await;
        store.create_like(author.id, post.id, None).await.unwrap();

        let page = Annotator::new(store).annotate(vec![post], None).await.unwrap();
        assert!(!page[0].is_liked);
        assert!(!page[0].is_saved);
        assert_eq!(page[0].likes_count, 1);
    }

    #[tokio::test]
    async fn test_empty_page_skips_store() {
        let store = Arc::new(MemoryStore::new());
        let page = Annotator::new(store.clone())
            .annotate(Vec::new(), Some(Uuid::new_v4()))
            .await
            .unwrap();

        assert!(page.is_empty());
        assert_eq!(store.call_count(), 0);
    }
}
