//! Feed composition: home, explore, saved and search queries
//!
//! Each request resolves the viewer's network, turns the mode into a
//! `PostFilter`, fetches one page newest-first and annotates it for the
//! viewer.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::{Annotator, GraphResolver};
use crate::db::{FeedStore, PostFilter};
use crate::error::{AppError, Result};
use crate::metrics::feed::record_feed;
use crate::models::{PageRequest, Pagination, Post, PostChanges, PostSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    Home,
    Explore,
    Saved,
}

impl FeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedMode::Home => "home",
            FeedMode::Explore => "explore",
            FeedMode::Saved => "saved",
        }
    }

    /// Page size used when the request does not carry a usable `limit`
    pub fn default_limit(&self) -> i64 {
        match self {
            FeedMode::Home => 10,
            FeedMode::Explore => 12,
            FeedMode::Saved => 9,
        }
    }
}

pub const SEARCH_DEFAULT_LIMIT: i64 = 20;

/// Build the row filter for a mode.
///
/// `network` is the viewer's in-network set (`None` without a viewer).
pub fn compose_filter(
    mode: FeedMode,
    viewer_id: Option<Uuid>,
    network: Option<Vec<Uuid>>,
) -> Result<PostFilter> {
    match mode {
        FeedMode::Home => Ok(network.map_or(PostFilter::All, PostFilter::AuthorIn)),
        FeedMode::Explore => Ok(network.map_or(PostFilter::All, PostFilter::AuthorNotIn)),
        FeedMode::Saved => viewer_id
            .map(PostFilter::SavedBy)
            .ok_or_else(|| AppError::Validation("viewer required".to_string())),
    }
}

pub struct FeedService {
    store: Arc<dyn FeedStore>,
    graph: GraphResolver,
    annotator: Annotator,
}

impl FeedService {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self {
            graph: GraphResolver::new(store.clone()),
            annotator: Annotator::new(store.clone()),
            store,
        }
    }

    /// One page of a feed, annotated for the viewer
    pub async fn get_feed(
        &self,
        mode: FeedMode,
        viewer_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<(Vec<PostSummary>, Pagination)> {
        let started = Instant::now();

        let network = match mode {
            FeedMode::Home | FeedMode::Explore => self.graph.in_network(viewer_id).await?,
            FeedMode::Saved => None,
        };
        let network = network.map(|set| {
            let mut ids: Vec<Uuid> = set.into_iter().collect();
            ids.sort_unstable();
            ids
        });
        let filter = compose_filter(mode, viewer_id, network)?;

        let (posts, total) = tokio::try_join!(
            self.store.query_posts(&filter, page.limit, page.offset()),
            self.store.count_posts(&filter),
        )?;
        let items = self.annotator.annotate(posts, viewer_id).await?;

        record_feed(mode.as_str(), started.elapsed().as_secs_f64(), items.len());
        tracing::debug!(
            mode = mode.as_str(),
            viewer_id = ?viewer_id,
            page = page.page,
            returned = items.len(),
            total,
            "Composed feed page"
        );

        Ok((items, Pagination::with_has_more(page, total)))
    }

    /// Case-sensitive substring search over caption, location and author names.
    ///
    /// A blank query returns nothing without touching the store.
    pub async fn search(
        &self,
        query: &str,
        viewer_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<PostSummary>> {
        // Whitespace-only queries match nothing, but the term itself is used as given
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let posts = self
            .store
            .query_posts(&PostFilter::Search(query.to_string()), limit, 0)
            .await?;
        let items = self.annotator.annotate(posts, viewer_id).await?;

        record_feed("search", started.elapsed().as_secs_f64(), items.len());
        Ok(items)
    }

    pub async fn get_post(&self, post_id: Uuid, viewer_id: Option<Uuid>) -> Result<PostSummary> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        self.single(post, viewer_id).await
    }

    /// Owner-only edit of caption and location
    pub async fn update_post(
        &self,
        post_id: Uuid,
        editor_id: Uuid,
        changes: PostChanges,
    ) -> Result<PostSummary> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        if post.user_id != editor_id {
            tracing::warn!(post_id = %post_id, editor_id = %editor_id, "Rejected edit by non-owner");
            return Err(AppError::Forbidden(
                "Only the author can edit this post".to_string(),
            ));
        }

        if changes.is_empty() {
            return self.single(post, Some(editor_id)).await;
        }

        let updated = self
            .store
            .update_post(post_id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        tracing::info!(post_id = %post_id, "Post updated");
        self.single(updated, Some(editor_id)).await
    }

    async fn single(&self, post: Post, viewer_id: Option<Uuid>) -> Result<PostSummary> {
        self.annotator
            .annotate(vec![post], viewer_id)
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("annotation dropped a post".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::{Duration, Utc};

    #[test]
    fn test_compose_filter_without_viewer() {
        assert_eq!(compose_filter(FeedMode::Home, None, None).unwrap(), PostFilter::All);
        assert_eq!(compose_filter(FeedMode::Explore, None, None).unwrap(), PostFilter::All);

        let err = compose_filter(FeedMode::Saved, None, None).unwrap_err();
        assert_eq!(err.to_string(), "viewer required");
    }

    #[test]
    fn test_compose_filter_with_network() {
        let viewer = Uuid::new_v4();
        let network = vec![viewer];

        assert_eq!(
            compose_filter(FeedMode::Home, Some(viewer), Some(network.clone())).unwrap(),
            PostFilter::AuthorIn(network.clone())
        );
        assert_eq!(
            compose_filter(FeedMode::Explore, Some(viewer), Some(network.clone())).unwrap(),
            PostFilter::AuthorNotIn(network)
        );
        assert_eq!(
            compose_filter(FeedMode::Saved, Some(viewer), None).unwrap(),
            PostFilter::SavedBy(viewer)
        );
    }

    #[tokio::test]
    async fn test_home_without_follows_is_own_posts() {
        let store = Arc::new(MemoryStore::new());
        let viewer = store.insert_user("viewer", None).await;
        let other = store.insert_user("other", None).await;
        let now = Utc::now();
        let mine = store.insert_post(viewer.id, Some("mine"), None, now).await;
        store
            .insert_post(other.id, Some("theirs"), None, now + Duration::seconds(1))
            .await;

        let service = FeedService::new(store);
        let (items, pagination) = service
            .get_feed(FeedMode::Home, Some(viewer.id), PageRequest::new(1, 10))
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, mine.id);
        assert_eq!(pagination.total, 1);
        assert_eq!(pagination.has_more, Some(false));
    }

    #[tokio::test]
    async fn test_blank_search_skips_store() {
        let store = Arc::new(MemoryStore::new());
        let service = FeedService::new(store.clone());

        assert!(service.search("", None, 20).await.unwrap().is_empty());
        assert!(service.search("   \t", None, 20).await.unwrap().is_empty());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_post_requires_owner() {
        let store = Arc::new(MemoryStore::new());
        let owner = store.insert_user("owner", None).await;
        let intruder = store.insert_user("intruder", None).await;
        let post = store.insert_post(owner.id, Some("before"), None, Utc::now()).await;
        let service = FeedService::new(store);

        let changes = PostChanges {
            caption: Some("after".into()),
            location: None,
        };
        let err = service
            .update_post(post.id, intruder.id, changes.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = service.update_post(post.id, owner.id, changes).await.unwrap();
        assert_eq!(updated.caption.as_deref(), Some("after"));
    }
}
