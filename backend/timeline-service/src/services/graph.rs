//! Graph membership resolution: who is "in-network" for a viewer

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::db::FeedStore;
use crate::error::Result;

pub struct GraphResolver {
    store: Arc<dyn FeedStore>,
}

impl GraphResolver {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    /// The viewer plus every account the viewer follows.
    ///
    /// `None` when there is no viewer, meaning no personalization applies.
    pub async fn in_network(&self, viewer_id: Option<Uuid>) -> Result<Option<HashSet<Uuid>>> {
        let Some(viewer_id) = viewer_id else {
            return Ok(None);
        };

        let mut members: HashSet<Uuid> =
            self.store.following_ids(viewer_id).await?.into_iter().collect();
        members.insert(viewer_id);

        tracing::debug!(viewer_id = %viewer_id, size = members.len(), "Resolved in-network set");
        Ok(Some(members))
    }
}
