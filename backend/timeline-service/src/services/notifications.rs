//! Notification side effects and the recipient's inbox

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::db::FeedStore;
use crate::error::Result;
use crate::metrics::feed::record_notification;
use crate::models::{
    NewNotification, NotificationKind, NotificationList, NotificationSummary, PageRequest,
    Pagination, UserSummary,
};

pub const NOTIFICATIONS_DEFAULT_LIMIT: i64 = 20;

pub struct NotificationService {
    store: Arc<dyn FeedStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    /// Notification owed to `recipient_id` for an action by `actor_id`.
    ///
    /// Self-actions never notify. The result is handed to the store together
    /// with the edge it describes so both commit in one write.
    pub fn pending(
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        post_id: Option<Uuid>,
        message: Option<String>,
    ) -> Option<NewNotification> {
        (recipient_id != actor_id).then_some(NewNotification {
            recipient_id,
            actor_id,
            kind,
            post_id,
            message,
        })
    }

    /// Bookkeeping once a write carrying `notification` has committed
    pub fn delivered(notification: Option<&NewNotification>) {
        let Some(notification) = notification else {
            return;
        };

        record_notification(notification.kind.as_str());
        tracing::debug!(
            recipient_id = %notification.recipient_id,
            actor_id = %notification.actor_id,
            kind = %notification.kind,
            "Notification created"
        );
    }

    /// Newest-first page of notifications with the unread total
    pub async fn list(
        &self,
        recipient_id: Uuid,
        page: PageRequest,
    ) -> Result<(NotificationList, Pagination)> {
        let (rows, (total, unread)) = tokio::try_join!(
            self.store
                .list_notifications(recipient_id, page.limit, page.offset()),
            self.store.count_notifications(recipient_id),
        )?;

        let mut actor_ids: Vec<Uuid> = rows.iter().map(|n| n.actor_id).collect();
        actor_ids.sort_unstable();
        actor_ids.dedup();

        let actors: HashMap<Uuid, UserSummary> = if actor_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .find_users(&actor_ids)
                .await?
                .iter()
                .map(|u| (u.id, UserSummary::from(u)))
                .collect()
        };

        let notifications = rows
            .into_iter()
            .map(|n| NotificationSummary {
                actor: actors.get(&n.actor_id).cloned(),
                id: n.id,
                kind: n.kind,
                post_id: n.post_id,
                message: n.message,
                is_read: n.is_read,
                created_at: n.created_at,
            })
            .collect();

        Ok((
            NotificationList {
                notifications,
                unread_count: unread,
            },
            Pagination::with_has_more(page, total),
        ))
    }

    pub async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        let updated = self.store.mark_notifications_read(recipient_id).await?;
        tracing::debug!(recipient_id = %recipient_id, updated, "Marked notifications read");
        Ok(updated)
    }
}
