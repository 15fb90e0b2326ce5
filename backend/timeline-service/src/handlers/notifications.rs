use actix_web::{web, HttpResponse};
use serde::Serialize;

use super::{require_user_id, ActorBody, PageQuery};
use crate::error::Result;
use crate::models::{ApiResponse, PageRequest};
use crate::services::notifications::NOTIFICATIONS_DEFAULT_LIMIT;
use crate::services::NotificationService;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// GET /notifications?userId
pub async fn list_notifications(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let recipient_id = require_user_id(query.user_id.as_deref())?;
    let page = PageRequest::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        NOTIFICATIONS_DEFAULT_LIMIT,
        state.feed.max_page_size,
    );

    let (inbox, pagination) = NotificationService::new(state.store.clone())
        .list(recipient_id, page)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::paginated(inbox, pagination)))
}

/// POST /notifications/read
pub async fn mark_read(
    state: web::Data<AppState>,
    body: web::Json<ActorBody>,
) -> Result<HttpResponse> {
    let recipient_id = body.actor()?;
    let updated = NotificationService::new(state.store.clone())
        .mark_all_read(recipient_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(MarkReadResponse { updated })))
}
