use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use super::{parse_optional_id, require_user_id, PageQuery};
use crate::error::Result;
use crate::models::{ApiResponse, PageRequest};
use crate::services::comments::COMMENTS_DEFAULT_LIMIT;
use crate::services::CommentService;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub content: String,
    pub parent_id: Option<String>,
}

/// GET /posts/{id}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = PageRequest::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        COMMENTS_DEFAULT_LIMIT,
        state.feed.max_page_size,
    );

    let (comments, pagination) = CommentService::new(state.store.clone())
        .list_comments(path.into_inner(), page)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::paginated(comments, pagination)))
}

/// POST /posts/{id}/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    let user_id = require_user_id(req.user_id.as_deref())?;
    let parent_id = parse_optional_id(req.parent_id.as_deref(), "parentId")?;

    let comment = CommentService::new(state.store.clone())
        .create_comment(path.into_inner(), user_id, &req.content, parent_id)
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(comment)))
}
