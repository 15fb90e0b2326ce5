//! Post handlers - single post reads, owner edits, likes and saves

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{parse_viewer, require_user_id, ActorBody, PageQuery};
use crate::error::Result;
use crate::models::{ApiResponse, PostChanges};
use crate::services::{FeedService, InteractionService};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub user_id: Option<String>,
    #[validate(length(max = 2200))]
    pub caption: Option<String>,
    #[validate(length(max = 255))]
    pub location: Option<String>,
}

/// GET /posts/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let viewer_id = parse_viewer(query.user_id.as_deref())?;
    let post = FeedService::new(state.store.clone())
        .get_post(path.into_inner(), viewer_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// PATCH /posts/{id}
pub async fn update_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let editor_id = require_user_id(req.user_id.as_deref())?;
    req.validate()?;

    let changes = PostChanges {
        caption: req.caption,
        location: req.location,
    };
    let post = FeedService::new(state.store.clone())
        .update_post(path.into_inner(), editor_id, changes)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// POST /posts/{id}/like
pub async fn like_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ActorBody>,
) -> Result<HttpResponse> {
    let user_id = body.actor()?;
    let like = InteractionService::new(state.store.clone())
        .like_post(path.into_inner(), user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(like)))
}

/// DELETE /posts/{id}/like
pub async fn unlike_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ActorBody>,
) -> Result<HttpResponse> {
    let user_id = body.actor()?;
    let like = InteractionService::new(state.store.clone())
        .unlike_post(path.into_inner(), user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(like)))
}

/// POST /posts/{id}/save
pub async fn save_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ActorBody>,
) -> Result<HttpResponse> {
    let user_id = body.actor()?;
    let saved = InteractionService::new(state.store.clone())
        .save_post(path.into_inner(), user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(saved)))
}

/// DELETE /posts/{id}/save
pub async fn unsave_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ActorBody>,
) -> Result<HttpResponse> {
    let user_id = body.actor()?;
    let saved = InteractionService::new(state.store.clone())
        .unsave_post(path.into_inner(), user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(saved)))
}
