use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::{parse_viewer, ActorBody, PageQuery};
use crate::error::Result;
use crate::models::{ApiResponse, PageRequest};
use crate::services::users::FOLLOW_LIST_DEFAULT_LIMIT;
use crate::services::{FollowDirection, InteractionService, UserService};
use crate::AppState;

/// GET /users/{id}
pub async fn get_profile(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let viewer_id = parse_viewer(query.user_id.as_deref())?;
    let profile = UserService::new(state.store.clone())
        .get_profile(path.into_inner(), viewer_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

/// POST /users/{id}/follow - body `userId` is the follower
pub async fn follow_user(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ActorBody>,
) -> Result<HttpResponse> {
    let follower_id = body.actor()?;
    let follow = InteractionService::new(state.store.clone())
        .follow_user(follower_id, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(follow)))
}

/// DELETE /users/{id}/follow
pub async fn unfollow_user(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ActorBody>,
) -> Result<HttpResponse> {
    let follower_id = body.actor()?;
    let follow = InteractionService::new(state.store.clone())
        .unfollow_user(follower_id, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(follow)))
}

async fn follow_list(
    state: &AppState,
    user_id: Uuid,
    direction: FollowDirection,
    query: &PageQuery,
) -> Result<HttpResponse> {
    let page = PageRequest::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        FOLLOW_LIST_DEFAULT_LIMIT,
        state.feed.max_page_size,
    );

    let (users, pagination) = UserService::new(state.store.clone())
        .list_follows(user_id, direction, page)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::paginated(users, pagination)))
}

/// GET /users/{id}/followers
pub async fn list_followers(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    follow_list(&state, path.into_inner(), FollowDirection::Followers, &query).await
}

/// GET /users/{id}/following
pub async fn list_following(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    follow_list(&state, path.into_inner(), FollowDirection::Following, &query).await
}
