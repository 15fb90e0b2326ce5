use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::{parse_viewer, PageQuery};
use crate::error::Result;
use crate::models::{ApiResponse, PageRequest};
use crate::services::feed::SEARCH_DEFAULT_LIMIT;
use crate::services::{FeedMode, FeedService};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<String>,
}

async fn feed_page(state: &AppState, mode: FeedMode, query: &PageQuery) -> Result<HttpResponse> {
    let viewer_id = parse_viewer(query.user_id.as_deref())?;
    let page = PageRequest::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        mode.default_limit(),
        state.feed.max_page_size,
    );

    let (items, pagination) = FeedService::new(state.store.clone())
        .get_feed(mode, viewer_id, page)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::paginated(items, pagination)))
}

/// GET /posts/feed
pub async fn home_feed(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    feed_page(&state, FeedMode::Home, &query).await
}

/// GET /posts/explore
pub async fn explore_feed(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    feed_page(&state, FeedMode::Explore, &query).await
}

/// GET /posts/saved
pub async fn saved_feed(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    feed_page(&state, FeedMode::Saved, &query).await
}

/// GET /posts/search
pub async fn search_posts(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let viewer_id = parse_viewer(query.user_id.as_deref())?;
    let limit = PageRequest::from_query(
        None,
        query.limit.as_deref(),
        SEARCH_DEFAULT_LIMIT,
        state.feed.max_page_size,
    )
    .limit;

    let items = FeedService::new(state.store.clone())
        .search(query.q.as_deref().unwrap_or_default(), viewer_id, limit)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(items)))
}
