//! HTTP handlers for timeline-service
//!
//! - Feed: home, explore, saved, search
//! - Posts: single post read/edit, like, save, comments
//! - Users: profile, follow/unfollow, follower lists
//! - Notifications: inbox and mark-as-read
//! - Health: liveness and store readiness
//!
//! The viewer is never ambient: reads take `userId` from the query string and
//! mutations from the JSON body.

use actix_web::{error, web, HttpRequest};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub mod comments;
pub mod feed;
pub mod health;
pub mod notifications;
pub mod posts;
pub mod users;

/// `page` / `limit` / `userId` as they arrive in the query string.
///
/// Kept as strings so garbage values fall back to defaults instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub user_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Body carried by every like/save/follow mutation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorBody {
    pub user_id: Option<String>,
}

impl ActorBody {
    pub fn actor(&self) -> Result<Uuid> {
        require_user_id(self.user_id.as_deref())
    }
}

/// Optional id field; blank is treated as absent
pub(crate) fn parse_optional_id(raw: Option<&str>, field: &str) -> Result<Option<Uuid>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => Uuid::parse_str(v)
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid {field}"))),
    }
}

/// Optional viewer id; blank means anonymous
pub(crate) fn parse_viewer(raw: Option<&str>) -> Result<Option<Uuid>> {
    parse_optional_id(raw, "userId")
}

pub(crate) fn require_user_id(raw: Option<&str>) -> Result<Uuid> {
    parse_viewer(raw)?.ok_or_else(|| AppError::Validation("userId is required".to_string()))
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "Rejected path parameter");
    AppError::Validation("Invalid id".to_string()).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid query string: {err}")).into()
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid request body: {err}")).into()
}

/// Register every route. Mounted under `/api/v1` by the binary.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PathConfig::default().error_handler(path_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/health", web::get().to(health::liveness))
        .route("/health/ready", web::get().to(health::readiness))
        .service(
            web::scope("/posts")
                // Fixed segments first so they never match `/{id}`
                .route("/feed", web::get().to(feed::home_feed))
                .route("/explore", web::get().to(feed::explore_feed))
                .route("/saved", web::get().to(feed::saved_feed))
                .route("/search", web::get().to(feed::search_posts))
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(posts::get_post))
                        .route(web::patch().to(posts::update_post)),
                )
                .service(
                    web::resource("/{id}/like")
                        .route(web::post().to(posts::like_post))
                        .route(web::delete().to(posts::unlike_post)),
                )
                .service(
                    web::resource("/{id}/save")
                        .route(web::post().to(posts::save_post))
                        .route(web::delete().to(posts::unsave_post)),
                )
                .service(
                    web::resource("/{id}/comments")
                        .route(web::get().to(comments::list_comments))
                        .route(web::post().to(comments::create_comment)),
                ),
        )
        .service(
            web::scope("/users")
                .route("/{id}", web::get().to(users::get_profile))
                .service(
                    web::resource("/{id}/follow")
                        .route(web::post().to(users::follow_user))
                        .route(web::delete().to(users::unfollow_user)),
                )
                .route("/{id}/followers", web::get().to(users::list_followers))
                .route("/{id}/following", web::get().to(users::list_following)),
        )
        .service(
            web::scope("/notifications")
                .route("", web::get().to(notifications::list_notifications))
                .route("/read", web::post().to(notifications::mark_read)),
        );
}
