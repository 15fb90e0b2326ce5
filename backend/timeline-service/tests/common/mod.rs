#![allow(dead_code)]

use std::sync::Arc;

use actix_web::{dev::ServiceResponse, test, web};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use timeline_service::db::MemoryStore;
use timeline_service::models::{Post, User};
use timeline_service::{AppState, FeedConfig};

/// Build the routed app over `$store` (an `Arc<MemoryStore>`).
macro_rules! spawn_app {
    ($store:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($crate::common::state($store))
                .configure(timeline_service::handlers::configure),
        )
        .await
    };
}

pub fn state(store: Arc<MemoryStore>) -> web::Data<AppState> {
    web::Data::new(AppState::new(store, FeedConfig::default()))
}

/// An hour ago; seeded posts count forward from here one second apart
pub fn base_time() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}

pub async fn seed_posts(store: &MemoryStore, author: &User, count: i64) -> Vec<Post> {
    let base = base_time();
    let mut posts = Vec::new();
    for i in 0..count {
        posts.push(
            store
                .insert_post(
                    author.id,
                    Some(&format!("{} post {i}", author.username)),
                    None,
                    base + Duration::seconds(i),
                )
                .await,
        );
    }
    posts
}

pub async fn body(resp: ServiceResponse) -> Value {
    test::read_body_json(resp).await
}

pub fn ids(items: &Value) -> Vec<Uuid> {
    items
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|item| item["id"].as_str())
                .filter_map(|id| Uuid::parse_str(id).ok())
                .collect()
        })
        .unwrap_or_default()
}

pub fn author_ids(items: &Value) -> Vec<Uuid> {
    items
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|item| item["userId"].as_str())
                .filter_map(|id| Uuid::parse_str(id).ok())
                .collect()
        })
        .unwrap_or_default()
}

pub fn actor(user: &User) -> Value {
    serde_json::json!({ "userId": user.id })
}
