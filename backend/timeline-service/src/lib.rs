//! Timeline Service Library
//!
//! Composes home, explore and saved feeds for the Nova social platform and
//! owns the like/save/follow/comment mutations that feed them.
//!
//! # Modules
//!
//! - `handlers`: HTTP request handlers and route registration
//! - `models`: Row types, response contracts and pagination
//! - `services`: Feed composition, annotation and mutations
//! - `db`: The `FeedStore` seam with PostgreSQL and in-process implementations
//! - `error`: Error types and their HTTP rendering
//! - `config`: Configuration management
//! - `metrics`: Prometheus collectors

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::{Config, FeedConfig};
pub use error::{AppError, Result};

use db::FeedStore;

/// Shared handler state; the store is the only cross-request resource.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FeedStore>,
    pub feed: FeedConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn FeedStore>, feed: FeedConfig) -> Self {
        Self { store, feed }
    }
}
