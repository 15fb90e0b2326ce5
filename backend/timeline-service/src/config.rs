//! Configuration management for Timeline Service
//!
//! Loads configuration from environment variables. Pool sizing and timeouts
//! (`DB_*`) are read by `db_pool::DbConfig::from_env`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub cors: CorsConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Apply `migrations/` on startup
    pub run_migrations: bool,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

/// Feed composition limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Upper bound applied to every `limit` query parameter
    pub max_page_size: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; empty means any origin
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_max_page_size() -> i64 {
    50
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_port),
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            run_migrations: std::env::var("RUN_MIGRATIONS")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(true),
        };

        let max_page_size = match std::env::var("FEED_MAX_PAGE_SIZE") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|v| *v > 0)
                .with_context(|| format!("FEED_MAX_PAGE_SIZE must be a positive integer, got {raw:?}"))?,
            Err(_) => default_max_page_size(),
        };

        let cors = CorsConfig {
            allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty() && *o != "*")
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Ok(Config {
            app,
            database,
            feed: FeedConfig { max_page_size },
            cors,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "PORT",
            "DATABASE_URL",
            "RUN_MIGRATIONS",
            "FEED_MAX_PAGE_SIZE",
            "CORS_ALLOWED_ORIGINS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_default_values() {
        clear();
        std::env::set_var("DATABASE_URL", "postgres://test");

        let config = Config::from_env().unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.app.host, "0.0.0.0");
        assert_eq!(config.app.port, 8080);
        assert!(config.database.run_migrations);
        assert_eq!(config.feed.max_page_size, 50);
        assert!(config.cors.allowed_origins.is_empty());
        assert!(!config.is_production());
        clear();
    }

    #[test]
    #[serial]
    fn test_missing_database_url() {
        clear();
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("PORT", "9090");
        std::env::set_var("RUN_MIGRATIONS", "false");
        std::env::set_var("FEED_MAX_PAGE_SIZE", "30");
        std::env::set_var(
            "CORS_ALLOWED_ORIGINS",
            "https://app.example.com, https://admin.example.com",
        );

        let config = Config::from_env().unwrap();

        assert!(config.is_production());
        assert_eq!(config.app.port, 9090);
        assert!(!config.database.run_migrations);
        assert_eq!(config.feed.max_page_size, 30);
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        clear();
    }

    #[test]
    #[serial]
    fn test_invalid_page_size_is_rejected() {
        clear();
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("FEED_MAX_PAGE_SIZE", "0");

        assert!(Config::from_env().is_err());
        clear();
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let db = DatabaseConfig {
            url: "postgres://user:secret@db/app".into(),
            run_migrations: true,
        };
        assert!(!format!("{db:?}").contains("secret"));
    }
}
