use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::AppState;

/// GET /health
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "timeline-service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health/ready - the store must answer a ping
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    match state.store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "ready" })),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unavailable",
                "error": "store unreachable",
            }))
        }
    }
}
