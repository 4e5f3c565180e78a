//! Liveness probe, generalizing `routes/health.rs::health_scope()` — no
//! dependency checks, just "the process is up and serving requests".

use actix_web::{get, HttpResponse};
use serde_json::json;

#[get("/healthz")]
pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(json!({"status": "OK"}))
}
