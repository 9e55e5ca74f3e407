//! HTTP controllers
//!
//! Each module exposes `config(cfg: &mut web::ServiceConfig)` and is wired
//! up in main.rs.

pub mod accounts;
pub mod agents;
pub mod conversations;
pub mod dashboard;
pub mod health;
pub mod integrations;
pub mod plans;

use actix_web::HttpResponse;

pub(crate) fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": "Internal server error"
    }))
}

pub(crate) fn not_found(what: &str) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": format!("{} not found", what) }))
}

pub(crate) fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
}
