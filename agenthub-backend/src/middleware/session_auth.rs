// Session authentication helpers
// Authentication is handled directly in controllers; every protected handler
// calls `authenticate` and gets the session (with user_id) back for
// ownership scoping.

use actix_web::{HttpRequest, HttpResponse};
use std::sync::Arc;

use crate::db::Database;
use crate::models::AuthSession;

pub fn extract_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim_start_matches("Bearer ").trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn authenticate(db: &Arc<Database>, req: &HttpRequest) -> Result<AuthSession, HttpResponse> {
    let token = extract_token(req).ok_or_else(|| {
        HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "No authorization token provided"
        }))
    })?;

    match db.validate_session(&token) {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "Invalid or expired session"
        }))),
        Err(e) => {
            log::error!("Session validation error: {}", e);
            Err(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            })))
        }
    }
}
