//! Account endpoints: registration, login, profile, profile image upload

use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures_util::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::io::Write;

use super::internal_error;
use crate::auth;
use crate::middleware::session_auth::{authenticate, extract_token};
use crate::models::User;
use crate::AppState;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    #[serde(default)]
    full_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct ProfileUpdateRequest {
    email: String,
    full_name: String,
}

#[derive(Deserialize)]
pub struct DeleteAccountRequest {
    password: String,
}

#[derive(Serialize)]
struct ProfilePayload {
    id: i64,
    email: String,
    full_name: String,
    short_name: String,
    profile_image_url: String,
    is_active: bool,
    created_at: String,
}

impl ProfilePayload {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            short_name: user.short_name().to_string(),
            profile_image_url: user.profile_image_url(),
            is_active: user.is_active,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/accounts")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/profile", web::get().to(get_profile))
            .route("/profile", web::put().to(update_profile))
            .route("/profile/image", web::post().to(upload_profile_image))
            .route("/delete", web::post().to(delete_account)),
    );
}

async fn register(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> impl Responder {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "A valid email is required"
        }));
    }
    if body.password.trim().is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Password is required"
        }));
    }

    match state.db.email_exists(&email) {
        Ok(true) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "An account with this email already exists"
            }));
        }
        Ok(false) => {}
        Err(e) => {
            log::error!("Failed to check email: {}", e);
            return internal_error();
        }
    }

    let password_hash = match auth::hash_password(&body.password) {
        Ok(h) => h,
        Err(_) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Password is required"
            }));
        }
    };

    let user = match state.db.create_user(&email, &password_hash, body.full_name.trim()) {
        Ok(user) => user,
        Err(e) => {
            log::error!("Failed to create user: {}", e);
            return internal_error();
        }
    };

    let token = auth::generate_token();
    match state
        .db
        .create_session(user.id, &token, state.config.session_ttl_hours)
    {
        Ok(session) => HttpResponse::Created().json(serde_json::json!({
            "user": ProfilePayload::from_user(&user),
            "token": session.token,
            "expires_at": session.expires_at.to_rfc3339(),
        })),
        Err(e) => {
            log::error!("Failed to create session: {}", e);
            internal_error()
        }
    }
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> impl Responder {
    let email = body.email.trim().to_lowercase();
    let user = match state.db.get_user_by_email(&email) {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "Invalid email or password"
            }));
        }
        Err(e) => {
            log::error!("Failed to look up user: {}", e);
            return internal_error();
        }
    };

    if !auth::verify_password(&user.password_hash, &body.password) {
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "Invalid email or password"
        }));
    }
    if !user.is_active {
        return HttpResponse::Forbidden().json(serde_json::json!({
            "error": "Account is inactive"
        }));
    }

    let token = auth::generate_token();
    match state
        .db
        .create_session(user.id, &token, state.config.session_ttl_hours)
    {
        Ok(session) => HttpResponse::Ok().json(serde_json::json!({
            "user": ProfilePayload::from_user(&user),
            "token": session.token,
            "expires_at": session.expires_at.to_rfc3339(),
        })),
        Err(e) => {
            log::error!("Failed to create session: {}", e);
            internal_error()
        }
    }
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let Some(token) = extract_token(&req) else {
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "No authorization token provided"
        }));
    };
    match state.db.delete_session(&token) {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => {
            log::error!("Failed to delete session: {}", e);
            internal_error()
        }
    }
}

async fn get_profile(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.db.get_user(session.user_id) {
        Ok(Some(user)) => HttpResponse::Ok().json(ProfilePayload::from_user(&user)),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({ "error": "User not found" })),
        Err(e) => {
            log::error!("Failed to load profile: {}", e);
            internal_error()
        }
    }
}

async fn update_profile(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ProfileUpdateRequest>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "A valid email is required"
        }));
    }

    // Reject switching to an email another account already holds.
    match state.db.get_user_by_email(&email) {
        Ok(Some(user)) if user.id != session.user_id => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "An account with this email already exists"
            }));
        }
        Ok(_) => {}
        Err(e) => {
            log::error!("Failed to check email: {}", e);
            return internal_error();
        }
    }

    match state
        .db
        .update_user_profile(session.user_id, &email, body.full_name.trim())
    {
        Ok(Some(user)) => HttpResponse::Ok().json(ProfilePayload::from_user(&user)),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({ "error": "User not found" })),
        Err(e) => {
            log::error!("Failed to update profile: {}", e);
            internal_error()
        }
    }
}

async fn upload_profile_image(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: Multipart,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    while let Ok(Some(mut field)) = payload.try_next().await {
        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_default();
        if !content_type.starts_with("image/") {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Only image uploads are allowed"
            }));
        }

        let extension = content_type
            .split('/')
            .nth(1)
            .unwrap_or("png")
            .to_string();
        let relative = format!("profile_images/{}.{}", uuid::Uuid::new_v4(), extension);
        let target = std::path::Path::new(&state.config.media_root).join(&relative);
        if let Some(parent) = target.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create media directory: {}", e);
                return internal_error();
            }
        }

        let mut file = match std::fs::File::create(&target) {
            Ok(f) => f,
            Err(e) => {
                log::error!("Failed to create image file: {}", e);
                return internal_error();
            }
        };

        let mut written = 0usize;
        while let Some(chunk) = field.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    log::error!("Upload stream error: {}", e);
                    let _ = std::fs::remove_file(&target);
                    return internal_error();
                }
            };
            written += chunk.len();
            if written > MAX_IMAGE_BYTES {
                let _ = std::fs::remove_file(&target);
                return HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "Image must be 5MB or smaller"
                }));
            }
            if let Err(e) = file.write_all(&chunk) {
                log::error!("Failed to write image: {}", e);
                let _ = std::fs::remove_file(&target);
                return internal_error();
            }
        }

        return match state.db.update_user_profile_image(session.user_id, &relative) {
            Ok(Some(user)) => HttpResponse::Ok().json(ProfilePayload::from_user(&user)),
            Ok(None) => {
                HttpResponse::NotFound().json(serde_json::json!({ "error": "User not found" }))
            }
            Err(e) => {
                log::error!("Failed to store image path: {}", e);
                internal_error()
            }
        };
    }

    HttpResponse::BadRequest().json(serde_json::json!({
        "error": "No image field in upload"
    }))
}

async fn delete_account(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<DeleteAccountRequest>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let user = match state.db.get_user(session.user_id) {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({ "error": "User not found" }));
        }
        Err(e) => {
            log::error!("Failed to load user: {}", e);
            return internal_error();
        }
    };

    if !auth::verify_password(&user.password_hash, &body.password) {
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "Incorrect password"
        }));
    }

    if let Err(e) = state.db.delete_user_sessions(user.id) {
        log::error!("Failed to clear sessions: {}", e);
        return internal_error();
    }
    state.stats.invalidate_prefix(&format!("stats:{}:", user.id));
    state.stats.invalidate_prefix(&format!("engagement:{}", user.id));
    match state.db.delete_user(user.id) {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => {
            log::error!("Failed to delete account: {}", e);
            internal_error()
        }
    }
}
