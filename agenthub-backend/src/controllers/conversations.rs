//! Conversation endpoints: filtered listing, messages, tags, notes, feedback

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use std::collections::HashMap;

use super::{bad_request, internal_error, not_found};
use crate::middleware::session_auth::authenticate;
use crate::models::{ConversationFilter, SenderType};
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    agent_id: i64,
    conversation_name: Option<String>,
}

#[derive(Deserialize)]
pub struct AttachmentRequest {
    attachment_name: Option<String>,
    attachment_path: Option<String>,
    attachment_type: Option<String>,
    attachment_size: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateMessageRequest {
    sender_type: String,
    message_text: Option<String>,
    message_type: Option<String>,
    #[serde(default)]
    attachments: Vec<AttachmentRequest>,
}

#[derive(Deserialize)]
pub struct TagRequest {
    tag_name: String,
}

#[derive(Deserialize)]
pub struct NoteRequest {
    note_text: String,
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    feedback_text: Option<String>,
    rating: Option<i64>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/conversations")
            .route("", web::get().to(list_conversations))
            .route("", web::post().to(create_conversation))
            .route("/{id}/messages", web::get().to(list_messages))
            .route("/{id}/messages", web::post().to(create_message))
            .route("/{id}/messages/{mid}/read", web::post().to(mark_read))
            .route("/{id}/messages/{mid}", web::delete().to(delete_message))
            .route("/{id}/tags", web::get().to(list_tags))
            .route("/{id}/tags", web::post().to(add_tag))
            .route("/{id}/notes", web::get().to(list_notes))
            .route("/{id}/notes", web::post().to(add_note))
            .route("/{id}/feedback", web::get().to(list_feedback))
            .route("/{id}/feedback", web::post().to(add_feedback)),
    );
}

/// Parse and bound-check page/limit query values. `total` is the filtered
/// result size; page must not run past the last page of a non-empty result.
fn validate_pagination(
    page_raw: Option<&str>,
    limit_raw: Option<&str>,
    total: usize,
) -> Result<(usize, usize, usize), String> {
    let page: i64 = match page_raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| "page must be an integer".to_string())?,
        None => 1,
    };
    let limit: i64 = match limit_raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| "limit must be an integer".to_string())?,
        None => 20,
    };

    if page < 1 {
        return Err("page must be at least 1".to_string());
    }
    if !(1..=100).contains(&limit) {
        return Err("limit must be between 1 and 100".to_string());
    }

    let total_pages = if total == 0 {
        0
    } else {
        (total + limit as usize - 1) / limit as usize
    };
    if total_pages > 0 && page as usize > total_pages {
        return Err(format!("page exceeds total pages ({})", total_pages));
    }
    Ok((page as usize, limit as usize, total_pages))
}

async fn list_conversations(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let filter = match query.get("filter").map(|s| s.as_str()) {
        Some(raw) => match ConversationFilter::from_str(raw) {
            Some(f) => Some(f),
            None => return bad_request("Unknown filter value"),
        },
        None => None,
    };

    let overviews = match state.db.list_conversation_overviews(session.user_id, filter) {
        Ok(o) => o,
        Err(e) => {
            log::error!("Failed to list conversations: {}", e);
            return internal_error();
        }
    };

    let total = overviews.len();
    let (page, limit, total_pages) = match validate_pagination(
        query.get("page").map(|s| s.as_str()),
        query.get("limit").map(|s| s.as_str()),
        total,
    ) {
        Ok(v) => v,
        Err(message) => return bad_request(&message),
    };

    if total == 0 {
        return not_found("Conversations");
    }

    let start = (page - 1) * limit;
    let data: Vec<_> = overviews.into_iter().skip(start).take(limit).collect();

    HttpResponse::Ok().json(serde_json::json!({
        "data": data,
        "total": total,
        "page": page,
        "limit": limit,
        "totalPages": total_pages,
    }))
}

async fn create_conversation(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateConversationRequest>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.db.get_agent_for_user(body.agent_id, session.user_id) {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("Agent"),
        Err(e) => {
            log::error!("Failed to check agent: {}", e);
            return internal_error();
        }
    }
    match state
        .db
        .create_conversation(body.agent_id, body.conversation_name.as_deref())
    {
        Ok(conversation) => HttpResponse::Created().json(conversation),
        Err(e) => {
            log::error!("Failed to create conversation: {}", e);
            internal_error()
        }
    }
}

async fn create_message(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<CreateMessageRequest>,
) -> impl Responder {
    let conversation_id = path.into_inner();
    let user_id = match owned_conversation(&state, &req, conversation_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(sender_type) = SenderType::from_str(&body.sender_type) else {
        return bad_request("sender_type must be 'user' or 'agent'");
    };
    let sender_id = match sender_type {
        SenderType::User => Some(user_id),
        SenderType::Agent => None,
    };

    let message = match state.db.add_message(
        conversation_id,
        sender_id,
        sender_type,
        body.message_text.as_deref(),
        body.message_type.as_deref(),
    ) {
        Ok(m) => m,
        Err(e) => {
            log::error!("Failed to add message: {}", e);
            return internal_error();
        }
    };

    let mut attachments = Vec::with_capacity(body.attachments.len());
    for attachment in &body.attachments {
        match state.db.add_attachment(
            message.message_id,
            attachment.attachment_name.as_deref(),
            attachment.attachment_path.as_deref(),
            attachment.attachment_type.as_deref(),
            attachment.attachment_size,
        ) {
            Ok(stored) => attachments.push(stored),
            Err(e) => {
                log::error!("Failed to add attachment: {}", e);
                return internal_error();
            }
        }
    }

    let mut payload = serde_json::to_value(&message).unwrap_or_default();
    if let Some(obj) = payload.as_object_mut() {
        obj.insert(
            "attachments".to_string(),
            serde_json::to_value(&attachments).unwrap_or_default(),
        );
    }
    HttpResponse::Created().json(payload)
}

/// Ownership check shared by all per-conversation routes.
fn owned_conversation(
    state: &AppState,
    req: &HttpRequest,
    conversation_id: i64,
) -> Result<i64, HttpResponse> {
    let session = authenticate(&state.db, req)?;
    match state.db.conversation_owned_by(conversation_id, session.user_id) {
        Ok(true) => Ok(session.user_id),
        Ok(false) => Err(not_found("Conversation")),
        Err(e) => {
            log::error!("Ownership check failed: {}", e);
            Err(internal_error())
        }
    }
}

async fn list_messages(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let conversation_id = path.into_inner();
    if let Err(resp) = owned_conversation(&state, &req, conversation_id) {
        return resp;
    }
    match state.db.list_messages(conversation_id) {
        Ok(messages) if messages.is_empty() => not_found("Messages"),
        Ok(messages) => {
            let payload: Vec<serde_json::Value> = messages
                .into_iter()
                .map(|(message, attachments)| {
                    let mut value = serde_json::to_value(&message).unwrap_or_default();
                    if let Some(obj) = value.as_object_mut() {
                        obj.insert(
                            "attachments".to_string(),
                            serde_json::to_value(&attachments).unwrap_or_default(),
                        );
                    }
                    value
                })
                .collect();
            HttpResponse::Ok().json(payload)
        }
        Err(e) => {
            log::error!("Failed to list messages: {}", e);
            internal_error()
        }
    }
}

async fn mark_read(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let (conversation_id, message_id) = path.into_inner();
    if let Err(resp) = owned_conversation(&state, &req, conversation_id) {
        return resp;
    }
    match state.db.mark_message_read(conversation_id, message_id) {
        Ok(true) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Ok(false) => not_found("Message"),
        Err(e) => {
            log::error!("Failed to mark message read: {}", e);
            internal_error()
        }
    }
}

async fn delete_message(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let (conversation_id, message_id) = path.into_inner();
    if let Err(resp) = owned_conversation(&state, &req, conversation_id) {
        return resp;
    }
    match state.db.soft_delete_message(conversation_id, message_id) {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found("Message"),
        Err(e) => {
            log::error!("Failed to delete message: {}", e);
            internal_error()
        }
    }
}

async fn list_tags(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let conversation_id = path.into_inner();
    if let Err(resp) = owned_conversation(&state, &req, conversation_id) {
        return resp;
    }
    match state.db.list_tags(conversation_id) {
        Ok(tags) => HttpResponse::Ok().json(tags),
        Err(e) => {
            log::error!("Failed to list tags: {}", e);
            internal_error()
        }
    }
}

async fn add_tag(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<TagRequest>,
) -> impl Responder {
    let conversation_id = path.into_inner();
    if let Err(resp) = owned_conversation(&state, &req, conversation_id) {
        return resp;
    }
    let tag_name = body.tag_name.trim();
    if tag_name.is_empty() {
        return bad_request("tag_name is required");
    }
    match state.db.add_tag(conversation_id, tag_name) {
        Ok(Some(tag)) => HttpResponse::Created().json(tag),
        Ok(None) => bad_request("Tag already exists on this conversation"),
        Err(e) => {
            log::error!("Failed to add tag: {}", e);
            internal_error()
        }
    }
}

async fn list_notes(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let conversation_id = path.into_inner();
    if let Err(resp) = owned_conversation(&state, &req, conversation_id) {
        return resp;
    }
    match state.db.list_notes(conversation_id) {
        Ok(notes) => HttpResponse::Ok().json(notes),
        Err(e) => {
            log::error!("Failed to list notes: {}", e);
            internal_error()
        }
    }
}

async fn add_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<NoteRequest>,
) -> impl Responder {
    let conversation_id = path.into_inner();
    if let Err(resp) = owned_conversation(&state, &req, conversation_id) {
        return resp;
    }
    let note_text = body.note_text.trim();
    if note_text.is_empty() {
        return bad_request("note_text is required");
    }
    match state.db.add_note(conversation_id, note_text) {
        Ok(Some(note)) => HttpResponse::Created().json(note),
        Ok(None) => bad_request("An identical note already exists on this conversation"),
        Err(e) => {
            log::error!("Failed to add note: {}", e);
            internal_error()
        }
    }
}

async fn list_feedback(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let conversation_id = path.into_inner();
    if let Err(resp) = owned_conversation(&state, &req, conversation_id) {
        return resp;
    }
    match state.db.list_feedback(conversation_id) {
        Ok(feedback) => HttpResponse::Ok().json(feedback),
        Err(e) => {
            log::error!("Failed to list feedback: {}", e);
            internal_error()
        }
    }
}

async fn add_feedback(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<FeedbackRequest>,
) -> impl Responder {
    let conversation_id = path.into_inner();
    if let Err(resp) = owned_conversation(&state, &req, conversation_id) {
        return resp;
    }
    if let Some(rating) = body.rating {
        if !(1..=5).contains(&rating) {
            return bad_request("rating must be between 1 and 5");
        }
    }
    match state
        .db
        .add_feedback(conversation_id, body.feedback_text.as_deref(), body.rating)
    {
        Ok(feedback) => HttpResponse::Created().json(feedback),
        Err(e) => {
            log::error!("Failed to add feedback: {}", e);
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(validate_pagination(None, None, 45), Ok((1, 20, 3)));
    }

    #[test]
    fn test_pagination_bounds() {
        assert!(validate_pagination(Some("0"), None, 10).is_err());
        assert!(validate_pagination(None, Some("0"), 10).is_err());
        assert!(validate_pagination(None, Some("101"), 10).is_err());
        assert!(validate_pagination(Some("abc"), None, 10).is_err());
        assert!(validate_pagination(None, Some("ten"), 10).is_err());
    }

    #[test]
    fn test_pagination_page_overflow() {
        // 10 items at limit 5 is 2 pages; page 3 is out of range.
        assert!(validate_pagination(Some("3"), Some("5"), 10).is_err());
        assert_eq!(validate_pagination(Some("2"), Some("5"), 10), Ok((2, 5, 2)));
    }

    #[test]
    fn test_pagination_empty_result_passes_validation() {
        // Empty results become a 404 after pagination checks.
        assert_eq!(validate_pagination(Some("1"), Some("10"), 0), Ok((1, 10, 0)));
    }
}
