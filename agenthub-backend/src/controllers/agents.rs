//! Agent endpoints: CRUD plus documents, QA pairs, websites and embeddings

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use super::{bad_request, internal_error, not_found};
use crate::db::tables::{AgentUpdate, DocumentInput, EmbeddingInput, QaPairInput, WebsiteInput};
use crate::middleware::session_auth::authenticate;
use crate::models::{Agent, AgentEmbedding, Visibility};
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateAgentRequest {
    name: String,
    description: String,
    #[serde(default)]
    visibility: Option<String>,
    avatar_url: Option<String>,
    configuration: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct UpdateAgentRequest {
    name: Option<String>,
    description: Option<String>,
    visibility: Option<String>,
    avatar_url: Option<String>,
    configuration: Option<serde_json::Value>,
    is_archived: Option<bool>,
    is_favorite: Option<bool>,
}

#[derive(Deserialize)]
pub struct EmbeddingSearchRequest {
    vector: Vec<f64>,
    limit: Option<usize>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/agents")
            .route("", web::get().to(list_agents))
            .route("", web::post().to(create_agent))
            .route("/{id}", web::get().to(get_agent))
            .route("/{id}", web::put().to(update_agent))
            .route("/{id}", web::delete().to(delete_agent))
            .route("/{id}/documents", web::get().to(list_documents))
            .route("/{id}/documents", web::post().to(create_document))
            .route("/{id}/documents/{doc_id}", web::delete().to(delete_document))
            .route("/{id}/qa_pairs", web::get().to(list_qa_pairs))
            .route("/{id}/qa_pairs", web::post().to(create_qa_pair))
            .route("/{id}/qa_pairs/{qa_id}", web::delete().to(delete_qa_pair))
            .route("/{id}/websites", web::get().to(list_websites))
            .route("/{id}/websites", web::post().to(create_website))
            .route("/{id}/websites/{wid}", web::delete().to(delete_website))
            .route("/{id}/embeddings", web::post().to(create_embedding))
            .route("/{id}/embeddings/search", web::post().to(search_embeddings)),
    );
}

/// Name at least 3 chars trimmed, description at least 10.
fn validate_name(name: &str) -> Result<String, HttpResponse> {
    let trimmed = name.trim();
    if trimmed.chars().count() < 3 {
        return Err(bad_request("Agent name must be at least 3 characters"));
    }
    Ok(trimmed.to_string())
}

fn validate_description(description: &str) -> Result<String, HttpResponse> {
    let trimmed = description.trim();
    if trimmed.chars().count() < 10 {
        return Err(bad_request("Description must be at least 10 characters"));
    }
    Ok(trimmed.to_string())
}

fn parse_visibility(raw: &str) -> Result<Visibility, HttpResponse> {
    Visibility::from_str(raw)
        .ok_or_else(|| bad_request("Visibility must be 'public' or 'private'"))
}

fn agent_payload(state: &AppState, agent: &Agent) -> serde_json::Value {
    let conversation_count = state
        .db
        .count_agent_conversations(agent.agent_id)
        .unwrap_or(0);
    let is_active = state.db.agent_is_active(agent.agent_id).unwrap_or(false);
    let mut payload = serde_json::to_value(agent).unwrap_or_default();
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("conversation_count".to_string(), conversation_count.into());
        obj.insert("is_active".to_string(), is_active.into());
    }
    payload
}

/// Resolve the agent for the caller or produce the error response.
fn owned_agent(
    state: &AppState,
    req: &HttpRequest,
    agent_id: i64,
) -> Result<(i64, Agent), HttpResponse> {
    let session = authenticate(&state.db, req)?;
    match state.db.get_agent_for_user(agent_id, session.user_id) {
        Ok(Some(agent)) => Ok((session.user_id, agent)),
        Ok(None) => Err(not_found("Agent")),
        Err(e) => {
            log::error!("Failed to load agent {}: {}", agent_id, e);
            Err(internal_error())
        }
    }
}

async fn list_agents(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.db.list_agents_for_user(session.user_id) {
        Ok(agents) => {
            let payload: Vec<serde_json::Value> = agents
                .iter()
                .map(|agent| agent_payload(&state, agent))
                .collect();
            HttpResponse::Ok().json(payload)
        }
        Err(e) => {
            log::error!("Failed to list agents: {}", e);
            internal_error()
        }
    }
}

async fn create_agent(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateAgentRequest>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let name = match validate_name(&body.name) {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    let description = match validate_description(&body.description) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let visibility = match body.visibility.as_deref() {
        Some(raw) => match parse_visibility(raw) {
            Ok(v) => v,
            Err(resp) => return resp,
        },
        None => Visibility::default(),
    };

    match state.db.create_agent(
        session.user_id,
        &name,
        &description,
        visibility,
        body.avatar_url.as_deref(),
        body.configuration.as_ref(),
    ) {
        Ok(agent) => HttpResponse::Created().json(agent_payload(&state, &agent)),
        Err(e) => {
            log::error!("Failed to create agent: {}", e);
            internal_error()
        }
    }
}

async fn get_agent(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    match owned_agent(&state, &req, path.into_inner()) {
        Ok((_, agent)) => HttpResponse::Ok().json(agent_payload(&state, &agent)),
        Err(resp) => resp,
    }
}

async fn update_agent(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateAgentRequest>,
) -> impl Responder {
    let agent_id = path.into_inner();
    let (user_id, _) = match owned_agent(&state, &req, agent_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut update = AgentUpdate {
        avatar_url: body.avatar_url.clone(),
        configuration: body.configuration.clone(),
        is_archived: body.is_archived,
        is_favorite: body.is_favorite,
        ..Default::default()
    };
    if let Some(name) = &body.name {
        update.name = match validate_name(name) {
            Ok(n) => Some(n),
            Err(resp) => return resp,
        };
    }
    if let Some(description) = &body.description {
        update.description = match validate_description(description) {
            Ok(d) => Some(d),
            Err(resp) => return resp,
        };
    }
    if let Some(raw) = &body.visibility {
        update.visibility = match parse_visibility(raw) {
            Ok(v) => Some(v),
            Err(resp) => return resp,
        };
    }

    match state.db.update_agent(agent_id, user_id, &update) {
        Ok(Some(agent)) => HttpResponse::Ok().json(agent_payload(&state, &agent)),
        Ok(None) => not_found("Agent"),
        Err(e) => {
            log::error!("Failed to update agent {}: {}", agent_id, e);
            internal_error()
        }
    }
}

async fn delete_agent(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let agent_id = path.into_inner();
    let (user_id, _) = match owned_agent(&state, &req, agent_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.db.soft_delete_agent(agent_id, user_id) {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found("Agent"),
        Err(e) => {
            log::error!("Failed to delete agent {}: {}", agent_id, e);
            internal_error()
        }
    }
}

async fn list_documents(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let agent_id = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    match state.db.list_documents(agent_id) {
        Ok(documents) => {
            let summary: Vec<serde_json::Value> = documents
                .iter()
                .map(|doc| {
                    serde_json::json!({
                        "document_id": doc.document_id,
                        "document_name": doc.document_name,
                        "document_format": doc.document_format,
                        "size_kb": doc.size_kb(),
                        "formatted_size": doc.formatted_size(),
                        "is_expired": doc.is_expired(chrono::Utc::now()),
                    })
                })
                .collect();
            HttpResponse::Ok().json(summary)
        }
        Err(e) => {
            log::error!("Failed to list documents: {}", e);
            internal_error()
        }
    }
}

async fn create_document(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<DocumentInput>,
) -> impl Responder {
    let agent_id = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    if body.document_url.trim().is_empty() {
        return bad_request("document_url is required");
    }
    match state.db.create_document(agent_id, &body) {
        Ok(document) => HttpResponse::Created().json(document),
        Err(e) => {
            log::error!("Failed to create document: {}", e);
            internal_error()
        }
    }
}

async fn delete_document(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let (agent_id, document_id) = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    match state.db.soft_delete_document(agent_id, document_id) {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found("Document"),
        Err(e) => {
            log::error!("Failed to delete document: {}", e);
            internal_error()
        }
    }
}

async fn list_qa_pairs(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let agent_id = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    match state.db.list_qa_pairs(agent_id) {
        Ok(pairs) => {
            let payload: Vec<serde_json::Value> = pairs
                .iter()
                .map(|pair| {
                    let mut value = serde_json::to_value(pair).unwrap_or_default();
                    if let Some(obj) = value.as_object_mut() {
                        obj.insert("summary".to_string(), pair.summary(60, 60).into());
                        obj.insert("is_faq".to_string(), pair.is_faq().into());
                    }
                    value
                })
                .collect();
            HttpResponse::Ok().json(payload)
        }
        Err(e) => {
            log::error!("Failed to list QA pairs: {}", e);
            internal_error()
        }
    }
}

async fn create_qa_pair(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<QaPairInput>,
) -> impl Responder {
    let agent_id = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    if body.question.trim().is_empty() || body.answer.trim().is_empty() {
        return bad_request("Both question and answer are required");
    }
    match state.db.create_qa_pair(agent_id, &body) {
        Ok(Some(pair)) => HttpResponse::Created().json(pair),
        Ok(None) => bad_request("A QA pair with this name already exists"),
        Err(e) => {
            log::error!("Failed to create QA pair: {}", e);
            internal_error()
        }
    }
}

async fn delete_qa_pair(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let (agent_id, qa_pair_id) = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    match state.db.soft_delete_qa_pair(agent_id, qa_pair_id) {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found("QA pair"),
        Err(e) => {
            log::error!("Failed to delete QA pair: {}", e);
            internal_error()
        }
    }
}

async fn list_websites(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let agent_id = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    match state.db.list_websites(agent_id) {
        Ok(sites) => {
            let now = chrono::Utc::now();
            let payload: Vec<serde_json::Value> = sites
                .iter()
                .map(|site| {
                    let mut value = serde_json::to_value(site).unwrap_or_default();
                    if let Some(obj) = value.as_object_mut() {
                        obj.insert("domain".to_string(), site.domain().into());
                        obj.insert("should_crawl".to_string(), site.should_crawl(now).into());
                    }
                    value
                })
                .collect();
            HttpResponse::Ok().json(payload)
        }
        Err(e) => {
            log::error!("Failed to list websites: {}", e);
            internal_error()
        }
    }
}

async fn create_website(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<WebsiteInput>,
) -> impl Responder {
    let agent_id = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    if body.website_url.trim().is_empty() || body.website_name.trim().is_empty() {
        return bad_request("website_url and website_name are required");
    }
    match state.db.create_website(agent_id, &body) {
        Ok(site) => HttpResponse::Created().json(site),
        Err(e) => {
            log::error!("Failed to create website: {}", e);
            internal_error()
        }
    }
}

async fn delete_website(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let (agent_id, website_id) = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    match state.db.soft_delete_website(agent_id, website_id) {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found("Website"),
        Err(e) => {
            log::error!("Failed to delete website: {}", e);
            internal_error()
        }
    }
}

async fn create_embedding(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<EmbeddingInput>,
) -> impl Responder {
    let agent_id = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    if body.embedding_vector.is_empty() {
        return bad_request("embedding_vector must not be empty");
    }
    match state.db.create_embedding(agent_id, &body) {
        Ok(embedding) => HttpResponse::Created().json(embedding),
        Err(e) => {
            log::error!("Failed to create embedding: {}", e);
            internal_error()
        }
    }
}

async fn search_embeddings(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<EmbeddingSearchRequest>,
) -> impl Responder {
    let agent_id = path.into_inner();
    if let Err(resp) = owned_agent(&state, &req, agent_id) {
        return resp;
    }
    if body.vector.is_empty() {
        return bad_request("vector must not be empty");
    }
    let limit = body.limit.unwrap_or(10).clamp(1, 100);

    let embeddings = match state.db.list_embeddings(agent_id) {
        Ok(e) => e,
        Err(e) => {
            log::error!("Failed to load embeddings: {}", e);
            return internal_error();
        }
    };

    let mut scored: Vec<(f64, &crate::models::AgentEmbedding)> = embeddings
        .iter()
        .map(|embedding| {
            (
                AgentEmbedding::cosine_similarity(&body.vector, &embedding.embedding_vector),
                embedding,
            )
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let results: Vec<serde_json::Value> = scored
        .into_iter()
        .take(limit)
        .map(|(score, embedding)| {
            serde_json::json!({
                "embedding_id": embedding.embedding_id,
                "object_id": embedding.object_id,
                "object_type": embedding.object_type,
                "object_name": embedding.object_name,
                "display_name": embedding.display_name(),
                "similarity": score,
            })
        })
        .collect();
    HttpResponse::Ok().json(serde_json::json!({ "results": results }))
}
