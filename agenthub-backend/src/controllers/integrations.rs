//! Integration endpoints

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use super::{bad_request, internal_error, not_found};
use crate::db::tables::IntegrationInput;
use crate::middleware::session_auth::authenticate;
use crate::AppState;

#[derive(Deserialize)]
pub struct IntegrationListQuery {
    agent_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateIntegrationRequest {
    agent_id: i64,
    #[serde(flatten)]
    integration: IntegrationInput,
}

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    agent_id: i64,
    category_name: String,
    description: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/integrations")
            .route("", web::get().to(list_integrations))
            .route("", web::post().to(create_integration))
            .route("/categories", web::get().to(list_categories))
            .route("/categories", web::post().to(create_category))
            .route("/{agent_id}/{integration_id}", web::delete().to(delete_integration)),
    );
}

/// Verify the caller owns the agent before touching its integrations.
fn check_agent(state: &AppState, user_id: i64, agent_id: i64) -> Result<(), HttpResponse> {
    match state.db.get_agent_for_user(agent_id, user_id) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(not_found("Agent")),
        Err(e) => {
            log::error!("Failed to check agent: {}", e);
            Err(internal_error())
        }
    }
}

async fn list_integrations(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<IntegrationListQuery>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Some(agent_id) = query.agent_id {
        match state.db.get_agent_for_user(agent_id, session.user_id) {
            Ok(Some(_)) => {}
            Ok(None) => return bad_request("Unknown agent_id"),
            Err(e) => {
                log::error!("Failed to check agent: {}", e);
                return internal_error();
            }
        }
    }

    match state
        .db
        .list_integrations_for_user(session.user_id, query.agent_id)
    {
        Ok(integrations) => {
            // Credentials never leave the server.
            let payload: Vec<serde_json::Value> =
                integrations.iter().map(|i| i.public_details()).collect();
            HttpResponse::Ok().json(payload)
        }
        Err(e) => {
            log::error!("Failed to list integrations: {}", e);
            internal_error()
        }
    }
}

async fn create_integration(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateIntegrationRequest>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(resp) = check_agent(&state, session.user_id, body.agent_id) {
        return resp;
    }
    if body.integration.integration_name.trim().is_empty()
        || body.integration.integration_type.trim().is_empty()
    {
        return bad_request("integration_name and integration_type are required");
    }
    match state.db.create_integration(body.agent_id, &body.integration) {
        Ok(integration) => HttpResponse::Created().json(integration.public_details()),
        Err(e) => {
            log::error!("Failed to create integration: {}", e);
            internal_error()
        }
    }
}

async fn delete_integration(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let (agent_id, integration_id) = path.into_inner();
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(resp) = check_agent(&state, session.user_id, agent_id) {
        return resp;
    }
    match state.db.soft_delete_integration(agent_id, integration_id) {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found("Integration"),
        Err(e) => {
            log::error!("Failed to delete integration: {}", e);
            internal_error()
        }
    }
}

async fn create_category(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateCategoryRequest>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(resp) = check_agent(&state, session.user_id, body.agent_id) {
        return resp;
    }
    let category_name = body.category_name.trim();
    if category_name.is_empty() {
        return bad_request("category_name is required");
    }
    match state.db.create_integration_category(
        body.agent_id,
        category_name,
        body.description.as_deref(),
    ) {
        Ok(category) => HttpResponse::Created().json(category),
        Err(e) => {
            log::error!("Failed to create integration category: {}", e);
            internal_error()
        }
    }
}

async fn list_categories(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.db.list_integration_categories_for_user(session.user_id) {
        Ok(categories) => HttpResponse::Ok().json(categories),
        Err(e) => {
            log::error!("Failed to list integration categories: {}", e);
            internal_error()
        }
    }
}
