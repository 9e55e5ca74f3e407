//! Plan and subscription endpoints

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;

use super::{internal_error, not_found};
use crate::middleware::session_auth::authenticate;
use crate::models::{SubscriptionPlan, UserSubscription};
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateSubscriptionRequest {
    plan_id: i64,
    stripe_subscription_id: Option<String>,
    meta_data: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct UpdateSubscriptionRequest {
    is_active: Option<bool>,
    meta_data: Option<serde_json::Value>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/plans")
            .route("", web::get().to(list_plans))
            .route("/subscriptions", web::get().to(list_subscriptions))
            .route("/subscriptions", web::post().to(create_subscription))
            .route("/subscriptions/{id}", web::put().to(update_subscription))
            .route("/subscriptions/{id}", web::delete().to(delete_subscription))
            .route("/subscriptions/{id}/status", web::get().to(subscription_status)),
    );
}

fn plan_payload(state: &AppState, plan: &SubscriptionPlan) -> serde_json::Value {
    let features = state.db.list_plan_features(plan.plan_id).unwrap_or_default();
    let mut payload = serde_json::to_value(plan).unwrap_or_default();
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("price_display".to_string(), plan.price_display().into());
        obj.insert(
            "features".to_string(),
            serde_json::to_value(&features).unwrap_or_default(),
        );
    }
    payload
}

fn subscription_payload(
    state: &AppState,
    subscription: &UserSubscription,
) -> serde_json::Value {
    let mut payload = serde_json::to_value(subscription).unwrap_or_default();
    if let Ok(Some(plan)) = state.db.get_plan(subscription.plan_id) {
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("plan_name".to_string(), plan.plan_name.clone().into());
            obj.insert(
                "usage_end_date".to_string(),
                subscription.usage_end_date(&plan).to_rfc3339().into(),
            );
            obj.insert(
                "is_expired".to_string(),
                subscription.is_expired(&plan, Utc::now()).into(),
            );
        }
    }
    payload
}

async fn list_plans(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Err(resp) = authenticate(&state.db, &req) {
        return resp;
    }
    match state.db.list_active_plans() {
        Ok(plans) => {
            let payload: Vec<serde_json::Value> =
                plans.iter().map(|plan| plan_payload(&state, plan)).collect();
            HttpResponse::Ok().json(payload)
        }
        Err(e) => {
            log::error!("Failed to list plans: {}", e);
            internal_error()
        }
    }
}

async fn list_subscriptions(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.db.list_subscriptions_for_user(session.user_id) {
        Ok(subscriptions) => {
            let payload: Vec<serde_json::Value> = subscriptions
                .iter()
                .map(|s| subscription_payload(&state, s))
                .collect();
            HttpResponse::Ok().json(payload)
        }
        Err(e) => {
            log::error!("Failed to list subscriptions: {}", e);
            internal_error()
        }
    }
}

async fn create_subscription(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateSubscriptionRequest>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match state.db.get_plan(body.plan_id) {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("Plan"),
        Err(e) => {
            log::error!("Failed to load plan: {}", e);
            return internal_error();
        }
    }

    match state.db.create_subscription(
        session.user_id,
        body.plan_id,
        body.stripe_subscription_id.as_deref(),
        body.meta_data.as_ref(),
    ) {
        Ok(subscription) => {
            HttpResponse::Created().json(subscription_payload(&state, &subscription))
        }
        Err(e) => {
            log::error!("Failed to create subscription: {}", e);
            internal_error()
        }
    }
}

async fn update_subscription(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateSubscriptionRequest>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.db.update_subscription(
        path.into_inner(),
        session.user_id,
        body.is_active,
        body.meta_data.as_ref(),
    ) {
        Ok(Some(subscription)) => {
            HttpResponse::Ok().json(subscription_payload(&state, &subscription))
        }
        Ok(None) => not_found("Subscription"),
        Err(e) => {
            log::error!("Failed to update subscription: {}", e);
            internal_error()
        }
    }
}

async fn delete_subscription(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.db.soft_delete_subscription(path.into_inner(), session.user_id) {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found("Subscription"),
        Err(e) => {
            log::error!("Failed to delete subscription: {}", e);
            internal_error()
        }
    }
}

async fn subscription_status(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let subscription = match state
        .db
        .get_subscription_for_user(path.into_inner(), session.user_id)
    {
        Ok(Some(s)) => s,
        Ok(None) => return not_found("Subscription"),
        Err(e) => {
            log::error!("Failed to load subscription: {}", e);
            return internal_error();
        }
    };
    let plan = match state.db.get_plan(subscription.plan_id) {
        Ok(Some(p)) => p,
        Ok(None) => return not_found("Plan"),
        Err(e) => {
            log::error!("Failed to load plan: {}", e);
            return internal_error();
        }
    };

    let now = Utc::now();
    HttpResponse::Ok().json(serde_json::json!({
        "subscription_id": subscription.subscription_id,
        "plan_id": plan.plan_id,
        "plan_name": plan.plan_name,
        "plan_period": plan.plan_period,
        "usage_start_date": subscription.usage_start_date.to_rfc3339(),
        "usage_end_date": subscription.usage_end_date(&plan).to_rfc3339(),
        "is_active": subscription.is_active,
        "is_valid": subscription.is_valid(&plan, now),
        "is_expired": subscription.is_expired(&plan, now),
    }))
}
