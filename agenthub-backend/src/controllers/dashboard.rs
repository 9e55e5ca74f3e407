//! Dashboard endpoints: aggregate stats with trends, recent chats, engagement

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::{Duration, Utc};

use super::internal_error;
use crate::middleware::session_auth::authenticate;
use crate::AppState;

const COUNTS_TTL_SECONDS: i64 = 600;
const AVERAGES_TTL_SECONDS: i64 = 300;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/dashboard")
            .route("/stats", web::get().to(get_stats))
            .route("/recent-chats", web::get().to(get_recent_chats))
            .route("/engagement", web::get().to(get_engagement)),
    );
}

/// Percentage change between two period values.
fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    if current == 0.0 {
        return if previous > 0.0 { -100.0 } else { 0.0 };
    }
    (current - previous) / previous * 100.0
}

fn trend(current: f64, previous: f64) -> serde_json::Value {
    let value = percentage_change(current, previous);
    serde_json::json!({
        "value": (value * 10.0).round() / 10.0,
        "isPositive": value >= 0.0,
    })
}

async fn get_stats(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let user_id = session.user_id;

    if let Err(e) = state.db.ensure_dashboard(user_id) {
        log::error!("Failed to ensure dashboard row: {}", e);
        return internal_error();
    }

    let counts_key = format!("stats:{}:counts", user_id);
    let averages_key = format!("stats:{}:averages", user_id);

    let counts = match state.stats.get(&counts_key) {
        Some(cached) => cached,
        None => {
            let now = Utc::now();
            let month_start = now - Duration::days(30);
            let prev_start = now - Duration::days(60);

            let current_conversations =
                match state.db.count_conversations_between(user_id, month_start, now) {
                    Ok(n) => n,
                    Err(e) => {
                        log::error!("Failed to count conversations: {}", e);
                        return internal_error();
                    }
                };
            let previous_conversations = state
                .db
                .count_conversations_between(user_id, prev_start, month_start)
                .unwrap_or(0);
            let current_engaged = state
                .db
                .count_engaged_conversations_between(user_id, month_start, now)
                .unwrap_or(0);
            let previous_engaged = state
                .db
                .count_engaged_conversations_between(user_id, prev_start, month_start)
                .unwrap_or(0);
            let live = state.db.count_live_conversations(user_id).unwrap_or(0);

            let value = serde_json::json!({
                "totalConversations": current_conversations,
                "previousConversations": previous_conversations,
                "activeUsers": live,
                "currentEngaged": current_engaged,
                "previousEngaged": previous_engaged,
            });
            state.stats.put(&counts_key, value.clone(), COUNTS_TTL_SECONDS);
            value
        }
    };

    let averages = match state.stats.get(&averages_key) {
        Some(cached) => cached,
        None => {
            let now = Utc::now();
            let month_start = now - Duration::days(30);
            let prev_start = now - Duration::days(60);

            let current_response = state
                .db
                .avg_response_seconds_between(user_id, month_start, now)
                .unwrap_or(None)
                .unwrap_or(0.0);
            let previous_response = state
                .db
                .avg_response_seconds_between(user_id, prev_start, month_start)
                .unwrap_or(None)
                .unwrap_or(0.0);
            let current_satisfaction = state
                .db
                .satisfaction_between(user_id, month_start, now)
                .unwrap_or(None)
                .unwrap_or(0.0);
            let previous_satisfaction = state
                .db
                .satisfaction_between(user_id, prev_start, month_start)
                .unwrap_or(None)
                .unwrap_or(0.0);

            let value = serde_json::json!({
                "avgResponseTime": (current_response * 100.0).round() / 100.0,
                "previousResponseTime": (previous_response * 100.0).round() / 100.0,
                "userSatisfaction": (current_satisfaction * 100.0).round() / 100.0,
                "previousSatisfaction": (previous_satisfaction * 100.0).round() / 100.0,
            });
            state.stats.put(&averages_key, value.clone(), AVERAGES_TTL_SECONDS);
            value
        }
    };

    let as_f64 = |v: &serde_json::Value, key: &str| v[key].as_f64().unwrap_or(0.0);

    HttpResponse::Ok().json(serde_json::json!({
        "totalConversations": counts["totalConversations"],
        "activeUsers": counts["activeUsers"],
        "avgResponseTime": averages["avgResponseTime"],
        "userSatisfaction": averages["userSatisfaction"],
        "trends": {
            "conversations": trend(
                as_f64(&counts, "totalConversations"),
                as_f64(&counts, "previousConversations"),
            ),
            "users": trend(
                as_f64(&counts, "currentEngaged"),
                as_f64(&counts, "previousEngaged"),
            ),
            "responseTime": trend(
                as_f64(&averages, "avgResponseTime"),
                as_f64(&averages, "previousResponseTime"),
            ),
            "satisfaction": trend(
                as_f64(&averages, "userSatisfaction"),
                as_f64(&averages, "previousSatisfaction"),
            ),
        },
    }))
}

async fn get_recent_chats(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.db.list_conversation_overviews(session.user_id, None) {
        Ok(overviews) => {
            let recent: Vec<_> = overviews.into_iter().take(5).collect();
            HttpResponse::Ok().json(recent)
        }
        Err(e) => {
            log::error!("Failed to load recent chats: {}", e);
            internal_error()
        }
    }
}

async fn get_engagement(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let session = match authenticate(&state.db, &req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let cache_key = format!("engagement:{}", session.user_id);
    if let Some(cached) = state.stats.get(&cache_key) {
        return HttpResponse::Ok().json(cached);
    }

    match state.db.engagement_history(session.user_id, 7) {
        Ok(history) => {
            let payload: Vec<serde_json::Value> = history
                .iter()
                .map(|day| {
                    serde_json::json!({
                        "day": day.date.format("%A").to_string(),
                        "date": day.date.format("%Y-%m-%d").to_string(),
                        "conversations": day.conversation_count,
                        "agentResponses": day.agent_response_count,
                    })
                })
                .collect();
            let value = serde_json::Value::Array(payload);
            state.stats.put(&cache_key, value.clone(), COUNTS_TTL_SECONDS);
            HttpResponse::Ok().json(value)
        }
        Err(e) => {
            log::error!("Failed to load engagement history: {}", e);
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_change_zero_previous() {
        assert_eq!(percentage_change(5.0, 0.0), 100.0);
        assert_eq!(percentage_change(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_percentage_change_zero_current() {
        assert_eq!(percentage_change(0.0, 4.0), -100.0);
    }

    #[test]
    fn test_percentage_change_general_case() {
        assert!((percentage_change(150.0, 100.0) - 50.0).abs() < 1e-9);
        assert!((percentage_change(75.0, 100.0) + 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_direction() {
        assert_eq!(trend(2.0, 1.0)["isPositive"], serde_json::json!(true));
        assert_eq!(trend(1.0, 2.0)["isPositive"], serde_json::json!(false));
        assert_eq!(trend(0.0, 0.0)["isPositive"], serde_json::json!(true));
    }
}
