use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod auth;
mod config;
mod controllers;
mod db;
mod middleware;
mod models;
mod stats_cache;

use config::Config;
use db::Database;
use models::PlanPeriod;
use stats_cache::StatsCache;

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub stats: Arc<StatsCache>,
}

/// Seed the billing catalog on first boot so subscriptions have plans to
/// point at.
fn seed_default_plans(db: &Database) -> rusqlite::Result<()> {
    if !db.list_active_plans()?.is_empty() {
        return Ok(());
    }
    log::info!("Seeding default subscription plans");

    let free = db.create_plan(
        "Free",
        Some("One agent, community support"),
        PlanPeriod::Monthly,
        Some("free"),
        0.0,
        "USD",
        false,
    )?;
    db.add_plan_feature(free.plan_id, "agents", Some("count"), None, Some(1))?;
    db.add_plan_feature(free.plan_id, "documents", Some("count"), None, Some(10))?;

    let pro = db.create_plan(
        "Pro",
        Some("Unlimited agents, priority support"),
        PlanPeriod::Monthly,
        Some("pro"),
        29.0,
        "USD",
        false,
    )?;
    db.add_plan_feature(pro.plan_id, "agents", Some("count"), None, Some(25))?;
    db.add_plan_feature(pro.plan_id, "documents", Some("count"), None, Some(500))?;

    Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).expect("Failed to initialize database");
    let db = Arc::new(db);

    if let Err(e) = seed_default_plans(&db) {
        log::error!("Failed to seed default plans: {}", e);
    }

    let stats = Arc::new(StatsCache::new());

    if let Err(e) = std::fs::create_dir_all(&config.media_root) {
        log::warn!("Failed to create media root {}: {}", config.media_root, e);
    }
    let media_root = config.media_root.clone();

    log::info!("Starting AgentHub server on port {}", port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(AppState {
                db: Arc::clone(&db),
                config: config.clone(),
                stats: Arc::clone(&stats),
            }))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::accounts::config)
            .configure(controllers::agents::config)
            .configure(controllers::conversations::config)
            .configure(controllers::integrations::config)
            .configure(controllers::plans::config)
            .configure(controllers::dashboard::config)
            .service(Files::new("/media", media_root.clone()))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
