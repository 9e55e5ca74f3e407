use std::env;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub media_root: String,
    pub session_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "./.db/agenthub.db".to_string()),
            media_root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string()),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "168".to_string())
                .parse()
                .expect("SESSION_TTL_HOURS must be a valid number"),
        }
    }
}
