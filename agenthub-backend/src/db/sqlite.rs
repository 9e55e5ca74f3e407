//! SQLite database - schema definitions and connection management
//!
//! This file contains:
//! - Database struct definition
//! - Connection management (new, init)
//! - Schema creation and migrations
//!
//! All table operations are in the tables/ subdirectory.

use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use std::sync::Mutex;

/// Main database wrapper with connection pooling via Mutex
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Create a new database connection and initialize schema
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(database_url)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Initialize all database tables and run migrations
    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();

        // Users table (email is the unique identifier)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                full_name TEXT NOT NULL DEFAULT '',
                profile_image_path TEXT,
                profile_updated_at TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Auth sessions table (bearer tokens with expiry)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS auth_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT UNIQUE NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Agents table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS agents (
                agent_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                visibility TEXT NOT NULL DEFAULT 'private',
                avatar_url TEXT,
                configuration TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                is_archived INTEGER NOT NULL DEFAULT 0,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_agents_user ON agents(user_id, is_deleted)",
            [],
        )?;

        // Agent documents table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_documents (
                document_id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id INTEGER NOT NULL,
                document_name TEXT,
                document_description TEXT,
                document_url TEXT NOT NULL,
                document_size INTEGER,
                document_format TEXT,
                document_language TEXT,
                document_tags TEXT NOT NULL DEFAULT '[]',
                meta_data TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                is_archived INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(agent_id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Agent QA pairs table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_qa_pairs (
                qa_pair_id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id INTEGER NOT NULL,
                qa_pair_name TEXT UNIQUE,
                question_type TEXT,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                question_language TEXT,
                answer_language TEXT,
                meta_data TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(agent_id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Agent websites table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_websites (
                website_id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id INTEGER NOT NULL,
                website_url TEXT NOT NULL,
                website_name TEXT NOT NULL,
                website_type TEXT,
                crawl_status TEXT,
                last_crawled_at TEXT,
                crawl_frequency TEXT,
                content_language TEXT,
                page_limit INTEGER,
                is_verified INTEGER NOT NULL DEFAULT 0,
                source_type TEXT,
                meta_data TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                is_archived INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(agent_id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Agent embeddings table (vectors stored as JSON float lists)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_embeddings (
                embedding_id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id INTEGER NOT NULL,
                embedding_model TEXT,
                vector_dimension INTEGER,
                object_id TEXT,
                object_type TEXT,
                object_name TEXT,
                language TEXT,
                token_count INTEGER,
                tags TEXT NOT NULL DEFAULT '[]',
                embedding_vector TEXT NOT NULL DEFAULT '[]',
                meta_data TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(agent_id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Conversations table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS conversations (
                conversation_id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id INTEGER NOT NULL,
                conversation_name TEXT,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(agent_id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_conversations_agent ON conversations(agent_id)",
            [],
        )?;

        // Conversation messages table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS conversation_messages (
                message_id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                sender_id INTEGER,
                sender_type TEXT NOT NULL DEFAULT 'user',
                message_text TEXT,
                message_type TEXT,
                message_time TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                is_archived INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (conversation_id) REFERENCES conversations(conversation_id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON conversation_messages(conversation_id, message_time)",
            [],
        )?;

        // Message attachments table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS message_attachments (
                attachment_id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id INTEGER NOT NULL,
                attachment_name TEXT,
                attachment_path TEXT,
                attachment_type TEXT,
                attachment_size INTEGER,
                FOREIGN KEY (message_id) REFERENCES conversation_messages(message_id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Conversation tags (unique per conversation)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS conversation_tags (
                tag_id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                tag_name TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(conversation_id, tag_name),
                FOREIGN KEY (conversation_id) REFERENCES conversations(conversation_id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Conversation notes (note text unique per conversation)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS conversation_notes (
                note_id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                note_text TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(conversation_id, note_text),
                FOREIGN KEY (conversation_id) REFERENCES conversations(conversation_id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Conversation feedback (rating 1-5)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS conversation_feedback (
                feedback_id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                feedback_text TEXT,
                rating INTEGER,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (conversation_id) REFERENCES conversations(conversation_id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Integrations table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS integrations (
                integration_id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id INTEGER NOT NULL,
                integration_name TEXT NOT NULL,
                integration_type TEXT NOT NULL,
                integration_url TEXT,
                integration_key TEXT,
                integration_secret TEXT,
                integration_token TEXT,
                description TEXT,
                configuration TEXT,
                meta_data TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                is_archived INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(agent_id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_integrations_agent ON integrations(agent_id, is_active)",
            [],
        )?;

        // Integration categories table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS integration_categories (
                category_id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id INTEGER NOT NULL,
                category_name TEXT NOT NULL,
                description TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(agent_id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Subscription plans table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS subscription_plans (
                plan_id INTEGER PRIMARY KEY AUTOINCREMENT,
                plan_name TEXT NOT NULL,
                plan_description TEXT,
                plan_period TEXT NOT NULL DEFAULT 'monthly',
                plan_tier TEXT,
                plan_price REAL NOT NULL DEFAULT 0,
                plan_currency TEXT NOT NULL DEFAULT 'USD',
                is_trial INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                meta_data TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Plan features (unique per plan)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS plan_features (
                feature_id INTEGER PRIMARY KEY AUTOINCREMENT,
                plan_id INTEGER NOT NULL,
                feature_name TEXT NOT NULL,
                feature_type TEXT,
                feature_description TEXT,
                feature_limit INTEGER,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(plan_id, feature_name),
                FOREIGN KEY (plan_id) REFERENCES subscription_plans(plan_id) ON DELETE CASCADE
            )",
            [],
        )?;

        // User subscriptions table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_subscriptions (
                subscription_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                plan_id INTEGER NOT NULL,
                stripe_subscription_id TEXT,
                usage_start_date TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                meta_data TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (plan_id) REFERENCES subscription_plans(plan_id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON user_subscriptions(user_id, is_active)",
            [],
        )?;

        // Dashboard stats registry (one row per user; numbers are computed)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS dashboard_stats (
                dashboard_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                dashboard_type TEXT NOT NULL DEFAULT 'overview',
                is_active INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        Ok(())
    }
}
