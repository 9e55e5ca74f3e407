//! Integration and integration-category operations

use chrono::Utc;
use rusqlite::Result as SqliteResult;
use serde::Deserialize;

use super::super::Database;
use super::json;
use crate::models::{Integration, IntegrationCategory};

#[derive(Debug, Default, Deserialize)]
pub struct IntegrationInput {
    pub integration_name: String,
    pub integration_type: String,
    pub integration_url: Option<String>,
    pub integration_key: Option<String>,
    pub integration_secret: Option<String>,
    pub integration_token: Option<String>,
    pub description: Option<String>,
    pub configuration: Option<serde_json::Value>,
    pub meta_data: Option<serde_json::Value>,
}

impl Database {
    pub fn create_integration(
        &self,
        agent_id: i64,
        input: &IntegrationInput,
    ) -> SqliteResult<Integration> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        conn.execute(
            "INSERT INTO integrations
             (agent_id, integration_name, integration_type, integration_url, integration_key,
              integration_secret, integration_token, description, configuration, meta_data,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            rusqlite::params![
                agent_id,
                input.integration_name,
                input.integration_type,
                input.integration_url,
                input.integration_key,
                input.integration_secret,
                input.integration_token,
                input.description,
                json::to_text(&input.configuration),
                json::to_text(&input.meta_data),
                &now_str,
            ],
        )?;
        Ok(Integration {
            integration_id: conn.last_insert_rowid(),
            agent_id,
            integration_name: input.integration_name.clone(),
            integration_type: input.integration_type.clone(),
            integration_url: input.integration_url.clone(),
            integration_key: input.integration_key.clone(),
            integration_secret: input.integration_secret.clone(),
            integration_token: input.integration_token.clone(),
            description: input.description.clone(),
            configuration: input.configuration.clone(),
            meta_data: input.meta_data.clone(),
            is_active: true,
            is_deleted: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// The user's integrations across all non-deleted agents, optionally
    /// narrowed to one agent.
    pub fn list_integrations_for_user(
        &self,
        user_id: i64,
        agent_id: Option<i64>,
    ) -> SqliteResult<Vec<Integration>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT i.integration_id, i.agent_id, i.integration_name, i.integration_type,
             i.integration_url, i.integration_key, i.integration_secret, i.integration_token,
             i.description, i.configuration, i.meta_data, i.is_active, i.is_deleted,
             i.is_archived, i.created_at, i.updated_at
             FROM integrations i
             JOIN agents a ON a.agent_id = i.agent_id
             WHERE a.user_id = ?1 AND a.is_deleted = 0 AND i.is_deleted = 0
             AND (?2 IS NULL OR i.agent_id = ?2)
             ORDER BY i.created_at DESC",
        )?;
        let integrations = stmt
            .query_map(rusqlite::params![user_id, agent_id], |row| {
                Self::row_to_integration(row)
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(integrations)
    }

    pub fn soft_delete_integration(&self, agent_id: i64, integration_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE integrations SET is_deleted = 1, updated_at = ?1
             WHERE integration_id = ?2 AND agent_id = ?3 AND is_deleted = 0",
            rusqlite::params![&now, integration_id, agent_id],
        )?;
        Ok(changed > 0)
    }

    pub fn create_integration_category(
        &self,
        agent_id: i64,
        category_name: &str,
        description: Option<&str>,
    ) -> SqliteResult<IntegrationCategory> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        conn.execute(
            "INSERT INTO integration_categories (agent_id, category_name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![agent_id, category_name, description, &now_str],
        )?;
        Ok(IntegrationCategory {
            category_id: conn.last_insert_rowid(),
            agent_id,
            category_name: category_name.to_string(),
            description: description.map(|s| s.to_string()),
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn list_integration_categories_for_user(
        &self,
        user_id: i64,
    ) -> SqliteResult<Vec<IntegrationCategory>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT c.category_id, c.agent_id, c.category_name, c.description, c.is_active,
             c.is_deleted, c.created_at, c.updated_at
             FROM integration_categories c
             JOIN agents a ON a.agent_id = c.agent_id
             WHERE a.user_id = ?1 AND a.is_deleted = 0 AND c.is_deleted = 0
             ORDER BY c.category_name",
        )?;
        let categories = stmt
            .query_map([user_id], |row| {
                Ok(IntegrationCategory {
                    category_id: row.get(0)?,
                    agent_id: row.get(1)?,
                    category_name: row.get(2)?,
                    description: row.get(3)?,
                    is_active: row.get::<_, i32>(4)? != 0,
                    is_deleted: row.get::<_, i32>(5)? != 0,
                    created_at: Self::parse_time(row.get::<_, String>(6)?),
                    updated_at: Self::parse_time(row.get::<_, String>(7)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(categories)
    }

    fn row_to_integration(row: &rusqlite::Row) -> rusqlite::Result<Integration> {
        let configuration_str: Option<String> = row.get(9)?;
        let meta_str: Option<String> = row.get(10)?;
        Ok(Integration {
            integration_id: row.get(0)?,
            agent_id: row.get(1)?,
            integration_name: row.get(2)?,
            integration_type: row.get(3)?,
            integration_url: row.get(4)?,
            integration_key: row.get(5)?,
            integration_secret: row.get(6)?,
            integration_token: row.get(7)?,
            description: row.get(8)?,
            configuration: json::parse_opt(configuration_str),
            meta_data: json::parse_opt(meta_str),
            is_active: row.get::<_, i32>(11)? != 0,
            is_deleted: row.get::<_, i32>(12)? != 0,
            is_archived: row.get::<_, i32>(13)? != 0,
            created_at: Self::parse_time(row.get::<_, String>(14)?),
            updated_at: Self::parse_time(row.get::<_, String>(15)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Visibility;

    fn seeded() -> (Database, tempfile::TempDir, i64, i64) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap();
        let user = db.create_user("owner@example.com", "hash", "Owner").unwrap();
        let agent = db
            .create_agent(user.id, "CRM Bot", "Talks to the CRM", Visibility::Private, None, None)
            .unwrap();
        (db, dir, user.id, agent.agent_id)
    }

    #[test]
    fn test_integration_listing_and_agent_filter() {
        let (db, _dir, user_id, agent_id) = seeded();
        let other_agent = db
            .create_agent(user_id, "Other Bot", "Second agent here", Visibility::Private, None, None)
            .unwrap();

        let input = IntegrationInput {
            integration_name: "CRM Hook".to_string(),
            integration_type: "webhook".to_string(),
            integration_token: Some("secret-token".to_string()),
            ..Default::default()
        };
        db.create_integration(agent_id, &input).unwrap();
        db.create_integration(
            other_agent.agent_id,
            &IntegrationInput {
                integration_name: "Mailer".to_string(),
                integration_type: "api".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(db.list_integrations_for_user(user_id, None).unwrap().len(), 2);
        let filtered = db.list_integrations_for_user(user_id, Some(agent_id)).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].integration_name, "CRM Hook");
    }

    #[test]
    fn test_integration_soft_delete() {
        let (db, _dir, user_id, agent_id) = seeded();
        let integration = db
            .create_integration(
                agent_id,
                &IntegrationInput {
                    integration_name: "CRM Hook".to_string(),
                    integration_type: "webhook".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(db.soft_delete_integration(agent_id, integration.integration_id).unwrap());
        assert!(db.list_integrations_for_user(user_id, None).unwrap().is_empty());
    }

    #[test]
    fn test_category_listing() {
        let (db, _dir, user_id, agent_id) = seeded();
        db.create_integration_category(agent_id, "Messaging", Some("Chat channels")).unwrap();
        db.create_integration_category(agent_id, "Analytics", None).unwrap();
        let categories = db.list_integration_categories_for_user(user_id).unwrap();
        assert_eq!(categories.len(), 2);
        // Sorted by name.
        assert_eq!(categories[0].category_name, "Analytics");
    }
}
