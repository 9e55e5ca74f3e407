//! Agent database operations

use chrono::{DateTime, Duration, Utc};
use rusqlite::Result as SqliteResult;

use super::super::Database;
use super::json;
use crate::models::{Agent, Visibility};

/// Partial update payload for an agent. None leaves the column untouched.
#[derive(Debug, Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub avatar_url: Option<String>,
    pub configuration: Option<serde_json::Value>,
    pub is_archived: Option<bool>,
    pub is_favorite: Option<bool>,
}

impl Database {
    pub fn create_agent(
        &self,
        user_id: i64,
        name: &str,
        description: &str,
        visibility: Visibility,
        avatar_url: Option<&str>,
        configuration: Option<&serde_json::Value>,
    ) -> SqliteResult<Agent> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        conn.execute(
            "INSERT INTO agents (user_id, name, description, visibility, avatar_url, configuration, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            rusqlite::params![
                user_id,
                name,
                description,
                visibility.as_str(),
                avatar_url,
                configuration.map(|c| c.to_string()),
                &now_str,
            ],
        )?;

        let agent_id = conn.last_insert_rowid();

        Ok(Agent {
            agent_id,
            user_id,
            name: name.to_string(),
            description: Some(description.to_string()),
            visibility,
            avatar_url: avatar_url.map(|s| s.to_string()),
            configuration: configuration.cloned(),
            is_deleted: false,
            is_archived: false,
            is_favorite: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fetch one of the user's non-deleted agents.
    pub fn get_agent_for_user(&self, agent_id: i64, user_id: i64) -> SqliteResult<Option<Agent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT agent_id, user_id, name, description, visibility, avatar_url, configuration,
             is_deleted, is_archived, is_favorite, created_at, updated_at
             FROM agents WHERE agent_id = ?1 AND user_id = ?2 AND is_deleted = 0",
        )?;
        let agent = stmt
            .query_row([agent_id, user_id], |row| Self::row_to_agent(row))
            .ok();
        Ok(agent)
    }

    pub fn list_agents_for_user(&self, user_id: i64) -> SqliteResult<Vec<Agent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT agent_id, user_id, name, description, visibility, avatar_url, configuration,
             is_deleted, is_archived, is_favorite, created_at, updated_at
             FROM agents WHERE user_id = ?1 AND is_deleted = 0 ORDER BY created_at DESC",
        )?;
        let agents = stmt
            .query_map([user_id], |row| Self::row_to_agent(row))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(agents)
    }

    /// Apply a partial update; unset fields keep their stored values.
    pub fn update_agent(
        &self,
        agent_id: i64,
        user_id: i64,
        update: &AgentUpdate,
    ) -> SqliteResult<Option<Agent>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE agents SET
                name = COALESCE(?1, name),
                description = COALESCE(?2, description),
                visibility = COALESCE(?3, visibility),
                avatar_url = COALESCE(?4, avatar_url),
                configuration = COALESCE(?5, configuration),
                is_archived = COALESCE(?6, is_archived),
                is_favorite = COALESCE(?7, is_favorite),
                updated_at = ?8
             WHERE agent_id = ?9 AND user_id = ?10 AND is_deleted = 0",
            rusqlite::params![
                update.name,
                update.description,
                update.visibility.map(|v| v.as_str()),
                update.avatar_url,
                update.configuration.as_ref().map(|c| c.to_string()),
                update.is_archived.map(|b| b as i32),
                update.is_favorite.map(|b| b as i32),
                &now,
                agent_id,
                user_id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        drop(conn);
        self.get_agent_for_user(agent_id, user_id)
    }

    /// Soft delete. Returns false when the agent is absent or already deleted.
    pub fn soft_delete_agent(&self, agent_id: i64, user_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE agents SET is_deleted = 1, updated_at = ?1
             WHERE agent_id = ?2 AND user_id = ?3 AND is_deleted = 0",
            rusqlite::params![&now, agent_id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub fn count_agent_conversations(&self, agent_id: i64) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM conversations WHERE agent_id = ?1",
            [agent_id],
            |row| row.get(0),
        )
    }

    /// An agent is active when one of its conversations saw a message in the
    /// last 15 days.
    pub fn agent_is_active(&self, agent_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let last: Option<String> = conn
            .query_row(
                "SELECT MAX(m.message_time) FROM conversation_messages m
                 JOIN conversations c ON c.conversation_id = m.conversation_id
                 WHERE c.agent_id = ?1",
                [agent_id],
                |row| row.get(0),
            )
            .ok()
            .flatten();

        let Some(last) = last else {
            return Ok(false);
        };
        let last_time = DateTime::parse_from_rfc3339(&last)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now() - Duration::days(3650));
        Ok(Utc::now() - last_time < Duration::days(15))
    }

    fn row_to_agent(row: &rusqlite::Row) -> rusqlite::Result<Agent> {
        let visibility_str: String = row.get(4)?;
        let configuration_str: Option<String> = row.get(6)?;
        let created_at_str: String = row.get(10)?;
        let updated_at_str: String = row.get(11)?;

        Ok(Agent {
            agent_id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            visibility: Visibility::from_str(&visibility_str).unwrap_or_default(),
            avatar_url: row.get(5)?,
            configuration: json::parse_opt(configuration_str),
            is_deleted: row.get::<_, i32>(7)? != 0,
            is_archived: row.get::<_, i32>(8)? != 0,
            is_favorite: row.get::<_, i32>(9)? != 0,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .unwrap()
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .unwrap()
                .with_timezone(&Utc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (Database, tempfile::TempDir, i64) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::new(path.to_str().unwrap()).unwrap();
        let user = db.create_user("owner@example.com", "hash", "Owner").unwrap();
        (db, dir, user.id)
    }

    #[test]
    fn test_agent_crud_round_trip() {
        let (db, _dir, user_id) = test_db();
        let agent = db
            .create_agent(user_id, "Support Bot", "Answers support tickets", Visibility::Private, None, None)
            .unwrap();

        let listed = db.list_agents_for_user(user_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Support Bot");

        let update = AgentUpdate {
            name: Some("Helpdesk Bot".to_string()),
            is_favorite: Some(true),
            ..Default::default()
        };
        let updated = db.update_agent(agent.agent_id, user_id, &update).unwrap().unwrap();
        assert_eq!(updated.name, "Helpdesk Bot");
        assert!(updated.is_favorite);
        // Untouched fields survive a partial update.
        assert_eq!(updated.description.as_deref(), Some("Answers support tickets"));

        assert!(db.soft_delete_agent(agent.agent_id, user_id).unwrap());
        assert!(db.get_agent_for_user(agent.agent_id, user_id).unwrap().is_none());
        assert!(db.list_agents_for_user(user_id).unwrap().is_empty());
        // Double delete reports false.
        assert!(!db.soft_delete_agent(agent.agent_id, user_id).unwrap());
    }

    #[test]
    fn test_agent_ownership_scoping() {
        let (db, _dir, user_id) = test_db();
        let other = db.create_user("other@example.com", "hash", "Other").unwrap();
        let agent = db
            .create_agent(user_id, "Private Bot", "Only for the owner", Visibility::Private, None, None)
            .unwrap();

        assert!(db.get_agent_for_user(agent.agent_id, other.id).unwrap().is_none());
        assert!(!db.soft_delete_agent(agent.agent_id, other.id).unwrap());
        assert!(db.get_agent_for_user(agent.agent_id, user_id).unwrap().is_some());
    }

    #[test]
    fn test_agent_activity_flag() {
        let (db, _dir, user_id) = test_db();
        let agent = db
            .create_agent(user_id, "Idle Bot", "No conversations yet", Visibility::Private, None, None)
            .unwrap();
        assert!(!db.agent_is_active(agent.agent_id).unwrap());

        let conversation = db.create_conversation(agent.agent_id, Some("greeting")).unwrap();
        db.add_message(
            conversation.conversation_id,
            Some(user_id),
            crate::models::SenderType::User,
            Some("hello"),
            None,
        )
        .unwrap();
        assert!(db.agent_is_active(agent.agent_id).unwrap());
        assert_eq!(db.count_agent_conversations(agent.agent_id).unwrap(), 1);
    }
}
