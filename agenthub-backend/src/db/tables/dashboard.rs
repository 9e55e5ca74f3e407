//! Dashboard aggregate queries
//!
//! The dashboard_stats table only registers that a user has a dashboard; the
//! numbers themselves come from direct queries over conversations, messages
//! and feedback.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Result as SqliteResult;

use super::super::Database;

/// One day of engagement history.
#[derive(Debug, Clone)]
pub struct EngagementDay {
    pub date: DateTime<Utc>,
    pub conversation_count: i64,
    pub agent_response_count: i64,
}

impl Database {
    /// Get or create the user's dashboard registry row.
    pub fn ensure_dashboard(&self, user_id: i64) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR IGNORE INTO dashboard_stats (user_id, created_at, updated_at)
             VALUES (?1, ?2, ?2)",
            rusqlite::params![user_id, &now],
        )?;
        conn.query_row(
            "SELECT dashboard_id FROM dashboard_stats WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )
    }

    /// Conversations created in [start, end) across the user's agents.
    pub fn count_conversations_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM conversations c
             JOIN agents a ON a.agent_id = c.agent_id
             WHERE a.user_id = ?1 AND a.is_deleted = 0
             AND datetime(c.created_at) >= datetime(?2)
             AND datetime(c.created_at) < datetime(?3)",
            rusqlite::params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            |row| row.get(0),
        )
    }

    /// Conversations with at least one non-deleted message in [start, end).
    pub fn count_engaged_conversations_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(DISTINCT m.conversation_id) FROM conversation_messages m
             JOIN conversations c ON c.conversation_id = m.conversation_id
             JOIN agents a ON a.agent_id = c.agent_id
             WHERE a.user_id = ?1 AND a.is_deleted = 0 AND m.is_deleted = 0
             AND datetime(m.message_time) >= datetime(?2)
             AND datetime(m.message_time) < datetime(?3)",
            rusqlite::params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            |row| row.get(0),
        )
    }

    /// Conversations whose latest message is at most 60 seconds old.
    pub fn count_live_conversations(&self, user_id: i64) -> SqliteResult<i64> {
        let cutoff = Utc::now() - Duration::seconds(60);
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(DISTINCT m.conversation_id) FROM conversation_messages m
             JOIN conversations c ON c.conversation_id = m.conversation_id
             JOIN agents a ON a.agent_id = c.agent_id
             WHERE a.user_id = ?1 AND a.is_deleted = 0 AND m.is_deleted = 0
             AND datetime(m.message_time) >= datetime(?2)",
            rusqlite::params![user_id, cutoff.to_rfc3339()],
            |row| row.get(0),
        )
    }

    /// Mean seconds from conversation creation to its last user message, over
    /// conversations created in [start, end) that have one. None when no
    /// conversation qualifies.
    pub fn avg_response_seconds_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SqliteResult<Option<f64>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT AVG(delta) FROM (
                SELECT (julianday(MAX(m.message_time)) - julianday(c.created_at)) * 86400.0 AS delta
                FROM conversations c
                JOIN agents a ON a.agent_id = c.agent_id
                JOIN conversation_messages m ON m.conversation_id = c.conversation_id
                WHERE a.user_id = ?1 AND a.is_deleted = 0
                AND m.sender_type = 'user' AND m.is_deleted = 0
                AND datetime(c.created_at) >= datetime(?2)
                AND datetime(c.created_at) < datetime(?3)
                GROUP BY c.conversation_id
             )",
            rusqlite::params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            |row| row.get(0),
        )
    }

    /// Mean of per-conversation mean feedback ratings given in [start, end).
    pub fn satisfaction_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SqliteResult<Option<f64>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT AVG(conversation_rating) FROM (
                SELECT AVG(f.rating) AS conversation_rating
                FROM conversation_feedback f
                JOIN conversations c ON c.conversation_id = f.conversation_id
                JOIN agents a ON a.agent_id = c.agent_id
                WHERE a.user_id = ?1 AND a.is_deleted = 0
                AND f.is_deleted = 0 AND f.rating IS NOT NULL
                AND datetime(f.created_at) >= datetime(?2)
                AND datetime(f.created_at) < datetime(?3)
                GROUP BY f.conversation_id
             )",
            rusqlite::params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            |row| row.get(0),
        )
    }

    /// Per-day conversation and agent-response counts for the trailing
    /// `days` days, oldest first.
    pub fn engagement_history(&self, user_id: i64, days: i64) -> SqliteResult<Vec<EngagementDay>> {
        let conn = self.conn.lock().unwrap();
        let mut conv_stmt = conn.prepare(
            "SELECT COUNT(*) FROM conversations c
             JOIN agents a ON a.agent_id = c.agent_id
             WHERE a.user_id = ?1 AND a.is_deleted = 0
             AND datetime(c.created_at) >= datetime(?2)
             AND datetime(c.created_at) < datetime(?3)",
        )?;
        let mut resp_stmt = conn.prepare(
            "SELECT COUNT(*) FROM conversation_messages m
             JOIN conversations c ON c.conversation_id = m.conversation_id
             JOIN agents a ON a.agent_id = c.agent_id
             WHERE a.user_id = ?1 AND a.is_deleted = 0
             AND m.sender_type = 'agent' AND m.is_deleted = 0
             AND datetime(m.message_time) >= datetime(?2)
             AND datetime(m.message_time) < datetime(?3)",
        )?;

        let today_start = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        let mut history = Vec::with_capacity(days as usize);
        for offset in (0..days).rev() {
            let day_start = today_start - Duration::days(offset);
            let day_end = day_start + Duration::days(1);
            let params =
                rusqlite::params![user_id, day_start.to_rfc3339(), day_end.to_rfc3339()];
            let conversation_count: i64 = conv_stmt.query_row(params, |row| row.get(0))?;
            let agent_response_count: i64 = resp_stmt.query_row(params, |row| row.get(0))?;
            history.push(EngagementDay {
                date: day_start,
                conversation_count,
                agent_response_count,
            });
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SenderType, Visibility};

    fn seeded() -> (Database, tempfile::TempDir, i64, i64) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap();
        let user = db.create_user("owner@example.com", "hash", "Owner").unwrap();
        let agent = db
            .create_agent(user.id, "Stats Bot", "Counts everything", Visibility::Private, None, None)
            .unwrap();
        (db, dir, user.id, agent.agent_id)
    }

    #[test]
    fn test_dashboard_row_is_singleton() {
        let (db, _dir, user_id, _agent_id) = seeded();
        let first = db.ensure_dashboard(user_id).unwrap();
        let second = db.ensure_dashboard(user_id).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_month_window_counts() {
        let (db, _dir, user_id, agent_id) = seeded();
        let conversation = db.create_conversation(agent_id, None).unwrap();
        db.add_message(conversation.conversation_id, Some(user_id), SenderType::User, Some("hi"), None)
            .unwrap();

        let now = Utc::now();
        let month_ago = now - Duration::days(30);
        assert_eq!(
            db.count_conversations_between(user_id, month_ago, now + Duration::seconds(1))
                .unwrap(),
            1
        );
        assert_eq!(
            db.count_conversations_between(user_id, month_ago - Duration::days(30), month_ago)
                .unwrap(),
            0
        );
        assert_eq!(
            db.count_engaged_conversations_between(user_id, month_ago, now + Duration::seconds(1))
                .unwrap(),
            1
        );
        // Message just arrived, so the conversation is live.
        assert_eq!(db.count_live_conversations(user_id).unwrap(), 1);
    }

    #[test]
    fn test_satisfaction_averages_per_conversation_first() {
        let (db, _dir, user_id, agent_id) = seeded();
        let first = db.create_conversation(agent_id, None).unwrap();
        let second = db.create_conversation(agent_id, None).unwrap();
        db.add_feedback(first.conversation_id, None, Some(5)).unwrap();
        db.add_feedback(first.conversation_id, None, Some(3)).unwrap();
        db.add_feedback(second.conversation_id, None, Some(2)).unwrap();

        let now = Utc::now();
        let score = db
            .satisfaction_between(user_id, now - Duration::days(30), now + Duration::seconds(1))
            .unwrap()
            .unwrap();
        // (avg(5,3) + 2) / 2 = 3.0
        assert!((score - 3.0).abs() < 1e-9);

        let empty = db
            .satisfaction_between(user_id, now - Duration::days(60), now - Duration::days(30))
            .unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn test_engagement_history_shape() {
        let (db, _dir, user_id, agent_id) = seeded();
        let conversation = db.create_conversation(agent_id, None).unwrap();
        db.add_message(conversation.conversation_id, None, SenderType::Agent, Some("hello"), None)
            .unwrap();

        let history = db.engagement_history(user_id, 7).unwrap();
        assert_eq!(history.len(), 7);
        // Today is the last entry and carries both counts.
        let today = history.last().unwrap();
        assert_eq!(today.conversation_count, 1);
        assert_eq!(today.agent_response_count, 1);
        assert_eq!(history[0].conversation_count, 0);
    }
}
