//! Conversation, message, tag, note and feedback operations

use chrono::{DateTime, Utc};
use rusqlite::Result as SqliteResult;

use super::super::Database;
use crate::models::{
    Conversation, ConversationFeedback, ConversationFilter, ConversationMessage,
    ConversationNote, ConversationOverview, ConversationTag, MessageAttachment, SenderType,
};

/// Overview row plus the message counts the list filters need.
struct OverviewRow {
    overview: ConversationOverview,
    message_count: i64,
    archived_count: i64,
    deleted_count: i64,
}

impl OverviewRow {
    /// Every message carries the flag (and there is at least one message).
    fn is_archived(&self) -> bool {
        self.message_count > 0 && self.archived_count == self.message_count
    }

    fn is_deleted(&self) -> bool {
        self.message_count > 0 && self.deleted_count == self.message_count
    }
}

impl Database {
    pub fn create_conversation(
        &self,
        agent_id: i64,
        conversation_name: Option<&str>,
    ) -> SqliteResult<Conversation> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        conn.execute(
            "INSERT INTO conversations (agent_id, conversation_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            rusqlite::params![agent_id, conversation_name, &now_str],
        )?;
        Ok(Conversation {
            conversation_id: conn.last_insert_rowid(),
            agent_id,
            conversation_name: conversation_name.map(|s| s.to_string()),
            is_favorite: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the conversation belongs to one of the user's non-deleted agents.
    pub fn conversation_owned_by(&self, conversation_id: i64, user_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM conversations c
             JOIN agents a ON a.agent_id = c.agent_id
             WHERE c.conversation_id = ?1 AND a.user_id = ?2 AND a.is_deleted = 0",
            [conversation_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All of the user's conversations matching the filter, newest activity
    /// first. Pagination happens at the controller.
    pub fn list_conversation_overviews(
        &self,
        user_id: i64,
        filter: Option<ConversationFilter>,
    ) -> SqliteResult<Vec<ConversationOverview>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT c.conversation_id, c.agent_id, a.name, c.conversation_name, c.is_favorite,
                (SELECT m.message_text FROM conversation_messages m
                 WHERE m.conversation_id = c.conversation_id AND m.is_deleted = 0
                 ORDER BY m.message_time DESC, m.message_id DESC LIMIT 1),
                (SELECT m.message_time FROM conversation_messages m
                 WHERE m.conversation_id = c.conversation_id AND m.is_deleted = 0
                 ORDER BY m.message_time DESC, m.message_id DESC LIMIT 1),
                (SELECT m.is_read FROM conversation_messages m
                 WHERE m.conversation_id = c.conversation_id AND m.is_deleted = 0
                 ORDER BY m.message_time DESC, m.message_id DESC LIMIT 1),
                (SELECT COUNT(*) FROM conversation_messages m
                 WHERE m.conversation_id = c.conversation_id AND m.is_deleted = 0
                 AND m.is_read = 0 AND m.sender_type = 'user'),
                c.created_at,
                (SELECT COUNT(*) FROM conversation_messages m
                 WHERE m.conversation_id = c.conversation_id),
                (SELECT COUNT(*) FROM conversation_messages m
                 WHERE m.conversation_id = c.conversation_id AND m.is_archived = 1),
                (SELECT COUNT(*) FROM conversation_messages m
                 WHERE m.conversation_id = c.conversation_id AND m.is_deleted = 1)
             FROM conversations c
             JOIN agents a ON a.agent_id = c.agent_id
             WHERE a.user_id = ?1 AND a.is_deleted = 0
             ORDER BY COALESCE((SELECT MAX(m.message_time) FROM conversation_messages m
                 WHERE m.conversation_id = c.conversation_id), c.created_at) DESC",
        )?;

        let rows: Vec<OverviewRow> = stmt
            .query_map([user_id], |row| {
                let last_time_str: Option<String> = row.get(6)?;
                let created_at_str: String = row.get(9)?;
                Ok(OverviewRow {
                    overview: ConversationOverview {
                        conversation_id: row.get(0)?,
                        agent_id: row.get(1)?,
                        agent_name: row.get(2)?,
                        conversation_name: row.get(3)?,
                        is_favorite: row.get::<_, i32>(4)? != 0,
                        last_message: row.get(5)?,
                        last_message_time: last_time_str.and_then(|s| {
                            DateTime::parse_from_rfc3339(&s)
                                .ok()
                                .map(|t| t.with_timezone(&Utc))
                        }),
                        last_message_is_read: row.get::<_, Option<i32>>(7)?.unwrap_or(0) != 0,
                        unread_count: row.get(8)?,
                        created_at: DateTime::parse_from_rfc3339(&created_at_str)
                            .unwrap()
                            .with_timezone(&Utc),
                    },
                    message_count: row.get(10)?,
                    archived_count: row.get(11)?,
                    deleted_count: row.get(12)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        let now = Utc::now();
        let out = rows
            .into_iter()
            .filter(|row| match filter {
                None => !row.is_archived() && !row.is_deleted(),
                Some(ConversationFilter::Active) => row.overview.is_active(now),
                Some(ConversationFilter::Completed) => {
                    row.overview.last_message_time.is_some() && !row.overview.is_active(now)
                }
                Some(ConversationFilter::Archived) => row.is_archived(),
                Some(ConversationFilter::Deleted) => row.is_deleted(),
                Some(ConversationFilter::Unread) => row.overview.unread_count > 0,
                Some(ConversationFilter::Favorite) => row.overview.is_favorite,
            })
            .map(|row| row.overview)
            .collect();
        Ok(out)
    }

    pub fn add_message(
        &self,
        conversation_id: i64,
        sender_id: Option<i64>,
        sender_type: SenderType,
        message_text: Option<&str>,
        message_type: Option<&str>,
    ) -> SqliteResult<ConversationMessage> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO conversation_messages
             (conversation_id, sender_id, sender_type, message_text, message_type, message_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                conversation_id,
                sender_id,
                sender_type.as_str(),
                message_text,
                message_type,
                now.to_rfc3339(),
            ],
        )?;
        Ok(ConversationMessage {
            message_id: conn.last_insert_rowid(),
            conversation_id,
            sender_id,
            sender_type,
            message_text: message_text.map(|s| s.to_string()),
            message_type: message_type.map(|s| s.to_string()),
            message_time: now,
            is_read: false,
            is_deleted: false,
            is_archived: false,
        })
    }

    /// Non-deleted messages newest-first, each with its attachments.
    pub fn list_messages(
        &self,
        conversation_id: i64,
    ) -> SqliteResult<Vec<(ConversationMessage, Vec<MessageAttachment>)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT message_id, conversation_id, sender_id, sender_type, message_text,
             message_type, message_time, is_read, is_deleted, is_archived
             FROM conversation_messages
             WHERE conversation_id = ?1 AND is_deleted = 0
             ORDER BY message_time DESC, message_id DESC",
        )?;
        let messages: Vec<ConversationMessage> = stmt
            .query_map([conversation_id], |row| Self::row_to_message(row))?
            .filter_map(|r| r.ok())
            .collect();

        let mut att_stmt = conn.prepare(
            "SELECT attachment_id, message_id, attachment_name, attachment_path,
             attachment_type, attachment_size
             FROM message_attachments WHERE message_id = ?1",
        )?;
        let mut out = Vec::with_capacity(messages.len());
        for message in messages {
            let attachments = att_stmt
                .query_map([message.message_id], |row| {
                    Ok(MessageAttachment {
                        attachment_id: row.get(0)?,
                        message_id: row.get(1)?,
                        attachment_name: row.get(2)?,
                        attachment_path: row.get(3)?,
                        attachment_type: row.get(4)?,
                        attachment_size: row.get(5)?,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();
            out.push((message, attachments));
        }
        Ok(out)
    }

    pub fn add_attachment(
        &self,
        message_id: i64,
        name: Option<&str>,
        path: Option<&str>,
        mime_type: Option<&str>,
        size: Option<i64>,
    ) -> SqliteResult<MessageAttachment> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO message_attachments
             (message_id, attachment_name, attachment_path, attachment_type, attachment_size)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![message_id, name, path, mime_type, size],
        )?;
        Ok(MessageAttachment {
            attachment_id: conn.last_insert_rowid(),
            message_id,
            attachment_name: name.map(|s| s.to_string()),
            attachment_path: path.map(|s| s.to_string()),
            attachment_type: mime_type.map(|s| s.to_string()),
            attachment_size: size,
        })
    }

    pub fn mark_message_read(&self, conversation_id: i64, message_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE conversation_messages SET is_read = 1
             WHERE message_id = ?1 AND conversation_id = ?2 AND is_deleted = 0",
            [message_id, conversation_id],
        )?;
        Ok(changed > 0)
    }

    pub fn soft_delete_message(&self, conversation_id: i64, message_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE conversation_messages SET is_deleted = 1
             WHERE message_id = ?1 AND conversation_id = ?2 AND is_deleted = 0",
            [message_id, conversation_id],
        )?;
        Ok(changed > 0)
    }

    pub fn list_tags(&self, conversation_id: i64) -> SqliteResult<Vec<ConversationTag>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT tag_id, conversation_id, tag_name, is_active, is_deleted, created_at, updated_at
             FROM conversation_tags
             WHERE conversation_id = ?1 AND is_deleted = 0 ORDER BY created_at",
        )?;
        let tags = stmt
            .query_map([conversation_id], |row| {
                Ok(ConversationTag {
                    tag_id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    tag_name: row.get(2)?,
                    is_active: row.get::<_, i32>(3)? != 0,
                    is_deleted: row.get::<_, i32>(4)? != 0,
                    created_at: Self::parse_time(row.get::<_, String>(5)?),
                    updated_at: Self::parse_time(row.get::<_, String>(6)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tags)
    }

    /// Returns None when the tag name already exists on this conversation.
    pub fn add_tag(
        &self,
        conversation_id: i64,
        tag_name: &str,
    ) -> SqliteResult<Option<ConversationTag>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO conversation_tags (conversation_id, tag_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            rusqlite::params![conversation_id, tag_name, &now_str],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(ConversationTag {
            tag_id: conn.last_insert_rowid(),
            conversation_id,
            tag_name: tag_name.to_string(),
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }))
    }

    pub fn list_notes(&self, conversation_id: i64) -> SqliteResult<Vec<ConversationNote>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT note_id, conversation_id, note_text, is_active, is_deleted, created_at, updated_at
             FROM conversation_notes
             WHERE conversation_id = ?1 AND is_deleted = 0 ORDER BY created_at",
        )?;
        let notes = stmt
            .query_map([conversation_id], |row| {
                Ok(ConversationNote {
                    note_id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    note_text: row.get(2)?,
                    is_active: row.get::<_, i32>(3)? != 0,
                    is_deleted: row.get::<_, i32>(4)? != 0,
                    created_at: Self::parse_time(row.get::<_, String>(5)?),
                    updated_at: Self::parse_time(row.get::<_, String>(6)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(notes)
    }

    /// Returns None when an identical note already exists on this conversation.
    pub fn add_note(
        &self,
        conversation_id: i64,
        note_text: &str,
    ) -> SqliteResult<Option<ConversationNote>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO conversation_notes (conversation_id, note_text, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            rusqlite::params![conversation_id, note_text, &now_str],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(ConversationNote {
            note_id: conn.last_insert_rowid(),
            conversation_id,
            note_text: Some(note_text.to_string()),
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }))
    }

    pub fn list_feedback(&self, conversation_id: i64) -> SqliteResult<Vec<ConversationFeedback>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT feedback_id, conversation_id, feedback_text, rating, is_deleted, created_at, updated_at
             FROM conversation_feedback
             WHERE conversation_id = ?1 AND is_deleted = 0 ORDER BY created_at",
        )?;
        let feedback = stmt
            .query_map([conversation_id], |row| {
                Ok(ConversationFeedback {
                    feedback_id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    feedback_text: row.get(2)?,
                    rating: row.get(3)?,
                    is_deleted: row.get::<_, i32>(4)? != 0,
                    created_at: Self::parse_time(row.get::<_, String>(5)?),
                    updated_at: Self::parse_time(row.get::<_, String>(6)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(feedback)
    }

    pub fn add_feedback(
        &self,
        conversation_id: i64,
        feedback_text: Option<&str>,
        rating: Option<i64>,
    ) -> SqliteResult<ConversationFeedback> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        conn.execute(
            "INSERT INTO conversation_feedback (conversation_id, feedback_text, rating, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![conversation_id, feedback_text, rating, &now_str],
        )?;
        Ok(ConversationFeedback {
            feedback_id: conn.last_insert_rowid(),
            conversation_id,
            feedback_text: feedback_text.map(|s| s.to_string()),
            rating,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<ConversationMessage> {
        let sender_type_str: String = row.get(3)?;
        let message_time_str: String = row.get(6)?;
        Ok(ConversationMessage {
            message_id: row.get(0)?,
            conversation_id: row.get(1)?,
            sender_id: row.get(2)?,
            sender_type: SenderType::from_str(&sender_type_str).unwrap_or(SenderType::User),
            message_text: row.get(4)?,
            message_type: row.get(5)?,
            message_time: Self::parse_time(message_time_str),
            is_read: row.get::<_, i32>(7)? != 0,
            is_deleted: row.get::<_, i32>(8)? != 0,
            is_archived: row.get::<_, i32>(9)? != 0,
        })
    }

    pub(crate) fn parse_time(s: String) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
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
            .create_agent(user.id, "Support Bot", "Answers support tickets", Visibility::Private, None, None)
            .unwrap();
        (db, dir, user.id, agent.agent_id)
    }

    #[test]
    fn test_message_flow_and_overview() {
        let (db, _dir, user_id, agent_id) = seeded();
        let conversation = db.create_conversation(agent_id, Some("billing question")).unwrap();
        db.add_message(conversation.conversation_id, Some(user_id), SenderType::User, Some("Why was I charged?"), None)
            .unwrap();
        let reply = db
            .add_message(conversation.conversation_id, None, SenderType::Agent, Some("Let me check."), None)
            .unwrap();

        let overviews = db.list_conversation_overviews(user_id, None).unwrap();
        assert_eq!(overviews.len(), 1);
        assert_eq!(overviews[0].agent_name, "Support Bot");
        assert_eq!(overviews[0].last_message.as_deref(), Some("Let me check."));
        assert_eq!(overviews[0].unread_count, 1);

        let messages = db.list_messages(conversation.conversation_id).unwrap();
        assert_eq!(messages.len(), 2);
        // Newest first.
        assert_eq!(messages[0].0.message_id, reply.message_id);
    }

    #[test]
    fn test_read_and_soft_delete_message() {
        let (db, _dir, user_id, agent_id) = seeded();
        let conversation = db.create_conversation(agent_id, None).unwrap();
        let message = db
            .add_message(conversation.conversation_id, Some(user_id), SenderType::User, Some("hello"), None)
            .unwrap();

        assert!(db.mark_message_read(conversation.conversation_id, message.message_id).unwrap());
        let overviews = db.list_conversation_overviews(user_id, None).unwrap();
        assert_eq!(overviews[0].unread_count, 0);

        assert!(db.soft_delete_message(conversation.conversation_id, message.message_id).unwrap());
        assert!(db.list_messages(conversation.conversation_id).unwrap().is_empty());
        // Second delete is a no-op.
        assert!(!db.soft_delete_message(conversation.conversation_id, message.message_id).unwrap());
    }

    #[test]
    fn test_deleted_filter_shows_fully_deleted_conversations() {
        let (db, _dir, user_id, agent_id) = seeded();
        let conversation = db.create_conversation(agent_id, None).unwrap();
        let message = db
            .add_message(conversation.conversation_id, Some(user_id), SenderType::User, Some("gone soon"), None)
            .unwrap();
        db.soft_delete_message(conversation.conversation_id, message.message_id).unwrap();

        assert!(db.list_conversation_overviews(user_id, None).unwrap().is_empty());
        let deleted = db
            .list_conversation_overviews(user_id, Some(ConversationFilter::Deleted))
            .unwrap();
        assert_eq!(deleted.len(), 1);
    }

    #[test]
    fn test_duplicate_tag_and_note_rejected() {
        let (db, _dir, _user_id, agent_id) = seeded();
        let conversation = db.create_conversation(agent_id, None).unwrap();

        assert!(db.add_tag(conversation.conversation_id, "billing").unwrap().is_some());
        assert!(db.add_tag(conversation.conversation_id, "billing").unwrap().is_none());
        assert_eq!(db.list_tags(conversation.conversation_id).unwrap().len(), 1);

        assert!(db.add_note(conversation.conversation_id, "follow up monday").unwrap().is_some());
        assert!(db.add_note(conversation.conversation_id, "follow up monday").unwrap().is_none());
    }

    #[test]
    fn test_feedback_round_trip() {
        let (db, _dir, _user_id, agent_id) = seeded();
        let conversation = db.create_conversation(agent_id, None).unwrap();
        db.add_feedback(conversation.conversation_id, Some("great answer"), Some(5)).unwrap();
        let feedback = db.list_feedback(conversation.conversation_id).unwrap();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].rating, Some(5));
    }

    #[test]
    fn test_conversation_ownership() {
        let (db, _dir, user_id, agent_id) = seeded();
        let other = db.create_user("other@example.com", "hash", "Other").unwrap();
        let conversation = db.create_conversation(agent_id, None).unwrap();
        assert!(db.conversation_owned_by(conversation.conversation_id, user_id).unwrap());
        assert!(!db.conversation_owned_by(conversation.conversation_id, other.id).unwrap());
    }
}
