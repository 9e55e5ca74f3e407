use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Agent,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::User => "user",
            SenderType::Agent => "agent",
        }
    }

    pub fn from_str(s: &str) -> Option<SenderType> {
        match s {
            "user" => Some(SenderType::User),
            "agent" => Some(SenderType::Agent),
            _ => None,
        }
    }
}

/// List-endpoint filter values. Anything else is rejected with 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationFilter {
    Active,
    Completed,
    Archived,
    Unread,
    Deleted,
    Favorite,
}

impl ConversationFilter {
    pub fn from_str(s: &str) -> Option<ConversationFilter> {
        match s {
            "active" => Some(ConversationFilter::Active),
            "completed" => Some(ConversationFilter::Completed),
            "archived" => Some(ConversationFilter::Archived),
            "unread" => Some(ConversationFilter::Unread),
            "deleted" => Some(ConversationFilter::Deleted),
            "favorite" => Some(ConversationFilter::Favorite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: i64,
    pub agent_id: i64,
    pub conversation_name: Option<String>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A conversation joined with its derived message fields, as the list and
/// recent-chats endpoints return it.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationOverview {
    pub conversation_id: i64,
    pub agent_id: i64,
    pub agent_name: String,
    pub conversation_name: Option<String>,
    pub is_favorite: bool,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub last_message_is_read: bool,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
}

impl ConversationOverview {
    /// Active means a message arrived within the last 60 seconds.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.last_message_time {
            Some(t) => now - t < chrono::Duration::seconds(60),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub message_id: i64,
    pub conversation_id: i64,
    pub sender_id: Option<i64>,
    pub sender_type: SenderType,
    pub message_text: Option<String>,
    pub message_type: Option<String>,
    pub message_time: DateTime<Utc>,
    pub is_read: bool,
    pub is_deleted: bool,
    pub is_archived: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub attachment_id: i64,
    pub message_id: i64,
    pub attachment_name: Option<String>,
    pub attachment_path: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTag {
    pub tag_id: i64,
    pub conversation_id: i64,
    pub tag_name: String,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationNote {
    pub note_id: i64,
    pub conversation_id: i64,
    pub note_text: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationFeedback {
    pub feedback_id: i64,
    pub conversation_id: i64,
    pub feedback_text: Option<String>,
    pub rating: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parsing_rejects_unknown_values() {
        assert_eq!(ConversationFilter::from_str("favorite"), Some(ConversationFilter::Favorite));
        assert_eq!(ConversationFilter::from_str("starred"), None);
    }

    #[test]
    fn overview_activity_window() {
        let now = Utc::now();
        let mut overview = ConversationOverview {
            conversation_id: 1,
            agent_id: 1,
            agent_name: "Support".to_string(),
            conversation_name: None,
            is_favorite: false,
            last_message: None,
            last_message_time: Some(now - chrono::Duration::seconds(30)),
            last_message_is_read: false,
            unread_count: 0,
            created_at: now,
        };
        assert!(overview.is_active(now));
        overview.last_message_time = Some(now - chrono::Duration::seconds(90));
        assert!(!overview.is_active(now));
        overview.last_message_time = None;
        assert!(!overview.is_active(now));
    }
}
