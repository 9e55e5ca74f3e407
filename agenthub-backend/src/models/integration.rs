use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A third-party service credential/config attached to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub integration_id: i64,
    pub agent_id: i64,
    pub integration_name: String,
    pub integration_type: String,
    pub integration_url: Option<String>,
    pub integration_key: Option<String>,
    pub integration_secret: Option<String>,
    pub integration_token: Option<String>,
    pub description: Option<String>,
    pub configuration: Option<serde_json::Value>,
    pub meta_data: Option<serde_json::Value>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Integration {
    /// Public-facing view: credentials reduced to a presence flag.
    pub fn public_details(&self) -> serde_json::Value {
        serde_json::json!({
            "integration_id": self.integration_id,
            "integration_name": self.integration_name,
            "integration_type": self.integration_type,
            "integration_url": self.integration_url,
            "description": self.description,
            "is_active": self.is_active,
            "token_masked": self.integration_token.is_some(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationCategory {
    pub category_id: i64,
    pub agent_id: i64,
    pub category_name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_details_mask_credentials() {
        let now = Utc::now();
        let integration = Integration {
            integration_id: 1,
            agent_id: 1,
            integration_name: "CRM Hook".to_string(),
            integration_type: "webhook".to_string(),
            integration_url: None,
            integration_key: Some("key".to_string()),
            integration_secret: Some("secret".to_string()),
            integration_token: Some("token".to_string()),
            description: None,
            configuration: None,
            meta_data: None,
            is_active: true,
            is_deleted: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };
        let details = integration.public_details();
        assert_eq!(details["token_masked"], serde_json::json!(true));
        assert!(details.get("integration_secret").is_none());
        assert!(details.get("integration_key").is_none());
    }
}
