use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agent visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn from_str(s: &str) -> Option<Visibility> {
        match s {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Private
    }
}

/// A configured conversational-AI persona owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub avatar_url: Option<String>,
    pub configuration: Option<serde_json::Value>,
    pub is_deleted: bool,
    pub is_archived: bool,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A knowledge document attached to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDocument {
    pub document_id: i64,
    pub agent_id: i64,
    pub document_name: Option<String>,
    pub document_description: Option<String>,
    pub document_url: String,
    pub document_size: Option<i64>,
    pub document_format: Option<String>,
    pub document_language: Option<String>,
    pub document_tags: Vec<String>,
    pub meta_data: Option<serde_json::Value>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentDocument {
    /// Human-readable size: "12.00 KB", "3.50 MB", ...
    pub fn formatted_size(&self) -> String {
        let Some(bytes) = self.document_size else {
            return "Unknown".to_string();
        };
        let mut size = bytes as f64;
        for unit in ["B", "KB", "MB", "GB", "TB"] {
            if size < 1024.0 {
                return format!("{:.2} {}", size, unit);
            }
            size /= 1024.0;
        }
        format!("{:.2} PB", size)
    }

    /// Documents expire after `expiration_days` from meta_data, default 365.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let expiration_days = self
            .meta_data
            .as_ref()
            .and_then(|m| m.get("expiration_days"))
            .and_then(|v| v.as_i64())
            .unwrap_or(365);
        self.created_at < now - chrono::Duration::days(expiration_days)
    }

    pub fn size_kb(&self) -> Option<f64> {
        self.document_size
            .map(|b| (b as f64 / 1024.0 * 100.0).round() / 100.0)
    }
}

/// A question/answer pair used to seed an agent's knowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentQaPair {
    pub qa_pair_id: i64,
    pub agent_id: i64,
    pub qa_pair_name: Option<String>,
    pub question_type: Option<String>,
    pub question: String,
    pub answer: String,
    pub tags: Vec<String>,
    pub question_language: Option<String>,
    pub answer_language: Option<String>,
    pub meta_data: Option<serde_json::Value>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentQaPair {
    pub fn is_faq(&self) -> bool {
        self.question_type.as_deref() == Some("FAQ")
    }

    /// Short "Q: ... A: ..." preview with both sides truncated.
    pub fn summary(&self, q_len: usize, a_len: usize) -> String {
        fn clip(s: &str, max: usize) -> String {
            if s.chars().count() > max {
                let clipped: String = s.chars().take(max).collect();
                format!("{}...", clipped)
            } else {
                s.to_string()
            }
        }
        format!("Q: {} A: {}", clip(&self.question, q_len), clip(&self.answer, a_len))
    }
}

/// A website an agent crawls for content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentWebsite {
    pub website_id: i64,
    pub agent_id: i64,
    pub website_url: String,
    pub website_name: String,
    pub website_type: Option<String>,
    pub crawl_status: Option<String>,
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub crawl_frequency: Option<String>,
    pub content_language: Option<String>,
    pub page_limit: Option<i64>,
    pub is_verified: bool,
    pub source_type: Option<String>,
    pub meta_data: Option<serde_json::Value>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentWebsite {
    /// Whether a crawl is due. Never crawled or no frequency means yes;
    /// an unparseable frequency means no.
    pub fn should_crawl(&self, now: DateTime<Utc>) -> bool {
        let (Some(last), Some(freq)) = (self.last_crawled_at, self.crawl_frequency.as_deref())
        else {
            return true;
        };
        let days = match freq.trim().to_lowercase().as_str() {
            "daily" => 1,
            "weekly" => 7,
            "monthly" => 30,
            other => match other.parse::<i64>() {
                Ok(n) => n,
                Err(_) => return false,
            },
        };
        now >= last + chrono::Duration::days(days)
    }

    /// Domain part of the website URL, empty when it cannot be extracted.
    pub fn domain(&self) -> String {
        let rest = self
            .website_url
            .split_once("://")
            .map(|(_, r)| r)
            .unwrap_or(&self.website_url);
        rest.split(['/', '?', '#'])
            .next()
            .unwrap_or("")
            .to_string()
    }
}

/// A stored embedding vector for one of an agent's knowledge objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEmbedding {
    pub embedding_id: i64,
    pub agent_id: i64,
    pub embedding_model: Option<String>,
    pub vector_dimension: Option<i64>,
    pub object_id: Option<String>,
    pub object_type: Option<String>,
    pub object_name: Option<String>,
    pub language: Option<String>,
    pub token_count: Option<i64>,
    pub tags: Vec<String>,
    pub embedding_vector: Vec<f64>,
    pub meta_data: Option<serde_json::Value>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentEmbedding {
    pub fn display_name(&self) -> String {
        format!(
            "{} - {}",
            self.object_type.as_deref().unwrap_or("Unknown"),
            self.object_name.as_deref().unwrap_or("Unnamed")
        )
    }

    /// Cosine similarity between two vectors. Empty or zero-norm vectors
    /// yield 0.0 rather than an error.
    pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
        if a.is_empty() || b.is_empty() || a.len() != b.len() {
            return 0.0;
        }
        let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_size_walks_units() {
        let mut doc = sample_document(Some(512));
        assert_eq!(doc.formatted_size(), "512.00 B");
        doc.document_size = Some(2048);
        assert_eq!(doc.formatted_size(), "2.00 KB");
        doc.document_size = Some(5 * 1024 * 1024);
        assert_eq!(doc.formatted_size(), "5.00 MB");
        doc.document_size = None;
        assert_eq!(doc.formatted_size(), "Unknown");
    }

    #[test]
    fn document_expiry_honors_meta_override() {
        let now = Utc::now();
        let mut doc = sample_document(None);
        doc.created_at = now - chrono::Duration::days(10);
        assert!(!doc.is_expired(now));
        doc.meta_data = Some(serde_json::json!({ "expiration_days": 5 }));
        assert!(doc.is_expired(now));
    }

    #[test]
    fn cosine_similarity_handles_degenerate_vectors() {
        assert_eq!(AgentEmbedding::cosine_similarity(&[], &[1.0]), 0.0);
        assert_eq!(AgentEmbedding::cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        let sim = AgentEmbedding::cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]);
        assert!((sim - 1.0).abs() < 1e-12);
        let ortho = AgentEmbedding::cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(ortho.abs() < 1e-12);
    }

    #[test]
    fn website_crawl_schedule() {
        let now = Utc::now();
        let mut site = sample_website();
        assert!(site.should_crawl(now), "never crawled");
        site.last_crawled_at = Some(now - chrono::Duration::days(2));
        site.crawl_frequency = Some("daily".to_string());
        assert!(site.should_crawl(now));
        site.crawl_frequency = Some("weekly".to_string());
        assert!(!site.should_crawl(now));
        site.crawl_frequency = Some("not-a-frequency".to_string());
        assert!(!site.should_crawl(now));
        site.crawl_frequency = Some("1".to_string());
        assert!(site.should_crawl(now));
    }

    #[test]
    fn website_domain_extraction() {
        let mut site = sample_website();
        site.website_url = "https://docs.example.com/guides?x=1".to_string();
        assert_eq!(site.domain(), "docs.example.com");
    }

    fn sample_document(size: Option<i64>) -> AgentDocument {
        let now = Utc::now();
        AgentDocument {
            document_id: 1,
            agent_id: 1,
            document_name: Some("handbook.pdf".to_string()),
            document_description: None,
            document_url: "https://example.com/handbook.pdf".to_string(),
            document_size: size,
            document_format: Some("pdf".to_string()),
            document_language: None,
            document_tags: vec![],
            meta_data: None,
            is_active: true,
            is_deleted: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_website() -> AgentWebsite {
        let now = Utc::now();
        AgentWebsite {
            website_id: 1,
            agent_id: 1,
            website_url: "https://example.com".to_string(),
            website_name: "Example".to_string(),
            website_type: None,
            crawl_status: None,
            last_crawled_at: None,
            crawl_frequency: None,
            content_language: None,
            page_limit: None,
            is_verified: false,
            source_type: None,
            meta_data: None,
            is_active: true,
            is_deleted: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }
}
