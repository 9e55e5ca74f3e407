//! Agent knowledge assets: documents, QA pairs, websites, embeddings

use chrono::Utc;
use rusqlite::Result as SqliteResult;
use serde::Deserialize;

use super::super::Database;
use super::json;
use crate::models::{AgentDocument, AgentEmbedding, AgentQaPair, AgentWebsite};

#[derive(Debug, Default, Deserialize)]
pub struct DocumentInput {
    pub document_name: Option<String>,
    pub document_description: Option<String>,
    pub document_url: String,
    pub document_size: Option<i64>,
    pub document_format: Option<String>,
    pub document_language: Option<String>,
    #[serde(default)]
    pub document_tags: Vec<String>,
    pub meta_data: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QaPairInput {
    pub qa_pair_name: Option<String>,
    pub question_type: Option<String>,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub question_language: Option<String>,
    pub answer_language: Option<String>,
    pub meta_data: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebsiteInput {
    pub website_url: String,
    pub website_name: String,
    pub website_type: Option<String>,
    pub crawl_frequency: Option<String>,
    pub content_language: Option<String>,
    pub page_limit: Option<i64>,
    pub source_type: Option<String>,
    pub meta_data: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmbeddingInput {
    pub embedding_model: Option<String>,
    pub object_id: Option<String>,
    pub object_type: Option<String>,
    pub object_name: Option<String>,
    pub language: Option<String>,
    pub token_count: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub embedding_vector: Vec<f64>,
    pub meta_data: Option<serde_json::Value>,
}

impl Database {
    pub fn create_document(
        &self,
        agent_id: i64,
        input: &DocumentInput,
    ) -> SqliteResult<AgentDocument> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        conn.execute(
            "INSERT INTO agent_documents
             (agent_id, document_name, document_description, document_url, document_size,
              document_format, document_language, document_tags, meta_data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            rusqlite::params![
                agent_id,
                input.document_name,
                input.document_description,
                input.document_url,
                input.document_size,
                input.document_format,
                input.document_language,
                serde_json::to_string(&input.document_tags).unwrap_or_else(|_| "[]".to_string()),
                json::to_text(&input.meta_data),
                &now_str,
            ],
        )?;
        Ok(AgentDocument {
            document_id: conn.last_insert_rowid(),
            agent_id,
            document_name: input.document_name.clone(),
            document_description: input.document_description.clone(),
            document_url: input.document_url.clone(),
            document_size: input.document_size,
            document_format: input.document_format.clone(),
            document_language: input.document_language.clone(),
            document_tags: input.document_tags.clone(),
            meta_data: input.meta_data.clone(),
            is_active: true,
            is_deleted: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn list_documents(&self, agent_id: i64) -> SqliteResult<Vec<AgentDocument>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT document_id, agent_id, document_name, document_description, document_url,
             document_size, document_format, document_language, document_tags, meta_data,
             is_active, is_deleted, is_archived, created_at, updated_at
             FROM agent_documents
             WHERE agent_id = ?1 AND is_deleted = 0 ORDER BY created_at DESC",
        )?;
        let docs = stmt
            .query_map([agent_id], |row| Self::row_to_document(row))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(docs)
    }

    pub fn soft_delete_document(&self, agent_id: i64, document_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE agent_documents SET is_deleted = 1, updated_at = ?1
             WHERE document_id = ?2 AND agent_id = ?3 AND is_deleted = 0",
            rusqlite::params![&now, document_id, agent_id],
        )?;
        Ok(changed > 0)
    }

    /// Returns None when qa_pair_name collides with an existing pair.
    pub fn create_qa_pair(
        &self,
        agent_id: i64,
        input: &QaPairInput,
    ) -> SqliteResult<Option<AgentQaPair>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO agent_qa_pairs
             (agent_id, qa_pair_name, question_type, question, answer, tags,
              question_language, answer_language, meta_data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            rusqlite::params![
                agent_id,
                input.qa_pair_name,
                input.question_type,
                input.question,
                input.answer,
                serde_json::to_string(&input.tags).unwrap_or_else(|_| "[]".to_string()),
                input.question_language,
                input.answer_language,
                json::to_text(&input.meta_data),
                &now_str,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(AgentQaPair {
            qa_pair_id: conn.last_insert_rowid(),
            agent_id,
            qa_pair_name: input.qa_pair_name.clone(),
            question_type: input.question_type.clone(),
            question: input.question.clone(),
            answer: input.answer.clone(),
            tags: input.tags.clone(),
            question_language: input.question_language.clone(),
            answer_language: input.answer_language.clone(),
            meta_data: input.meta_data.clone(),
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }))
    }

    pub fn list_qa_pairs(&self, agent_id: i64) -> SqliteResult<Vec<AgentQaPair>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT qa_pair_id, agent_id, qa_pair_name, question_type, question, answer, tags,
             question_language, answer_language, meta_data, is_active, is_deleted,
             created_at, updated_at
             FROM agent_qa_pairs
             WHERE agent_id = ?1 AND is_deleted = 0 ORDER BY created_at DESC",
        )?;
        let pairs = stmt
            .query_map([agent_id], |row| Self::row_to_qa_pair(row))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(pairs)
    }

    pub fn soft_delete_qa_pair(&self, agent_id: i64, qa_pair_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE agent_qa_pairs SET is_deleted = 1, updated_at = ?1
             WHERE qa_pair_id = ?2 AND agent_id = ?3 AND is_deleted = 0",
            rusqlite::params![&now, qa_pair_id, agent_id],
        )?;
        Ok(changed > 0)
    }

    pub fn create_website(
        &self,
        agent_id: i64,
        input: &WebsiteInput,
    ) -> SqliteResult<AgentWebsite> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        conn.execute(
            "INSERT INTO agent_websites
             (agent_id, website_url, website_name, website_type, crawl_frequency,
              content_language, page_limit, source_type, meta_data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            rusqlite::params![
                agent_id,
                input.website_url,
                input.website_name,
                input.website_type,
                input.crawl_frequency,
                input.content_language,
                input.page_limit,
                input.source_type,
                json::to_text(&input.meta_data),
                &now_str,
            ],
        )?;
        Ok(AgentWebsite {
            website_id: conn.last_insert_rowid(),
            agent_id,
            website_url: input.website_url.clone(),
            website_name: input.website_name.clone(),
            website_type: input.website_type.clone(),
            crawl_status: None,
            last_crawled_at: None,
            crawl_frequency: input.crawl_frequency.clone(),
            content_language: input.content_language.clone(),
            page_limit: input.page_limit,
            is_verified: false,
            source_type: input.source_type.clone(),
            meta_data: input.meta_data.clone(),
            is_active: true,
            is_deleted: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn list_websites(&self, agent_id: i64) -> SqliteResult<Vec<AgentWebsite>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT website_id, agent_id, website_url, website_name, website_type, crawl_status,
             last_crawled_at, crawl_frequency, content_language, page_limit, is_verified,
             source_type, meta_data, is_active, is_deleted, is_archived, created_at, updated_at
             FROM agent_websites
             WHERE agent_id = ?1 AND is_deleted = 0 ORDER BY created_at DESC",
        )?;
        let sites = stmt
            .query_map([agent_id], |row| Self::row_to_website(row))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(sites)
    }

    pub fn soft_delete_website(&self, agent_id: i64, website_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE agent_websites SET is_deleted = 1, updated_at = ?1
             WHERE website_id = ?2 AND agent_id = ?3 AND is_deleted = 0",
            rusqlite::params![&now, website_id, agent_id],
        )?;
        Ok(changed > 0)
    }

    pub fn create_embedding(
        &self,
        agent_id: i64,
        input: &EmbeddingInput,
    ) -> SqliteResult<AgentEmbedding> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        conn.execute(
            "INSERT INTO agent_embeddings
             (agent_id, embedding_model, vector_dimension, object_id, object_type, object_name,
              language, token_count, tags, embedding_vector, meta_data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
            rusqlite::params![
                agent_id,
                input.embedding_model,
                input.embedding_vector.len() as i64,
                input.object_id,
                input.object_type,
                input.object_name,
                input.language,
                input.token_count,
                serde_json::to_string(&input.tags).unwrap_or_else(|_| "[]".to_string()),
                serde_json::to_string(&input.embedding_vector).unwrap_or_else(|_| "[]".to_string()),
                json::to_text(&input.meta_data),
                &now_str,
            ],
        )?;
        Ok(AgentEmbedding {
            embedding_id: conn.last_insert_rowid(),
            agent_id,
            embedding_model: input.embedding_model.clone(),
            vector_dimension: Some(input.embedding_vector.len() as i64),
            object_id: input.object_id.clone(),
            object_type: input.object_type.clone(),
            object_name: input.object_name.clone(),
            language: input.language.clone(),
            token_count: input.token_count,
            tags: input.tags.clone(),
            embedding_vector: input.embedding_vector.clone(),
            meta_data: input.meta_data.clone(),
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn list_embeddings(&self, agent_id: i64) -> SqliteResult<Vec<AgentEmbedding>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT embedding_id, agent_id, embedding_model, vector_dimension, object_id,
             object_type, object_name, language, token_count, tags, embedding_vector, meta_data,
             is_active, is_deleted, created_at, updated_at
             FROM agent_embeddings
             WHERE agent_id = ?1 AND is_deleted = 0 AND is_active = 1 ORDER BY created_at DESC",
        )?;
        let embeddings = stmt
            .query_map([agent_id], |row| Self::row_to_embedding(row))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(embeddings)
    }

    fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<AgentDocument> {
        let tags_str: Option<String> = row.get(8)?;
        let meta_str: Option<String> = row.get(9)?;
        Ok(AgentDocument {
            document_id: row.get(0)?,
            agent_id: row.get(1)?,
            document_name: row.get(2)?,
            document_description: row.get(3)?,
            document_url: row.get(4)?,
            document_size: row.get(5)?,
            document_format: row.get(6)?,
            document_language: row.get(7)?,
            document_tags: json::parse_string_list(tags_str),
            meta_data: json::parse_opt(meta_str),
            is_active: row.get::<_, i32>(10)? != 0,
            is_deleted: row.get::<_, i32>(11)? != 0,
            is_archived: row.get::<_, i32>(12)? != 0,
            created_at: Self::parse_time(row.get::<_, String>(13)?),
            updated_at: Self::parse_time(row.get::<_, String>(14)?),
        })
    }

    fn row_to_qa_pair(row: &rusqlite::Row) -> rusqlite::Result<AgentQaPair> {
        let tags_str: Option<String> = row.get(6)?;
        let meta_str: Option<String> = row.get(9)?;
        Ok(AgentQaPair {
            qa_pair_id: row.get(0)?,
            agent_id: row.get(1)?,
            qa_pair_name: row.get(2)?,
            question_type: row.get(3)?,
            question: row.get(4)?,
            answer: row.get(5)?,
            tags: json::parse_string_list(tags_str),
            question_language: row.get(7)?,
            answer_language: row.get(8)?,
            meta_data: json::parse_opt(meta_str),
            is_active: row.get::<_, i32>(10)? != 0,
            is_deleted: row.get::<_, i32>(11)? != 0,
            created_at: Self::parse_time(row.get::<_, String>(12)?),
            updated_at: Self::parse_time(row.get::<_, String>(13)?),
        })
    }

    fn row_to_website(row: &rusqlite::Row) -> rusqlite::Result<AgentWebsite> {
        let last_crawled_str: Option<String> = row.get(6)?;
        let meta_str: Option<String> = row.get(12)?;
        Ok(AgentWebsite {
            website_id: row.get(0)?,
            agent_id: row.get(1)?,
            website_url: row.get(2)?,
            website_name: row.get(3)?,
            website_type: row.get(4)?,
            crawl_status: row.get(5)?,
            last_crawled_at: last_crawled_str.map(Self::parse_time),
            crawl_frequency: row.get(7)?,
            content_language: row.get(8)?,
            page_limit: row.get(9)?,
            is_verified: row.get::<_, i32>(10)? != 0,
            source_type: row.get(11)?,
            meta_data: json::parse_opt(meta_str),
            is_active: row.get::<_, i32>(13)? != 0,
            is_deleted: row.get::<_, i32>(14)? != 0,
            is_archived: row.get::<_, i32>(15)? != 0,
            created_at: Self::parse_time(row.get::<_, String>(16)?),
            updated_at: Self::parse_time(row.get::<_, String>(17)?),
        })
    }

    fn row_to_embedding(row: &rusqlite::Row) -> rusqlite::Result<AgentEmbedding> {
        let tags_str: Option<String> = row.get(9)?;
        let vector_str: Option<String> = row.get(10)?;
        let meta_str: Option<String> = row.get(11)?;
        Ok(AgentEmbedding {
            embedding_id: row.get(0)?,
            agent_id: row.get(1)?,
            embedding_model: row.get(2)?,
            vector_dimension: row.get(3)?,
            object_id: row.get(4)?,
            object_type: row.get(5)?,
            object_name: row.get(6)?,
            language: row.get(7)?,
            token_count: row.get(8)?,
            tags: json::parse_string_list(tags_str),
            embedding_vector: json::parse_float_list(vector_str),
            meta_data: json::parse_opt(meta_str),
            is_active: row.get::<_, i32>(12)? != 0,
            is_deleted: row.get::<_, i32>(13)? != 0,
            created_at: Self::parse_time(row.get::<_, String>(14)?),
            updated_at: Self::parse_time(row.get::<_, String>(15)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Visibility;

    fn seeded() -> (Database, tempfile::TempDir, i64) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap();
        let user = db.create_user("owner@example.com", "hash", "Owner").unwrap();
        let agent = db
            .create_agent(user.id, "Docs Bot", "Answers from documents", Visibility::Private, None, None)
            .unwrap();
        (db, dir, agent.agent_id)
    }

    #[test]
    fn test_document_round_trip() {
        let (db, _dir, agent_id) = seeded();
        let input = DocumentInput {
            document_name: Some("handbook.pdf".to_string()),
            document_url: "https://example.com/handbook.pdf".to_string(),
            document_size: Some(2048),
            document_format: Some("pdf".to_string()),
            document_tags: vec!["hr".to_string()],
            ..Default::default()
        };
        let doc = db.create_document(agent_id, &input).unwrap();
        assert_eq!(doc.formatted_size(), "2.00 KB");

        let listed = db.list_documents(agent_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].document_tags, vec!["hr".to_string()]);

        assert!(db.soft_delete_document(agent_id, doc.document_id).unwrap());
        assert!(db.list_documents(agent_id).unwrap().is_empty());
    }

    #[test]
    fn test_qa_pair_name_uniqueness() {
        let (db, _dir, agent_id) = seeded();
        let input = QaPairInput {
            qa_pair_name: Some("refund-policy".to_string()),
            question: "How do refunds work?".to_string(),
            answer: "Within 30 days.".to_string(),
            ..Default::default()
        };
        assert!(db.create_qa_pair(agent_id, &input).unwrap().is_some());
        assert!(db.create_qa_pair(agent_id, &input).unwrap().is_none());
        // Unnamed pairs never collide.
        let unnamed = QaPairInput {
            question: "Q".to_string(),
            answer: "A".to_string(),
            ..Default::default()
        };
        assert!(db.create_qa_pair(agent_id, &unnamed).unwrap().is_some());
        assert!(db.create_qa_pair(agent_id, &unnamed).unwrap().is_some());
    }

    #[test]
    fn test_website_round_trip() {
        let (db, _dir, agent_id) = seeded();
        let input = WebsiteInput {
            website_url: "https://docs.example.com".to_string(),
            website_name: "Docs".to_string(),
            crawl_frequency: Some("weekly".to_string()),
            ..Default::default()
        };
        let site = db.create_website(agent_id, &input).unwrap();
        assert!(site.should_crawl(Utc::now()), "never crawled yet");

        let listed = db.list_websites(agent_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(db.soft_delete_website(agent_id, site.website_id).unwrap());
        assert!(db.list_websites(agent_id).unwrap().is_empty());
    }

    #[test]
    fn test_embedding_vector_storage() {
        let (db, _dir, agent_id) = seeded();
        let input = EmbeddingInput {
            embedding_model: Some("text-embedding-3-small".to_string()),
            object_type: Some("document".to_string()),
            object_name: Some("handbook.pdf".to_string()),
            embedding_vector: vec![0.25, -0.5, 0.75],
            ..Default::default()
        };
        let created = db.create_embedding(agent_id, &input).unwrap();
        assert_eq!(created.vector_dimension, Some(3));

        let listed = db.list_embeddings(agent_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].embedding_vector, vec![0.25, -0.5, 0.75]);
    }
}
