//! Database table modules - extend Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks with methods for a specific table group.

mod agent_assets;   // agent_documents, agent_qa_pairs, agent_websites, agent_embeddings
mod agents;         // agents
mod conversations;  // conversations, conversation_messages, attachments, tags, notes, feedback
mod dashboard;      // dashboard_stats + aggregate queries
mod integrations;   // integrations, integration_categories
mod plans;          // subscription_plans, plan_features, user_subscriptions
mod users;          // users, auth_sessions

pub(crate) mod json;

pub use agent_assets::{DocumentInput, EmbeddingInput, QaPairInput, WebsiteInput};
pub use agents::AgentUpdate;
pub use dashboard::EngagementDay;
pub use integrations::IntegrationInput;
