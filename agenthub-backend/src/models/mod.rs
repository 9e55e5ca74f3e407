//! Domain model structs shared between the database layer and controllers.

mod agent;
mod conversation;
mod integration;
mod plan;
mod user;

pub use agent::{
    Agent, AgentDocument, AgentEmbedding, AgentQaPair, AgentWebsite, Visibility,
};
pub use conversation::{
    Conversation, ConversationFeedback, ConversationFilter, ConversationMessage,
    ConversationNote, ConversationOverview, ConversationTag, MessageAttachment, SenderType,
};
pub use integration::{Integration, IntegrationCategory};
pub use plan::{PlanFeature, PlanPeriod, SubscriptionPlan, UserSubscription};
pub use user::{AuthSession, User};
