use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named system-prompt template. Names are unique; personality overrides
/// are stored under `personality_<key>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    pub content: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
