use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted chat session. `last_message` is bumped on every saved turn and
/// only ever moves forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub last_message: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
