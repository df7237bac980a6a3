use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One append-only entry per successful module execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: String,
    pub module_id: String,
    pub tokens_used: u64,
    pub prompt: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}
