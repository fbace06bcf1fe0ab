use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A portal notification raised by an approval transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<String>,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
