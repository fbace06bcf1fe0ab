use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review state of a generated document. Transitions run one way only:
/// `Pending -> Approved` or `Pending -> Denied`, nothing afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Denied => "DENIED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(ApprovalStatus::Pending),
            "APPROVED" => Some(ApprovalStatus::Approved),
            "DENIED" => Some(ApprovalStatus::Denied),
            _ => None,
        }
    }
}

/// One document's trip through attorney review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    pub doc_id: String,
    pub template_name: String,
    pub matter_name: String,
    pub drafter_id: String,
    pub drafter_name: String,
    pub status: ApprovalStatus,
    /// Reviewer comments, populated on denial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
