use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationStatus {
    Success,
    Failure,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Success => "SUCCESS",
            GenerationStatus::Failure => "FAILURE",
        }
    }
}

/// The persisted record of one generation attempt, written exactly once at
/// the end of the attempt (success or failure) and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub id: String,
    pub template_id: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docx_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote_paths: Vec<String>,
    pub status: GenerationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when local generation succeeded but the remote mirror failed;
    /// the document itself still counts as generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_warning: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of a batch generation response. A template either produced a
/// record (which may itself be a `FAILURE`) or was rejected outright, e.g.
/// for unresolved variables; the other templates are unaffected either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchGenerationItem {
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<GeneratedDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
