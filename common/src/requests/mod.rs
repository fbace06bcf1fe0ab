use crate::model::mapping::FieldMapping;
use crate::model::profile::{OutputFormat, OutputRules, RemoteRules, RepeatRules, RepeatSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata accompanying a template upload (the `json` multipart part; the
/// file itself travels in the `file` part).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateUploadMeta {
    pub name: String,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Replaces a template's default mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMappingRequest {
    pub mapping: FieldMapping,
}

/// Sets or clears a template's letterhead image (base64 PNG).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveLetterheadRequest {
    pub letterhead_png: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfileRequest {
    pub template_id: String,
    pub name: String,
    #[serde(default)]
    pub mapping: FieldMapping,
    #[serde(default)]
    pub repeat_rules: RepeatRules,
    #[serde(default)]
    pub output_rules: OutputRules,
    #[serde(default)]
    pub remote_rules: RemoteRules,
}

/// Saves per-client staff inputs for later pre-filling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveStaffInputsRequest {
    pub inputs: BTreeMap<String, String>,
}

/// Replaces one client's rows for a repeat-data collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceCollectionRequest {
    pub source: RepeatSource,
    pub rows: Vec<BTreeMap<String, String>>,
}

/// Batch variable resolution across one or more templates for a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub template_ids: Vec<String>,
    pub client_id: String,
    /// Empty or absent means "use each template's default mapping".
    #[serde(default)]
    pub profile_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub client_id: String,
    pub template_id: String,
    #[serde(default)]
    pub profile_id: Option<String>,
    /// Operator-supplied values for this run; they outrank everything the
    /// resolver found.
    #[serde(default)]
    pub staff_inputs: BTreeMap<String, String>,
    /// Overrides the profile's output formats when present.
    #[serde(default)]
    pub formats: Option<Vec<OutputFormat>>,
    #[serde(default)]
    pub save_to_remote: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateBatchRequest {
    pub client_id: String,
    pub template_ids: Vec<String>,
    #[serde(default)]
    pub staff_inputs: BTreeMap<String, String>,
    #[serde(default)]
    pub save_to_remote: bool,
}

/// Sends a successfully generated document into attorney review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApprovalRequest {
    pub doc_id: String,
    pub template_name: String,
    pub matter_name: String,
    pub drafter_id: String,
    pub drafter_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub approver: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyRequest {
    pub approver: String,
    /// Mandatory; a denial without an explanation is rejected.
    pub comments: String,
}
