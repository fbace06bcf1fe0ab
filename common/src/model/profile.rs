//! Mapping profiles: named, reusable per-template override configurations.
//!
//! A template can carry any number of profiles (one per county is the common
//! case). At generation time at most one profile applies, and its mapping
//! replaces the template default outright — selection is exclusive, never a
//! merge.

use crate::model::mapping::FieldMapping;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The list-valued client collections a repeat block may draw rows from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatSource {
    AssetsDebts,
    CaseContacts,
    Beneficiaries,
    DatesDeadlines,
}

impl RepeatSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatSource::AssetsDebts => "assets_debts",
            RepeatSource::CaseContacts => "case_contacts",
            RepeatSource::Beneficiaries => "beneficiaries",
            RepeatSource::DatesDeadlines => "dates_deadlines",
        }
    }
}

/// Per-block repeat configuration: which collection feeds the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatRule {
    pub source: RepeatSource,
}

/// Block name -> rule, e.g. `{"assets": {"source": "assets_debts"}}`.
pub type RepeatRules = BTreeMap<String, RepeatRule>;

/// Output formats the generator can produce for a body template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Docx,
    Pdf,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
        }
    }
}

/// Output filename/format rules. The pattern understands the tokens
/// `{client}`, `{template}`, `{yyyy}`, `{mm}` and `{dd}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRules {
    #[serde(
        rename = "filenamePattern",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub filename_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<OutputFormat>,
}

/// Remote-storage rules: whether generated output is mirrored, and to which
/// folder (same tokens as the filename pattern).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRules {
    #[serde(default)]
    pub enabled: bool,
    #[serde(
        rename = "folderPattern",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub folder_pattern: Option<String>,
}

/// A named override set owned by one template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingProfile {
    pub id: String,
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
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_rules_match_documented_shape() {
        let mut rules = RepeatRules::new();
        rules.insert(
            "assets".to_string(),
            RepeatRule {
                source: RepeatSource::AssetsDebts,
            },
        );
        let json = serde_json::to_value(&rules).unwrap();
        assert_eq!(json["assets"]["source"], "assets_debts");
    }

    #[test]
    fn output_rules_default_is_empty() {
        let rules: OutputRules = serde_json::from_str("{}").unwrap();
        assert!(rules.filename_pattern.is_none());
        assert!(rules.formats.is_empty());
    }
}
