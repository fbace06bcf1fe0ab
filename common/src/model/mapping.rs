//! Field-mapping configuration for templates and mapping profiles.
//!
//! A mapping tells the resolver where a template variable's value should come
//! from. Historically the portal stored this as a plain string per variable,
//! using two magic sentinels alongside ordinary bundle keys; here the three
//! cases are a proper enum, while the serialized form keeps the sentinel
//! strings so stored `mapping_json` stays in the documented shape.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire sentinel for [`VariableSource::Blank`].
pub const LEAVE_BLANK: &str = "__LEAVE_BLANK__";
/// Wire sentinel for [`VariableSource::StaffInput`].
pub const STAFF_INPUT: &str = "__STAFF_INPUT__";

/// Where a mapped variable draws its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSource {
    /// Suppress the field: always fill an empty value, whatever the bundle says.
    Blank,
    /// Always prompt the operator for a value.
    StaffInput,
    /// Read the named key out of the client data bundle.
    BundleKey(String),
}

impl VariableSource {
    pub fn as_wire(&self) -> &str {
        match self {
            VariableSource::Blank => LEAVE_BLANK,
            VariableSource::StaffInput => STAFF_INPUT,
            VariableSource::BundleKey(key) => key,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            LEAVE_BLANK => VariableSource::Blank,
            STAFF_INPUT => VariableSource::StaffInput,
            key => VariableSource::BundleKey(key.to_string()),
        }
    }
}

impl Serialize for VariableSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for VariableSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Err(de::Error::custom("mapping source must not be empty"));
        }
        Ok(VariableSource::from_wire(&raw))
    }
}

/// One variable's mapping: the source plus, for staff-input sources, the
/// label shown when prompting the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source: VariableSource,
    #[serde(
        rename = "staffInputLabel",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub staff_input_label: Option<String>,
}

impl MappingEntry {
    pub fn bundle_key(key: impl Into<String>) -> Self {
        MappingEntry {
            source: VariableSource::BundleKey(key.into()),
            staff_input_label: None,
        }
    }

    pub fn staff_input(label: Option<String>) -> Self {
        MappingEntry {
            source: VariableSource::StaffInput,
            staff_input_label: label,
        }
    }

    pub fn blank() -> Self {
        MappingEntry {
            source: VariableSource::Blank,
            staff_input_label: None,
        }
    }

    /// The label is only meaningful for staff-input sources; drop it anywhere
    /// else so stored mappings stay canonical.
    pub fn normalized(mut self) -> Self {
        if self.source != VariableSource::StaffInput {
            self.staff_input_label = None;
        }
        self
    }
}

/// A template's (or profile's) full mapping configuration: body variables
/// under `fields`, PDF form fields under `pdfFields`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, MappingEntry>,
    #[serde(
        rename = "pdfFields",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub pdf_fields: BTreeMap<String, MappingEntry>,
}

impl FieldMapping {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.pdf_fields.is_empty()
    }

    /// Normalize every entry (see [`MappingEntry::normalized`]).
    pub fn normalized(self) -> Self {
        FieldMapping {
            fields: self
                .fields
                .into_iter()
                .map(|(k, v)| (k, v.normalized()))
                .collect(),
            pdf_fields: self
                .pdf_fields
                .into_iter()
                .map(|(k, v)| (k, v.normalized()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_round_trips_through_wire_sentinels() {
        let json = serde_json::to_string(&VariableSource::Blank).unwrap();
        assert_eq!(json, "\"__LEAVE_BLANK__\"");
        let back: VariableSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, VariableSource::Blank);

        let key: VariableSource = serde_json::from_str("\"decedent_name\"").unwrap();
        assert_eq!(key, VariableSource::BundleKey("decedent_name".into()));
    }

    #[test]
    fn mapping_json_uses_documented_shape() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "judge".to_string(),
            MappingEntry::staff_input(Some("Presiding judge".to_string())),
        );
        let mapping = FieldMapping {
            fields,
            pdf_fields: BTreeMap::new(),
        };
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["fields"]["judge"]["source"], "__STAFF_INPUT__");
        assert_eq!(json["fields"]["judge"]["staffInputLabel"], "Presiding judge");
    }

    #[test]
    fn normalize_clears_stray_labels() {
        let entry = MappingEntry {
            source: VariableSource::BundleKey("county".into()),
            staff_input_label: Some("ignored".into()),
        };
        assert_eq!(entry.normalized().staff_input_label, None);
    }
}
