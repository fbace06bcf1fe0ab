//! Output of the field resolver: one entry per template variable describing
//! the value it will be filled with and where that value came from.

use serde::{Deserialize, Serialize};

/// Which precedence rule produced a variable's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueOrigin {
    /// An explicit mapping entry pointed at a bundle key that had a value.
    Mapping,
    /// The variable name itself matched a bundle key.
    Airtable,
    /// A previously saved staff input supplied the value.
    Saved,
    /// Nothing matched; the value is empty.
    None,
}

/// A variable's resolved status. `needs_input` marks variables the operator
/// must (or may, for pre-filled staff-input prompts) supply before a
/// document can be generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVariable {
    pub variable: String,
    pub value: String,
    #[serde(rename = "source")]
    pub origin: ValueOrigin,
    pub needs_input: bool,
    /// Prompt label for staff-input variables (defaults to the variable name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_input_label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_uses_source_and_needs_input_keys() {
        let resolved = ResolvedVariable {
            variable: "case_number".to_string(),
            value: "2024-P-001".to_string(),
            origin: ValueOrigin::Airtable,
            needs_input: false,
            staff_input_label: None,
        };
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["source"], "airtable");
        assert_eq!(json["needsInput"], false);
        assert!(json.get("staffInputLabel").is_none());
    }
}
