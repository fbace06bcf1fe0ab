//! The field resolver: decides, for every template variable, what value it
//! will be filled with and where that value came from. Pure — the three
//! inputs are read-only maps and the output is deterministic, so resolving
//! the same inputs twice yields the same answer.
//!
//! Precedence, first match wins:
//! 1. explicit mapping to a bundle key with a non-empty bundle value,
//! 2. the variable name itself hitting a bundle key,
//! 3. a saved staff input,
//! 4. nothing — empty value, flagged for operator input.
//!
//! A `Blank` mapping suppresses the field outright; a `StaffInput` mapping
//! always prompts, pre-filled from the saved store when possible.

use common::model::mapping::{MappingEntry, VariableSource};
use common::model::resolution::{ResolvedVariable, ValueOrigin};
use std::collections::BTreeMap;

pub fn resolve_variables(
    variables: &[String],
    bundle: &BTreeMap<String, String>,
    mapping: &BTreeMap<String, MappingEntry>,
    saved_inputs: &BTreeMap<String, String>,
) -> Vec<ResolvedVariable> {
    variables
        .iter()
        .map(|variable| resolve_one(variable, bundle, mapping.get(variable), saved_inputs))
        .collect()
}

fn resolve_one(
    variable: &str,
    bundle: &BTreeMap<String, String>,
    entry: Option<&MappingEntry>,
    saved_inputs: &BTreeMap<String, String>,
) -> ResolvedVariable {
    match entry.map(|e| &e.source) {
        Some(VariableSource::Blank) => ResolvedVariable {
            variable: variable.to_string(),
            value: String::new(),
            origin: ValueOrigin::Mapping,
            needs_input: false,
            staff_input_label: None,
        },
        Some(VariableSource::StaffInput) => {
            let label = entry
                .and_then(|e| e.staff_input_label.clone())
                .unwrap_or_else(|| variable.to_string());
            // Pre-fill the prompt from the saved store; the flag stays set
            // either way so the operator confirms the value.
            let saved = saved_inputs.get(variable).filter(|v| !v.is_empty());
            ResolvedVariable {
                variable: variable.to_string(),
                value: saved.cloned().unwrap_or_default(),
                origin: if saved.is_some() {
                    ValueOrigin::Saved
                } else {
                    ValueOrigin::None
                },
                needs_input: true,
                staff_input_label: Some(label),
            }
        }
        Some(VariableSource::BundleKey(key)) => {
            if let Some(value) = bundle.get(key).filter(|v| !v.is_empty()) {
                return ResolvedVariable {
                    variable: variable.to_string(),
                    value: value.clone(),
                    origin: ValueOrigin::Mapping,
                    needs_input: false,
                    staff_input_label: None,
                };
            }
            // The mapped key had nothing; fall through the remaining rules.
            fallback(variable, bundle, saved_inputs)
        }
        None => fallback(variable, bundle, saved_inputs),
    }
}

/// Rules 2-4: direct bundle hit, then saved input, then unresolved.
fn fallback(
    variable: &str,
    bundle: &BTreeMap<String, String>,
    saved_inputs: &BTreeMap<String, String>,
) -> ResolvedVariable {
    if let Some(value) = bundle.get(variable).filter(|v| !v.is_empty()) {
        return ResolvedVariable {
            variable: variable.to_string(),
            value: value.clone(),
            origin: ValueOrigin::Airtable,
            needs_input: false,
            staff_input_label: None,
        };
    }
    if let Some(value) = saved_inputs.get(variable).filter(|v| !v.is_empty()) {
        return ResolvedVariable {
            variable: variable.to_string(),
            value: value.clone(),
            origin: ValueOrigin::Saved,
            needs_input: false,
            staff_input_label: None,
        };
    }
    ResolvedVariable {
        variable: variable.to_string(),
        value: String::new(),
        origin: ValueOrigin::None,
        needs_input: true,
        staff_input_label: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn explicit_mapping_outranks_a_direct_bundle_hit() {
        // `county` exists in the bundle under its own name AND is mapped to
        // another key; the mapping must win and tag the value `mapping`.
        let bundle = map(&[("county", "Lake"), ("venue_county", "Cook")]);
        let mut mapping = BTreeMap::new();
        mapping.insert("county".to_string(), MappingEntry::bundle_key("venue_county"));

        let out = resolve_variables(&vars(&["county"]), &bundle, &mapping, &BTreeMap::new());
        assert_eq!(out[0].value, "Cook");
        assert_eq!(out[0].origin, ValueOrigin::Mapping);
        assert!(!out[0].needs_input);
    }

    #[test]
    fn empty_mapped_value_falls_through_to_the_direct_hit() {
        let bundle = map(&[("county", "Lake"), ("venue_county", "")]);
        let mut mapping = BTreeMap::new();
        mapping.insert("county".to_string(), MappingEntry::bundle_key("venue_county"));

        let out = resolve_variables(&vars(&["county"]), &bundle, &mapping, &BTreeMap::new());
        assert_eq!(out[0].value, "Lake");
        assert_eq!(out[0].origin, ValueOrigin::Airtable);
    }

    #[test]
    fn blank_mapping_suppresses_whatever_the_bundle_says() {
        let bundle = map(&[("county", "Cook")]);
        let saved = map(&[("county", "Lake")]);
        let mut mapping = BTreeMap::new();
        mapping.insert("county".to_string(), MappingEntry::blank());

        let out = resolve_variables(&vars(&["county"]), &bundle, &mapping, &saved);
        assert_eq!(out[0].value, "");
        assert_eq!(out[0].origin, ValueOrigin::Mapping);
        assert!(!out[0].needs_input);
    }

    #[test]
    fn staff_input_mapping_always_prompts_and_carries_the_label() {
        let bundle = map(&[("judge", "Hon. Bundle")]);
        let mut mapping = BTreeMap::new();
        mapping.insert(
            "judge".to_string(),
            MappingEntry::staff_input(Some("Presiding judge".to_string())),
        );

        let out = resolve_variables(&vars(&["judge"]), &bundle, &mapping, &BTreeMap::new());
        assert!(out[0].needs_input);
        assert_eq!(out[0].value, "");
        assert_eq!(out[0].origin, ValueOrigin::None);
        assert_eq!(out[0].staff_input_label.as_deref(), Some("Presiding judge"));
    }

    #[test]
    fn staff_input_prompt_prefills_from_the_saved_store() {
        let mut mapping = BTreeMap::new();
        mapping.insert("judge".to_string(), MappingEntry::staff_input(None));
        let saved = map(&[("judge", "Hon. Smith")]);

        let out = resolve_variables(&vars(&["judge"]), &BTreeMap::new(), &mapping, &saved);
        assert!(out[0].needs_input);
        assert_eq!(out[0].value, "Hon. Smith");
        assert_eq!(out[0].origin, ValueOrigin::Saved);
        assert_eq!(out[0].staff_input_label.as_deref(), Some("judge"));
    }

    #[test]
    fn saved_input_is_used_when_bundle_has_nothing() {
        let saved = map(&[("judge", "Hon. Smith")]);
        let out =
            resolve_variables(&vars(&["judge"]), &BTreeMap::new(), &BTreeMap::new(), &saved);
        assert_eq!(out[0].value, "Hon. Smith");
        assert_eq!(out[0].origin, ValueOrigin::Saved);
        assert!(!out[0].needs_input);
    }

    #[test]
    fn needs_input_iff_nothing_resolved_or_explicitly_prompted() {
        let bundle = map(&[("client_name", "Jane Doe"), ("case_number", "2024-P-001")]);
        let mut mapping = BTreeMap::new();
        mapping.insert("judge".to_string(), MappingEntry::staff_input(None));

        let out = resolve_variables(
            &vars(&["client_name", "case_number", "judge", "county"]),
            &bundle,
            &mapping,
            &BTreeMap::new(),
        );
        let flags: Vec<bool> = out.iter().map(|r| r.needs_input).collect();
        assert_eq!(flags, vec![false, false, true, true]);
    }

    #[test]
    fn petition_scenario_three_variables() {
        let bundle = map(&[("client_name", "Jane Doe"), ("case_number", "2024-P-001")]);
        let mut mapping = BTreeMap::new();
        mapping.insert("judge".to_string(), MappingEntry::staff_input(None));

        let out = resolve_variables(
            &vars(&["client_name", "case_number", "judge"]),
            &bundle,
            &mapping,
            &BTreeMap::new(),
        );
        assert_eq!(out[0].value, "Jane Doe");
        assert_eq!(out[0].origin, ValueOrigin::Airtable);
        assert_eq!(out[1].value, "2024-P-001");
        assert_eq!(out[1].origin, ValueOrigin::Airtable);
        assert_eq!(out[2].value, "");
        assert!(out[2].needs_input);
    }

    #[test]
    fn resolution_is_idempotent() {
        let bundle = map(&[("client_name", "Jane Doe")]);
        let saved = map(&[("judge", "Hon. Smith")]);
        let mut mapping = BTreeMap::new();
        mapping.insert("county".to_string(), MappingEntry::blank());

        let variables = vars(&["client_name", "judge", "county", "missing"]);
        let first = resolve_variables(&variables, &bundle, &mapping, &saved);
        let second = resolve_variables(&variables, &bundle, &mapping, &saved);
        assert_eq!(first, second);
    }

    #[test]
    fn stale_mapping_entries_are_inert() {
        // The mapping still names a variable the template no longer has;
        // resolution only walks the template's variable list, so the stale
        // entry changes nothing.
        let bundle = map(&[("client_name", "Jane Doe")]);
        let mut mapping = BTreeMap::new();
        mapping.insert("gone_variable".to_string(), MappingEntry::bundle_key("client_name"));

        let out = resolve_variables(&vars(&["client_name"]), &bundle, &mapping, &BTreeMap::new());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].origin, ValueOrigin::Airtable);
    }
}
