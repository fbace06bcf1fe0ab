//! # Variable Resolution
//!
//! `POST /api/resolve` — the batch form of the resolver: the union of
//! variables across the selected templates, each resolved exactly once. The
//! UI calls this to show the mapped / needs-input / blank status column
//! before the operator commits to generating anything.

pub mod resolver;

use crate::config::AppConfig;
use crate::db;
use crate::error::ServiceError;
use crate::services::clients::cache::BundleCache;
use crate::services::clients::store as clients;
use crate::services::profiles;
use crate::services::templates::store as templates;
use actix_web::web::{self, post, scope};
use actix_web::{HttpResponse, Scope};
use common::model::mapping::{FieldMapping, MappingEntry};
use common::model::resolution::ResolvedVariable;
use common::model::template::{Template, TemplateKind};
use common::requests::ResolveRequest;
use std::collections::BTreeMap;

const API_PATH: &str = "/api/resolve";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("", post().to(process))
}

pub(crate) async fn process(
    cfg: web::Data<AppConfig>,
    cache: web::Data<BundleCache>,
    payload: web::Json<ResolveRequest>,
) -> Result<HttpResponse, ServiceError> {
    let req = payload.into_inner();
    if req.client_id.is_empty() {
        return Err(ServiceError::Configuration(
            "client_id must not be empty".to_string(),
        ));
    }
    if req.template_ids.is_empty() {
        return Err(ServiceError::Configuration(
            "select at least one template".to_string(),
        ));
    }

    let bundle = cache.get(&cfg, &req.client_id).await?;
    let conn = db::open(&cfg)?;
    let saved = clients::load_staff_inputs(&conn, &req.client_id)?;

    // A supplied profile must belong to one of the selected templates; it
    // overrides that template's default, the rest keep theirs.
    let profile = match req.profile_id.as_deref().filter(|id| !id.is_empty()) {
        Some(profile_id) => {
            let profile = match profiles::get_profile(&conn, profile_id) {
                Ok(profile) => profile,
                Err(ServiceError::NotFound(_)) => {
                    return Err(ServiceError::Configuration(format!(
                        "unknown mapping profile '{}'",
                        profile_id
                    )))
                }
                Err(err) => return Err(err),
            };
            if !req.template_ids.contains(&profile.template_id) {
                return Err(ServiceError::Configuration(format!(
                    "mapping profile '{}' does not belong to any selected template",
                    profile.name
                )));
            }
            Some(profile)
        }
        None => None,
    };

    let mut selected = Vec::with_capacity(req.template_ids.len());
    for template_id in &req.template_ids {
        let template = match templates::get(&conn, template_id) {
            Ok(template) => template,
            Err(ServiceError::NotFound(_)) => {
                return Err(ServiceError::Configuration(format!(
                    "unknown template '{}'",
                    template_id
                )))
            }
            Err(err) => return Err(err),
        };
        let mapping = match &profile {
            Some(profile) if &profile.template_id == template_id => profile.mapping.clone(),
            _ => template.mapping.clone(),
        };
        selected.push((template, mapping));
    }

    let resolved = resolve_union(&selected, &bundle, &saved);
    Ok(HttpResponse::Ok().json(resolved))
}

/// Union of variables in template order; a variable shared between templates
/// resolves once, under the first owning template's mapping.
pub fn resolve_union(
    selected: &[(Template, FieldMapping)],
    bundle: &BTreeMap<String, String>,
    saved: &BTreeMap<String, String>,
) -> Vec<ResolvedVariable> {
    let mut ordered: Vec<String> = Vec::new();
    let mut mapping: BTreeMap<String, MappingEntry> = BTreeMap::new();
    for (template, template_mapping) in selected {
        let entries = match template.kind {
            TemplateKind::Docx => &template_mapping.fields,
            TemplateKind::FillablePdf => &template_mapping.pdf_fields,
        };
        for variable in template.variable_names() {
            if ordered.iter().any(|v| v == &variable) {
                continue;
            }
            if let Some(entry) = entries.get(&variable) {
                mapping.insert(variable.clone(), entry.clone());
            }
            ordered.push(variable);
        }
    }
    resolver::resolve_variables(&ordered, bundle, &mapping, saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::model::mapping::VariableSource;
    use common::model::resolution::ValueOrigin;

    fn template(id: &str, variables: &[&str], mapping: FieldMapping) -> Template {
        let now = Utc::now();
        Template {
            id: id.to_string(),
            name: id.to_string(),
            kind: TemplateKind::Docx,
            county: None,
            case_type: None,
            category: None,
            variables: variables.iter().map(|v| v.to_string()).collect(),
            pdf_fields: Vec::new(),
            repeat_blocks: Vec::new(),
            mapping,
            file_path: String::new(),
            checksum: String::new(),
            letterhead_png: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn duplicate_variables_resolve_under_the_first_owner() {
        let mut first = FieldMapping::default();
        first.fields.insert(
            "county".to_string(),
            MappingEntry {
                source: VariableSource::BundleKey("venue_county".to_string()),
                staff_input_label: None,
            },
        );
        let second = FieldMapping::default();

        let selected = vec![
            (template("a", &["county", "judge"], first.clone()), first),
            (template("b", &["county", "client_name"], second.clone()), second),
        ];
        let mut bundle = BTreeMap::new();
        bundle.insert("venue_county".to_string(), "Cook".to_string());
        bundle.insert("county".to_string(), "Lake".to_string());
        bundle.insert("client_name".to_string(), "Jane".to_string());

        let out = resolve_union(&selected, &bundle, &BTreeMap::new());
        let names: Vec<&str> = out.iter().map(|r| r.variable.as_str()).collect();
        assert_eq!(names, vec!["county", "judge", "client_name"]);
        // First owner's mapping applies, so `county` comes from the mapping.
        assert_eq!(out[0].value, "Cook");
        assert_eq!(out[0].origin, ValueOrigin::Mapping);
    }
}
