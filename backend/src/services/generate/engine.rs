//! The document generation engine.
//!
//! One call = one template filled for one client. Caller mistakes (unknown
//! ids, a foreign profile, missing staff inputs) are rejected before any
//! file I/O; everything that goes wrong after that point is recorded as a
//! `FAILURE` document record and returned as the result, never raised. A
//! remote-mirror failure after a successful local write degrades to a
//! warning on the `SUCCESS` record.

use crate::config::{safe_join, AppConfig};
use crate::db;
use crate::error::ServiceError;
use crate::services::clients::store as clients;
use crate::services::documents::store as documents;
use crate::services::generate::{naming, render};
use crate::services::generate::remote::{FolderMirror, RemoteStore};
use crate::services::profiles;
use crate::services::resolve::resolver;
use crate::services::templates::store as templates;
use crate::services::templates::{parse, pdf_form};
use chrono::Utc;
use common::model::document::{BatchGenerationItem, GeneratedDocument, GenerationStatus};
use common::model::profile::{MappingProfile, OutputFormat, RepeatSource};
use common::model::template::{Template, TemplateKind};
use common::requests::{GenerateBatchRequest, GenerateRequest};
use log::{info, warn};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub fn generate_document(
    cfg: &AppConfig,
    req: &GenerateRequest,
) -> Result<GeneratedDocument, ServiceError> {
    if req.client_id.is_empty() {
        return Err(ServiceError::Configuration(
            "client_id must not be empty".to_string(),
        ));
    }
    if req.template_id.is_empty() {
        return Err(ServiceError::Configuration(
            "template_id must not be empty".to_string(),
        ));
    }

    let conn = db::open(cfg)?;
    let template = match templates::get(&conn, &req.template_id) {
        Ok(template) => template,
        Err(ServiceError::NotFound(_)) => {
            return Err(ServiceError::Configuration(format!(
                "unknown template '{}'",
                req.template_id
            )))
        }
        Err(err) => return Err(err),
    };
    let profile =
        profiles::select_for_template(&conn, &req.template_id, req.profile_id.as_deref())?;

    let bundle = clients::load_bundle(&conn, &req.client_id)?;
    let saved = clients::load_staff_inputs(&conn, &req.client_id)?;

    let mapping = profile
        .as_ref()
        .map(|p| &p.mapping)
        .unwrap_or(&template.mapping);
    let entries = match template.kind {
        TemplateKind::Docx => &mapping.fields,
        TemplateKind::FillablePdf => &mapping.pdf_fields,
    };

    let resolved =
        resolver::resolve_variables(&template.variable_names(), &bundle, entries, &saved);

    // Operator-supplied values are the most current human decision; they
    // outrank everything the resolver found.
    let mut values: BTreeMap<String, String> = BTreeMap::new();
    let mut unresolved: Vec<String> = Vec::new();
    for item in &resolved {
        let value = req
            .staff_inputs
            .get(&item.variable)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| item.value.clone());
        if item.needs_input && value.is_empty() {
            unresolved.push(item.variable.clone());
        }
        values.insert(item.variable.clone(), value);
    }
    if !unresolved.is_empty() {
        return Err(ServiceError::UnresolvedVariables(unresolved));
    }

    // Remember what the operator typed so the next generation pre-fills it.
    let typed: BTreeMap<String, String> = req
        .staff_inputs
        .iter()
        .filter(|(variable, value)| !value.is_empty() && values.contains_key(*variable))
        .map(|(variable, value)| (variable.clone(), value.clone()))
        .collect();
    if !typed.is_empty() {
        clients::save_staff_inputs(&conn, &req.client_id, &typed)?;
    }

    let client_name = bundle
        .get("client_name")
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| req.client_id.clone());
    let now = Utc::now();
    let base_name = profile
        .as_ref()
        .and_then(|p| p.output_rules.filename_pattern.as_deref())
        .map(|pattern| naming::render_pattern(pattern, &client_name, &template.name, now))
        .unwrap_or_else(|| naming::default_name(&template.name, &client_name, now));

    let outcome = fill_outputs(
        cfg,
        &conn,
        &template,
        profile.as_ref(),
        req,
        &values,
        &base_name,
    );
    let record = match outcome {
        Ok(outputs) => {
            let (remote_paths, remote_warning) =
                mirror_outputs(cfg, profile.as_ref(), req, &outputs, &client_name, &template.name);
            GeneratedDocument {
                id: Uuid::new_v4().to_string(),
                template_id: template.id.clone(),
                client_id: req.client_id.clone(),
                docx_path: outputs.docx.map(path_string),
                pdf_path: outputs.pdf.map(path_string),
                remote_paths,
                status: GenerationStatus::Success,
                error: None,
                remote_warning,
                created_at: now,
            }
        }
        Err(err) => {
            info!(
                "generation failed for template '{}', client '{}': {}",
                template.name, req.client_id, err
            );
            GeneratedDocument {
                id: Uuid::new_v4().to_string(),
                template_id: template.id.clone(),
                client_id: req.client_id.clone(),
                docx_path: None,
                pdf_path: None,
                remote_paths: Vec::new(),
                status: GenerationStatus::Failure,
                error: Some(err.to_string()),
                remote_warning: None,
                created_at: now,
            }
        }
    };
    documents::insert(&conn, &record)?;
    Ok(record)
}

/// Batch generation: per-template isolation. The client and every template
/// id are validated up front (caller input errors reject the whole call);
/// after that each template succeeds or fails on its own.
pub fn generate_batch(
    cfg: &AppConfig,
    req: &GenerateBatchRequest,
) -> Result<Vec<BatchGenerationItem>, ServiceError> {
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
    let conn = db::open(cfg)?;
    for template_id in &req.template_ids {
        if templates::get(&conn, template_id).is_err() {
            return Err(ServiceError::Configuration(format!(
                "unknown template '{}'",
                template_id
            )));
        }
    }
    drop(conn);

    let mut items = Vec::with_capacity(req.template_ids.len());
    for template_id in &req.template_ids {
        // Profiles are single-template, so batch runs on each template's
        // default mapping.
        let single = GenerateRequest {
            client_id: req.client_id.clone(),
            template_id: template_id.clone(),
            profile_id: None,
            staff_inputs: req.staff_inputs.clone(),
            formats: None,
            save_to_remote: req.save_to_remote,
        };
        let item = match generate_document(cfg, &single) {
            Ok(record) => BatchGenerationItem {
                template_id: template_id.clone(),
                record: Some(record),
                error: None,
            },
            Err(err) => BatchGenerationItem {
                template_id: template_id.clone(),
                record: None,
                error: Some(err.to_string()),
            },
        };
        items.push(item);
    }
    Ok(items)
}

struct Outputs {
    docx: Option<PathBuf>,
    pdf: Option<PathBuf>,
}

impl Outputs {
    fn paths(&self) -> Vec<&PathBuf> {
        self.docx.iter().chain(self.pdf.iter()).collect()
    }
}

/// Fills the template and writes the requested outputs. Any error cleans up
/// partial files first, so a failed attempt never leaves stray output.
fn fill_outputs(
    cfg: &AppConfig,
    conn: &Connection,
    template: &Template,
    profile: Option<&MappingProfile>,
    req: &GenerateRequest,
    values: &BTreeMap<String, String>,
    base_name: &str,
) -> Result<Outputs, ServiceError> {
    let mut outputs = Outputs {
        docx: None,
        pdf: None,
    };
    let result = write_outputs(cfg, conn, template, profile, req, values, base_name, &mut outputs);
    if let Err(err) = result {
        for path in outputs.paths() {
            let _ = fs::remove_file(path);
        }
        return Err(err);
    }
    Ok(outputs)
}

#[allow(clippy::too_many_arguments)]
fn write_outputs(
    cfg: &AppConfig,
    conn: &Connection,
    template: &Template,
    profile: Option<&MappingProfile>,
    req: &GenerateRequest,
    values: &BTreeMap<String, String>,
    base_name: &str,
    outputs: &mut Outputs,
) -> Result<(), ServiceError> {
    match template.kind {
        TemplateKind::Docx => {
            let text = fs::read_to_string(&template.file_path).map_err(|e| {
                ServiceError::Generation(format!("cannot read template file: {}", e))
            })?;
            let block_rows = load_repeat_rows(conn, template, profile, &req.client_id)?;
            let filled = parse::fill_body(&text, values, &block_rows)?;

            let formats = requested_formats(profile, req);
            if formats.contains(&OutputFormat::Docx) {
                let path = output_path(cfg, base_name, OutputFormat::Docx)?;
                fs::write(&path, &filled).map_err(|e| {
                    ServiceError::Generation(format!("cannot write output: {}", e))
                })?;
                outputs.docx = Some(path);
            }
            if formats.contains(&OutputFormat::Pdf) {
                let path = output_path(cfg, base_name, OutputFormat::Pdf)?;
                render::render_body_pdf(
                    &cfg.fonts_dir,
                    &filled,
                    template.letterhead_png.as_deref(),
                    &path,
                )?;
                outputs.pdf = Some(path);
            }
        }
        TemplateKind::FillablePdf => {
            let path = output_path(cfg, base_name, OutputFormat::Pdf)?;
            pdf_form::fill_fields(Path::new(&template.file_path), &path, values)?;
            outputs.pdf = Some(path);
        }
    }
    Ok(())
}

/// Explicit request formats win, then the profile's output rules; a body
/// template with neither produces the filled body document only.
fn requested_formats(profile: Option<&MappingProfile>, req: &GenerateRequest) -> Vec<OutputFormat> {
    if let Some(formats) = &req.formats {
        if !formats.is_empty() {
            return formats.clone();
        }
    }
    if let Some(profile) = profile {
        if !profile.output_rules.formats.is_empty() {
            return profile.output_rules.formats.clone();
        }
    }
    vec![OutputFormat::Docx]
}

/// Rows for every repeat block the template declares. The profile's repeat
/// rules pick the collection; a block named exactly like one of the four
/// collections defaults to it.
fn load_repeat_rows(
    conn: &Connection,
    template: &Template,
    profile: Option<&MappingProfile>,
    client_id: &str,
) -> Result<BTreeMap<String, parse::RepeatRows>, ServiceError> {
    let mut block_rows = BTreeMap::new();
    for block in &template.repeat_blocks {
        let source = profile
            .and_then(|p| p.repeat_rules.get(&block.name))
            .map(|rule| rule.source)
            .or_else(|| implicit_source(&block.name))
            .ok_or_else(|| {
                ServiceError::Generation(format!(
                    "no repeat source configured for block '{}'",
                    block.name
                ))
            })?;
        let rows = clients::load_collection(conn, client_id, source)?;
        block_rows.insert(block.name.clone(), rows);
    }
    Ok(block_rows)
}

fn implicit_source(block_name: &str) -> Option<RepeatSource> {
    match block_name {
        "assets_debts" => Some(RepeatSource::AssetsDebts),
        "case_contacts" => Some(RepeatSource::CaseContacts),
        "beneficiaries" => Some(RepeatSource::Beneficiaries),
        "dates_deadlines" => Some(RepeatSource::DatesDeadlines),
        _ => None,
    }
}

fn output_path(
    cfg: &AppConfig,
    base_name: &str,
    format: OutputFormat,
) -> Result<PathBuf, ServiceError> {
    let file_name = format!("{}.{}", base_name, format.extension());
    safe_join(&cfg.output_dir(), &file_name)
        .ok_or_else(|| ServiceError::Generation(format!("bad output name '{}'", file_name)))
}

/// Mirrors the outputs when asked to. Never fails the generation: trouble
/// becomes the record's `remote_warning`.
fn mirror_outputs(
    cfg: &AppConfig,
    profile: Option<&MappingProfile>,
    req: &GenerateRequest,
    outputs: &Outputs,
    client_name: &str,
    template_name: &str,
) -> (Vec<String>, Option<String>) {
    let rules = profile.map(|p| &p.remote_rules);
    let enabled = req.save_to_remote || rules.map(|r| r.enabled).unwrap_or(false);
    if !enabled {
        return (Vec::new(), None);
    }
    let folder_pattern = rules
        .and_then(|r| r.folder_pattern.as_deref())
        .unwrap_or("{client}");
    let folder = naming::render_pattern(folder_pattern, client_name, template_name, Utc::now());

    let mirror = FolderMirror::new(cfg.remote_dir());
    let mut remote_paths = Vec::new();
    for path in outputs.paths() {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        match mirror.store(path, &folder, &file_name) {
            Ok(stored) => remote_paths.push(stored),
            Err(err) => {
                warn!("remote mirror failed for {}: {}", file_name, err);
                return (remote_paths, Some(err.to_string()));
            }
        }
    }
    (remote_paths, None)
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}
