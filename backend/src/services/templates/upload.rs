//! Template upload: multipart `json` metadata part plus the `file` part.
//!
//! Detection happens here, once: the file is sniffed (PDF magic means a
//! fillable PDF, anything else is treated as a UTF-8 body template), its
//! variables or form fields are extracted, and the file plus its template
//! row are persisted. A file that fails detection stores nothing.

use crate::config::{safe_join, AppConfig};
use crate::error::ServiceError;
use crate::services::templates::{parse, pdf_form, store};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::model::mapping::FieldMapping;
use common::model::template::{Template, TemplateKind};
use common::requests::TemplateUploadMeta;
use futures_util::StreamExt;
use md5::Context;
use serde_json::from_slice;
use std::fs;
use uuid::Uuid;

pub(crate) async fn process(
    cfg: web::Data<AppConfig>,
    payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let (meta, bytes, checksum) = read_parts(payload).await?;
    let template =
        web::block(move || upload_template(&cfg, meta, &bytes, &checksum)).await??;
    Ok(HttpResponse::Ok().json(template))
}

/// Drains the multipart stream: the `json` part carries the metadata, the
/// `file` part the template bytes (hashed while streaming, as the CSV import
/// does).
async fn read_parts(
    mut payload: Multipart,
) -> Result<(TemplateUploadMeta, Vec<u8>, String), ServiceError> {
    let mut meta: Option<TemplateUploadMeta> = None;
    let mut bytes: Vec<u8> = Vec::new();
    let mut hasher = Context::new();
    let mut file_seen = false;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ServiceError::Configuration(format!("bad multipart: {}", e)))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match name.as_deref() {
            Some("json") => {
                let mut buf = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk
                        .map_err(|e| ServiceError::Configuration(format!("bad upload: {}", e)))?;
                    buf.extend_from_slice(&chunk);
                }
                meta = Some(from_slice(&buf)?);
            }
            Some("file") => {
                file_seen = true;
                while let Some(chunk) = field.next().await {
                    let chunk = chunk
                        .map_err(|e| ServiceError::Configuration(format!("bad upload: {}", e)))?;
                    hasher.consume(&chunk);
                    bytes.extend_from_slice(&chunk);
                }
            }
            _ => {}
        }
    }

    let meta = meta
        .ok_or_else(|| ServiceError::Configuration("missing 'json' metadata part".to_string()))?;
    if !file_seen || bytes.is_empty() {
        return Err(ServiceError::Configuration(
            "missing 'file' part".to_string(),
        ));
    }
    if meta.name.trim().is_empty() {
        return Err(ServiceError::Configuration(
            "template name must not be empty".to_string(),
        ));
    }
    Ok((meta, bytes, format!("{:x}", hasher.finalize())))
}

/// Detection plus persistence, on the blocking pool. Public for the
/// integration tests, which seed templates without going through HTTP.
pub fn upload_template(
    cfg: &AppConfig,
    meta: TemplateUploadMeta,
    bytes: &[u8],
    checksum: &str,
) -> Result<Template, ServiceError> {
    let id = Uuid::new_v4().to_string();
    let kind = if pdf_form::is_pdf(bytes) {
        TemplateKind::FillablePdf
    } else {
        TemplateKind::Docx
    };

    let file_name = match kind {
        TemplateKind::Docx => format!("{}.txt", id),
        TemplateKind::FillablePdf => format!("{}.pdf", id),
    };
    let file_path = safe_join(&cfg.templates_dir(), &file_name)
        .ok_or_else(|| ServiceError::Configuration("bad template file name".to_string()))?;
    fs::write(&file_path, bytes)?;

    let detected = match kind {
        TemplateKind::Docx => {
            let text = std::str::from_utf8(bytes).map_err(|_| {
                ServiceError::Configuration("body template is not valid UTF-8".to_string())
            })?;
            parse::parse_body(text).map(|parsed| (parsed.variables, Vec::new(), parsed.repeat_blocks))
        }
        TemplateKind::FillablePdf => {
            pdf_form::detect_fields(&file_path).map(|fields| (Vec::new(), fields, Vec::new()))
        }
    };
    let (variables, pdf_fields, repeat_blocks) = match detected {
        Ok(parts) => parts,
        Err(err) => {
            // Nothing is stored for a template that fails detection.
            let _ = fs::remove_file(&file_path);
            return Err(err);
        }
    };

    let now = Utc::now();
    let template = Template {
        id,
        name: meta.name.trim().to_string(),
        kind,
        county: meta.county,
        case_type: meta.case_type,
        category: meta.category,
        variables,
        pdf_fields,
        repeat_blocks,
        mapping: FieldMapping::default(),
        file_path: file_path.to_string_lossy().into_owned(),
        checksum: checksum.to_string(),
        letterhead_png: None,
        created_at: now,
        updated_at: now,
    };

    let conn = crate::db::open(cfg)?;
    if let Err(err) = store::insert(&conn, &template) {
        let _ = fs::remove_file(&file_path);
        return Err(err);
    }
    Ok(template)
}
