//! Structured document preview for the review screen: paragraphs for body
//! documents, per-page text for PDFs.

use crate::config::AppConfig;
use crate::db;
use crate::error::ServiceError;
use crate::services::documents::store as documents;
use crate::services::templates::pdf_form;
use actix_web::{web, HttpResponse};
use common::model::preview::DocumentPreview;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

use super::store;

pub(crate) async fn process(
    cfg: web::Data<AppConfig>,
    approval_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let approval_id = approval_id.into_inner();
    let preview = web::block(move || {
        let conn = db::open(&cfg)?;
        build_preview(&conn, &approval_id)
    })
    .await??;
    Ok(HttpResponse::Ok().json(preview))
}

pub fn build_preview(
    conn: &Connection,
    approval_id: &str,
) -> Result<DocumentPreview, ServiceError> {
    let approval = store::get(conn, approval_id)?;
    let doc = documents::get(conn, &approval.doc_id)?;
    if let Some(path) = &doc.docx_path {
        let text = fs::read_to_string(path)
            .map_err(|_| ServiceError::NotFound("document output"))?;
        return Ok(DocumentPreview::Docx {
            paragraphs: text.lines().map(|line| line.to_string()).collect(),
        });
    }
    if let Some(path) = &doc.pdf_path {
        return Ok(DocumentPreview::Pdf {
            pages: pdf_form::page_text(Path::new(path))?,
        });
    }
    Err(ServiceError::NotFound("document output"))
}
