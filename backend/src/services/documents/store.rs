//! Generated-document records: written exactly once per generation attempt,
//! never updated afterwards.

use crate::error::ServiceError;
use crate::services::templates::store::parse_ts;
use common::model::document::{GeneratedDocument, GenerationStatus};
use rusqlite::{params, Connection, Row};

pub fn insert(conn: &Connection, doc: &GeneratedDocument) -> Result<(), ServiceError> {
    conn.execute(
        "INSERT INTO generated_documents (id, template_id, client_id, docx_path, pdf_path, \
         remote_paths_json, status, error, remote_warning, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            doc.id,
            doc.template_id,
            doc.client_id,
            doc.docx_path,
            doc.pdf_path,
            serde_json::to_string(&doc.remote_paths)?,
            doc.status.as_str(),
            doc.error,
            doc.remote_warning,
            doc.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, doc_id: &str) -> Result<GeneratedDocument, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, template_id, client_id, docx_path, pdf_path, remote_paths_json, status, \
         error, remote_warning, created_at FROM generated_documents WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map(params![doc_id], |row| Ok(build(row)))?;
    match rows.next() {
        Some(row) => row?,
        None => Err(ServiceError::NotFound("generated document")),
    }
}

fn build(row: &Row<'_>) -> Result<GeneratedDocument, ServiceError> {
    let status_raw: String = row.get(6)?;
    let status = match status_raw.as_str() {
        "SUCCESS" => GenerationStatus::Success,
        _ => GenerationStatus::Failure,
    };
    Ok(GeneratedDocument {
        id: row.get(0)?,
        template_id: row.get(1)?,
        client_id: row.get(2)?,
        docx_path: row.get(3)?,
        pdf_path: row.get(4)?,
        remote_paths: serde_json::from_str(&row.get::<_, String>(5)?)?,
        status,
        error: row.get(7)?,
        remote_warning: row.get(8)?,
        created_at: parse_ts(&row.get::<_, String>(9)?)?,
    })
}
