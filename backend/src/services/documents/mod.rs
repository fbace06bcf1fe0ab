//! # Generated Documents
//!
//! Read side of the generation pipeline: the record itself and the output
//! file download. Routes live under `/api/documents`.

pub mod store;

use crate::config::AppConfig;
use crate::db;
use crate::error::ServiceError;
use actix_files::NamedFile;
use actix_web::web::{self, get, scope};
use actix_web::{HttpRequest, HttpResponse, Scope};
use serde::Deserialize;

const API_PATH: &str = "/api/documents";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/{doc_id}", get().to(get_record))
        .route("/{doc_id}/download", get().to(download))
}

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    /// `docx` or `pdf`; defaults to whichever output exists, docx first.
    format: Option<String>,
}

async fn get_record(
    cfg: web::Data<AppConfig>,
    doc_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let doc = store::get(&conn, &doc_id)?;
    Ok(HttpResponse::Ok().json(doc))
}

async fn download(
    req: HttpRequest,
    cfg: web::Data<AppConfig>,
    doc_id: web::Path<String>,
    query: web::Query<DownloadQuery>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let doc = store::get(&conn, &doc_id)?;
    let path = match query.format.as_deref() {
        Some("docx") => doc.docx_path,
        Some("pdf") => doc.pdf_path,
        Some(other) => {
            return Err(ServiceError::Configuration(format!(
                "unknown format '{}'",
                other
            )))
        }
        None => doc.docx_path.or(doc.pdf_path),
    };
    let path = path.ok_or(ServiceError::NotFound("document output"))?;
    let file = NamedFile::open(&path).map_err(|_| ServiceError::NotFound("document output"))?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(file.set_content_type(mime).into_response(&req))
}
