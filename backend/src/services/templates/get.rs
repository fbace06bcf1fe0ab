//! Template retrieval, listing and deletion.

use crate::config::AppConfig;
use crate::db;
use crate::error::ServiceError;
use crate::services::templates::store;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct ListFilters {
    pub county: Option<String>,
    pub case_type: Option<String>,
    pub category: Option<String>,
}

pub(crate) async fn process(
    cfg: web::Data<AppConfig>,
    template_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let template = store::get(&conn, &template_id)?;
    Ok(HttpResponse::Ok().json(template))
}

pub(crate) async fn list(
    cfg: web::Data<AppConfig>,
    filters: web::Query<ListFilters>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let templates = store::list(
        &conn,
        filters.county.as_deref(),
        filters.case_type.as_deref(),
        filters.category.as_deref(),
    )?;
    Ok(HttpResponse::Ok().json(templates))
}

pub(crate) async fn delete(
    cfg: web::Data<AppConfig>,
    template_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let file_path = store::delete(&conn, &template_id)?;
    // The row is authoritative; a missing file is not worth failing over.
    let _ = fs::remove_file(file_path);
    Ok(HttpResponse::Ok().finish())
}
