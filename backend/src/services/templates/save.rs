//! Mapping-panel saves: the template's default mapping and its letterhead.

use crate::config::AppConfig;
use crate::db;
use crate::error::ServiceError;
use crate::services::templates::store;
use actix_web::{web, HttpResponse};
use common::requests::{SaveLetterheadRequest, SaveMappingRequest};

/// Replaces the template's default mapping. Entries keyed by variables the
/// template no longer declares are kept as-is; resolution ignores them, so a
/// re-uploaded template never invalidates a saved panel.
pub(crate) async fn process(
    cfg: web::Data<AppConfig>,
    template_id: web::Path<String>,
    payload: web::Json<SaveMappingRequest>,
) -> Result<HttpResponse, ServiceError> {
    let mapping = payload.into_inner().mapping.normalized();
    let conn = db::open(&cfg)?;
    store::save_mapping(&conn, &template_id, &serde_json::to_string(&mapping)?)?;
    Ok(HttpResponse::Ok().finish())
}

pub(crate) async fn letterhead(
    cfg: web::Data<AppConfig>,
    template_id: web::Path<String>,
    payload: web::Json<SaveLetterheadRequest>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    store::save_letterhead(&conn, &template_id, payload.letterhead_png.as_deref())?;
    Ok(HttpResponse::Ok().finish())
}
