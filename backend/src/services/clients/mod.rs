//! # Client Data
//!
//! The service-side view of the firm's case store: flattened per-client
//! bundles (served through the TTL cache), the list-valued collections that
//! feed repeat blocks, per-client staff inputs, and the CSV snapshot import
//! that keeps it all current. Routes live under `/api/clients`.

pub mod cache;
pub mod import;
pub mod store;

use crate::config::AppConfig;
use crate::db;
use crate::error::ServiceError;
use actix_web::web::{self, get, post, put, scope};
use actix_web::{HttpResponse, Scope};
use cache::BundleCache;
use common::model::profile::RepeatSource;
use common::requests::{ReplaceCollectionRequest, SaveStaffInputsRequest};

const API_PATH: &str = "/api/clients";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/import", post().to(import::process))
        .route("/{client_id}/bundle", get().to(get_bundle))
        .route("/{client_id}/bundle/refresh", post().to(refresh_bundle))
        .route("/{client_id}/staff_inputs", get().to(get_staff_inputs))
        .route("/{client_id}/staff_inputs", put().to(put_staff_inputs))
        .route("/{client_id}/collections", put().to(put_collection))
        .route(
            "/{client_id}/collections/{source}",
            get().to(get_collection),
        )
}

async fn get_bundle(
    cfg: web::Data<AppConfig>,
    cache: web::Data<BundleCache>,
    client_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let bundle = cache.get(&cfg, &client_id).await?;
    Ok(HttpResponse::Ok().json(bundle))
}

async fn refresh_bundle(
    cfg: web::Data<AppConfig>,
    cache: web::Data<BundleCache>,
    client_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let bundle = cache.refresh(&cfg, &client_id).await?;
    Ok(HttpResponse::Ok().json(bundle))
}

async fn get_staff_inputs(
    cfg: web::Data<AppConfig>,
    client_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let inputs = store::load_staff_inputs(&conn, &client_id)?;
    Ok(HttpResponse::Ok().json(inputs))
}

async fn put_staff_inputs(
    cfg: web::Data<AppConfig>,
    client_id: web::Path<String>,
    payload: web::Json<SaveStaffInputsRequest>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    store::save_staff_inputs(&conn, &client_id, &payload.inputs)?;
    Ok(HttpResponse::Ok().finish())
}

async fn put_collection(
    cfg: web::Data<AppConfig>,
    client_id: web::Path<String>,
    payload: web::Json<ReplaceCollectionRequest>,
) -> Result<HttpResponse, ServiceError> {
    let req = payload.into_inner();
    let conn = db::open(&cfg)?;
    store::replace_collection(&conn, &client_id, req.source, &req.rows)?;
    Ok(HttpResponse::Ok().finish())
}

async fn get_collection(
    cfg: web::Data<AppConfig>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let (client_id, source_raw) = path.into_inner();
    let source: RepeatSource =
        serde_json::from_value(serde_json::Value::String(source_raw.clone())).map_err(|_| {
            ServiceError::Configuration(format!("unknown collection '{}'", source_raw))
        })?;
    let conn = db::open(&cfg)?;
    let rows = store::load_collection(&conn, &client_id, source)?;
    Ok(HttpResponse::Ok().json(rows))
}
