//! # Document Generation
//!
//! `POST /api/generate` fills one template for one client;
//! `POST /api/generate/batch` runs several templates independently for the
//! same client. Filling is blocking work (file I/O, PDF rendering) and runs
//! on the blocking pool. Routes live under `/api/generate`.

pub mod engine;
pub mod naming;
pub mod remote;
pub mod render;

use crate::config::AppConfig;
use crate::error::ServiceError;
use actix_web::web::{self, post, scope};
use actix_web::{HttpResponse, Scope};
use common::requests::{GenerateBatchRequest, GenerateRequest};

const API_PATH: &str = "/api/generate";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(process))
        .route("/batch", post().to(batch))
}

pub(crate) async fn process(
    cfg: web::Data<AppConfig>,
    payload: web::Json<GenerateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let req = payload.into_inner();
    let record = web::block(move || engine::generate_document(&cfg, &req)).await??;
    Ok(HttpResponse::Ok().json(record))
}

pub(crate) async fn batch(
    cfg: web::Data<AppConfig>,
    payload: web::Json<GenerateBatchRequest>,
) -> Result<HttpResponse, ServiceError> {
    let req = payload.into_inner();
    let items = web::block(move || engine::generate_batch(&cfg, &req)).await??;
    Ok(HttpResponse::Ok().json(items))
}
