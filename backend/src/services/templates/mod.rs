//! # Template Store
//!
//! Everything templates: upload with one-time variable/field detection,
//! retrieval and listing, deletion, and mapping-panel saves (default mapping
//! and letterhead). Routes live under `/api/templates`.
//!
//! - `POST /upload` — multipart (`json` metadata + `file`); detects the
//!   template kind and its variables or form fields, persists the file and
//!   row. Detection failures reject the upload and store nothing.
//! - `GET /` — list, filterable by `county`, `case_type`, `category`.
//! - `GET /{template_id}` / `DELETE /{template_id}`.
//! - `PUT /{template_id}/mapping` — replace the default mapping.
//! - `PUT /{template_id}/letterhead` — set or clear the letterhead PNG.

mod get;
pub mod parse;
pub mod pdf_form;
mod save;
pub mod store;
pub mod upload;

use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/templates";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/upload", post().to(upload::process))
        .route("", get().to(get::list))
        .route("/{template_id}", get().to(get::process))
        .route("/{template_id}", delete().to(get::delete))
        .route("/{template_id}/mapping", put().to(save::process))
        .route("/{template_id}/letterhead", put().to(save::letterhead))
}
