//! # Approval Workflow
//!
//! The attorney-review state machine: a drafter sends a successfully
//! generated document into review (`PENDING`), a reviewer approves or
//! denies it, and the record freezes there — the two terminal states never
//! transition again, and racing decisions are settled by a compare-and-swap
//! on the status column. Routes live under `/api/approvals`.
//!
//! - `POST /` — send a document for approval.
//! - `GET /` — list, optionally `?status=PENDING|APPROVED|DENIED`.
//! - `GET /{id}` / `GET /{id}/preview`.
//! - `POST /{id}/approve` / `POST /{id}/deny` (comments mandatory).

pub mod preview;
pub mod store;
pub mod transition;

use crate::config::AppConfig;
use crate::db;
use crate::error::ServiceError;
use actix_web::web::{self, get, post, scope};
use actix_web::{HttpResponse, Scope};
use common::model::approval::ApprovalStatus;
use serde::Deserialize;

const API_PATH: &str = "/api/approvals";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(transition::create))
        .route("", get().to(list))
        .route("/{approval_id}", get().to(get_one))
        .route("/{approval_id}/preview", get().to(preview::process))
        .route("/{approval_id}/approve", post().to(transition::approve))
        .route("/{approval_id}/deny", post().to(transition::deny))
}

#[derive(Debug, Deserialize)]
struct ListFilters {
    status: Option<String>,
}

async fn list(
    cfg: web::Data<AppConfig>,
    filters: web::Query<ListFilters>,
) -> Result<HttpResponse, ServiceError> {
    let status = match filters.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(ApprovalStatus::parse(raw).ok_or_else(|| {
            ServiceError::Configuration(format!("unknown status filter '{}'", raw))
        })?),
    };
    let conn = db::open(&cfg)?;
    let approvals = store::list(&conn, status)?;
    Ok(HttpResponse::Ok().json(approvals))
}

async fn get_one(
    cfg: web::Data<AppConfig>,
    approval_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let approval = store::get(&conn, &approval_id)?;
    Ok(HttpResponse::Ok().json(approval))
}
