//! Create / approve / deny. Each transition notifies the drafter; a denial
//! carries the reviewer's comments, and re-submission after a denial means a
//! new approval for a newly generated document, never a reopened one.

use crate::config::AppConfig;
use crate::db;
use crate::error::ServiceError;
use crate::services::documents::store as documents;
use crate::services::notifications;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::model::approval::{Approval, ApprovalStatus};
use common::model::document::GenerationStatus;
use common::requests::{ApproveRequest, CreateApprovalRequest, DenyRequest};
use log::info;
use rusqlite::Connection;
use uuid::Uuid;

use super::store;

pub(crate) async fn create(
    cfg: web::Data<AppConfig>,
    payload: web::Json<CreateApprovalRequest>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let approval = create_approval(&conn, payload.into_inner())?;
    Ok(HttpResponse::Ok().json(approval))
}

pub(crate) async fn approve(
    cfg: web::Data<AppConfig>,
    approval_id: web::Path<String>,
    payload: web::Json<ApproveRequest>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let approval = approve_document(&conn, &approval_id, &payload.approver)?;
    Ok(HttpResponse::Ok().json(approval))
}

pub(crate) async fn deny(
    cfg: web::Data<AppConfig>,
    approval_id: web::Path<String>,
    payload: web::Json<DenyRequest>,
) -> Result<HttpResponse, ServiceError> {
    let req = payload.into_inner();
    let conn = db::open(&cfg)?;
    let approval = deny_document(&conn, &approval_id, &req.approver, &req.comments)?;
    Ok(HttpResponse::Ok().json(approval))
}

/// Sends a document into review. Only a `SUCCESS` document qualifies.
pub fn create_approval(
    conn: &Connection,
    req: CreateApprovalRequest,
) -> Result<Approval, ServiceError> {
    let doc = match documents::get(conn, &req.doc_id) {
        Ok(doc) => doc,
        Err(ServiceError::NotFound(_)) => {
            return Err(ServiceError::Configuration(format!(
                "unknown document '{}'",
                req.doc_id
            )))
        }
        Err(err) => return Err(err),
    };
    if doc.status != GenerationStatus::Success {
        return Err(ServiceError::Configuration(
            "only successfully generated documents can be sent for approval".to_string(),
        ));
    }
    let approval = Approval {
        id: Uuid::new_v4().to_string(),
        doc_id: req.doc_id,
        template_name: req.template_name,
        matter_name: req.matter_name,
        drafter_id: req.drafter_id,
        drafter_name: req.drafter_name,
        status: ApprovalStatus::Pending,
        comments: None,
        decided_by: None,
        decided_at: None,
        created_at: Utc::now(),
    };
    store::insert(conn, &approval)?;
    info!(
        "approval requested: '{}' for {} by {}",
        approval.template_name, approval.matter_name, approval.drafter_name
    );
    Ok(approval)
}

pub fn approve_document(
    conn: &Connection,
    approval_id: &str,
    approver: &str,
) -> Result<Approval, ServiceError> {
    let approval =
        store::transition(conn, approval_id, ApprovalStatus::Approved, approver, None)?;
    notifications::notify(
        conn,
        &approval.drafter_id,
        Some(&approval.id),
        &format!(
            "'{}' for {} was approved by {}",
            approval.template_name, approval.matter_name, approver
        ),
    )?;
    Ok(approval)
}

pub fn deny_document(
    conn: &Connection,
    approval_id: &str,
    approver: &str,
    comments: &str,
) -> Result<Approval, ServiceError> {
    let comments = comments.trim();
    if comments.is_empty() {
        return Err(ServiceError::Configuration(
            "denial comments must not be empty".to_string(),
        ));
    }
    let approval = store::transition(
        conn,
        approval_id,
        ApprovalStatus::Denied,
        approver,
        Some(comments),
    )?;
    notifications::notify(
        conn,
        &approval.drafter_id,
        Some(&approval.id),
        &format!(
            "'{}' for {} was denied by {}: {}",
            approval.template_name, approval.matter_name, approver, comments
        ),
    )?;
    Ok(approval)
}
