//! Approval rows and the compare-and-swap transition they all go through.

use crate::error::ServiceError;
use crate::services::templates::store::parse_ts;
use chrono::Utc;
use common::model::approval::{Approval, ApprovalStatus};
use rusqlite::{params, Connection, Row};

pub fn insert(conn: &Connection, approval: &Approval) -> Result<(), ServiceError> {
    conn.execute(
        "INSERT INTO approvals (id, doc_id, template_name, matter_name, drafter_id, \
         drafter_name, status, comments, decided_by, decided_at, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            approval.id,
            approval.doc_id,
            approval.template_name,
            approval.matter_name,
            approval.drafter_id,
            approval.drafter_name,
            approval.status.as_str(),
            approval.comments,
            approval.decided_by,
            approval.decided_at.map(|t| t.to_rfc3339()),
            approval.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, approval_id: &str) -> Result<Approval, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, doc_id, template_name, matter_name, drafter_id, drafter_name, status, \
         comments, decided_by, decided_at, created_at FROM approvals WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map(params![approval_id], |row| Ok(build(row)))?;
    match rows.next() {
        Some(row) => row?,
        None => Err(ServiceError::NotFound("approval")),
    }
}

pub fn list(
    conn: &Connection,
    status: Option<ApprovalStatus>,
) -> Result<Vec<Approval>, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, doc_id, template_name, matter_name, drafter_id, drafter_name, status, \
         comments, decided_by, decided_at, created_at FROM approvals \
         WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![status.map(|s| s.as_str())], |row| Ok(build(row)))?;
    let mut approvals = Vec::new();
    for row in rows {
        approvals.push(row??);
    }
    Ok(approvals)
}

/// The one-directional transition: the UPDATE only matches while the row is
/// still `PENDING`, so of two racing decisions exactly one commits. Zero
/// rows affected means somebody else already decided (conflict) or the id
/// is unknown.
pub fn transition(
    conn: &Connection,
    approval_id: &str,
    to: ApprovalStatus,
    decided_by: &str,
    comments: Option<&str>,
) -> Result<Approval, ServiceError> {
    let changed = conn.execute(
        "UPDATE approvals SET status = ?1, decided_by = ?2, decided_at = ?3, comments = ?4 \
         WHERE id = ?5 AND status = 'PENDING'",
        params![
            to.as_str(),
            decided_by,
            Utc::now().to_rfc3339(),
            comments,
            approval_id
        ],
    )?;
    if changed == 0 {
        let current = get(conn, approval_id)?;
        return Err(ServiceError::Conflict(format!(
            "approval is already {}",
            current.status.as_str()
        )));
    }
    get(conn, approval_id)
}

fn build(row: &Row<'_>) -> Result<Approval, ServiceError> {
    let status_raw: String = row.get(6)?;
    let status = ApprovalStatus::parse(&status_raw).ok_or_else(|| {
        ServiceError::Conflict(format!("approval has unknown status '{}'", status_raw))
    })?;
    let decided_at: Option<String> = row.get(9)?;
    Ok(Approval {
        id: row.get(0)?,
        doc_id: row.get(1)?,
        template_name: row.get(2)?,
        matter_name: row.get(3)?,
        drafter_id: row.get(4)?,
        drafter_name: row.get(5)?,
        status,
        comments: row.get(7)?,
        decided_by: row.get(8)?,
        decided_at: decided_at.as_deref().map(parse_ts).transpose()?,
        created_at: parse_ts(&row.get::<_, String>(10)?)?,
    })
}
