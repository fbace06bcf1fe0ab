//! # Notifications
//!
//! Portal notifications raised by approval transitions. This service only
//! stores and lists them; delivery to Slack or similar is somebody else's
//! job. Routes live under `/api/notifications`.

use crate::config::AppConfig;
use crate::db;
use crate::error::ServiceError;
use crate::services::templates::store::parse_ts;
use actix_web::web::{self, get, post, scope};
use actix_web::{HttpResponse, Scope};
use chrono::Utc;
use common::model::notification::Notification;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const API_PATH: &str = "/api/notifications";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/{user_id}", get().to(list))
        .route("/{notification_id}/read", post().to(mark_read))
}

async fn list(
    cfg: web::Data<AppConfig>,
    user_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let notifications = list_for_user(&conn, &user_id)?;
    Ok(HttpResponse::Ok().json(notifications))
}

async fn mark_read(
    cfg: web::Data<AppConfig>,
    notification_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    mark_notification_read(&conn, &notification_id)?;
    Ok(HttpResponse::Ok().finish())
}

/// Idempotent: marking an already-read notification succeeds quietly; only
/// an unknown id is an error.
pub fn mark_notification_read(
    conn: &Connection,
    notification_id: &str,
) -> Result<(), ServiceError> {
    let changed = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1",
        params![notification_id],
    )?;
    if changed == 0 {
        return Err(ServiceError::NotFound("notification"));
    }
    Ok(())
}

/// Inserts a notification for a user; called by approval transitions.
pub fn notify(
    conn: &Connection,
    user_id: &str,
    approval_id: Option<&str>,
    message: &str,
) -> Result<Notification, ServiceError> {
    let notification = Notification {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        approval_id: approval_id.map(|id| id.to_string()),
        message: message.to_string(),
        read: false,
        created_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO notifications (id, user_id, approval_id, message, is_read, created_at) \
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            notification.id,
            notification.user_id,
            notification.approval_id,
            notification.message,
            notification.created_at.to_rfc3339(),
        ],
    )?;
    Ok(notification)
}

pub fn list_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<Notification>, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, approval_id, message, is_read, created_at FROM notifications \
         WHERE user_id = ?1 ORDER BY is_read ASC, created_at DESC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| Ok(build(row)))?;
    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(row??);
    }
    Ok(notifications)
}

fn build(row: &Row<'_>) -> Result<Notification, ServiceError> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        approval_id: row.get(2)?,
        message: row.get(3)?,
        read: row.get::<_, i64>(4)? != 0,
        created_at: parse_ts(&row.get::<_, String>(5)?)?,
    })
}
