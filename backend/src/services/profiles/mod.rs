//! # Mapping Profiles
//!
//! Named, reusable override sets owned by one template (the per-county
//! variants of a petition are the typical use). At generation time at most
//! one profile applies and its mapping replaces the template default
//! outright; there is no merging. Routes live under `/api/profiles`.

use crate::config::AppConfig;
use crate::db;
use crate::error::ServiceError;
use crate::services::templates::store as templates;
use actix_web::web::{self, delete, get, post, scope};
use actix_web::{HttpResponse, Scope};
use chrono::Utc;
use common::model::profile::MappingProfile;
use common::requests::CreateProfileRequest;
use rusqlite::{params, Connection, Row};
use serde::Deserialize;
use uuid::Uuid;

const API_PATH: &str = "/api/profiles";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create))
        .route("", get().to(list))
        .route("/{profile_id}", get().to(get_one))
        .route("/{profile_id}", delete().to(remove))
}

#[derive(Debug, Deserialize)]
struct ListFilters {
    template_id: Option<String>,
}

async fn create(
    cfg: web::Data<AppConfig>,
    payload: web::Json<CreateProfileRequest>,
) -> Result<HttpResponse, ServiceError> {
    let req = payload.into_inner();
    if req.name.trim().is_empty() {
        return Err(ServiceError::Configuration(
            "profile name must not be empty".to_string(),
        ));
    }
    let conn = db::open(&cfg)?;
    // The owning template must exist; a profile without one is unusable.
    if templates::get(&conn, &req.template_id).is_err() {
        return Err(ServiceError::Configuration(format!(
            "unknown template '{}'",
            req.template_id
        )));
    }
    let profile = MappingProfile {
        id: Uuid::new_v4().to_string(),
        template_id: req.template_id,
        name: req.name.trim().to_string(),
        mapping: req.mapping.normalized(),
        repeat_rules: req.repeat_rules,
        output_rules: req.output_rules,
        remote_rules: req.remote_rules,
        created_at: Utc::now(),
    };
    insert(&conn, &profile)?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn list(
    cfg: web::Data<AppConfig>,
    filters: web::Query<ListFilters>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let profiles = list_profiles(&conn, filters.template_id.as_deref())?;
    Ok(HttpResponse::Ok().json(profiles))
}

async fn get_one(
    cfg: web::Data<AppConfig>,
    profile_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let profile = get_profile(&conn, &profile_id)?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn remove(
    cfg: web::Data<AppConfig>,
    profile_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let conn = db::open(&cfg)?;
    let changed = conn.execute(
        "DELETE FROM mapping_profiles WHERE id = ?1",
        params![profile_id.as_str()],
    )?;
    if changed == 0 {
        return Err(ServiceError::NotFound("mapping profile"));
    }
    Ok(HttpResponse::Ok().finish())
}

pub fn insert(conn: &Connection, profile: &MappingProfile) -> Result<(), ServiceError> {
    conn.execute(
        "INSERT INTO mapping_profiles (id, template_id, name, mapping_json, \
         repeat_rules_json, output_rules_json, remote_rules_json, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            profile.id,
            profile.template_id,
            profile.name,
            serde_json::to_string(&profile.mapping)?,
            serde_json::to_string(&profile.repeat_rules)?,
            serde_json::to_string(&profile.output_rules)?,
            serde_json::to_string(&profile.remote_rules)?,
            profile.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_profile(conn: &Connection, profile_id: &str) -> Result<MappingProfile, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, template_id, name, mapping_json, repeat_rules_json, output_rules_json, \
         remote_rules_json, created_at FROM mapping_profiles WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map(params![profile_id], from_row)?;
    match rows.next() {
        Some(row) => row?,
        None => Err(ServiceError::NotFound("mapping profile")),
    }
}

pub fn list_profiles(
    conn: &Connection,
    template_id: Option<&str>,
) -> Result<Vec<MappingProfile>, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, template_id, name, mapping_json, repeat_rules_json, output_rules_json, \
         remote_rules_json, created_at FROM mapping_profiles \
         WHERE (?1 IS NULL OR template_id = ?1) ORDER BY name",
    )?;
    let rows = stmt.query_map(params![template_id], from_row)?;
    let mut profiles = Vec::new();
    for row in rows {
        profiles.push(row??);
    }
    Ok(profiles)
}

/// Profile selection for generation and resolution: a supplied id must exist
/// and belong to the given template, else the call is rejected before any
/// work happens. Absent or empty means "use the template default".
pub fn select_for_template(
    conn: &Connection,
    template_id: &str,
    profile_id: Option<&str>,
) -> Result<Option<MappingProfile>, ServiceError> {
    let Some(profile_id) = profile_id.filter(|id| !id.is_empty()) else {
        return Ok(None);
    };
    let profile = match get_profile(conn, profile_id) {
        Ok(profile) => profile,
        Err(ServiceError::NotFound(_)) => {
            return Err(ServiceError::Configuration(format!(
                "unknown mapping profile '{}'",
                profile_id
            )))
        }
        Err(err) => return Err(err),
    };
    if profile.template_id != template_id {
        return Err(ServiceError::Configuration(format!(
            "mapping profile '{}' does not belong to template '{}'",
            profile.name, template_id
        )));
    }
    Ok(Some(profile))
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Result<MappingProfile, ServiceError>> {
    Ok(build(row))
}

fn build(row: &Row<'_>) -> Result<MappingProfile, ServiceError> {
    Ok(MappingProfile {
        id: row.get(0)?,
        template_id: row.get(1)?,
        name: row.get(2)?,
        mapping: serde_json::from_str(&row.get::<_, String>(3)?)?,
        repeat_rules: serde_json::from_str(&row.get::<_, String>(4)?)?,
        output_rules: serde_json::from_str(&row.get::<_, String>(5)?)?,
        remote_rules: serde_json::from_str(&row.get::<_, String>(6)?)?,
        created_at: templates::parse_ts(&row.get::<_, String>(7)?)?,
    })
}
