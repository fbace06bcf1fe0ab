//! Template persistence: the row <-> model mapping every template handler
//! (and the generation engine) goes through.

use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use common::model::template::Template;
use rusqlite::{params, Connection, Row};

const COLUMNS: &str = "id, name, kind, county, case_type, category, file_path, checksum, \
     variables_json, pdf_fields_json, repeat_blocks_json, mapping_json, letterhead_png, \
     created_at, updated_at";

pub fn insert(conn: &Connection, template: &Template) -> Result<(), ServiceError> {
    conn.execute(
        "INSERT INTO templates (id, name, kind, county, case_type, category, file_path, \
         checksum, variables_json, pdf_fields_json, repeat_blocks_json, mapping_json, \
         letterhead_png, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            template.id,
            template.name,
            template.kind.as_str(),
            template.county,
            template.case_type,
            template.category,
            template.file_path,
            template.checksum,
            serde_json::to_string(&template.variables)?,
            serde_json::to_string(&template.pdf_fields)?,
            serde_json::to_string(&template.repeat_blocks)?,
            serde_json::to_string(&template.mapping)?,
            template.letterhead_png,
            template.created_at.to_rfc3339(),
            template.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, template_id: &str) -> Result<Template, ServiceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM templates WHERE id = ?1",
        COLUMNS
    ))?;
    let mut rows = stmt.query_map(params![template_id], from_row)?;
    match rows.next() {
        Some(row) => row?,
        None => Err(ServiceError::NotFound("template")),
    }
}

/// List filters are conjunctive; an absent filter matches everything.
pub fn list(
    conn: &Connection,
    county: Option<&str>,
    case_type: Option<&str>,
    category: Option<&str>,
) -> Result<Vec<Template>, ServiceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM templates \
         WHERE (?1 IS NULL OR county = ?1) \
           AND (?2 IS NULL OR case_type = ?2) \
           AND (?3 IS NULL OR category = ?3) \
         ORDER BY name",
        COLUMNS
    ))?;
    let rows = stmt.query_map(params![county, case_type, category], from_row)?;
    let mut templates = Vec::new();
    for row in rows {
        templates.push(row??);
    }
    Ok(templates)
}

/// Removes the row and reports the stored file path so the caller can unlink
/// the template file too.
pub fn delete(conn: &Connection, template_id: &str) -> Result<String, ServiceError> {
    let template = get(conn, template_id)?;
    conn.execute(
        "DELETE FROM mapping_profiles WHERE template_id = ?1",
        params![template_id],
    )?;
    conn.execute("DELETE FROM templates WHERE id = ?1", params![template_id])?;
    Ok(template.file_path)
}

pub fn save_mapping(
    conn: &Connection,
    template_id: &str,
    mapping_json: &str,
) -> Result<(), ServiceError> {
    let changed = conn.execute(
        "UPDATE templates SET mapping_json = ?1, updated_at = ?2 WHERE id = ?3",
        params![mapping_json, Utc::now().to_rfc3339(), template_id],
    )?;
    if changed == 0 {
        return Err(ServiceError::NotFound("template"));
    }
    Ok(())
}

pub fn save_letterhead(
    conn: &Connection,
    template_id: &str,
    letterhead_png: Option<&str>,
) -> Result<(), ServiceError> {
    let changed = conn.execute(
        "UPDATE templates SET letterhead_png = ?1, updated_at = ?2 WHERE id = ?3",
        params![letterhead_png, Utc::now().to_rfc3339(), template_id],
    )?;
    if changed == 0 {
        return Err(ServiceError::NotFound("template"));
    }
    Ok(())
}

/// The inner `Result` keeps serde/chrono trouble out of rusqlite's row
/// mapping; callers flatten with `row??`.
fn from_row(row: &Row<'_>) -> rusqlite::Result<Result<Template, ServiceError>> {
    Ok(build(row))
}

fn build(row: &Row<'_>) -> Result<Template, ServiceError> {
    let kind_raw: String = row.get(2)?;
    let kind = serde_json::from_value(serde_json::Value::String(kind_raw))?;
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        kind,
        county: row.get(3)?,
        case_type: row.get(4)?,
        category: row.get(5)?,
        file_path: row.get(6)?,
        checksum: row.get(7)?,
        variables: serde_json::from_str(&row.get::<_, String>(8)?)?,
        pdf_fields: serde_json::from_str(&row.get::<_, String>(9)?)?,
        repeat_blocks: serde_json::from_str(&row.get::<_, String>(10)?)?,
        mapping: serde_json::from_str(&row.get::<_, String>(11)?)?,
        letterhead_png: row.get(12)?,
        created_at: parse_ts(&row.get::<_, String>(13)?)?,
        updated_at: parse_ts(&row.get::<_, String>(14)?)?,
    })
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, ServiceError> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
