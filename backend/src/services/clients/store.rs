//! Persistence for client case data: the flattened bundle, the list-valued
//! collections repeat blocks draw from, and per-client staff inputs.

use crate::error::ServiceError;
use chrono::Utc;
use common::model::profile::RepeatSource;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;

pub fn load_bundle(
    conn: &Connection,
    client_id: &str,
) -> Result<BTreeMap<String, String>, ServiceError> {
    let mut stmt =
        conn.prepare("SELECT key, value FROM client_bundles WHERE client_id = ?1")?;
    let rows = stmt.query_map(params![client_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut bundle = BTreeMap::new();
    for row in rows {
        let (key, value) = row?;
        bundle.insert(key, value);
    }
    Ok(bundle)
}

/// Replaces one client's snapshot with the given keys. Import calls this per
/// CSV row inside a transaction.
pub fn replace_bundle(
    conn: &Connection,
    client_id: &str,
    values: &BTreeMap<String, String>,
) -> Result<(), ServiceError> {
    conn.execute(
        "DELETE FROM client_bundles WHERE client_id = ?1",
        params![client_id],
    )?;
    for (key, value) in values {
        conn.execute(
            "INSERT INTO client_bundles (client_id, key, value) VALUES (?1, ?2, ?3)",
            params![client_id, key, value],
        )?;
    }
    Ok(())
}

pub fn load_collection(
    conn: &Connection,
    client_id: &str,
    source: RepeatSource,
) -> Result<Vec<BTreeMap<String, String>>, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT row_json FROM client_collections \
         WHERE client_id = ?1 AND source = ?2 ORDER BY row_index",
    )?;
    let rows = stmt.query_map(params![client_id, source.as_str()], |row| {
        row.get::<_, String>(0)
    })?;
    let mut collection = Vec::new();
    for row in rows {
        collection.push(serde_json::from_str(&row?)?);
    }
    Ok(collection)
}

pub fn replace_collection(
    conn: &Connection,
    client_id: &str,
    source: RepeatSource,
    rows: &[BTreeMap<String, String>],
) -> Result<(), ServiceError> {
    conn.execute(
        "DELETE FROM client_collections WHERE client_id = ?1 AND source = ?2",
        params![client_id, source.as_str()],
    )?;
    for (index, row) in rows.iter().enumerate() {
        conn.execute(
            "INSERT INTO client_collections (client_id, source, row_index, row_json) \
             VALUES (?1, ?2, ?3, ?4)",
            params![client_id, source.as_str(), index as i64, serde_json::to_string(row)?],
        )?;
    }
    Ok(())
}

pub fn load_staff_inputs(
    conn: &Connection,
    client_id: &str,
) -> Result<BTreeMap<String, String>, ServiceError> {
    let mut stmt =
        conn.prepare("SELECT variable, value FROM staff_inputs WHERE client_id = ?1")?;
    let rows = stmt.query_map(params![client_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut inputs = BTreeMap::new();
    for row in rows {
        let (variable, value) = row?;
        inputs.insert(variable, value);
    }
    Ok(inputs)
}

/// Upserts the given values so future generations can pre-fill them. Empty
/// values are dropped; an operator clearing a field means "stop remembering
/// it".
pub fn save_staff_inputs(
    conn: &Connection,
    client_id: &str,
    inputs: &BTreeMap<String, String>,
) -> Result<(), ServiceError> {
    let now = Utc::now().to_rfc3339();
    for (variable, value) in inputs {
        if value.is_empty() {
            conn.execute(
                "DELETE FROM staff_inputs WHERE client_id = ?1 AND variable = ?2",
                params![client_id, variable],
            )?;
        } else {
            conn.execute(
                "INSERT OR REPLACE INTO staff_inputs (client_id, variable, value, updated_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![client_id, variable, value, now],
            )?;
        }
    }
    Ok(())
}
