//! Case-data snapshot import.
//!
//! The case store proper lives elsewhere; what this service receives is its
//! flattened export, one CSV row per client with a leading `client_id`
//! column. The upload is md5-checksummed while streaming, the header is
//! validated cell by cell, and the row scan runs on rayon before anything
//! touches the database.

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::services::clients::{cache::BundleCache, store};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use log::info;
use md5::Context;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub clients: usize,
    pub keys: usize,
    pub checksum: String,
}

pub(crate) async fn process(
    cfg: web::Data<AppConfig>,
    cache: web::Data<BundleCache>,
    mut payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let mut bytes: Vec<u8> = Vec::new();
    let mut hasher = Context::new();
    let mut file_seen = false;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ServiceError::Configuration(format!("bad multipart: {}", e)))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));
        if name.as_deref() != Some("file") {
            continue;
        }
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();
        if !filename.ends_with(".csv") {
            return Err(ServiceError::Configuration(
                "the snapshot file must end with .csv".to_string(),
            ));
        }
        file_seen = true;
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| ServiceError::Configuration(format!("bad upload: {}", e)))?;
            hasher.consume(&chunk);
            bytes.extend_from_slice(&chunk);
        }
    }
    if !file_seen {
        return Err(ServiceError::Configuration("missing 'file' part".to_string()));
    }

    let checksum = format!("{:x}", hasher.finalize());
    let cfg_inner = cfg.clone();
    let (summary, client_ids) =
        web::block(move || import_snapshot(&cfg_inner, &bytes, checksum)).await??;
    cache.invalidate(&client_ids).await;
    Ok(HttpResponse::Ok().json(summary))
}

/// Parses, validates and stores the snapshot. Returns the ids whose cached
/// bundles must be dropped.
pub fn import_snapshot(
    cfg: &AppConfig,
    bytes: &[u8],
    checksum: String,
) -> Result<(ImportSummary, Vec<String>), ServiceError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ServiceError::Configuration(format!("bad CSV header: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    validate_headers(&headers)?;

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| ServiceError::Configuration(format!("bad CSV row: {}", e)))?;
        records.push(record.iter().map(|c| c.to_string()).collect());
    }

    // First bad row wins; the scan itself is parallel.
    if let Some(row) = records
        .par_iter()
        .enumerate()
        .find_map_first(|(index, record)| {
            if record.first().map(String::is_empty).unwrap_or(true) {
                Some(index + 2)
            } else {
                None
            }
        })
    {
        return Err(ServiceError::Configuration(format!(
            "row {}: client_id must not be empty",
            row
        )));
    }

    let conn = crate::db::open(cfg)?;
    conn.execute_batch("BEGIN")?;
    let mut client_ids = Vec::with_capacity(records.len());
    let result = (|| -> Result<(), ServiceError> {
        for record in &records {
            let client_id = &record[0];
            let mut values = BTreeMap::new();
            for (index, header) in headers.iter().enumerate().skip(1) {
                if let Some(value) = record.get(index) {
                    values.insert(header.clone(), value.clone());
                }
            }
            store::replace_bundle(&conn, client_id, &values)?;
            client_ids.push(client_id.clone());
        }
        Ok(())
    })();
    match result {
        Ok(()) => conn.execute_batch("COMMIT")?,
        Err(err) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(err);
        }
    }

    info!(
        "imported case snapshot: {} clients, {} keys, md5 {}",
        client_ids.len(),
        headers.len().saturating_sub(1),
        checksum
    );
    Ok((
        ImportSummary {
            clients: client_ids.len(),
            keys: headers.len().saturating_sub(1),
            checksum,
        },
        client_ids,
    ))
}

fn validate_headers(headers: &[String]) -> Result<(), ServiceError> {
    if headers.first().map(String::as_str) != Some("client_id") {
        return Err(ServiceError::Configuration(
            "the first CSV column must be 'client_id'".to_string(),
        ));
    }
    let header_re = Regex::new(r"^[\p{L}\p{M}\p{N}\s\-_\.]+$")
        .map_err(|e| ServiceError::Configuration(format!("regex error: {}", e)))?;
    for header in headers {
        if header.is_empty() {
            return Err(ServiceError::Configuration(
                "CSV header cells must not be empty".to_string(),
            ));
        }
        if !header_re.is_match(header) {
            return Err(ServiceError::Configuration(format!(
                "CSV header cell '{}' contains unsupported characters",
                header
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AppConfig) {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::with_data_dir(dir.path());
        cfg.ensure_dirs().unwrap();
        let conn = crate::db::open(&cfg).unwrap();
        crate::db::init_schema(&conn).unwrap();
        (dir, cfg)
    }

    #[test]
    fn import_replaces_each_clients_bundle() {
        let (_dir, cfg) = setup();
        let csv = b"client_id,client_name,case_number\nc1,Jane Doe,2024-P-001\nc2,John Roe,2024-P-002\n";
        let (summary, clients) = import_snapshot(&cfg, csv, "abc".to_string()).unwrap();
        assert_eq!(summary.clients, 2);
        assert_eq!(summary.keys, 2);
        assert_eq!(clients, vec!["c1", "c2"]);

        let conn = crate::db::open(&cfg).unwrap();
        let bundle = store::load_bundle(&conn, "c1").unwrap();
        assert_eq!(bundle["client_name"], "Jane Doe");
        assert_eq!(bundle["case_number"], "2024-P-001");
    }

    #[test]
    fn import_rejects_wrong_leading_column() {
        let (_dir, cfg) = setup();
        let csv = b"name,case_number\nJane,1\n";
        let err = import_snapshot(&cfg, csv, "abc".to_string()).unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }

    #[test]
    fn import_rejects_empty_client_id_with_row_number() {
        let (_dir, cfg) = setup();
        let csv = b"client_id,client_name\nc1,Jane\n,John\n";
        let err = import_snapshot(&cfg, csv, "abc".to_string()).unwrap_err();
        assert!(err.to_string().contains("row 3"));
    }
}
