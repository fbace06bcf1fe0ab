//! The bundle cache: an explicit TTL cache over the flattened case-data
//! snapshots, shared across workers the same way the job map used to be
//! (`Arc<RwLock<HashMap>>`), with an explicit refresh instead of ambient
//! memoization. Generation bypasses it and reads the store directly; the
//! cache only serves the read endpoints.

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::services::clients::store;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CachedBundle {
    fetched_at: Instant,
    values: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct BundleCache {
    entries: Arc<RwLock<HashMap<String, CachedBundle>>>,
    ttl: Duration,
}

impl BundleCache {
    pub fn new(ttl: Duration) -> Self {
        BundleCache {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Serves from cache while fresh; loads and caches on a miss or once the
    /// TTL has lapsed.
    pub async fn get(
        &self,
        cfg: &AppConfig,
        client_id: &str,
    ) -> Result<BTreeMap<String, String>, ServiceError> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(client_id) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.values.clone());
                }
            }
        }
        self.refresh(cfg, client_id).await
    }

    /// Unconditional reload from the store.
    pub async fn refresh(
        &self,
        cfg: &AppConfig,
        client_id: &str,
    ) -> Result<BTreeMap<String, String>, ServiceError> {
        let conn = crate::db::open(cfg)?;
        let values = store::load_bundle(&conn, client_id)?;
        let mut entries = self.entries.write().await;
        entries.insert(
            client_id.to_string(),
            CachedBundle {
                fetched_at: Instant::now(),
                values: values.clone(),
            },
        );
        Ok(values)
    }

    /// Drops cached entries for the given clients; the next read reloads.
    pub async fn invalidate(&self, client_ids: &[String]) {
        let mut entries = self.entries.write().await;
        for client_id in client_ids {
            entries.remove(client_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AppConfig) {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::with_data_dir(dir.path());
        cfg.ensure_dirs().unwrap();
        let conn = crate::db::open(&cfg).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO client_bundles (client_id, key, value) VALUES ('c1', 'client_name', 'Jane Doe')",
            [],
        )
        .unwrap();
        (dir, cfg)
    }

    fn update_name(cfg: &AppConfig, value: &str) {
        let conn = crate::db::open(cfg).unwrap();
        conn.execute(
            "UPDATE client_bundles SET value = ?1 WHERE client_id = 'c1' AND key = 'client_name'",
            params![value],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn serves_stale_reads_until_refresh() {
        let (_dir, cfg) = setup();
        let cache = BundleCache::new(Duration::from_secs(3600));

        let first = cache.get(&cfg, "c1").await.unwrap();
        assert_eq!(first["client_name"], "Jane Doe");

        update_name(&cfg, "Janet Doe");
        let cached = cache.get(&cfg, "c1").await.unwrap();
        assert_eq!(cached["client_name"], "Jane Doe");

        let refreshed = cache.refresh(&cfg, "c1").await.unwrap();
        assert_eq!(refreshed["client_name"], "Janet Doe");
    }

    #[tokio::test]
    async fn zero_ttl_always_reloads() {
        let (_dir, cfg) = setup();
        let cache = BundleCache::new(Duration::from_secs(0));

        assert_eq!(cache.get(&cfg, "c1").await.unwrap()["client_name"], "Jane Doe");
        update_name(&cfg, "Janet Doe");
        assert_eq!(cache.get(&cfg, "c1").await.unwrap()["client_name"], "Janet Doe");
    }

    #[tokio::test]
    async fn invalidate_forces_a_reload() {
        let (_dir, cfg) = setup();
        let cache = BundleCache::new(Duration::from_secs(3600));

        cache.get(&cfg, "c1").await.unwrap();
        update_name(&cfg, "Janet Doe");
        cache.invalidate(&["c1".to_string()]).await;
        assert_eq!(cache.get(&cfg, "c1").await.unwrap()["client_name"], "Janet Doe");
    }
}
