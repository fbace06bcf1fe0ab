//! SQLite access. Connections are opened per operation (they are cheap for a
//! staff-sized workload) against the database file under the data directory;
//! the schema is created idempotently at startup.

use crate::config::AppConfig;
use crate::error::ServiceError;
use rusqlite::Connection;

/// Opens a connection with the pragmas every caller needs: WAL so readers
/// and the occasional concurrent writer stay out of each other's way, and a
/// busy timeout so competing approval transitions queue instead of failing.
pub fn open(cfg: &AppConfig) -> Result<Connection, ServiceError> {
    let conn = Connection::open(cfg.db_path())?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

/// Creates every table the service uses. Safe to run on every startup.
pub fn init_schema(conn: &Connection) -> Result<(), ServiceError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS templates (
            id                 TEXT PRIMARY KEY,
            name               TEXT NOT NULL,
            kind               TEXT NOT NULL,
            county             TEXT,
            case_type          TEXT,
            category           TEXT,
            file_path          TEXT NOT NULL,
            checksum           TEXT NOT NULL,
            variables_json     TEXT NOT NULL DEFAULT '[]',
            pdf_fields_json    TEXT NOT NULL DEFAULT '[]',
            repeat_blocks_json TEXT NOT NULL DEFAULT '[]',
            mapping_json       TEXT NOT NULL DEFAULT '{}',
            letterhead_png     TEXT,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS mapping_profiles (
            id                TEXT PRIMARY KEY,
            template_id       TEXT NOT NULL REFERENCES templates(id),
            name              TEXT NOT NULL,
            mapping_json      TEXT NOT NULL DEFAULT '{}',
            repeat_rules_json TEXT NOT NULL DEFAULT '{}',
            output_rules_json TEXT NOT NULL DEFAULT '{}',
            remote_rules_json TEXT NOT NULL DEFAULT '{}',
            created_at        TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS client_bundles (
            client_id TEXT NOT NULL,
            key       TEXT NOT NULL,
            value     TEXT NOT NULL,
            PRIMARY KEY (client_id, key)
        );
        CREATE TABLE IF NOT EXISTS client_collections (
            client_id TEXT NOT NULL,
            source    TEXT NOT NULL,
            row_index INTEGER NOT NULL,
            row_json  TEXT NOT NULL,
            PRIMARY KEY (client_id, source, row_index)
        );
        CREATE TABLE IF NOT EXISTS staff_inputs (
            client_id  TEXT NOT NULL,
            variable   TEXT NOT NULL,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (client_id, variable)
        );
        CREATE TABLE IF NOT EXISTS generated_documents (
            id                TEXT PRIMARY KEY,
            template_id       TEXT NOT NULL,
            client_id         TEXT NOT NULL,
            docx_path         TEXT,
            pdf_path          TEXT,
            remote_paths_json TEXT NOT NULL DEFAULT '[]',
            status            TEXT NOT NULL,
            error             TEXT,
            remote_warning    TEXT,
            created_at        TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS approvals (
            id            TEXT PRIMARY KEY,
            doc_id        TEXT NOT NULL REFERENCES generated_documents(id),
            template_name TEXT NOT NULL,
            matter_name   TEXT NOT NULL,
            drafter_id    TEXT NOT NULL,
            drafter_name  TEXT NOT NULL,
            status        TEXT NOT NULL DEFAULT 'PENDING',
            comments      TEXT,
            decided_by    TEXT,
            decided_at    TEXT,
            created_at    TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            approval_id TEXT,
            message     TEXT NOT NULL,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_profiles_template
            ON mapping_profiles(template_id);
        CREATE INDEX IF NOT EXISTS idx_approvals_status
            ON approvals(status);
        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, is_read);",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn schema_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::with_data_dir(dir.path());
        cfg.ensure_dirs().unwrap();
        let conn = open(&cfg).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM templates", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
