use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Fails on in-memory databases; not fatal.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::debug!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS runs (
            id          TEXT PRIMARY KEY,
            contract    TEXT NOT NULL,
            source      TEXT NOT NULL DEFAULT '',
            started_at  TEXT NOT NULL DEFAULT (datetime('now')),
            finished_at TEXT,
            steps       INTEGER NOT NULL DEFAULT 0,
            verdict     TEXT NOT NULL DEFAULT 'RUNNING'
        );

        CREATE TABLE IF NOT EXISTS steps (
            run_id      TEXT NOT NULL REFERENCES runs(id),
            step        INTEGER NOT NULL,
            delta_env   INTEGER NOT NULL,
            delta_sys   INTEGER NOT NULL,
            any_pre     INTEGER NOT NULL,
            fired       INTEGER NOT NULL,
            tokens      INTEGER NOT NULL,
            pre_fault   INTEGER NOT NULL DEFAULT 0,
            post_fault  INTEGER NOT NULL DEFAULT 0,
            verdict     TEXT NOT NULL,
            snapshot    TEXT,
            PRIMARY KEY (run_id, step)
        );

        CREATE INDEX IF NOT EXISTS idx_runs_started ON runs(started_at);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
