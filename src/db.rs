use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::model::Coordinate;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS geocode_cache (
            address    TEXT PRIMARY KEY,
            latitude   REAL NOT NULL,
            longitude  REAL NOT NULL,
            cached_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS runs (
            id           INTEGER PRIMARY KEY,
            started_at   TEXT NOT NULL,
            finished_at  TEXT NOT NULL,
            records      INTEGER NOT NULL DEFAULT 0,
            resolved     INTEGER NOT NULL DEFAULT 0,
            point_only   INTEGER NOT NULL DEFAULT 0,
            dropped      INTEGER NOT NULL DEFAULT 0,
            rejected     INTEGER NOT NULL DEFAULT 0,
            status       TEXT NOT NULL CHECK(status IN ('ok','failed')),
            error        TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_runs_started ON runs(started_at);
        ",
    )?;
    Ok(())
}

// ── Geocode cache ──

pub fn load_geocode_cache(conn: &Connection) -> Result<HashMap<String, Coordinate>> {
    let mut stmt = conn.prepare("SELECT address, latitude, longitude FROM geocode_cache")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, Coordinate::new(row.get(1)?, row.get(2)?)))
        })?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

pub fn save_geocode_cache(conn: &Connection, entries: &[(String, Coordinate)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO geocode_cache (address, latitude, longitude) VALUES (?1, ?2, ?3)",
        )?;
        for (address, coord) in entries {
            count += stmt.execute(params![address, coord.latitude, coord.longitude])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Runs ──

#[derive(Debug, Clone, PartialEq)]
pub struct RunRow {
    pub started_at: String,
    pub finished_at: String,
    pub records: usize,
    /// Segments with both endpoints resolved.
    pub resolved: usize,
    pub point_only: usize,
    pub dropped: usize,
    pub rejected: usize,
    pub status: String,
    pub error: Option<String>,
}

pub fn insert_run(conn: &Connection, run: &RunRow) -> Result<i64> {
    conn.execute(
        "INSERT INTO runs (started_at, finished_at, records, resolved, point_only, dropped, rejected, status, error)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            run.started_at,
            run.finished_at,
            run.records,
            run.resolved,
            run.point_only,
            run.dropped,
            run.rejected,
            run.status,
            run.error,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn fetch_runs(conn: &Connection, limit: usize) -> Result<Vec<RunRow>> {
    let mut stmt = conn.prepare(
        "SELECT started_at, finished_at, records, resolved, point_only, dropped, rejected, status, error
         FROM runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok(RunRow {
                started_at: row.get(0)?,
                finished_at: row.get(1)?,
                records: row.get(2)?,
                resolved: row.get(3)?,
                point_only: row.get(4)?,
                dropped: row.get(5)?,
                rejected: row.get(6)?,
                status: row.get(7)?,
                error: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub cached_addresses: usize,
    pub runs: usize,
    pub failed_runs: usize,
    pub last_ok: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let cached_addresses: usize =
        conn.query_row("SELECT COUNT(*) FROM geocode_cache", [], |r| r.get(0))?;
    let runs: usize = conn.query_row("SELECT COUNT(*) FROM runs", [], |r| r.get(0))?;
    let failed_runs: usize =
        conn.query_row("SELECT COUNT(*) FROM runs WHERE status = 'failed'", [], |r| r.get(0))?;
    let last_ok: Option<String> = conn.query_row(
        "SELECT MAX(finished_at) FROM runs WHERE status = 'ok'",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        cached_addresses,
        runs,
        failed_runs,
        last_ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = connect(&dir.path().join("data/test.sqlite")).unwrap();
        init_schema(&conn).unwrap();
        (dir, conn)
    }

    fn run(status: &str, finished_at: &str) -> RunRow {
        RunRow {
            started_at: "2026-10-16T06:00:00Z".into(),
            finished_at: finished_at.into(),
            records: 10,
            resolved: 6,
            point_only: 2,
            dropped: 2,
            rejected: 1,
            status: status.into(),
            error: None,
        }
    }

    #[test]
    fn cache_round_trips_through_db() {
        let (_dir, conn) = open();
        let entries = vec![
            ("A & B, Queens, NY".to_string(), Coordinate::new(40.7578, -73.8303)),
            ("C & D, Bronx, NY".to_string(), Coordinate::new(40.8448, -73.8648)),
        ];
        assert_eq!(save_geocode_cache(&conn, &entries).unwrap(), 2);
        let cache = load_geocode_cache(&conn).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache["A & B, Queens, NY"], Coordinate::new(40.7578, -73.8303));
    }

    #[test]
    fn schema_is_idempotent() {
        let (_dir, conn) = open();
        init_schema(&conn).unwrap();
        assert!(load_geocode_cache(&conn).unwrap().is_empty());
    }

    #[test]
    fn runs_newest_first_and_stats() {
        let (_dir, conn) = open();
        insert_run(&conn, &run("ok", "2026-10-16T06:10:00Z")).unwrap();
        let mut failed = run("failed", "2026-10-16T07:00:00Z");
        failed.error = Some("document unavailable: HTTP 503".into());
        insert_run(&conn, &failed).unwrap();

        let rows = fetch_runs(&conn, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, "failed");
        assert_eq!(rows[1], run("ok", "2026-10-16T06:10:00Z"));

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.failed_runs, 1);
        assert_eq!(stats.last_ok.as_deref(), Some("2026-10-16T06:10:00Z"));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let (_dir, conn) = open();
        assert!(insert_run(&conn, &run("maybe", "x")).is_err());
    }
}
