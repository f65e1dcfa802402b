use crate::errors::DbError;
use rusqlite::{params, Connection};

#[derive(Debug, Clone, PartialEq)]
pub struct IngestionRun {
    pub id: i64,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub listings: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

pub fn start_ingestion_run(conn: &Connection, now: i64) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO ingestion_runs (started_at, success) VALUES (?, 0)",
        params![now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn end_ingestion_run(
    conn: &Connection,
    run_id: i64,
    now: i64,
    listings: usize,
    success: bool,
    error: Option<String>,
) -> Result<(), DbError> {
    conn.execute(
        "UPDATE ingestion_runs SET finished_at = ?, listings = ?, success = ?, error_message = ? WHERE id = ?",
        params![now, listings as i64, success, error, run_id],
    )?;
    Ok(())
}

pub fn recent_ingestion_runs(conn: &Connection, limit: usize) -> Result<Vec<IngestionRun>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, started_at, finished_at, listings, success, error_message
         FROM ingestion_runs ORDER BY started_at DESC, id DESC LIMIT ?",
    )?;

    let rows = stmt.query_map(params![limit as i64], |row| {
        Ok(IngestionRun {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            listings: row.get(3)?,
            success: row.get(4)?,
            error_message: row.get(5)?,
        })
    })?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r?);
    }
    Ok(runs)
}
