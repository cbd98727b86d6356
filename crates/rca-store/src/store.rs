use std::path::Path;

use rusqlite::{Connection, params};
use uuid::Uuid;

use rca_core::{MonitorSnapshot, StepReport, Verdict};

use crate::error::{Result, StoreError};
use crate::schema;

/// One archived monitoring run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunRecord {
    pub id: Uuid,
    pub contract: String,
    pub source: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub steps: u64,
    pub verdict: Verdict,
}

/// One archived step of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct StepRecord {
    pub step: u64,
    pub delta_env: u64,
    pub delta_sys: u64,
    pub any_pre: bool,
    pub fired: u64,
    pub tokens: u64,
    pub pre_fault: bool,
    pub post_fault: bool,
    pub verdict: Verdict,
    /// JSON rendering of the monitor after the step, when recorded.
    pub snapshot: Option<String>,
}

/// SQLite archive of monitoring runs and their step reports.
pub struct RunStore {
    conn: Connection,
}

impl RunStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open a new run and return its id.
    pub fn begin_run(&self, contract: &str, source: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO runs (id, contract, source) VALUES (?1, ?2, ?3)",
            params![id.to_string(), contract, source],
        )?;
        tracing::debug!(%id, contract, source, "began run");
        Ok(id)
    }

    pub fn record_step(
        &self,
        run_id: Uuid,
        delta_env: u64,
        delta_sys: u64,
        report: &StepReport,
        snapshot: Option<&MonitorSnapshot>,
    ) -> Result<()> {
        let snapshot = snapshot
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::InvalidData(format!("snapshot: {e}")))?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO steps (run_id, step, delta_env, delta_sys, any_pre, fired, tokens,
                                pre_fault, post_fault, verdict, snapshot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run_id.to_string(),
                report.step as i64,
                delta_env as i64,
                delta_sys as i64,
                report.any_pre as i32,
                report.fired as i64,
                report.tokens as i64,
                report.faults.precondition_accessed_incorrect_time as i32,
                report.faults.postcondition_accessed_incorrect_time as i32,
                report.verdict.as_str(),
                snapshot,
            ],
        )?;
        tx.execute(
            "UPDATE runs SET steps = ?2, verdict = ?3 WHERE id = ?1",
            params![
                run_id.to_string(),
                report.step as i64,
                report.verdict.as_str()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Close a run with its final verdict.
    pub fn finish_run(&self, run_id: Uuid, verdict: Verdict, steps: u64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE runs SET finished_at = datetime('now'), verdict = ?2, steps = ?3
             WHERE id = ?1",
            params![run_id.to_string(), verdict.as_str(), steps as i64],
        )?;
        if changed == 0 {
            return Err(StoreError::InvalidData(format!("no run {run_id}")));
        }
        tracing::debug!(%run_id, %verdict, steps, "finished run");
        Ok(())
    }

    /// All runs, most recent first.
    pub fn list_runs(&self) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, contract, source, started_at, finished_at, steps, verdict
             FROM runs ORDER BY started_at DESC, rowid DESC",
        )?;
        let rows: Vec<(String, String, String, String, Option<String>, i64, String)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(
                |(id, contract, source, started_at, finished_at, steps, verdict)| {
                    Ok(RunRecord {
                        id: parse_uuid(&id)?,
                        contract,
                        source,
                        started_at,
                        finished_at,
                        steps: steps.max(0) as u64,
                        verdict: Verdict::from_str_lossy(&verdict),
                    })
                },
            )
            .collect()
    }

    /// Resolve a run by full id or unique id prefix.
    pub fn find_run(&self, prefix: &str) -> Result<RunRecord> {
        let mut matches: Vec<RunRecord> = self
            .list_runs()?
            .into_iter()
            .filter(|r| r.id.to_string().starts_with(prefix))
            .collect();
        match matches.len() {
            0 => Err(StoreError::InvalidData(format!(
                "no run matches '{prefix}'"
            ))),
            1 => Ok(matches.remove(0)),
            n => Err(StoreError::InvalidData(format!(
                "'{prefix}' matches {n} runs"
            ))),
        }
    }

    pub fn run_steps(&self, run_id: Uuid) -> Result<Vec<StepRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT step, delta_env, delta_sys, any_pre, fired, tokens,
                    pre_fault, post_fault, verdict, snapshot
             FROM steps WHERE run_id = ?1 ORDER BY step",
        )?;
        let steps = stmt
            .query_map([run_id.to_string()], |row| {
                Ok(StepRecord {
                    step: row.get::<_, i64>(0)? as u64,
                    delta_env: row.get::<_, i64>(1)? as u64,
                    delta_sys: row.get::<_, i64>(2)? as u64,
                    any_pre: row.get::<_, i32>(3)? != 0,
                    fired: row.get::<_, i64>(4)? as u64,
                    tokens: row.get::<_, i64>(5)? as u64,
                    pre_fault: row.get::<_, i32>(6)? != 0,
                    post_fault: row.get::<_, i32>(7)? != 0,
                    verdict: Verdict::from_str_lossy(&row.get::<_, String>(8)?),
                    snapshot: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(steps)
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}
