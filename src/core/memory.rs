//! MemoryStore: append-only run ledger plus latest-value state, one SQLite
//! file per workspace.
//!
//! Every call is one broker operation; every write is one transaction.
//! Callers must not assume atomicity across calls.

use crate::core::broker::DbBroker;
use crate::core::error::NoxisError;
use crate::core::schemas;
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

const ACTOR: &str = "noxis";

pub const LAST_SCAN_KEY: &str = "last_scan";
pub const LAST_DOCTOR_KEY: &str = "last_doctor";

/// One row of the run ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i64,
    pub created_at: String,
    pub command: String,
    pub payload: JsonValue,
}

pub struct MemoryStore {
    db_path: PathBuf,
    broker: DbBroker,
}

impl MemoryStore {
    /// `db_path` is the `memory.db` file; the broker audit log lands next to it.
    pub fn new(db_path: &Path) -> Self {
        let state_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
        Self {
            db_path: db_path.to_path_buf(),
            broker: DbBroker::new(state_dir),
        }
    }

    /// Open the store and make sure the schema exists. Safe to call
    /// concurrently and repeatedly.
    pub fn open(db_path: &Path) -> Result<Self, NoxisError> {
        let store = Self::new(db_path);
        store.initialize()?;
        Ok(store)
    }

    pub fn initialize(&self) -> Result<(), NoxisError> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.broker
            .with_tx(&self.db_path, ACTOR, "memory.init", |conn| {
                for statement in schemas::MEMORY_DB_SCHEMA {
                    conn.execute(statement, [])?;
                }
                Ok(())
            })
    }

    /// Append one run. Returns the new row id.
    pub fn record_run(&self, command: &str, payload: &JsonValue) -> Result<i64, NoxisError> {
        let payload_json = serde_json::to_string(payload)?;
        self.broker
            .with_tx(&self.db_path, ACTOR, "memory.record_run", |conn| {
                conn.execute(schemas::INSERT_RUN_SQL, params![command, payload_json])?;
                Ok(conn.last_insert_rowid())
            })
    }

    pub fn record_ai_explanation(
        &self,
        prompt_hash: &str,
        response: &str,
    ) -> Result<i64, NoxisError> {
        self.broker
            .with_tx(&self.db_path, ACTOR, "memory.record_ai_explanation", |conn| {
                conn.execute(
                    "INSERT INTO ai_explanations(prompt_hash, response) VALUES(?1, ?2)",
                    params![prompt_hash, response],
                )?;
                Ok(conn.last_insert_rowid())
            })
    }

    /// Upsert by key. The stored value is replaced wholesale, never merged.
    pub fn set_state(&self, key: &str, value: &JsonValue) -> Result<(), NoxisError> {
        let value_json = serde_json::to_string(value)?;
        let sql = format!(
            "INSERT INTO project_state(key, value_json, updated_at) VALUES(?1, ?2, {now})
             ON CONFLICT(key) DO UPDATE SET
                value_json = excluded.value_json,
                updated_at = excluded.updated_at",
            now = schemas::NOW_SQL
        );
        self.broker
            .with_tx(&self.db_path, ACTOR, "memory.set_state", |conn| {
                conn.execute(&sql, params![key, value_json])?;
                Ok(())
            })
    }

    pub fn get_state(&self, key: &str) -> Result<Option<JsonValue>, NoxisError> {
        let raw: Option<String> =
            self.broker
                .with_conn(&self.db_path, ACTOR, "memory.get_state", |conn| {
                    Ok(conn
                        .query_row(
                            "SELECT value_json FROM project_state WHERE key = ?1",
                            params![key],
                            |row| row.get(0),
                        )
                        .optional()?)
                })?;
        raw.map(|text| serde_json::from_str(&text).map_err(NoxisError::from))
            .transpose()
    }

    /// Most recent runs of `command`, newest first, at most `limit`.
    pub fn recent_run_records(
        &self,
        command: &str,
        limit: usize,
    ) -> Result<Vec<RunRecord>, NoxisError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<(i64, String, String, Option<String>)> = self.broker.with_conn(
            &self.db_path,
            ACTOR,
            "memory.recent_runs",
            |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, created_at, command, payload_json FROM runs
                     WHERE command = ?1 ORDER BY id DESC LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![command, limit], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            },
        )?;

        rows.into_iter()
            .map(|(id, created_at, command, payload_json)| -> Result<RunRecord, NoxisError> {
                let payload = match payload_json {
                    Some(text) => serde_json::from_str(&text)?,
                    None => JsonValue::Null,
                };
                Ok(RunRecord {
                    id,
                    created_at,
                    command,
                    payload,
                })
            })
            .collect()
    }

    pub fn get_recent_runs(&self, command: &str, limit: usize) -> Result<Vec<JsonValue>, NoxisError> {
        Ok(self
            .recent_run_records(command, limit)?
            .into_iter()
            .map(|record| record.payload)
            .collect())
    }

    pub fn count_ai_explanations(&self) -> Result<i64, NoxisError> {
        self.broker
            .with_conn(&self.db_path, ACTOR, "memory.count_ai_explanations", |conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM ai_explanations", [], |row| {
                    row.get(0)
                })?)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn initialize_twice_is_harmless() {
        let tmp = tempdir().unwrap();
        let store = MemoryStore::open(&tmp.path().join("memory.db")).unwrap();
        store.initialize().unwrap();
        assert!(store.get_state("missing").unwrap().is_none());
    }

    #[test]
    fn null_payload_reads_back_as_null() {
        let tmp = tempdir().unwrap();
        let store = MemoryStore::open(&tmp.path().join("memory.db")).unwrap();
        store.record_run("scan", &JsonValue::Null).unwrap();
        let runs = store.get_recent_runs("scan", 5).unwrap();
        assert_eq!(runs, vec![JsonValue::Null]);
    }

    #[test]
    fn recent_runs_filter_by_command() {
        let tmp = tempdir().unwrap();
        let store = MemoryStore::open(&tmp.path().join("memory.db")).unwrap();
        store.record_run("scan", &json!({"n": 1})).unwrap();
        store.record_run("doctor", &json!({"n": 2})).unwrap();
        assert_eq!(store.get_recent_runs("doctor", 10).unwrap(), vec![json!({"n": 2})]);
    }
}
