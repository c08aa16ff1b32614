use crate::core::db;
use crate::core::error;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const AUDIT_LOG_FILE_NAME: &str = "broker.events.jsonl";

/// Every access to the memory store goes through the broker.
///
/// It serializes in-process access, opens a fresh connection per call, and
/// appends one JSON line per operation to `broker.events.jsonl` in the state
/// directory. Cross-process callers are not serialized: two invocations
/// against the same workspace may interleave call by call.
pub struct DbBroker {
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            audit_log_path: state_dir.join(AUDIT_LOG_FILE_NAME),
        }
    }

    /// Execute a closure with a serialized connection to the specified DB.
    pub fn with_conn<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        f: F,
    ) -> Result<R, error::NoxisError>
    where
        F: FnOnce(&Connection) -> Result<R, error::NoxisError>,
    {
        static DB_LOCK: Mutex<()> = Mutex::new(());
        let _lock = DB_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let conn = db::db_connect(db_path)?;
        let result = f(&conn);
        self.finish(db_path, actor, op_name, result)
    }

    /// Like [`DbBroker::with_conn`], but the closure runs inside a single
    /// transaction that commits only when it returns `Ok`.
    pub fn with_tx<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        f: F,
    ) -> Result<R, error::NoxisError>
    where
        F: FnOnce(&Connection) -> Result<R, error::NoxisError>,
    {
        self.with_conn(db_path, actor, op_name, |conn| {
            let tx = conn.unchecked_transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }

    fn finish<R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        result: Result<R, error::NoxisError>,
    ) -> Result<R, error::NoxisError> {
        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let status = if result.is_ok() { "success" } else { "error" };
        tracing::debug!(op = op_name, db = %db_id, status, "broker op");
        // The audit trail never overrides the store's own result.
        if let Err(e) = self.log_event(actor, op_name, &db_id, status) {
            tracing::warn!(
                op = op_name,
                path = %self.audit_log_path.display(),
                error = %e,
                "could not append broker audit event"
            );
        }
        result
    }

    fn log_event(
        &self,
        actor: &str,
        op: &str,
        db_id: &str,
        status: &str,
    ) -> Result<(), error::NoxisError> {
        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)
            .map_err(error::NoxisError::IoError)?;

        writeln!(f, "{}", serde_json::to_string(&ev)?).map_err(error::NoxisError::IoError)?;
        Ok(())
    }
}

/// Read back the audit trail, oldest first. Malformed lines are skipped.
pub fn read_audit_log(state_dir: &Path) -> Result<Vec<BrokerEvent>, error::NoxisError> {
    let path = DbBroker::new(state_dir).audit_log_path;
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str::<BrokerEvent>(line).ok())
        .collect())
}
