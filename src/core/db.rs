use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &Path) -> Result<Connection, error::NoxisError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::NoxisError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::NoxisError::RusqliteError)?;
    Ok(conn)
}

pub fn memory_db_path(state_dir: &Path) -> PathBuf {
    state_dir.join(schemas::MEMORY_DB_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn connect_enables_wal() {
        let tmp = tempdir().unwrap();
        let conn = db_connect(&memory_db_path(tmp.path())).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
