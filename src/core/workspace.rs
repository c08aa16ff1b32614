//! Workspace layout: a repository root plus its hidden `.noxis/` state directory.

use crate::core::{broker, db};
use crate::core::error::NoxisError;
use std::fs;
use std::path::{Path, PathBuf};

pub const STATE_DIR_NAME: &str = ".noxis";
pub const PROJECT_FILE_NAME: &str = "project.yml";
pub const POLICIES_FILE_NAME: &str = "policies.yml";
pub const TESTS_DIR_NAME: &str = "tests";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Canonicalize a user-supplied path into a workspace. The path must be
    /// an existing directory.
    pub fn resolve(path: &Path) -> Result<Self, NoxisError> {
        let root = fs::canonicalize(path).map_err(|e| {
            NoxisError::PathError(format!("cannot resolve {}: {}", path.display(), e))
        })?;
        if !root.is_dir() {
            return Err(NoxisError::PathError(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR_NAME)
    }

    pub fn project_file(&self) -> PathBuf {
        self.state_dir().join(PROJECT_FILE_NAME)
    }

    pub fn policies_file(&self) -> PathBuf {
        self.state_dir().join(POLICIES_FILE_NAME)
    }

    pub fn memory_db_file(&self) -> PathBuf {
        db::memory_db_path(&self.state_dir())
    }

    pub fn audit_log_file(&self) -> PathBuf {
        self.state_dir().join(broker::AUDIT_LOG_FILE_NAME)
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.root.join(TESTS_DIR_NAME)
    }

    pub fn ensure_state_dir(&self) -> Result<PathBuf, NoxisError> {
        let dir = self.state_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn layout_lives_under_hidden_state_dir() {
        let ws = Workspace::new("/repo");
        assert_eq!(ws.state_dir(), PathBuf::from("/repo/.noxis"));
        assert_eq!(ws.project_file(), PathBuf::from("/repo/.noxis/project.yml"));
        assert_eq!(ws.policies_file(), PathBuf::from("/repo/.noxis/policies.yml"));
        assert_eq!(ws.memory_db_file(), PathBuf::from("/repo/.noxis/memory.db"));
        assert_eq!(
            ws.audit_log_file(),
            PathBuf::from("/repo/.noxis/broker.events.jsonl")
        );
        assert_eq!(ws.tests_dir(), PathBuf::from("/repo/tests"));
    }

    #[test]
    fn resolve_rejects_files_and_missing_paths() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        assert!(Workspace::resolve(&file).is_err());
        assert!(Workspace::resolve(&tmp.path().join("missing")).is_err());
        assert!(Workspace::resolve(tmp.path()).is_ok());
    }

    #[test]
    fn ensure_state_dir_is_idempotent() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        ws.ensure_state_dir().unwrap();
        ws.ensure_state_dir().unwrap();
        assert!(ws.state_dir().is_dir());
    }
}
