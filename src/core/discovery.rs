//! Discovery: filesystem root -> ProjectModel, via marker-file heuristics.

use crate::core::error::NoxisError;
use crate::core::project::{LANGUAGE_GROUPS, ProjectModel, RepoType, SignalMap};
use std::path::Path;

/// Marker files checked directly under the root, per ecosystem group.
/// Table order is the signal group order in every model.
pub const MARKERS: &[(&str, &[&str])] = &[
    (
        "python",
        &["pyproject.toml", "requirements.txt", "setup.py", "Pipfile"],
    ),
    ("php", &["composer.json"]),
    ("lua", &[".luacheckrc", "rockspec", "rocks.toml"]),
    ("node", &["package.json"]),
    ("docker", &["Dockerfile", "docker-compose.yml", "compose.yml"]),
];

/// Directories whose presence marks a monorepo.
pub const MONO_DIRS: &[&str] = &["packages", "apps"];

pub fn discover(root: &Path) -> Result<ProjectModel, NoxisError> {
    // Fail loudly on an unreadable root rather than reporting an empty project.
    std::fs::read_dir(root)?;

    let mut signals = SignalMap::new();
    for (group, files) in MARKERS {
        let hits: Vec<String> = files
            .iter()
            .filter(|name| root.join(name).exists())
            .map(|name| name.to_string())
            .collect();
        if !hits.is_empty() {
            signals.extend_group(group, &hits);
        }
    }

    let languages_detected = LANGUAGE_GROUPS
        .iter()
        .filter(|lang| signals.has_evidence(lang))
        .map(|lang| lang.to_string())
        .collect();

    let repo_type = if MONO_DIRS.iter().any(|d| root.join(d).is_dir()) {
        RepoType::Mono
    } else {
        RepoType::Single
    };

    tracing::debug!(root = %root.display(), groups = signals.len(), %repo_type, "discovered project");

    Ok(ProjectModel {
        root_path: root.to_string_lossy().to_string(),
        repo_type,
        languages_detected,
        signals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn empty_root_is_single_with_nothing_detected() {
        let tmp = tempdir().unwrap();
        let model = discover(tmp.path()).unwrap();
        assert_eq!(model.repo_type, RepoType::Single);
        assert!(model.languages_detected.is_empty());
        assert!(model.signals.is_empty());
    }

    #[test]
    fn docker_is_a_signal_but_not_a_language() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        let model = discover(tmp.path()).unwrap();
        assert!(model.languages_detected.is_empty());
        assert_eq!(model.signals.get("docker").unwrap(), &["Dockerfile".to_string()]);
    }

    #[test]
    fn missing_root_surfaces_io_error() {
        let tmp = tempdir().unwrap();
        assert!(discover(&tmp.path().join("gone")).is_err());
    }
}
