//! ProjectModel: the immutable snapshot of what is known about a repository.
//!
//! Persisted as `.noxis/project.yml`. Instances are never edited in place;
//! merging plugin signal deltas produces a new model.

use crate::core::error::NoxisError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Signal groups that count as languages, in reporting order.
/// `docker` is tracked as a signal group but never promoted to a language.
pub const LANGUAGE_GROUPS: &[&str] = &["python", "php", "lua", "node"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    Single,
    Mono,
}

impl RepoType {
    pub fn as_str(self) -> &'static str {
        match self {
            RepoType::Single => "single",
            RepoType::Mono => "mono",
        }
    }
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group name -> relative marker paths, kept in insertion order.
///
/// Serialized as a plain mapping so `project.yml` stays human-editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SignalMap {
    groups: IndexMap<String, Vec<String>>,
}

impl SignalMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    /// True when the group exists and holds at least one path.
    pub fn has_evidence(&self, group: &str) -> bool {
        self.get(group).is_some_and(|paths| !paths.is_empty())
    }

    /// Append paths to a group (created at the end if absent), skipping
    /// paths already recorded. Returns the paths actually added.
    pub fn extend_group(&mut self, group: &str, paths: &[String]) -> Vec<String> {
        let existing = self.groups.entry(group.to_string()).or_default();
        let mut added = Vec::new();
        for path in paths {
            if !existing.contains(path) {
                existing.push(path.clone());
                added.push(path.clone());
            }
        }
        added
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(name, paths)| (name.as_str(), paths.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

impl FromIterator<(String, Vec<String>)> for SignalMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut map = SignalMap::new();
        for (group, paths) in iter {
            map.extend_group(&group, &paths);
        }
        map
    }
}

// A bare `signals:` key reads as empty; duplicate paths are folded.
impl<'de> Deserialize<'de> for SignalMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let groups = Option::<IndexMap<String, Vec<String>>>::deserialize(deserializer)?;
        Ok(groups.into_iter().flatten().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModel {
    pub root_path: String,
    pub repo_type: RepoType,
    #[serde(default)]
    pub languages_detected: Vec<String>,
    #[serde(default)]
    pub signals: SignalMap,
}

impl ProjectModel {
    pub fn root(&self) -> &Path {
        Path::new(&self.root_path)
    }

    pub fn has_language(&self, language: &str) -> bool {
        self.languages_detected.iter().any(|l| l == language)
    }

    /// Produce a new model with `delta` merged into the signals. Allow-listed
    /// groups that gain evidence are promoted to detected languages, appended
    /// after the ones already known.
    pub fn merge_signals(&self, delta: &SignalMap) -> ProjectModel {
        let mut next = self.clone();
        for (group, paths) in delta.iter() {
            next.signals.extend_group(group, paths);
        }
        for language in LANGUAGE_GROUPS {
            if next.signals.has_evidence(language) && !next.has_language(language) {
                next.languages_detected.push(language.to_string());
            }
        }
        next
    }

    /// Every detected language must be backed by at least one signal.
    pub fn check_invariants(&self) -> Result<(), NoxisError> {
        for language in &self.languages_detected {
            if !self.signals.has_evidence(language) {
                return Err(NoxisError::ValidationError(format!(
                    "language '{}' is detected but has no signals",
                    language
                )));
            }
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String, NoxisError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self, NoxisError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_payload(&self) -> Result<serde_json::Value, NoxisError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, NoxisError> {
        if !path.exists() {
            return Err(NoxisError::NotFound(format!(
                "{} not found. Run `noxis scan` first.",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), NoxisError> {
        self.check_invariants()?;
        fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}
