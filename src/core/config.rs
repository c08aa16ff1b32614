//! Workspace configuration (`.noxis/policies.yml`).
//!
//! The packaged default is embedded in the binary. Loading is a plain
//! function of its inputs; the resulting [`NoxisConfig`] is handed to the
//! orchestrator explicitly.

use crate::core::error::NoxisError;
use crate::core::workspace::Workspace;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;

pub const DEFAULT_POLICIES_ASSET: &str = "policies.yml";

#[derive(RustEmbed)]
#[folder = "assets/"]
#[include = "*.yml"]
struct DefaultAssets;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub package_manager: String,
    pub linter: String,
    pub test_runner: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            package_manager: "pip".to_string(),
            linter: "ruff".to_string(),
            test_runner: "pytest".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: Option<String>,
    pub model: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            api_key_env: "NOXIS_AI_API_KEY".to_string(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiTestsConfig {
    pub runner_args: Vec<String>,
    pub max_prompt_chars: usize,
    pub min_test_chars: usize,
}

impl Default for AiTestsConfig {
    fn default() -> Self {
        Self {
            runner_args: vec!["-q".to_string(), "tests".to_string()],
            max_prompt_chars: 12_000,
            min_test_chars: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub recent_runs: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { recent_runs: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoxisConfig {
    pub version: u32,
    pub tools: ToolsConfig,
    pub ai: AiConfig,
    pub ai_tests: AiTestsConfig,
    pub history: HistoryConfig,
    /// Replaces `PATH` when probing executables. Never read from disk.
    #[serde(skip)]
    pub search_path: Option<OsString>,
}

impl NoxisConfig {
    pub fn from_yaml(text: &str) -> Result<Self, NoxisError> {
        // An empty or comment-only file deserializes to unit; treat as defaults.
        if serde_yaml::from_str::<serde_yaml::Value>(text)?.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Apply `NOXIS_AI_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) = lookup("NOXIS_AI_ENDPOINT") {
            let endpoint = endpoint.trim().to_string();
            self.ai.endpoint = (!endpoint.is_empty()).then_some(endpoint);
        }
        if let Some(model) = lookup("NOXIS_AI_MODEL").filter(|m| !m.trim().is_empty()) {
            self.ai.model = model.trim().to_string();
        }
        if let Some(timeout) = lookup("NOXIS_AI_TIMEOUT_MS").and_then(|t| t.trim().parse().ok()) {
            self.ai.timeout_ms = timeout;
        }
        self
    }

    /// Bearer key for the generation endpoint, read from the env var named
    /// in `ai.api_key_env`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.ai.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// The packaged `policies.yml`, verbatim.
pub fn default_policies_yaml() -> Result<String, NoxisError> {
    let asset = DefaultAssets::get(DEFAULT_POLICIES_ASSET).ok_or_else(|| {
        NoxisError::NotFound(format!("embedded asset {}", DEFAULT_POLICIES_ASSET))
    })?;
    String::from_utf8(asset.data.into_owned())
        .map_err(|e| NoxisError::ValidationError(format!("default policies are not UTF-8: {}", e)))
}

pub fn load_defaults() -> Result<NoxisConfig, NoxisError> {
    NoxisConfig::from_yaml(&default_policies_yaml()?)
}

/// Workspace `policies.yml` when present, packaged defaults otherwise.
pub fn load(workspace: &Workspace) -> Result<NoxisConfig, NoxisError> {
    let path = workspace.policies_file();
    if path.exists() {
        let text = fs::read_to_string(&path)?;
        return NoxisConfig::from_yaml(&text);
    }
    load_defaults()
}
