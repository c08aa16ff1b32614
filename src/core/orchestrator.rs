//! Orchestrator: the only place that composes discovery, plugins, the
//! memory store, and the AI collaborators.
//!
//! Every operation returns an ordered sequence of findings; a command failed
//! iff that sequence holds an `error`. Failures are classified as:
//! - fatal: the command stops with a single `error` finding;
//! - degraded: a `warn` finding is appended and later steps still run;
//! - best-effort audit: logged at debug level and otherwise ignored.

use crate::ai::context::build_context;
use crate::ai::provider::{GenerationProvider, offline_explanation, provider_from_config};
use crate::ai::test_gen::{Stage, TestGenLoop, TestGenReport};
use crate::core::config::{self, NoxisConfig};
use crate::core::discovery;
use crate::core::error::NoxisError;
use crate::core::memory::{LAST_DOCTOR_KEY, LAST_SCAN_KEY, MemoryStore};
use crate::core::project::ProjectModel;
use crate::core::results::{Finding, Outcome, RunFindings};
use crate::core::tools::ToolProbe;
use crate::core::workspace::Workspace;
use crate::plugins::{ActionRequest, PluginManager};
use serde_json::{Value as JsonValue, json};
use sha2::{Digest, Sha256};
use std::fs;

pub struct Orchestrator {
    workspace: Workspace,
    config: NoxisConfig,
    provider: Box<dyn GenerationProvider>,
}

/// Output of `ai-explain`: the text for the user plus any findings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainReport {
    pub findings: Vec<Finding>,
    pub explanation: Option<String>,
    pub prompt_hash: Option<String>,
}

impl ExplainReport {
    fn failed(finding: Finding) -> Self {
        Self {
            findings: vec![finding],
            explanation: None,
            prompt_hash: None,
        }
    }
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Orchestrator {
    pub fn new(workspace: Workspace, config: NoxisConfig) -> Self {
        let provider = provider_from_config(&config);
        Self {
            workspace,
            config,
            provider,
        }
    }

    /// Swap the generation provider (e.g. an in-process fake).
    pub fn with_provider(mut self, provider: Box<dyn GenerationProvider>) -> Self {
        self.provider = provider;
        self
    }

    fn ensure_state_dir(&self, kind: &str) -> Outcome {
        let state_dir = self.workspace.state_dir();
        Outcome::fatal_on_err(self.workspace.ensure_state_dir(), |e| {
            Finding::error(kind, format!("Failed to create {}: {}", state_dir.display(), e))
        })
    }

    fn open_store(&self) -> Result<MemoryStore, NoxisError> {
        MemoryStore::open(&self.workspace.memory_db_file())
    }

    /// Append a run record and, when `state_key` is given, replace that
    /// state snapshot with the same payload.
    fn persist_run(&self, command: &str, payload: &JsonValue, state_key: Option<&str>) -> Outcome {
        let db_file = self.workspace.memory_db_file();
        let result = self.open_store().and_then(|store| {
            store.record_run(command, payload)?;
            if let Some(key) = state_key {
                store.set_state(key, payload)?;
            }
            Ok(())
        });
        Outcome::degraded_on_err(result, |e| {
            Finding::warn(command, format!("Could not record {} state: {}", command, e))
                .at(db_file.display().to_string())
        })
    }

    fn load_project(&self, kind: &str) -> Result<ProjectModel, Finding> {
        let project_file = self.workspace.project_file();
        ProjectModel::load(&project_file).map_err(|e| match e {
            NoxisError::NotFound(_) => {
                Finding::error(kind, "project.yml not found. Run `noxis scan` first.")
                    .at(project_file.display().to_string())
            }
            other => Finding::error(kind, format!("Could not load project.yml: {}", other))
                .at(project_file.display().to_string()),
        })
    }

    pub fn init(&self) -> Vec<Finding> {
        const KIND: &str = "init";
        let state_dir = self.workspace.state_dir();
        if let Outcome::Fatal(finding) = self.ensure_state_dir(KIND) {
            return vec![finding];
        }
        let mut findings = vec![
            Finding::info(KIND, "Created/verified .noxis directory.")
                .at(state_dir.display().to_string()),
        ];

        let policies = self.workspace.policies_file();
        let policies_at = policies.display().to_string();
        if policies.exists() {
            findings.push(Finding::info(KIND, "policies.yml already exists.").at(policies_at));
        } else {
            match config::default_policies_yaml().and_then(|text| Ok(fs::write(&policies, text)?)) {
                Ok(()) => findings.push(
                    Finding::info(KIND, "Created policies.yml from defaults.").at(policies_at),
                ),
                Err(e) => findings.push(Finding::error(
                    KIND,
                    format!("Failed to write policies.yml: {}", e),
                )),
            }
        }

        let project_file = self.workspace.project_file();
        match discovery::discover(&self.workspace.root).and_then(|p| p.save(&project_file)) {
            Ok(()) => findings.push(
                Finding::info(KIND, "Created/updated project.yml.")
                    .at(project_file.display().to_string()),
            ),
            Err(e) => findings.push(Finding::error(
                KIND,
                format!("Failed to write project.yml: {}", e),
            )),
        }

        let db_file = self.workspace.memory_db_file();
        match self.open_store() {
            Ok(_) => findings.push(
                Finding::info(KIND, "Initialized memory.db.").at(db_file.display().to_string()),
            ),
            Err(e) => findings.push(Finding::error(
                KIND,
                format!("Failed to initialize memory.db: {}", e),
            )),
        }

        findings
    }

    pub fn scan(&self) -> Vec<Finding> {
        const KIND: &str = "scan";
        if let Outcome::Fatal(finding) = self.ensure_state_dir(KIND) {
            return vec![finding];
        }

        let mut project = match discovery::discover(&self.workspace.root) {
            Ok(project) => project,
            Err(e) => {
                return vec![Finding::error(KIND, format!("Project discovery failed: {}", e))];
            }
        };

        let mut findings = Vec::new();
        for plugin in PluginManager::new(&self.config).load_all() {
            let applicability = plugin.detect(&project);
            if !applicability.is_applicable || !plugin.supports(&project, KIND) {
                continue;
            }

            tracing::debug!(plugin = plugin.id(), version = plugin.version(), "dispatching scan");
            findings.push(
                Finding::info(KIND, format!("Running scan for plugin: {}", plugin.id()))
                    .at(applicability.reasons.join(", ")),
            );
            let output = plugin.run(&ActionRequest::new(KIND, &project));
            findings.extend(output.findings);
            if !output.signal_delta.is_empty() {
                // Later plugins observe the merged model.
                project = project.merge_signals(&output.signal_delta);
            }
        }

        let project_file = self.workspace.project_file();
        let project_at = project_file.display().to_string();
        match Outcome::degraded_on_err(project.save(&project_file), |e| {
            Finding::warn(KIND, format!("Could not update project.yml: {}", e))
                .at(project_at.clone())
        }) {
            Outcome::Ok => findings.push(
                Finding::info(KIND, "Updated .noxis/project.yml.").at(project_at.clone()),
            ),
            Outcome::Degraded(warning) | Outcome::Fatal(warning) => findings.push(warning),
        }

        let languages = if project.languages_detected.is_empty() {
            "none".to_string()
        } else {
            project.languages_detected.join(", ")
        };
        findings.push(
            Finding::info(KIND, format!("Detected languages: {}", languages))
                .at(project.root_path.clone()),
        );
        findings.push(
            Finding::info(KIND, format!("Repo type: {}", project.repo_type))
                .at(project.root_path.clone()),
        );
        for (group, paths) in project.signals.iter() {
            if paths.is_empty() {
                continue;
            }
            findings.push(
                Finding::info(KIND, format!("Signals[{}]: {}", group, paths.join(", ")))
                    .at(project.root_path.clone()),
            );
        }

        let outcome = match project.to_payload() {
            Ok(payload) => self.persist_run(KIND, &payload, Some(LAST_SCAN_KEY)),
            Err(e) => Outcome::Degraded(Finding::warn(
                KIND,
                format!("Could not record scan state: {}", e),
            )),
        };
        match outcome {
            Outcome::Ok => findings.push(
                Finding::info(KIND, "Recorded scan run in memory.db.")
                    .at(self.workspace.memory_db_file().display().to_string()),
            ),
            Outcome::Degraded(warning) | Outcome::Fatal(warning) => findings.push(warning),
        }

        findings
    }

    pub fn doctor(&self) -> Vec<Finding> {
        const KIND: &str = "doctor";
        if let Outcome::Fatal(finding) = self.ensure_state_dir(KIND) {
            return vec![finding];
        }
        let project = match self.load_project(KIND) {
            Ok(project) => project,
            Err(finding) => return vec![finding],
        };

        let mut findings = Vec::new();
        let plugins = PluginManager::new(&self.config).load_all();
        let mut applicable = Vec::new();
        for plugin in &plugins {
            let applicability = plugin.detect(&project);
            if applicability.is_applicable {
                findings.push(
                    Finding::info(
                        KIND,
                        format!(
                            "Plugin applicable: {} (confidence={:.2})",
                            plugin.id(),
                            applicability.confidence
                        ),
                    )
                    .at(applicability.reasons.join(", ")),
                );
                applicable.push(plugin);
            }
        }

        if applicable.is_empty() {
            findings.push(
                Finding::warn(KIND, "No applicable plugins found for this project.")
                    .at(project.root_path.clone()),
            );
        }

        for plugin in applicable {
            if !plugin.supports(&project, KIND) {
                continue;
            }
            findings.extend(plugin.run(&ActionRequest::new(KIND, &project)).findings);
        }

        let payload = RunFindings {
            results: findings.clone(),
        };
        match serde_json::to_value(&payload) {
            Ok(payload) => self
                .persist_run(KIND, &payload, Some(LAST_DOCTOR_KEY))
                .absorb("doctor history"),
            Err(e) => tracing::debug!(error = %e, "doctor payload not serializable"),
        }

        findings
    }

    pub fn ai_explain(&self) -> ExplainReport {
        const KIND: &str = "ai-explain";
        if !self.workspace.project_file().exists() {
            return ExplainReport::failed(Finding::error(
                KIND,
                "project.yml not found. Run `noxis scan` first.",
            ));
        }

        let store = match self.open_store() {
            Ok(store) => store,
            Err(e) => {
                return ExplainReport::failed(Finding::error(
                    KIND,
                    format!("Could not open memory.db: {}", e),
                ));
            }
        };

        let limit = self.config.history.recent_runs;
        let gathered = (|| -> Result<_, NoxisError> {
            Ok((
                store.get_state(LAST_SCAN_KEY)?,
                store.get_state(LAST_DOCTOR_KEY)?,
                store.get_recent_runs("scan", limit)?,
                store.get_recent_runs("doctor", limit)?,
            ))
        })();
        let (last_scan, last_doctor, scan_history, doctor_history) = match gathered {
            Ok(state) => state,
            Err(e) => {
                return ExplainReport::failed(Finding::error(
                    KIND,
                    format!("Could not read memory.db: {}", e),
                ));
            }
        };

        let prompt = build_context(
            last_scan.as_ref(),
            last_doctor.as_ref(),
            &scan_history,
            &doctor_history,
        );

        let mut findings = Vec::new();
        let explanation = match self.provider.explain(&prompt) {
            Ok(text) => text,
            Err(e) => {
                findings.push(Finding::warn(
                    KIND,
                    format!("AI provider failed ({}); showing the offline explanation.", e),
                ));
                offline_explanation(&prompt)
            }
        };

        let prompt_hash = sha256_hex(&prompt);
        Outcome::degraded_on_err(
            store.record_ai_explanation(&prompt_hash, &explanation),
            |e| Finding::warn(KIND, e.to_string()),
        )
        .absorb("ai explanation audit");

        ExplainReport {
            findings,
            explanation: Some(explanation),
            prompt_hash: Some(prompt_hash),
        }
    }

    pub fn ai_tests(&self) -> TestGenReport {
        const KIND: &str = "ai-tests";
        let project = match self.load_project(KIND) {
            Ok(project) => project,
            Err(finding) => return TestGenReport::stopped(Stage::Start, finding),
        };

        let probe = ToolProbe::new(self.config.search_path.clone());
        let report = TestGenLoop {
            workspace: &self.workspace,
            settings: &self.config.ai_tests,
            provider: self.provider.as_ref(),
            probe: &probe,
            test_runner: &self.config.tools.test_runner,
        }
        .run(&project);

        if report.accepted() {
            let payload = json!({
                "generated_files": report
                    .written
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>(),
                "target": report.target.as_ref().map(|t| t.rel_path.clone()),
                "fallback": report.used_fallback,
            });
            self.persist_run(KIND, &payload, None)
                .absorb("ai-tests history");
        }
        report
    }
}
