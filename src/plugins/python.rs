//! Python ecosystem plugin: tooling readiness (`doctor`) and extra marker
//! detection (`scan`).

use crate::core::config::ToolsConfig;
use crate::core::project::{ProjectModel, SignalMap};
use crate::core::results::Finding;
use crate::core::tools::ToolProbe;
use crate::plugins::{
    ActionRequest, Applicability, CapabilityKind, CapabilitySpec, Plugin, PluginOutput,
};

pub const LANGUAGE: &str = "python";

/// Markers re-checked by `scan`; a superset of what discovery looks for.
pub const SCAN_MARKERS: &[&str] = &[
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "Pipfile",
    "setup.cfg",
    "tox.ini",
    "poetry.lock",
    "requirements-dev.txt",
];

pub struct PythonPlugin {
    tools: ToolsConfig,
    probe: ToolProbe,
}

impl PythonPlugin {
    pub fn new(tools: ToolsConfig, probe: ToolProbe) -> Self {
        Self { tools, probe }
    }

    fn doctor(&self) -> PluginOutput {
        let package_manager = &self.tools.package_manager;
        let linter = &self.tools.linter;
        let test_runner = &self.tools.test_runner;

        let mut findings = Vec::with_capacity(3);

        findings.push(match self.probe.resolve(package_manager) {
            Some(path) => Finding::info("doctor", format!("{} is available.", package_manager))
                .at(path.display().to_string()),
            None => Finding::error(
                "doctor",
                format!(
                    "{} not found. Install {} to manage Python dependencies.",
                    package_manager, package_manager
                ),
            ),
        });

        findings.push(match self.probe.resolve(linter) {
            Some(path) => Finding::info("doctor", format!("{} is available.", linter))
                .at(path.display().to_string()),
            None => Finding::warn(
                "doctor",
                format!("{} not found. Linting will be unavailable.", linter),
            )
            .at(format!("pip install {}", linter)),
        });

        findings.push(match self.probe.resolve(test_runner) {
            Some(path) => Finding::info("doctor", format!("{} is available.", test_runner))
                .at(path.display().to_string()),
            None => Finding::warn(
                "doctor",
                format!("{} not found. Tests cannot be executed.", test_runner),
            )
            .at(format!("pip install {}", test_runner)),
        });

        PluginOutput::findings(findings)
    }

    fn scan(&self, project: &ProjectModel) -> PluginOutput {
        let known = project.signals.get(LANGUAGE).unwrap_or(&[]);
        let root = project.root();

        let fresh: Vec<String> = SCAN_MARKERS
            .iter()
            .filter(|marker| !known.iter().any(|k| k == *marker))
            .filter(|marker| root.join(marker).exists())
            .map(|marker| marker.to_string())
            .collect();

        if fresh.is_empty() {
            return PluginOutput::findings(vec![
                Finding::info("scan", "No additional Python-specific signals detected.")
                    .at(project.root_path.clone()),
            ]);
        }

        let findings = fresh
            .iter()
            .map(|marker| {
                Finding::info("scan", format!("Detected Python signal: {}", marker))
                    .at(root.join(marker).display().to_string())
            })
            .collect();
        let mut signal_delta = SignalMap::new();
        signal_delta.extend_group(LANGUAGE, &fresh);

        PluginOutput {
            findings,
            signal_delta,
        }
    }
}

impl Plugin for PythonPlugin {
    fn id(&self) -> &'static str {
        "python"
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }

    fn display_name(&self) -> &'static str {
        "Python"
    }

    fn detect(&self, project: &ProjectModel) -> Applicability {
        if project.has_language(LANGUAGE) {
            return Applicability::applicable(1.0, "Python detected by scan");
        }
        if project.signals.has_evidence(LANGUAGE) {
            return Applicability::applicable(0.7, "Python signals found");
        }
        Applicability::not_applicable("No Python signals detected")
    }

    fn capabilities(&self, _project: &ProjectModel) -> Vec<CapabilitySpec> {
        vec![
            CapabilitySpec {
                name: "doctor",
                description: "Check Python tooling readiness (package manager, linter, test runner).",
                kind: CapabilityKind::Deterministic,
                default_enabled: true,
            },
            CapabilitySpec {
                name: "scan",
                description: "Detect Python-specific signals.",
                kind: CapabilityKind::Deterministic,
                default_enabled: true,
            },
        ]
    }

    fn run(&self, request: &ActionRequest<'_>) -> PluginOutput {
        match request.capability.as_str() {
            "doctor" => self.doctor(),
            "scan" => self.scan(request.project),
            other => PluginOutput::findings(vec![Finding::warn(
                other,
                format!("Capability '{}' not supported by plugin '{}'", other, self.id()),
            )]),
        }
    }
}
