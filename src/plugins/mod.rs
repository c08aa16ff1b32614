//! Plugin contract.
//!
//! A plugin judges its own applicability to a [`ProjectModel`], declares the
//! capabilities it offers, and executes one capability per request. Plugins
//! never mutate the model: a `scan` returns a signal delta and the
//! orchestrator owns the merge.

pub mod manager;
pub mod python;

use crate::core::project::{ProjectModel, SignalMap};
use crate::core::results::Finding;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub use manager::PluginManager;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applicability {
    pub is_applicable: bool,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Human-readable evidence; non-empty when applicable.
    pub reasons: Vec<String>,
    pub scope_hints: Option<Vec<String>>,
}

impl Applicability {
    pub fn applicable(confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            is_applicable: true,
            confidence: confidence.clamp(0.0, 1.0),
            reasons: vec![reason.into()],
            scope_hints: None,
        }
    }

    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self {
            is_applicable: false,
            confidence: 0.0,
            reasons: vec![reason.into()],
            scope_hints: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Deterministic,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitySpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: CapabilityKind,
    pub default_enabled: bool,
}

/// One capability dispatch. Built by the orchestrator, consumed once.
#[derive(Debug, Clone)]
pub struct ActionRequest<'a> {
    pub capability: String,
    pub project: &'a ProjectModel,
    pub options: Map<String, JsonValue>,
}

impl<'a> ActionRequest<'a> {
    pub fn new(capability: &str, project: &'a ProjectModel) -> Self {
        Self {
            capability: capability.to_string(),
            project,
            options: Map::new(),
        }
    }
}

/// What a capability run hands back: findings in emission order, plus any
/// new signals the orchestrator should merge into the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginOutput {
    pub findings: Vec<Finding>,
    pub signal_delta: SignalMap,
}

impl PluginOutput {
    pub fn findings(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            signal_delta: SignalMap::new(),
        }
    }
}

pub trait Plugin {
    fn id(&self) -> &'static str;
    fn version(&self) -> &'static str;
    fn display_name(&self) -> &'static str;

    fn detect(&self, project: &ProjectModel) -> Applicability;
    fn capabilities(&self, project: &ProjectModel) -> Vec<CapabilitySpec>;
    fn run(&self, request: &ActionRequest<'_>) -> PluginOutput;

    fn supports(&self, project: &ProjectModel, capability: &str) -> bool {
        self.capabilities(project)
            .iter()
            .any(|spec| spec.name == capability)
    }
}
