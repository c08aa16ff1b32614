//! Findings: the atom of every user- and machine-visible output.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable result line. `kind` names the originating phase
/// (`scan`, `doctor`, `ai-tests`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl Finding {
    pub fn new(kind: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            severity,
            message: message.into(),
            location: None,
        }
    }

    pub fn info(kind: &str, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    pub fn warn(kind: &str, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warn, message)
    }

    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, message)
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Payload shape for runs that persist their findings (`doctor`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunFindings {
    pub results: Vec<Finding>,
}

/// A command failed iff any finding has `error` severity.
pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity == Severity::Error)
}

/// Result of one orchestration step.
///
/// `Degraded` carries the warning the caller may surface (scan) or only log
/// (best-effort audit paths). `Fatal` carries the single error that ends the
/// command.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Degraded(Finding),
    Fatal(Finding),
}

impl Outcome {
    pub fn degraded_on_err<T, E: fmt::Display>(
        result: Result<T, E>,
        to_finding: impl FnOnce(E) -> Finding,
    ) -> Self {
        match result {
            Ok(_) => Outcome::Ok,
            Err(e) => Outcome::Degraded(to_finding(e)),
        }
    }

    pub fn fatal_on_err<T, E: fmt::Display>(
        result: Result<T, E>,
        to_finding: impl FnOnce(E) -> Finding,
    ) -> Self {
        match result {
            Ok(_) => Outcome::Ok,
            Err(e) => Outcome::Fatal(to_finding(e)),
        }
    }

    /// Drop a degraded warning after logging it. Used on paths where the
    /// audit trail must never change the user-facing result.
    pub fn absorb(self, context: &str) {
        if let Outcome::Degraded(finding) | Outcome::Fatal(finding) = self {
            tracing::debug!(context, message = %finding.message, "best-effort step failed");
        }
    }
}
