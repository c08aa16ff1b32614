//! Renders persisted state and recent history into the plain-text context
//! handed to the explanation provider. Pure and deterministic: identical
//! inputs produce identical text.

use crate::core::project::ProjectModel;
use crate::core::results::{Finding, RunFindings, Severity};
use serde_json::Value as JsonValue;

const NOT_AVAILABLE: &str = "NOT AVAILABLE.";

/// `scan_history` and `doctor_history` are most-recent-first run payloads.
pub fn build_context(
    last_scan: Option<&JsonValue>,
    last_doctor: Option<&JsonValue>,
    scan_history: &[JsonValue],
    doctor_history: &[JsonValue],
) -> String {
    let mut lines: Vec<String> = vec![
        "You are an expert software engineer reviewing a local repository.".to_string(),
        "Explain the current state of the project clearly and concisely, using only the facts below.".to_string(),
        String::new(),
    ];

    lines.push("## Scan summary".to_string());
    lines.extend(scan_section(last_scan));
    lines.push(String::new());

    lines.push("## Doctor summary".to_string());
    lines.extend(doctor_section(last_doctor));
    lines.push(String::new());

    lines.push("## Changes since previous runs".to_string());
    lines.extend(scan_changes(scan_history));
    lines.extend(doctor_changes(doctor_history));
    lines.push(String::new());

    lines.push("## Instructions".to_string());
    lines.push(
        "Explain what is working, what is missing, and what the developer should do next."
            .to_string(),
    );

    lines.join("\n")
}

fn as_project(value: Option<&JsonValue>) -> Option<ProjectModel> {
    value.and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn as_findings(value: Option<&JsonValue>) -> Option<Vec<Finding>> {
    value
        .and_then(|v| serde_json::from_value::<RunFindings>(v.clone()).ok())
        .map(|payload| payload.results)
}

fn scan_section(last_scan: Option<&JsonValue>) -> Vec<String> {
    let Some(project) = as_project(last_scan) else {
        return vec![format!(
            "{} No scan has been recorded for this workspace. Run `noxis scan` first.",
            NOT_AVAILABLE
        )];
    };

    let languages = if project.languages_detected.is_empty() {
        "none".to_string()
    } else {
        project.languages_detected.join(", ")
    };

    let mut lines = vec![
        format!("- Root path: {}", project.root_path),
        format!("- Repo type: {}", project.repo_type),
        format!("- Languages detected: {}", languages),
    ];
    if project.signals.is_empty() {
        lines.push("- Signals: none".to_string());
    } else {
        lines.push("- Signals:".to_string());
        for (group, paths) in project.signals.iter() {
            lines.push(format!("  - {}: {}", group, paths.join(", ")));
        }
    }
    lines
}

fn finding_line(finding: &Finding) -> String {
    let severity = finding.severity.as_str().to_uppercase();
    match &finding.location {
        Some(location) => format!("[{}] {} ({})", severity, finding.message, location),
        None => format!("[{}] {}", severity, finding.message),
    }
}

fn doctor_section(last_doctor: Option<&JsonValue>) -> Vec<String> {
    match as_findings(last_doctor) {
        None => vec![format!(
            "{} No doctor run has been recorded. Run `noxis doctor` to check tooling.",
            NOT_AVAILABLE
        )],
        Some(findings) if findings.is_empty() => vec!["- (no checks reported)".to_string()],
        Some(findings) => findings
            .iter()
            .map(|f| format!("- {}", finding_line(f)))
            .collect(),
    }
}

fn list_delta(latest: &[String], previous: &[String]) -> (Vec<String>, Vec<String>) {
    let added = latest
        .iter()
        .filter(|x| !previous.contains(x))
        .cloned()
        .collect();
    let removed = previous
        .iter()
        .filter(|x| !latest.contains(x))
        .cloned()
        .collect();
    (added, removed)
}

fn scan_changes(history: &[JsonValue]) -> Vec<String> {
    if history.len() < 2 {
        return vec![format!(
            "- Scan: not enough history to compare ({} run(s) recorded).",
            history.len()
        )];
    }
    let (Some(latest), Some(previous)) = (as_project(history.first()), as_project(history.get(1)))
    else {
        return vec!["- Scan: history entries could not be read.".to_string()];
    };

    let mut changes = Vec::new();

    if latest.repo_type != previous.repo_type {
        changes.push(format!(
            "  - repo type changed from {} to {}",
            previous.repo_type, latest.repo_type
        ));
    }

    let (added, removed) = list_delta(&latest.languages_detected, &previous.languages_detected);
    if !added.is_empty() {
        changes.push(format!("  - languages added: {}", added.join(", ")));
    }
    if !removed.is_empty() {
        changes.push(format!("  - languages removed: {}", removed.join(", ")));
    }

    let mut groups: Vec<&str> = latest.signals.iter().map(|(g, _)| g).collect();
    for (group, _) in previous.signals.iter() {
        if !groups.contains(&group) {
            groups.push(group);
        }
    }
    for group in groups {
        let now = latest.signals.get(group).unwrap_or(&[]);
        let before = previous.signals.get(group).unwrap_or(&[]);
        let (added, removed) = list_delta(now, before);
        if !added.is_empty() {
            changes.push(format!("  - signals[{}] added: {}", group, added.join(", ")));
        }
        if !removed.is_empty() {
            changes.push(format!(
                "  - signals[{}] removed: {}",
                group,
                removed.join(", ")
            ));
        }
    }

    if changes.is_empty() {
        return vec!["- Scan: no changes since the previous scan.".to_string()];
    }
    let mut lines = vec!["- Scan: changed since the previous scan:".to_string()];
    lines.extend(changes);
    lines
}

fn count(findings: &[Finding], severity: Severity) -> usize {
    findings.iter().filter(|f| f.severity == severity).count()
}

fn doctor_changes(history: &[JsonValue]) -> Vec<String> {
    if history.len() < 2 {
        return vec![format!(
            "- Doctor: not enough history to compare ({} run(s) recorded).",
            history.len()
        )];
    }
    let (Some(latest), Some(previous)) =
        (as_findings(history.first()), as_findings(history.get(1)))
    else {
        return vec!["- Doctor: history entries could not be read.".to_string()];
    };

    let latest_lines: Vec<String> = latest.iter().map(finding_line).collect();
    let previous_lines: Vec<String> = previous.iter().map(finding_line).collect();
    let (new, resolved) = list_delta(&latest_lines, &previous_lines);

    if new.is_empty() && resolved.is_empty() {
        return vec!["- Doctor: no changes since the previous run.".to_string()];
    }

    let mut lines = vec![format!(
        "- Doctor: errors {} -> {}, warnings {} -> {}.",
        count(&previous, Severity::Error),
        count(&latest, Severity::Error),
        count(&previous, Severity::Warn),
        count(&latest, Severity::Warn),
    )];
    lines.extend(new.iter().map(|line| format!("  - new: {}", line)));
    lines.extend(resolved.iter().map(|line| format!("  - resolved: {}", line)));
    lines
}
