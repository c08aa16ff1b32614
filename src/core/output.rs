//! Report rendering for the CLI: a compact severity table for humans and the
//! raw Finding sequence for machines.

use crate::core::error::NoxisError;
use crate::core::results::{Finding, Severity, has_errors};
use colored::{ColoredString, Colorize};

const MESSAGE_WIDTH: usize = 72;
const LOCATION_WIDTH: usize = 60;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = format!("{:<5}", severity.as_str().to_uppercase());
    match severity {
        Severity::Info => label.green(),
        Severity::Warn => label.yellow().bold(),
        Severity::Error => label.red().bold(),
    }
}

fn is_multiline(location: &str) -> bool {
    location.trim_end().contains('\n')
}

/// One row per finding. Multi-line locations (captured runner output) are
/// shortened in the table and repeated in full below it.
pub fn render_table(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "No results.".dimmed().to_string();
    }

    let kind_width = findings
        .iter()
        .map(|f| f.kind.len())
        .max()
        .unwrap_or(0)
        .max("TYPE".len());

    let mut lines = vec![
        format!(
            "{:<5}  {:<kind_width$}  {:<MESSAGE_WIDTH$}  {}",
            "SEV", "TYPE", "MESSAGE", "LOCATION"
        )
        .bold()
        .to_string(),
    ];

    for finding in findings {
        let location = finding
            .location
            .as_deref()
            .map(|l| compact_line(l, LOCATION_WIDTH))
            .unwrap_or_default();
        lines.push(format!(
            "{}  {:<kind_width$}  {:<MESSAGE_WIDTH$}  {}",
            severity_label(finding.severity),
            finding.kind,
            compact_line(&finding.message, MESSAGE_WIDTH),
            location.dimmed()
        ));
    }

    for finding in findings {
        if let Some(location) = finding.location.as_deref().filter(|l| is_multiline(l)) {
            lines.push(String::new());
            lines.push(format!("--- {} ---", finding.message).bold().to_string());
            lines.push(location.trim_end().to_string());
        }
    }

    lines.join("\n")
}

pub fn render_json(findings: &[Finding]) -> Result<String, NoxisError> {
    Ok(serde_json::to_string_pretty(findings)?)
}

/// Process exit code for a finished command.
pub fn exit_code(findings: &[Finding]) -> i32 {
    if has_errors(findings) { 1 } else { 0 }
}
