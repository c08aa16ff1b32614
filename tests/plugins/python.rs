use noxis::core::config::ToolsConfig;
use noxis::core::discovery::discover;
use noxis::core::project::{ProjectModel, RepoType, SignalMap};
use noxis::core::results::{Severity, has_errors};
use noxis::core::tools::ToolProbe;
use noxis::plugins::python::PythonPlugin;
use noxis::plugins::{ActionRequest, CapabilityKind, Plugin};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn plugin_with_path(search_path: &Path) -> PythonPlugin {
    PythonPlugin::new(
        ToolsConfig::default(),
        ToolProbe::new(Some(search_path.as_os_str().to_os_string())),
    )
}

fn model(languages: &[&str], python_signals: &[&str]) -> ProjectModel {
    let mut signals = SignalMap::new();
    if !python_signals.is_empty() {
        let paths: Vec<String> = python_signals.iter().map(|s| s.to_string()).collect();
        signals.extend_group("python", &paths);
    }
    ProjectModel {
        root_path: "/nonexistent/repo".to_string(),
        repo_type: RepoType::Single,
        languages_detected: languages.iter().map(|s| s.to_string()).collect(),
        signals,
    }
}

#[cfg(unix)]
fn fake_tool(dir: &Path, name: &str) {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    fs::write(&path, "#!/bin/sh\nexit 0\n").expect("write tool");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
}

#[test]
fn detect_grades_confidence_by_evidence() {
    let tmp = tempdir().expect("tempdir");
    let plugin = plugin_with_path(tmp.path());

    let detected = plugin.detect(&model(&["python"], &["pyproject.toml"]));
    assert!(detected.is_applicable);
    assert_eq!(detected.confidence, 1.0);

    let signals_only = plugin.detect(&model(&[], &["setup.cfg"]));
    assert!(signals_only.is_applicable);
    assert_eq!(signals_only.confidence, 0.7);

    let nothing = plugin.detect(&model(&["node"], &[]));
    assert!(!nothing.is_applicable);
    assert!(!nothing.reasons.is_empty());
}

#[test]
fn capabilities_declare_doctor_and_scan() {
    let tmp = tempdir().expect("tempdir");
    let plugin = plugin_with_path(tmp.path());
    let project = model(&["python"], &["pyproject.toml"]);

    assert_eq!(plugin.id(), "python");
    assert_eq!(plugin.display_name(), "Python");
    assert!(!plugin.version().is_empty());

    let capabilities = plugin.capabilities(&project);
    let names: Vec<&str> = capabilities.iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["doctor", "scan"]);
    assert!(capabilities.iter().all(|c| c.kind == CapabilityKind::Deterministic));
    assert!(capabilities[0].default_enabled);
    assert!(plugin.supports(&project, "scan"));
    assert!(!plugin.supports(&project, "lint"));
}

#[test]
fn unknown_capability_yields_one_warning() {
    let tmp = tempdir().expect("tempdir");
    let plugin = plugin_with_path(tmp.path());
    let project = model(&["python"], &["pyproject.toml"]);

    let output = plugin.run(&ActionRequest::new("lint", &project));
    assert_eq!(output.findings.len(), 1);
    let finding = &output.findings[0];
    assert_eq!(finding.severity, Severity::Warn);
    assert!(finding.message.contains("lint"));
    assert!(finding.message.contains("python"));
    assert!(output.signal_delta.is_empty());
}

#[test]
fn scan_reports_only_new_markers_as_a_delta() {
    let tmp = tempdir().expect("tempdir");
    for name in ["pyproject.toml", "setup.cfg", "tox.ini"] {
        fs::write(tmp.path().join(name), "").expect("write");
    }
    let project = discover(tmp.path()).expect("discover");
    let before = project.clone();
    let plugin = plugin_with_path(tmp.path());

    let output = plugin.run(&ActionRequest::new("scan", &project));
    let messages: Vec<&str> = output.findings.iter().map(|f| f.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["Detected Python signal: setup.cfg", "Detected Python signal: tox.ini"]
    );
    assert_eq!(
        output.signal_delta.get("python"),
        Some(&["setup.cfg".to_string(), "tox.ini".to_string()][..])
    );
    assert_eq!(project, before, "plugins never mutate the model they are given");
}

#[test]
fn scan_with_nothing_new_emits_single_info() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("pyproject.toml"), "").expect("write");
    let project = discover(tmp.path()).expect("discover");

    let output = plugin_with_path(tmp.path()).run(&ActionRequest::new("scan", &project));
    assert_eq!(output.findings.len(), 1);
    assert_eq!(output.findings[0].severity, Severity::Info);
    assert!(output.signal_delta.is_empty());
}

#[cfg(unix)]
#[test]
fn doctor_reports_each_tool_once() {
    let bin = tempdir().expect("bin dir");
    for tool in ["pip", "ruff", "pytest"] {
        fake_tool(bin.path(), tool);
    }
    let project = model(&["python"], &["pyproject.toml"]);

    let output = plugin_with_path(bin.path()).run(&ActionRequest::new("doctor", &project));
    assert_eq!(output.findings.len(), 3);
    assert!(output.findings.iter().all(|f| f.severity == Severity::Info));
    assert_eq!(output.findings[0].message, "pip is available.");
    let location = output.findings[0].location.as_deref().expect("resolved path");
    assert!(location.ends_with("pip"));
}

#[cfg(unix)]
#[test]
fn doctor_hints_at_optional_tools() {
    let bin = tempdir().expect("bin dir");
    fake_tool(bin.path(), "pip");
    let project = model(&["python"], &["pyproject.toml"]);

    let findings = plugin_with_path(bin.path())
        .run(&ActionRequest::new("doctor", &project))
        .findings;
    let severities: Vec<Severity> = findings.iter().map(|f| f.severity).collect();
    assert_eq!(severities, vec![Severity::Info, Severity::Warn, Severity::Warn]);
    assert_eq!(findings[1].location.as_deref(), Some("pip install ruff"));
    assert_eq!(findings[2].location.as_deref(), Some("pip install pytest"));
    assert!(!has_errors(&findings));
}

#[test]
fn doctor_without_package_manager_fails_once() {
    let empty = tempdir().expect("empty search path");
    let project = model(&["python"], &["pyproject.toml"]);

    let findings = plugin_with_path(empty.path())
        .run(&ActionRequest::new("doctor", &project))
        .findings;
    let errors: Vec<_> = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("pip"));
    assert!(has_errors(&findings));
}
