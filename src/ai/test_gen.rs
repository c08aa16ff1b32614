//! AI-assisted test generation: select one source file, prompt the
//! provider, write the result under `tests/`, run the test runner, accept
//! or reject.
//!
//! Linear, one candidate per invocation, no retries:
//! `Start -> SourceSelected -> PromptBuilt -> Generated -> Written ->
//! Validated -> Accepted | Rejected`.

use crate::ai::provider::{
    GeneratedFiles, GenerationProvider, TEST_FILE_EXTENSION, TEST_FILE_PREFIX, fallback_stub,
    validate_generated,
};
use crate::core::config::AiTestsConfig;
use crate::core::error::NoxisError;
use crate::core::project::ProjectModel;
use crate::core::results::Finding;
use crate::core::tools::{ProcessOutput, ToolProbe, run_captured};
use crate::core::workspace::{STATE_DIR_NAME, TESTS_DIR_NAME, Workspace};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const KIND: &str = "ai-tests";
pub const SUPPORTED_LANGUAGE: &str = "python";
pub const SOURCE_EXTENSION: &str = "py";
pub const TRUNCATION_MARKER: &str = "\n\n# ... truncated ...\n";

/// Directory names never searched for source candidates.
pub const IGNORED_DIRS: &[&str] = &[
    ".venv",
    "venv",
    "__pycache__",
    STATE_DIR_NAME,
    ".git",
    TESTS_DIR_NAME,
    "dist",
    "build",
];

/// Package markers, not worth testing on their own.
pub const IGNORED_FILES: &[&str] = &["__init__.py"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    SourceSelected,
    PromptBuilt,
    Generated,
    Written,
    Validated,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Relative to the project root, `/`-separated.
    pub rel_path: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestGenReport {
    pub stage: Stage,
    pub findings: Vec<Finding>,
    pub target: Option<SourceFile>,
    pub written: Vec<PathBuf>,
    pub used_fallback: bool,
}

impl TestGenReport {
    pub fn stopped(stage: Stage, finding: Finding) -> Self {
        Self {
            stage,
            findings: vec![finding],
            target: None,
            written: Vec::new(),
            used_fallback: false,
        }
    }

    pub fn accepted(&self) -> bool {
        self.stage == Stage::Accepted
    }
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
}

fn rel_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Candidate sources under `root`, smallest first (ties broken by path).
pub fn discover_sources(root: &Path) -> Result<Vec<SourceFile>, NoxisError> {
    let mut sources = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored_dir(entry));

    for entry in walker {
        let entry = entry.map_err(|e| NoxisError::IoError(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if IGNORED_FILES.iter().any(|ignored| *ignored == name) {
            continue;
        }
        sources.push(SourceFile {
            path: path.to_path_buf(),
            rel_path: rel_path(root, path),
            size: entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX),
        });
    }

    sources.sort_by(|a, b| a.size.cmp(&b.size).then_with(|| a.rel_path.cmp(&b.rel_path)));
    Ok(sources)
}

/// `pkg/sub/mod.py` -> `test_pkg_sub_mod.py`.
pub fn test_filename_for(rel_path: &str) -> String {
    let stem = rel_path
        .strip_suffix(&format!(".{}", SOURCE_EXTENSION))
        .unwrap_or(rel_path);
    let flat = stem.replace(['/', '\\'], "_");
    format!("{}{}{}", TEST_FILE_PREFIX, flat, TEST_FILE_EXTENSION)
}

pub fn build_prompt(
    project: &ProjectModel,
    source: &SourceFile,
    max_chars: usize,
) -> Result<String, NoxisError> {
    let bytes = fs::read(&source.path)?;
    let mut code = String::from_utf8_lossy(&bytes).into_owned();
    if code.chars().count() > max_chars {
        code = code.chars().take(max_chars).collect();
        code.push_str(TRUNCATION_MARKER);
    }

    let root_line = format!("Project root: {}", project.root_path);
    let target_line = format!("Target module: {}", source.rel_path);
    let file_header = format!("### FILE: {}", source.rel_path);
    let lines: Vec<&str> = vec![
        "You are an expert Python test engineer.",
        "Generate pytest tests for the following module.",
        "",
        "Rules:",
        "- Do NOT modify production code",
        "- Write fast, deterministic tests",
        "- Focus on public functions/classes",
        "- Use mocks only when strictly necessary",
        "- Return ONLY a JSON object mapping filename -> content",
        "- Filenames must be a single .py file name (no directories)",
        "",
        &root_line,
        &target_line,
        "",
        &file_header,
        &code,
    ];
    Ok(lines.join("\n"))
}

/// Fold whatever the provider returned into exactly one file named
/// `target_name`; multiple entries are concatenated in iteration order.
pub fn normalize_generated(files: GeneratedFiles, target_name: &str) -> GeneratedFiles {
    let content = if files.len() == 1 {
        files.into_values().next().unwrap_or_default()
    } else {
        files.into_values().collect::<Vec<_>>().join("\n\n")
    };
    GeneratedFiles::from([(target_name.to_string(), content)])
}

/// Write files into `tests_dir`. Any filename with a path separator aborts
/// before anything is written.
pub fn write_tests(tests_dir: &Path, files: &GeneratedFiles) -> Result<Vec<PathBuf>, NoxisError> {
    if let Some(bad) = files
        .keys()
        .find(|name| name.contains('/') || name.contains('\\') || name.as_str() == "..")
    {
        return Err(NoxisError::ValidationError(format!(
            "Invalid test filename: {}",
            bad
        )));
    }

    fs::create_dir_all(tests_dir)?;
    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = tests_dir.join(name);
        fs::write(&path, content)?;
        written.push(path);
    }
    Ok(written)
}

/// Runs the configured test tool against the workspace's tests directory.
pub struct TestRunner {
    program: PathBuf,
    args: Vec<String>,
}

impl TestRunner {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    pub fn run(&self, cwd: &Path) -> Result<ProcessOutput, NoxisError> {
        Ok(run_captured(&self.program, &self.args, cwd)?)
    }
}

pub struct TestGenLoop<'a> {
    pub workspace: &'a Workspace,
    pub settings: &'a AiTestsConfig,
    pub provider: &'a dyn GenerationProvider,
    pub probe: &'a ToolProbe,
    pub test_runner: &'a str,
}

impl TestGenLoop<'_> {
    pub fn run(&self, project: &ProjectModel) -> TestGenReport {
        let mut stage = Stage::Start;
        let advance = |stage: &mut Stage, next: Stage| {
            tracing::debug!(from = ?*stage, to = ?next, "ai-tests stage");
            *stage = next;
        };

        if !project.has_language(SUPPORTED_LANGUAGE) {
            return TestGenReport::stopped(
                stage,
                Finding::warn(
                    KIND,
                    "AI test generation is only supported for Python projects (for now).",
                ),
            );
        }

        let Some(runner_path) = self.probe.resolve(self.test_runner) else {
            return TestGenReport::stopped(
                stage,
                Finding::error(
                    KIND,
                    format!(
                        "{} not found. Install {} before generating tests.",
                        self.test_runner, self.test_runner
                    ),
                ),
            );
        };

        let sources = match discover_sources(&self.workspace.root) {
            Ok(sources) => sources,
            Err(e) => {
                return TestGenReport::stopped(
                    stage,
                    Finding::error(KIND, format!("Source discovery failed: {}", e)),
                );
            }
        };
        let Some(target) = sources.into_iter().next() else {
            return TestGenReport::stopped(
                stage,
                Finding::warn(KIND, "No Python source files found to generate tests for."),
            );
        };
        advance(&mut stage, Stage::SourceSelected);

        let mut report = TestGenReport {
            stage,
            findings: vec![
                Finding::info(KIND, format!("Selected source: {}", target.rel_path))
                    .at(target.path.display().to_string()),
            ],
            target: Some(target.clone()),
            written: Vec::new(),
            used_fallback: false,
        };

        let test_name = test_filename_for(&target.rel_path);
        let prompt = match build_prompt(project, &target, self.settings.max_prompt_chars) {
            Ok(prompt) => prompt,
            Err(e) => {
                report
                    .findings
                    .push(Finding::error(KIND, format!("Could not read source: {}", e)));
                report.stage = Stage::Rejected;
                return report;
            }
        };
        advance(&mut report.stage, Stage::PromptBuilt);

        let generated = self
            .provider
            .generate_tests(&prompt)
            .and_then(|files| validate_generated(files, self.settings.min_test_chars));
        let files = match generated {
            Ok(files) => normalize_generated(files, &test_name),
            Err(e) => {
                tracing::info!(error = %e, "test generation fell back to stub");
                report.used_fallback = true;
                report.findings.push(Finding::warn(
                    KIND,
                    format!("Generation unavailable ({}); wrote a placeholder test.", e),
                ));
                fallback_stub(&test_name)
            }
        };
        advance(&mut report.stage, Stage::Generated);

        let tests_dir = self.workspace.tests_dir();
        match write_tests(&tests_dir, &files) {
            Ok(written) => report.written = written,
            Err(e) => {
                report.findings.push(Finding::error(KIND, e.to_string()));
                report.stage = Stage::Rejected;
                return report;
            }
        }
        advance(&mut report.stage, Stage::Written);

        let runner = TestRunner::new(runner_path, self.settings.runner_args.clone());
        let output = match runner.run(&self.workspace.root) {
            Ok(output) => output,
            Err(e) => {
                report.findings.push(Finding::error(
                    KIND,
                    format!("Could not execute {}: {}", self.test_runner, e),
                ));
                report.stage = Stage::Rejected;
                return report;
            }
        };
        advance(&mut report.stage, Stage::Validated);

        let written_list = report
            .written
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if output.success {
            report.findings.push(
                Finding::info(
                    KIND,
                    format!("Generated and validated {} test file(s).", report.written.len()),
                )
                .at(written_list),
            );
            advance(&mut report.stage, Stage::Accepted);
        } else {
            report
                .findings
                .push(Finding::error(KIND, "Generated tests failed.").at(output.combined));
            advance(&mut report.stage, Stage::Rejected);
        }
        report
    }
}
