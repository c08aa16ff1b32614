//! Noxis: a local-first project companion.
//!
//! Noxis looks at a repository, works out what it is made of, runs
//! ecosystem checks against it, and remembers every run so an AI
//! collaborator can explain the project's state or draft tests for it.
//!
//! # Architecture
//!
//! - **Discovery** ([`core::discovery`]) turns a directory into an immutable
//!   [`core::project::ProjectModel`] by probing a fixed marker table.
//! - **Plugins** ([`plugins`]) are ecosystem handlers behind the
//!   [`plugins::Plugin`] trait. They return findings plus a signal delta; they
//!   never mutate the model they are given.
//! - **Memory** ([`core::memory`]) is `.noxis/memory.db`: an append-only run
//!   log, an append-only explanation log, and a latest-value state table.
//!   Every access goes through [`core::broker::DbBroker`], which appends to
//!   `.noxis/broker.events.jsonl`.
//! - **Orchestrator** ([`core::orchestrator`]) is the only component that
//!   composes the others. Each command returns an ordered list of
//!   [`core::results::Finding`]s; a command failed iff one has `error`
//!   severity.
//! - **AI** ([`ai`]) renders stored state into a prompt, talks to an
//!   OpenAI-compatible endpoint when one is configured, and runs the
//!   generate/write/validate loop for tests.
//!
//! # Examples
//!
//! ```bash
//! noxis init
//! noxis scan --path ./my-service
//! noxis doctor --format json
//! noxis ai-explain
//! noxis ai-tests
//! ```

pub mod ai;
pub mod core;
pub mod plugins;

use crate::core::{
    config, error,
    logging::init_logging,
    orchestrator::Orchestrator,
    output::{exit_code, render_json, render_table},
    results::Finding,
    workspace::Workspace,
};

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "noxis",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect a project, check its tooling, and remember every run"
)]
struct Cli {
    /// Log debug diagnostics to stderr (overridden by NOXIS_LOG).
    #[clap(short, long, global = true)]
    verbose: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
struct TargetArgs {
    /// Project root (defaults to the current directory).
    #[clap(short, long, default_value = ".")]
    path: PathBuf,
    /// Output format: 'text' or 'json'.
    #[clap(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create `.noxis/` with default policies, a project snapshot, and memory.
    Init(TargetArgs),
    /// Discover ecosystems and record the project snapshot.
    Scan(TargetArgs),
    /// Check that the ecosystem's tools are installed.
    Doctor(TargetArgs),
    /// Explain the project's state from recorded runs.
    AiExplain(TargetArgs),
    /// Generate, write, and run a test for the smallest source file.
    AiTests(TargetArgs),
}

impl Command {
    fn target(&self) -> &TargetArgs {
        match self {
            Command::Init(args)
            | Command::Scan(args)
            | Command::Doctor(args)
            | Command::AiExplain(args)
            | Command::AiTests(args) => args,
        }
    }
}

fn print_findings(findings: &[Finding], format: OutputFormat) -> Result<(), error::NoxisError> {
    match format {
        OutputFormat::Text => println!("{}", render_table(findings)),
        OutputFormat::Json => println!("{}", render_json(findings)?),
    }
    Ok(())
}

/// Parse the command line, run one command, print its report, and return
/// the process exit code.
pub fn run() -> Result<i32, error::NoxisError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let target = cli.command.target();
    let workspace = Workspace::resolve(&target.path)?;
    let format = target.format;
    let config = config::load(&workspace)?.with_env_overrides();
    tracing::debug!(root = %workspace.root.display(), "resolved workspace");

    let orchestrator = Orchestrator::new(workspace, config);

    let findings = match cli.command {
        Command::Init(_) => orchestrator.init(),
        Command::Scan(_) => orchestrator.scan(),
        Command::Doctor(_) => orchestrator.doctor(),
        Command::AiExplain(_) => {
            let report = orchestrator.ai_explain();
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "results": report.findings,
                        "explanation": report.explanation,
                        "prompt_hash": report.prompt_hash,
                    }))?
                ),
                OutputFormat::Text => {
                    if !report.findings.is_empty() {
                        println!("{}", render_table(&report.findings));
                    }
                    if let Some(explanation) = &report.explanation {
                        println!("{}", explanation);
                    }
                }
            }
            return Ok(exit_code(&report.findings));
        }
        Command::AiTests(_) => {
            let report = orchestrator.ai_tests();
            if format == OutputFormat::Json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "results": report.findings,
                        "stage": report.stage,
                        "written": report
                            .written
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>(),
                    }))?
                );
                return Ok(exit_code(&report.findings));
            }
            report.findings
        }
    };

    print_findings(&findings, format)?;
    Ok(exit_code(&findings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcommands_use_kebab_case() {
        let cli = Cli::try_parse_from(["noxis", "ai-explain", "--path", "/tmp"]).unwrap();
        assert!(matches!(cli.command, Command::AiExplain(_)));
        assert_eq!(cli.command.target().path, PathBuf::from("/tmp"));
    }

    #[test]
    fn defaults_to_current_dir_and_text() {
        let cli = Cli::try_parse_from(["noxis", "--verbose", "scan"]).unwrap();
        assert!(cli.verbose);
        let target = cli.command.target();
        assert_eq!(target.path, PathBuf::from("."));
        assert_eq!(target.format, OutputFormat::Text);
    }

    #[test]
    fn json_format_is_accepted() {
        let cli = Cli::try_parse_from(["noxis", "doctor", "--format", "json"]).unwrap();
        assert_eq!(cli.command.target().format, OutputFormat::Json);
        assert!(Cli::try_parse_from(["noxis", "doctor", "--format", "xml"]).is_err());
    }
}
