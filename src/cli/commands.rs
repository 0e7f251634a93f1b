//! CLI command definitions for genforge: a manifest-driven `run` and a
//! report-rendering `report` command.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::collector::TestCollector;
use crate::config::GenforgeConfig;
use crate::generator::generate_and_validate;
use crate::llm::{CompletionProvider, OpenAiCompatibleProvider};
use crate::model::FunctionUnderTest;
use crate::report::{build_function_report, diff_against_baseline, render_markdown, FunctionReport, RunReport};
use crate::snippets::{JsonSnippetMap, SnippetMap};
use crate::validator::{NodeProcessValidator, TestValidator};

/// genforge: LLM-driven unit test generation.
#[derive(Parser)]
#[command(name = "genforge")]
#[command(about = "Generate and validate unit tests for a package's exported functions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the generation engine against a manifest, writing a JSON report.
    Run(RunArgs),
    /// Render an existing report as Markdown, optionally diffed against a baseline.
    Report(ReportArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the function manifest (JSON).
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Path to a YAML config file; built-in defaults apply for omitted fields.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the config's snippet sidecar path.
    #[arg(long)]
    pub snippets: Option<PathBuf>,

    /// Where to write the JSON run report.
    #[arg(short, long, default_value = "genforge-report.json")]
    pub output: PathBuf,

    /// Completion provider API key (overrides config and `GENFORGE_API_KEY`).
    #[arg(long, env = "GENFORGE_API_KEY")]
    pub api_key: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Path to a JSON run report.
    pub report: PathBuf,

    /// Path to a prior JSON run report to diff against.
    #[arg(long)]
    pub baseline: Option<PathBuf>,
}

/// A package's functions under test, supplied externally by API exploration
/// (spec.md §1) and loaded from a JSON manifest at the CLI boundary.
#[derive(Debug, Deserialize, Serialize)]
pub struct Manifest {
    pub package_name: String,
    /// Filesystem path to the package, linked into the validator's sandbox.
    pub package_dir: PathBuf,
    pub functions: Vec<ManifestFunction>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ManifestFunction {
    pub signature: String,
    #[serde(default)]
    pub doc_comment: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Module-path hint carried through to the report; not used in prompt
    /// assembly or dedup.
    #[serde(default)]
    pub module_path: Option<String>,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_command(args).await,
        Commands::Report(args) => report_command(args),
    }
}

async fn run_command(args: RunArgs) -> anyhow::Result<()> {
    let base_config = match &args.config {
        Some(path) => GenforgeConfig::from_file(path)?,
        None => GenforgeConfig::default(),
    };
    let mut config = GenforgeConfig::from_env(base_config);
    if let Some(key) = args.api_key {
        config.api_key = Some(key);
    }
    if let Some(path) = &args.snippets {
        config.snippet_map_path = Some(path.display().to_string());
    }

    let manifest_text = std::fs::read_to_string(&args.manifest)?;
    let manifest: Manifest = serde_json::from_str(&manifest_text)?;

    let snippet_map: Box<dyn SnippetMap> = match &config.snippet_map_path {
        Some(path) => Box::new(JsonSnippetMap::load(std::path::Path::new(path))?),
        None => Box::new(JsonSnippetMap::empty()),
    };

    let provider: Box<dyn CompletionProvider> = Box::new(OpenAiCompatibleProvider::new(
        config.api_base.clone().ok_or_else(|| anyhow::anyhow!("missing provider base URL: set api_base in the config file or GENFORGE_API_BASE"))?,
        config.api_key.clone(),
        config.model.clone(),
        config.completions_per_request,
    ));

    let validator = NodeProcessValidator::new(
        manifest.package_dir.clone(),
        config.validator_timeout(),
        config.validator_command.clone(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to set up validation workspace: {e}"))?;

    let mut report = RunReport::default();

    for entry in &manifest.functions {
        let function = match FunctionUnderTest::parse(
            manifest.package_name.clone(),
            &entry.signature,
            entry.doc_comment.clone(),
            entry.body.clone(),
        ) {
            Ok(f) => {
                let f = match &entry.module_path {
                    Some(module_path) => f.with_module_path(module_path.clone()),
                    None => f,
                };
                Arc::new(f)
            }
            Err(e) => {
                warn!(signature = %entry.signature, error = %e, "skipping function with invalid signature");
                continue;
            }
        };

        info!(function = %function.access_path, "generating tests");

        let snippets = snippet_map.snippets_for(&function.name).unwrap_or_default();

        let mut collector = TestCollector::new();
        let deadline = Instant::now() + config.deadline();
        generate_and_validate(
            Arc::clone(&function),
            &config.temperatures,
            snippet_map.as_ref(),
            provider.as_ref(),
            &validator,
            &mut collector,
            deadline,
        )
        .await;

        let prompt_id_by_key: HashMap<String, u64> = collector.prompt_id_by_key();
        let mut function_report: FunctionReport = build_function_report(
            &function.package_name,
            &function.access_path,
            function.module_path.as_deref(),
            snippets.len(),
            config.completions_per_request,
            &collector,
            &prompt_id_by_key,
        );
        function_report.coverage = validator.coverage_summary();
        report.functions.push(function_report);
    }

    validator.cleanup().await;

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.output, json)?;
    info!(output = %args.output.display(), "wrote run report");
    Ok(())
}

fn report_command(args: ReportArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.report)?;
    let report: RunReport = serde_json::from_str(&text)?;

    match args.baseline {
        Some(baseline_path) => {
            let baseline_text = std::fs::read_to_string(&baseline_path)?;
            let baseline: RunReport = serde_json::from_str(&baseline_text)?;
            for diff in diff_against_baseline(&baseline, &report) {
                println!(
                    "{}: passed {:+}, failed {:+}",
                    diff.access_path, diff.passed_delta, diff.failed_delta
                );
            }
        }
        None => println!("{}", render_markdown(&report)),
    }
    Ok(())
}
