//! webpm-ci - pipeline configuration entry point
//!
//! ## Commands
//!
//! - `setup`: validate the project and sync scaffold files from the template directory
//! - `config`: print the assembled pipeline config and its digest
//! - `run`: hand the pipeline config to the shell executor

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use webpm_ci::{
    run_pipeline, Environment, ExecutionContext, PipelineFactory, ProjectSetup, ShellExecutor,
    TemplateMaterializer,
};

#[derive(Parser)]
#[command(name = "webpm-ci")]
#[command(author = "W3Nest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pipeline configuration for webpm packages", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Project root (contains package.json and .w3nest/setup.toml)
    #[arg(short, long, global = true, env = "WEBPM_CI_PROJECT", default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the project and copy scaffold files into it
    Setup {
        /// Template directory (default: <project>/.w3nest/.template)
        #[arg(long, env = "WEBPM_CI_TEMPLATE")]
        template: Option<PathBuf>,

        /// Skip the entry-file existence check
        #[arg(long)]
        skip_source_check: bool,
    },

    /// Print the pipeline config as JSON
    Config,

    /// Run pipeline steps through the shell
    Run {
        /// Steps to run (comma-separated ids, default: all)
        #[arg(short, long)]
        steps: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    webpm_ci::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Setup {
            template,
            skip_source_check,
        } => cmd_setup(&cli.project, template, skip_source_check),
        Commands::Config => cmd_config(&cli.project),
        Commands::Run { steps } => cmd_run(&cli.project, steps.as_deref()).await,
    }
}

fn load_factory(project: &Path) -> Result<PipelineFactory> {
    let setup = ProjectSetup::load(project)
        .with_context(|| format!("Failed to load project setup from {}", project.display()))?;
    Ok(PipelineFactory::new(setup))
}

/// Validate the project and materialize scaffold files
fn cmd_setup(project: &Path, template: Option<PathBuf>, skip_source_check: bool) -> Result<()> {
    let factory = load_factory(project)?;
    if !skip_source_check {
        factory.setup().verify_sources(project)?;
    }

    let config = factory.get(&Environment::new(project), &ExecutionContext::new())?;
    let template_dir = template.unwrap_or_else(|| ProjectSetup::template_dir(project));
    let materializer = TemplateMaterializer::new(template_dir, factory.setup().template_files.clone());
    let written = materializer.materialize(&config, project)?;

    for path in &written {
        println!("  synced {}", path.display());
    }
    println!(
        "Setup complete for {} {} ({} files)",
        config.project().name,
        config.project().version,
        written.len()
    );
    Ok(())
}

/// Print the assembled config
fn cmd_config(project: &Path) -> Result<()> {
    let factory = load_factory(project)?;
    let config = factory.get(&Environment::new(project), &ExecutionContext::new())?;

    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("digest: {}", config.digest()?);
    Ok(())
}

/// Run pipeline steps
async fn cmd_run(project: &Path, steps: Option<&str>) -> Result<()> {
    let factory = load_factory(project)?;
    let mut ctx = ExecutionContext::new();
    if let Some(steps) = steps {
        ctx = ctx.with_only_steps(steps.split(',').map(str::trim).filter(|s| !s.is_empty()));
    }
    info!(run_id = %ctx.run_id, "Starting pipeline run");

    let executor = ShellExecutor::new(project);
    let outcome = run_pipeline(&factory, &executor, &Environment::new(project), &ctx).await?;

    for step in &outcome.steps {
        let status = if step.passed() { "PASS" } else { "FAIL" };
        println!("  [{}] {} ({} ms)", status, step.step_id, step.duration_ms);
        if !step.passed() && !step.stderr.is_empty() {
            eprintln!("{}", step.stderr.trim_end());
        }
    }
    println!(
        "{} passed, {} failed in {} ms (run {})",
        outcome.passed_count(),
        outcome.failed_count(),
        outcome.duration_ms,
        outcome.run_id
    );

    if !outcome.success {
        anyhow::bail!("Pipeline failed");
    }
    Ok(())
}
