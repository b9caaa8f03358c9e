//! Pipeline command handlers
//!
//! Handles pipeline definition files: rendering placeholders, loading and
//! validating the YAML, and submitting it as a job.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use mlpipe_client::registry::resolve_for_pipeline;
use mlpipe_client::{WaitConfig, WaitMonitor};
use mlpipe_core::definition::load_pipeline;
use mlpipe_core::domain::pipeline::{InputBinding, PipelineSpec};
use mlpipe_core::template::process_file;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::job::{print_job_details, report_outcome};
use super::{parse_key_val, replacement_map};
use crate::config::Config;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Submit a pipeline definition and wait for it to finish
    Submit {
        /// Path to the pipeline YAML file
        file: PathBuf,

        /// Placeholder replacements as KEY=VALUE pairs
        #[arg(short, long = "replace", value_parser = parse_key_val)]
        replace: Vec<(String, String)>,

        /// Maximum time to wait, in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Return as soon as the job is accepted
        #[arg(long)]
        no_wait: bool,
    },
    /// Load and validate a pipeline definition without submitting it
    Validate {
        /// Path to the pipeline YAML file
        file: PathBuf,

        /// Placeholder replacements as KEY=VALUE pairs
        #[arg(short, long = "replace", value_parser = parse_key_val)]
        replace: Vec<(String, String)>,
    },
}

/// Handle pipeline commands
///
/// # Arguments
/// * `command` - The pipeline command to execute
/// * `config` - The CLI configuration
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    match command {
        PipelineCommands::Submit {
            file,
            replace,
            timeout,
            no_wait,
        } => submit_pipeline(config, &file, replace, timeout, no_wait).await,
        PipelineCommands::Validate { file, replace } => validate_pipeline(&file, replace),
    }
}

/// Render, load, resolve, submit and optionally wait
async fn submit_pipeline(
    config: &Config,
    file: &Path,
    replace: Vec<(String, String)>,
    timeout: Option<u64>,
    no_wait: bool,
) -> Result<()> {
    let spec = load_definition(file, replace)?;
    let client = config.client();

    let registry = resolve_for_pipeline(&client, &spec)
        .await
        .context("Failed to resolve pipeline components")?;

    let wait_config = WaitConfig::from_env().context("Invalid wait configuration")?;
    let monitor = WaitMonitor::new(client, wait_config).with_registry(Arc::new(registry));

    if no_wait {
        let job = monitor.submit(&spec).await?;
        println!("{}", "✓ Job submitted".green().bold());
        print_job_details(&job);
        return Ok(());
    }

    info!(nodes = spec.jobs.len(), "Submitting pipeline");
    let outcome = monitor
        .submit_and_wait(&spec, timeout.map(Duration::from_secs))
        .await;
    report_outcome(outcome)
}

/// Render and load a definition, then run structural validation
fn validate_pipeline(file: &Path, replace: Vec<(String, String)>) -> Result<()> {
    let spec = load_definition(file, replace)?;

    println!("{}", "✓ Pipeline is valid".green().bold());
    print_pipeline_summary(&spec);

    Ok(())
}

/// Loads a pipeline file, rendering placeholders first when any are given
///
/// The rendered file is written next to the source as `<stem>.processed.yaml`.
fn load_definition(file: &Path, replace: Vec<(String, String)>) -> Result<PipelineSpec> {
    let path = if replace.is_empty() {
        file.to_path_buf()
    } else {
        let processed = processed_path(file);
        process_file(file, &processed, &replacement_map(replace))
            .with_context(|| format!("Failed to render {}", file.display()))?;
        processed
    };

    load_pipeline(&path).with_context(|| format!("Failed to load pipeline from {}", path.display()))
}

fn processed_path(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pipeline".to_string());
    file.with_file_name(format!("{}.processed.yaml", stem))
}

fn print_pipeline_summary(spec: &PipelineSpec) {
    if let Some(name) = &spec.display_name {
        println!("  Name:       {}", name.bold());
    }
    if let Some(experiment) = &spec.experiment_name {
        println!("  Experiment: {}", experiment.cyan());
    }
    if let Some(compute) = &spec.compute {
        println!("  Compute:    {}", compute.dimmed());
    }

    println!("  Nodes:      {}", spec.jobs.len());
    for job in &spec.jobs {
        let upstream: Vec<&str> = job.upstream_nodes().collect();
        println!(
            "    - {} {} {}",
            job.name.cyan(),
            job.component.to_string().dimmed(),
            if upstream.is_empty() {
                String::new()
            } else {
                format!("<- {}", upstream.join(", "))
            }
        );
        for (input, binding) in &job.inputs {
            if let InputBinding::PipelineInput { name } = binding {
                println!("        {} = parent.inputs.{}", input, name.dimmed());
            }
        }
    }

    if !spec.outputs.is_empty() {
        println!("  Outputs:");
        for (name, output) in &spec.outputs {
            println!(
                "    - {} <- {}.{} ({})",
                name.cyan(),
                output.node,
                output.output,
                output.mode
            );
        }
    }
}
