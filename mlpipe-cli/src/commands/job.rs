//! Job command handlers
//!
//! Handles job-related CLI commands: listing, viewing details and waiting
//! for a submitted job to finish.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use mlpipe_client::{PlatformClient, WaitConfig, WaitError, WaitMonitor};
use mlpipe_core::domain::job::{JobStatus, PipelineJob};
use mlpipe_core::dto::job::JobSummary;
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// List jobs
    List {
        /// Only show jobs of this experiment
        #[arg(short, long)]
        experiment: Option<String>,
    },
    /// Get job details
    Get {
        /// Job ID
        id: Uuid,
    },
    /// Wait until a job completes, fails or the wait times out
    Wait {
        /// Job ID
        id: Uuid,

        /// Maximum time to wait, in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

/// Handle job commands
///
/// # Arguments
/// * `command` - The job command to execute
/// * `config` - The CLI configuration
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        JobCommands::List { experiment } => list_jobs(&client, experiment.as_deref()).await,
        JobCommands::Get { id } => get_job(&client, id).await,
        JobCommands::Wait { id, timeout } => wait_job(client, id, timeout).await,
    }
}

/// List jobs, optionally filtered by experiment
async fn list_jobs(client: &PlatformClient, experiment: Option<&str>) -> Result<()> {
    let jobs = client.list_jobs(experiment).await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Get and display a single job
async fn get_job(client: &PlatformClient, id: Uuid) -> Result<()> {
    let job = match client.get_job(id).await {
        Ok(job) => job,
        Err(err) if err.is_not_found() => anyhow::bail!("No job with ID {}", id),
        Err(err) => return Err(err).with_context(|| format!("Failed to fetch job {}", id)),
    };

    print_job_details(&job);

    Ok(())
}

/// Block until the job reaches a terminal status
async fn wait_job(client: PlatformClient, id: Uuid, timeout: Option<u64>) -> Result<()> {
    let config = WaitConfig::from_env().context("Invalid wait configuration")?;
    let monitor = WaitMonitor::new(client, config);

    println!("{}", format!("Waiting for job {}...", id).dimmed());
    let outcome = monitor.wait(id, timeout.map(Duration::from_secs)).await;
    report_outcome(outcome)
}

/// Print the result of a wait and turn failures into an error exit
pub(crate) fn report_outcome(outcome: std::result::Result<PipelineJob, WaitError>) -> Result<()> {
    match outcome {
        Ok(job) => {
            println!("{}", "✓ Job completed successfully!".green().bold());
            print_job_details(&job);
            Ok(())
        }
        Err(WaitError::Timeout {
            job_id,
            elapsed,
            last_status,
        }) => {
            println!(
                "{}",
                format!("⏱ Stopped waiting after {}s", elapsed.as_secs())
                    .yellow()
                    .bold()
            );
            println!("  Job {} is still {}", job_id.to_string().cyan(), colorize_status(last_status));
            println!("{}", "  The job was not canceled.".dimmed());
            anyhow::bail!("timed out waiting for job {}", job_id)
        }
        Err(err) => {
            println!("{}", format!("✗ {}", err).red().bold());
            Err(err.into())
        }
    }
}

/// Print a single job summary line
fn print_job_summary(job: &JobSummary) {
    println!("  {} Job {}", "▸".cyan(), job.id.to_string().dimmed());
    println!("    Name:       {}", job.name);
    if let Some(experiment) = &job.experiment_name {
        println!("    Experiment: {}", experiment.dimmed());
    }
    println!("    Status:     {}", colorize_status(job.status));
    println!(
        "    Created:    {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed job information
pub(crate) fn print_job_details(job: &PipelineJob) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.id.to_string().cyan());
    println!("  Name:        {}", job.name);
    if let Some(experiment) = &job.experiment_name {
        println!("  Experiment:  {}", experiment.dimmed());
    }
    println!("  Status:      {}", colorize_status(job.status));
    println!("  Created:     {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(started) = job.started_at {
        println!("  Started:     {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(completed) = job.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = job.started_at {
            let duration = completed.signed_duration_since(started);
            println!("  Duration:    {}s", duration.num_seconds());
        }
    }

    if !job.outputs.is_empty() {
        println!("\n{}", "Outputs:".bold());
        let mut outputs: Vec<_> = job.outputs.iter().collect();
        outputs.sort_by(|a, b| a.0.cmp(b.0));
        for (name, output) in outputs {
            println!(
                "  {} ({}) {}",
                name.cyan(),
                output.mode,
                output.path.as_deref().unwrap_or("-").dimmed()
            );
        }
    }

    if let Some(error) = &job.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.to_string().red());
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Queued => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Canceled => status_str.dimmed(),
    }
}
