//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod component;
mod job;
mod pipeline;
mod template;

pub use component::ComponentCommands;
pub use job::JobCommands;
pub use pipeline::PipelineCommands;

use anyhow::Result;
use clap::Subcommand;
use std::collections::HashMap;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit and validate pipeline definitions
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Inspect and wait on submitted jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Inspect registered components
    Component {
        #[command(subcommand)]
        command: ComponentCommands,
    },
    /// Render a file by substituting placeholder strings
    Template {
        /// Template file
        source: String,

        /// Rendered output file (overwritten)
        destination: String,

        /// Replacements as KEY=VALUE pairs
        #[arg(short, long = "replace", value_parser = parse_key_val)]
        replace: Vec<(String, String)>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config).await,
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Component { command } => {
            component::handle_component_command(command, config).await
        }
        Commands::Template {
            source,
            destination,
            replace,
        } => template::render(&source, &destination, replace),
    }
}

/// Parse a single KEY=value pair
fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn replacement_map(pairs: Vec<(String, String)>) -> HashMap<String, String> {
    pairs.into_iter().collect()
}
