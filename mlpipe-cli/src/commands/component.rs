//! Component command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use mlpipe_core::domain::component::{ComponentDescriptor, PortSpec};
use std::collections::BTreeMap;

use crate::config::Config;

/// Component subcommands
#[derive(Subcommand)]
pub enum ComponentCommands {
    /// Show a registered component and its ports
    Get {
        /// Component name
        name: String,

        /// Component version
        version: String,
    },
}

pub async fn handle_component_command(command: ComponentCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        ComponentCommands::Get { name, version } => {
            let component = client
                .get_component(&name, &version)
                .await
                .with_context(|| format!("Failed to fetch component {}:{}", name, version))?;
            print_component(&component);
            Ok(())
        }
    }
}

fn print_component(component: &ComponentDescriptor) {
    println!("{}", "Component Details:".bold());
    println!("  Name:    {}", component.name.cyan());
    println!("  Version: {}", component.version);
    if let Some(description) = &component.description {
        println!("  About:   {}", description.dimmed());
    }

    print_ports("Inputs:", &component.inputs);
    print_ports("Outputs:", &component.outputs);
}

fn print_ports(title: &str, ports: &BTreeMap<String, PortSpec>) {
    if ports.is_empty() {
        return;
    }

    println!("\n{}", title.bold());
    for (name, port) in ports {
        let required = if port.optional { "" } else { "*" };
        println!(
            "  - {}{}: {} {}",
            name.cyan(),
            required.red(),
            port.port_type,
            port.description
                .as_ref()
                .map(|d| format!("({})", d))
                .unwrap_or_default()
                .dimmed()
        );
    }
}
