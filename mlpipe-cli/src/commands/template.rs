//! Template command handler

use anyhow::{Context, Result};
use colored::*;
use mlpipe_core::template::process_file;

use super::replacement_map;

/// Render `source` into `destination` with the given replacements
pub fn render(source: &str, destination: &str, replace: Vec<(String, String)>) -> Result<()> {
    let replacements = replacement_map(replace);

    process_file(source, destination, &replacements)
        .with_context(|| format!("Failed to render template {}", source))?;

    println!(
        "{}",
        format!("✓ Rendered {} -> {}", source, destination).green().bold()
    );
    println!("  Placeholders: {}", replacements.len().to_string().dimmed());

    Ok(())
}
