//! Placeholder substitution for pipeline definition files
//!
//! Pipeline YAML files carry literal placeholder tokens such as
//! `VERSION_REPLACEMENT_STRING`. They are rendered into a concrete file
//! before loading. Substitution is plain text replacement; no escaping and
//! no template syntax.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors raised while rendering a template file
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read template {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write rendered file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Replaces every occurrence of each key of `replacements` in `text`
///
/// Longer keys are applied first (ties broken by key), one full pass per
/// key, so a key that is a prefix of another never splits the longer one.
/// A replacement value that itself contains a later key may still be
/// rewritten by that key's pass; rendering twice is not guaranteed to be a
/// no-op.
pub fn substitute(text: &str, replacements: &HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = replacements.keys().filter(|k| !k.is_empty()).collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut rendered = text.to_string();
    for key in keys {
        rendered = rendered.replace(key.as_str(), &replacements[key]);
    }
    rendered
}

/// Renders `source` into `destination`, overwriting the destination
pub fn process_file(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    replacements: &HashMap<String, String>,
) -> Result<(), TemplateError> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    let text = std::fs::read_to_string(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TemplateError::NotFound(source.to_path_buf()),
        _ => TemplateError::Read {
            path: source.to_path_buf(),
            source: e,
        },
    })?;

    let rendered = substitute(&text, replacements);

    std::fs::write(destination, rendered).map_err(|e| TemplateError::Write {
        path: destination.to_path_buf(),
        source: e,
    })?;

    debug!(
        source = %source.display(),
        destination = %destination.display(),
        placeholders = replacements.len(),
        "Rendered template"
    );

    Ok(())
}
