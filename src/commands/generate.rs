//! `generate` command: write the effective settings back to disk.
use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::config::{self, SettingsDocument};
use crate::registry::Registry;

/// Merge the existing settings file with module defaults and save it.
///
/// # Errors
///
/// Returns an error if the existing file is invalid or cannot be written.
pub fn run(global: &GlobalOpts) -> Result<()> {
    let CommandSetup {
        path,
        mut registry,
        document,
        ..
    } = CommandSetup::init(global)?;
    let generated = render(&mut registry, &document)?;
    config::save(&path, &generated)
        .with_context(|| format!("writing settings to {}", path.display()))?;
    tracing::info!("wrote {} module entries to {}", generated.len(), path.display());
    Ok(())
}

/// The document `registry` would persist after applying `existing`.
///
/// # Errors
///
/// Returns an error if `existing` holds malformed module settings or a
/// module's config cannot be rendered.
pub fn render(registry: &mut Registry, existing: &SettingsDocument) -> Result<SettingsDocument> {
    registry.load_settings(existing)?;
    Ok(registry.settings_document()?)
}
