//! `setup`, `update`, and `teardown` commands.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::config::SettingsDocument;
use crate::registry::{Action, Registry};

/// Load settings into the default registry and run `action`.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded or any module fails.
pub fn run(global: &GlobalOpts, action: Action) -> Result<()> {
    let CommandSetup {
        path,
        mut registry,
        document,
        ..
    } = CommandSetup::init(global)?;
    tracing::debug!("loaded {} module entries from {}", document.len(), path.display());
    execute(&mut registry, &document, action)
}

/// Apply `document` to `registry` and run `action` on it.
///
/// # Errors
///
/// Returns the first settings, graph, or hook error.
pub fn execute(
    registry: &mut Registry,
    document: &SettingsDocument,
    action: Action,
) -> Result<()> {
    registry.load_settings(document)?;
    registry.run(action)?;
    tracing::info!(target: "hostforge::stage", "{action} complete");
    Ok(())
}
