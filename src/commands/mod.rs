//! Subcommand orchestration.
pub mod generate;
pub mod lifecycle;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::{self, SettingsDocument};
use crate::exec::{CommandRunner, DirectLauncher, SystemRunner};
use crate::modules;
use crate::platform::Platform;
use crate::registry::Registry;

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected host platform.
    pub platform: Platform,
    /// Settings file in use.
    pub path: PathBuf,
    /// Parsed settings document (empty when the file does not exist).
    pub document: SettingsDocument,
    /// Registry with every built-in module registered.
    pub registry: Registry,
}

impl CommandSetup {
    /// Detect the platform, build the registry, and read the settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings path cannot be determined or the file
    /// cannot be read or parsed.
    pub fn init(global: &GlobalOpts) -> Result<Self> {
        let platform = Platform::detect();
        tracing::debug!("platform: {}", platform.os);

        let path = config::resolve_path(global.config.as_deref())?;
        tracing::debug!("settings file: {}", path.display());
        let document = config::load(&path)?;

        let runner = runner(global);
        let registry = modules::default_registry(&runner, platform);
        Ok(Self {
            platform,
            path,
            document,
            registry,
        })
    }
}

/// Host command runner honouring `--no-sudo`.
#[must_use]
pub fn runner(global: &GlobalOpts) -> Arc<dyn CommandRunner> {
    if global.no_sudo {
        Arc::new(SystemRunner::new(DirectLauncher))
    } else {
        Arc::new(SystemRunner::default())
    }
}
