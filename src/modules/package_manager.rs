//! Installs, updates, and removes the configured package set.
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::{Module, ModuleConfig, PackageContributions, parse_entry};
use crate::catalog::{self, Operation};
use crate::error::ConfigError;
use crate::exec::CommandRunner;
use crate::platform::Platform;

/// Registry name of the package-manager module.
pub const NAME: &str = "package-manager";

/// Settings sub-document of the package-manager module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageManagerSettings {
    /// Catalog identifier (`apt`, `dnf`, `pacman`, `zypper`, `brew`, ...).
    pub manager: String,
    /// Packages to manage.
    pub packages: Vec<String>,
}

/// Drives the host package manager through a [`CommandRunner`].
pub struct PackageManagerModule {
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
    enabled: bool,
    settings: PackageManagerSettings,
    contributed: PackageContributions,
}

impl fmt::Debug for PackageManagerModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageManagerModule")
            .field("platform", &self.platform)
            .field("enabled", &self.enabled)
            .field("settings", &self.settings)
            .field("contributed", &self.contributed)
            .finish_non_exhaustive()
    }
}

impl PackageManagerModule {
    /// Create the module, defaulting the manager to whatever is on `PATH`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, platform: Platform) -> Self {
        let manager = catalog::detect(&platform, |exe| which::which(exe).is_ok())
            .unwrap_or_default()
            .to_string();
        Self {
            runner,
            platform,
            enabled: true,
            settings: PackageManagerSettings {
                manager,
                packages: Vec::new(),
            },
            contributed: PackageContributions::default(),
        }
    }

    /// Replace the settings (builder style).
    #[must_use]
    pub fn with_settings(mut self, settings: PackageManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Current settings.
    #[must_use]
    pub const fn settings(&self) -> &PackageManagerSettings {
        &self.settings
    }

    /// Configured packages followed by contributed ones, without duplicates.
    ///
    /// Contributed packages are left out of uninstalls; each contributor
    /// removes its own after its teardown.
    fn packages_for(&self, executable: &str, op: Operation) -> Vec<String> {
        let contributed: &[String] = if op == Operation::Uninstall {
            &[]
        } else {
            self.contributed.for_manager(executable)
        };
        let mut packages: Vec<String> = Vec::new();
        for package in self.settings.packages.iter().chain(contributed) {
            if !packages.contains(package) {
                packages.push(package.clone());
            }
        }
        packages
    }

    fn manage(&self, op: Operation) -> Result<()> {
        let contributing = op != Operation::Uninstall && !self.contributed.is_empty();
        if self.settings.packages.is_empty() && !contributing {
            tracing::debug!("no packages configured, skipping {op}");
            return Ok(());
        }
        let resolution = catalog::resolve(&self.settings.manager, &self.platform)?;
        let executable = resolution.descriptor.executable;
        let packages = self.packages_for(executable, op);
        if packages.is_empty() {
            tracing::debug!("no packages for {executable}, skipping {op}");
            return Ok(());
        }

        tracing::info!(
            "{op}: {} package(s) with {executable}{}",
            packages.len(),
            if resolution.elevate { " (sudo)" } else { "" }
        );
        let argv = resolution.descriptor.argv(op, &packages);
        let output = self.runner.exec(executable, &argv, resolution.elevate)?;
        let text = output.text();
        if !text.trim().is_empty() {
            tracing::debug!("{}", text.trim_end());
        }
        Ok(())
    }
}

impl Module for PackageManagerModule {
    fn name(&self) -> &str {
        NAME
    }

    fn parse_config(&mut self, raw: Option<&Value>) -> Result<(), ConfigError> {
        parse_entry(NAME, raw, &self.settings)?
            .apply(&mut self.enabled, &mut self.settings);
        Ok(())
    }

    fn config(&self) -> ModuleConfig {
        ModuleConfig::new(self.enabled, &self.settings)
    }

    fn setup(&self) -> Result<()> {
        self.manage(Operation::Install)
    }

    fn update(&self) -> Result<()> {
        self.manage(Operation::Update)
    }

    fn teardown(&self) -> Result<()> {
        self.manage(Operation::Uninstall)
    }

    fn package_contributions(&self) -> PackageContributions {
        let mut contributions = PackageContributions::default();
        if !self.settings.manager.trim().is_empty() {
            contributions.set_manager(&self.settings.manager);
        }
        contributions
    }

    fn accept_contributions(&mut self, contributions: &PackageContributions) {
        self.contributed = contributions.clone();
    }
}
