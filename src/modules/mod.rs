//! Module contract and the built-in modules.
//!
//! A module is a self-contained unit of host configuration: it parses its own
//! sub-document of the settings file, declares which modules must run before
//! it, and implements the three lifecycle hooks driven by the
//! [`Registry`](crate::registry::Registry).
pub mod github_cli;
pub mod package_manager;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::ConfigError;
use crate::exec::CommandRunner;
use crate::platform::Platform;
use crate::registry::Registry;

pub use github_cli::GithubCliModule;
pub use package_manager::PackageManagerModule;

/// A unit of configuration logic with lifecycle hooks.
pub trait Module: Send + Sync {
    /// Unique module name, also the key of its settings sub-document.
    fn name(&self) -> &str;

    /// Apply this module's settings sub-document.
    ///
    /// `None` (or an explicit null) keeps the module's current values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSettings`] if the sub-document exists but
    /// does not match this module's settings shape.
    fn parse_config(&mut self, raw: Option<&Value>) -> Result<(), ConfigError>;

    /// Current enabled flag and settings, for persisting back to disk.
    fn config(&self) -> ModuleConfig;

    /// Names of modules that must run before this one.
    fn dependencies(&self) -> &[String] {
        &[]
    }

    /// Bring the host into the configured state.
    ///
    /// # Errors
    ///
    /// Returns an error if any host command fails.
    fn setup(&self) -> Result<()>;

    /// Refresh what [`setup`](Self::setup) installed.
    ///
    /// # Errors
    ///
    /// Returns an error if any host command fails.
    fn update(&self) -> Result<()>;

    /// Undo what [`setup`](Self::setup) did.
    ///
    /// # Errors
    ///
    /// Returns an error if any host command fails.
    fn teardown(&self) -> Result<()>;

    /// Extra packages this module needs the package manager to install.
    fn package_contributions(&self) -> PackageContributions {
        PackageContributions::default()
    }

    /// Receive the contributions gathered from every enabled module.
    fn accept_contributions(&mut self, _contributions: &PackageContributions) {}
}

/// Serialized form of one module's entry in the settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Whether the registry runs this module's hooks.
    pub enabled: bool,
    /// Module-specific settings tree.
    #[serde(default)]
    pub settings: Value,
}

impl ModuleConfig {
    /// Build a config entry from typed settings.
    ///
    /// Settings that cannot be rendered are logged and left null.
    #[must_use]
    pub fn new<S: Serialize>(enabled: bool, settings: &S) -> Self {
        let settings = serde_yaml::to_value(settings).unwrap_or_else(|e| {
            tracing::warn!("module settings could not be rendered: {e}");
            Value::Null
        });
        Self { enabled, settings }
    }
}

/// Package-manager hand-off gathered from the enabled modules.
///
/// Carries the packages each module wants installed, keyed by package-manager
/// executable, and the identifier of the active package manager so a module
/// can remove its own packages after its teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageContributions {
    packages: BTreeMap<String, Vec<String>>,
    manager: Option<String>,
}

impl PackageContributions {
    /// Request `package` whenever `manager` is the active package manager.
    pub fn add(&mut self, manager: &str, package: &str) {
        let packages = self.packages.entry(manager.to_string()).or_default();
        if !packages.iter().any(|p| p == package) {
            packages.push(package.to_string());
        }
    }

    /// Announce the catalog identifier of the active package manager.
    pub fn set_manager(&mut self, manager: &str) {
        self.manager = Some(manager.to_string());
    }

    /// Catalog identifier of the active package manager, if one announced
    /// itself.
    #[must_use]
    pub fn manager(&self) -> Option<&str> {
        self.manager.as_deref()
    }

    /// Fold `other` into `self`, keeping first-seen order. The first
    /// announced manager wins.
    pub fn merge(&mut self, other: &Self) {
        for (manager, packages) in &other.packages {
            for package in packages {
                self.add(manager, package);
            }
        }
        if self.manager.is_none() {
            self.manager.clone_from(&other.manager);
        }
    }

    /// Packages contributed for `manager`.
    #[must_use]
    pub fn for_manager(&self, manager: &str) -> &[String] {
        self.packages
            .get(manager)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether no package has been contributed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.values().all(Vec::is_empty)
    }
}

/// Entry parsed from a settings sub-document; absent fields are `None`.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedEntry<S> {
    /// Explicit enabled flag.
    pub enabled: Option<bool>,
    /// Explicit settings.
    pub settings: Option<S>,
}

impl<S> Default for ParsedEntry<S> {
    fn default() -> Self {
        Self {
            enabled: None,
            settings: None,
        }
    }
}

impl<S> ParsedEntry<S> {
    /// Overwrite `enabled` and `settings` with whatever was present.
    pub fn apply(self, enabled: &mut bool, settings: &mut S) {
        if let Some(e) = self.enabled {
            *enabled = e;
        }
        if let Some(s) = self.settings {
            *settings = s;
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    enabled: Option<bool>,
    settings: Option<Value>,
}

/// Deserialize `raw` as `{ enabled, settings }` with typed settings.
///
/// A settings mapping is laid over `current`, so fields it omits keep their
/// current values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSettings`] naming `module` when the entry is
/// present but structurally invalid.
pub fn parse_entry<S: Serialize + DeserializeOwned>(
    module: &str,
    raw: Option<&Value>,
    current: &S,
) -> Result<ParsedEntry<S>, ConfigError> {
    let invalid = |source: serde_yaml::Error| ConfigError::InvalidSettings {
        module: module.to_string(),
        source,
    };
    let Some(raw) = raw.filter(|v| !v.is_null()) else {
        return Ok(ParsedEntry::default());
    };
    let entry: RawEntry = serde_yaml::from_value(raw.clone()).map_err(invalid)?;
    let settings = match entry.settings {
        None | Some(Value::Null) => None,
        Some(fields) => {
            let merged = overlay(current, fields).map_err(invalid)?;
            Some(serde_yaml::from_value(merged).map_err(invalid)?)
        }
    };
    Ok(ParsedEntry {
        enabled: entry.enabled,
        settings,
    })
}

/// `fields` laid over the serialized `current`; non-mappings replace it.
fn overlay<S: Serialize>(current: &S, fields: Value) -> Result<Value, serde_yaml::Error> {
    let mut merged = serde_yaml::to_value(current)?;
    match (&mut merged, fields) {
        (Value::Mapping(base), Value::Mapping(fields)) => {
            for (key, value) in fields {
                base.insert(key, value);
            }
        }
        (_, other) => return Ok(other),
    }
    Ok(merged)
}

/// Build the registry with every built-in module registered.
#[must_use]
pub fn default_registry(runner: &Arc<dyn CommandRunner>, platform: Platform) -> Registry {
    let mut registry = Registry::new();
    registry.register(Box::new(PackageManagerModule::new(
        Arc::clone(runner),
        platform,
    )));
    registry.register(Box::new(GithubCliModule::new(Arc::clone(runner), platform)));
    registry
}
