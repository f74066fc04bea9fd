//! Settings file loading and persistence.
//!
//! The file is a YAML mapping of module name to `{ enabled, settings }`.
//! Only its top level is interpreted here; each module parses its own
//! sub-document.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::ConfigError;

/// Module name to raw `{ enabled, settings }` entry.
pub type SettingsDocument = BTreeMap<String, Value>;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "HOSTFORGE_CONFIG";

/// The current user's home directory, from `HOME` (or `USERPROFILE`).
#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

/// Settings file to use: `explicit`, else `$HOSTFORGE_CONFIG`, else
/// `~/.hostforge/config.yml`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if nothing is set.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    resolve_path_with(
        explicit,
        std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        home_dir(),
    )
}

fn resolve_path_with(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    home.map(|h| h.join(".hostforge").join("config.yml"))
        .ok_or(ConfigError::NoHomeDirectory)
}

/// Load the settings document at `path`.
///
/// A missing or empty file yields an empty document.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid YAML, or its
/// top level is not a mapping with string keys.
pub fn load(path: &Path) -> Result<SettingsDocument, ConfigError> {
    if !path.exists() {
        tracing::debug!("no settings file at {}, using defaults", path.display());
        return Ok(SettingsDocument::new());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&content).map_err(|err| match err {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

/// Parse a settings document from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for invalid YAML and
/// [`ConfigError::InvalidDocument`] for a non-mapping top level.
pub fn parse(content: &str) -> Result<SettingsDocument, ConfigError> {
    let blank = content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if blank {
        return Ok(SettingsDocument::new());
    }
    let value: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
        path: "<input>".to_string(),
        source,
    })?;
    let mapping = match value {
        Value::Null => return Ok(SettingsDocument::new()),
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(ConfigError::InvalidDocument(format!(
                "expected a mapping of module names, found {}",
                kind(&other)
            )));
        }
    };
    mapping
        .into_iter()
        .map(|(key, entry)| match key {
            Value::String(name) => Ok((name, entry)),
            other => Err(ConfigError::InvalidDocument(format!(
                "module names must be strings, found {}",
                kind(&other)
            ))),
        })
        .collect()
}

/// Write `document` to `path` as YAML, creating parent directories.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized or written.
pub fn save(path: &Path, document: &SettingsDocument) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };
    let content = serde_yaml::to_string(document).map_err(ConfigError::Serialize)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, content).map_err(io_err)
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
