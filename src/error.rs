//! Domain-specific error types for the orchestration engine.
//!
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`GraphError`], [`ExecError`]) while command handlers at the CLI boundary
//! convert them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! RegistryError
//! ├── Config(ConfigError)  — settings document loading and per-module parsing
//! ├── Graph(GraphError)    — missing dependencies, dependency cycles
//! └── Hook { .. }          — a lifecycle hook failed (wraps ExecError,
//!                            CatalogError, or any module error)
//! ```

use std::io;

use thiserror::Error;

use crate::registry::Action;

/// Errors raised while running a run's lifecycle actions.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A settings sub-document could not be applied to its module.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The dependency graph could not be ordered.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A module's lifecycle hook returned an error; the run was aborted.
    #[error("{action} failed for module '{module}': {source}")]
    Hook {
        /// Name of the module whose hook failed.
        module: String,
        /// Lifecycle action that was running.
        action: Action,
        /// Underlying error returned by the hook.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors that arise from settings documents and config files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings document does not have the expected shape.
    #[error("invalid settings document: {0}")]
    InvalidDocument(String),

    /// A module's sub-document exists but does not match its settings shape.
    #[error("invalid settings for module '{module}': {source}")]
    InvalidSettings {
        /// Name of the module whose settings were rejected.
        module: String,
        /// Structural mismatch reported by the deserializer.
        source: serde_yaml::Error,
    },

    /// An I/O error occurred while reading or writing a config file.
    #[error("IO error on config file {path}: {source}")]
    Io {
        /// Path to the file that could not be accessed.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The config file is not valid YAML.
    #[error("invalid YAML in {path}: {source}")]
    Parse {
        /// Path to the file that failed to parse.
        path: String,
        /// Underlying parse error.
        source: serde_yaml::Error,
    },

    /// The settings document could not be rendered as YAML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_yaml::Error),

    /// No config path was given and no home directory could be found.
    #[error("cannot determine config path: pass --config, or set HOSTFORGE_CONFIG or HOME")]
    NoHomeDirectory,
}

/// Errors that arise while ordering the module dependency graph.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// A module depends on a name that is not registered.
    #[error("dependency '{dependency}' of module '{module}' does not exist")]
    MissingDependency {
        /// The unregistered dependency name.
        dependency: String,
        /// The module that declared it.
        module: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected at '{module}': {path}")]
    Cycle {
        /// Module being visited when the cycle closed.
        module: String,
        /// The cycle, rendered as `a -> b -> a`.
        path: String,
    },
}

/// Errors that arise from running host commands.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program is not on the executable search path.
    #[error("executable '{0}' not found on PATH")]
    ExecutableNotFound(String),

    /// The process could not be started (or waited on).
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Writing to or closing the child's standard input failed.
    #[error("failed to write stdin of '{program}': {source}{}", output_suffix(.output))]
    Stdin {
        /// Program whose stdin pipe failed.
        program: String,
        /// Underlying I/O error.
        source: io::Error,
        /// Combined output captured before the failure was reported.
        output: String,
    },

    /// The process exited unsuccessfully.
    #[error("`{command}` {}: {}", exit_status(.code), .output.trim())]
    Failed {
        /// Rendered command line.
        command: String,
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
        /// Combined stdout and stderr of the process.
        output: String,
    },
}

impl ExecError {
    /// Output captured from the process, if any was collected.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Stdin { output, .. } | Self::Failed { output, .. } => Some(output),
            Self::ExecutableNotFound(_) | Self::Spawn { .. } => None,
        }
    }
}

fn output_suffix(output: &str) -> String {
    let output = output.trim();
    if output.is_empty() {
        String::new()
    } else {
        format!(": {output}")
    }
}

#[allow(clippy::ref_option)]
fn exit_status(code: &Option<i32>) -> String {
    code.map_or_else(
        || "was terminated by a signal".to_string(),
        |c| format!("exited with status {c}"),
    )
}

/// Errors that arise from package-manager resolution.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    /// The configured identifier is not in the catalog.
    #[error("unsupported package manager '{0}'")]
    UnsupportedPackageManager(String),
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // GraphError
    // -----------------------------------------------------------------------

    #[test]
    fn graph_error_missing_dependency_display() {
        let e = GraphError::MissingDependency {
            dependency: "ghost".to_string(),
            module: "github-cli".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "dependency 'ghost' of module 'github-cli' does not exist"
        );
    }

    #[test]
    fn graph_error_cycle_display() {
        let e = GraphError::Cycle {
            module: "b".to_string(),
            path: "a -> b -> a".to_string(),
        };
        assert_eq!(e.to_string(), "dependency cycle detected at 'b': a -> b -> a");
    }

    // -----------------------------------------------------------------------
    // ExecError
    // -----------------------------------------------------------------------

    #[test]
    fn exec_error_failed_includes_output() {
        let e = ExecError::Failed {
            command: "sudo apt-get install -y -qq foo".to_string(),
            code: Some(100),
            output: "E: Unable to locate package foo\n".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "`sudo apt-get install -y -qq foo` exited with status 100: E: Unable to locate package foo"
        );
        assert_eq!(e.output(), Some("E: Unable to locate package foo\n"));
    }

    #[test]
    fn exec_error_failed_by_signal() {
        let e = ExecError::Failed {
            command: "sleep 100".to_string(),
            code: None,
            output: String::new(),
        };
        assert!(e.to_string().contains("terminated by a signal"));
    }

    #[test]
    fn exec_error_stdin_includes_output() {
        let e = ExecError::Stdin {
            program: "gh".to_string(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
            output: "error validating token\n".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "failed to write stdin of 'gh': broken pipe: error validating token"
        );

        let quiet = ExecError::Stdin {
            program: "gh".to_string(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
            output: "  \n".to_string(),
        };
        assert_eq!(quiet.to_string(), "failed to write stdin of 'gh': broken pipe");
    }

    #[test]
    fn exec_error_not_found_display() {
        let e = ExecError::ExecutableNotFound("zypper".to_string());
        assert_eq!(e.to_string(), "executable 'zypper' not found on PATH");
        assert!(e.output().is_none());
    }

    #[test]
    fn exec_error_spawn_has_source() {
        use std::error::Error as StdError;
        let e = ExecError::Spawn {
            program: "sudo".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
    }

    // -----------------------------------------------------------------------
    // CatalogError / RegistryError
    // -----------------------------------------------------------------------

    #[test]
    fn catalog_error_display() {
        let e = CatalogError::UnsupportedPackageManager("yum".to_string());
        assert_eq!(e.to_string(), "unsupported package manager 'yum'");
    }

    #[test]
    fn registry_hook_error_names_module_and_action() {
        let e = RegistryError::Hook {
            module: "package-manager".to_string(),
            action: Action::Setup,
            source: "boom".into(),
        };
        assert_eq!(
            e.to_string(),
            "setup failed for module 'package-manager': boom"
        );
    }

    #[test]
    fn registry_error_graph_is_transparent() {
        let e: RegistryError = GraphError::MissingDependency {
            dependency: "ghost".to_string(),
            module: "a".to_string(),
        }
        .into();
        assert!(e.to_string().contains("ghost"));
    }

    // -----------------------------------------------------------------------
    // Send + Sync bounds
    // -----------------------------------------------------------------------

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<RegistryError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<GraphError>();
        assert_send_sync::<ExecError>();
        assert_send_sync::<CatalogError>();
    }

    #[test]
    fn exec_error_converts_to_anyhow() {
        let e = ExecError::ExecutableNotFound("dnf".to_string());
        let _anyhow_err: anyhow::Error = e.into();
    }
}
