//! Single-host configuration management engine.
//!
//! Independently written modules declare their dependencies, parse their own
//! slice of a YAML settings file, and are driven through `setup`, `update`,
//! and `teardown` in dependency order. Every host command goes through a
//! swappable runner so module behaviour can be tested without touching the
//! system.
//!
//! The public API is organised into layers:
//!
//! - **[`exec`]**: host command execution with pluggable elevation
//! - **[`catalog`]**: package-manager argument vocabulary and resolution
//! - **[`modules`]**: the module contract and built-in modules
//! - **[`registry`]**: dependency ordering and lifecycle execution
//! - **[`config`]**: settings file loading and persistence
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod modules;
pub mod platform;
pub mod registry;
