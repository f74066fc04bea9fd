//! Command-line interface definitions.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "hostforge",
    about = "Single-host configuration management driven by dependency-ordered modules",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared across all subcommands.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Settings file (defaults to $HOSTFORGE_CONFIG or ~/.hostforge/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Never elevate commands with sudo (e.g. when already running as root)
    #[arg(long, global = true)]
    pub no_sudo: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run every enabled module's setup
    Setup,
    /// Run every enabled module's update
    Update,
    /// Run every enabled module's teardown
    Teardown,
    /// Write the current settings (with defaults filled in) to the settings file
    Generate,
    /// Print version information
    Version,
}
