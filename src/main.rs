//! `hostforge` command-line entry point.
use anyhow::Result;
use clap::Parser;

use hostforge::cli::{Cli, Command};
use hostforge::registry::Action;
use hostforge::{commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    logging::init_subscriber(args.verbose);

    match args.command {
        Command::Setup => commands::lifecycle::run(&args.global, Action::Setup),
        Command::Update => commands::lifecycle::run(&args.global, Action::Update),
        Command::Teardown => commands::lifecycle::run(&args.global, Action::Teardown),
        Command::Generate => commands::generate::run(&args.global),
        Command::Version => {
            let version = option_env!("HOSTFORGE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
            #[allow(clippy::print_stdout)]
            {
                println!("hostforge {version}");
            }
            Ok(())
        }
    }
}
