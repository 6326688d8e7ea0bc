use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use shaper::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose, args.command.name());
    let log = Arc::new(logging::Logger::new(args.command.name()));

    match &args.command {
        cli::Command::Run(opts) => commands::run::run(&args.global, opts, &log),
        cli::Command::Dtf(opts) => commands::dtf::run(&args.global, opts, &log),
        cli::Command::Hash(opts) => commands::hash::run(opts),
        cli::Command::Fetch(opts) => commands::fetch::run(opts, &log),
        cli::Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
