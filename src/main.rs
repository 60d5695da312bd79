mod cli;
mod commands;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands};
use commands::deploy::Operation;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity. Node progress lines come out
    // of deploykit at info level, command detail at debug.
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Warn
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Create { name } => commands::create::run(&ctx, &name),
        Commands::Deploy(args) => commands::deploy::run(&ctx, Operation::Deploy, &args),
        Commands::Upload(args) => commands::deploy::run(&ctx, Operation::Upload, &args),
        Commands::Apply(args) => commands::deploy::run(&ctx, Operation::Apply, &args),
        Commands::Nodes(cmd) => commands::nodes::run(&ctx, cmd),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "skiff", &mut io::stdout());
            Ok(())
        }
    }
}
