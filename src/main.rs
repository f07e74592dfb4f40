mod cli;
mod commands;
mod config;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Output settings shared by every subcommand.
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn log_level(verbose: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose, cli.quiet))
        .format_timestamp(None)
        .format_target(cli.verbose > 1)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Run(args) => commands::run::run(&ctx, args),
        Command::Merge(args) => commands::merge::run(&ctx, args),
        Command::Validate(args) => commands::validate::run(&ctx, &args.config),
        Command::List(args) => commands::list::run(&ctx, &args.config),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "xmlmerger", &mut io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, false), log::LevelFilter::Warn);
        assert_eq!(log_level(1, false), log::LevelFilter::Info);
        assert_eq!(log_level(5, false), log::LevelFilter::Trace);
        assert_eq!(log_level(3, true), log::LevelFilter::Error);
    }
}
