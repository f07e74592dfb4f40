use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xmlmerger")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Merge XML files into one, driven by a batch file", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run every merge job in the batch file
    Run(RunArgs),

    /// Merge files given on the command line into one target
    Merge(MergeArgs),

    /// Check every job (sources, properties, directives) without writing
    Validate(ConfigArgs),

    /// List the jobs in the batch file
    List(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Batch file describing the merge jobs
    #[arg(short, long, env = "XMLMERGER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

// ============================================================================
// Run
// ============================================================================

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Keep running later jobs after one fails
    #[arg(short, long)]
    pub keep_going: bool,

    /// Number of jobs to run in parallel (requires --keep-going)
    #[arg(short, long, requires = "keep_going")]
    pub jobs: Option<usize>,

    /// Only run jobs writing these targets
    #[arg(long, value_name = "TARGET")]
    pub only: Vec<PathBuf>,
}

// ============================================================================
// Merge
// ============================================================================

#[derive(Args)]
pub struct MergeArgs {
    /// File to write the merged document to
    #[arg(short, long)]
    pub output: PathBuf,

    /// Properties file with merge directives
    #[arg(short, long)]
    pub properties: Option<PathBuf>,

    /// XML files to merge, later files overlay earlier ones
    #[arg(required = true, num_args = 1..)]
    pub sources: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "xmlmerger", "-vv", "run", "--config", "jobs.toml", "--keep-going", "-j", "4",
            "--only", "out/web.xml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.config.config, PathBuf::from("jobs.toml"));
                assert!(args.keep_going);
                assert_eq!(args.jobs, Some(4));
                assert_eq!(args.only, vec![PathBuf::from("out/web.xml")]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_jobs_requires_keep_going() {
        assert!(Cli::try_parse_from(["xmlmerger", "run", "-j", "2"]).is_err());
    }

    #[test]
    fn test_parse_merge() {
        let cli = Cli::try_parse_from([
            "xmlmerger", "merge", "-o", "out.xml", "-p", "m.properties", "a.xml", "b.xml",
        ])
        .unwrap();
        match cli.command {
            Command::Merge(args) => {
                assert_eq!(args.output, PathBuf::from("out.xml"));
                assert_eq!(args.properties, Some(PathBuf::from("m.properties")));
                assert_eq!(args.sources.len(), 2);
            }
            _ => panic!("expected merge"),
        }
    }

    #[test]
    fn test_merge_requires_sources() {
        assert!(Cli::try_parse_from(["xmlmerger", "merge", "-o", "out.xml"]).is_err());
    }
}
