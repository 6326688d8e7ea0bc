use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "shaper",
    about = "Idempotent convergence engine for a Fedora workstation",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Home directory to provision (defaults to $HOME)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Playbook file (defaults to $SHAPER_PLAYBOOK, then ./playbook.toml)
    #[arg(long, global = true)]
    pub playbook: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run playbook steps in order
    Run(RunOpts),
    /// Run git against a dotfile module with home as the work tree
    Dtf(DtfOpts),
    /// Print or verify a file digest
    Hash(HashOpts),
    /// Download a file over HTTPS
    Fetch(FetchOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Subcommand name, used for the log file name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Dtf(_) => "dtf",
            Self::Hash(_) => "hash",
            Self::Fetch(_) => "fetch",
            Self::Version => "version",
        }
    }
}

/// Options for the `run` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct RunOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Skip steps of these kinds
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only steps of these kinds
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

/// Options for the `dtf` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct DtfOpts {
    /// Dotfile module name
    pub module: String,

    /// Arguments passed to git
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Options for the `hash` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct HashOpts {
    /// File to hash
    pub file: PathBuf,

    /// Digest algorithm: sha224, sha256, sha384 or sha512
    #[arg(short, long, default_value = "sha256")]
    pub algorithm: String,

    /// Expected hex digest; fail if the file does not match
    #[arg(long)]
    pub expect: Option<String>,
}

/// Options for the `fetch` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct FetchOpts {
    /// HTTPS URL to download
    pub url: String,

    /// Target file, or directory to place the URL's file name in
    pub destination: PathBuf,
}
