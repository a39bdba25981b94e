//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Provision this node's identity for the mesh overlay.
#[derive(Parser, Debug)]
#[command(name = "meshkit", version, about)]
pub struct Cli {
    /// Directory holding keys, certificates and node config
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    pub config_path: PathBuf,

    /// Controller bootstrap URL (e.g. https://controller.example.com/api)
    #[arg(long, value_name = "URL", global = true)]
    pub server: Option<String>,

    /// Template copied to default.yml on first run
    #[arg(long, value_name = "PATH", global = true)]
    pub template: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout: Option<u64>,

    /// How long to wait for an interactive login, in seconds
    #[arg(long, value_name = "SECS", global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub login_timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Log in through the controller's identity provider
    Login,

    /// Enroll non-interactively with a one-time token
    Enroll {
        /// One-time enrollment token issued by the controller
        #[arg(long, value_name = "TOKEN")]
        token: String,
    },
}

/// Process exit code for an argument error.
///
/// `--help` and `--version` exit 0; every real usage error exits 1 like any
/// other failure.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}
