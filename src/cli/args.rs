//! CLI argument definitions using clap

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

/// TypoScript condition matching and configuration reference resolution
#[derive(Parser, Debug)]
#[command(name = "tsconf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file (default: ./.tsconf.toml)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Match a condition like '[hostname = localhost] && [date("G") >= 8]'
    ///
    /// Prints true or false; exits 0 on a match and 1 otherwise.
    Match {
        /// Condition expression
        expression: String,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Print the canonical form of a condition
    Normalize {
        /// Condition expression
        expression: String,
    },

    /// Parse a user function call and show its typed arguments
    Args {
        /// Call like 'myFunc(1, "a, b", true)'
        call: String,
    },

    /// Resolve references in a tree file
    Resolve {
        /// TOML tree file (default: tree_file from config)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Resolve only the subtree at this dotted path
        #[arg(short, long)]
        path: Option<String>,

        /// Show as tree instead of flat assignments
        #[arg(long)]
        tree: bool,
    },

    /// Inspect registered form elements of a tree file
    Elements {
        /// TOML tree file (default: tree_file from config)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Path of the form plugin (default: form_path from config)
        #[arg(short, long)]
        path: Option<String>,

        /// Show html attributes and template of one element
        #[arg(short, long)]
        element: Option<String>,

        /// Partial type for the element template
        #[arg(long, requires = "element")]
        partial_type: Option<String>,

        /// Look up the class registered under this name
        #[arg(long)]
        class: Option<String>,

        /// Scope of --class
        #[arg(long, default_value = "registeredValidators")]
        scope: String,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Request data for `match`; unset values come from the system and config.
#[derive(Args, Debug, Default, Clone)]
pub struct RequestArgs {
    /// Remote address of the client
    #[arg(long)]
    pub ip: Option<String>,

    /// X-Forwarded-For header
    #[arg(long)]
    pub forwarded_for: Option<String>,

    /// Host name (default: this machine's)
    #[arg(long)]
    pub hostname: Option<String>,

    /// Application context (default: from config)
    #[arg(long)]
    pub context: Option<String>,

    /// Point in time, RFC 3339 (default: now)
    #[arg(long, value_parser = parse_rfc3339)]
    pub now: Option<DateTime<FixedOffset>>,

    /// Accept-Language header
    #[arg(long)]
    pub language: Option<String>,

    /// Id of the logged-in frontend user
    #[arg(long)]
    pub user: Option<i64>,

    /// Group ids of the frontend user
    #[arg(long, value_delimiter = ',', requires = "user")]
    pub groups: Vec<i64>,
}

fn parse_rfc3339(s: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("{}: {}", s, e))
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented config template
    Template,
    /// Show config file locations
    Path,
}
