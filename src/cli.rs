//! CLI argument parsing for the freeze/unfreeze workflow.
//!
//! Both subcommands share one flag set; the subcommand only picks the
//! direction of the `IsFrozen` change.
use crate::filter::{LockAction, DEFAULT_EXCEPT};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "org-user",
    version,
    about = "Freeze or unfreeze Salesforce user logins in bulk, with a confirmed preview",
    after_help = "Examples:\n  org-user unfreeze --target-org dimitri.monge@gmail.com\n  org-user unfreeze -u my-org --name Dimitri --except \"System Administrator\"\n  org-user freeze -u my-org --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Unfreeze frozen logins of active users
    Unfreeze(LockArgs),
    /// Freeze logins of active users
    Freeze(LockArgs),
}

impl Command {
    pub fn into_parts(self) -> (LockAction, LockArgs) {
        match self {
            Command::Unfreeze(args) => (LockAction::Unfreeze, args),
            Command::Freeze(args) => (LockAction::Freeze, args),
        }
    }
}

/// Inputs shared by `freeze` and `unfreeze`.
#[derive(Parser, Debug)]
pub struct LockArgs {
    /// Username or alias of the org to act on
    #[arg(short = 'u', long, value_name = "USERNAME")]
    pub target_org: String,

    /// Only select users whose name contains this text
    #[arg(short = 'n', long, value_name = "TEXT")]
    pub name: Option<String>,

    /// Comma-separated profile names to leave untouched
    #[arg(
        short = 'e',
        long,
        value_name = "PROFILES",
        default_value = DEFAULT_EXCEPT
    )]
    pub except: String,

    /// Log generated Apex and raw execution logs
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Abort a remote call that runs longer than this many seconds
    #[arg(
        long,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,

    /// Runner config file (overrides the default location)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
