use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod apex;
mod batch;
mod cli;
mod config;
mod confirm;
mod error;
mod extract;
mod filter;
mod report;
#[cfg(test)]
mod testing;
mod workflow;

use crate::apex::{ClientIdentity, SfCliExecutor};
use crate::batch::BatchOperation;
use crate::cli::{LockArgs, RootArgs};
use crate::confirm::TerminalConfirm;
use crate::filter::{FilterCriteria, LockAction};
use crate::workflow::run_workflow;

fn main() -> Result<()> {
    let root = RootArgs::parse();
    let (action, args) = root.command.into_parts();
    init_tracing(args.debug);
    run(action, args)
}

fn init_tracing(debug: bool) {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(action: LockAction, args: LockArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_runner_config()?,
    }
    .with_timeout_secs(args.timeout);

    let filter = FilterCriteria::from_flags(args.name.as_deref(), &args.except)?;
    let identity = ClientIdentity::new(args.target_org);
    let executor = SfCliExecutor::new(config);
    let batch = BatchOperation::new(&executor, &identity, &filter, action, args.debug);
    let mut confirmer = TerminalConfirm::stdio();

    // Keep stdout clean for the JSON document.
    let outcome = if args.json {
        run_workflow(&batch, &mut confirmer, &mut io::stderr())?
    } else {
        run_workflow(&batch, &mut confirmer, &mut io::stdout())?
    };
    tracing::debug!(states = ?outcome.states, "workflow path");

    if args.json {
        let value = outcome.summary.json_output(outcome.org_id.as_deref());
        let text = serde_json::to_string_pretty(&value).context("serialize JSON output")?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{text}").context("write JSON output")?;
    }
    Ok(())
}
