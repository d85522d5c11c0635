//! `revtrack resolve`: print the services that need a rebuild.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use revtrack_sync::pipeline::{self, RunMode, RunOutcome};
use revtrack_sync::ParserOptions;

use crate::Session;

/// Arguments for `revtrack resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Change log to parse.
    #[arg(long)]
    pub log: PathBuf,

    /// Length of the commit id taken from `@@@` header lines.
    #[arg(long)]
    pub commit_id_length: Option<usize>,
}

impl ResolveArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let options = parser_options(self.commit_id_length, session);
        let mut store = session.open_store()?;

        let outcome = pipeline::run(&self.log, options, RunMode::Reconcile, &mut store)
            .with_context(|| format!("failed to resolve {}", self.log.display()))?;

        if let RunOutcome::Reconciled(report) = outcome {
            println!("{}", report.rebuild_list());
        }
        Ok(())
    }
}

/// Flag value, else the configured length.
pub fn parser_options(commit_id_length: Option<usize>, session: &Session) -> ParserOptions {
    ParserOptions {
        commit_id_len: commit_id_length.unwrap_or(session.config.commit_id_length),
    }
}
