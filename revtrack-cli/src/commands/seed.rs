//! `revtrack seed`: initialise the store from an existing history.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use revtrack_sync::pipeline::{self, RunMode, RunOutcome};

use super::resolve::parser_options;
use crate::Session;

/// Arguments for `revtrack seed`.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Change log to parse.
    #[arg(long)]
    pub log: PathBuf,

    /// Length of the commit id taken from `@@@` header lines.
    #[arg(long)]
    pub commit_id_length: Option<usize>,
}

impl SeedArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let options = parser_options(self.commit_id_length, session);
        let mut store = session.open_store()?;

        let outcome = pipeline::run(&self.log, options, RunMode::Seed, &mut store)
            .with_context(|| format!("failed to seed from {}", self.log.display()))?;

        if let RunOutcome::Seeded(report) = outcome {
            println!(
                "Seeded {} service(s); {} warning(s).",
                report.seeded.len(),
                report.warnings.len()
            );
        }
        Ok(())
    }
}
