//! `revtrack deployed`: post-deploy write-back.

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use revtrack_core::ServiceName;
use revtrack_sync::deploy::{mark_deployed, record_uat_tags};

use crate::Session;

/// Arguments for `revtrack deployed`.
#[derive(Args, Debug)]
pub struct DeployedArgs {
    /// Comma-separated descriptors that were deployed, as printed by `resolve`.
    #[arg(long)]
    pub descriptors: String,

    /// Space-separated image repositories pushed with `--tag`.
    #[arg(long)]
    pub services: String,

    /// Image tag that reached UAT.
    #[arg(long)]
    pub tag: String,
}

impl DeployedArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let mut store = session.open_store()?;

        let deploy = mark_deployed(
            &mut store,
            self.descriptors.split(',').filter(|d| !d.trim().is_empty()),
        );

        let services: Vec<ServiceName> = self
            .services
            .split_whitespace()
            .map(ServiceName::from)
            .collect();
        record_uat_tags(&mut store, &services, &self.tag, Utc::now());

        println!("{}", deploy.commit_list());
        Ok(())
    }
}
