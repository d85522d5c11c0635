//! `revtrack promote`: record a production promotion.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use revtrack_sync::deploy::{promote, PromotionTarget};

use crate::Session;

/// Arguments for `revtrack promote`.
#[derive(Args, Debug)]
pub struct PromoteArgs {
    /// `environment:service:tag`, e.g. `beta:platform/billing:1.4.2`.
    pub target: String,
}

impl PromoteArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let target: PromotionTarget = self.target.parse()?;
        let mut store = session.open_store()?;
        promote(&mut store, &target, Utc::now())
            .with_context(|| format!("failed to promote {}", self.target))?;
        Ok(())
    }
}
