//! `revtrack tags`: tags awaiting promotion, gated on replication status.

use anyhow::{Context, Result};
use clap::Args;

use revtrack_core::Environment;
use revtrack_replication::{
    collect_latest, eligible_tags, ExclusionList, HttpStatusFeed, LatestStatusMap,
};

use crate::Session;

/// Arguments for `revtrack tags`.
#[derive(Args, Debug)]
pub struct TagsArgs {
    /// Target environment: alpha or beta.
    pub env: Environment,

    /// Pipe-separated services to leave out, e.g. `"svcA|svcB"`.
    #[arg(long, default_value = "")]
    pub exclude: String,
}

impl TagsArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let feed_config = &session.config.feed;
        let statuses = match HttpStatusFeed::from_config(feed_config) {
            Some(feed) => collect_latest(
                &feed,
                feed_config.policies.for_env(self.env),
                feed_config.page_size,
                feed_config.max_pages,
            ),
            None => {
                tracing::debug!("no feed.base_url configured; skipping replication status");
                LatestStatusMap::new()
            }
        };

        let store = session.open_store()?;
        let exclusions = ExclusionList::parse(&self.exclude);
        let listing = eligible_tags(&store, self.env, &exclusions, &statuses)
            .with_context(|| format!("failed to query tags awaiting {}", self.env))?;

        println!("{listing}");
        Ok(())
    }
}
