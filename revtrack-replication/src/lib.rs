//! # revtrack-replication
//!
//! Folds an external replication-status feed into a [`LatestStatusMap`] and
//! answers "which UAT tags are still waiting for environment X" queries.
//!
//! ```text
//! StatusFeed ──pages──▶ collect_latest ──▶ LatestStatusMap ─┐
//!                                                          ├─▶ eligible_tags ──▶ "All,svc:tag,…"
//! TagStore ──awaiting_promotion(env)──────────────────────┘
//! ```

pub mod error;
pub mod feed;
pub mod merger;
pub mod record;
pub mod tag_query;

pub use error::FeedError;
pub use feed::{collect_latest, HttpStatusFeed, StatusFeed};
pub use merger::{LatestStatusMap, MergeStats};
pub use record::ReplicationStatusRecord;
pub use tag_query::{eligible_tags, ExclusionList, TagEntry, TagListing};
