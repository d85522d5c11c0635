//! Keep the newest status record per `service:tag`.
//!
//! "Newest" is the largest record id. Merging is monotonic: replaying a page,
//! or feeding pages out of order, leaves the same map as merging only the
//! max-id record of each key.

use std::collections::HashMap;

use crate::record::ReplicationStatusRecord;

/// Counters for one or more [`LatestStatusMap::merge_page`] calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Inserted or replaced an entry.
    pub accepted: usize,
    /// Held record already had an id ≥ the incoming one.
    pub stale: usize,
    /// No tags, so no key.
    pub untagged: usize,
}

impl MergeStats {
    fn absorb(&mut self, other: MergeStats) {
        self.accepted += other.accepted;
        self.stale += other.stale;
        self.untagged += other.untagged;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestStatusMap {
    entries: HashMap<String, ReplicationStatusRecord>,
    stats: MergeStats,
}

impl LatestStatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_page(&mut self, page: &[ReplicationStatusRecord]) -> MergeStats {
        let mut stats = MergeStats::default();

        for record in page {
            let Some(key) = record.key() else {
                tracing::debug!("status record {} has no tags, skipped", record.id);
                stats.untagged += 1;
                continue;
            };
            match self.entries.get(&key) {
                Some(held) if held.id >= record.id => stats.stale += 1,
                _ => {
                    self.entries.insert(key, record.clone());
                    stats.accepted += 1;
                }
            }
        }

        self.stats.absorb(stats);
        stats
    }

    pub fn get(&self, key: &str) -> Option<&ReplicationStatusRecord> {
        self.entries.get(key)
    }

    /// Status of `service:tag`, if the feed reported it.
    pub fn status_of(&self, service: &str, tag: &str) -> Option<&str> {
        self.entries
            .get(&format!("{service}:{tag}"))
            .map(|r| r.status.as_str())
    }

    /// Totals over every merge into this map.
    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
