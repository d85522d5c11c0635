//! One entry of the replication status feed.

use serde::{Deserialize, Serialize};

/// A replication job as reported by the registry. Unknown fields are ignored
/// and missing ones default, so older and newer registry versions both decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationStatusRecord {
    pub id: i64,
    pub status: String,
    /// `<project>/<service>`
    pub repository: String,
    pub policy_id: i64,
    pub operation: String,
    /// Only the last tag is relevant.
    pub tags: Vec<String>,
    pub creation_time: String,
    pub update_time: String,
}

impl ReplicationStatusRecord {
    /// Repository text after the first `/`, or the whole string without one.
    pub fn service(&self) -> &str {
        match self.repository.split_once('/') {
            Some((_, rest)) => rest,
            None => &self.repository,
        }
    }

    /// `service:tag` keyed on the last tag; `None` when the record has no tags.
    pub fn key(&self) -> Option<String> {
        let tag = self.tags.last()?;
        Some(format!("{}:{tag}", self.service()))
    }

    pub fn is_finished(&self) -> bool {
        self.status == "finished"
    }
}
