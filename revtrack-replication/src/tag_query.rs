//! Tags that reached UAT but not yet a given production environment.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use revtrack_core::{Environment, ServiceName, StoreError, TagStore};

use crate::merger::LatestStatusMap;

/// Leading entry of every listing; selects "promote everything" downstream.
pub const ALL_ENTRY: &str = "All";

/// Service names dropped from a listing. Exact match only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList(HashSet<String>);

impl ExclusionList {
    /// Parse `a|b|c`. Blank segments are ignored, so `""` excludes nothing.
    pub fn parse(input: &str) -> Self {
        Self(
            input
                .split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn contains(&self, service: &ServiceName) -> bool {
        self.0.contains(service.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagEntry {
    pub service: ServiceName,
    pub tag: String,
    /// Replication status, only when it is known and not `finished`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl fmt::Display for TagEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.tag)?;
        if let Some(status) = &self.status {
            write!(f, ":{status}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagListing {
    pub env: Environment,
    pub entries: Vec<TagEntry>,
    pub excluded: usize,
}

/// `All,svc:tag,svc:tag:status,…`
impl fmt::Display for TagListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ALL_ENTRY)?;
        for entry in &self.entries {
            write!(f, ",{entry}")?;
        }
        Ok(())
    }
}

/// List the tags awaiting promotion to `env`, minus `exclusions`, annotated
/// with any in-flight status from `statuses`.
pub fn eligible_tags<S: TagStore + ?Sized>(
    store: &S,
    env: Environment,
    exclusions: &ExclusionList,
    statuses: &LatestStatusMap,
) -> Result<TagListing, StoreError> {
    let mut listing = TagListing {
        env,
        entries: Vec::new(),
        excluded: 0,
    };

    for record in store.awaiting_promotion(env)? {
        if exclusions.contains(&record.service_name) {
            listing.excluded += 1;
            continue;
        }
        let status = statuses
            .status_of(record.service_name.as_str(), &record.tag)
            .filter(|s| *s != "finished")
            .map(str::to_owned);
        listing.entries.push(TagEntry {
            service: record.service_name,
            tag: record.tag,
            status,
        });
    }

    tracing::info!(
        "{} tag(s) awaiting {env}, {} excluded",
        listing.entries.len(),
        listing.excluded
    );
    Ok(listing)
}
