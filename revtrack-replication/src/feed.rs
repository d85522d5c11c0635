//! Paginated access to the registry's replication status feed.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use revtrack_core::config::FeedConfig;

use crate::error::{io_err, FeedError};
use crate::merger::LatestStatusMap;
use crate::record::ReplicationStatusRecord;

/// Source of status pages. Pages are numbered from 1.
pub trait StatusFeed {
    fn fetch_page(
        &self,
        policy_id: u32,
        page: u32,
    ) -> Result<Vec<ReplicationStatusRecord>, FeedError>;
}

/// Decode one page body. `origin` only labels the error.
pub fn decode_page(origin: &str, body: &str) -> Result<Vec<ReplicationStatusRecord>, FeedError> {
    serde_json::from_str(body).map_err(|source| FeedError::Json {
        origin: origin.to_owned(),
        source,
    })
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// `GET <base>/api/jobs/replication?policy_id=&page=&page_size=` with basic auth.
pub struct HttpStatusFeed {
    agent: ureq::Agent,
    endpoint: String,
    authorization: String,
    page_size: u32,
}

impl HttpStatusFeed {
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        page_size: u32,
        timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let credentials = STANDARD.encode(format!("{username}:{password}"));
        Self {
            agent,
            endpoint: format!("{}/api/jobs/replication", base_url.trim_end_matches('/')),
            authorization: format!("Basic {credentials}"),
            page_size,
        }
    }

    /// `None` when no `base_url` is configured.
    pub fn from_config(config: &FeedConfig) -> Option<Self> {
        let base_url = config.base_url.as_deref()?;
        Some(Self::new(
            base_url,
            &config.username,
            &config.password,
            config.page_size,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl StatusFeed for HttpStatusFeed {
    fn fetch_page(
        &self,
        policy_id: u32,
        page: u32,
    ) -> Result<Vec<ReplicationStatusRecord>, FeedError> {
        let origin = format!("{}?policy_id={policy_id}&page={page}", self.endpoint);
        tracing::debug!("fetching {origin}");

        let response = self
            .agent
            .get(&self.endpoint)
            .query("policy_id", &policy_id.to_string())
            .query("page", &page.to_string())
            .query("page_size", &self.page_size.to_string())
            .set("Authorization", &self.authorization)
            .call()
            .map_err(|e| FeedError::Http {
                url: origin.clone(),
                source: Box::new(e),
            })?;

        let body = response.into_string().map_err(|e| io_err(&origin, e))?;
        decode_page(&origin, &body)
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Walk pages 1..=`max_pages`, merging each, until a page comes back empty or
/// shorter than `page_size`. A fetch error is logged and ends the walk; the
/// records merged so far are kept.
pub fn collect_latest<F: StatusFeed + ?Sized>(
    feed: &F,
    policy_id: u32,
    page_size: u32,
    max_pages: u32,
) -> LatestStatusMap {
    let mut map = LatestStatusMap::new();

    for page in 1..=max_pages {
        let records = match feed.fetch_page(policy_id, page) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!("status feed unavailable, continuing without it: {err}");
                break;
            }
        };
        let fetched = records.len();
        map.merge_page(&records);

        if fetched == 0 || fetched < page_size as usize {
            break;
        }
        if page == max_pages {
            tracing::warn!("stopped after {max_pages} status page(s); older records ignored");
        }
    }

    let stats = map.stats();
    tracing::info!(
        "policy {policy_id}: {} status key(s), {} stale, {} untagged",
        map.len(),
        stats.stale,
        stats.untagged
    );
    map
}
