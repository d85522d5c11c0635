//! Post-deploy write-back and promotion bookkeeping.
//!
//! - [`mark_deployed`]: flip `deployed = 1` for just-deployed descriptors and
//!   collect their commit ids.
//! - [`record_uat_tags`]: a new image tag reached UAT; production promotions
//!   of the previous tag no longer apply.
//! - [`promote`]: mark one `(service, tag)` as promoted to alpha or beta.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use revtrack_core::{
    CommitId, Environment, NewServiceTag, RevisionStore, ServiceName, ServiceTagRecord, TagStore,
};

use crate::error::{StoreOperation, StoreWarning, SyncError};

// ---------------------------------------------------------------------------
// Deployed flag
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    /// Commit ids of every existing record named by a descriptor, in input
    /// order, whether or not its `deployed` write succeeded.
    pub commits: Vec<CommitId>,
    /// Services with no record; nothing was written for them.
    pub unknown: Vec<ServiceName>,
    pub warnings: Vec<StoreWarning>,
}

impl DeployReport {
    /// Pipe-joined commit ids.
    pub fn commit_list(&self) -> String {
        self.commits
            .iter()
            .map(CommitId::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Set `deployed = 1` on the record behind each `<service>/pom.xml`
/// descriptor and collect its commit id. Paths without a build descriptor and
/// services without a record are skipped. A failed write becomes a warning
/// and does not change the emitted commit list.
pub fn mark_deployed<S, I, P>(store: &mut S, descriptors: I) -> DeployReport
where
    S: RevisionStore + ?Sized,
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    let mut report = DeployReport::default();

    for descriptor in descriptors {
        let descriptor = descriptor.as_ref().trim();
        let Some(service) = ServiceName::from_descriptor_path(descriptor) else {
            tracing::debug!("not a build descriptor, skipped: {descriptor:?}");
            continue;
        };

        let mut record = match store.find_revision(&service) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("no revision record for {service}");
                report.unknown.push(service);
                continue;
            }
            Err(err) => {
                report
                    .warnings
                    .push(StoreWarning::record(&service, StoreOperation::Lookup, &err));
                continue;
            }
        };

        record.deployed = true;
        if let Err(err) = store.update_revision(&record) {
            report
                .warnings
                .push(StoreWarning::record(&service, StoreOperation::Update, &err));
        }
        // Emitted even when the write failed; the next run retries it.
        report.commits.push(record.commit_id);
    }

    tracing::info!(
        "collected {} deployed commit(s), {} unknown, {} store warning(s)",
        report.commits.len(),
        report.unknown.len(),
        report.warnings.len()
    );
    report
}

// ---------------------------------------------------------------------------
// UAT tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagWriteReport {
    pub written: Vec<ServiceName>,
    pub warnings: Vec<StoreWarning>,
}

/// Upsert `tag` for every service with `uat = 1` and both production flags
/// reset.
pub fn record_uat_tags<S>(
    store: &mut S,
    services: &[ServiceName],
    tag: &str,
    now: DateTime<Utc>,
) -> TagWriteReport
where
    S: TagStore + ?Sized,
{
    let mut report = TagWriteReport::default();

    for service in services {
        let result = match store.find_tag(service) {
            Ok(Some(existing)) => {
                let record = ServiceTagRecord {
                    tag: tag.to_owned(),
                    uat: true,
                    prod_beta: false,
                    prod_alpha: false,
                    updated_at: now,
                    ..existing
                };
                store
                    .update_tag(&record)
                    .map_err(|err| StoreWarning::record(service, StoreOperation::Update, &err))
            }
            Ok(None) => store
                .insert_tag(&NewServiceTag::uat(service.clone(), tag, now))
                .map(|_| ())
                .map_err(|err| StoreWarning::record(service, StoreOperation::Insert, &err)),
            Err(err) => Err(StoreWarning::record(service, StoreOperation::Lookup, &err)),
        };

        match result {
            Ok(()) => report.written.push(service.clone()),
            Err(warning) => report.warnings.push(warning),
        }
    }

    tracing::info!(
        "recorded tag {tag} for {} service(s), {} store warning(s)",
        report.written.len(),
        report.warnings.len()
    );
    report
}

// ---------------------------------------------------------------------------
// Promotion
// ---------------------------------------------------------------------------

/// `environment:service:tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionTarget {
    pub env: Environment,
    pub service: ServiceName,
    pub tag: String,
}

impl FromStr for PromotionTarget {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| SyncError::InvalidPromotion {
            input: s.to_owned(),
            reason,
        };

        let fields: Vec<&str> = s.split(':').collect();
        let [env, service, tag] = fields.as_slice() else {
            return Err(invalid(format!(
                "expected environment:service:tag, got {} field(s)",
                fields.len()
            )));
        };
        if service.is_empty() || tag.is_empty() {
            return Err(invalid("service and tag must be non-empty".to_string()));
        }
        let env = env.parse::<Environment>().map_err(invalid)?;

        Ok(Self {
            env,
            service: ServiceName::from(*service),
            tag: (*tag).to_owned(),
        })
    }
}

/// Whether [`promote`] found a matching record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionOutcome {
    Promoted,
    NoMatch,
}

/// Raise the production flag for `target.env` on the record matching
/// `(service, tag)`. A missing or re-tagged record is a silent no-op.
pub fn promote<S>(
    store: &mut S,
    target: &PromotionTarget,
    now: DateTime<Utc>,
) -> Result<PromotionOutcome, SyncError>
where
    S: TagStore + ?Sized,
{
    let Some(mut record) = store
        .find_tag(&target.service)?
        .filter(|r| r.tag == target.tag)
    else {
        tracing::info!(
            "no tag record for {}:{}, promotion skipped",
            target.service,
            target.tag
        );
        return Ok(PromotionOutcome::NoMatch);
    };

    record.promote(target.env);
    record.updated_at = now;
    store.update_tag(&record)?;
    tracing::info!(
        "promoted {}:{} to {}",
        target.service,
        target.tag,
        target.env
    );
    Ok(PromotionOutcome::Promoted)
}
