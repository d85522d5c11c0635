//! Reconcile a freshly parsed revision index against the persisted
//! `service_revision` records.
//!
//! Decision per service with a non-empty revision sequence:
//! 1. no record → insert `deployed = 0`, emit `New`
//! 2. stored revision differs → update revision/commit, force `deployed = 0`,
//!    emit `RevisionChanged`
//! 3. same revision but `deployed = 0` → emit `PendingDeploy`, no write
//! 4. otherwise nothing
//!
//! Reading the record set is fatal on failure. Single-record writes are
//! best-effort: a failure becomes a [`StoreWarning`] and the emission stands.

use std::collections::HashMap;

use serde::Serialize;

use revtrack_core::{
    ChangeId, NewServiceRevision, RevisionStore, ServiceName, ServiceRevisionRecord,
};

use crate::error::{StoreOperation, StoreWarning, SyncError};
use crate::parser::ParsedLog;

/// Why a service is on the rebuild list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RebuildReason {
    /// First sighting; a record was created.
    New,
    /// The latest revision moved since the last recorded one.
    RevisionChanged { previous: ChangeId },
    /// Revision unchanged but the last build was never marked deployed.
    PendingDeploy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildEntry {
    pub service: ServiceName,
    pub revision: ChangeId,
    #[serde(flatten)]
    pub reason: RebuildReason,
}

impl RebuildEntry {
    /// `<service>/pom.xml`
    pub fn descriptor(&self) -> String {
        self.service.descriptor_path()
    }
}

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub rebuild: Vec<RebuildEntry>,
    pub warnings: Vec<StoreWarning>,
}

impl ReconcileReport {
    /// Comma-joined descriptor paths: the pipeline's rebuild list.
    pub fn rebuild_list(&self) -> String {
        self.rebuild
            .iter()
            .map(RebuildEntry::descriptor)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceName> {
        self.rebuild.iter().map(|e| &e.service)
    }
}

/// Diff `parsed` against `store`, apply the minimal writes, and report what
/// needs rebuilding.
pub fn reconcile<S: RevisionStore + ?Sized>(
    parsed: &ParsedLog,
    store: &mut S,
) -> Result<ReconcileReport, SyncError> {
    let existing: HashMap<ServiceName, ServiceRevisionRecord> = store
        .list_revisions()?
        .into_iter()
        .map(|r| (r.service_name.clone(), r))
        .collect();

    let mut report = ReconcileReport::default();

    for (service, revisions) in parsed.index.iter() {
        let Some(latest) = revisions.first() else {
            continue;
        };

        let reason = match existing.get(service) {
            None => {
                let record = NewServiceRevision {
                    service_name: service.clone(),
                    rev_id: latest.clone(),
                    commit_id: parsed.commits.commit_for(latest),
                    deployed: false,
                };
                if let Err(err) = store.insert_revision(&record) {
                    report
                        .warnings
                        .push(StoreWarning::record(service, StoreOperation::Insert, &err));
                }
                RebuildReason::New
            }
            Some(record) if &record.rev_id != latest => {
                let updated = ServiceRevisionRecord {
                    rev_id: latest.clone(),
                    commit_id: parsed.commits.commit_for(latest),
                    deployed: false,
                    ..record.clone()
                };
                if let Err(err) = store.update_revision(&updated) {
                    report
                        .warnings
                        .push(StoreWarning::record(service, StoreOperation::Update, &err));
                }
                RebuildReason::RevisionChanged {
                    previous: record.rev_id.clone(),
                }
            }
            Some(record) if !record.deployed => RebuildReason::PendingDeploy,
            Some(_) => continue,
        };

        tracing::debug!("rebuild {service}: {reason:?}");
        report.rebuild.push(RebuildEntry {
            service: service.clone(),
            revision: latest.clone(),
            reason,
        });
    }

    tracing::info!(
        "reconciled {} service(s): {} need rebuild, {} store warning(s)",
        parsed.index.len(),
        report.rebuild.len(),
        report.warnings.len()
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// Outcome of a seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub seeded: Vec<ServiceName>,
    pub warnings: Vec<StoreWarning>,
}

/// Record every parsed service as already deployed at its latest revision,
/// bypassing the diff. Used to initialise a store for an existing repository.
pub fn seed<S: RevisionStore + ?Sized>(parsed: &ParsedLog, store: &mut S) -> SeedReport {
    let mut report = SeedReport::default();

    for (service, revisions) in parsed.index.iter() {
        let Some(latest) = revisions.first() else {
            continue;
        };
        let record = NewServiceRevision {
            service_name: service.clone(),
            rev_id: latest.clone(),
            commit_id: parsed.commits.commit_for(latest),
            deployed: true,
        };

        let result = match store.find_revision(service) {
            Ok(Some(existing)) => store
                .update_revision(&record.with_id(existing.id))
                .map_err(|err| StoreWarning::record(service, StoreOperation::Update, &err)),
            Ok(None) => store
                .insert_revision(&record)
                .map(|_| ())
                .map_err(|err| StoreWarning::record(service, StoreOperation::Insert, &err)),
            Err(err) => Err(StoreWarning::record(service, StoreOperation::Lookup, &err)),
        };

        match result {
            Ok(()) => report.seeded.push(service.clone()),
            Err(warning) => report.warnings.push(warning),
        }
    }

    tracing::info!(
        "seeded {} service(s) as deployed, {} store warning(s)",
        report.seeded.len(),
        report.warnings.len()
    );
    report
}
