//! Persisted record stores.
//!
//! Two tables, two traits: [`RevisionStore`] for `service_revision` and
//! [`TagStore`] for `service_tag`. Every mutation is a single-row statement;
//! there are no multi-row transactions, so concurrent invocations race per
//! record and the last write wins.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::types::{
    Environment, NewServiceRevision, NewServiceTag, ServiceName, ServiceRevisionRecord,
    ServiceTagRecord,
};

/// Per-service revision records.
pub trait RevisionStore {
    /// Every record, ordered by id.
    fn list_revisions(&self) -> Result<Vec<ServiceRevisionRecord>, StoreError>;

    fn find_revision(
        &self,
        service: &ServiceName,
    ) -> Result<Option<ServiceRevisionRecord>, StoreError>;

    /// Insert a record and return its assigned id.
    fn insert_revision(&mut self, record: &NewServiceRevision) -> Result<i64, StoreError>;

    /// Overwrite `rev_id`, `commit_id` and `deployed` of the row with `record.id`.
    fn update_revision(&mut self, record: &ServiceRevisionRecord) -> Result<(), StoreError>;
}

/// Per-service image tag and promotion flags.
pub trait TagStore {
    fn find_tag(&self, service: &ServiceName) -> Result<Option<ServiceTagRecord>, StoreError>;

    fn insert_tag(&mut self, record: &NewServiceTag) -> Result<i64, StoreError>;

    /// Overwrite every column except `service_name` of the row with `record.id`.
    fn update_tag(&mut self, record: &ServiceTagRecord) -> Result<(), StoreError>;

    /// Records with `uat = 1` whose flag for `env` is still 0, ordered by id.
    fn awaiting_promotion(&self, env: Environment) -> Result<Vec<ServiceTagRecord>, StoreError>;
}
