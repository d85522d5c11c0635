use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::store::{RevisionStore, TagStore};
use crate::types::{
    Environment, NewServiceRevision, NewServiceTag, ServiceName, ServiceRevisionRecord,
    ServiceTagRecord,
};

/// In-memory store for tests. Enforces the same one-record-per-service rule
/// as the SQLite schema.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    revisions: BTreeMap<ServiceName, ServiceRevisionRecord>,
    tags: BTreeMap<ServiceName, ServiceTagRecord>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl RevisionStore for MemoryStore {
    fn list_revisions(&self) -> Result<Vec<ServiceRevisionRecord>, StoreError> {
        let mut records: Vec<_> = self.revisions.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn find_revision(
        &self,
        service: &ServiceName,
    ) -> Result<Option<ServiceRevisionRecord>, StoreError> {
        Ok(self.revisions.get(service).cloned())
    }

    fn insert_revision(&mut self, record: &NewServiceRevision) -> Result<i64, StoreError> {
        if self.revisions.contains_key(&record.service_name) {
            return Err(StoreError::Duplicate {
                table: "service_revision",
                service: record.service_name.clone(),
            });
        }
        let id = self.allocate_id();
        self.revisions
            .insert(record.service_name.clone(), record.clone().with_id(id));
        Ok(id)
    }

    fn update_revision(&mut self, record: &ServiceRevisionRecord) -> Result<(), StoreError> {
        let Some(existing) = self.revisions.values_mut().find(|r| r.id == record.id) else {
            return Err(StoreError::RowNotFound {
                table: "service_revision",
                id: record.id,
            });
        };
        existing.rev_id = record.rev_id.clone();
        existing.commit_id = record.commit_id.clone();
        existing.deployed = record.deployed;
        Ok(())
    }
}

impl TagStore for MemoryStore {
    fn find_tag(&self, service: &ServiceName) -> Result<Option<ServiceTagRecord>, StoreError> {
        Ok(self.tags.get(service).cloned())
    }

    fn insert_tag(&mut self, record: &NewServiceTag) -> Result<i64, StoreError> {
        if self.tags.contains_key(&record.service_name) {
            return Err(StoreError::Duplicate {
                table: "service_tag",
                service: record.service_name.clone(),
            });
        }
        let id = self.allocate_id();
        self.tags
            .insert(record.service_name.clone(), record.clone().with_id(id));
        Ok(id)
    }

    fn update_tag(&mut self, record: &ServiceTagRecord) -> Result<(), StoreError> {
        let Some(existing) = self.tags.values_mut().find(|r| r.id == record.id) else {
            return Err(StoreError::RowNotFound {
                table: "service_tag",
                id: record.id,
            });
        };
        let service_name = existing.service_name.clone();
        *existing = ServiceTagRecord {
            service_name,
            ..record.clone()
        };
        Ok(())
    }

    fn awaiting_promotion(&self, env: Environment) -> Result<Vec<ServiceTagRecord>, StoreError> {
        let mut records: Vec<_> = self
            .tags
            .values()
            .filter(|r| r.uat && !r.is_promoted_to(env))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}
