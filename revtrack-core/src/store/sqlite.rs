//! SQLite-backed store.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreError;
use crate::store::{RevisionStore, TagStore};
use crate::types::{
    ChangeId, CommitId, Environment, NewServiceRevision, NewServiceTag, ServiceName,
    ServiceRevisionRecord, ServiceTagRecord,
};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const REVISION_COLUMNS: &str = "id, service_name, rev_id, commit_id, deployed";
const TAG_COLUMNS: &str = "id, service_name, tag, uat, prod_beta, prod_alpha, updated_at";

/// Both tables in one SQLite database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// A private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

/// Raw `service_tag` row before the timestamp column is decoded.
struct TagRow {
    id: i64,
    service_name: String,
    tag: String,
    uat: bool,
    prod_beta: bool,
    prod_alpha: bool,
    updated_at: String,
}

impl TagRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            service_name: row.get(1)?,
            tag: row.get(2)?,
            uat: row.get(3)?,
            prod_beta: row.get(4)?,
            prod_alpha: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<ServiceTagRecord, StoreError> {
        let updated_at = DateTime::parse_from_rfc3339(&self.updated_at)
            .map_err(|_| StoreError::Corrupt {
                column: "service_tag.updated_at",
                value: self.updated_at.clone(),
            })?
            .with_timezone(&Utc);
        Ok(ServiceTagRecord {
            id: self.id,
            service_name: ServiceName(self.service_name),
            tag: self.tag,
            uat: self.uat,
            prod_beta: self.prod_beta,
            prod_alpha: self.prod_alpha,
            updated_at,
        })
    }
}

fn revision_from_row(row: &Row<'_>) -> rusqlite::Result<ServiceRevisionRecord> {
    Ok(ServiceRevisionRecord {
        id: row.get(0)?,
        service_name: ServiceName(row.get(1)?),
        rev_id: ChangeId(row.get(2)?),
        commit_id: CommitId(row.get(3)?),
        deployed: row.get(4)?,
    })
}

impl RevisionStore for SqliteStore {
    fn list_revisions(&self) -> Result<Vec<ServiceRevisionRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {REVISION_COLUMNS} FROM service_revision ORDER BY id"))?;
        let rows = stmt.query_map([], revision_from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn find_revision(
        &self,
        service: &ServiceName,
    ) -> Result<Option<ServiceRevisionRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {REVISION_COLUMNS} FROM service_revision WHERE service_name = ?1"),
                params![service.as_str()],
                revision_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn insert_revision(&mut self, record: &NewServiceRevision) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO service_revision (service_name, rev_id, commit_id, deployed)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.service_name.as_str(),
                record.rev_id.as_str(),
                record.commit_id.as_str(),
                record.deployed,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_revision(&mut self, record: &ServiceRevisionRecord) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE service_revision SET rev_id = ?1, commit_id = ?2, deployed = ?3 WHERE id = ?4",
            params![
                record.rev_id.as_str(),
                record.commit_id.as_str(),
                record.deployed,
                record.id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::RowNotFound {
                table: "service_revision",
                id: record.id,
            });
        }
        Ok(())
    }
}

impl TagStore for SqliteStore {
    fn find_tag(&self, service: &ServiceName) -> Result<Option<ServiceTagRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM service_tag WHERE service_name = ?1"),
                params![service.as_str()],
                TagRow::from_row,
            )
            .optional()?;
        row.map(TagRow::into_record).transpose()
    }

    fn insert_tag(&mut self, record: &NewServiceTag) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO service_tag (service_name, tag, uat, prod_beta, prod_alpha, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.service_name.as_str(),
                record.tag,
                record.uat,
                record.prod_beta,
                record.prod_alpha,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_tag(&mut self, record: &ServiceTagRecord) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE service_tag
             SET tag = ?1, uat = ?2, prod_beta = ?3, prod_alpha = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                record.tag,
                record.uat,
                record.prod_beta,
                record.prod_alpha,
                record.updated_at.to_rfc3339(),
                record.id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::RowNotFound {
                table: "service_tag",
                id: record.id,
            });
        }
        Ok(())
    }

    fn awaiting_promotion(&self, env: Environment) -> Result<Vec<ServiceTagRecord>, StoreError> {
        let flag = match env {
            Environment::Alpha => "prod_alpha",
            Environment::Beta => "prod_beta",
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TAG_COLUMNS} FROM service_tag WHERE uat = 1 AND {flag} = 0 ORDER BY id"
        ))?;
        let rows = stmt.query_map([], TagRow::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }
}
