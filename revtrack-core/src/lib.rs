//! revtrack core library: domain types, persisted stores, configuration, errors.
//!
//! - [`types`]: newtypes and record structs
//! - [`error`]: [`StoreError`], [`ConfigError`]
//! - [`store`]: [`RevisionStore`] / [`TagStore`] traits with SQLite and in-memory backends
//! - [`config`]: `~/.revtrack/config.yaml` loading

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, StoreError};
pub use store::{MemoryStore, RevisionStore, SqliteStore, TagStore};
pub use types::{
    ChangeId, CommitId, Environment, NewServiceRevision, NewServiceTag, PathMarker, ServiceName,
    ServiceRevisionRecord, ServiceTagRecord,
};
