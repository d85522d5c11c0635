//! # revtrack-sync
//!
//! Change-log parsing and reconciliation against the persisted revision and
//! tag records.
//!
//! Call [`pipeline::run`] to parse a log file and either reconcile it
//! ([`reconcile::reconcile`]) or seed the store ([`reconcile::seed`]). The
//! [`deploy`] module holds the post-deploy and promotion write paths.

pub mod deploy;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod reconcile;

pub use error::{StoreOperation, StoreWarning, SyncError};
pub use parser::{parse_file, parse_reader, ParsedLog, ParserOptions, RevisionIndex};
pub use reconcile::{reconcile, seed, RebuildEntry, RebuildReason, ReconcileReport, SeedReport};
