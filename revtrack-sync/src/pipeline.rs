//! Shared parse-then-apply entrypoint used by the CLI.

use std::path::Path;

use revtrack_core::RevisionStore;

use crate::parser::{parse_file, ParserOptions};
use crate::reconcile::{reconcile, seed, ReconcileReport, SeedReport};
use crate::SyncError;

/// What to do with a parsed change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Diff against the store and emit the rebuild list.
    Reconcile,
    /// Record every parsed service as already deployed.
    Seed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Reconciled(ReconcileReport),
    Seeded(SeedReport),
}

/// Parse `log_path` and apply `mode` against `store`.
///
/// A log that cannot be read aborts before the store is touched.
pub fn run<S: RevisionStore + ?Sized>(
    log_path: &Path,
    options: ParserOptions,
    mode: RunMode,
    store: &mut S,
) -> Result<RunOutcome, SyncError> {
    let parsed = parse_file(log_path, options)?;
    match mode {
        RunMode::Reconcile => Ok(RunOutcome::Reconciled(reconcile(&parsed, store)?)),
        RunMode::Seed => Ok(RunOutcome::Seeded(seed(&parsed, store))),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use revtrack_core::MemoryStore;
    use tempfile::TempDir;

    use super::*;

    const LOG: &str = "@@@abcdef1234\nChange-Id: I0123456789abcdef0123456789abcdef01234567\n###\nM\tsvc/src/Main.java\n";

    #[test]
    fn missing_log_leaves_store_untouched() {
        let tmp = TempDir::new().expect("tmp");
        let mut store = MemoryStore::new();
        let err = run(
            &tmp.path().join("missing.log"),
            ParserOptions::default(),
            RunMode::Reconcile,
            &mut store,
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
        assert!(store.list_revisions().expect("list").is_empty());
    }

    #[test]
    fn reconcile_then_seed() {
        let tmp = TempDir::new().expect("tmp");
        let log = tmp.path().join("rev.log");
        fs::write(&log, LOG).expect("write");
        let mut store = MemoryStore::new();

        let outcome = run(&log, ParserOptions::default(), RunMode::Reconcile, &mut store).expect("run");
        let RunOutcome::Reconciled(report) = outcome else {
            panic!("expected reconcile outcome");
        };
        assert_eq!(report.rebuild_list(), "svc/pom.xml");

        let outcome = run(&log, ParserOptions::default(), RunMode::Seed, &mut store).expect("run");
        let RunOutcome::Seeded(report) = outcome else {
            panic!("expected seed outcome");
        };
        assert_eq!(report.seeded.len(), 1);
    }
}
