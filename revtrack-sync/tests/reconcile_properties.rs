//! End-to-end reconciliation properties: parse a log, reconcile it against a
//! store, and check the rebuild set and the persisted records.

use std::collections::{BTreeSet, HashSet};

use revtrack_core::{
    ChangeId, CommitId, MemoryStore, NewServiceRevision, RevisionStore, ServiceName,
    ServiceRevisionRecord, SqliteStore, StoreError,
};
use revtrack_sync::{
    parse_reader, reconcile, seed, ParsedLog, ParserOptions, RebuildReason, StoreOperation,
};

const CID_1: &str = "I1111111111111111111111111111111111111111";
const CID_2: &str = "I2222222222222222222222222222222222222222";
const CID_3: &str = "I3333333333333333333333333333333333333333";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn entry(commit: &str, change: &str, body: &[&str]) -> String {
    let mut out = format!("@@@{commit}\nAuthor: ci\n\n    Subject line\n\n    Change-Id: {change}\n###\n");
    for line in body {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn parse(text: &str) -> ParsedLog {
    parse_reader(text.as_bytes(), ParserOptions::default()).expect("parse")
}

fn rebuild_set(report: &revtrack_sync::ReconcileReport) -> BTreeSet<String> {
    report.services().map(|s| s.0.clone()).collect()
}

/// Fails every insert/update for the named services; delegates everything else.
struct FlakyStore {
    inner: MemoryStore,
    failing: HashSet<ServiceName>,
    fail_listing: bool,
}

impl FlakyStore {
    fn new(failing: &[&str]) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: failing.iter().map(|s| ServiceName::from(*s)).collect(),
            fail_listing: false,
        }
    }

    fn injected(&self) -> StoreError {
        StoreError::Corrupt {
            column: "injected",
            value: "failure".to_string(),
        }
    }
}

impl RevisionStore for FlakyStore {
    fn list_revisions(&self) -> Result<Vec<ServiceRevisionRecord>, StoreError> {
        if self.fail_listing {
            return Err(self.injected());
        }
        self.inner.list_revisions()
    }

    fn find_revision(
        &self,
        service: &ServiceName,
    ) -> Result<Option<ServiceRevisionRecord>, StoreError> {
        self.inner.find_revision(service)
    }

    fn insert_revision(&mut self, record: &NewServiceRevision) -> Result<i64, StoreError> {
        if self.failing.contains(&record.service_name) {
            return Err(self.injected());
        }
        self.inner.insert_revision(record)
    }

    fn update_revision(&mut self, record: &ServiceRevisionRecord) -> Result<(), StoreError> {
        if self.failing.contains(&record.service_name) {
            return Err(self.injected());
        }
        self.inner.update_revision(record)
    }
}

// ---------------------------------------------------------------------------
// 1. Rebuild set
// ---------------------------------------------------------------------------

#[test]
fn first_run_emits_every_touched_service() {
    init_logging();
    let mut log = entry("aaaaaaa111", CID_2, &["M\tplatform/billing/src/A.java", "M\tplatform/auth/Dockerfile"]);
    log.push_str(&entry("bbbbbbb222", CID_1, &["A\tplatform/gateway/pom.xml", "M\tdocs/README.md"]));

    let mut store = MemoryStore::new();
    let report = reconcile(&parse(&log), &mut store).expect("reconcile");

    assert_eq!(
        rebuild_set(&report),
        BTreeSet::from([
            "platform/auth".to_string(),
            "platform/billing".to_string(),
            "platform/gateway".to_string(),
        ])
    );
    assert!(report.rebuild.iter().all(|e| e.reason == RebuildReason::New));
    assert!(report.warnings.is_empty());

    let gateway = store
        .find_revision(&ServiceName::from("platform/gateway"))
        .expect("find")
        .expect("present");
    assert_eq!(gateway.commit_id, CommitId::from("bbbbbbb"));
}

#[test]
fn revision_change_on_deployed_service_updates_and_emits() {
    init_logging();
    let mut store = MemoryStore::new();
    store
        .insert_revision(&NewServiceRevision {
            service_name: ServiceName::from("svc"),
            rev_id: ChangeId::from(CID_1),
            commit_id: CommitId::from("1111111"),
            deployed: true,
        })
        .expect("insert");

    let report = reconcile(&parse(&entry("2222222", CID_2, &["M\tsvc/src/A.java"])), &mut store)
        .expect("reconcile");

    assert_eq!(report.rebuild_list(), "svc/pom.xml");
    let record = store
        .find_revision(&ServiceName::from("svc"))
        .expect("find")
        .expect("present");
    assert_eq!(record.rev_id, ChangeId::from(CID_2));
    assert_eq!(record.commit_id, CommitId::from("2222222"));
    assert!(!record.deployed);
}

#[test]
fn second_run_is_idempotent_except_for_pending_deploys() {
    init_logging();
    let mut log = entry("2222222", CID_2, &["M\tdeployed/src/A.java"]);
    log.push_str(&entry("1111111", CID_1, &["M\tpending/src/B.java"]));
    let parsed = parse(&log);
    let mut store = MemoryStore::new();

    seed(&parsed, &mut store);
    let mut pending = store
        .find_revision(&ServiceName::from("pending"))
        .expect("find")
        .expect("present");
    pending.deployed = false;
    store.update_revision(&pending).expect("update");

    let first = reconcile(&parsed, &mut store).expect("first");
    let second = reconcile(&parsed, &mut store).expect("second");

    assert_eq!(rebuild_set(&first), BTreeSet::from(["pending".to_string()]));
    assert_eq!(first.rebuild[0].reason, RebuildReason::PendingDeploy);
    assert_eq!(first, second);
}

#[test]
fn deleted_module_is_never_emitted() {
    init_logging();
    let mut log = entry("3333333", CID_3, &["D\tlegacy/pom.xml", "D\tlegacy/src/Old.java"]);
    log.push_str(&entry("2222222", CID_2, &["M\tlegacy/src/Old.java", "M\tlive/src/New.java"]));

    let mut store = MemoryStore::new();
    let report = reconcile(&parse(&log), &mut store).expect("reconcile");

    assert_eq!(rebuild_set(&report), BTreeSet::from(["live".to_string()]));
    assert!(store
        .find_revision(&ServiceName::from("legacy"))
        .expect("find")
        .is_none());
}

#[test]
fn deleted_module_keeps_its_history_record() {
    init_logging();
    let mut store = MemoryStore::new();
    reconcile(&parse(&entry("1111111", CID_1, &["M\tlegacy/src/A.java"])), &mut store)
        .expect("first");

    let report = reconcile(&parse(&entry("2222222", CID_2, &["D\tlegacy/pom.xml"])), &mut store)
        .expect("second");

    assert!(report.rebuild.is_empty());
    assert_eq!(store.list_revisions().expect("list").len(), 1);
}

// ---------------------------------------------------------------------------
// 2. Failure handling
// ---------------------------------------------------------------------------

#[test]
fn per_record_failures_become_warnings_and_processing_continues() {
    init_logging();
    let mut log = entry("1111111", CID_1, &["M\tbroken/src/A.java", "M\tfine/src/B.java"]);
    log.push_str(&entry("0000000", CID_2, &["M\talso-broken/src/C.java"]));

    let mut store = FlakyStore::new(&["broken", "also-broken"]);
    let report = reconcile(&parse(&log), &mut store).expect("reconcile");

    assert_eq!(report.rebuild.len(), 3, "emissions stand even when writes fail");
    assert_eq!(report.warnings.len(), 2);
    assert!(report
        .warnings
        .iter()
        .all(|w| w.operation == StoreOperation::Insert));
    assert!(store
        .inner
        .find_revision(&ServiceName::from("fine"))
        .expect("find")
        .is_some());
    assert!(store
        .inner
        .find_revision(&ServiceName::from("broken"))
        .expect("find")
        .is_none());
}

#[test]
fn failed_write_is_redetected_next_run() {
    init_logging();
    let parsed = parse(&entry("1111111", CID_1, &["M\tbroken/src/A.java"]));
    let mut store = FlakyStore::new(&["broken"]);

    let first = reconcile(&parsed, &mut store).expect("first");
    store.failing.clear();
    let second = reconcile(&parsed, &mut store).expect("second");

    assert_eq!(first.warnings.len(), 1);
    assert_eq!(second.rebuild[0].reason, RebuildReason::New);
    assert!(second.warnings.is_empty());
}

#[test]
fn unreadable_record_set_is_fatal() {
    init_logging();
    let mut store = FlakyStore::new(&[]);
    store.fail_listing = true;
    let err = reconcile(&parse(&entry("1111111", CID_1, &["M\tsvc/src/A.java"])), &mut store)
        .unwrap_err();
    assert!(matches!(err, revtrack_sync::SyncError::Store(_)), "got: {err}");
    assert!(store.inner.list_revisions().expect("list").is_empty());
}

#[test]
fn seed_failures_are_reported_per_service() {
    init_logging();
    let mut log = entry("1111111", CID_1, &["M\tbroken/src/A.java"]);
    log.push_str(&entry("2222222", CID_2, &["M\tfine/src/B.java"]));
    let mut store = FlakyStore::new(&["broken"]);

    let report = seed(&parse(&log), &mut store);

    assert_eq!(report.seeded, vec![ServiceName::from("fine")]);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].service, ServiceName::from("broken"));
}

// ---------------------------------------------------------------------------
// 3. SQLite backend
// ---------------------------------------------------------------------------

#[test]
fn reconcile_against_sqlite_file_persists_across_reopen() {
    init_logging();
    let tmp = tempfile::TempDir::new().expect("tmp");
    let db = tmp.path().join("revtrack.db");
    let parsed = parse(&entry("1111111", CID_1, &["M\tsvc/src/A.java"]));

    {
        let mut store = SqliteStore::open(&db).expect("open");
        let report = reconcile(&parsed, &mut store).expect("reconcile");
        assert_eq!(report.rebuild_list(), "svc/pom.xml");
    }

    let mut store = SqliteStore::open(&db).expect("reopen");
    let report = reconcile(&parsed, &mut store).expect("reconcile again");
    assert_eq!(report.rebuild[0].reason, RebuildReason::PendingDeploy);
}

#[test]
fn concurrent_runs_on_one_database_race_per_record() {
    init_logging();
    let tmp = tempfile::TempDir::new().expect("tmp");
    let db = tmp.path().join("revtrack.db");
    let mut first = SqliteStore::open(&db).expect("open first");
    let mut second = SqliteStore::open(&db).expect("open second");

    let older = parse(&entry("1111111", CID_1, &["M\tsvc/src/A.java"]));
    let newer = parse(&entry("2222222", CID_2, &["M\tsvc/src/A.java"]));

    let a = reconcile(&older, &mut first).expect("first run");
    let b = reconcile(&newer, &mut second).expect("second run");
    let a_again = reconcile(&older, &mut first).expect("first run again");

    assert_eq!(a.rebuild_list(), "svc/pom.xml");
    assert_eq!(b.rebuild_list(), "svc/pom.xml");
    assert!(a.warnings.is_empty() && b.warnings.is_empty() && a_again.warnings.is_empty());

    // No locking: whichever handle wrote last owns the record.
    let record = SqliteStore::open(&db)
        .expect("reopen")
        .find_revision(&ServiceName::from("svc"))
        .expect("find")
        .expect("present");
    assert_eq!(record.rev_id, ChangeId::from(CID_1));
    assert_eq!(record.commit_id, CommitId::from("1111111"));
    assert_eq!(
        a_again.rebuild[0].reason,
        RebuildReason::RevisionChanged {
            previous: ChangeId::from(CID_2)
        }
    );
}
