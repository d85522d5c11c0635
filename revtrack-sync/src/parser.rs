//! Change-log stream parser.
//!
//! ## Input shape
//!
//! ```text
//! @@@<commit sha…>                 header: opens an entry, commit prefix at offset 3
//! …Change-Id: <41-char token>…     header: change id for the entry
//! ###                              footer: switch to body lines
//! M\tplatform/billing/src/Main.java
//! D\tplatform/legacy/pom.xml
//! ```
//!
//! Body paths name a service by the text preceding the first of `/src`,
//! `/pom.xml`, `/Dockerfile`. The log is newest-first, so each service's
//! sequence ends up latest-first as well.
//!
//! Fixed-width fields are extracted with length checks; a line too short for
//! its field is skipped rather than indexed out of bounds.

use std::collections::{btree_map, BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use revtrack_core::config::DEFAULT_COMMIT_ID_LENGTH;
use revtrack_core::{ChangeId, CommitId, PathMarker, ServiceName};

use crate::error::{io_err, SyncError};

pub const HEADER_MARKER: &str = "@@@";
pub const FOOTER_MARKER: &str = "###";
pub const CHANGE_ID_LABEL: &str = "Change-Id: ";
pub const CHANGE_ID_LEN: usize = 41;

// ---------------------------------------------------------------------------
// Parsed state
// ---------------------------------------------------------------------------

/// Per-service change ids, latest first. No two consecutive ids are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionIndex {
    services: BTreeMap<ServiceName, Vec<ChangeId>>,
}

impl RevisionIndex {
    /// Append `change` to `service` unless it repeats the last entry.
    /// Returns whether the sequence grew.
    pub fn push(&mut self, service: ServiceName, change: ChangeId) -> bool {
        let revisions = self.services.entry(service).or_default();
        if revisions.last() == Some(&change) {
            return false;
        }
        revisions.push(change);
        true
    }

    pub fn revisions(&self, service: &ServiceName) -> Option<&[ChangeId]> {
        self.services.get(service).map(Vec::as_slice)
    }

    /// Head of the sequence, i.e. the most recent change seen for `service`.
    pub fn latest(&self, service: &ServiceName) -> Option<&ChangeId> {
        self.services.get(service).and_then(|revs| revs.first())
    }

    pub fn contains(&self, service: &ServiceName) -> bool {
        self.services.contains_key(service)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, ServiceName, Vec<ChangeId>> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Display for RevisionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (service, revisions) in &self.services {
            writeln!(f, "--- {service} ---")?;
            for rev in revisions {
                writeln!(f, "{rev}")?;
            }
        }
        Ok(())
    }
}

/// Change id → short commit id, taken from header lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeToCommitMap(HashMap<ChangeId, CommitId>);

impl ChangeToCommitMap {
    pub fn insert(&mut self, change: ChangeId, commit: CommitId) {
        self.0.insert(change, commit);
    }

    pub fn get(&self, change: &ChangeId) -> Option<&CommitId> {
        self.0.get(change)
    }

    /// The commit for `change`, or an empty commit id when unknown.
    pub fn commit_for(&self, change: &ChangeId) -> CommitId {
        self.0.get(change).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Services whose build descriptor was deleted during this parse. Sticky.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSet(BTreeSet<ServiceName>);

impl DeletionSet {
    pub fn insert(&mut self, service: ServiceName) -> bool {
        self.0.insert(service)
    }

    pub fn contains(&self, service: &ServiceName) -> bool {
        self.0.contains(service)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceName> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything one parse produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLog {
    pub index: RevisionIndex,
    pub commits: ChangeToCommitMap,
    pub deleted: DeletionSet,
}

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

/// Whether the first tab-delimited field of a body line marks a deletion.
/// Both the short (`D`) and long (`Delete`) forms are accepted.
pub fn is_delete(field: &str) -> bool {
    matches!(field, "D" | "Delete")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Header,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Length of the commit prefix read from `@@@` lines.
    pub commit_id_len: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            commit_id_len: DEFAULT_COMMIT_ID_LENGTH,
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Line-at-a-time parser. Feed every line, then call [`LogParser::finish`].
#[derive(Debug)]
pub struct LogParser {
    options: ParserOptions,
    mode: Mode,
    current_commit: CommitId,
    current_change: Option<ChangeId>,
    parsed: ParsedLog,
}

impl LogParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            mode: Mode::Body,
            current_commit: CommitId::default(),
            current_change: None,
            parsed: ParsedLog::default(),
        }
    }

    /// Consume one line (without its trailing newline).
    pub fn feed_line(&mut self, line: &str) {
        if let Some(rest) = line.strip_prefix(HEADER_MARKER) {
            // The previous change id stays current: an entry without its own
            // label attributes its body lines to the last one seen.
            self.mode = Mode::Header;
            self.current_commit = rest
                .get(..self.options.commit_id_len)
                .map(CommitId::from)
                .unwrap_or_default();
            if self.current_commit.is_empty() {
                tracing::debug!("header line too short for commit id: {line:?}");
            }
        }

        if line.starts_with(FOOTER_MARKER) {
            self.mode = Mode::Body;
            return;
        }

        match self.mode {
            Mode::Header => self.header_line(line),
            Mode::Body => self.body_line(line),
        }
    }

    pub fn finish(self) -> ParsedLog {
        self.parsed
    }

    fn header_line(&mut self, line: &str) {
        let Some(idx) = line.find(CHANGE_ID_LABEL) else {
            return;
        };
        let start = idx + CHANGE_ID_LABEL.len();
        let Some(token) = line.get(start..start + CHANGE_ID_LEN) else {
            tracing::debug!("truncated change id skipped: {line:?}");
            return;
        };
        let change = ChangeId::from(token);
        self.parsed
            .commits
            .insert(change.clone(), self.current_commit.clone());
        self.current_change = Some(change);
    }

    fn body_line(&mut self, line: &str) {
        let deleted = is_delete(line.split('\t').next().unwrap_or_default());
        let path = line.rsplit('\t').next().unwrap_or_default();

        let Some((marker, prefix)) = PathMarker::classify(path) else {
            return;
        };
        if prefix.is_empty() {
            return;
        }
        let service = ServiceName::from(prefix);

        if deleted && marker == PathMarker::BuildDescriptor {
            tracing::debug!("module removed: {service}");
            self.parsed.deleted.insert(service);
            return;
        }
        if self.parsed.deleted.contains(&service) {
            return;
        }
        let Some(change) = self.current_change.clone() else {
            return;
        };
        self.parsed.index.push(service, change);
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse every line of `reader`. Invalid UTF-8 is replaced, not rejected.
pub fn parse_reader<R: BufRead>(mut reader: R, options: ParserOptions) -> std::io::Result<ParsedLog> {
    let mut parser = LogParser::new(options);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        parser.feed_line(line.trim_end_matches(['\n', '\r']));
    }
    Ok(parser.finish())
}

/// Parse a change-log file. Open/read failures carry the path.
pub fn parse_file(path: &Path, options: ParserOptions) -> Result<ParsedLog, SyncError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let parsed = parse_reader(BufReader::new(file), options).map_err(|e| io_err(path, e))?;
    tracing::info!(
        "parsed {}: {} service(s), {} change id(s), {} deleted module(s)",
        path.display(),
        parsed.index.len(),
        parsed.commits.len(),
        parsed.deleted.len()
    );
    tracing::debug!("revision index:\n{}", parsed.index);
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const CID_A: &str = "I0123456789abcdef0123456789abcdef01234567";
    const CID_B: &str = "I89abcdef0123456789abcdef0123456789abcdef";

    fn parse(text: &str) -> ParsedLog {
        parse_reader(text.as_bytes(), ParserOptions::default()).expect("parse")
    }

    fn entry(commit: &str, change: &str, body: &[&str]) -> String {
        let mut out = format!("@@@{commit}\n    Change-Id: {change}\n###\n");
        for line in body {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    #[rstest]
    #[case("D", true)]
    #[case("Delete", true)]
    #[case("A", false)]
    #[case("M", false)]
    #[case("R100", false)]
    #[case("d", false)]
    #[case("", false)]
    fn delete_field(#[case] field: &str, #[case] expected: bool) {
        assert_eq!(is_delete(field), expected);
    }

    #[test]
    fn change_ids_are_41_chars() {
        assert_eq!(CID_A.len(), CHANGE_ID_LEN);
        assert_eq!(CID_B.len(), CHANGE_ID_LEN);
    }

    #[test]
    fn single_entry_indexes_service_and_commit() {
        let parsed = parse(&entry(
            "abcdef1234567890",
            CID_A,
            &["M\tpath/to/svcA/src/Foo.java"],
        ));
        let svc = ServiceName::from("path/to/svcA");
        assert_eq!(
            parsed.index.revisions(&svc),
            Some(&[ChangeId::from(CID_A)][..])
        );
        assert_eq!(
            parsed.commits.get(&ChangeId::from(CID_A)),
            Some(&CommitId::from("abcdef1"))
        );
    }

    #[test]
    fn consecutive_duplicates_are_suppressed() {
        let parsed = parse(&entry(
            "abcdef1",
            CID_A,
            &["M\tsvc/src/A.java", "M\tsvc/src/B.java", "M\tsvc/Dockerfile"],
        ));
        assert_eq!(parsed.index.revisions(&ServiceName::from("svc")).map(<[_]>::len), Some(1));
    }

    #[test]
    fn non_consecutive_repeats_are_kept() {
        let mut index = RevisionIndex::default();
        let svc = ServiceName::from("svc");
        assert!(index.push(svc.clone(), ChangeId::from("a")));
        assert!(!index.push(svc.clone(), ChangeId::from("a")));
        assert!(index.push(svc.clone(), ChangeId::from("b")));
        assert!(index.push(svc.clone(), ChangeId::from("a")));
        assert_eq!(index.revisions(&svc).map(<[_]>::len), Some(3));
    }

    #[test]
    fn latest_is_first_entry_in_log_order() {
        let mut log = entry("1111111", CID_B, &["M\tsvc/src/A.java"]);
        log.push_str(&entry("2222222", CID_A, &["M\tsvc/src/A.java"]));
        let parsed = parse(&log);
        assert_eq!(
            parsed.index.latest(&ServiceName::from("svc")),
            Some(&ChangeId::from(CID_B))
        );
    }

    #[test]
    fn build_descriptor_deletion_is_sticky() {
        let mut log = entry("1111111", CID_B, &["D\tsvc/pom.xml", "M\tsvc/src/A.java"]);
        log.push_str(&entry("2222222", CID_A, &["M\tsvc/Dockerfile", "M\tother/src/B.java"]));
        let parsed = parse(&log);
        let svc = ServiceName::from("svc");
        assert!(!parsed.index.contains(&svc));
        assert!(parsed.deleted.contains(&svc));
        assert!(parsed.index.contains(&ServiceName::from("other")));
    }

    #[test]
    fn long_form_delete_is_recognized() {
        let parsed = parse(&entry("1111111", CID_A, &["Delete\tsvc/pom.xml", "M\tsvc/src/A.java"]));
        assert!(parsed.deleted.contains(&ServiceName::from("svc")));
        assert!(parsed.index.is_empty());
    }

    #[test]
    fn deleting_a_source_file_still_counts_as_a_change() {
        let parsed = parse(&entry("1111111", CID_A, &["D\tsvc/src/Old.java"]));
        assert!(parsed.deleted.is_empty());
        assert_eq!(
            parsed.index.latest(&ServiceName::from("svc")),
            Some(&ChangeId::from(CID_A))
        );
    }

    #[test]
    fn src_marker_wins_over_dockerfile() {
        let parsed = parse(&entry("1111111", CID_A, &["M\tsvc/src/main/docker/Dockerfile"]));
        assert!(parsed.index.contains(&ServiceName::from("svc")));
        assert!(!parsed.index.contains(&ServiceName::from("svc/src/main/docker")));
    }

    #[test]
    fn unmatched_and_malformed_lines_are_ignored() {
        let parsed = parse(&entry(
            "1111111",
            CID_A,
            &["M\tREADME.md", "garbage without tabs", "", "M\t/src/rootless.java"],
        ));
        assert!(parsed.index.is_empty());
    }

    #[test]
    fn body_lines_without_change_id_contribute_nothing() {
        let parsed = parse("M\tsvc/src/A.java\n@@@1111111\n###\nM\tsvc/src/B.java\n");
        assert!(parsed.index.is_empty());
        assert!(parsed.commits.is_empty());
    }

    #[test]
    fn entry_without_label_keeps_previous_change_id() {
        let mut log = entry("1111111", CID_A, &["M\tsvcA/src/A.java"]);
        log.push_str("@@@2222222\nMerge branch 'release'\n###\nM\tsvcB/src/B.java\n");
        let parsed = parse(&log);

        assert_eq!(
            parsed.index.revisions(&ServiceName::from("svcB")),
            Some(&[ChangeId::from(CID_A)][..])
        );
        // The commit of the labelled entry is the one recorded for the id.
        assert_eq!(
            parsed.commits.commit_for(&ChangeId::from(CID_A)),
            CommitId::from("1111111")
        );
    }

    #[test]
    fn short_header_leaves_commit_unknown() {
        let parsed = parse(&entry("abc", CID_A, &["M\tsvc/src/A.java"]));
        assert_eq!(
            parsed.commits.get(&ChangeId::from(CID_A)),
            Some(&CommitId::default())
        );
        assert!(parsed.index.contains(&ServiceName::from("svc")));
    }

    #[test]
    fn truncated_change_id_is_skipped() {
        let parsed = parse("@@@1111111\nChange-Id: Ishort\n###\nM\tsvc/src/A.java\n");
        assert!(parsed.commits.is_empty());
        assert!(parsed.index.is_empty());
    }

    #[test]
    fn custom_commit_id_length() {
        let text = entry("0123456789abcdef", CID_A, &["M\tsvc/src/A.java"]);
        let parsed = parse_reader(text.as_bytes(), ParserOptions { commit_id_len: 10 }).expect("parse");
        assert_eq!(
            parsed.commits.commit_for(&ChangeId::from(CID_A)),
            CommitId::from("0123456789")
        );
    }

    #[test]
    fn stream_ending_mid_header_is_not_an_error() {
        let parsed = parse(&format!("@@@1111111\nChange-Id: {CID_A}\n"));
        assert_eq!(parsed.commits.len(), 1);
        assert!(parsed.index.is_empty());
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let text = entry("1111111", CID_A, &["M\tsvc/src/A.java"]).replace('\n', "\r\n");
        let parsed = parse(&text);
        assert_eq!(
            parsed.index.latest(&ServiceName::from("svc")),
            Some(&ChangeId::from(CID_A))
        );
    }

    #[test]
    fn display_dumps_each_service() {
        let parsed = parse(&entry("1111111", CID_A, &["M\tsvc/src/A.java"]));
        let dump = parsed.index.to_string();
        assert!(dump.contains("--- svc ---"));
        assert!(dump.contains(CID_A));
    }

    #[test]
    fn missing_file_is_io_error_with_path() {
        let err = parse_file(Path::new("/nonexistent/revtrack.log"), ParserOptions::default())
            .unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
        assert!(err.to_string().contains("revtrack.log"));
    }
}
