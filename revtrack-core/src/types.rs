//! Domain types for revision tracking.
//!
//! Service, change and commit identifiers are strongly-typed newtypes; the
//! persisted records mirror the `service_revision` and `service_tag` tables.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Path markers
// ---------------------------------------------------------------------------

/// Path suffix markers that identify a service's files, in match priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathMarker {
    /// `…/src`: the service's source tree.
    Src,
    /// `…/pom.xml`: the build descriptor; its deletion removes the module.
    BuildDescriptor,
    /// `…/Dockerfile`: the container descriptor.
    ContainerDescriptor,
}

impl PathMarker {
    /// All markers in the order a path is tested against them.
    pub fn all() -> [PathMarker; 3] {
        [
            PathMarker::Src,
            PathMarker::BuildDescriptor,
            PathMarker::ContainerDescriptor,
        ]
    }

    pub fn suffix(self) -> &'static str {
        match self {
            PathMarker::Src => "/src",
            PathMarker::BuildDescriptor => "/pom.xml",
            PathMarker::ContainerDescriptor => "/Dockerfile",
        }
    }

    /// Classify `path` by the first marker (in priority order) it contains.
    ///
    /// Returns the marker and the text preceding it, which names the service.
    pub fn classify(path: &str) -> Option<(PathMarker, &str)> {
        PathMarker::all()
            .into_iter()
            .find_map(|marker| path.find(marker.suffix()).map(|idx| (marker, &path[..idx])))
    }
}

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A service (module) name: the path prefix shared by its source tree and descriptors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceName(pub String);

impl ServiceName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<service>/pom.xml`, the token exchanged between the rebuild list and
    /// the post-deploy write-back.
    pub fn descriptor_path(&self) -> String {
        format!("{}{}", self.0, PathMarker::BuildDescriptor.suffix())
    }

    /// Derive the service name from a build-descriptor path.
    ///
    /// Returns `None` when the path does not contain `/pom.xml`.
    pub fn from_descriptor_path(path: &str) -> Option<Self> {
        path.find(PathMarker::BuildDescriptor.suffix())
            .map(|idx| Self(path[..idx].to_owned()))
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ServiceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ServiceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque per-commit change identifier taken from a `Change-Id:` header label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangeId(pub String);

impl ChangeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ChangeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChangeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Short fixed-length commit prefix. Empty means "unknown".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CommitId(pub String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CommitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CommitId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Production environments a UAT-verified tag can be promoted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Alpha,
    Beta,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Alpha => write!(f, "alpha"),
            Environment::Beta => write!(f, "beta"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alpha" => Ok(Environment::Alpha),
            "beta" => Ok(Environment::Beta),
            other => Err(format!(
                "unknown environment '{other}'; expected: alpha, beta"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// A row of the `service_revision` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRevisionRecord {
    pub id: i64,
    pub service_name: ServiceName,
    pub rev_id: ChangeId,
    pub commit_id: CommitId,
    /// `false` = pending rebuild/redeploy.
    pub deployed: bool,
}

/// Insert payload for `service_revision`; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceRevision {
    pub service_name: ServiceName,
    pub rev_id: ChangeId,
    pub commit_id: CommitId,
    pub deployed: bool,
}

impl NewServiceRevision {
    pub fn with_id(self, id: i64) -> ServiceRevisionRecord {
        ServiceRevisionRecord {
            id,
            service_name: self.service_name,
            rev_id: self.rev_id,
            commit_id: self.commit_id,
            deployed: self.deployed,
        }
    }
}

/// A row of the `service_tag` table: the live image tag of a service and
/// where it has been promoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceTagRecord {
    pub id: i64,
    pub service_name: ServiceName,
    pub tag: String,
    pub uat: bool,
    pub prod_beta: bool,
    pub prod_alpha: bool,
    pub updated_at: DateTime<Utc>,
}

impl ServiceTagRecord {
    pub fn is_promoted_to(&self, env: Environment) -> bool {
        match env {
            Environment::Alpha => self.prod_alpha,
            Environment::Beta => self.prod_beta,
        }
    }

    /// Raise the flag for `env`. Never touches `tag` or `uat`.
    pub fn promote(&mut self, env: Environment) {
        match env {
            Environment::Alpha => self.prod_alpha = true,
            Environment::Beta => self.prod_beta = true,
        }
    }
}

/// Insert payload for `service_tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceTag {
    pub service_name: ServiceName,
    pub tag: String,
    pub uat: bool,
    pub prod_beta: bool,
    pub prod_alpha: bool,
    pub updated_at: DateTime<Utc>,
}

impl NewServiceTag {
    /// A freshly deployed tag: UAT reached, no production promotion yet.
    pub fn uat(service_name: ServiceName, tag: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            service_name,
            tag: tag.into(),
            uat: true,
            prod_beta: false,
            prod_alpha: false,
            updated_at: now,
        }
    }

    pub fn with_id(self, id: i64) -> ServiceTagRecord {
        ServiceTagRecord {
            id,
            service_name: self.service_name,
            tag: self.tag,
            uat: self.uat,
            prod_beta: self.prod_beta,
            prod_alpha: self.prod_alpha,
            updated_at: self.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
