//! Per-resource access control lists.
//!
//! An [`AccessList`] maps `(role, id)` principals to the set of
//! [`AccessLevel`]s they hold on one resource. Backends persist it only as the
//! opaque string returned by [`AccessList::serialized`], inside whatever
//! metadata slot the backend has (sidecar file, object metadata, record field).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::request::{AccessLevel, AccessRequest, AccessTicket};
use crate::identity::Role;

/// One persisted ACL row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub role: Role,
    pub id: String,
    pub levels: BTreeSet<AccessLevel>,
}

/// The "plain object" shapes accepted by [`AccessList::from`].
#[derive(Deserialize)]
#[serde(untagged)]
enum PlainAcl {
    Entries(Vec<AclEntry>),
    Wrapped { entries: Vec<AclEntry> },
}

impl From<PlainAcl> for Vec<AclEntry> {
    fn from(plain: PlainAcl) -> Self {
        match plain {
            PlainAcl::Entries(entries) | PlainAcl::Wrapped { entries } => entries,
        }
    }
}

/// Access control list attached to exactly one resource.
///
/// There is at most one entry per `(role, id)`; adding access to an existing
/// principal unions the levels, and nothing ever removes a level.
///
/// # Example
///
/// ```rust
/// use warden_core::{AccessLevel, AccessList, Candidate, Role};
///
/// let acl = AccessList::new()
///     .with_access(Role::Agent, "agent-123", [AccessLevel::Owner])
///     .with_access(Role::Team, "9", [AccessLevel::Read]);
///
/// // Round-trips through the persisted form
/// let restored = AccessList::from(acl.serialized());
/// assert_eq!(restored, acl);
///
/// let request = Candidate::agent("agent-777").read("teams/9/report.txt");
/// assert!(acl.evaluate(&request, Some("9")).is_granted());
/// assert!(acl.evaluate(&request, Some("5")).is_denied());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AclEntry>", into = "Vec<AclEntry>")]
pub struct AccessList {
    entries: BTreeMap<(Role, String), BTreeSet<AccessLevel>>,
}

impl AccessList {
    /// An empty ACL. Nobody has access.
    pub fn new() -> Self {
        Self::default()
    }

    /// The ACL given to a resource on its first write.
    ///
    /// The creator receives Owner. If the request declares an owning team,
    /// that team receives Read so every member can see what was created.
    pub fn for_creator(request: &AccessRequest) -> Self {
        let candidate = request.candidate();
        let mut acl = Self::new();
        acl.add_access(candidate.role(), candidate.id(), [AccessLevel::Owner]);
        if let Some(team) = request.team() {
            acl.add_access(Role::Team, team, [AccessLevel::Read]);
        }
        acl
    }

    /// Grant `levels` to `(role, id)`, merging with any levels already held.
    pub fn add_access(
        &mut self,
        role: Role,
        id: impl Into<String>,
        levels: impl IntoIterator<Item = AccessLevel>,
    ) -> &mut Self {
        self.entries
            .entry((role, id.into()))
            .or_default()
            .extend(levels);
        self
    }

    /// Builder form of [`add_access`](Self::add_access).
    pub fn with_access(
        mut self,
        role: Role,
        id: impl Into<String>,
        levels: impl IntoIterator<Item = AccessLevel>,
    ) -> Self {
        self.add_access(role, id, levels);
        self
    }

    /// Levels held by `(role, id)`, if it has an entry.
    pub fn levels(&self, role: Role, id: &str) -> Option<&BTreeSet<AccessLevel>> {
        self.entries.get(&(role, id.to_string()))
    }

    /// All entries in canonical order.
    pub fn entries(&self) -> Vec<AclEntry> {
        self.entries
            .iter()
            .map(|((role, id), levels)| AclEntry {
                role: *role,
                id: id.clone(),
                levels: levels.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry targets a team; evaluation only needs the caller's
    /// team when this is true.
    pub fn has_team_entries(&self) -> bool {
        self.entries.keys().any(|(role, _)| *role == Role::Team)
    }

    /// Canonical string form, the only representation backends persist.
    pub fn serialized(&self) -> String {
        serde_json::to_string(&self.entries()).unwrap_or_default()
    }

    /// Parse persisted metadata.
    ///
    /// Returns `None` when the metadata is absent, blank or unparsable, which
    /// callers treat as "the resource does not exist".
    pub fn from_metadata(metadata: Option<&str>) -> Option<Self> {
        let raw = metadata?.trim();
        if raw.is_empty() {
            return None;
        }
        match serde_json::from_str::<PlainAcl>(raw) {
            Ok(plain) => Some(Vec::<AclEntry>::from(plain).into()),
            Err(e) => {
                log::warn!("ignoring unparsable ACL metadata: {}", e);
                None
            }
        }
    }

    /// Evaluate a request.
    ///
    /// The candidate's own `(role, id)` entry is checked first, then the
    /// Team entry for `resolved_team` (the team the candidate belongs to).
    /// Granted if either entry holds a level implying the requested one.
    pub fn evaluate(&self, request: &AccessRequest, resolved_team: Option<&str>) -> AccessTicket {
        let candidate = request.candidate();
        let level = request.level();

        if self.permits(candidate.role(), candidate.id(), level) {
            return AccessTicket::Granted {
                role: candidate.role(),
                id: candidate.id().to_string(),
            };
        }

        if let Some(team) = resolved_team {
            if self.permits(Role::Team, team, level) {
                return AccessTicket::Granted {
                    role: Role::Team,
                    id: team.to_string(),
                };
            }
        }

        AccessTicket::Denied
    }

    fn permits(&self, role: Role, id: &str, level: AccessLevel) -> bool {
        self.levels(role, id)
            .is_some_and(|held| held.iter().any(|l| l.implies(level)))
    }
}

impl From<Vec<AclEntry>> for AccessList {
    fn from(entries: Vec<AclEntry>) -> Self {
        let mut acl = Self::new();
        for entry in entries {
            acl.add_access(entry.role, entry.id, entry.levels);
        }
        acl
    }
}

impl From<AccessList> for Vec<AclEntry> {
    fn from(acl: AccessList) -> Self {
        acl.entries()
    }
}

/// Lenient parse: malformed input yields an empty ACL.
impl From<&str> for AccessList {
    fn from(serialized: &str) -> Self {
        Self::from_metadata(Some(serialized)).unwrap_or_default()
    }
}

impl From<String> for AccessList {
    fn from(serialized: String) -> Self {
        Self::from(serialized.as_str())
    }
}

impl From<&String> for AccessList {
    fn from(serialized: &String) -> Self {
        Self::from(serialized.as_str())
    }
}

/// Accepts the entry array or `{"entries": [...]}`; anything else is empty.
impl From<serde_json::Value> for AccessList {
    fn from(value: serde_json::Value) -> Self {
        match serde_json::from_value::<PlainAcl>(value) {
            Ok(plain) => Vec::<AclEntry>::from(plain).into(),
            Err(e) => {
                log::warn!("ignoring malformed ACL object: {}", e);
                Self::new()
            }
        }
    }
}

impl From<&AccessList> for AccessList {
    fn from(acl: &AccessList) -> Self {
        acl.clone()
    }
}
