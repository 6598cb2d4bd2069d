//! Access levels, requests and the tickets they evaluate to.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::{Candidate, Role};

/// A level of access to a resource.
///
/// `Owner` is granted to whoever creates a resource and is a strict
/// superset: an Owner entry permits Read, Write and Owner requests.
/// `Read` and `Write` are independent of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    Write,
    Owner,
}

impl AccessLevel {
    /// Whether holding `self` satisfies a demand for `other`.
    pub fn implies(self, other: AccessLevel) -> bool {
        self == other || self == AccessLevel::Owner
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Owner => "owner",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single authorization query: may `candidate` access `resource` at `level`?
///
/// Requests are cheap, immutable values built per call, usually through
/// [`Candidate::read`] or [`Candidate::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    candidate: Candidate,
    resource: String,
    level: AccessLevel,
    team: Option<String>,
}

impl AccessRequest {
    pub fn new(candidate: Candidate, resource: impl Into<String>, level: AccessLevel) -> Self {
        Self {
            candidate,
            resource: resource.into(),
            level,
            team: None,
        }
    }

    /// Declare the team that will own the resource if this request creates it.
    ///
    /// Only consulted on create; existing resources keep their stored ACL.
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn level(&self) -> AccessLevel {
        self.level
    }

    /// The declared owning team, if any.
    pub fn team(&self) -> Option<&str> {
        self.team.as_deref()
    }

    /// The same candidate and team, addressing a different resource.
    pub fn retarget(&self, resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..self.clone()
        }
    }
}

/// The outcome of evaluating one [`AccessRequest`] against one ACL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessTicket {
    /// An entry permitted the request.
    Granted {
        /// Role of the entry that matched.
        role: Role,
        /// Id of the entry that matched.
        id: String,
    },
    /// No matching entry permits the requested level.
    Denied,
}

impl AccessTicket {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessTicket::Granted { .. })
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AccessTicket::Denied)
    }
}
