//! Caller identities.
//!
//! A [`Candidate`] is whoever is asking: an individual user, a team, or an
//! autonomous agent. Candidates are produced by an upstream authentication
//! step and are trusted as-is here; nothing in this module validates them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::access::{AccessLevel, AccessRequest};

/// The kind of principal a candidate or ACL entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Role {
    /// An individual human caller.
    User,
    /// A team; team grants are inherited by every member.
    Team,
    /// An autonomous agent acting on behalf of a team.
    Agent,
}

impl Role {
    /// Lowercase name used in serialized ACLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Team => "team",
            Role::Agent => "agent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "team" => Ok(Role::Team),
            "agent" => Ok(Role::Agent),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// An already-authenticated identity making a request.
///
/// # Example
///
/// ```rust
/// use warden_core::{AccessLevel, Candidate, Role};
///
/// let me = Candidate::agent("agent-123");
/// assert_eq!(me.role(), Role::Agent);
///
/// let request = me.write("teams/9/report.txt").with_team("9");
/// assert_eq!(request.level(), AccessLevel::Write);
/// assert_eq!(request.team(), Some("9"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    role: Role,
    id: String,
}

impl Candidate {
    /// Create a candidate with an explicit role.
    pub fn new(role: Role, id: impl Into<String>) -> Self {
        Self {
            role,
            id: id.into(),
        }
    }

    /// A user candidate.
    pub fn user(id: impl Into<String>) -> Self {
        Self::new(Role::User, id)
    }

    /// A team candidate.
    pub fn team(id: impl Into<String>) -> Self {
        Self::new(Role::Team, id)
    }

    /// An agent candidate.
    pub fn agent(id: impl Into<String>) -> Self {
        Self::new(Role::Agent, id)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// A request for `level` access to `resource`.
    pub fn request(&self, resource: impl Into<String>, level: AccessLevel) -> AccessRequest {
        AccessRequest::new(self.clone(), resource, level)
    }

    /// A Read request for `resource`.
    pub fn read(&self, resource: impl Into<String>) -> AccessRequest {
        self.request(resource, AccessLevel::Read)
    }

    /// A Write request for `resource`.
    pub fn write(&self, resource: impl Into<String>) -> AccessRequest {
        self.request(resource, AccessLevel::Write)
    }

    /// An Owner request for `resource`, needed to change its ACL.
    pub fn owner(&self, resource: impl Into<String>) -> AccessRequest {
        self.request(resource, AccessLevel::Owner)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::User, Role::Team, Role::Agent] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert_eq!("TEAM".parse::<Role>().unwrap(), Role::Team);
        assert!("robot".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
    }

    #[test]
    fn test_candidate_requests() {
        let c = Candidate::user("alice");
        let read = c.read("teams/1/a");
        assert_eq!(read.candidate(), &c);
        assert_eq!(read.resource(), "teams/1/a");
        assert_eq!(read.level(), AccessLevel::Read);
        assert!(read.team().is_none());

        assert_eq!(c.write("x").level(), AccessLevel::Write);
        assert_eq!(c.owner("x").level(), AccessLevel::Owner);
    }

    #[test]
    fn test_candidate_display() {
        assert_eq!(Candidate::team("9").to_string(), "team:9");
    }
}
