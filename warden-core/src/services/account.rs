//! Team membership lookups.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Connector, ServiceKind, ServiceType, Unconfigured};
use crate::error::Result;
use crate::identity::{Candidate, Role};

/// Resolves which team a candidate belongs to.
#[async_trait]
pub trait Account: Connector {
    /// The team `candidate` belongs to, if any.
    ///
    /// A Team candidate is its own team.
    async fn team_of(&self, candidate: &Candidate) -> Result<Option<String>>;
}

/// An account service where nobody belongs to a team.
///
/// ```
/// # tokio_test::block_on(async {
/// use warden_core::{Account, Candidate, NoTeams};
///
/// assert_eq!(NoTeams.team_of(&Candidate::agent("agent-123")).await.unwrap(), None);
/// assert_eq!(
///     NoTeams.team_of(&Candidate::team("9")).await.unwrap().as_deref(),
///     Some("9")
/// );
/// # });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTeams;

impl Connector for NoTeams {
    fn implementation(&self) -> &str {
        "no-teams"
    }
}

#[async_trait]
impl Account for NoTeams {
    async fn team_of(&self, candidate: &Candidate) -> Result<Option<String>> {
        Ok(match candidate.role() {
            Role::Team => Some(candidate.id().to_string()),
            _ => None,
        })
    }
}

pub struct AccountService;

impl ServiceKind for AccountService {
    const TYPE: ServiceType = ServiceType::Account;
    type Handle = dyn Account;

    fn unconfigured() -> Arc<dyn Account> {
        Arc::new(Unconfigured::new(Self::TYPE))
    }
}
