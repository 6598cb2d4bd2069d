use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use warden_core::{Account, Candidate, Connector, Role, ServiceContext, Settings};

#[derive(Debug, Default, Deserialize)]
struct AccountSettings {
    #[serde(default)]
    members: HashMap<String, String>,
}

/// Team membership from a fixed table.
///
/// Configured as `{"members": {"<candidate id>": "<team id>"}}`. A team
/// candidate always resolves to itself.
#[derive(Debug, Clone, Default)]
pub struct StaticAccounts {
    members: HashMap<String, String>,
}

impl StaticAccounts {
    pub const NAME: &'static str = "in-process-memory";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, member: impl Into<String>, team: impl Into<String>) -> Self {
        self.members.insert(member.into(), team.into());
        self
    }

    pub fn from_settings(settings: &Settings) -> warden_core::Result<Self> {
        let parsed: AccountSettings = settings.parse()?;
        Ok(Self {
            members: parsed.members,
        })
    }

    pub fn factory(
        settings: &Settings,
        _ctx: &ServiceContext,
    ) -> warden_core::Result<Arc<dyn Account>> {
        let accounts = Self::from_settings(settings)?;
        log::debug!("static accounts with {} members", accounts.members.len());
        Ok(Arc::new(accounts))
    }
}

impl Connector for StaticAccounts {
    fn implementation(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl Account for StaticAccounts {
    async fn team_of(&self, candidate: &Candidate) -> warden_core::Result<Option<String>> {
        Ok(match candidate.role() {
            Role::Team => Some(candidate.id().to_string()),
            _ => self.members.get(candidate.id()).cloned(),
        })
    }
}
