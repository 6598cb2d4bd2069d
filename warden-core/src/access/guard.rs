//! Enforcement: every backend operation is authorized here before it runs.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;

use super::acl::AccessList;
use super::backend::{Backend, ResolvedAcl};
use super::request::{AccessLevel, AccessRequest, AccessTicket};
use crate::error::{BackendError, Error, Result};
use crate::identity::Candidate;
use crate::services::account::{Account, NoTeams};

/// Evaluates access requests against backend-supplied ACLs.
///
/// The guard resolves a candidate's team through the [`Account`] service, but
/// only when the candidate's own entry does not already decide the request
/// and the ACL actually contains team entries.
///
/// Clones share one Account slot: [`set_accounts`](Self::set_accounts) on any
/// clone changes which service every clone consults from then on.
#[derive(Clone)]
pub struct Guard {
    accounts: Arc<RwLock<Arc<dyn Account>>>,
}

impl Guard {
    pub fn new(accounts: Arc<dyn Account>) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(accounts)),
        }
    }

    /// A guard for deployments without teams: nobody resolves to a team.
    pub fn without_teams() -> Self {
        Self::new(Arc::new(NoTeams))
    }

    /// The Account service consulted for team lookups.
    pub fn accounts(&self) -> Arc<dyn Account> {
        self.accounts.read().clone()
    }

    /// Swap the Account service for this guard and all of its clones.
    pub fn set_accounts(&self, accounts: Arc<dyn Account>) {
        *self.accounts.write() = accounts;
    }

    /// Evaluate `request` against an already-resolved ACL.
    pub async fn evaluate(&self, acl: &AccessList, request: &AccessRequest) -> Result<AccessTicket> {
        let direct = acl.evaluate(request, None);
        if direct.is_granted() || !acl.has_team_entries() {
            return Ok(direct);
        }
        let accounts = self.accounts();
        let team = accounts.team_of(request.candidate()).await?;
        Ok(acl.evaluate(request, team.as_deref()))
    }

    /// Authorize `request` for an operation that demands `required`.
    ///
    /// The request's own level must imply `required`; a Read request can
    /// never reach a write operation. On success the resolved ACL is returned
    /// so create paths can persist it. On denial nothing but the ACL lookup
    /// has touched the backend.
    pub async fn authorize<B: Backend + ?Sized>(
        &self,
        backend: &B,
        request: &AccessRequest,
        required: AccessLevel,
    ) -> Result<ResolvedAcl> {
        if !request.level().implies(required) {
            log::warn!(
                "denied {} on '{}': {} request cannot satisfy {}",
                request.candidate(),
                request.resource(),
                request.level(),
                required
            );
            return Err(Error::denied(
                request.candidate(),
                request.resource(),
                required,
            ));
        }

        let resolved = backend.resolve_acl(request).await?;
        match self.evaluate(resolved.acl(), request).await? {
            AccessTicket::Granted { role, id } => {
                log::debug!(
                    "granted {} {} on '{}' via {}:{}{}",
                    request.candidate(),
                    request.level(),
                    request.resource(),
                    role,
                    id,
                    if resolved.is_new() { " (new resource)" } else { "" }
                );
                Ok(resolved)
            }
            AccessTicket::Denied => {
                log::warn!(
                    "denied {} {} on '{}' ({})",
                    request.candidate(),
                    request.level(),
                    request.resource(),
                    backend.implementation()
                );
                Err(Error::denied(
                    request.candidate(),
                    request.resource(),
                    request.level(),
                ))
            }
        }
    }

    /// Whether `candidate` may read an existing resource.
    ///
    /// Unlike [`authorize`](Self::authorize), a resource without a stored ACL
    /// is not readable here: listings must not hand out creator rights.
    pub async fn can_read<B: Backend + ?Sized>(
        &self,
        backend: &B,
        candidate: &Candidate,
        resource: &str,
    ) -> Result<bool> {
        let stored = backend.load_acl(resource).await?;
        let Some(acl) = AccessList::from_metadata(stored.as_deref()) else {
            return Ok(false);
        };
        let request = candidate.read(resource);
        Ok(self.evaluate(&acl, &request).await?.is_granted())
    }

    /// Keep only the resources `candidate` may read.
    pub async fn filter_readable<B: Backend + ?Sized>(
        &self,
        backend: &B,
        candidate: &Candidate,
        resources: Vec<String>,
    ) -> Result<Vec<String>> {
        let mut readable = Vec::with_capacity(resources.len());
        for resource in resources {
            if self.can_read(backend, candidate, &resource).await? {
                readable.push(resource);
            }
        }
        Ok(readable)
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("accounts", &self.accounts().implementation())
            .finish()
    }
}

/// A driver that can only be reached through its [`Guard`].
///
/// Service traits such as [`Storage`](crate::Storage) are implemented for
/// `Guarded<D>` and route every operation through [`Guarded::run`], so a
/// handle obtained from the registry has no unguarded path to the driver.
pub struct Guarded<D> {
    driver: D,
    guard: Guard,
}

impl<D: Backend> Guarded<D> {
    pub fn new(driver: D, guard: Guard) -> Self {
        Self { driver, guard }
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Authorize `request` for `required`, then run `op` exactly once.
    ///
    /// `op` receives the driver and the resolved ACL. Its result, including
    /// any [`BackendError`], is returned unchanged. If authorization fails
    /// `op` is never called.
    pub async fn run<'a, T, F, Fut>(
        &'a self,
        request: &'a AccessRequest,
        required: AccessLevel,
        op: F,
    ) -> Result<T>
    where
        F: FnOnce(&'a D, ResolvedAcl) -> Fut,
        Fut: Future<Output = std::result::Result<T, BackendError>> + Send + 'a,
    {
        let resolved = self.guard.authorize(&self.driver, request, required).await?;
        Ok(op(&self.driver, resolved).await?)
    }

    /// Keep only the resources `candidate` may read.
    pub async fn filter_readable(
        &self,
        candidate: &Candidate,
        resources: Vec<String>,
    ) -> Result<Vec<String>> {
        self.guard
            .filter_readable(&self.driver, candidate, resources)
            .await
    }

    pub(crate) fn driver(&self) -> &D {
        &self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use crate::test_utils::{RecordingBackend, StubAccounts};

    fn guard_with_team(member: &str, team: &str) -> Guard {
        Guard::new(Arc::new(StubAccounts::new().with_member(member, team)))
    }

    #[tokio::test]
    async fn test_creator_is_owner_of_new_resource() {
        let backend = RecordingBackend::new();
        let guard = Guard::without_teams();
        let alice = Candidate::user("alice");

        for request in [alice.read("new"), alice.write("new"), alice.owner("new")] {
            let resolved = guard
                .authorize(&backend, &request, request.level())
                .await
                .unwrap();
            assert!(resolved.is_new());
        }
    }

    #[tokio::test]
    async fn test_existing_acl_is_used_verbatim() {
        let backend = RecordingBackend::new().with_acl(
            "doc",
            AccessList::new().with_access(Role::User, "alice", [AccessLevel::Read]),
        );
        let guard = Guard::without_teams();

        let resolved = guard
            .authorize(&backend, &Candidate::user("alice").read("doc"), AccessLevel::Read)
            .await
            .unwrap();
        assert!(!resolved.is_new());

        let err = guard
            .authorize(&backend, &Candidate::user("bob").read("doc"), AccessLevel::Read)
            .await
            .unwrap_err();
        assert!(err.is_access_denied());
    }

    #[tokio::test]
    async fn test_weaker_request_cannot_reach_stronger_operation() {
        let backend = RecordingBackend::new();
        let guard = Guard::without_teams();
        let request = Candidate::user("alice").read("new");

        let err = guard
            .authorize(&backend, &request, AccessLevel::Write)
            .await
            .unwrap_err();
        assert!(err.is_access_denied());
        // Rejected before the ACL was even looked up
        assert_eq!(backend.acl_loads(), 0);
    }

    #[tokio::test]
    async fn test_owner_request_satisfies_any_operation() {
        let backend = RecordingBackend::new();
        let guard = Guard::without_teams();
        let request = Candidate::user("alice").owner("new");
        assert!(guard
            .authorize(&backend, &request, AccessLevel::Read)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_team_lookup_only_when_needed() {
        let accounts = Arc::new(StubAccounts::new().with_member("agent-777", "9"));
        let guard = Guard::new(accounts.clone());

        let direct = AccessList::new().with_access(Role::Agent, "agent-777", [AccessLevel::Read]);
        let ticket = guard
            .evaluate(&direct, &Candidate::agent("agent-777").read("r"))
            .await
            .unwrap();
        assert!(ticket.is_granted());
        assert_eq!(accounts.lookups(), 0);

        let team = AccessList::new().with_access(Role::Team, "9", [AccessLevel::Read]);
        let ticket = guard
            .evaluate(&team, &Candidate::agent("agent-777").read("r"))
            .await
            .unwrap();
        assert!(ticket.is_granted());
        assert_eq!(accounts.lookups(), 1);
    }

    #[tokio::test]
    async fn test_swapped_accounts_reach_every_clone() {
        let guard = guard_with_team("agent-777", "9");
        let wrapped = Guarded::new(RecordingBackend::new(), guard.clone());
        let acl = AccessList::new().with_access(Role::Team, "9", [AccessLevel::Read]);
        let request = Candidate::agent("agent-777").read("r");

        assert!(wrapped.guard().evaluate(&acl, &request).await.unwrap().is_granted());

        guard.set_accounts(Arc::new(StubAccounts::new().with_member("agent-777", "5")));
        assert!(wrapped.guard().evaluate(&acl, &request).await.unwrap().is_denied());
        assert_eq!(wrapped.guard().accounts().implementation(), "stub");
    }

    #[tokio::test]
    async fn test_team_mismatch_is_denied() {
        let guard = guard_with_team("agent-999", "5");
        let acl = AccessList::new().with_access(Role::Team, "9", [AccessLevel::Read]);
        let ticket = guard
            .evaluate(&acl, &Candidate::agent("agent-999").read("r"))
            .await
            .unwrap();
        assert!(ticket.is_denied());
    }

    #[tokio::test]
    async fn test_guarded_run_skips_op_on_denial() {
        let backend = RecordingBackend::new().with_acl("doc", AccessList::new());
        let guarded = Guarded::new(backend, Guard::without_teams());
        let mut ran = false;

        let result: Result<()> = guarded
            .run(&Candidate::user("x").write("doc"), AccessLevel::Write, |_, _| {
                ran = true;
                async { Ok(()) }
            })
            .await;

        assert!(result.unwrap_err().is_access_denied());
        assert!(!ran);
    }

    #[tokio::test]
    async fn test_guarded_run_propagates_backend_error_verbatim() {
        let guarded = Guarded::new(RecordingBackend::new(), Guard::without_teams());
        let result: Result<()> = guarded
            .run(&Candidate::user("x").write("doc"), AccessLevel::Write, |_, _| async {
                Err(BackendError::Other("disk on fire".into()))
            })
            .await;

        match result {
            Err(Error::Backend(BackendError::Other(msg))) => assert_eq!(msg, "disk on fire"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_can_read_requires_stored_acl() {
        let backend = RecordingBackend::new()
            .with_acl(
                "shared",
                AccessList::new().with_access(Role::User, "u", [AccessLevel::Read]),
            )
            .with_raw_acl("broken", "{not json");
        let guard = Guard::without_teams();
        let u = Candidate::user("u");

        let readable = guard
            .filter_readable(
                &backend,
                &u,
                vec!["shared".into(), "broken".into(), "missing".into()],
            )
            .await
            .unwrap();
        assert_eq!(readable, vec!["shared".to_string()]);
    }
}
