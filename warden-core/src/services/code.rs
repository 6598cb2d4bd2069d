//! Ephemeral code execution.
//!
//! Only the contract lives here; runners are external. A job executes inside
//! a workspace resource, and running code there counts as writing to it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ResourceService, ServiceKind, ServiceType, Unconfigured};
use crate::access::{AccessLevel, AccessList, AccessRequest, Backend, Guarded};
use crate::error::{BackendError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeJob {
    pub language: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl CodeJob {
    pub fn new(language: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            source: source.into(),
            stdin: None,
            timeout_secs: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CodeOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait CodeDriver: Backend {
    /// Run `job` in `workspace`. `acl` is `Some` when the workspace is new.
    async fn run_job(
        &self,
        workspace: &str,
        job: CodeJob,
        acl: Option<&AccessList>,
    ) -> std::result::Result<CodeOutput, BackendError>;
}

#[async_trait]
pub trait CodeRunner: ResourceService {
    /// Execute `job` in the workspace named by `request`. Requires Write.
    async fn execute(&self, request: &AccessRequest, job: CodeJob) -> Result<CodeOutput>;
}

#[async_trait]
impl<D: CodeDriver> CodeRunner for Guarded<D> {
    async fn execute(&self, request: &AccessRequest, job: CodeJob) -> Result<CodeOutput> {
        self.run(request, AccessLevel::Write, |driver, resolved| async move {
            let created = resolved.is_new().then(|| resolved.into_acl());
            driver
                .run_job(request.resource(), job, created.as_ref())
                .await
        })
        .await
    }
}

pub struct CodeService;

impl ServiceKind for CodeService {
    const TYPE: ServiceType = ServiceType::Code;
    type Handle = dyn CodeRunner;

    fn unconfigured() -> Arc<dyn CodeRunner> {
        Arc::new(Unconfigured::new(Self::TYPE))
    }
}
