//! Provisioner job lifecycle engine.
//!
//! Daemons pull work with [`Server::acquire_job`], stream progress with
//! [`Server::update_job`] and finish with [`Server::fail_job`] or
//! [`Server::complete_job`]. The engine enforces job ownership, resolves build
//! deadlines, ingests declared resources and signals observers over pubsub.
//!
//! Every call is a single bounded request against the store. No lock is held
//! across calls.

mod acquire;
mod complete;
pub mod debounce;
pub mod error;
pub mod proto;
pub mod resources;
mod templates;
mod update;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use provd_core::{JobId, SwapCell, WorkerId, WorkspaceId};
use provd_events::{JobLogsNotifyMessage, Pubsub, job_logs_notify_channel, workspace_notify_channel};
use provd_schedule::{
    CommunitySchedulePolicy, EntitledSchedulePolicy, Entitlement, TemplateSchedulePolicy,
};

use crate::audit::{AuditSink, NoopAuditor};
use crate::config::ServerConfig;
use crate::gitauth::GitAuthRegistry;
use crate::jobs::Job;
use crate::store::ProvisionerStore;

pub use debounce::AcquireDebounce;
pub use error::ProvisionerError;
pub use resources::plan_resources;

/// Construction-time settings of a [`Server`].
#[derive(Clone)]
pub struct ServerOptions {
    pub access_url: String,
    pub acquire_debounce: Duration,
    pub git_auth: GitAuthRegistry,
    pub schedule_policy: Arc<dyn TemplateSchedulePolicy>,
    pub auditor: Arc<dyn AuditSink>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            access_url: "http://localhost:8080".to_string(),
            acquire_debounce: Duration::from_secs(1),
            git_auth: GitAuthRegistry::default(),
            schedule_policy: Arc::new(CommunitySchedulePolicy),
            auditor: Arc::new(NoopAuditor),
        }
    }
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        let schedule_policy: Arc<dyn TemplateSchedulePolicy> = if config.schedule_entitled {
            Arc::new(EntitledSchedulePolicy::new(Entitlement::Entitled))
        } else {
            Arc::new(CommunitySchedulePolicy)
        };
        Self {
            access_url: config.access_url.clone(),
            acquire_debounce: config.acquire_debounce,
            git_auth: GitAuthRegistry::from_ids(config.git_auth_providers.iter().cloned()),
            schedule_policy,
            auditor: Arc::new(NoopAuditor),
        }
    }

    pub fn with_acquire_debounce(mut self, debounce: Duration) -> Self {
        self.acquire_debounce = debounce;
        self
    }

    pub fn with_git_auth(mut self, registry: GitAuthRegistry) -> Self {
        self.git_auth = registry;
        self
    }

    pub fn with_schedule_policy(mut self, policy: Arc<dyn TemplateSchedulePolicy>) -> Self {
        self.schedule_policy = policy;
        self
    }

    pub fn with_auditor(mut self, auditor: Arc<dyn AuditSink>) -> Self {
        self.auditor = auditor;
        self
    }
}

/// The lifecycle engine, generic over its store and pubsub transport.
pub struct Server<S, P> {
    store: S,
    pubsub: P,
    access_url: String,
    debounce: AcquireDebounce,
    git_auth: SwapCell<GitAuthRegistry>,
    schedule_policy: SwapCell<dyn TemplateSchedulePolicy>,
    auditor: SwapCell<dyn AuditSink>,
}

impl<S, P> Server<S, P>
where
    S: ProvisionerStore,
    P: Pubsub,
{
    pub fn new(store: S, pubsub: P, options: ServerOptions) -> Self {
        Self {
            store,
            pubsub,
            access_url: options.access_url,
            debounce: AcquireDebounce::new(options.acquire_debounce),
            git_auth: SwapCell::new(Arc::new(options.git_auth)),
            schedule_policy: SwapCell::new(options.schedule_policy),
            auditor: SwapCell::new(options.auditor),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pubsub(&self) -> &P {
        &self.pubsub
    }

    pub fn access_url(&self) -> &str {
        &self.access_url
    }

    pub fn schedule_policy(&self) -> Arc<dyn TemplateSchedulePolicy> {
        self.schedule_policy.load()
    }

    /// Swap the schedule policy; in-flight calls keep the one they loaded.
    pub fn set_schedule_policy(&self, policy: Arc<dyn TemplateSchedulePolicy>) {
        self.schedule_policy.store(policy);
    }

    pub fn auditor(&self) -> Arc<dyn AuditSink> {
        self.auditor.load()
    }

    pub fn set_auditor(&self, auditor: Arc<dyn AuditSink>) {
        self.auditor.store(auditor);
    }

    pub fn git_auth(&self) -> Arc<GitAuthRegistry> {
        self.git_auth.load()
    }

    pub fn set_git_auth(&self, registry: GitAuthRegistry) {
        self.git_auth.store(Arc::new(registry));
    }

    /// Parse `raw_id` and load the job it names.
    fn load_job(&self, raw_id: &str) -> Result<Job, ProvisionerError> {
        let job_id: JobId = raw_id.parse()?;
        Ok(self.store.get_job(job_id)?)
    }

    fn publish(&self, topic: &str, payload: &[u8]) {
        if let Err(err) = self.pubsub.publish(topic, payload) {
            warn!(topic, error = %err, "failed to publish notification");
        }
    }

    fn notify_workspace(&self, workspace_id: WorkspaceId) {
        self.publish(&workspace_notify_channel(workspace_id), &[]);
    }

    fn notify_job_logs(&self, job_id: JobId, message: JobLogsNotifyMessage) {
        self.publish(&job_logs_notify_channel(job_id), &message.to_bytes());
    }
}

fn ensure_owner(job: &Job, worker_id: WorkerId) -> Result<(), ProvisionerError> {
    if job.worker_id != Some(worker_id) {
        return Err(ProvisionerError::PermissionDenied(
            ProvisionerError::NOT_JOB_OWNER,
        ));
    }
    Ok(())
}

/// Decode a job's input. A null input decodes like an empty object.
fn decode_input<T: DeserializeOwned>(job: &Job) -> Result<T, ProvisionerError> {
    let input = match &job.input {
        serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(input).map_err(|e| {
        ProvisionerError::MalformedInput(format!("decode {} job input: {e}", job.kind))
    })
}
