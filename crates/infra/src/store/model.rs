//! Rows the engine reads and writes besides jobs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use provd_core::{
    AgentId, AppId, JobId, ResourceId, TemplateId, TemplateVersionId, UserId, WorkerId,
    WorkspaceBuildId, WorkspaceId, WorkspaceTransition,
};
use provd_schedule::{BuildDeadlines, TemplateScheduleOptions};

use crate::jobs::JobStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    Password,
    Github,
    Oidc,
}

/// How a user signs in, with the provider token if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLink {
    pub user_id: UserId,
    pub login_type: LoginType,
    pub oauth_access_token: String,
    pub oauth_expiry: Option<DateTime<Utc>>,
}

/// A user's OAuth grant for one git-auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitAuthLink {
    pub provider_id: String,
    pub user_id: UserId,
    pub oauth_access_token: String,
    pub oauth_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    /// Options as stored; the schedule policy decides which are in effect.
    pub schedule: TemplateScheduleOptions,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TemplateId::new(),
            name: name.into(),
            schedule: TemplateScheduleOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub id: TemplateVersionId,
    pub template_id: Option<TemplateId>,
    /// The import job that parses this version.
    pub job_id: JobId,
    pub name: String,
    pub readme: String,
    /// Provider ids the version's code depends on, reported on import.
    pub git_auth_providers: Vec<String>,
}

/// A declared template variable together with its resolved value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVersionVariable {
    pub template_version_id: TemplateVersionId,
    pub name: String,
    pub description: String,
    pub var_type: String,
    pub default_value: String,
    pub required: bool,
    pub sensitive: bool,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub owner_id: UserId,
    pub template_id: TemplateId,
    /// The user's requested TTL, if any.
    pub ttl: Option<Duration>,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceBuild {
    pub id: WorkspaceBuildId,
    pub workspace_id: WorkspaceId,
    pub template_version_id: TemplateVersionId,
    pub job_id: JobId,
    pub build_number: i32,
    pub transition: WorkspaceTransition,
    pub initiator_id: UserId,
    pub provisioner_state: Vec<u8>,
    pub deadlines: BuildDeadlines,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceResource {
    pub id: ResourceId,
    pub job_id: JobId,
    pub transition: WorkspaceTransition,
    pub name: String,
    pub resource_type: String,
    pub daily_cost: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceAgent {
    pub id: AgentId,
    pub resource_id: ResourceId,
    pub name: String,
    pub auth_token: Uuid,
    pub auth_instance_id: Option<String>,
    pub operating_system: String,
    pub architecture: String,
    pub directory: String,
    /// Stored verbatim as a JSON object.
    pub environment_variables: serde_json::Value,
    pub startup_script: Option<String>,
    pub shutdown_script: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceApp {
    pub id: AppId,
    pub agent_id: AgentId,
    pub slug: String,
    pub display_name: String,
    pub command: Option<String>,
    pub url: Option<String>,
    pub icon: String,
    pub subdomain: bool,
    pub created_at: DateTime<Utc>,
}

/// One validated resource with everything hanging off it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub resource: WorkspaceResource,
    pub agents: Vec<AgentRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRecord {
    pub agent: WorkspaceAgent,
    pub apps: Vec<WorkspaceApp>,
}

/// Terminal outcome written onto a job row.
///
/// The store applies it only if `worker_id` may still finish the job (see
/// [`Job::check_finishable`](crate::jobs::Job::check_finishable)); otherwise
/// nothing in the batch is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCompletion {
    pub job_id: JobId,
    /// Daemon finishing the job; must be its owner.
    pub worker_id: WorkerId,
    /// Accept a succeeded job that carries a recorded error.
    pub allow_recompletion: bool,
    /// A `Failed` outcome on a job flagged for cancellation is stored as `Canceled`.
    pub status: JobStatus,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Everything a finished workspace build writes, in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCompletion {
    pub build_id: WorkspaceBuildId,
    pub provisioner_state: Vec<u8>,
    /// `None` leaves the stored deadlines untouched.
    pub deadlines: Option<BuildDeadlines>,
    pub mark_workspace_deleted: bool,
    pub resources: Vec<ResourceRecord>,
    pub job: JobCompletion,
}
