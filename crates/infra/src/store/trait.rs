use chrono::{DateTime, Utc};
use thiserror::Error;

use provd_core::{
    AgentId, JobId, ResourceId, TemplateId, TemplateVersionId, UserId, WorkerId,
    WorkspaceBuildId, WorkspaceId,
};
use provd_schedule::TemplateScheduleOptions;

use crate::jobs::{FinishRejection, Job, JobKind, JobLog, NewJobLog};

use super::model::{
    BuildCompletion, GitAuthLink, JobCompletion, LoginType, ResourceRecord, Template,
    TemplateVersion, TemplateVersionVariable, User, UserLink, Workspace, WorkspaceAgent,
    WorkspaceApp, WorkspaceBuild, WorkspaceResource,
};

/// Store error.
///
/// Messages surface verbatim to daemons, so `NotFound` reads like the
/// relational store it stands in for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} {id}: no rows in result set")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },
    /// A conditional job transition found the job in the wrong state or
    /// owned by someone else.
    #[error(transparent)]
    Rejected(#[from] FinishRejection),
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &'static str, id: impl ToString) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Durable state behind the provisioner engine.
///
/// Every method is one transaction. Multi-row writes (`finish_*`) either
/// apply completely or not at all.
pub trait ProvisionerStore: Send + Sync {
    // --- jobs ---

    fn insert_job(&self, job: Job) -> Result<Job, StoreError>;

    fn get_job(&self, id: JobId) -> Result<Job, StoreError>;

    /// Atomically claim the oldest pending job whose kind is in `kinds`,
    /// mark it running and record `worker_id` as its owner.
    ///
    /// This is the only exclusion mechanism between concurrent daemons: two
    /// calls never return the same job.
    fn acquire_job(
        &self,
        worker_id: WorkerId,
        kinds: &[JobKind],
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, StoreError>;

    /// Bump `updated_at`.
    fn touch_job(&self, id: JobId, now: DateTime<Utc>) -> Result<(), StoreError>;

    fn cancel_job(&self, id: JobId, now: DateTime<Utc>) -> Result<Job, StoreError>;

    /// Append logs in order, returning them with their assigned ids.
    fn insert_job_logs(&self, job_id: JobId, logs: Vec<NewJobLog>) -> Result<Vec<JobLog>, StoreError>;

    fn get_job_logs_after(&self, job_id: JobId, after: i64) -> Result<Vec<JobLog>, StoreError>;

    // The `finish_*` methods re-check `Job::check_finishable` for the
    // completion's worker inside the transaction and return the job as
    // written. Of two racing finishes at most one succeeds.

    /// Complete a job, replacing any resources previously recorded for it.
    fn finish_job(
        &self,
        completion: JobCompletion,
        resources: Vec<ResourceRecord>,
    ) -> Result<Job, StoreError>;

    /// Complete an import job and record the git-auth providers on its
    /// template version (when the job has one).
    fn finish_template_import(
        &self,
        completion: JobCompletion,
        git_auth_providers: Vec<String>,
        resources: Vec<ResourceRecord>,
    ) -> Result<Job, StoreError>;

    fn finish_workspace_build(&self, completion: BuildCompletion) -> Result<Job, StoreError>;

    // --- users ---

    fn insert_user(&self, user: User) -> Result<User, StoreError>;

    fn get_user(&self, id: UserId) -> Result<User, StoreError>;

    fn insert_user_link(&self, link: UserLink) -> Result<(), StoreError>;

    fn get_user_link(&self, user_id: UserId, login_type: LoginType) -> Result<UserLink, StoreError>;

    fn insert_git_auth_link(&self, link: GitAuthLink) -> Result<(), StoreError>;

    fn get_git_auth_link(&self, provider_id: &str, user_id: UserId) -> Result<GitAuthLink, StoreError>;

    // --- templates ---

    fn insert_template(&self, template: Template) -> Result<Template, StoreError>;

    fn get_template(&self, id: TemplateId) -> Result<Template, StoreError>;

    fn update_template_schedule(
        &self,
        id: TemplateId,
        schedule: TemplateScheduleOptions,
    ) -> Result<Template, StoreError>;

    fn insert_template_version(&self, version: TemplateVersion) -> Result<TemplateVersion, StoreError>;

    fn get_template_version(&self, id: TemplateVersionId) -> Result<TemplateVersion, StoreError>;

    fn get_template_version_by_job_id(&self, job_id: JobId) -> Result<TemplateVersion, StoreError>;

    fn update_template_version_readme(
        &self,
        id: TemplateVersionId,
        readme: String,
    ) -> Result<(), StoreError>;

    /// Insert or replace (by name) a variable of a template version.
    fn upsert_template_version_variable(
        &self,
        variable: TemplateVersionVariable,
    ) -> Result<(), StoreError>;

    /// Variables in declaration order.
    fn get_template_version_variables(
        &self,
        version_id: TemplateVersionId,
    ) -> Result<Vec<TemplateVersionVariable>, StoreError>;

    // --- workspaces ---

    fn insert_workspace(&self, workspace: Workspace) -> Result<Workspace, StoreError>;

    fn get_workspace(&self, id: WorkspaceId) -> Result<Workspace, StoreError>;

    fn insert_workspace_build(&self, build: WorkspaceBuild) -> Result<WorkspaceBuild, StoreError>;

    fn get_workspace_build(&self, id: WorkspaceBuildId) -> Result<WorkspaceBuild, StoreError>;

    // --- resources ---

    fn get_workspace_resources_by_job_id(&self, job_id: JobId) -> Result<Vec<WorkspaceResource>, StoreError>;

    fn get_workspace_agents_by_resource_id(
        &self,
        resource_id: ResourceId,
    ) -> Result<Vec<WorkspaceAgent>, StoreError>;

    fn get_workspace_apps_by_agent_id(&self, agent_id: AgentId) -> Result<Vec<WorkspaceApp>, StoreError>;
}
