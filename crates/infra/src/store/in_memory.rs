//! In-memory store for tests and single-process deployments.
//!
//! One `RwLock` guards all tables, so every trait method is trivially a
//! transaction: multi-row writes validate first and mutate second, under the
//! same write guard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use provd_core::{
    AgentId, JobId, ResourceId, TemplateId, TemplateVersionId, UserId, WorkerId,
    WorkspaceBuildId, WorkspaceId,
};
use provd_schedule::TemplateScheduleOptions;

use crate::jobs::{Job, JobKind, JobLog, JobStatus, NewJobLog};

use super::model::{
    BuildCompletion, GitAuthLink, JobCompletion, LoginType, ResourceRecord, Template,
    TemplateVersion, TemplateVersionVariable, User, UserLink, Workspace, WorkspaceAgent,
    WorkspaceApp, WorkspaceBuild, WorkspaceResource,
};
use super::r#trait::{ProvisionerStore, StoreError};

#[derive(Debug, Default)]
struct State {
    jobs: HashMap<JobId, Job>,
    logs: Vec<JobLog>,
    users: HashMap<UserId, User>,
    user_links: HashMap<(UserId, LoginType), UserLink>,
    git_auth_links: HashMap<(String, UserId), GitAuthLink>,
    templates: HashMap<TemplateId, Template>,
    template_versions: HashMap<TemplateVersionId, TemplateVersion>,
    variables: Vec<TemplateVersionVariable>,
    workspaces: HashMap<WorkspaceId, Workspace>,
    builds: HashMap<WorkspaceBuildId, WorkspaceBuild>,
    resources: Vec<WorkspaceResource>,
    agents: Vec<WorkspaceAgent>,
    apps: Vec<WorkspaceApp>,
}

impl State {
    fn ensure_job(&self, id: JobId) -> Result<(), StoreError> {
        if self.jobs.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::not_found("job", id))
        }
    }

    /// Refuse the completion unless its worker may still finish the job.
    /// Runs before any row of a `finish_*` batch is touched.
    fn check_completion(&self, completion: &JobCompletion) -> Result<(), StoreError> {
        let job = self
            .jobs
            .get(&completion.job_id)
            .ok_or_else(|| StoreError::not_found("job", completion.job_id))?;
        job.check_finishable(completion.worker_id, completion.allow_recompletion)?;
        Ok(())
    }

    fn complete_job(&mut self, completion: JobCompletion) -> Result<Job, StoreError> {
        let job = self
            .jobs
            .get_mut(&completion.job_id)
            .ok_or_else(|| StoreError::not_found("job", completion.job_id))?;
        // The flag may have been set after the caller read the job.
        let status = if completion.status == JobStatus::Failed && job.is_canceled() {
            JobStatus::Canceled
        } else {
            completion.status
        };
        job.mark_completed(status, completion.error, completion.completed_at);
        Ok(job.clone())
    }

    fn append_resources(&mut self, records: Vec<ResourceRecord>) {
        for record in records {
            self.resources.push(record.resource);
            for agent in record.agents {
                self.agents.push(agent.agent);
                self.apps.extend(agent.apps);
            }
        }
    }

    /// Drop everything previously ingested for `job_id`, then append.
    fn replace_resources(&mut self, job_id: JobId, records: Vec<ResourceRecord>) {
        let stale: Vec<ResourceId> = self
            .resources
            .iter()
            .filter(|r| r.job_id == job_id)
            .map(|r| r.id)
            .collect();
        if !stale.is_empty() {
            let stale_agents: Vec<AgentId> = self
                .agents
                .iter()
                .filter(|a| stale.contains(&a.resource_id))
                .map(|a| a.id)
                .collect();
            self.apps.retain(|app| !stale_agents.contains(&app.agent_id));
            self.agents.retain(|a| !stale.contains(&a.resource_id));
            self.resources.retain(|r| r.job_id != job_id);
        }
        self.append_resources(records);
    }
}

/// In-memory [`ProvisionerStore`].
#[derive(Debug, Default)]
pub struct InMemoryProvisionerStore {
    state: RwLock<State>,
    next_log_id: AtomicUsize,
    acquire_attempts: AtomicUsize,
}

impl InMemoryProvisionerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// How many times `acquire_job` has been called.
    pub fn acquire_attempts(&self) -> usize {
        self.acquire_attempts.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Storage("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Storage("store lock poisoned".to_string()))
    }
}

impl ProvisionerStore for InMemoryProvisionerStore {
    fn insert_job(&self, job: Job) -> Result<Job, StoreError> {
        let mut state = self.write()?;
        if state.jobs.contains_key(&job.id) {
            return Err(StoreError::already_exists("job", job.id));
        }
        state.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    fn get_job(&self, id: JobId) -> Result<Job, StoreError> {
        self.read()?
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("job", id))
    }

    fn acquire_job(
        &self,
        worker_id: WorkerId,
        kinds: &[JobKind],
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, StoreError> {
        self.acquire_attempts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.write()?;

        // FIFO; ids are time-ordered so they break ties deterministically.
        let next = state
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending && kinds.contains(&j.kind))
            .min_by_key(|j| (j.created_at, j.id))
            .map(|j| j.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("job", id))?;
        job.mark_running(worker_id, now);
        Ok(Some(job.clone()))
    }

    fn touch_job(&self, id: JobId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("job", id))?;
        job.updated_at = now;
        Ok(())
    }

    fn cancel_job(&self, id: JobId, now: DateTime<Utc>) -> Result<Job, StoreError> {
        let mut state = self.write()?;
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("job", id))?;
        if !job.status.is_terminal() {
            job.mark_canceled(now);
        }
        Ok(job.clone())
    }

    fn insert_job_logs(&self, job_id: JobId, logs: Vec<NewJobLog>) -> Result<Vec<JobLog>, StoreError> {
        let mut state = self.write()?;
        state.ensure_job(job_id)?;
        let inserted: Vec<JobLog> = logs
            .into_iter()
            .map(|log| JobLog {
                id: self.next_log_id.fetch_add(1, Ordering::SeqCst) as i64 + 1,
                job_id,
                created_at: log.created_at,
                source: log.source,
                level: log.level,
                stage: log.stage,
                output: log.output,
            })
            .collect();
        state.logs.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    fn get_job_logs_after(&self, job_id: JobId, after: i64) -> Result<Vec<JobLog>, StoreError> {
        let state = self.read()?;
        Ok(state
            .logs
            .iter()
            .filter(|l| l.job_id == job_id && l.id > after)
            .cloned()
            .collect())
    }

    fn finish_job(
        &self,
        completion: JobCompletion,
        resources: Vec<ResourceRecord>,
    ) -> Result<Job, StoreError> {
        let mut state = self.write()?;
        state.check_completion(&completion)?;
        state.replace_resources(completion.job_id, resources);
        state.complete_job(completion)
    }

    fn finish_template_import(
        &self,
        completion: JobCompletion,
        git_auth_providers: Vec<String>,
        resources: Vec<ResourceRecord>,
    ) -> Result<Job, StoreError> {
        let mut state = self.write()?;
        state.check_completion(&completion)?;
        if let Some(version) = state
            .template_versions
            .values_mut()
            .find(|v| v.job_id == completion.job_id)
        {
            version.git_auth_providers = git_auth_providers;
        }
        state.replace_resources(completion.job_id, resources);
        state.complete_job(completion)
    }

    fn finish_workspace_build(&self, completion: BuildCompletion) -> Result<Job, StoreError> {
        let mut state = self.write()?;
        let workspace_id = state
            .builds
            .get(&completion.build_id)
            .map(|b| b.workspace_id)
            .ok_or_else(|| StoreError::not_found("workspace build", completion.build_id))?;
        state.check_completion(&completion.job)?;
        if completion.mark_workspace_deleted && !state.workspaces.contains_key(&workspace_id) {
            return Err(StoreError::not_found("workspace", workspace_id));
        }

        let now = completion.job.completed_at;
        if let Some(build) = state.builds.get_mut(&completion.build_id) {
            build.provisioner_state = completion.provisioner_state;
            if let Some(deadlines) = completion.deadlines {
                build.deadlines = deadlines;
            }
            build.updated_at = now;
        }
        if completion.mark_workspace_deleted {
            if let Some(workspace) = state.workspaces.get_mut(&workspace_id) {
                workspace.deleted = true;
            }
        }
        state.replace_resources(completion.job.job_id, completion.resources);
        state.complete_job(completion.job)
    }

    fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut state = self.write()?;
        if state.users.contains_key(&user.id) {
            return Err(StoreError::already_exists("user", user.id));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<User, StoreError> {
        self.read()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    fn insert_user_link(&self, link: UserLink) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.user_links.insert((link.user_id, link.login_type), link);
        Ok(())
    }

    fn get_user_link(&self, user_id: UserId, login_type: LoginType) -> Result<UserLink, StoreError> {
        self.read()?
            .user_links
            .get(&(user_id, login_type))
            .cloned()
            .ok_or_else(|| StoreError::not_found("user link", user_id))
    }

    fn insert_git_auth_link(&self, link: GitAuthLink) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state
            .git_auth_links
            .insert((link.provider_id.clone(), link.user_id), link);
        Ok(())
    }

    fn get_git_auth_link(&self, provider_id: &str, user_id: UserId) -> Result<GitAuthLink, StoreError> {
        self.read()?
            .git_auth_links
            .get(&(provider_id.to_string(), user_id))
            .cloned()
            .ok_or_else(|| StoreError::not_found("git auth link", format!("{provider_id}/{user_id}")))
    }

    fn insert_template(&self, template: Template) -> Result<Template, StoreError> {
        let mut state = self.write()?;
        if state.templates.contains_key(&template.id) {
            return Err(StoreError::already_exists("template", template.id));
        }
        state.templates.insert(template.id, template.clone());
        Ok(template)
    }

    fn get_template(&self, id: TemplateId) -> Result<Template, StoreError> {
        self.read()?
            .templates
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("template", id))
    }

    fn update_template_schedule(
        &self,
        id: TemplateId,
        schedule: TemplateScheduleOptions,
    ) -> Result<Template, StoreError> {
        let mut state = self.write()?;
        let template = state
            .templates
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("template", id))?;
        template.schedule = schedule;
        Ok(template.clone())
    }

    fn insert_template_version(&self, version: TemplateVersion) -> Result<TemplateVersion, StoreError> {
        let mut state = self.write()?;
        if state.template_versions.contains_key(&version.id) {
            return Err(StoreError::already_exists("template version", version.id));
        }
        state.template_versions.insert(version.id, version.clone());
        Ok(version)
    }

    fn get_template_version(&self, id: TemplateVersionId) -> Result<TemplateVersion, StoreError> {
        self.read()?
            .template_versions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("template version", id))
    }

    fn get_template_version_by_job_id(&self, job_id: JobId) -> Result<TemplateVersion, StoreError> {
        self.read()?
            .template_versions
            .values()
            .find(|v| v.job_id == job_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("template version for job", job_id))
    }

    fn update_template_version_readme(
        &self,
        id: TemplateVersionId,
        readme: String,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let version = state
            .template_versions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("template version", id))?;
        version.readme = readme;
        Ok(())
    }

    fn upsert_template_version_variable(
        &self,
        variable: TemplateVersionVariable,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state
            .template_versions
            .contains_key(&variable.template_version_id)
        {
            return Err(StoreError::not_found(
                "template version",
                variable.template_version_id,
            ));
        }
        match state.variables.iter_mut().find(|v| {
            v.template_version_id == variable.template_version_id && v.name == variable.name
        }) {
            Some(existing) => *existing = variable,
            None => state.variables.push(variable),
        }
        Ok(())
    }

    fn get_template_version_variables(
        &self,
        version_id: TemplateVersionId,
    ) -> Result<Vec<TemplateVersionVariable>, StoreError> {
        let state = self.read()?;
        Ok(state
            .variables
            .iter()
            .filter(|v| v.template_version_id == version_id)
            .cloned()
            .collect())
    }

    fn insert_workspace(&self, workspace: Workspace) -> Result<Workspace, StoreError> {
        let mut state = self.write()?;
        if state.workspaces.contains_key(&workspace.id) {
            return Err(StoreError::already_exists("workspace", workspace.id));
        }
        state.workspaces.insert(workspace.id, workspace.clone());
        Ok(workspace)
    }

    fn get_workspace(&self, id: WorkspaceId) -> Result<Workspace, StoreError> {
        self.read()?
            .workspaces
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("workspace", id))
    }

    fn insert_workspace_build(&self, build: WorkspaceBuild) -> Result<WorkspaceBuild, StoreError> {
        let mut state = self.write()?;
        if state.builds.contains_key(&build.id) {
            return Err(StoreError::already_exists("workspace build", build.id));
        }
        state.builds.insert(build.id, build.clone());
        Ok(build)
    }

    fn get_workspace_build(&self, id: WorkspaceBuildId) -> Result<WorkspaceBuild, StoreError> {
        self.read()?
            .builds
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("workspace build", id))
    }

    fn get_workspace_resources_by_job_id(&self, job_id: JobId) -> Result<Vec<WorkspaceResource>, StoreError> {
        let state = self.read()?;
        Ok(state
            .resources
            .iter()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect())
    }

    fn get_workspace_agents_by_resource_id(
        &self,
        resource_id: ResourceId,
    ) -> Result<Vec<WorkspaceAgent>, StoreError> {
        let state = self.read()?;
        Ok(state
            .agents
            .iter()
            .filter(|a| a.resource_id == resource_id)
            .cloned()
            .collect())
    }

    fn get_workspace_apps_by_agent_id(&self, agent_id: AgentId) -> Result<Vec<WorkspaceApp>, StoreError> {
        let state = self.read()?;
        Ok(state
            .apps
            .iter()
            .filter(|a| a.agent_id == agent_id)
            .cloned()
            .collect())
    }
}
