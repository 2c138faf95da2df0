use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, error, warn};

use provd_core::{UserId, WorkerId};
use provd_events::{JobLogsNotifyMessage, Pubsub};

use crate::jobs::{
    Job, JobKind, JobStatus, TemplateVersionDryRunJob, TemplateVersionImportJob,
    WorkspaceProvisionJob,
};
use crate::store::{JobCompletion, LoginType, ProvisionerStore, TemplateVersionVariable, User};

use super::proto::{AcquiredJob, AcquiredJobPayload, GitAuthProvider, Metadata, VariableValue};
use super::{ProvisionerError, Server, decode_input};

impl<S, P> Server<S, P>
where
    S: ProvisionerStore,
    P: Pubsub,
{
    /// Claim the next pending job of a kind in `supported` for `worker_id`.
    ///
    /// `Ok(None)` means there is nothing to do (or the debounce is holding
    /// acquires back). A job that cannot be hydrated is failed with the
    /// hydration error, and that error is returned.
    pub fn acquire_job(
        &self,
        worker_id: WorkerId,
        supported: &[JobKind],
    ) -> Result<Option<AcquiredJob>, ProvisionerError> {
        if self.debounce.is_active() {
            debug!(worker_id = %worker_id, "acquire debounced");
            return Ok(None);
        }

        let Some(job) = self.store.acquire_job(worker_id, supported, Utc::now())? else {
            self.debounce.record_miss();
            debug!(worker_id = %worker_id, "no pending job to acquire");
            return Ok(None);
        };
        self.debounce.clear();
        debug!(job_id = %job.id, kind = %job.kind, worker_id = %worker_id, "acquired job");

        match self.hydrate(&job) {
            Ok((initiator, payload)) => Ok(Some(AcquiredJob {
                job_id: job.id,
                created_at: job.created_at,
                initiator_username: initiator.username,
                payload,
            })),
            Err(err) => {
                warn!(job_id = %job.id, kind = %job.kind, error = %err, "failed to hydrate acquired job");
                self.fail_unhydrated(&job, worker_id, &err);
                Err(err)
            }
        }
    }

    fn hydrate(&self, job: &Job) -> Result<(User, AcquiredJobPayload), ProvisionerError> {
        let initiator = self.store.get_user(job.initiator_id)?;
        let payload = match job.kind {
            JobKind::TemplateImport => self.hydrate_import(job, &initiator)?,
            JobKind::TemplateDryRun => self.hydrate_dry_run(job)?,
            JobKind::WorkspaceBuild => self.hydrate_build(job)?,
        };
        Ok((initiator, payload))
    }

    fn hydrate_import(
        &self,
        job: &Job,
        initiator: &User,
    ) -> Result<AcquiredJobPayload, ProvisionerError> {
        let input: TemplateVersionImportJob = decode_input(job)?;

        let (declared, git_auth_providers) = match input.template_version_id {
            Some(version_id) => {
                let version = self.store.get_template_version(version_id)?;
                let declared = self.store.get_template_version_variables(version_id)?;
                let providers = self.git_auth_tokens(&version.git_auth_providers, initiator.id)?;
                (declared, providers)
            }
            None => (Vec::new(), Vec::new()),
        };
        let sensitivity: HashMap<&str, bool> = declared
            .iter()
            .map(|v| (v.name.as_str(), v.sensitive))
            .collect();

        let user_variable_values = input
            .user_variable_values
            .into_iter()
            .map(|v| VariableValue {
                // Undeclared values are treated as secrets.
                sensitive: sensitivity.get(v.name.as_str()).copied().unwrap_or(true),
                name: v.name,
                value: v.value,
            })
            .collect();

        Ok(AcquiredJobPayload::TemplateImport {
            user_variable_values,
            git_auth_providers,
            metadata: Metadata {
                access_url: self.access_url.clone(),
                ..Default::default()
            },
        })
    }

    fn hydrate_dry_run(&self, job: &Job) -> Result<AcquiredJobPayload, ProvisionerError> {
        let input: TemplateVersionDryRunJob = decode_input(job)?;
        let variable_values = match input.template_version_id {
            Some(version_id) => {
                variable_values(&self.store.get_template_version_variables(version_id)?)
            }
            None => Vec::new(),
        };

        Ok(AcquiredJobPayload::TemplateDryRun {
            metadata: Metadata {
                access_url: self.access_url.clone(),
                workspace_name: input.workspace_name.clone(),
                ..Default::default()
            },
            workspace_name: input.workspace_name,
            parameter_values: input.parameter_values,
            variable_values,
        })
    }

    fn hydrate_build(&self, job: &Job) -> Result<AcquiredJobPayload, ProvisionerError> {
        let input: WorkspaceProvisionJob = decode_input(job)?;
        let build = self.store.get_workspace_build(input.workspace_build_id)?;
        let workspace = self.store.get_workspace(build.workspace_id)?;
        let owner = self.store.get_user(workspace.owner_id)?;
        let template = self.store.get_template(workspace.template_id)?;
        let version = self.store.get_template_version(build.template_version_id)?;
        let variables = self.store.get_template_version_variables(version.id)?;

        let oidc_access_token = match self.store.get_user_link(owner.id, LoginType::Oidc) {
            Ok(link) => link.oauth_access_token,
            Err(err) if err.is_not_found() => String::new(),
            Err(err) => return Err(err.into()),
        };
        let git_auth_providers = self.git_auth_tokens(&version.git_auth_providers, owner.id)?;

        // The workspace is now building.
        self.notify_workspace(workspace.id);

        Ok(AcquiredJobPayload::WorkspaceBuild {
            workspace_build_id: build.id,
            workspace_name: workspace.name.clone(),
            state: build.provisioner_state,
            variable_values: variable_values(&variables),
            git_auth_providers,
            metadata: Metadata {
                access_url: self.access_url.clone(),
                workspace_transition: Some(build.transition),
                workspace_name: workspace.name,
                workspace_owner: owner.username,
                workspace_owner_email: owner.email,
                workspace_owner_oidc_access_token: oidc_access_token,
                workspace_id: Some(workspace.id),
                workspace_owner_id: Some(owner.id),
                template_name: template.name,
                template_version: version.name,
            },
        })
    }

    /// Tokens for every configured provider the user has a live link for.
    fn git_auth_tokens(
        &self,
        provider_ids: &[String],
        user_id: UserId,
    ) -> Result<Vec<GitAuthProvider>, ProvisionerError> {
        let registry = self.git_auth.load();
        let now = Utc::now();
        let mut providers = Vec::new();

        for id in provider_ids {
            let Some(config) = registry.get(id) else {
                warn!(provider = %id, "git auth provider is not configured; skipping");
                continue;
            };
            let link = match self.store.get_git_auth_link(id, user_id) {
                Ok(link) => link,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err.into()),
            };
            match config.access_token(&link, now) {
                Some(access_token) => providers.push(GitAuthProvider {
                    id: id.clone(),
                    access_token,
                }),
                None => debug!(provider = %id, user_id = %user_id, "git auth link expired"),
            }
        }

        Ok(providers)
    }

    fn fail_unhydrated(&self, job: &Job, worker_id: WorkerId, err: &ProvisionerError) {
        let completion = JobCompletion {
            job_id: job.id,
            worker_id,
            allow_recompletion: false,
            status: JobStatus::Failed,
            error: Some(err.to_string()),
            completed_at: Utc::now(),
        };
        if let Err(store_err) = self.store.finish_job(completion, Vec::new()) {
            error!(job_id = %job.id, error = %store_err, "failed to mark unhydrated job failed");
            return;
        }
        self.notify_job_logs(job.id, JobLogsNotifyMessage::end_of_logs());
    }
}

fn variable_values(variables: &[TemplateVersionVariable]) -> Vec<VariableValue> {
    variables
        .iter()
        .map(|v| VariableValue {
            name: v.name.clone(),
            value: v.value.clone(),
            sensitive: v.sensitive,
        })
        .collect()
}
