use chrono::{DateTime, Utc};
use tracing::{info, warn};

use provd_core::{JobId, WorkerId, WorkspaceTransition};
use provd_events::{JobLogsNotifyMessage, Pubsub};
use provd_schedule::resolve_build_deadlines;

use crate::audit::AuditEvent;
use crate::jobs::{Job, JobKind, JobStatus, WorkspaceProvisionJob};
use crate::store::{BuildCompletion, JobCompletion, ProvisionerStore, WorkspaceBuild};

use super::proto::{CompletedJob, CompletedJobResult, FailedJob, FailedJobResult, Resource};
use super::resources::plan_resources;
use super::{ProvisionerError, Server, decode_input};

impl<S, P> Server<S, P>
where
    S: ProvisionerStore,
    P: Pubsub,
{
    /// Mark a running job failed.
    ///
    /// A workspace build keeps the provisioner state the daemon carried back,
    /// and its workspace observers are told about the failure. A job flagged
    /// for cancellation ends `Canceled` instead of `Failed`.
    pub fn fail_job(&self, worker_id: WorkerId, request: FailedJob) -> Result<(), ProvisionerError> {
        let job = self.load_job(&request.job_id)?;
        job.check_finishable(worker_id, false)?;

        let now = Utc::now();
        let completion = JobCompletion {
            job_id: job.id,
            worker_id,
            allow_recompletion: false,
            status: JobStatus::Failed,
            error: Some(request.error),
            completed_at: now,
        };

        let finished = match job.kind {
            JobKind::WorkspaceBuild => {
                let build = self.job_build(&job)?;
                let state = match request.result {
                    Some(FailedJobResult::WorkspaceBuild { state }) => state,
                    _ => build.provisioner_state.clone(),
                };
                let finished = self.store.finish_workspace_build(BuildCompletion {
                    build_id: build.id,
                    provisioner_state: state,
                    deadlines: None,
                    mark_workspace_deleted: false,
                    resources: Vec::new(),
                    job: completion,
                })?;
                self.audit_build(&finished, &build, now);
                self.notify_workspace(build.workspace_id);
                finished
            }
            JobKind::TemplateImport | JobKind::TemplateDryRun => {
                self.store.finish_job(completion, Vec::new())?
            }
        };

        self.notify_job_logs(job.id, JobLogsNotifyMessage::end_of_logs());
        info!(job_id = %job.id, kind = %job.kind, status = ?finished.status, "job failed");
        Ok(())
    }

    /// Mark a running job succeeded and persist what it produced.
    ///
    /// The result must match the job's kind. For template imports, reported
    /// git-auth providers missing from configuration are recorded on the job
    /// without failing the call; completing again once they are configured
    /// clears the record.
    pub fn complete_job(
        &self,
        worker_id: WorkerId,
        request: CompletedJob,
    ) -> Result<(), ProvisionerError> {
        let job = self.load_job(&request.job_id)?;
        job.check_finishable(worker_id, true)?;

        if request.result.kind() != job.kind {
            return Err(ProvisionerError::MalformedInput(format!(
                "{} result does not match {} job",
                request.result.kind(),
                job.kind
            )));
        }

        let now = Utc::now();
        match request.result {
            CompletedJobResult::TemplateImport {
                start_resources,
                stop_resources,
                git_auth_providers,
            } => self.complete_import(
                &job,
                worker_id,
                &start_resources,
                &stop_resources,
                git_auth_providers,
                now,
            )?,
            CompletedJobResult::TemplateDryRun { resources } => {
                let records = plan_resources(job.id, WorkspaceTransition::Start, &resources, now)?;
                self.store
                    .finish_job(succeeded(job.id, worker_id, None, now), records)?;
            }
            CompletedJobResult::WorkspaceBuild { state, resources } => {
                self.complete_build(&job, worker_id, state, &resources, now)?;
            }
        }

        self.notify_job_logs(job.id, JobLogsNotifyMessage::end_of_logs());
        info!(job_id = %job.id, kind = %job.kind, "job completed");
        Ok(())
    }

    /// Flag a job for cancellation. A pending job ends immediately; a running
    /// one learns about it on its next update.
    pub fn cancel_job(&self, job_id: JobId) -> Result<Job, ProvisionerError> {
        let job = self.store.cancel_job(job_id, Utc::now())?;
        if job.status == JobStatus::Canceled {
            self.notify_job_logs(job.id, JobLogsNotifyMessage::end_of_logs());
        }
        info!(job_id = %job.id, status = ?job.status, "job canceled");
        Ok(job)
    }

    fn complete_import(
        &self,
        job: &Job,
        worker_id: WorkerId,
        start_resources: &[Resource],
        stop_resources: &[Resource],
        git_auth_providers: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ProvisionerError> {
        let mut records = plan_resources(job.id, WorkspaceTransition::Start, start_resources, now)?;
        records.extend(plan_resources(
            job.id,
            WorkspaceTransition::Stop,
            stop_resources,
            now,
        )?);

        let registry = self.git_auth.load();
        let missing = registry.missing(&git_auth_providers);
        let recorded = if missing.is_empty() {
            None
        } else {
            let message = missing
                .iter()
                .map(|id| format!("git auth provider {id:?} is not configured"))
                .collect::<Vec<_>>()
                .join("; ");
            warn!(job_id = %job.id, error = %message, "template import references unconfigured git auth providers");
            Some(message)
        };

        self.store.finish_template_import(
            succeeded(job.id, worker_id, recorded, now),
            git_auth_providers,
            records,
        )?;
        Ok(())
    }

    fn complete_build(
        &self,
        job: &Job,
        worker_id: WorkerId,
        state: Vec<u8>,
        resources: &[Resource],
        now: DateTime<Utc>,
    ) -> Result<(), ProvisionerError> {
        let build = self.job_build(job)?;
        let workspace = self.store.get_workspace(build.workspace_id)?;
        let template = self.store.get_template(workspace.template_id)?;

        let options = self.schedule_policy.load().get_options(&template.schedule);
        let deadlines = resolve_build_deadlines(now, &options, workspace.ttl, build.transition);
        let records = plan_resources(job.id, build.transition, resources, now)?;

        let finished = self.store.finish_workspace_build(BuildCompletion {
            build_id: build.id,
            provisioner_state: state,
            deadlines: Some(deadlines),
            mark_workspace_deleted: build.transition == WorkspaceTransition::Delete,
            resources: records,
            job: succeeded(job.id, worker_id, None, now),
        })?;

        self.audit_build(&finished, &build, now);
        self.notify_workspace(workspace.id);
        Ok(())
    }

    fn job_build(&self, job: &Job) -> Result<WorkspaceBuild, ProvisionerError> {
        let input: WorkspaceProvisionJob = decode_input(job)?;
        Ok(self.store.get_workspace_build(input.workspace_build_id)?)
    }

    fn audit_build(&self, job: &Job, build: &WorkspaceBuild, at: DateTime<Utc>) {
        self.auditor.load().export(AuditEvent {
            workspace_id: build.workspace_id,
            build_id: build.id,
            job_id: job.id,
            initiator_id: build.initiator_id,
            transition: build.transition,
            status: job.status,
            at,
        });
    }
}

/// A success by `worker_id`. Re-completing a succeeded job is allowed; the
/// store still refuses one without a recorded error.
fn succeeded(
    job_id: JobId,
    worker_id: WorkerId,
    error: Option<String>,
    now: DateTime<Utc>,
) -> JobCompletion {
    JobCompletion {
        job_id,
        worker_id,
        allow_recompletion: true,
        status: JobStatus::Succeeded,
        error,
        completed_at: now,
    }
}
