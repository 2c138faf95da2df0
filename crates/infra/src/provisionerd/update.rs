use chrono::Utc;
use tracing::debug;

use provd_core::WorkerId;
use provd_core::validation::{VariableDecl, check_required, resolve_variable};
use provd_events::{JobLogsNotifyMessage, Pubsub};

use crate::jobs::{JobStatus, NewJobLog};
use crate::store::{ProvisionerStore, TemplateVersionVariable};

use super::proto::{TemplateVariable, UpdateJobRequest, UpdateJobResponse, VariableValue};
use super::{ProvisionerError, Server, ensure_owner};

impl<S, P> Server<S, P>
where
    S: ProvisionerStore,
    P: Pubsub,
{
    /// Record progress on a running job.
    ///
    /// Logs, readme and template variables are each optional. Variables are
    /// persisted even when a required one resolves to empty; the call then
    /// fails with a validation error naming every such variable.
    pub fn update_job(
        &self,
        worker_id: WorkerId,
        request: UpdateJobRequest,
    ) -> Result<UpdateJobResponse, ProvisionerError> {
        let job = self.load_job(&request.job_id)?;
        match job.status {
            JobStatus::Running => {}
            JobStatus::Pending => {
                return Err(ProvisionerError::InvalidState(ProvisionerError::JOB_NOT_RUNNING));
            }
            _ => {
                return Err(ProvisionerError::InvalidState(
                    ProvisionerError::JOB_ALREADY_COMPLETED,
                ));
            }
        }
        ensure_owner(&job, worker_id)?;

        let now = Utc::now();
        self.store.touch_job(job.id, now)?;

        if !request.logs.is_empty() {
            let logs = request
                .logs
                .into_iter()
                .map(|entry| NewJobLog {
                    created_at: entry.created_at.unwrap_or(now),
                    source: entry.source,
                    level: entry.level,
                    stage: entry.stage,
                    output: entry.output,
                })
                .collect();
            let inserted = self.store.insert_job_logs(job.id, logs)?;
            if let Some(first) = inserted.first() {
                debug!(job_id = %job.id, count = inserted.len(), "inserted job logs");
                self.notify_job_logs(job.id, JobLogsNotifyMessage::created_after(first.id - 1));
            }
        }

        if !request.readme.is_empty() {
            let version = self.store.get_template_version_by_job_id(job.id)?;
            self.store
                .update_template_version_readme(version.id, request.readme)?;
        }

        let mut variable_values = Vec::new();
        if !request.template_variables.is_empty() {
            let version = self.store.get_template_version_by_job_id(job.id)?;
            let overrides: Vec<(&str, &str)> = request
                .user_variable_values
                .iter()
                .map(|v| (v.name.as_str(), v.value.as_str()))
                .collect();

            let mut resolved = Vec::with_capacity(request.template_variables.len());
            for variable in &request.template_variables {
                let value = resolve_variable(decl(variable), overrides.iter().copied());
                self.store
                    .upsert_template_version_variable(TemplateVersionVariable {
                        template_version_id: version.id,
                        name: variable.name.clone(),
                        description: variable.description.clone(),
                        var_type: variable.var_type.clone(),
                        default_value: variable.default_value.clone(),
                        required: variable.required,
                        sensitive: variable.sensitive,
                        value: value.clone(),
                    })?;
                variable_values.push(VariableValue {
                    name: variable.name.clone(),
                    value: value.clone(),
                    sensitive: variable.sensitive,
                });
                resolved.push((variable, value));
            }

            check_required(
                resolved
                    .iter()
                    .map(|(variable, value)| (decl(variable), value.as_str())),
            )?;
        }

        Ok(UpdateJobResponse {
            canceled: job.is_canceled(),
            variable_values,
        })
    }
}

fn decl(variable: &TemplateVariable) -> VariableDecl<'_> {
    VariableDecl {
        name: &variable.name,
        default_value: &variable.default_value,
        required: variable.required,
    }
}
