//! Provisioner job rows and their typed inputs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use provd_core::{JobId, TemplateVersionId, UserId, WorkerId, WorkspaceBuildId};

/// What a provisioner daemon is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Parse a template version and report its schema and resources.
    TemplateImport,
    /// Preview the resources a workspace would get.
    TemplateDryRun,
    /// Apply a start/stop/delete transition to a workspace.
    WorkspaceBuild,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [
        JobKind::TemplateImport,
        JobKind::TemplateDryRun,
        JobKind::WorkspaceBuild,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::TemplateImport => "template_import",
            JobKind::TemplateDryRun => "template_dry_run",
            JobKind::WorkspaceBuild => "workspace_build",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job execution status.
///
/// `Canceled` is a failure: a canceled job is terminal and never succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Canceled)
    }
}

/// A unit of work brokered between the control plane and a daemon.
///
/// `worker_id` is set exactly when a daemon has claimed the job. A job
/// canceled while still `Pending` goes terminal without ever having one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    /// User who caused the job to exist.
    pub initiator_id: UserId,
    /// Kind-specific input, decoded at acquire time.
    pub input: serde_json::Value,
    pub status: JobStatus,
    pub worker_id: Option<WorkerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    /// Failure reason, or a dependency problem recorded on a successful job.
    pub error: Option<String>,
}

impl Job {
    pub fn new(kind: JobKind, initiator_id: UserId, input: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            kind,
            initiator_id,
            input,
            status: JobStatus::Pending,
            worker_id: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            canceled_at: None,
            error: None,
        }
    }

    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self.updated_at = at;
        self
    }

    /// Claim for `worker_id`.
    pub fn mark_running(&mut self, worker_id: WorkerId, now: DateTime<Utc>) {
        self.status = JobStatus::Running;
        self.worker_id = Some(worker_id);
        self.started_at = Some(now);
        self.updated_at = now;
    }

    /// Move to a terminal status. Re-completing overwrites the recorded error.
    pub fn mark_completed(&mut self, status: JobStatus, error: Option<String>, now: DateTime<Utc>) {
        self.status = status;
        self.error = error;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Flag for cancellation. Pending jobs have no worker to tell, so they end here.
    pub fn mark_canceled(&mut self, now: DateTime<Utc>) {
        self.canceled_at = Some(now);
        self.updated_at = now;
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Canceled;
            self.completed_at = Some(now);
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    /// Whether `worker_id` may move this job to a terminal status.
    ///
    /// Terminal jobs are refused, except that a succeeded job carrying a
    /// recorded error may be completed again when `allow_recompletion` is set.
    pub fn check_finishable(
        &self,
        worker_id: WorkerId,
        allow_recompletion: bool,
    ) -> Result<(), FinishRejection> {
        if self.status.is_terminal() {
            let recompletable =
                allow_recompletion && self.status == JobStatus::Succeeded && self.error.is_some();
            if !recompletable {
                return Err(FinishRejection::AlreadyCompleted);
            }
        } else if self.status != JobStatus::Running {
            return Err(FinishRejection::NotRunning);
        }
        if self.worker_id != Some(worker_id) {
            return Err(FinishRejection::NotOwner);
        }
        Ok(())
    }
}

/// Why a job could not be finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FinishRejection {
    #[error("job isn't running yet")]
    NotRunning,
    #[error("job already completed")]
    AlreadyCompleted,
    #[error("you don't own this job")]
    NotOwner,
}

/// A `name = value` pair supplied by a user for a template variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVariableValue {
    pub name: String,
    pub value: String,
}

/// A rich parameter value chosen for a workspace or preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub name: String,
    pub value: String,
}

/// Input of a [`JobKind::TemplateImport`] job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVersionImportJob {
    #[serde(default)]
    pub template_version_id: Option<TemplateVersionId>,
    #[serde(default)]
    pub user_variable_values: Vec<UserVariableValue>,
}

/// Input of a [`JobKind::TemplateDryRun`] job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVersionDryRunJob {
    #[serde(default)]
    pub template_version_id: Option<TemplateVersionId>,
    #[serde(default)]
    pub workspace_name: String,
    #[serde(default)]
    pub parameter_values: Vec<ParameterValue>,
}

/// Input of a [`JobKind::WorkspaceBuild`] job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceProvisionJob {
    pub workspace_build_id: WorkspaceBuildId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    ProvisionerDaemon,
    Provisioner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// A persisted log line. Ids increase in append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLog {
    pub id: i64,
    pub job_id: JobId,
    pub created_at: DateTime<Utc>,
    pub source: LogSource,
    pub level: LogLevel,
    pub stage: String,
    pub output: String,
}

/// A log line before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJobLog {
    pub created_at: DateTime<Utc>,
    pub source: LogSource,
    pub level: LogLevel,
    pub stage: String,
    pub output: String,
}
