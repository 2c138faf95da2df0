use std::time::Duration;

use serde::{Deserialize, Serialize};

use provd_infra::jobs::{JobKind, UserVariableValue};
use provd_infra::provisionerd::proto::{
    AcquiredJob, CompletedJob, CompletedJobResult, FailedJob, FailedJobResult, LogEntry,
    TemplateVariable, UpdateJobRequest,
};
use provd_schedule::TemplateScheduleOptions;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct AcquireJobRequest {
    /// Kinds the daemon can run. Omitted means all of them.
    #[serde(default)]
    pub supported_kinds: Option<Vec<JobKind>>,
}

impl AcquireJobRequest {
    pub fn supported_kinds(&self) -> &[JobKind] {
        self.supported_kinds.as_deref().unwrap_or(&JobKind::ALL)
    }
}

/// Body of `POST /provisionerd/jobs/:id/update`; the job id comes from the path.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateJobBody {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub readme: String,
    #[serde(default)]
    pub template_variables: Vec<TemplateVariable>,
    #[serde(default)]
    pub user_variable_values: Vec<UserVariableValue>,
}

impl UpdateJobBody {
    pub fn into_request(self, job_id: String) -> UpdateJobRequest {
        UpdateJobRequest {
            job_id,
            logs: self.logs,
            readme: self.readme,
            template_variables: self.template_variables,
            user_variable_values: self.user_variable_values,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FailJobBody {
    pub error: String,
    #[serde(default)]
    pub result: Option<FailedJobResult>,
}

impl FailJobBody {
    pub fn into_request(self, job_id: String) -> FailedJob {
        FailedJob {
            job_id,
            error: self.error,
            result: self.result,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteJobBody {
    pub result: CompletedJobResult,
}

impl CompleteJobBody {
    pub fn into_request(self, job_id: String) -> CompletedJob {
        CompletedJob {
            job_id,
            result: self.result,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AcquireJobResponse {
    /// `null` when there is nothing to do.
    pub job: Option<AcquiredJob>,
}

/// Template schedule with durations in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateScheduleDto {
    #[serde(default = "default_true")]
    pub user_ttl_override_enabled: bool,
    #[serde(default)]
    pub default_ttl_secs: u64,
    #[serde(default)]
    pub max_ttl_secs: u64,
}

fn default_true() -> bool {
    true
}

impl From<TemplateScheduleOptions> for TemplateScheduleDto {
    fn from(opts: TemplateScheduleOptions) -> Self {
        Self {
            user_ttl_override_enabled: opts.user_ttl_override_enabled,
            default_ttl_secs: opts.default_ttl.as_secs(),
            max_ttl_secs: opts.max_ttl.as_secs(),
        }
    }
}

impl From<TemplateScheduleDto> for TemplateScheduleOptions {
    fn from(dto: TemplateScheduleDto) -> Self {
        TemplateScheduleOptions {
            user_ttl_override_enabled: dto.user_ttl_override_enabled,
            default_ttl: Duration::from_secs(dto.default_ttl_secs),
            max_ttl: Duration::from_secs(dto.max_ttl_secs),
        }
    }
}
