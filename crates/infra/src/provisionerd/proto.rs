//! Request and response shapes of the provisioner RPCs.
//!
//! Job ids arrive as strings: parsing them is part of each call's contract.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use provd_core::{JobId, UserId, WorkspaceBuildId, WorkspaceId, WorkspaceTransition};

use crate::jobs::{JobKind, LogLevel, LogSource, ParameterValue, UserVariableValue};

/// A claimed job, hydrated for the daemon that claimed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquiredJob {
    pub job_id: JobId,
    pub created_at: DateTime<Utc>,
    pub initiator_username: String,
    pub payload: AcquiredJobPayload,
}

impl AcquiredJob {
    pub fn kind(&self) -> JobKind {
        match self.payload {
            AcquiredJobPayload::TemplateImport { .. } => JobKind::TemplateImport,
            AcquiredJobPayload::TemplateDryRun { .. } => JobKind::TemplateDryRun,
            AcquiredJobPayload::WorkspaceBuild { .. } => JobKind::WorkspaceBuild,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AcquiredJobPayload {
    TemplateImport {
        user_variable_values: Vec<VariableValue>,
        git_auth_providers: Vec<GitAuthProvider>,
        metadata: Metadata,
    },
    TemplateDryRun {
        workspace_name: String,
        parameter_values: Vec<ParameterValue>,
        variable_values: Vec<VariableValue>,
        metadata: Metadata,
    },
    WorkspaceBuild {
        workspace_build_id: WorkspaceBuildId,
        workspace_name: String,
        /// Provisioner state of the build, handed back to the daemon.
        state: Vec<u8>,
        variable_values: Vec<VariableValue>,
        git_auth_providers: Vec<GitAuthProvider>,
        metadata: Metadata,
    },
}

/// Context a daemon exposes to the template it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub access_url: String,
    pub workspace_transition: Option<WorkspaceTransition>,
    pub workspace_name: String,
    pub workspace_owner: String,
    pub workspace_owner_email: String,
    pub workspace_owner_oidc_access_token: String,
    pub workspace_id: Option<WorkspaceId>,
    pub workspace_owner_id: Option<UserId>,
    pub template_name: String,
    pub template_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableValue {
    pub name: String,
    pub value: String,
    pub sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitAuthProvider {
    pub id: String,
    pub access_token: String,
}

/// A variable declaration discovered while parsing a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVariable {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub var_type: String,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub source: LogSource,
    pub level: LogLevel,
    /// Defaults to the time the control plane receives the line.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stage: String,
    pub output: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateJobRequest {
    pub job_id: String,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub readme: String,
    #[serde(default)]
    pub template_variables: Vec<TemplateVariable>,
    #[serde(default)]
    pub user_variable_values: Vec<UserVariableValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateJobResponse {
    /// The job has been flagged for cancellation; the daemon should stop.
    pub canceled: bool,
    pub variable_values: Vec<VariableValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedJob {
    pub job_id: String,
    pub error: String,
    #[serde(default)]
    pub result: Option<FailedJobResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailedJobResult {
    TemplateImport,
    TemplateDryRun,
    WorkspaceBuild { state: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedJob {
    pub job_id: String,
    pub result: CompletedJobResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletedJobResult {
    TemplateImport {
        #[serde(default)]
        start_resources: Vec<Resource>,
        #[serde(default)]
        stop_resources: Vec<Resource>,
        #[serde(default)]
        git_auth_providers: Vec<String>,
    },
    TemplateDryRun {
        #[serde(default)]
        resources: Vec<Resource>,
    },
    WorkspaceBuild {
        #[serde(default)]
        state: Vec<u8>,
        #[serde(default)]
        resources: Vec<Resource>,
    },
}

impl CompletedJobResult {
    pub fn kind(&self) -> JobKind {
        match self {
            CompletedJobResult::TemplateImport { .. } => JobKind::TemplateImport,
            CompletedJobResult::TemplateDryRun { .. } => JobKind::TemplateDryRun,
            CompletedJobResult::WorkspaceBuild { .. } => JobKind::WorkspaceBuild,
        }
    }
}

/// A resource declared by a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub daily_cost: i32,
    #[serde(default)]
    pub agents: Vec<Agent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    #[serde(default)]
    pub operating_system: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub startup_script: Option<String>,
    #[serde(default)]
    pub shutdown_script: Option<String>,
    #[serde(default)]
    pub auth: Option<AgentAuth>,
    #[serde(default)]
    pub apps: Vec<App>,
}

/// How an agent proves its identity when it connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAuth {
    /// Must be a UUID.
    Token(String),
    /// Cloud instance identity.
    InstanceId(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub slug: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub subdomain: bool,
}
