//! Provisioner jobs: kinds, lifecycle status and typed inputs.
//!
//! A job moves `Pending -> Running -> {Succeeded, Failed, Canceled}` and never
//! back. The store owns the claim transition; the engine owns the rest.

pub mod types;

pub use types::{
    FinishRejection, Job, JobKind, JobLog, JobStatus, LogLevel, LogSource, NewJobLog, ParameterValue,
    TemplateVersionDryRunJob, TemplateVersionImportJob, UserVariableValue, WorkspaceProvisionJob,
};
