use thiserror::Error;

use provd_core::{DomainError, ValidationErrors};
use provd_schedule::ScheduleError;

use crate::jobs::FinishRejection;
use crate::store::StoreError;

/// Why a provisioner RPC failed.
///
/// A git-auth provider missing from configuration is not represented here: it
/// is recorded on the job and the RPC succeeds.
#[derive(Debug, Error)]
pub enum ProvisionerError {
    /// An identifier or payload could not be understood.
    #[error("{0}")]
    MalformedInput(String),

    /// A referenced row does not exist. The store's message is kept verbatim.
    #[error("{0}")]
    NotFound(String),

    /// The job is not in a state that allows the call.
    #[error("{0}")]
    InvalidState(&'static str),

    /// The caller does not own the job.
    #[error("{0}")]
    PermissionDenied(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The schedule policy refused an edit.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Store(StoreError),
}

impl ProvisionerError {
    pub const JOB_NOT_RUNNING: &'static str = "job isn't running yet";
    pub const JOB_ALREADY_COMPLETED: &'static str = "job already completed";
    pub const NOT_JOB_OWNER: &'static str = "you don't own this job";
}

impl From<StoreError> for ProvisionerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Rejected(rejection) => rejection.into(),
            other => Self::Store(other),
        }
    }
}

impl From<FinishRejection> for ProvisionerError {
    fn from(rejection: FinishRejection) -> Self {
        match rejection {
            FinishRejection::NotRunning => Self::InvalidState(Self::JOB_NOT_RUNNING),
            FinishRejection::AlreadyCompleted => Self::InvalidState(Self::JOB_ALREADY_COMPLETED),
            FinishRejection::NotOwner => Self::PermissionDenied(Self::NOT_JOB_OWNER),
        }
    }
}

impl From<DomainError> for ProvisionerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidId(msg) => Self::MalformedInput(msg),
            DomainError::Validation(errs) => Self::Validation(errs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_keeps_its_message() {
        let err: ProvisionerError = StoreError::not_found("user", "abc").into();
        assert!(matches!(err, ProvisionerError::NotFound(_)));
        assert_eq!(err.to_string(), "user abc: no rows in result set");
    }

    #[test]
    fn store_rejections_keep_engine_messages() {
        let err: ProvisionerError = StoreError::Rejected(FinishRejection::NotOwner).into();
        assert!(matches!(err, ProvisionerError::PermissionDenied(_)));
        assert_eq!(err.to_string(), ProvisionerError::NOT_JOB_OWNER);

        let err: ProvisionerError = StoreError::Rejected(FinishRejection::AlreadyCompleted).into();
        assert!(matches!(err, ProvisionerError::InvalidState(_)));
        assert_eq!(err.to_string(), FinishRejection::AlreadyCompleted.to_string());
    }

    #[test]
    fn invalid_ids_are_malformed_input() {
        let err: ProvisionerError = DomainError::invalid_id("JobId: invalid UUID \"x\"").into();
        assert!(matches!(err, ProvisionerError::MalformedInput(_)));
    }
}
