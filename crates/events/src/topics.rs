//! Topic names and notification payloads.

use serde::{Deserialize, Serialize};

use provd_core::{JobId, WorkspaceId};

/// Topic signalled whenever a workspace (or its latest build) changes.
pub fn workspace_notify_channel(workspace_id: WorkspaceId) -> String {
    format!("workspace:{workspace_id}")
}

/// Topic signalled whenever a job appends logs or reaches a terminal state.
pub fn job_logs_notify_channel(job_id: JobId) -> String {
    format!("provisioner-job-logs:{job_id}")
}

/// Payload published on [`job_logs_notify_channel`].
///
/// `created_after` lets a streaming reader fetch only the new rows;
/// `end_of_logs` tells it the job will not append anymore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLogsNotifyMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<i64>,
    #[serde(default)]
    pub end_of_logs: bool,
}

impl JobLogsNotifyMessage {
    pub fn created_after(id: i64) -> Self {
        Self {
            created_after: Some(id),
            end_of_logs: false,
        }
    }

    pub fn end_of_logs() -> Self {
        Self {
            created_after: None,
            end_of_logs: true,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing two plain fields cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
