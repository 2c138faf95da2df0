//! Audit sink for workspace-build outcomes.
//!
//! Exporting is fire-and-forget: a sink cannot fail the operation it records.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use provd_core::{JobId, UserId, WorkspaceBuildId, WorkspaceId, WorkspaceTransition};

use crate::jobs::JobStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub workspace_id: WorkspaceId,
    pub build_id: WorkspaceBuildId,
    pub job_id: JobId,
    pub initiator_id: UserId,
    pub transition: WorkspaceTransition,
    pub status: JobStatus,
    pub at: DateTime<Utc>,
}

pub trait AuditSink: Send + Sync {
    fn export(&self, event: AuditEvent);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditor;

impl AuditSink for NoopAuditor {
    fn export(&self, _event: AuditEvent) {}
}

/// Keeps events in memory, for tests.
#[derive(Debug, Default)]
pub struct InMemoryAuditor {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for InMemoryAuditor {
    fn export(&self, event: AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
