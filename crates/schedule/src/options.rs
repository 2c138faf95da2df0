use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Scheduling settings a template imposes on its workspaces.
///
/// A zero duration means "unset".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateScheduleOptions {
    /// Whether a workspace's own TTL may override the template default.
    pub user_ttl_override_enabled: bool,
    /// TTL applied to new workspaces that do not set one.
    pub default_ttl: Duration,
    /// Hard ceiling on how long a started workspace may run.
    pub max_ttl: Duration,
}

impl Default for TemplateScheduleOptions {
    fn default() -> Self {
        Self {
            user_ttl_override_enabled: true,
            default_ttl: Duration::ZERO,
            max_ttl: Duration::ZERO,
        }
    }
}

impl TemplateScheduleOptions {
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }

    pub fn with_user_ttl_override(mut self, enabled: bool) -> Self {
        self.user_ttl_override_enabled = enabled;
        self
    }
}
