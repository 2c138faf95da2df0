//! Workspace build transitions.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The state change a workspace build applies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceTransition {
    Start,
    Stop,
    Delete,
}

impl WorkspaceTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceTransition::Start => "start",
            WorkspaceTransition::Stop => "stop",
            WorkspaceTransition::Delete => "delete",
        }
    }
}

impl core::fmt::Display for WorkspaceTransition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspaceTransition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "delete" => Ok(Self::Delete),
            other => Err(DomainError::validation(
                "invalid workspace transition",
                "transition",
                format!("{other:?} is not one of: start, stop, delete"),
            )),
        }
    }
}
