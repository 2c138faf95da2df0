//! `provd-core`: shared building blocks for the provisioner control plane.
//!
//! This crate contains **pure** primitives (no IO): identifiers, the workspace
//! transition kind, the domain error model, validation helpers shared by the
//! lifecycle engine and the resource ingester, and a hot-swappable reference
//! cell for injected policies.

pub mod error;
pub mod id;
pub mod swap;
pub mod transition;
pub mod validation;

pub use error::{DomainError, DomainResult, ValidationErrors, ValidationIssue};
pub use id::{
    AgentId, AppId, JobId, ResourceId, TemplateId, TemplateVersionId, UserId, WorkerId,
    WorkspaceBuildId, WorkspaceId,
};
pub use swap::SwapCell;
pub use transition::WorkspaceTransition;
