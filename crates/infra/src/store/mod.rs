//! Durable state collaborator.
//!
//! The engine only talks to [`ProvisionerStore`]. The in-memory implementation
//! backs tests and single-process deployments; a relational implementation
//! needs the same atomic claim and transactional multi-row writes.

pub mod in_memory;
pub mod model;
pub mod r#trait;

pub use in_memory::InMemoryProvisionerStore;
pub use model::{
    AgentRecord, BuildCompletion, GitAuthLink, JobCompletion, LoginType, ResourceRecord, Template,
    TemplateVersion, TemplateVersionVariable, User, UserLink, Workspace, WorkspaceAgent,
    WorkspaceApp, WorkspaceBuild, WorkspaceResource,
};
pub use r#trait::{ProvisionerStore, StoreError};
