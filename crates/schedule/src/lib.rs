//! Template scheduling: how long a started workspace may run.
//!
//! - `options`: per-template TTL settings
//! - `policy`: which options are in effect and which edits are allowed
//! - `deadline`: pure resolution of build deadlines from those options

pub mod deadline;
pub mod options;
pub mod policy;

pub use deadline::{BuildDeadlines, resolve_build_deadlines};
pub use options::TemplateScheduleOptions;
pub use policy::{
    CommunitySchedulePolicy, EntitledSchedulePolicy, Entitlement, ScheduleError,
    TemplateSchedulePolicy,
};
