//! Build deadline resolution.
//!
//! Precedence, first match wins:
//!
//! 1. Not a start transition: no deadlines.
//! 2. `max_ttl` set: `max_deadline = now + max_ttl`, and the deadline is the
//!    workspace TTL (or template default, or `max_ttl`) capped at `max_ttl`.
//! 3. Workspace TTL set: `deadline = now + ttl`, no max deadline.
//! 4. Otherwise no deadlines. The template default alone never starts a clock.
//!
//! When the template disables user overrides, the template default stands in
//! for the workspace TTL before the rules run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use provd_core::WorkspaceTransition;

use crate::options::TemplateScheduleOptions;

/// Computed expiry timestamps for a workspace build. `None` means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDeadlines {
    pub deadline: Option<DateTime<Utc>>,
    pub max_deadline: Option<DateTime<Utc>>,
}

impl BuildDeadlines {
    pub fn none() -> Self {
        Self::default()
    }
}

pub fn resolve_build_deadlines(
    now: DateTime<Utc>,
    options: &TemplateScheduleOptions,
    workspace_ttl: Option<Duration>,
    transition: WorkspaceTransition,
) -> BuildDeadlines {
    if transition != WorkspaceTransition::Start {
        return BuildDeadlines::none();
    }

    let workspace_ttl = if options.user_ttl_override_enabled {
        non_zero(workspace_ttl)
    } else {
        non_zero(Some(options.default_ttl))
    };

    if !options.max_ttl.is_zero() {
        let effective = workspace_ttl
            .or(non_zero(Some(options.default_ttl)))
            .unwrap_or(options.max_ttl);
        return BuildDeadlines {
            deadline: after(now, effective.min(options.max_ttl)),
            max_deadline: after(now, options.max_ttl),
        };
    }

    match workspace_ttl {
        Some(ttl) => BuildDeadlines {
            deadline: after(now, ttl),
            max_deadline: None,
        },
        None => BuildDeadlines::none(),
    }
}

fn non_zero(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|d| !d.is_zero())
}

fn after(now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn opts(default_ttl: Duration, max_ttl: Duration) -> TemplateScheduleOptions {
        TemplateScheduleOptions::default()
            .with_default_ttl(default_ttl)
            .with_max_ttl(max_ttl)
    }

    fn ttl(d: Duration) -> Option<Duration> {
        if d.is_zero() { None } else { Some(d) }
    }

    /// (default_ttl, max_ttl, workspace_ttl, transition) -> (deadline, max_deadline) offsets.
    fn check(
        default_ttl: Duration,
        max_ttl: Duration,
        workspace_ttl: Duration,
        transition: WorkspaceTransition,
        expected_deadline: Duration,
        expected_max: Duration,
    ) {
        let now = Utc::now();
        let got = resolve_build_deadlines(
            now,
            &opts(default_ttl, max_ttl),
            ttl(workspace_ttl),
            transition,
        );
        assert_eq!(got.deadline, ttl(expected_deadline).and_then(|d| after(now, d)));
        assert_eq!(got.max_deadline, ttl(expected_max).and_then(|d| after(now, d)));
    }

    #[test]
    fn nothing_set() {
        let z = Duration::ZERO;
        check(z, z, z, WorkspaceTransition::Start, z, z);
    }

    #[test]
    fn delete_never_has_deadlines() {
        check(HOUR, 2 * HOUR, 3 * HOUR, WorkspaceTransition::Delete, Duration::ZERO, Duration::ZERO);
    }

    #[test]
    fn workspace_ttl_alone() {
        let z = Duration::ZERO;
        check(z, z, HOUR, WorkspaceTransition::Start, HOUR, z);
    }

    #[test]
    fn template_default_alone_is_ignored() {
        let z = Duration::ZERO;
        check(HOUR, z, z, WorkspaceTransition::Start, z, z);
    }

    #[test]
    fn workspace_ttl_overrides_template_default() {
        check(2 * HOUR, Duration::ZERO, HOUR, WorkspaceTransition::Start, HOUR, Duration::ZERO);
    }

    #[test]
    fn max_ttl_alone() {
        let z = Duration::ZERO;
        check(z, HOUR, z, WorkspaceTransition::Start, HOUR, HOUR);
    }

    #[test]
    fn max_ttl_caps_workspace_ttl() {
        check(Duration::ZERO, 2 * HOUR, 3 * HOUR, WorkspaceTransition::Start, 2 * HOUR, 2 * HOUR);
    }

    #[test]
    fn max_ttl_caps_template_default() {
        check(3 * HOUR, 2 * HOUR, Duration::ZERO, WorkspaceTransition::Start, 2 * HOUR, 2 * HOUR);
    }

    #[test]
    fn shorter_template_default_under_max_ttl() {
        check(HOUR, 2 * HOUR, Duration::ZERO, WorkspaceTransition::Start, HOUR, 2 * HOUR);
    }

    #[test]
    fn disabled_override_substitutes_template_default() {
        let now = Utc::now();
        let options = opts(HOUR, Duration::ZERO).with_user_ttl_override(false);
        let got = resolve_build_deadlines(now, &options, Some(5 * HOUR), WorkspaceTransition::Start);
        assert_eq!(got.deadline, after(now, HOUR));
        assert_eq!(got.max_deadline, None);
    }

    proptest! {
        #[test]
        fn max_deadline_never_precedes_deadline(
            default_secs in 0u64..1_000_000,
            max_secs in 0u64..1_000_000,
            workspace_secs in 0u64..1_000_000,
            override_enabled in any::<bool>(),
        ) {
            let now = Utc::now();
            let options = opts(Duration::from_secs(default_secs), Duration::from_secs(max_secs))
                .with_user_ttl_override(override_enabled);
            let got = resolve_build_deadlines(
                now,
                &options,
                ttl(Duration::from_secs(workspace_secs)),
                WorkspaceTransition::Start,
            );

            if let Some(max) = got.max_deadline {
                let deadline = got.deadline.expect("max deadline implies a deadline");
                prop_assert!(max >= deadline);
            }
        }

        #[test]
        fn only_start_builds_get_deadlines(
            default_secs in 0u64..1_000_000,
            max_secs in 0u64..1_000_000,
            workspace_secs in 0u64..1_000_000,
            stop in any::<bool>(),
        ) {
            let transition = if stop { WorkspaceTransition::Stop } else { WorkspaceTransition::Delete };
            let got = resolve_build_deadlines(
                Utc::now(),
                &opts(Duration::from_secs(default_secs), Duration::from_secs(max_secs)),
                ttl(Duration::from_secs(workspace_secs)),
                transition,
            );
            prop_assert_eq!(got, BuildDeadlines::none());
        }
    }
}
