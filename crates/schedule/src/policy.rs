//! Template schedule policy.
//!
//! The policy decides which stored options are in effect and whether an edit is
//! permitted. Advanced scheduling (`max_ttl`) is a licensed capability: the
//! decision is made here, by the policy, instead of by feature checks scattered
//! through callers. The engine holds the policy in a [`provd_core::SwapCell`] so
//! a license change can swap it without a restart.

use std::time::Duration;

use thiserror::Error;

use crate::options::TemplateScheduleOptions;

/// Why a schedule edit was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The deployment has no commercial edition at all.
    #[error("max TTL requires a commercial edition; this appears to be a community deployment")]
    RequiresCommercialEdition,

    /// The deployment is licensed, but not for this feature.
    #[error("license is not entitled to use {feature}")]
    NotEntitled { feature: &'static str },
}

pub const ADVANCED_TEMPLATE_SCHEDULING: &str = "advanced template scheduling";

pub trait TemplateSchedulePolicy: Send + Sync {
    /// Options in effect for a template given what is stored on it.
    fn get_options(&self, stored: &TemplateScheduleOptions) -> TemplateScheduleOptions;

    /// Decide whether `requested` may replace `current`.
    ///
    /// Returns the options to persist, or the reason the edit is denied.
    fn set_options(
        &self,
        current: &TemplateScheduleOptions,
        requested: TemplateScheduleOptions,
    ) -> Result<TemplateScheduleOptions, ScheduleError>;
}

/// Policy of an unlicensed deployment: `max_ttl` is never in effect and can
/// never be edited.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommunitySchedulePolicy;

impl TemplateSchedulePolicy for CommunitySchedulePolicy {
    fn get_options(&self, stored: &TemplateScheduleOptions) -> TemplateScheduleOptions {
        TemplateScheduleOptions {
            user_ttl_override_enabled: true,
            default_ttl: stored.default_ttl,
            max_ttl: Duration::ZERO,
        }
    }

    fn set_options(
        &self,
        current: &TemplateScheduleOptions,
        requested: TemplateScheduleOptions,
    ) -> Result<TemplateScheduleOptions, ScheduleError> {
        if !requested.max_ttl.is_zero() {
            return Err(ScheduleError::RequiresCommercialEdition);
        }
        Ok(TemplateScheduleOptions {
            user_ttl_override_enabled: current.user_ttl_override_enabled,
            default_ttl: requested.default_ttl,
            max_ttl: current.max_ttl,
        })
    }
}

/// License state for advanced scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entitlement {
    Entitled,
    NotEntitled,
}

/// Policy of a licensed deployment.
#[derive(Debug, Clone, Copy)]
pub struct EntitledSchedulePolicy {
    entitlement: Entitlement,
}

impl EntitledSchedulePolicy {
    pub fn new(entitlement: Entitlement) -> Self {
        Self { entitlement }
    }

    pub fn entitlement(&self) -> Entitlement {
        self.entitlement
    }
}

impl TemplateSchedulePolicy for EntitledSchedulePolicy {
    fn get_options(&self, stored: &TemplateScheduleOptions) -> TemplateScheduleOptions {
        match self.entitlement {
            Entitlement::Entitled => *stored,
            Entitlement::NotEntitled => CommunitySchedulePolicy.get_options(stored),
        }
    }

    fn set_options(
        &self,
        current: &TemplateScheduleOptions,
        requested: TemplateScheduleOptions,
    ) -> Result<TemplateScheduleOptions, ScheduleError> {
        match self.entitlement {
            Entitlement::Entitled => Ok(requested),
            Entitlement::NotEntitled if requested.max_ttl != current.max_ttl => {
                Err(ScheduleError::NotEntitled {
                    feature: ADVANCED_TEMPLATE_SCHEDULING,
                })
            }
            Entitlement::NotEntitled => Ok(TemplateScheduleOptions {
                user_ttl_override_enabled: current.user_ttl_override_enabled,
                ..requested
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn community_hides_max_ttl() {
        let stored = TemplateScheduleOptions::default()
            .with_default_ttl(HOUR)
            .with_max_ttl(2 * HOUR);

        let effective = CommunitySchedulePolicy.get_options(&stored);
        assert_eq!(effective.default_ttl, HOUR);
        assert!(effective.max_ttl.is_zero());
    }

    #[test]
    fn community_refuses_max_ttl_edit() {
        let current = TemplateScheduleOptions::default();
        let err = CommunitySchedulePolicy
            .set_options(&current, current.with_max_ttl(HOUR))
            .unwrap_err();
        assert_eq!(err, ScheduleError::RequiresCommercialEdition);
    }

    #[test]
    fn community_allows_default_ttl_edit() {
        let current = TemplateScheduleOptions::default();
        let applied = CommunitySchedulePolicy
            .set_options(&current, current.with_default_ttl(HOUR))
            .unwrap();
        assert_eq!(applied.default_ttl, HOUR);
    }

    #[test]
    fn unentitled_license_refuses_max_ttl_edit() {
        let policy = EntitledSchedulePolicy::new(Entitlement::NotEntitled);
        let current = TemplateScheduleOptions::default();

        let err = policy
            .set_options(&current, current.with_max_ttl(HOUR))
            .unwrap_err();
        assert!(err.to_string().contains("license is not entitled"));

        // Leaving max_ttl untouched is fine.
        assert!(policy
            .set_options(&current, current.with_default_ttl(HOUR))
            .is_ok());
    }

    #[test]
    fn entitled_license_applies_everything() {
        let policy = EntitledSchedulePolicy::new(Entitlement::Entitled);
        let requested = TemplateScheduleOptions::default()
            .with_max_ttl(HOUR)
            .with_user_ttl_override(false);

        let applied = policy
            .set_options(&TemplateScheduleOptions::default(), requested)
            .unwrap();
        assert_eq!(applied, requested);
        assert_eq!(policy.get_options(&applied), requested);
    }
}
