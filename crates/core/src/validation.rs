//! Validation of loosely-typed values supplied by provisioner daemons.
//!
//! These checks run before anything becomes durable state.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{DomainError, ValidationErrors};

/// Parse an agent auth token. Tokens are opaque to users but must be UUIDs.
pub fn parse_agent_token(raw: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(raw).map_err(|e| {
        DomainError::validation(
            "invalid auth token format; must be uuid",
            "token",
            e.to_string(),
        )
    })
}

/// Reject an app set that reuses a slug. Uniqueness is per agent only.
pub fn ensure_unique_slugs<'a, I>(agent: &str, slugs: I) -> Result<(), DomainError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for slug in slugs {
        if !seen.insert(slug) {
            return Err(DomainError::validation(
                "duplicate app slug, they must be unique per agent",
                format!("agent {agent:?}"),
                format!("slug {slug:?}"),
            ));
        }
    }
    Ok(())
}

/// A template variable declaration reduced to what resolution needs.
#[derive(Debug, Clone, Copy)]
pub struct VariableDecl<'a> {
    pub name: &'a str,
    pub default_value: &'a str,
    pub required: bool,
}

/// Resolve a declared variable: caller override, then declared default, then empty.
///
/// An override is "present" when the caller supplied a value with the same name,
/// even an empty one.
pub fn resolve_variable<'a, I>(decl: VariableDecl<'_>, overrides: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    overrides
        .into_iter()
        .find(|(name, _)| *name == decl.name)
        .map(|(_, value)| value.to_string())
        .unwrap_or_else(|| decl.default_value.to_string())
}

/// Collect every required variable that resolved to an empty value.
pub fn check_required<'a, I>(resolved: I) -> Result<(), ValidationErrors>
where
    I: IntoIterator<Item = (VariableDecl<'a>, &'a str)>,
{
    let mut errs = ValidationErrors::new("required template variables need values");
    for (decl, value) in resolved {
        if decl.required && value.is_empty() {
            errs.push(decl.name, "");
        }
    }
    errs.into_result()
}
