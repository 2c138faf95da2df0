//! Git-auth provider registry.
//!
//! Providers are configured by id. A daemon only ever sees a provider's token
//! when the provider is configured here and the job owner has a live link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::GitAuthLink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitAuthConfig {
    pub id: String,
}

impl GitAuthConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The link's token, unless it has expired.
    pub fn access_token(&self, link: &GitAuthLink, now: DateTime<Utc>) -> Option<String> {
        match link.oauth_expiry {
            Some(expiry) if expiry <= now => None,
            _ => Some(link.oauth_access_token.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitAuthRegistry {
    configs: Vec<GitAuthConfig>,
}

impl GitAuthRegistry {
    pub fn new(configs: Vec<GitAuthConfig>) -> Self {
        Self { configs }
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ids.into_iter().map(GitAuthConfig::new).collect())
    }

    pub fn get(&self, id: &str) -> Option<&GitAuthConfig> {
        self.configs.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.configs.iter().map(|c| c.id.as_str())
    }

    /// Every id in `reported` with no configured provider, in order.
    pub fn missing<'a>(&self, reported: &'a [String]) -> Vec<&'a str> {
        reported
            .iter()
            .map(String::as_str)
            .filter(|id| !self.contains(id))
            .collect()
    }
}
