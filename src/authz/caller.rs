use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Pack-scoped feature flags carried with the caller's credential.
///
/// Unknown or missing flags coerce to `false` at the deserialization
/// boundary rather than being re-checked downstream.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct PackConfig {
    #[serde(default)]
    pub enable_project_linking: bool,
    #[serde(default)]
    pub require_project_linking: bool,
}

/// The acting identity for a request: a stable user id plus the pack-scoped
/// claims bag (granted permission keys and feature flags). Reconstructed per
/// request from a verified credential, never persisted.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Uuid,
    pub roles: HashSet<String>,
    pub granted: HashSet<String>,
    pub config: PackConfig,
}

impl Caller {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            roles: HashSet::new(),
            granted: HashSet::new(),
            config: PackConfig::default(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = String>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn with_granted(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        self.granted = keys.into_iter().collect();
        self
    }

    pub fn with_config(mut self, config: PackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_grant(&self, key: &str) -> bool {
        self.granted.contains(key)
    }
}
