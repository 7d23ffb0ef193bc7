//! Project linking policy
//!
//! Plans and expenses may optionally be associated with one external
//! project. Whether that association is available, and whether it is
//! mandatory, comes from the caller's pack configuration. The store half
//! of this module persists the links; the policy half decides what a
//! create/update payload is allowed to do to them.

pub mod store;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::authz::PackConfig;
use crate::errors::AppError;

pub use store::LinkTarget;

/// Derived linking policy. `required` can never hold without `enabled`,
/// even if the raw flags disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkingPolicy {
    pub enabled: bool,
    pub required: bool,
}

impl LinkingPolicy {
    pub fn from_config(config: &PackConfig) -> Self {
        let enabled = config.enable_project_linking;
        Self {
            enabled,
            required: enabled && config.require_project_linking,
        }
    }
}

/// What a create/update payload does to an entity's project link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    /// Field absent from the payload: leave the link untouched.
    Keep,
    /// Explicit null or empty string: remove the link.
    Clear,
    /// Replace the link with the given project.
    Set(Uuid),
}

/// Validate a `project_id` payload field against the linking policy.
///
/// `field` is tri-state: `None` means the field was absent, `Some(None)`
/// an explicit null. `creating` tightens the absent case: a create without
/// a project id violates a `required` policy, while an update merely
/// leaves the existing link alone.
pub fn resolve_link_change(
    policy: LinkingPolicy,
    field: Option<Option<String>>,
    creating: bool,
) -> Result<LinkChange, AppError> {
    let raw = match field {
        None => {
            if creating && policy.required {
                return Err(AppError::validation("project_id is required"));
            }
            return Ok(LinkChange::Keep);
        }
        Some(raw) => raw.filter(|value| !value.trim().is_empty()),
    };

    match raw {
        None => {
            if policy.required {
                return Err(AppError::validation(
                    "project link is required and cannot be cleared",
                ));
            }
            Ok(LinkChange::Clear)
        }
        Some(value) => {
            if !policy.enabled {
                return Err(AppError::validation("project linking is not enabled"));
            }
            let project_id = Uuid::parse_str(&value)
                .map_err(|_| AppError::validation("project_id must be a valid UUID"))?;
            Ok(LinkChange::Set(project_id))
        }
    }
}

/// Deserializer for tri-state patch fields: distinguishes an absent field
/// (use with `#[serde(default)]`) from an explicit `null`.
pub fn patch_field<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
