//! Authorization module - scope resolution for the marketing pack
//!
//! Access to marketing records is governed by string permission keys of the
//! form `marketing.<entity>.<verb>.scope.<mode>` (entity tier) and
//! `marketing.<verb>.scope.<mode>` (pack-wide tier). The resolver scans the
//! entity tier first, most restrictive mode first, and falls back to the
//! pack tier, then to `own`.

mod caller;
mod checker;
mod scope;

pub use caller::{Caller, PackConfig};
pub use checker::{ClaimSetChecker, PermissionChecker};
pub use scope::{ScopeFilter, ScopeMode, ScopeResolver};

/// Permission key namespace for this feature pack.
pub const PACK: &str = "marketing";

/// Entity kinds with per-entity scope overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Plans,
    Expenses,
    Vendors,
    Campaigns,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Plans => "plans",
            EntityKind::Expenses => "expenses",
            EntityKind::Vendors => "vendors",
            EntityKind::Campaigns => "campaigns",
        }
    }
}

/// Action verbs a scope can be resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionVerb {
    Read,
    Write,
    Delete,
}

impl ActionVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionVerb::Read => "read",
            ActionVerb::Write => "write",
            ActionVerb::Delete => "delete",
        }
    }
}

/// Build the entity-tier permission key, e.g. `marketing.plans.read.scope.own`.
pub fn entity_scope_key(entity: EntityKind, verb: ActionVerb, mode: ScopeMode) -> String {
    format!(
        "{}.{}.{}.scope.{}",
        PACK,
        entity.as_str(),
        verb.as_str(),
        mode.as_str()
    )
}

/// Build the pack-wide permission key, e.g. `marketing.read.scope.any`.
pub fn pack_scope_key(verb: ActionVerb, mode: ScopeMode) -> String {
    format!("{}.{}.scope.{}", PACK, verb.as_str(), mode.as_str())
}
