use async_trait::async_trait;

use super::caller::Caller;

/// Permission check primitive for pluggable authorization backends.
///
/// The resolver treats an `Err` the same as "not granted": a failing
/// backend must narrow access, never widen it.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Check whether the caller holds the given permission key.
    async fn check(&self, caller: &Caller, key: &str) -> anyhow::Result<bool>;
}

/// Default checker backed by the granted-key set from the caller's claims.
#[derive(Debug, Clone, Default)]
pub struct ClaimSetChecker;

impl ClaimSetChecker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PermissionChecker for ClaimSetChecker {
    async fn check(&self, caller: &Caller, key: &str) -> anyhow::Result<bool> {
        let ok = caller.has_grant(key);
        if ok {
            tracing::debug!(
                user_id = %caller.user_id,
                key = %key,
                "permission key granted"
            );
        }
        Ok(ok)
    }
}
