use std::sync::Arc;

use uuid::Uuid;

use super::caller::Caller;
use super::checker::PermissionChecker;
use super::{entity_scope_key, pack_scope_key, ActionVerb, EntityKind};

/// Access scope for an entity/verb pair, ordered by restrictiveness.
///
/// `Ldd` ("limited direct delegation") grants broad but not full access.
/// No handler currently filters it differently from `Any`; it stays a
/// distinct mode so grants keep their meaning if that changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    None,
    Own,
    Ldd,
    Any,
}

impl ScopeMode {
    /// Most-restrictive-first scan order. When a caller holds keys for
    /// several modes at the same tier, the narrowest one wins.
    pub const RESOLUTION_ORDER: [ScopeMode; 4] =
        [ScopeMode::None, ScopeMode::Own, ScopeMode::Ldd, ScopeMode::Any];

    pub fn as_str(self) -> &'static str {
        match self {
            ScopeMode::None => "none",
            ScopeMode::Own => "own",
            ScopeMode::Ldd => "ldd",
            ScopeMode::Any => "any",
        }
    }

    /// Translate a resolved mode into the record filter a handler must
    /// apply. `owned` says whether the entity type carries an ownership
    /// column; `Own` against an ownerless entity denies everything rather
    /// than silently widening.
    pub fn filter(self, caller: &Caller, owned: bool) -> ScopeFilter {
        match self {
            ScopeMode::None => ScopeFilter::DenyAll,
            ScopeMode::Own if owned => ScopeFilter::OwnedBy(caller.user_id),
            ScopeMode::Own => ScopeFilter::DenyAll,
            ScopeMode::Ldd | ScopeMode::Any => ScopeFilter::Unrestricted,
        }
    }
}

/// Record-level filter derived from a [`ScopeMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFilter {
    DenyAll,
    OwnedBy(Uuid),
    Unrestricted,
}

impl ScopeFilter {
    /// Whether a record with the given owner passes this filter. Records
    /// without an owner only pass `Unrestricted`.
    pub fn allows(self, owner: Option<Uuid>) -> bool {
        match self {
            ScopeFilter::DenyAll => false,
            ScopeFilter::OwnedBy(user_id) => owner == Some(user_id),
            ScopeFilter::Unrestricted => true,
        }
    }
}

/// Resolves the effective access scope for a caller.
///
/// Resolution order:
/// 1. entity-tier keys, `none` to `any` - first granted mode wins
/// 2. pack-tier keys, same scan
/// 3. `own` as the safe default
///
/// The entity tier is exhausted before the pack tier is consulted, so a
/// broader entity-specific grant is never overridden by a narrower
/// pack-wide default.
#[derive(Clone)]
pub struct ScopeResolver {
    checker: Arc<dyn PermissionChecker>,
}

impl ScopeResolver {
    pub fn new(checker: Arc<dyn PermissionChecker>) -> Self {
        Self { checker }
    }

    pub async fn resolve(
        &self,
        caller: &Caller,
        entity: Option<EntityKind>,
        verb: ActionVerb,
    ) -> ScopeMode {
        if let Some(entity) = entity {
            for mode in ScopeMode::RESOLUTION_ORDER {
                if self.granted(caller, &entity_scope_key(entity, verb, mode)).await {
                    tracing::debug!(
                        user_id = %caller.user_id,
                        entity = entity.as_str(),
                        verb = verb.as_str(),
                        mode = mode.as_str(),
                        "scope resolved at entity tier"
                    );
                    return mode;
                }
            }
        }

        for mode in ScopeMode::RESOLUTION_ORDER {
            if self.granted(caller, &pack_scope_key(verb, mode)).await {
                tracing::debug!(
                    user_id = %caller.user_id,
                    verb = verb.as_str(),
                    mode = mode.as_str(),
                    "scope resolved at pack tier"
                );
                return mode;
            }
        }

        tracing::debug!(
            user_id = %caller.user_id,
            verb = verb.as_str(),
            "no scope key granted, defaulting to own"
        );
        ScopeMode::Own
    }

    // Fail closed: a checker error counts as "not granted", never aborts
    // resolution.
    async fn granted(&self, caller: &Caller, key: &str) -> bool {
        match self.checker.check(caller, key).await {
            Ok(ok) => ok,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "permission check failed, treating as denied");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;

    use super::*;
    use crate::authz::ClaimSetChecker;

    fn resolver_for(keys: &[&str]) -> (ScopeResolver, Caller) {
        let caller = Caller::new(Uuid::new_v4())
            .with_granted(keys.iter().map(|k| k.to_string()).collect::<HashSet<_>>());
        (ScopeResolver::new(Arc::new(ClaimSetChecker::new())), caller)
    }

    #[tokio::test]
    async fn most_restrictive_mode_wins_within_a_tier() {
        let (resolver, caller) = resolver_for(&[
            "marketing.plans.read.scope.own",
            "marketing.plans.read.scope.any",
        ]);

        let mode = resolver
            .resolve(&caller, Some(EntityKind::Plans), ActionVerb::Read)
            .await;
        assert_eq!(mode, ScopeMode::Own);
    }

    #[tokio::test]
    async fn entity_tier_is_exhausted_before_pack_tier() {
        // A narrower entity grant beats a broader pack-wide grant.
        let (resolver, caller) = resolver_for(&[
            "marketing.expenses.write.scope.own",
            "marketing.write.scope.any",
        ]);

        let mode = resolver
            .resolve(&caller, Some(EntityKind::Expenses), ActionVerb::Write)
            .await;
        assert_eq!(mode, ScopeMode::Own);

        // And the other way round: a broad entity grant is not narrowed by
        // a restrictive pack default.
        let (resolver, caller) = resolver_for(&[
            "marketing.expenses.write.scope.any",
            "marketing.write.scope.none",
        ]);

        let mode = resolver
            .resolve(&caller, Some(EntityKind::Expenses), ActionVerb::Write)
            .await;
        assert_eq!(mode, ScopeMode::Any);
    }

    #[tokio::test]
    async fn pack_tier_applies_when_entity_tier_is_silent() {
        let (resolver, caller) = resolver_for(&["marketing.read.scope.ldd"]);

        let mode = resolver
            .resolve(&caller, Some(EntityKind::Vendors), ActionVerb::Read)
            .await;
        assert_eq!(mode, ScopeMode::Ldd);
    }

    #[tokio::test]
    async fn entity_keys_for_other_verbs_do_not_match() {
        let (resolver, caller) = resolver_for(&["marketing.plans.read.scope.any"]);

        let mode = resolver
            .resolve(&caller, Some(EntityKind::Plans), ActionVerb::Delete)
            .await;
        assert_eq!(mode, ScopeMode::Own);
    }

    #[tokio::test]
    async fn default_is_own_with_no_grants() {
        let (resolver, caller) = resolver_for(&[]);

        let mode = resolver
            .resolve(&caller, Some(EntityKind::Plans), ActionVerb::Read)
            .await;
        assert_eq!(mode, ScopeMode::Own);

        let mode = resolver.resolve(&caller, None, ActionVerb::Write).await;
        assert_eq!(mode, ScopeMode::Own);
    }

    #[tokio::test]
    async fn none_grant_blocks_even_with_broader_grants() {
        let (resolver, caller) = resolver_for(&[
            "marketing.vendors.read.scope.none",
            "marketing.vendors.read.scope.any",
        ]);

        let mode = resolver
            .resolve(&caller, Some(EntityKind::Vendors), ActionVerb::Read)
            .await;
        assert_eq!(mode, ScopeMode::None);
    }

    struct FailingChecker;

    #[async_trait]
    impl PermissionChecker for FailingChecker {
        async fn check(&self, _caller: &Caller, _key: &str) -> anyhow::Result<bool> {
            anyhow::bail!("backend unreachable")
        }
    }

    #[tokio::test]
    async fn checker_errors_fail_closed() {
        let resolver = ScopeResolver::new(Arc::new(FailingChecker));
        let caller = Caller::new(Uuid::new_v4())
            .with_granted(vec!["marketing.plans.read.scope.any".to_string()]);

        let mode = resolver
            .resolve(&caller, Some(EntityKind::Plans), ActionVerb::Read)
            .await;
        assert_eq!(mode, ScopeMode::Own);
    }

    #[test]
    fn own_without_ownership_column_denies_all() {
        let caller = Caller::new(Uuid::new_v4());
        assert_eq!(ScopeMode::Own.filter(&caller, false), ScopeFilter::DenyAll);
        assert_eq!(
            ScopeMode::Own.filter(&caller, true),
            ScopeFilter::OwnedBy(caller.user_id)
        );
    }

    #[test]
    fn filter_allows_matches_ownership() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(ScopeFilter::Unrestricted.allows(None));
        assert!(ScopeFilter::OwnedBy(user).allows(Some(user)));
        assert!(!ScopeFilter::OwnedBy(user).allows(Some(other)));
        assert!(!ScopeFilter::OwnedBy(user).allows(None));
        assert!(!ScopeFilter::DenyAll.allows(Some(user)));
    }
}
