use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::time;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::hub::SubscriptionChangeHub;
use super::models::{AccessControlResult, SubscriptionSnapshot};
use super::plans::{FeatureKey, ItemLimit, ItemType, PlanCatalog, SubscriptionPlan};
use super::session::EntitlementSession;
use super::store::SubscriptionStore;

#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("subscription store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("subscription store did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Bound on every store round trip made for an access decision.
    pub fetch_timeout: Duration,
    pub expiry_warning: chrono::Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(5000),
            expiry_warning: chrono::Duration::days(7),
        }
    }
}

/// key: entitlement-resolver -> plan lookup and access decisions
#[derive(Clone)]
pub struct EntitlementResolver {
    store: Arc<dyn SubscriptionStore>,
    catalog: Arc<PlanCatalog>,
    hub: Arc<SubscriptionChangeHub>,
    settings: ResolverSettings,
}

impl EntitlementResolver {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        catalog: Arc<PlanCatalog>,
        hub: Arc<SubscriptionChangeHub>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            hub,
            settings,
        }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    pub fn hub(&self) -> &Arc<SubscriptionChangeHub> {
        &self.hub
    }

    pub fn settings(&self) -> ResolverSettings {
        self.settings
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, EntitlementError>
    where
        F: Future<Output = sqlx::Result<T>>,
    {
        match time::timeout(self.settings.fetch_timeout, fut).await {
            Ok(result) => result.map_err(EntitlementError::from),
            Err(_) => Err(EntitlementError::Timeout(self.settings.fetch_timeout)),
        }
    }

    /// Reads the user's active subscription. A lapsed subscription is marked expired in the
    /// store and the free-tier limits are applied before the free snapshot is returned.
    pub async fn verify_user_access(
        &self,
        user_id: Uuid,
    ) -> Result<SubscriptionSnapshot, EntitlementError> {
        self.bounded(self.load_snapshot(user_id)).await
    }

    async fn load_snapshot(&self, user_id: Uuid) -> sqlx::Result<SubscriptionSnapshot> {
        let Some(record) = self.store.fetch_active_subscription(user_id).await? else {
            return Ok(SubscriptionSnapshot::inactive());
        };

        if let Some(expires_at) = record.next_payment_date {
            if expires_at < Utc::now() {
                let limits = self.limited_items(SubscriptionPlan::Free);
                let deactivated = self.store.expire_subscription(user_id, &limits).await?;
                info!(
                    %user_id,
                    plan = %record.plan_type,
                    %expires_at,
                    deactivated,
                    "subscription expired, downgraded to free"
                );
                return Ok(SubscriptionSnapshot::expired());
            }
        }

        let plan = SubscriptionPlan::from_str(&record.plan_type).unwrap_or_else(|| {
            warn!(%user_id, plan = %record.plan_type, "unknown plan tag, treating as free");
            SubscriptionPlan::Free
        });
        Ok(SubscriptionSnapshot::active(
            plan,
            record.payment_verified,
            record.next_payment_date,
        ))
    }

    fn limited_items(&self, plan: SubscriptionPlan) -> Vec<(ItemType, u32)> {
        let features = self.catalog.features(plan);
        ItemType::ALL
            .into_iter()
            .filter_map(|item_type| match features.limit(item_type) {
                ItemLimit::Limited(keep) => Some((item_type, keep)),
                ItemLimit::Unlimited => None,
            })
            .collect()
    }

    async fn apply_limits(&self, user_id: Uuid, plan: SubscriptionPlan) -> sqlx::Result<u64> {
        let mut deactivated = 0;
        for (item_type, keep) in self.limited_items(plan) {
            let count = self
                .store
                .deactivate_excess_items(user_id, item_type, keep)
                .await?;
            if count > 0 {
                info!(
                    %user_id,
                    item_type = %item_type,
                    count,
                    "deactivated items above plan limit"
                );
            }
            deactivated += count;
        }
        Ok(deactivated)
    }

    /// Deactivates items above the quota of the user's plan. A paid plan still awaiting
    /// payment keeps its items.
    pub async fn enforce_access_limits(&self, user_id: Uuid) -> Result<u64, EntitlementError> {
        let snapshot = self.verify_user_access(user_id).await?;
        self.enforce_for_snapshot(user_id, &snapshot).await
    }

    pub(crate) async fn enforce_for_snapshot(
        &self,
        user_id: Uuid,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<u64, EntitlementError> {
        let plan = if snapshot.is_active {
            snapshot.plan
        } else {
            SubscriptionPlan::Free
        };
        self.bounded(self.apply_limits(user_id, plan)).await
    }

    /// Fails closed: a store error or timeout denies access.
    pub async fn can_access_feature(
        &self,
        user_id: Uuid,
        feature: FeatureKey,
    ) -> AccessControlResult {
        match self.verify_user_access(user_id).await {
            Ok(snapshot) => self.decide_feature(&snapshot, feature),
            Err(err) => {
                error!(?err, %user_id, feature = %feature, "feature access check failed");
                AccessControlResult::verification_failed()
            }
        }
    }

    pub fn decide_feature(
        &self,
        snapshot: &SubscriptionSnapshot,
        feature: FeatureKey,
    ) -> AccessControlResult {
        if !snapshot.is_active {
            return AccessControlResult::denied(
                AccessControlResult::NO_ACTIVE_SUBSCRIPTION,
                Some(SubscriptionPlan::Basic),
            );
        }
        if self.catalog.features(snapshot.effective_plan()).has(feature) {
            return AccessControlResult::granted();
        }
        if snapshot.awaiting_payment() && self.catalog.features(snapshot.plan).has(feature) {
            return AccessControlResult::denied(
                format!(
                    "Payment for your {} plan has not been verified",
                    snapshot.plan
                ),
                Some(snapshot.plan),
            );
        }
        AccessControlResult::denied(
            feature.denial_reason(),
            self.catalog.required_plan_for_feature(feature),
        )
    }

    /// Fails closed like [`Self::can_access_feature`].
    pub async fn can_create_item(
        &self,
        user_id: Uuid,
        item_type: ItemType,
    ) -> AccessControlResult {
        let snapshot = match self.verify_user_access(user_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(?err, %user_id, item_type = %item_type, "item quota check failed");
                return AccessControlResult::verification_failed();
            }
        };
        let current_count = match self
            .bounded(self.store.count_active_items(user_id, item_type))
            .await
        {
            Ok(count) => count,
            Err(err) => {
                error!(?err, %user_id, item_type = %item_type, "counting active items failed");
                return AccessControlResult::verification_failed();
            }
        };
        self.decide_item(&snapshot, item_type, current_count)
    }

    pub fn decide_item(
        &self,
        snapshot: &SubscriptionSnapshot,
        item_type: ItemType,
        current_count: u64,
    ) -> AccessControlResult {
        let result = evaluate_item_quota(
            &self.catalog,
            snapshot.effective_plan(),
            item_type,
            current_count,
        );
        if !result.has_access
            && snapshot.awaiting_payment()
            && self
                .catalog
                .features(snapshot.plan)
                .limit(item_type)
                .allows(current_count)
        {
            return AccessControlResult::denied(
                format!(
                    "Payment for your {} plan has not been verified",
                    snapshot.plan
                ),
                Some(snapshot.plan),
            );
        }
        result
    }

    /// Loads the user's snapshot and returns a session caching it.
    pub async fn open_session(
        &self,
        user_id: Uuid,
    ) -> Result<EntitlementSession, EntitlementError> {
        let session = EntitlementSession::new(self.clone(), user_id);
        session.refresh().await?;
        Ok(session)
    }
}

/// Quota decision for a plan holding `current_count` active items.
pub fn evaluate_item_quota(
    catalog: &PlanCatalog,
    plan: SubscriptionPlan,
    item_type: ItemType,
    current_count: u64,
) -> AccessControlResult {
    let limit = catalog.features(plan).limit(item_type);
    if limit.allows(current_count) {
        return AccessControlResult::granted();
    }
    AccessControlResult::denied(
        format!(
            "You've reached the limit of {} {} for your {} plan",
            limit.as_raw(),
            item_type.display_name(),
            plan
        ),
        catalog.required_plan_for(item_type, current_count),
    )
}
