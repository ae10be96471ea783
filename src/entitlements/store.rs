use async_trait::async_trait;
use uuid::Uuid;

use super::models::SubscriptionRecord;
use super::plans::ItemType;

/// key: entitlement-store -> subscription and item rows used by the resolver
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Most recently created subscription with `status = 'active'`.
    async fn fetch_active_subscription(
        &self,
        user_id: Uuid,
    ) -> sqlx::Result<Option<SubscriptionRecord>>;

    /// Marks the active subscription expired and trims each listed item type down to its
    /// `keep` count in one transaction. Returns how many items were deactivated.
    async fn expire_subscription(
        &self,
        user_id: Uuid,
        limits: &[(ItemType, u32)],
    ) -> sqlx::Result<u64>;

    async fn count_active_items(&self, user_id: Uuid, item_type: ItemType) -> sqlx::Result<u64>;

    /// Keeps the first `keep` active items (primary first, then oldest) and deactivates the
    /// rest. Returns how many were deactivated.
    async fn deactivate_excess_items(
        &self,
        user_id: Uuid,
        item_type: ItemType,
        keep: u32,
    ) -> sqlx::Result<u64>;
}
