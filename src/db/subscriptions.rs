use async_trait::async_trait;
use sqlx::postgres::PgExecutor;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entitlements::{ItemType, SubscriptionRecord, SubscriptionStore};

/// key: entitlement-store-pg -> `subscriptions`, `company_profiles`, `tax_obligations`
#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub async fn fetch_active_subscription(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
    sqlx::query_as::<_, SubscriptionRecord>(
        r#"
        SELECT user_id, plan_type, status, payment_verified, next_payment_date, created_at
        FROM subscriptions
        WHERE user_id = $1 AND status = 'active'
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn mark_subscription_expired<'c, E: PgExecutor<'c>>(
    executor: E,
    user_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE subscriptions SET status = 'expired', updated_at = NOW() \
         WHERE user_id = $1 AND status = 'active'",
    )
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn count_active_items(
    pool: &PgPool,
    user_id: Uuid,
    item_type: ItemType,
) -> Result<u64, sqlx::Error> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = $1 AND is_active",
        item_type.table()
    );
    let count: i64 = sqlx::query_scalar(&sql).bind(user_id).fetch_one(pool).await?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// Primary items survive first, then the oldest.
pub async fn deactivate_excess_items<'c, E: PgExecutor<'c>>(
    executor: E,
    user_id: Uuid,
    item_type: ItemType,
    keep: u32,
) -> Result<u64, sqlx::Error> {
    let table = item_type.table();
    let sql = format!(
        r#"
        UPDATE {table} SET is_active = FALSE, updated_at = NOW()
        WHERE id IN (
            SELECT id FROM {table}
            WHERE user_id = $1 AND is_active
            ORDER BY is_primary DESC, created_at ASC
            OFFSET $2
        )
        "#
    );
    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(i64::from(keep))
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Expiry and the free-tier trim commit together or not at all.
pub async fn expire_subscription(
    pool: &PgPool,
    user_id: Uuid,
    limits: &[(ItemType, u32)],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    mark_subscription_expired(&mut tx, user_id).await?;
    let mut deactivated = 0;
    for &(item_type, keep) in limits {
        deactivated += deactivate_excess_items(&mut tx, user_id, item_type, keep).await?;
    }
    tx.commit().await?;
    Ok(deactivated)
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn fetch_active_subscription(
        &self,
        user_id: Uuid,
    ) -> sqlx::Result<Option<SubscriptionRecord>> {
        fetch_active_subscription(&self.pool, user_id).await
    }

    async fn expire_subscription(
        &self,
        user_id: Uuid,
        limits: &[(ItemType, u32)],
    ) -> sqlx::Result<u64> {
        expire_subscription(&self.pool, user_id, limits).await
    }

    async fn count_active_items(&self, user_id: Uuid, item_type: ItemType) -> sqlx::Result<u64> {
        count_active_items(&self.pool, user_id, item_type).await
    }

    async fn deactivate_excess_items(
        &self,
        user_id: Uuid,
        item_type: ItemType,
        keep: u32,
    ) -> sqlx::Result<u64> {
        deactivate_excess_items(&self.pool, user_id, item_type, keep).await
    }
}
