#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compliance_engine::entitlements::{
    EntitlementResolver, ItemType, PlanCatalog, ResolverSettings, SubscriptionChangeHub,
    SubscriptionPlan, SubscriptionRecord, SubscriptionStore,
};
use compliance_engine::registration::{
    Correction, CorrectionLogEntry, RegistrationStore, TaxActivityRecord,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

pub const JWT_TEST_SECRET: &str = "compliance-test-secret";

fn outage() -> sqlx::Error {
    sqlx::Error::Protocol("simulated store outage".into())
}

#[derive(Default)]
pub struct InMemoryRegistrationStore {
    pub records: Mutex<BTreeMap<Uuid, TaxActivityRecord>>,
    pub audit_log: Mutex<Vec<CorrectionLogEntry>>,
    pub failing_users: Mutex<HashSet<Uuid>>,
    pub fail_listing: AtomicBool,
    pub commits: AtomicUsize,
}

impl InMemoryRegistrationStore {
    pub fn with_records(records: impl IntoIterator<Item = TaxActivityRecord>) -> Self {
        let store = Self::default();
        {
            let mut map = store.records.lock().unwrap();
            for record in records {
                map.insert(record.user_id, record);
            }
        }
        store
    }

    pub fn fail_for(&self, user_id: Uuid) {
        self.failing_users.lock().unwrap().insert(user_id);
    }

    pub fn record(&self, user_id: Uuid) -> TaxActivityRecord {
        self.records.lock().unwrap()[&user_id].clone()
    }

    pub fn audit_entries(&self) -> Vec<CorrectionLogEntry> {
        self.audit_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn fetch_activity(&self, user_id: Uuid) -> sqlx::Result<Option<TaxActivityRecord>> {
        if self.failing_users.lock().unwrap().contains(&user_id) {
            return Err(outage());
        }
        Ok(self.records.lock().unwrap().get(&user_id).cloned())
    }

    async fn commit_corrections(
        &self,
        user_id: Uuid,
        corrections: &[Correction],
        log_entries: &[CorrectionLogEntry],
    ) -> sqlx::Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&user_id).ok_or(sqlx::Error::RowNotFound)?;
        for correction in corrections {
            record
                .recorded_status
                .insert(correction.tax_type, correction.to);
        }
        self.audit_log
            .lock()
            .unwrap()
            .extend(log_entries.iter().cloned());
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_user_ids(&self) -> sqlx::Result<Vec<Uuid>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(self.records.lock().unwrap().keys().copied().collect())
    }
}

#[derive(Clone, Debug)]
pub struct StoredItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_type: ItemType,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    pub subscriptions: Mutex<HashMap<Uuid, SubscriptionRecord>>,
    pub items: Mutex<Vec<StoredItem>>,
    pub failing: AtomicBool,
    pub fail_next_expiry: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
    pub fetches: AtomicUsize,
}

impl InMemorySubscriptionStore {
    pub fn set_subscription(
        &self,
        user_id: Uuid,
        plan: SubscriptionPlan,
        payment_verified: bool,
        next_payment_date: Option<DateTime<Utc>>,
    ) {
        self.subscriptions.lock().unwrap().insert(
            user_id,
            SubscriptionRecord {
                user_id,
                plan_type: plan.as_str().to_string(),
                status: "active".to_string(),
                payment_verified,
                next_payment_date,
                created_at: Utc::now(),
            },
        );
    }

    pub fn subscription_status(&self, user_id: Uuid) -> Option<String> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|record| record.status.clone())
    }

    pub fn add_item(
        &self,
        user_id: Uuid,
        item_type: ItemType,
        is_primary: bool,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.items.lock().unwrap().push(StoredItem {
            id,
            user_id,
            item_type,
            is_primary,
            is_active: true,
            created_at,
        });
        id
    }

    pub fn active_item_ids(&self, user_id: Uuid, item_type: ItemType) -> Vec<Uuid> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.user_id == user_id && item.item_type == item_type && item.is_active)
            .map(|item| item.id)
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    async fn simulate_io(&self) -> sqlx::Result<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn fetch_active_subscription(
        &self,
        user_id: Uuid,
    ) -> sqlx::Result<Option<SubscriptionRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .get(&user_id)
            .filter(|record| record.status == "active")
            .cloned())
    }

    async fn expire_subscription(
        &self,
        user_id: Uuid,
        limits: &[(ItemType, u32)],
    ) -> sqlx::Result<u64> {
        self.simulate_io().await?;
        if self.fail_next_expiry.swap(false, Ordering::SeqCst) {
            return Err(outage());
        }
        {
            let mut subscriptions = self.subscriptions.lock().unwrap();
            if let Some(record) = subscriptions.get_mut(&user_id) {
                record.status = "expired".to_string();
            }
        }
        let mut deactivated = 0;
        for &(item_type, keep) in limits {
            deactivated += self.deactivate_excess_items(user_id, item_type, keep).await?;
        }
        Ok(deactivated)
    }

    async fn count_active_items(&self, user_id: Uuid, item_type: ItemType) -> sqlx::Result<u64> {
        self.simulate_io().await?;
        Ok(self.active_item_ids(user_id, item_type).len() as u64)
    }

    async fn deactivate_excess_items(
        &self,
        user_id: Uuid,
        item_type: ItemType,
        keep: u32,
    ) -> sqlx::Result<u64> {
        self.simulate_io().await?;
        let mut items = self.items.lock().unwrap();
        let mut active: Vec<&mut StoredItem> = items
            .iter_mut()
            .filter(|item| item.user_id == user_id && item.item_type == item_type && item.is_active)
            .collect();
        active.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then(a.created_at.cmp(&b.created_at))
        });
        let mut deactivated = 0;
        for item in active.into_iter().skip(keep as usize) {
            item.is_active = false;
            deactivated += 1;
        }
        Ok(deactivated)
    }
}

pub fn resolver_with(
    store: Arc<InMemorySubscriptionStore>,
    timeout: Duration,
) -> EntitlementResolver {
    EntitlementResolver::new(
        store,
        Arc::new(PlanCatalog::standard()),
        Arc::new(SubscriptionChangeHub::new()),
        ResolverSettings {
            fetch_timeout: timeout,
            ..ResolverSettings::default()
        },
    )
}

pub fn resolver(store: Arc<InMemorySubscriptionStore>) -> EntitlementResolver {
    resolver_with(store, Duration::from_secs(2))
}

pub fn bearer_token(user_id: Uuid, role: &str) -> String {
    std::env::set_var("JWT_SECRET", JWT_TEST_SECRET);
    let claims = serde_json::json!({
        "sub": user_id,
        "role": role,
        "exp": 9999999999u64,
    });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_TEST_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}
