use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::hub::SubscriptionChangeHub;
use super::models::{SubscriptionChange, SubscriptionSnapshot};
use super::plans::{FeatureKey, ItemLimit, ItemType};
use super::resolver::{EntitlementError, EntitlementResolver};

/// key: entitlement-session -> cached snapshot for synchronous checks
///
/// Synchronous answers only consult the last snapshot fetched; they never touch the store.
pub struct EntitlementSession {
    resolver: EntitlementResolver,
    user_id: Uuid,
    snapshot: Arc<watch::Sender<Option<SubscriptionSnapshot>>>,
}

impl EntitlementSession {
    pub fn new(resolver: EntitlementResolver, user_id: Uuid) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            resolver,
            user_id,
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn snapshot(&self) -> Option<SubscriptionSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Re-reads the subscription and, when it is active, enforces the plan's item limits.
    pub async fn refresh(&self) -> Result<SubscriptionSnapshot, EntitlementError> {
        let snapshot = self.resolver.verify_user_access(self.user_id).await?;
        if snapshot.is_active {
            if let Err(err) = self
                .resolver
                .enforce_for_snapshot(self.user_id, &snapshot)
                .await
            {
                warn!(?err, user_id = %self.user_id, "enforcing plan limits failed");
            }
        }
        self.snapshot.send_replace(Some(snapshot.clone()));
        Ok(snapshot)
    }

    /// False when nothing is cached or the cached subscription is inactive.
    pub fn has_feature_access(&self, feature: FeatureKey) -> bool {
        match &*self.snapshot.borrow() {
            Some(snapshot) if snapshot.is_active => self
                .resolver
                .catalog()
                .features(snapshot.effective_plan())
                .has(feature),
            _ => false,
        }
    }

    /// Zero when nothing is cached.
    pub fn item_limit(&self, item_type: ItemType) -> ItemLimit {
        match &*self.snapshot.borrow() {
            Some(snapshot) => self
                .resolver
                .catalog()
                .features(snapshot.effective_plan())
                .limit(item_type),
            None => ItemLimit::Limited(0),
        }
    }

    pub fn is_expiring_soon(&self, now: DateTime<Utc>) -> bool {
        let window = self.resolver.settings().expiry_warning;
        self.snapshot
            .borrow()
            .as_ref()
            .map(|snapshot| snapshot.is_expiring_soon(now, window))
            .unwrap_or(false)
    }

    /// Invokes `callback` with a fresh snapshot each time the user's subscription row
    /// changes. The cache is updated before the callback runs.
    ///
    /// `callback` must not call [`LiveSubscription::unsubscribe`] on its own handle.
    pub fn watch<F>(&self, callback: F) -> LiveSubscription
    where
        F: Fn(SubscriptionSnapshot) + Send + 'static,
    {
        let mut changes = HubRegistration::new(self.resolver.hub().clone(), self.user_id);
        let cancelled = Arc::new(Mutex::new(false));
        let resolver = self.resolver.clone();
        let cache = self.snapshot.clone();
        let user_id = self.user_id;
        let guard = cancelled.clone();

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(%user_id, skipped, "subscription watcher lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
                let snapshot = match resolver.verify_user_access(user_id).await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!(?err, %user_id, "refresh after subscription change failed");
                        continue;
                    }
                };
                let cancelled = guard.lock().unwrap_or_else(PoisonError::into_inner);
                if *cancelled {
                    break;
                }
                cache.send_replace(Some(snapshot.clone()));
                callback(snapshot);
            }
        });

        LiveSubscription {
            cancelled,
            task: Some(task),
        }
    }
}

/// Receiver side of a hub channel. Dropping it releases the user's channel once no other
/// watcher holds it.
struct HubRegistration {
    hub: Arc<SubscriptionChangeHub>,
    user_id: Uuid,
    changes: Option<broadcast::Receiver<SubscriptionChange>>,
}

impl HubRegistration {
    fn new(hub: Arc<SubscriptionChangeHub>, user_id: Uuid) -> Self {
        let changes = hub.subscribe(user_id);
        Self {
            hub,
            user_id,
            changes: Some(changes),
        }
    }

    async fn recv(&mut self) -> Result<SubscriptionChange, RecvError> {
        match self.changes.as_mut() {
            Some(changes) => changes.recv().await,
            None => Err(RecvError::Closed),
        }
    }
}

impl Drop for HubRegistration {
    fn drop(&mut self) {
        drop(self.changes.take());
        if self.hub.release(self.user_id) {
            debug!(user_id = %self.user_id, "released subscription change channel");
        }
    }
}

/// Handle for a [`EntitlementSession::watch`] registration. Dropping it unsubscribes.
pub struct LiveSubscription {
    cancelled: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl LiveSubscription {
    /// Idempotent. Once this returns no further callback is started.
    pub fn unsubscribe(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        *self.cancelled.lock().unwrap_or_else(PoisonError::into_inner) = true;
        task.abort();
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
