//! Entitlement resolver: maps a user's subscription to the plan feature table and answers
//! feature and item-quota questions, with a cached session and live change notifications.

pub mod api;
pub mod hub;
pub mod listener;
pub mod models;
pub mod plans;
pub mod resolver;
pub mod session;
pub mod store;

pub use api::{
    feature_access as entitlements_feature_access, item_quota as entitlements_item_quota,
    subscription as entitlements_subscription, SubscriptionOverview,
};
pub use hub::SubscriptionChangeHub;
pub use listener::{dispatch_payload, spawn_subscription_listener};
pub use models::{
    AccessControlResult, SubscriptionChange, SubscriptionRecord, SubscriptionSnapshot,
    SubscriptionStatus,
};
pub use plans::{FeatureKey, FeatureTable, ItemLimit, ItemType, PlanCatalog, SubscriptionPlan};
pub use resolver::{evaluate_item_quota, EntitlementError, EntitlementResolver, ResolverSettings};
pub use session::{EntitlementSession, LiveSubscription};
pub use store::SubscriptionStore;
