use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plans::SubscriptionPlan;

/// Raw `subscriptions` row as the store returns it.
#[derive(Clone, Debug, sqlx::FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub user_id: Uuid,
    pub plan_type: String,
    pub status: String,
    pub payment_verified: bool,
    pub next_payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// key: entitlement-snapshot -> verified view of one user's subscription
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub is_active: bool,
    pub payment_verified: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SubscriptionSnapshot {
    pub fn inactive() -> Self {
        Self {
            plan: SubscriptionPlan::Free,
            status: SubscriptionStatus::Inactive,
            is_active: false,
            payment_verified: false,
            expires_at: None,
        }
    }

    pub fn expired() -> Self {
        Self {
            status: SubscriptionStatus::Expired,
            ..Self::inactive()
        }
    }

    pub fn active(
        plan: SubscriptionPlan,
        payment_verified: bool,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            plan,
            status: SubscriptionStatus::Active,
            is_active: true,
            payment_verified,
            expires_at,
        }
    }

    /// Plan whose entitlements actually apply. Inactive subscriptions and paid plans whose
    /// payment has not been confirmed get the free tier.
    pub fn effective_plan(&self) -> SubscriptionPlan {
        if !self.is_active {
            return SubscriptionPlan::Free;
        }
        if self.plan.is_paid() && !self.payment_verified {
            return SubscriptionPlan::Free;
        }
        self.plan
    }

    pub fn awaiting_payment(&self) -> bool {
        self.is_active && self.plan.is_paid() && !self.payment_verified
    }

    /// True when `expires_at` is set and no more than `window` away. The boundary is inclusive.
    pub fn is_expiring_soon(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expires_at
            .map(|expires_at| expires_at - now <= window)
            .unwrap_or(false)
    }
}

/// key: entitlement-decision -> answer to every access question
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessControlResult {
    pub has_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_required: Option<SubscriptionPlan>,
}

impl AccessControlResult {
    pub const VERIFICATION_FAILED: &'static str = "Error verifying access";
    pub const NO_ACTIVE_SUBSCRIPTION: &'static str = "No active subscription";

    pub fn granted() -> Self {
        Self {
            has_access: true,
            reason: None,
            upgrade_required: None,
        }
    }

    pub fn denied(reason: impl Into<String>, upgrade_required: Option<SubscriptionPlan>) -> Self {
        Self {
            has_access: false,
            reason: Some(reason.into()),
            upgrade_required,
        }
    }

    /// Result used whenever the subscription could not be read.
    pub fn verification_failed() -> Self {
        Self::denied(Self::VERIFICATION_FAILED, Some(SubscriptionPlan::Basic))
    }
}

/// Change notification for one user's subscription row.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionChange {
    pub user_id: Uuid,
}
