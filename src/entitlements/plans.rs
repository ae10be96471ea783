use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// key: entitlement-plan -> tiers ordered by entitlement breadth
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl SubscriptionPlan {
    pub const ALL: [SubscriptionPlan; 4] = [
        SubscriptionPlan::Free,
        SubscriptionPlan::Basic,
        SubscriptionPlan::Pro,
        SubscriptionPlan::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Basic => "basic",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Some(SubscriptionPlan::Free),
            "basic" => Some(SubscriptionPlan::Basic),
            "pro" => Some(SubscriptionPlan::Pro),
            "enterprise" => Some(SubscriptionPlan::Enterprise),
            _ => None,
        }
    }

    /// Stored plan tags that are not recognised fall back to the free tier.
    pub fn from_stored(value: &str) -> Self {
        Self::from_str(value).unwrap_or(SubscriptionPlan::Free)
    }

    pub fn is_paid(&self) -> bool {
        *self != SubscriptionPlan::Free
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item quota. Serialized as a plain integer with `-1` for unlimited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemLimit {
    Limited(u32),
    Unlimited,
}

impl ItemLimit {
    pub fn as_raw(&self) -> i64 {
        match self {
            ItemLimit::Limited(limit) => i64::from(*limit),
            ItemLimit::Unlimited => -1,
        }
    }

    pub fn allows(&self, current_count: u64) -> bool {
        match self {
            ItemLimit::Limited(limit) => current_count < u64::from(*limit),
            ItemLimit::Unlimited => true,
        }
    }
}

impl Serialize for ItemLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_raw())
    }
}

/// key: entitlement-item-type -> quota-limited resources
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    BusinessProfiles,
    TaxObligations,
}

impl ItemType {
    pub const ALL: [ItemType; 2] = [ItemType::BusinessProfiles, ItemType::TaxObligations];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::BusinessProfiles => "business_profiles",
            ItemType::TaxObligations => "tax_obligations",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "business_profiles" => Some(ItemType::BusinessProfiles),
            "tax_obligations" => Some(ItemType::TaxObligations),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ItemType::BusinessProfiles => "business profiles",
            ItemType::TaxObligations => "tax obligations",
        }
    }

    /// Backing table. Business profiles are stored as company profiles.
    pub fn table(&self) -> &'static str {
        match self {
            ItemType::BusinessProfiles => "company_profiles",
            ItemType::TaxObligations => "tax_obligations",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    Reminders,
    WhatsappReminders,
    AdvancedCalculator,
    ApiAccess,
    MultiUserAccess,
    PrioritySupport,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 6] = [
        FeatureKey::Reminders,
        FeatureKey::WhatsappReminders,
        FeatureKey::AdvancedCalculator,
        FeatureKey::ApiAccess,
        FeatureKey::MultiUserAccess,
        FeatureKey::PrioritySupport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::Reminders => "reminders",
            FeatureKey::WhatsappReminders => "whatsapp_reminders",
            FeatureKey::AdvancedCalculator => "advanced_calculator",
            FeatureKey::ApiAccess => "api_access",
            FeatureKey::MultiUserAccess => "multi_user_access",
            FeatureKey::PrioritySupport => "priority_support",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "reminders" => Some(FeatureKey::Reminders),
            "whatsapp_reminders" => Some(FeatureKey::WhatsappReminders),
            "advanced_calculator" => Some(FeatureKey::AdvancedCalculator),
            "api_access" => Some(FeatureKey::ApiAccess),
            "multi_user_access" => Some(FeatureKey::MultiUserAccess),
            "priority_support" => Some(FeatureKey::PrioritySupport),
            _ => None,
        }
    }

    pub fn denial_reason(&self) -> &'static str {
        match self {
            FeatureKey::Reminders => "Reminders require Basic plan or higher",
            FeatureKey::WhatsappReminders => "WhatsApp reminders require Pro plan or higher",
            FeatureKey::AdvancedCalculator => "Advanced calculator requires Pro plan or higher",
            FeatureKey::ApiAccess => "API access requires Enterprise plan",
            FeatureKey::MultiUserAccess => "Multi-user access requires Enterprise plan",
            FeatureKey::PrioritySupport => "Priority support requires Pro plan or higher",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// key: entitlement-feature-table -> per-plan limits and flags
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct FeatureTable {
    pub business_profiles: ItemLimit,
    pub tax_obligations: ItemLimit,
    pub has_reminders: bool,
    pub has_whatsapp_reminders: bool,
    pub has_advanced_calculator: bool,
    pub has_api_access: bool,
    pub has_multi_user_access: bool,
    pub has_priority_support: bool,
}

impl FeatureTable {
    pub fn limit(&self, item_type: ItemType) -> ItemLimit {
        match item_type {
            ItemType::BusinessProfiles => self.business_profiles,
            ItemType::TaxObligations => self.tax_obligations,
        }
    }

    pub fn has(&self, feature: FeatureKey) -> bool {
        match feature {
            FeatureKey::Reminders => self.has_reminders,
            FeatureKey::WhatsappReminders => self.has_whatsapp_reminders,
            FeatureKey::AdvancedCalculator => self.has_advanced_calculator,
            FeatureKey::ApiAccess => self.has_api_access,
            FeatureKey::MultiUserAccess => self.has_multi_user_access,
            FeatureKey::PrioritySupport => self.has_priority_support,
        }
    }
}

/// Plan to feature mapping handed to the resolver. `standard()` is the published table;
/// tests and alternate deployments can build their own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanCatalog {
    free: FeatureTable,
    basic: FeatureTable,
    pro: FeatureTable,
    enterprise: FeatureTable,
}

impl PlanCatalog {
    pub fn new(
        free: FeatureTable,
        basic: FeatureTable,
        pro: FeatureTable,
        enterprise: FeatureTable,
    ) -> Self {
        Self {
            free,
            basic,
            pro,
            enterprise,
        }
    }

    pub fn standard() -> Self {
        Self {
            free: FeatureTable {
                business_profiles: ItemLimit::Limited(0),
                tax_obligations: ItemLimit::Limited(0),
                has_reminders: false,
                has_whatsapp_reminders: false,
                has_advanced_calculator: false,
                has_api_access: false,
                has_multi_user_access: false,
                has_priority_support: false,
            },
            basic: FeatureTable {
                business_profiles: ItemLimit::Limited(1),
                tax_obligations: ItemLimit::Limited(3),
                has_reminders: true,
                has_whatsapp_reminders: false,
                has_advanced_calculator: false,
                has_api_access: false,
                has_multi_user_access: false,
                has_priority_support: false,
            },
            pro: FeatureTable {
                business_profiles: ItemLimit::Limited(5),
                tax_obligations: ItemLimit::Unlimited,
                has_reminders: true,
                has_whatsapp_reminders: true,
                has_advanced_calculator: true,
                has_api_access: false,
                has_multi_user_access: false,
                has_priority_support: true,
            },
            enterprise: FeatureTable {
                business_profiles: ItemLimit::Unlimited,
                tax_obligations: ItemLimit::Unlimited,
                has_reminders: true,
                has_whatsapp_reminders: true,
                has_advanced_calculator: true,
                has_api_access: true,
                has_multi_user_access: true,
                has_priority_support: true,
            },
        }
    }

    pub fn features(&self, plan: SubscriptionPlan) -> &FeatureTable {
        match plan {
            SubscriptionPlan::Free => &self.free,
            SubscriptionPlan::Basic => &self.basic,
            SubscriptionPlan::Pro => &self.pro,
            SubscriptionPlan::Enterprise => &self.enterprise,
        }
    }

    /// Cheapest plan whose quota for `item_type` admits one more item than `current_count`.
    pub fn required_plan_for(
        &self,
        item_type: ItemType,
        current_count: u64,
    ) -> Option<SubscriptionPlan> {
        SubscriptionPlan::ALL
            .into_iter()
            .find(|plan| self.features(*plan).limit(item_type).allows(current_count))
    }

    /// Cheapest plan that carries `feature`.
    pub fn required_plan_for_feature(&self, feature: FeatureKey) -> Option<SubscriptionPlan> {
        SubscriptionPlan::ALL
            .into_iter()
            .find(|plan| self.features(*plan).has(feature))
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
