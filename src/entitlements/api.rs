use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use super::{
    AccessControlResult, EntitlementResolver, FeatureKey, FeatureTable, ItemType,
    SubscriptionPlan, SubscriptionSnapshot,
};
use crate::error::{EngineError, EngineResult};
use crate::extractor::AuthUser;

#[derive(Debug, Serialize)]
pub struct SubscriptionOverview {
    pub subscription: SubscriptionSnapshot,
    pub effective_plan: SubscriptionPlan,
    pub features: FeatureTable,
    pub is_expiring_soon: bool,
}

/// key: entitlements-api -> caller's subscription and limits
pub async fn subscription(
    Extension(resolver): Extension<Arc<EntitlementResolver>>,
    user: AuthUser,
) -> EngineResult<Json<SubscriptionOverview>> {
    let snapshot = resolver.verify_user_access(user.user_id).await?;
    let effective_plan = snapshot.effective_plan();
    let is_expiring_soon =
        snapshot.is_expiring_soon(Utc::now(), resolver.settings().expiry_warning);
    Ok(Json(SubscriptionOverview {
        features: *resolver.catalog().features(effective_plan),
        effective_plan,
        is_expiring_soon,
        subscription: snapshot,
    }))
}

pub async fn feature_access(
    Extension(resolver): Extension<Arc<EntitlementResolver>>,
    user: AuthUser,
    Path(feature): Path<String>,
) -> EngineResult<Json<AccessControlResult>> {
    let feature = FeatureKey::from_str(&feature)
        .ok_or_else(|| EngineError::BadRequest(format!("unknown feature: {feature}")))?;
    Ok(Json(resolver.can_access_feature(user.user_id, feature).await))
}

pub async fn item_quota(
    Extension(resolver): Extension<Arc<EntitlementResolver>>,
    user: AuthUser,
    Path(item_type): Path<String>,
) -> EngineResult<Json<AccessControlResult>> {
    let item_type = ItemType::from_str(&item_type)
        .ok_or_else(|| EngineError::BadRequest(format!("unknown item type: {item_type}")))?;
    Ok(Json(resolver.can_create_item(user.user_id, item_type).await))
}
