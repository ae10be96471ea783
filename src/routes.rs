use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use crate::entitlements::{self, EntitlementResolver};
use crate::registration::{self, RegistrationCorrector};
use crate::tax::{self, TaxCalculator};

pub async fn root() -> &'static str {
    "Compliance Engine API"
}

pub fn api_routes() -> Router {
    Router::new()
        .route("/api/tax/calculate", post(tax::tax_calculate))
        .route("/api/tax/schedules", get(tax::tax_list_schedules))
        .route(
            "/api/entitlements/subscription",
            get(entitlements::entitlements_subscription),
        )
        .route(
            "/api/entitlements/features/:feature",
            get(entitlements::entitlements_feature_access),
        )
        .route(
            "/api/entitlements/items/:item_type",
            get(entitlements::entitlements_item_quota),
        )
        .route(
            "/api/registration/corrections",
            post(registration::registration_correct_own_status),
        )
        .route(
            "/api/admin/registration/sweep",
            post(registration::registration_run_sweep),
        )
}

/// Router with the shared components attached, minus the metrics layer.
pub fn app(
    calculator: Arc<TaxCalculator>,
    corrector: Arc<RegistrationCorrector>,
    resolver: Arc<EntitlementResolver>,
) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(api_routes())
        .layer(Extension(calculator))
        .layer(Extension(corrector))
        .layer(Extension(resolver))
}
