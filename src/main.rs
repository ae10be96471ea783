use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use compliance_engine::config;
use compliance_engine::db::{PgRegistrationStore, PgSubscriptionStore};
use compliance_engine::entitlements::{
    spawn_subscription_listener, EntitlementResolver, PlanCatalog, ResolverSettings,
    SubscriptionChangeHub,
};
use compliance_engine::registration::{sweep, RegistrationCorrector};
use compliance_engine::routes;
use compliance_engine::tax::TaxCalculator;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    // Fail fast if the JWT secret is missing
    let _ = config::JWT_SECRET.as_str();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config::DATABASE_URL.as_str())
        .await?;

    if let Err(error) = sqlx::migrate!().run(&pool).await {
        if *config::ALLOW_MIGRATION_FAILURE {
            tracing::warn!(
                ?error,
                "Database migrations failed but continuing due to ALLOW_MIGRATION_FAILURE"
            );
        } else {
            return Err(error.into());
        }
    }

    let calculator = Arc::new(TaxCalculator::default());

    let corrector = Arc::new(RegistrationCorrector::with_default_policy(Arc::new(
        PgRegistrationStore::new(pool.clone()),
    )));
    if *config::REGISTRATION_SWEEP_ENABLED {
        sweep::spawn(
            corrector.clone(),
            Duration::from_secs(*config::REGISTRATION_SWEEP_INTERVAL_SECS),
            *config::REGISTRATION_SWEEP_CONCURRENCY,
        );
    }

    let hub = Arc::new(SubscriptionChangeHub::new());
    spawn_subscription_listener(
        pool.clone(),
        config::SUBSCRIPTION_CHANGE_CHANNEL.to_string(),
        hub.clone(),
    );
    let resolver = Arc::new(EntitlementResolver::new(
        Arc::new(PgSubscriptionStore::new(pool.clone())),
        Arc::new(PlanCatalog::standard()),
        hub,
        ResolverSettings {
            fetch_timeout: *config::ENTITLEMENT_FETCH_TIMEOUT,
            expiry_warning: chrono::Duration::days(*config::SUBSCRIPTION_EXPIRY_WARNING_DAYS),
        },
    ));

    let (prometheus_layer, metrics_handle) = PrometheusMetricLayer::pair();
    let app = routes::app(calculator, corrector, resolver)
        .route(
            "/metrics",
            get(move || async move { metrics_handle.render() }),
        )
        .layer(prometheus_layer);

    let addr: SocketAddr =
        format!("{}:{}", config::BIND_ADDRESS.as_str(), *config::BIND_PORT).parse()?;
    tracing::info!(%addr, "Listening for incoming connections");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
