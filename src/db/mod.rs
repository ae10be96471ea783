//! Postgres-backed implementations of the store traits.

pub mod subscriptions;
pub mod user_tax_data;

pub use subscriptions::PgSubscriptionStore;
pub use user_tax_data::PgRegistrationStore;
