pub mod config;
pub mod db;
pub mod entitlements;
pub mod error;
pub mod extractor;
pub mod registration;
pub mod routes;
pub mod tax;

pub use error::{EngineError, EngineResult};
