use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::entitlements::EntitlementError;
use crate::tax::TaxInputError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("invalid tax input: {0}")]
    TaxInput(#[from] TaxInputError),
    #[error("forbidden")]
    Forbidden,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("timed out waiting for the store")]
    Timeout,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match self {
            EngineError::Forbidden => StatusCode::FORBIDDEN,
            EngineError::BadRequest(_) | EngineError::TaxInput(_) => StatusCode::BAD_REQUEST,
            EngineError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            EngineError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(?self);
        (status, self.to_string()).into_response()
    }
}

impl From<EntitlementError> for EngineError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::Store(err) => EngineError::Db(err),
            EntitlementError::Timeout(_) => EngineError::Timeout,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
