use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    Json,
};
use serde::Deserialize;

use super::{BatchCorrectionReport, CorrectionOutcome, RegistrationCorrector};
use crate::error::{EngineError, EngineResult};
use crate::extractor::AuthUser;

const DEFAULT_SWEEP_CONCURRENCY: usize = 4;

/// key: registration-api -> correction endpoints
pub async fn correct_own_status(
    Extension(corrector): Extension<Arc<RegistrationCorrector>>,
    user: AuthUser,
) -> Json<CorrectionOutcome> {
    Json(corrector.auto_correct(user.user_id).await)
}

pub async fn run_sweep(
    Extension(corrector): Extension<Arc<RegistrationCorrector>>,
    user: AuthUser,
    Query(params): Query<SweepParams>,
) -> EngineResult<Json<BatchCorrectionReport>> {
    if !user.is_service_role() {
        return Err(EngineError::Forbidden);
    }
    let concurrency = params.concurrency.unwrap_or(DEFAULT_SWEEP_CONCURRENCY);
    let report = corrector.batch_correct(concurrency).await?;
    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
pub struct SweepParams {
    #[serde(default)]
    pub concurrency: Option<usize>,
}
