use std::sync::Arc;

use axum::{extract::Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{TaxCalculationResult, TaxCalculator, TaxSchedule};
use crate::error::EngineResult;

/// key: tax-api -> calculator endpoints
pub async fn calculate(
    Extension(calculator): Extension<Arc<TaxCalculator>>,
    Json(payload): Json<CalculateTaxRequest>,
) -> EngineResult<Json<TaxCalculationResult>> {
    let result = calculator.calculate(
        payload.gross_income,
        payload.allowable_deductions.unwrap_or(Decimal::ZERO),
        payload.use_revised_schedule.unwrap_or(false),
    )?;
    Ok(Json(result))
}

pub async fn list_schedules(
    Extension(calculator): Extension<Arc<TaxCalculator>>,
) -> Json<ScheduleCatalog> {
    Json(ScheduleCatalog {
        legacy: calculator.schedule(false).clone(),
        revised: calculator.schedule(true).clone(),
    })
}

#[derive(Debug, Deserialize)]
pub struct CalculateTaxRequest {
    pub gross_income: Decimal,
    #[serde(default)]
    pub allowable_deductions: Option<Decimal>,
    #[serde(default)]
    pub use_revised_schedule: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleCatalog {
    pub legacy: TaxSchedule,
    pub revised: TaxSchedule,
}
