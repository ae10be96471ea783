//! Progressive personal income tax calculator.

pub mod api;
pub mod calculator;
pub mod schedule;

pub use api::{
    calculate as tax_calculate, list_schedules as tax_list_schedules, CalculateTaxRequest,
    ScheduleCatalog,
};
pub use calculator::{
    calculate_tax, ProgressiveTax, ReliefAllowance, TaxBandBreakdown, TaxCalculationResult,
    TaxCalculator, TaxInputError,
};
pub use schedule::{format_naira, TaxBand, TaxSchedule, TaxScheduleError};
