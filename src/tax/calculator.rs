use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::schedule::TaxSchedule;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaxInputError {
    #[error("gross income must be non-negative, got {0}")]
    NegativeGrossIncome(Decimal),
    #[error("allowable deductions must be non-negative, got {0}")]
    NegativeDeductions(Decimal),
}

/// key: tax-relief -> consolidated relief allowance parameters
///
/// CRA = max(floor, alternative_rate * gross) + gross_rate * gross
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliefAllowance {
    pub floor: Decimal,
    pub alternative_rate: Decimal,
    pub gross_rate: Decimal,
}

impl Default for ReliefAllowance {
    fn default() -> Self {
        Self {
            floor: Decimal::from(200_000),
            alternative_rate: Decimal::new(1, 2),
            gross_rate: Decimal::new(20, 2),
        }
    }
}

impl ReliefAllowance {
    pub fn compute(&self, gross_income: Decimal) -> Decimal {
        let base = self.floor.max(gross_income * self.alternative_rate);
        base + gross_income * self.gross_rate
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBandBreakdown {
    pub band: String,
    pub taxable_amount: Decimal,
    pub rate: Decimal,
    pub tax: Decimal,
}

/// key: tax-result -> ephemeral liability breakdown, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    pub gross_income: Decimal,
    pub cra: Decimal,
    pub allowable_deductions: Decimal,
    pub taxable_income: Decimal,
    pub tax_payable: Decimal,
    pub net_income: Decimal,
    /// Fraction of gross income, in `[0, 1]`.
    pub effective_rate: Decimal,
    pub breakdown: Vec<TaxBandBreakdown>,
}

impl TaxCalculationResult {
    pub fn effective_rate_percent(&self) -> Decimal {
        (self.effective_rate * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressiveTax {
    pub tax: Decimal,
    pub breakdown: Vec<TaxBandBreakdown>,
}

/// key: tax-calculator -> progressive personal income tax
#[derive(Debug, Clone)]
pub struct TaxCalculator {
    legacy: TaxSchedule,
    revised: TaxSchedule,
    relief: ReliefAllowance,
}

impl Default for TaxCalculator {
    fn default() -> Self {
        Self::new(
            TaxSchedule::legacy(),
            TaxSchedule::revised(),
            ReliefAllowance::default(),
        )
    }
}

impl TaxCalculator {
    pub fn new(legacy: TaxSchedule, revised: TaxSchedule, relief: ReliefAllowance) -> Self {
        Self {
            legacy,
            revised,
            relief,
        }
    }

    pub fn schedule(&self, use_revised_schedule: bool) -> &TaxSchedule {
        if use_revised_schedule {
            &self.revised
        } else {
            &self.legacy
        }
    }

    pub fn relief(&self) -> &ReliefAllowance {
        &self.relief
    }

    pub fn consolidated_relief(&self, gross_income: Decimal) -> Decimal {
        self.relief.compute(gross_income)
    }

    pub fn progressive_tax(
        &self,
        taxable_income: Decimal,
        schedule: &TaxSchedule,
    ) -> ProgressiveTax {
        let mut tax = Decimal::ZERO;
        let mut breakdown = Vec::new();
        let mut remaining = taxable_income;

        for band in schedule.bands() {
            if remaining <= Decimal::ZERO {
                break;
            }
            let taxable_in_band = match band.width() {
                Some(width) => remaining.min(width),
                None => remaining,
            };
            if taxable_in_band <= Decimal::ZERO {
                continue;
            }
            let band_tax = taxable_in_band * band.rate;
            breakdown.push(TaxBandBreakdown {
                band: band.label(),
                taxable_amount: taxable_in_band,
                rate: band.rate,
                tax: band_tax,
            });
            tax += band_tax;
            remaining -= taxable_in_band;
        }

        ProgressiveTax { tax, breakdown }
    }

    pub fn calculate(
        &self,
        gross_income: Decimal,
        allowable_deductions: Decimal,
        use_revised_schedule: bool,
    ) -> Result<TaxCalculationResult, TaxInputError> {
        if gross_income.is_sign_negative() && !gross_income.is_zero() {
            return Err(TaxInputError::NegativeGrossIncome(gross_income));
        }
        if allowable_deductions.is_sign_negative() && !allowable_deductions.is_zero() {
            return Err(TaxInputError::NegativeDeductions(allowable_deductions));
        }

        if gross_income.is_zero() {
            return Ok(TaxCalculationResult {
                gross_income,
                cra: Decimal::ZERO,
                allowable_deductions,
                taxable_income: Decimal::ZERO,
                tax_payable: Decimal::ZERO,
                net_income: Decimal::ZERO,
                effective_rate: Decimal::ZERO,
                breakdown: Vec::new(),
            });
        }

        let cra = self.consolidated_relief(gross_income);
        let taxable_income = (gross_income - cra - allowable_deductions).max(Decimal::ZERO);
        let ProgressiveTax { tax, breakdown } =
            self.progressive_tax(taxable_income, self.schedule(use_revised_schedule));

        Ok(TaxCalculationResult {
            gross_income,
            cra,
            allowable_deductions,
            taxable_income,
            tax_payable: tax,
            net_income: gross_income - tax,
            effective_rate: tax / gross_income,
            breakdown,
        })
    }
}

/// Computes liability with the statutory schedules and relief.
pub fn calculate_tax(
    gross_income: Decimal,
    allowable_deductions: Decimal,
    use_revised_schedule: bool,
) -> Result<TaxCalculationResult, TaxInputError> {
    TaxCalculator::default().calculate(gross_income, allowable_deductions, use_revised_schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::schedule::TaxBand;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_income_yields_empty_result() {
        let result = calculate_tax(Decimal::ZERO, Decimal::ZERO, false).unwrap();
        assert_eq!(result.tax_payable, Decimal::ZERO);
        assert_eq!(result.effective_rate, Decimal::ZERO);
        assert_eq!(result.net_income, Decimal::ZERO);
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn one_million_under_legacy_schedule() {
        let result = calculate_tax(dec!(1000000), Decimal::ZERO, false).unwrap();
        assert_eq!(result.cra, dec!(400000));
        assert_eq!(result.taxable_income, dec!(600000));
        assert_eq!(result.tax_payable, dec!(54000));
        assert_eq!(result.net_income, dec!(946000));
        assert_eq!(result.effective_rate, dec!(0.054));
        assert_eq!(result.effective_rate_percent(), dec!(5.40));
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.breakdown[0].band, "₦0 - ₦300,000");
        assert_eq!(result.breakdown[0].tax, dec!(21000));
        assert_eq!(result.breakdown[1].band, "₦300,000 - ₦600,000");
        assert_eq!(result.breakdown[1].tax, dec!(33000));
    }

    #[test]
    fn revised_schedule_zero_band_absorbs_modest_income() {
        let result = calculate_tax(dec!(1000000), Decimal::ZERO, true).unwrap();
        assert_eq!(result.taxable_income, dec!(600000));
        assert_eq!(result.tax_payable, Decimal::ZERO);
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].rate, Decimal::ZERO);
    }

    #[test]
    fn cra_floor_dominates_low_incomes() {
        let calculator = TaxCalculator::default();
        assert_eq!(calculator.consolidated_relief(dec!(500000)), dec!(300000));
        // 1% of 30m exceeds the floor
        assert_eq!(calculator.consolidated_relief(dec!(30000000)), dec!(6300000));
    }

    #[test]
    fn deductions_floor_taxable_income_at_zero() {
        let result = calculate_tax(dec!(400000), dec!(900000), false).unwrap();
        assert_eq!(result.taxable_income, Decimal::ZERO);
        assert_eq!(result.tax_payable, Decimal::ZERO);
        assert!(result.breakdown.is_empty());
        assert_eq!(result.net_income, dec!(400000));
    }

    #[test]
    fn very_high_income_spills_into_open_band() {
        let result = calculate_tax(dec!(50000000), Decimal::ZERO, false).unwrap();
        let last = result.breakdown.last().unwrap();
        assert_eq!(last.band, "Above ₦3,200,000");
        assert_eq!(last.rate, dec!(0.24));
        let covered: Decimal = result.breakdown.iter().map(|line| line.taxable_amount).sum();
        assert_eq!(covered, result.taxable_income);
    }

    #[test]
    fn negative_inputs_are_rejected() {
        assert_eq!(
            calculate_tax(dec!(-1), Decimal::ZERO, false),
            Err(TaxInputError::NegativeGrossIncome(dec!(-1)))
        );
        assert_eq!(
            calculate_tax(dec!(100), dec!(-5), false),
            Err(TaxInputError::NegativeDeductions(dec!(-5)))
        );
    }

    #[test]
    fn substituted_schedule_is_used() {
        let flat = TaxSchedule::new("flat", vec![TaxBand::open(0, 10)]).unwrap();
        let calculator = TaxCalculator::new(flat.clone(), flat, ReliefAllowance {
            floor: Decimal::ZERO,
            alternative_rate: Decimal::ZERO,
            gross_rate: Decimal::ZERO,
        });
        let result = calculator.calculate(dec!(1000), Decimal::ZERO, false).unwrap();
        assert_eq!(result.tax_payable, dec!(100));
        assert_eq!(result.breakdown[0].band, "Above ₦0");
    }

    proptest! {
        #[test]
        fn liability_invariants_hold(
            gross in 0i64..2_000_000_000,
            deductions in 0i64..50_000_000,
            revised in any::<bool>(),
        ) {
            let gross = Decimal::from(gross);
            let result = calculate_tax(gross, Decimal::from(deductions), revised).unwrap();

            prop_assert!(result.tax_payable >= Decimal::ZERO);
            prop_assert_eq!(result.net_income, gross - result.tax_payable);
            prop_assert!(result.effective_rate >= Decimal::ZERO);
            prop_assert!(result.effective_rate <= Decimal::ONE);

            let band_tax: Decimal = result.breakdown.iter().map(|line| line.tax).sum();
            prop_assert_eq!(band_tax, result.tax_payable);
            let covered: Decimal = result.breakdown.iter().map(|line| line.taxable_amount).sum();
            prop_assert_eq!(covered, result.taxable_income);
            prop_assert!(result.breakdown.iter().all(|line| line.taxable_amount > Decimal::ZERO));
        }
    }
}
