use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// key: tax-band -> one contiguous income range taxed at a fixed rate
///
/// `max == None` marks the open-ended top band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBand {
    pub min: Decimal,
    pub max: Option<Decimal>,
    pub rate: Decimal,
}

impl TaxBand {
    pub fn bounded(min: i64, max: i64, rate_percent: i64) -> Self {
        Self {
            min: Decimal::from(min),
            max: Some(Decimal::from(max)),
            rate: Decimal::new(rate_percent, 2),
        }
    }

    pub fn open(min: i64, rate_percent: i64) -> Self {
        Self {
            min: Decimal::from(min),
            max: None,
            rate: Decimal::new(rate_percent, 2),
        }
    }

    /// Width of the band, or `None` for the open band.
    pub fn width(&self) -> Option<Decimal> {
        self.max.map(|max| max - self.min)
    }

    pub fn label(&self) -> String {
        match self.max {
            Some(max) => format!("{} - {}", format_naira(self.min), format_naira(max)),
            None => format!("Above {}", format_naira(self.min)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxScheduleError {
    #[error("tax schedule `{0}` has no bands")]
    Empty(String),
    #[error("tax schedule `{schedule}` must start at zero, first band starts at {min}")]
    NotAnchoredAtZero { schedule: String, min: Decimal },
    #[error("tax schedule `{schedule}` band {index} starts at {min}, expected {expected}")]
    Gap {
        schedule: String,
        index: usize,
        min: Decimal,
        expected: Decimal,
    },
    #[error("tax schedule `{schedule}` band {index} has non-positive width")]
    EmptyBand { schedule: String, index: usize },
    #[error("tax schedule `{schedule}` band {index} is open-ended but not last")]
    OpenBandNotLast { schedule: String, index: usize },
    #[error("tax schedule `{schedule}` does not end with an open-ended band")]
    MissingOpenBand { schedule: String },
    #[error("tax schedule `{schedule}` band {index} rate {rate} is outside [0, 1]")]
    RateOutOfRange {
        schedule: String,
        index: usize,
        rate: Decimal,
    },
}

/// key: tax-schedule -> ordered, contiguous band table from zero to unbounded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxSchedule {
    name: String,
    bands: Vec<TaxBand>,
}

impl TaxSchedule {
    pub fn new(name: impl Into<String>, bands: Vec<TaxBand>) -> Result<Self, TaxScheduleError> {
        let name = name.into();
        let Some(first) = bands.first() else {
            return Err(TaxScheduleError::Empty(name));
        };
        if !first.min.is_zero() {
            return Err(TaxScheduleError::NotAnchoredAtZero {
                schedule: name,
                min: first.min,
            });
        }

        let last_index = bands.len() - 1;
        let mut expected_min = Decimal::ZERO;
        for (index, band) in bands.iter().enumerate() {
            if band.min != expected_min {
                return Err(TaxScheduleError::Gap {
                    schedule: name,
                    index,
                    min: band.min,
                    expected: expected_min,
                });
            }
            if band.rate < Decimal::ZERO || band.rate > Decimal::ONE {
                return Err(TaxScheduleError::RateOutOfRange {
                    schedule: name,
                    index,
                    rate: band.rate,
                });
            }
            match band.max {
                Some(max) if max <= band.min => {
                    return Err(TaxScheduleError::EmptyBand {
                        schedule: name,
                        index,
                    });
                }
                Some(max) => expected_min = max,
                None if index != last_index => {
                    return Err(TaxScheduleError::OpenBandNotLast {
                        schedule: name,
                        index,
                    });
                }
                None => {}
            }
        }

        if bands[last_index].max.is_some() {
            return Err(TaxScheduleError::MissingOpenBand { schedule: name });
        }

        Ok(Self { name, bands })
    }

    /// Personal income tax bands in force before the 2026 reform.
    pub fn legacy() -> Self {
        Self {
            name: "legacy".to_string(),
            bands: vec![
                TaxBand::bounded(0, 300_000, 7),
                TaxBand::bounded(300_000, 600_000, 11),
                TaxBand::bounded(600_000, 1_100_000, 15),
                TaxBand::bounded(1_100_000, 1_600_000, 19),
                TaxBand::bounded(1_600_000, 3_200_000, 21),
                TaxBand::open(3_200_000, 24),
            ],
        }
    }

    /// 2026 reform: wider zero-rate band and a 25% top rate.
    pub fn revised() -> Self {
        Self {
            name: "revised_2026".to_string(),
            bands: vec![
                TaxBand::bounded(0, 800_000, 0),
                TaxBand::bounded(800_000, 1_100_000, 15),
                TaxBand::bounded(1_100_000, 1_600_000, 19),
                TaxBand::bounded(1_600_000, 3_200_000, 21),
                TaxBand::open(3_200_000, 25),
            ],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bands(&self) -> &[TaxBand] {
        &self.bands
    }
}

/// Formats an amount as naira with thousands separators, e.g. `₦1,100,000`.
pub fn format_naira(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = rounded.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (text, None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{sign}₦{grouped}.{fraction}"),
        None => format!("{sign}₦{grouped}"),
    }
}
