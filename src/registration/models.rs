use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// key: registration-tax-type -> fixed enumeration tracked per user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    Paye,
    Vat,
    Cit,
    Wht,
    Pit,
}

impl TaxType {
    pub const ALL: [TaxType; 5] = [
        TaxType::Paye,
        TaxType::Vat,
        TaxType::Cit,
        TaxType::Wht,
        TaxType::Pit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxType::Paye => "paye",
            TaxType::Vat => "vat",
            TaxType::Cit => "cit",
            TaxType::Wht => "wht",
            TaxType::Pit => "pit",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "paye" => Some(TaxType::Paye),
            "vat" => Some(TaxType::Vat),
            "cit" => Some(TaxType::Cit),
            "wht" => Some(TaxType::Wht),
            "pit" => Some(TaxType::Pit),
            _ => None,
        }
    }

    /// Column holding the tax identifier, e.g. `vat_number`.
    pub fn number_column(&self) -> &'static str {
        match self {
            TaxType::Paye => "paye_number",
            TaxType::Vat => "vat_number",
            TaxType::Cit => "cit_number",
            TaxType::Wht => "wht_number",
            TaxType::Pit => "pit_number",
        }
    }

    /// Column holding the recorded status, e.g. `vat_registration_status`.
    pub fn status_column(&self) -> &'static str {
        match self {
            TaxType::Paye => "paye_registration_status",
            TaxType::Vat => "vat_registration_status",
            TaxType::Cit => "cit_registration_status",
            TaxType::Wht => "wht_registration_status",
            TaxType::Pit => "pit_registration_status",
        }
    }
}

impl fmt::Display for TaxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,
    NotRegistered,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::NotRegistered => "not_registered",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "registered" => Some(RegistrationStatus::Registered),
            "not_registered" => Some(RegistrationStatus::NotRegistered),
            _ => None,
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of an activity array. The arrays are free-form JSON written by the
/// dashboard, so every field is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityEntry {
    #[serde(rename = "taxType", default)]
    pub tax_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ActivityEntry {
    pub fn new(tax_type: TaxType) -> Self {
        Self {
            tax_type: Some(tax_type.as_str().to_string()),
            status: None,
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn matches(&self, tax_type: TaxType) -> bool {
        self.tax_type
            .as_deref()
            .and_then(TaxType::from_str)
            .map(|candidate| candidate == tax_type)
            .unwrap_or(false)
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }

    /// Reads a JSON array column, skipping elements that are not objects.
    pub fn collect(value: Option<Value>) -> Vec<ActivityEntry> {
        match value {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// key: registration-activity-record -> one `user_tax_data` row
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxActivityRecord {
    pub user_id: Uuid,
    pub upcoming_payments: Vec<ActivityEntry>,
    pub payment_history: Vec<ActivityEntry>,
    pub filing_history: Vec<ActivityEntry>,
    pub returns: Vec<ActivityEntry>,
    pub obligations: Vec<ActivityEntry>,
    pub tax_numbers: BTreeMap<TaxType, String>,
    pub recorded_status: BTreeMap<TaxType, RegistrationStatus>,
}

impl TaxActivityRecord {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn tax_number(&self, tax_type: TaxType) -> Option<&str> {
        self.tax_numbers
            .get(&tax_type)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// `None` when the column is null or holds an unrecognised value.
    pub fn recorded_status(&self, tax_type: TaxType) -> Option<RegistrationStatus> {
        self.recorded_status.get(&tax_type).copied()
    }
}

/// key: registration-reason -> audit text, in evaluation priority order
///
/// Serialized as the same text written to the audit log.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistrationReason {
    #[serde(rename = "Has upcoming payments")]
    UpcomingPayments,
    #[serde(rename = "Has payment history")]
    PaymentHistory,
    #[serde(rename = "Has filing history")]
    FilingHistory,
    #[serde(rename = "Has tax number")]
    TaxNumber,
    #[serde(rename = "System activity detected")]
    SystemActivity,
}

impl RegistrationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationReason::UpcomingPayments => "Has upcoming payments",
            RegistrationReason::PaymentHistory => "Has payment history",
            RegistrationReason::FilingHistory => "Has filing history",
            RegistrationReason::TaxNumber => "Has tax number",
            RegistrationReason::SystemActivity => "System activity detected",
        }
    }
}

impl fmt::Display for RegistrationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Correction {
    pub tax_type: TaxType,
    /// `None` when nothing valid was recorded.
    pub from: Option<RegistrationStatus>,
    pub to: RegistrationStatus,
    pub reason: RegistrationReason,
}

/// key: registration-audit-row -> append-only `registration_status_corrections` entry
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorrectionLogEntry {
    pub user_id: Uuid,
    pub tax_type: TaxType,
    pub old_status: Option<RegistrationStatus>,
    pub new_status: RegistrationStatus,
    pub reason: String,
    pub corrected_at: DateTime<Utc>,
    pub correction_type: String,
}

impl CorrectionLogEntry {
    pub const AUTO: &'static str = "auto";

    pub fn auto(user_id: Uuid, correction: &Correction, corrected_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            tax_type: correction.tax_type,
            old_status: correction.from,
            new_status: correction.to,
            reason: correction.reason.as_str().to_string(),
            corrected_at,
            correction_type: Self::AUTO.to_string(),
        }
    }
}

/// Result of a single-user correction pass.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CorrectionOutcome {
    NoDrift,
    Corrected { corrections: Vec<Correction> },
    Failed { error: String },
}

impl CorrectionOutcome {
    /// Corrections applied; empty for both `NoDrift` and `Failed`.
    pub fn corrections(&self) -> &[Correction] {
        match self {
            CorrectionOutcome::Corrected { corrections } => corrections,
            _ => &[],
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CorrectionOutcome::Failed { .. })
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct UserCorrections {
    pub user_id: Uuid,
    pub corrections: Vec<Correction>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct UserCorrectionFailure {
    pub user_id: Uuid,
    pub error: String,
}

/// key: registration-batch-report -> sweep summary
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct BatchCorrectionReport {
    pub scanned: usize,
    pub corrected: Vec<UserCorrections>,
    pub failed: Vec<UserCorrectionFailure>,
}
