use serde::Serialize;

use super::models::{RegistrationReason, RegistrationStatus, TaxActivityRecord, TaxType};

const SUBMITTED: &str = "submitted";
const ACTIVE: &str = "active";

/// key: registration-signals -> the six weak indicators for one tax type
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct RegistrationSignals {
    pub upcoming_payments: bool,
    pub payment_history: bool,
    pub filing_history: bool,
    pub submitted_returns: bool,
    pub tax_number: bool,
    pub active_obligations: bool,
}

impl RegistrationSignals {
    pub fn collect(record: &TaxActivityRecord, tax_type: TaxType) -> Self {
        Self {
            upcoming_payments: record.upcoming_payments.iter().any(|p| p.matches(tax_type)),
            payment_history: record.payment_history.iter().any(|p| p.matches(tax_type)),
            filing_history: record.filing_history.iter().any(|f| f.matches(tax_type)),
            submitted_returns: record
                .returns
                .iter()
                .any(|r| r.matches(tax_type) && r.has_status(SUBMITTED)),
            tax_number: record.tax_number(tax_type).is_some(),
            active_obligations: record
                .obligations
                .iter()
                .any(|o| o.matches(tax_type) && o.has_status(ACTIVE)),
        }
    }

    pub fn any(&self) -> bool {
        self.upcoming_payments
            || self.payment_history
            || self.filing_history
            || self.submitted_returns
            || self.tax_number
            || self.active_obligations
    }

    /// Fixed priority: upcoming payments, payment history, filing history, tax number.
    /// Returns and obligations only ever surface through the generic fallback.
    pub fn reason(&self) -> RegistrationReason {
        if self.upcoming_payments {
            RegistrationReason::UpcomingPayments
        } else if self.payment_history {
            RegistrationReason::PaymentHistory
        } else if self.filing_history {
            RegistrationReason::FilingHistory
        } else if self.tax_number {
            RegistrationReason::TaxNumber
        } else {
            RegistrationReason::SystemActivity
        }
    }
}

/// Decides the true registration state of a tax type from a user's activity record.
pub trait RegistrationPolicy: Send + Sync {
    fn determine_status(&self, record: &TaxActivityRecord, tax_type: TaxType)
        -> RegistrationStatus;

    fn status_reason(&self, record: &TaxActivityRecord, tax_type: TaxType) -> RegistrationReason;
}

/// key: registration-policy-permissive -> any evidence of activity means registered
///
/// A single stale or test entry in any array is enough to flip the inferred status.
#[derive(Clone, Copy, Debug, Default)]
pub struct ActivityEvidencePolicy;

impl RegistrationPolicy for ActivityEvidencePolicy {
    fn determine_status(
        &self,
        record: &TaxActivityRecord,
        tax_type: TaxType,
    ) -> RegistrationStatus {
        if RegistrationSignals::collect(record, tax_type).any() {
            RegistrationStatus::Registered
        } else {
            RegistrationStatus::NotRegistered
        }
    }

    fn status_reason(&self, record: &TaxActivityRecord, tax_type: TaxType) -> RegistrationReason {
        RegistrationSignals::collect(record, tax_type).reason()
    }
}
