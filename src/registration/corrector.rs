use std::sync::Arc;

use chrono::Utc;
use futures_util::{stream, StreamExt};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::models::{
    BatchCorrectionReport, Correction, CorrectionLogEntry, CorrectionOutcome, RegistrationReason,
    RegistrationStatus, TaxActivityRecord, TaxType, UserCorrectionFailure, UserCorrections,
};
use super::policy::{ActivityEvidencePolicy, RegistrationPolicy};
use super::store::RegistrationStore;

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("no tax activity record for user {0}")]
    MissingRecord(Uuid),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// key: registration-corrector -> detect and repair recorded status drift
#[derive(Clone)]
pub struct RegistrationCorrector {
    store: Arc<dyn RegistrationStore>,
    policy: Arc<dyn RegistrationPolicy>,
}

impl RegistrationCorrector {
    pub fn new(store: Arc<dyn RegistrationStore>, policy: Arc<dyn RegistrationPolicy>) -> Self {
        Self { store, policy }
    }

    pub fn with_default_policy(store: Arc<dyn RegistrationStore>) -> Self {
        Self::new(store, Arc::new(ActivityEvidencePolicy))
    }

    pub fn determine_status(
        &self,
        record: &TaxActivityRecord,
        tax_type: TaxType,
    ) -> RegistrationStatus {
        self.policy.determine_status(record, tax_type)
    }

    pub fn status_reason(
        &self,
        record: &TaxActivityRecord,
        tax_type: TaxType,
    ) -> RegistrationReason {
        self.policy.status_reason(record, tax_type)
    }

    /// Compares inferred and recorded status for every tax type, in enumeration order.
    pub fn detect_drift(&self, record: &TaxActivityRecord) -> Vec<Correction> {
        TaxType::ALL
            .into_iter()
            .filter_map(|tax_type| {
                let inferred = self.determine_status(record, tax_type);
                let recorded = record.recorded_status(tax_type);
                if recorded == Some(inferred) {
                    return None;
                }
                Some(Correction {
                    tax_type,
                    from: recorded,
                    to: inferred,
                    reason: self.status_reason(record, tax_type),
                })
            })
            .collect()
    }

    /// Single-user pass. Store failures are logged and surface as
    /// [`CorrectionOutcome::Failed`] rather than an error.
    pub async fn auto_correct(&self, user_id: Uuid) -> CorrectionOutcome {
        match self.try_correct(user_id).await {
            Ok(corrections) if corrections.is_empty() => {
                debug!(%user_id, "registration status already consistent");
                CorrectionOutcome::NoDrift
            }
            Ok(corrections) => CorrectionOutcome::Corrected { corrections },
            Err(err) => {
                error!(?err, %user_id, "registration auto-correction failed");
                CorrectionOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn try_correct(&self, user_id: Uuid) -> Result<Vec<Correction>, CorrectionError> {
        let record = self
            .store
            .fetch_activity(user_id)
            .await?
            .ok_or(CorrectionError::MissingRecord(user_id))?;

        let corrections = self.detect_drift(&record);
        if corrections.is_empty() {
            return Ok(corrections);
        }

        let corrected_at = Utc::now();
        let log_entries: Vec<CorrectionLogEntry> = corrections
            .iter()
            .map(|correction| CorrectionLogEntry::auto(user_id, correction, corrected_at))
            .collect();

        self.store
            .commit_corrections(user_id, &corrections, &log_entries)
            .await?;

        for correction in &corrections {
            info!(
                %user_id,
                tax_type = %correction.tax_type,
                from = correction.from.map(|status| status.as_str()).unwrap_or("unset"),
                to = %correction.to,
                reason = %correction.reason,
                "registration status corrected"
            );
        }

        Ok(corrections)
    }

    /// Runs the single-user pass for every user with at most `concurrency` passes in
    /// flight. Report order follows the store's user listing.
    pub async fn batch_correct(&self, concurrency: usize) -> sqlx::Result<BatchCorrectionReport> {
        let user_ids = self.store.list_user_ids().await?;
        let scanned = user_ids.len();

        let outcomes: Vec<(Uuid, CorrectionOutcome)> = stream::iter(user_ids)
            .map(|user_id| async move { (user_id, self.auto_correct(user_id).await) })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let mut report = BatchCorrectionReport {
            scanned,
            ..BatchCorrectionReport::default()
        };
        for (user_id, outcome) in outcomes {
            match outcome {
                CorrectionOutcome::NoDrift => {}
                CorrectionOutcome::Corrected { corrections } => {
                    report.corrected.push(UserCorrections {
                        user_id,
                        corrections,
                    });
                }
                CorrectionOutcome::Failed { error } => {
                    report.failed.push(UserCorrectionFailure { user_id, error });
                }
            }
        }

        info!(
            scanned = report.scanned,
            corrected = report.corrected.len(),
            failed = report.failed.len(),
            "registration correction sweep finished"
        );
        Ok(report)
    }
}
