use async_trait::async_trait;
use uuid::Uuid;

use super::models::{Correction, CorrectionLogEntry, TaxActivityRecord};

/// key: registration-store -> row access used by the corrector
///
/// `commit_corrections` must write every corrected status column for the user in one
/// update and append the audit rows alongside it; either all of it lands or none does.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn fetch_activity(&self, user_id: Uuid) -> sqlx::Result<Option<TaxActivityRecord>>;

    async fn commit_corrections(
        &self,
        user_id: Uuid,
        corrections: &[Correction],
        log_entries: &[CorrectionLogEntry],
    ) -> sqlx::Result<()>;

    async fn list_user_ids(&self) -> sqlx::Result<Vec<Uuid>>;
}
