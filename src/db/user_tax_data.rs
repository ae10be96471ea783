use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::registration::{
    ActivityEntry, Correction, CorrectionLogEntry, RegistrationStatus, RegistrationStore,
    TaxActivityRecord, TaxType,
};

/// key: registration-store-pg -> `user_tax_data` and `registration_status_corrections`
#[derive(Clone)]
pub struct PgRegistrationStore {
    pool: PgPool,
}

impl PgRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn activity_record_from_row(row: &PgRow) -> Result<TaxActivityRecord, sqlx::Error> {
    let mut record = TaxActivityRecord::new(row.try_get("user_id")?);
    let entries = |column: &str| {
        row.try_get::<Option<Value>, _>(column)
            .map(ActivityEntry::collect)
    };
    record.upcoming_payments = entries("upcoming_payments")?;
    record.payment_history = entries("payment_history")?;
    record.filing_history = entries("filing_history")?;
    record.returns = entries("returns")?;
    record.obligations = entries("obligations")?;

    for tax_type in TaxType::ALL {
        if let Some(number) = row.try_get::<Option<String>, _>(tax_type.number_column())? {
            record.tax_numbers.insert(tax_type, number);
        }
        let status = row.try_get::<Option<String>, _>(tax_type.status_column())?;
        if let Some(status) = status.as_deref().and_then(RegistrationStatus::from_str) {
            record.recorded_status.insert(tax_type, status);
        }
    }
    Ok(record)
}

pub async fn fetch_activity_record(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<TaxActivityRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT
            user_id,
            upcoming_payments,
            payment_history,
            filing_history,
            returns,
            obligations,
            paye_number,
            vat_number,
            cit_number,
            wht_number,
            pit_number,
            paye_registration_status,
            vat_registration_status,
            cit_registration_status,
            wht_registration_status,
            pit_registration_status
        FROM user_tax_data
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(activity_record_from_row).transpose()
}

/// Writes every corrected status column in one UPDATE and appends the audit rows in the
/// same transaction.
pub async fn apply_corrections(
    pool: &PgPool,
    user_id: Uuid,
    corrections: &[Correction],
    log_entries: &[CorrectionLogEntry],
) -> Result<(), sqlx::Error> {
    if corrections.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    let mut update: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE user_tax_data SET ");
    {
        let mut columns = update.separated(", ");
        for correction in corrections {
            columns.push(format!("{} = ", correction.tax_type.status_column()));
            columns.push_bind_unseparated(correction.to.as_str());
        }
        columns.push("updated_at = NOW()");
    }
    update.push(" WHERE user_id = ");
    update.push_bind(user_id);

    let updated = update.build().execute(&mut tx).await?;
    if updated.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }

    if !log_entries.is_empty() {
        let mut insert: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO registration_status_corrections \
             (user_id, tax_type, old_status, new_status, reason, corrected_at, correction_type) ",
        );
        insert.push_values(log_entries, |mut row, entry| {
            row.push_bind(entry.user_id)
                .push_bind(entry.tax_type.as_str())
                .push_bind(entry.old_status.map(|status| status.as_str()))
                .push_bind(entry.new_status.as_str())
                .push_bind(entry.reason.as_str())
                .push_bind(entry.corrected_at)
                .push_bind(entry.correction_type.as_str());
        });
        insert.build().execute(&mut tx).await?;
    }

    tx.commit().await
}

pub async fn list_user_ids(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT user_id FROM user_tax_data ORDER BY user_id")
        .fetch_all(pool)
        .await
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn fetch_activity(&self, user_id: Uuid) -> sqlx::Result<Option<TaxActivityRecord>> {
        fetch_activity_record(&self.pool, user_id).await
    }

    async fn commit_corrections(
        &self,
        user_id: Uuid,
        corrections: &[Correction],
        log_entries: &[CorrectionLogEntry],
    ) -> sqlx::Result<()> {
        apply_corrections(&self.pool, user_id, corrections, log_entries).await
    }

    async fn list_user_ids(&self) -> sqlx::Result<Vec<Uuid>> {
        list_user_ids(&self.pool).await
    }
}
