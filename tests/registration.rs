mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::InMemoryRegistrationStore;
use compliance_engine::registration::{
    sweep, ActivityEntry, CorrectionOutcome, RegistrationCorrector, RegistrationPolicy,
    RegistrationReason, RegistrationStatus, TaxActivityRecord, TaxType,
};
use uuid::Uuid;

fn record_with_vat_number() -> TaxActivityRecord {
    let mut record = TaxActivityRecord::new(Uuid::new_v4());
    record.tax_numbers.insert(TaxType::Vat, "VAT-12345".to_string());
    for tax_type in TaxType::ALL {
        record
            .recorded_status
            .insert(tax_type, RegistrationStatus::NotRegistered);
    }
    record
}

#[tokio::test]
async fn tax_number_drift_is_corrected_and_audited() {
    let record = record_with_vat_number();
    let user_id = record.user_id;
    let store = Arc::new(InMemoryRegistrationStore::with_records([record]));
    let corrector = RegistrationCorrector::with_default_policy(store.clone());

    let outcome = corrector.auto_correct(user_id).await;
    let corrections = outcome.corrections();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].tax_type, TaxType::Vat);
    assert_eq!(corrections[0].from, Some(RegistrationStatus::NotRegistered));
    assert_eq!(corrections[0].to, RegistrationStatus::Registered);
    assert_eq!(corrections[0].reason, RegistrationReason::TaxNumber);

    assert_eq!(
        store.record(user_id).recorded_status(TaxType::Vat),
        Some(RegistrationStatus::Registered)
    );
    let audit = store.audit_entries();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].reason, "Has tax number");
    assert_eq!(audit[0].correction_type, "auto");
    assert_eq!(audit[0].old_status, Some(RegistrationStatus::NotRegistered));
}

#[tokio::test]
async fn second_pass_finds_no_drift() {
    let record = record_with_vat_number();
    let user_id = record.user_id;
    let store = Arc::new(InMemoryRegistrationStore::with_records([record]));
    let corrector = RegistrationCorrector::with_default_policy(store.clone());

    assert!(matches!(
        corrector.auto_correct(user_id).await,
        CorrectionOutcome::Corrected { .. }
    ));
    assert_eq!(corrector.auto_correct(user_id).await, CorrectionOutcome::NoDrift);
    assert_eq!(store.audit_entries().len(), 1);
    assert_eq!(store.commits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn all_mismatches_land_in_one_commit() {
    let mut record = TaxActivityRecord::new(Uuid::new_v4());
    record
        .upcoming_payments
        .push(ActivityEntry::new(TaxType::Paye));
    record.filing_history.push(ActivityEntry::new(TaxType::Cit));
    record
        .recorded_status
        .insert(TaxType::Wht, RegistrationStatus::Registered);
    let user_id = record.user_id;
    let store = Arc::new(InMemoryRegistrationStore::with_records([record]));
    let corrector = RegistrationCorrector::with_default_policy(store.clone());

    let outcome = corrector.auto_correct(user_id).await;
    let summary: Vec<_> = outcome
        .corrections()
        .iter()
        .map(|c| (c.tax_type, c.from, c.to, c.reason))
        .collect();
    assert_eq!(
        summary,
        vec![
            (
                TaxType::Paye,
                None,
                RegistrationStatus::Registered,
                RegistrationReason::UpcomingPayments
            ),
            (
                TaxType::Vat,
                None,
                RegistrationStatus::NotRegistered,
                RegistrationReason::SystemActivity
            ),
            (
                TaxType::Cit,
                None,
                RegistrationStatus::Registered,
                RegistrationReason::FilingHistory
            ),
            (
                TaxType::Wht,
                Some(RegistrationStatus::Registered),
                RegistrationStatus::NotRegistered,
                RegistrationReason::SystemActivity
            ),
            (
                TaxType::Pit,
                None,
                RegistrationStatus::NotRegistered,
                RegistrationReason::SystemActivity
            ),
        ]
    );
    assert_eq!(store.commits.load(Ordering::SeqCst), 1);
    assert_eq!(store.audit_entries().len(), 5);
}

#[tokio::test]
async fn store_failure_is_reported_not_hidden() {
    let record = record_with_vat_number();
    let user_id = record.user_id;
    let store = Arc::new(InMemoryRegistrationStore::with_records([record]));
    store.fail_for(user_id);
    let corrector = RegistrationCorrector::with_default_policy(store.clone());

    let outcome = corrector.auto_correct(user_id).await;
    assert!(outcome.is_failure());
    assert!(outcome.corrections().is_empty());
    assert!(store.audit_entries().is_empty());
}

#[tokio::test]
async fn missing_record_is_a_failure() {
    let store = Arc::new(InMemoryRegistrationStore::default());
    let corrector = RegistrationCorrector::with_default_policy(store);
    assert!(corrector.auto_correct(Uuid::new_v4()).await.is_failure());
}

#[tokio::test]
async fn batch_reports_corrected_and_failed_users() {
    let drifting = record_with_vat_number();
    let broken = record_with_vat_number();
    let mut consistent = TaxActivityRecord::new(Uuid::new_v4());
    for tax_type in TaxType::ALL {
        consistent
            .recorded_status
            .insert(tax_type, RegistrationStatus::NotRegistered);
    }
    let (drifting_id, broken_id) = (drifting.user_id, broken.user_id);

    let store = Arc::new(InMemoryRegistrationStore::with_records([
        drifting, broken, consistent,
    ]));
    store.fail_for(broken_id);
    let corrector = RegistrationCorrector::with_default_policy(store.clone());

    let report = corrector.batch_correct(2).await.unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.corrected.len(), 1);
    assert_eq!(report.corrected[0].user_id, drifting_id);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].user_id, broken_id);

    let report = sweep::process_tick(&corrector, 4).await.unwrap();
    assert!(report.corrected.is_empty());
    assert_eq!(report.failed.len(), 1);
}

#[tokio::test]
async fn batch_surfaces_listing_failure() {
    let store = Arc::new(InMemoryRegistrationStore::default());
    store.fail_listing.store(true, Ordering::SeqCst);
    let corrector = RegistrationCorrector::with_default_policy(store);
    assert!(corrector.batch_correct(4).await.is_err());
}

struct TaxNumberOnlyPolicy;

impl RegistrationPolicy for TaxNumberOnlyPolicy {
    fn determine_status(
        &self,
        record: &TaxActivityRecord,
        tax_type: TaxType,
    ) -> RegistrationStatus {
        if record.tax_number(tax_type).is_some() {
            RegistrationStatus::Registered
        } else {
            RegistrationStatus::NotRegistered
        }
    }

    fn status_reason(&self, _record: &TaxActivityRecord, _tax_type: TaxType) -> RegistrationReason {
        RegistrationReason::TaxNumber
    }
}

#[tokio::test]
async fn stricter_policy_plugs_into_the_same_pipeline() {
    let mut record = TaxActivityRecord::new(Uuid::new_v4());
    record
        .payment_history
        .push(ActivityEntry::new(TaxType::Paye));
    for tax_type in TaxType::ALL {
        record
            .recorded_status
            .insert(tax_type, RegistrationStatus::NotRegistered);
    }
    let user_id = record.user_id;
    let store = Arc::new(InMemoryRegistrationStore::with_records([record]));
    let corrector = RegistrationCorrector::new(store, Arc::new(TaxNumberOnlyPolicy));

    assert_eq!(corrector.auto_correct(user_id).await, CorrectionOutcome::NoDrift);
}
