//! Registration-status corrector: infers whether a user is registered for each tax type
//! from their activity record and repairs the cached status columns.

pub mod api;
pub mod corrector;
pub mod models;
pub mod policy;
pub mod store;
pub mod sweep;

pub use api::{
    correct_own_status as registration_correct_own_status, run_sweep as registration_run_sweep,
    SweepParams,
};
pub use corrector::{CorrectionError, RegistrationCorrector};
pub use models::{
    ActivityEntry, BatchCorrectionReport, Correction, CorrectionLogEntry, CorrectionOutcome,
    RegistrationReason, RegistrationStatus, TaxActivityRecord, TaxType, UserCorrectionFailure,
    UserCorrections,
};
pub use policy::{ActivityEvidencePolicy, RegistrationPolicy, RegistrationSignals};
pub use store::RegistrationStore;
