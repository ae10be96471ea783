use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::warn;

use super::corrector::RegistrationCorrector;
use super::models::BatchCorrectionReport;

/// key: registration-sweep -> periodic batch correction
pub fn spawn(
    corrector: Arc<RegistrationCorrector>,
    interval: Duration,
    concurrency: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = process_tick(&corrector, concurrency).await {
                warn!(?err, "registration correction sweep tick failed");
            }
        }
    })
}

/// key: registration-sweep -> tick handler
pub async fn process_tick(
    corrector: &RegistrationCorrector,
    concurrency: usize,
) -> Result<BatchCorrectionReport> {
    let report = corrector.batch_correct(concurrency).await?;
    for failure in &report.failed {
        warn!(
            user_id = %failure.user_id,
            error = %failure.error,
            "user skipped during registration sweep"
        );
    }
    Ok(report)
}
