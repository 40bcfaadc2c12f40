//! Batch queries with per-item failure isolation.

use super::input::BatchLocation;
use super::orchestrator::InferenceOrchestrator;
use crate::error::{Error, Result};
use crate::output::{BatchOutcome, BatchRecord, ErrorRecord, progress};
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Run one batch item. Failures become an error record.
pub fn run_item(orchestrator: &InferenceOrchestrator, location: &BatchLocation) -> BatchRecord {
    let outcome = match orchestrator.infer(location.lat, location.lon, None) {
        Ok(result) => BatchOutcome::Success(result),
        Err(e) => {
            warn!("Error processing {}: {}", location.id, e);
            BatchOutcome::Failure(ErrorRecord::from(&e))
        }
    };
    BatchRecord {
        user_id: location.id.clone(),
        outcome,
    }
}

/// Run every location in input order.
///
/// With `concurrency > 1` items run on a blocking thread pool, at most
/// `concurrency` at a time; output order still matches input order.
pub fn run_batch(
    orchestrator: &Arc<InferenceOrchestrator>,
    locations: &[BatchLocation],
    concurrency: usize,
    show_progress: bool,
) -> Result<Vec<BatchRecord>> {
    info!(
        "Processing {} location(s), concurrency {}",
        locations.len(),
        concurrency.max(1)
    );
    let pb = progress::create_progress(locations.len(), "locations", show_progress);

    let records = if concurrency <= 1 || locations.len() <= 1 {
        locations
            .iter()
            .map(|location| {
                let record = run_item(orchestrator, location);
                progress::inc_progress(pb.as_ref());
                record
            })
            .collect()
    } else {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .max_blocking_threads(concurrency)
            .enable_all()
            .build()
            .map_err(|e| Error::Internal {
                message: format!("Failed to create async runtime: {e}"),
            })?;
        let records = runtime.block_on(run_concurrent(
            Arc::clone(orchestrator),
            locations.to_vec(),
            concurrency,
            pb.clone(),
        ));
        runtime.shutdown_background();
        records
    };

    let failed = records.iter().filter(|r| r.is_error()).count();
    progress::finish_progress(pb, "done");
    info!(
        "Batch complete: {} succeeded, {} failed",
        records.len() - failed,
        failed
    );
    Ok(records)
}

async fn run_concurrent(
    orchestrator: Arc<InferenceOrchestrator>,
    locations: Vec<BatchLocation>,
    concurrency: usize,
    pb: Option<indicatif::ProgressBar>,
) -> Vec<BatchRecord> {
    let semaphore = Arc::new(Semaphore::new(concurrency));

    let tasks = locations.into_iter().map(|location| {
        let orchestrator = Arc::clone(&orchestrator);
        let semaphore = Arc::clone(&semaphore);
        let pb = pb.clone();
        async move {
            let id = location.id.clone();
            let record = match semaphore.acquire_owned().await {
                Ok(permit) => {
                    let joined = tokio::task::spawn_blocking(move || {
                        let record = run_item(&orchestrator, &location);
                        drop(permit);
                        record
                    })
                    .await;
                    joined.unwrap_or_else(|e| {
                        warn!("Batch worker for {} failed: {}", id, e);
                        BatchRecord {
                            user_id: id,
                            outcome: BatchOutcome::Failure(ErrorRecord::new(format!(
                                "batch worker failed: {e}"
                            ))),
                        }
                    })
                }
                Err(e) => BatchRecord {
                    user_id: id,
                    outcome: BatchOutcome::Failure(ErrorRecord::new(format!(
                        "batch scheduler closed: {e}"
                    ))),
                },
            };
            progress::inc_progress(pb.as_ref());
            record
        }
    });

    join_all(tasks).await
}
