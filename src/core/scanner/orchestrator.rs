// src/core/scanner/orchestrator.rs

use tracing::{debug, error, info};

use crate::core::models::{FetchResult, ScanTask, TaskResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};

/// Anything that can turn one task into one outcome. Implementations must not
/// fail: every problem is expressed as a failed [`FetchResult`].
#[async_trait]
pub trait CertificateFetcher: Send + Sync {
    async fn fetch(&self, task: &ScanTask) -> FetchResult;
}

/// Runs every task with at most `concurrency` in flight.
///
/// Each task runs in its own tokio task, so a panic or a hung endpoint only
/// affects its own entry. The returned list has exactly one entry per input
/// task, sorted by (address, port, mode).
pub async fn run_tasks(tasks: Vec<ScanTask>, fetcher: Arc<dyn CertificateFetcher>, concurrency: usize) -> Vec<TaskResult> {
    let total = tasks.len();
    info!(tasks = total, concurrency, "Dispatching scan tasks.");

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let (tx, mut rx) = mpsc::channel::<(usize, FetchResult)>(total.max(1));

    for (index, task) in tasks.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let fetcher = Arc::clone(&fetcher);
        let tx = tx.clone();
        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            debug!(task = %task, "Task started.");
            let result = fetcher.fetch(&task).await;
            if tx.send((index, result)).await.is_err() {
                debug!(task = %task, "Result receiver dropped.");
            }
        });
    }
    drop(tx);

    let mut slots: Vec<Option<FetchResult>> = vec![None; total];
    while let Some((index, result)) = rx.recv().await {
        slots[index] = Some(result);
    }

    let mut results: Vec<TaskResult> = tasks
        .into_iter()
        .zip(slots)
        .map(|(task, slot)| {
            let result = slot.unwrap_or_else(|| {
                error!(task = %task, "Task ended without a result.");
                FetchResult::failure("task aborted")
            });
            TaskResult { task, result }
        })
        .collect();

    results.sort_by(|a, b| a.task.sort_key().cmp(&b.task.sort_key()));
    info!(
        ok = results.iter().filter(|r| r.result.success).count(),
        failed = results.iter().filter(|r| !r.result.success).count(),
        "All scan tasks finished."
    );
    results
}
