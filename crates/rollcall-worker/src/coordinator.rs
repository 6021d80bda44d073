//! Task coordinator: submit, dispatch and poll.
//!
//! `submit` reconstructs the link and stores its QR image on the caller's
//! path, then hands the portal submission to a background task and returns.
//! Pollers read snapshots from the [`TaskRegistry`].
//!
//! Shutdown: [`TaskCoordinator::shutdown`] stops the registry pruner. Running
//! submissions are not cancelled; each is bounded by the submitter's stage
//! budgets.

use chrono::{Local, Utc};
use rollcall_core::models::{
    AttendanceRecord, Completion, ConversionMode, ConversionRequest, Credentials,
    SubmissionError, SubmissionTask,
};
use rollcall_core::{AttendanceLink, Config, FormatError};
use rollcall_db::RecordStore;
use rollcall_services::{
    AttendanceSubmitter, Confirmation, FailedSubmission, LinkReconstructor, QrError, QrGenerator,
    ReconstructionError, SubmissionStage,
};
use rollcall_storage::keys::{artifact_key, confirmation_filename, error_filename, qr_filename};
use rollcall_storage::{ArtifactKind, Storage, StorageError};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use crate::registry::{Claim, TaskRegistry};

const PNG: &str = "image/png";

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Browser sessions allowed to run at once.
    pub max_concurrent_submissions: usize,
    /// How long finished tasks stay pollable.
    pub task_retention: Duration,
    pub prune_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_submissions: 2,
            task_retention: Duration::from_secs(24 * 3600),
            prune_interval: Duration::from_secs(600),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent_submissions: config.max_concurrent_submissions(),
            task_retention: Duration::from_secs(
                config.task_retention_hours().saturating_mul(3600),
            ),
            ..Self::default()
        }
    }
}

/// Synchronous failures of `submit`. No task exists when one is returned.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),

    #[error("failed to render QR code: {0}")]
    Qr(#[from] QrError),

    #[error("failed to store QR code: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new background submission was started.
    Scheduled,
    /// A submission for the same link was already in flight.
    Attached,
    /// Attendance for this module, link and day was already recorded.
    Deduplicated,
}

impl Display for SubmitOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SubmitOutcome::Scheduled => write!(f, "scheduled"),
            SubmitOutcome::Attached => write!(f, "attached"),
            SubmitOutcome::Deduplicated => write!(f, "deduplicated"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub task: SubmissionTask,
    pub outcome: SubmitOutcome,
}

impl SubmitReceipt {
    fn new(task: SubmissionTask, outcome: SubmitOutcome) -> Self {
        Self { task, outcome }
    }
}

struct Inner {
    reconstructor: LinkReconstructor,
    submitter: AttendanceSubmitter,
    qr: QrGenerator,
    storage: Arc<dyn Storage>,
    records: Arc<dyn RecordStore>,
    registry: TaskRegistry,
    permits: Arc<Semaphore>,
}

#[derive(Clone)]
pub struct TaskCoordinator {
    inner: Arc<Inner>,
    shutdown_tx: mpsc::Sender<()>,
}

impl TaskCoordinator {
    /// Build the coordinator and start the registry pruner. Must be called
    /// inside a tokio runtime.
    pub fn new(
        reconstructor: LinkReconstructor,
        submitter: AttendanceSubmitter,
        storage: Arc<dyn Storage>,
        records: Arc<dyn RecordStore>,
        config: CoordinatorConfig,
    ) -> Self {
        let inner = Arc::new(Inner {
            reconstructor,
            submitter,
            qr: QrGenerator::default(),
            storage,
            records,
            registry: TaskRegistry::new(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_submissions.max(1))),
        });

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(prune_loop(Arc::downgrade(&inner), config, shutdown_rx));

        tracing::info!("Task coordinator started");
        Self { inner, shutdown_tx }
    }

    /// Reconstruct the request's link and schedule its submission.
    ///
    /// Reconstruction and QR failures are returned here; submission failures
    /// only ever show up on the polled task.
    #[tracing::instrument(skip(self, request), fields(module_name = %request.module_name, mode = %request.mode))]
    pub async fn submit(&self, request: ConversionRequest) -> Result<SubmitReceipt, CoordinatorError> {
        let converted = self
            .inner
            .reconstructor
            .reconstruct(&request.original_link, request.mode)
            .await?;

        self.schedule(
            request.module_name,
            request.mode,
            request.original_link.raw().to_string(),
            converted,
            request.credentials,
        )
        .await
    }

    /// Schedule a submission for a link that was converted earlier.
    #[tracing::instrument(skip(self, original_link, credentials))]
    pub async fn submit_converted(
        &self,
        module_name: String,
        mode: ConversionMode,
        converted_link: &str,
        original_link: Option<String>,
        credentials: Credentials,
    ) -> Result<SubmitReceipt, CoordinatorError> {
        let converted = self.inner.reconstructor.codec().parse(converted_link)?;
        let original = original_link.unwrap_or_else(|| converted.raw().to_string());
        self.schedule(module_name, mode, original, converted, credentials)
            .await
    }

    /// Render and store a QR image for `link`. Returns the storage key.
    pub async fn store_qr(&self, link: &AttendanceLink) -> Result<String, CoordinatorError> {
        let png = self.inner.qr.render_png(link.raw())?;
        self.persist_qr(&qr_filename(Local::now()), png).await
    }

    async fn persist_qr(&self, filename: &str, png: Vec<u8>) -> Result<String, CoordinatorError> {
        let key = self
            .inner
            .storage
            .store(ArtifactKind::Qr, filename, PNG, png)
            .await?;
        Ok(key)
    }

    /// Current snapshot of a task.
    pub fn poll(&self, task_id: Uuid) -> Option<SubmissionTask> {
        self.inner.registry.snapshot(task_id)
    }

    pub fn tracked_tasks(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn reconstructor(&self) -> &LinkReconstructor {
        &self.inner.reconstructor
    }

    pub async fn shutdown(&self) {
        tracing::info!("Stopping task coordinator");
        let _ = self.shutdown_tx.send(()).await;
    }

    /// The QR image is rendered up front but only stored once this call owns
    /// the task, so attaching callers leave no artifact behind.
    async fn schedule(
        &self,
        module_name: String,
        mode: ConversionMode,
        original_link: String,
        converted: AttendanceLink,
        credentials: Credentials,
    ) -> Result<SubmitReceipt, CoordinatorError> {
        let inner = &self.inner;

        if let Some(active) = inner.registry.active_for(converted.raw()) {
            tracing::info!(task_id = %active.task_id(), "Submission already in flight, attaching");
            return Ok(SubmitReceipt::new(active, SubmitOutcome::Attached));
        }

        let png = inner.qr.render_png(converted.raw())?;
        let filename = qr_filename(Local::now());
        let today = Local::now().date_naive();

        match inner.records.find(&module_name, converted.raw(), today).await {
            Ok(Some(record)) if record.is_succeeded() => {
                let qr_ref = self.persist_qr(&filename, png).await?;
                let task = SubmissionTask::from_existing_record(
                    mode,
                    original_link,
                    converted,
                    qr_ref,
                    &record,
                );
                tracing::info!(
                    task_id = %task.task_id(),
                    record_id = %record.id,
                    "Attendance already recorded today, skipping submission"
                );
                inner.registry.insert_terminal(task.clone());
                return Ok(SubmitReceipt::new(task, SubmitOutcome::Deduplicated));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Record lookup failed, continuing without dedup");
            }
        }

        let qr_ref = artifact_key(ArtifactKind::Qr, &filename)?;
        let task = SubmissionTask::pending(module_name, mode, original_link, converted, qr_ref);
        let task = match inner.registry.claim(task) {
            Claim::Scheduled(task) => task,
            Claim::Attached(task) => return Ok(SubmitReceipt::new(task, SubmitOutcome::Attached)),
            Claim::Completed(task) => {
                return Ok(SubmitReceipt::new(task, SubmitOutcome::Deduplicated))
            }
        };

        if let Err(e) = self.persist_qr(&filename, png).await {
            inner.registry.discard(task.task_id());
            return Err(e);
        }

        tracing::info!(
            task_id = %task.task_id(),
            converted_link = %task.converted_link(),
            "Submission scheduled"
        );
        tokio::spawn(run_submission(inner.clone(), task.clone(), credentials));
        Ok(SubmitReceipt::new(task, SubmitOutcome::Scheduled))
    }
}

#[tracing::instrument(skip_all, fields(task_id = %task.task_id()))]
async fn run_submission(inner: Arc<Inner>, task: SubmissionTask, credentials: Credentials) {
    let task_id = task.task_id();

    // The semaphore is never closed, so acquiring only waits.
    let _permit = inner.permits.clone().acquire_owned().await.ok();

    if let Err(e) = inner.registry.update(task_id, SubmissionTask::start) {
        tracing::error!(error = %e, "Failed to start task");
        return;
    }

    let started = Instant::now();
    let job = {
        let inner = inner.clone();
        let link = task.converted_link().clone();
        tokio::spawn(async move { inner.submitter.submit(&link, &credentials).await })
    };

    let outcome = match job.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Submission job did not complete");
            let message = if e.is_panic() {
                "browser automation panicked".to_string()
            } else {
                "browser automation was cancelled".to_string()
            };
            Err(FailedSubmission {
                stage: SubmissionStage::Failed,
                error: SubmissionError::Aborted { message },
                screenshot: None,
            })
        }
    };

    tracing::info!(
        duration_ms = started.elapsed().as_millis() as u64,
        succeeded = outcome.is_ok(),
        "Submission finished"
    );
    finish(&inner, &task, outcome).await;
}

/// Store evidence, write the record, then publish the terminal snapshot.
/// Storage failures are noted on the task and never change the outcome.
async fn finish(
    inner: &Inner,
    task: &SubmissionTask,
    outcome: Result<Confirmation, FailedSubmission>,
) {
    let now = Local::now();
    let (screenshot, failure) = match outcome {
        Ok(confirmation) => (confirmation.screenshot, None),
        Err(failed) => (failed.screenshot, Some(failed.error)),
    };
    let mut storage_errors = Vec::new();

    let screenshot_ref = match screenshot {
        Some(png) => {
            let filename = match failure {
                None => confirmation_filename(now),
                Some(_) => error_filename(now),
            };
            match inner
                .storage
                .store(ArtifactKind::Screenshot, &filename, PNG, png)
                .await
            {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to store screenshot");
                    storage_errors.push(format!("screenshot: {}", e));
                    None
                }
            }
        }
        None => None,
    };

    let record = AttendanceRecord::for_outcome(
        task,
        now.date_naive(),
        screenshot_ref.clone(),
        failure.as_ref(),
    );
    let record_id = match inner.records.save(&record).await {
        Ok(()) => Some(record.id),
        Err(e) => {
            tracing::error!(error = %e, "Failed to save attendance record");
            storage_errors.push(format!("record: {}", e));
            None
        }
    };

    let completion = Completion {
        screenshot_ref,
        record_id,
        storage_error: (!storage_errors.is_empty()).then(|| storage_errors.join("; ")),
    };

    let task_id = task.task_id();
    let published = match failure {
        None => inner.registry.update(task_id, |t| t.succeed(completion)),
        Some(error) => inner.registry.update(task_id, |t| t.fail(error, completion)),
    };
    match published {
        Ok(snapshot) => tracing::info!(status = %snapshot.status(), "Task finished"),
        Err(e) => tracing::error!(error = %e, "Failed to publish task outcome"),
    }
}

async fn prune_loop(inner: Weak<Inner>, config: CoordinatorConfig, mut shutdown_rx: mpsc::Receiver<()>) {
    let mut interval = tokio::time::interval(config.prune_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let Ok(retention) = chrono::Duration::from_std(config.task_retention) else {
        tracing::warn!("Task retention out of range, pruning disabled");
        return;
    };

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                let removed = inner.registry.prune(Utc::now() - retention);
                if removed > 0 {
                    tracing::debug!(removed, "Pruned finished tasks");
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
    tracing::debug!("Task pruner stopped");
}
