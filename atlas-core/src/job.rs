//! Asynchronous job runner.
//!
//! Each job runs a recipe as its own tokio task and reports through a
//! [`JobStatus`] cell. Only the job's task and its supervisor hold the
//! `watch::Sender` for the cell; the job table keeps a `watch::Receiver`, so
//! everyone else reads snapshots. The supervisor turns a panicking pipeline
//! into a `failed` status. Cancellation is cooperative: `cancel_job` trips a
//! per-job token that the task checks at every checkpoint and races against
//! every step delay.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use atlas_graphs::SourceModule;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::AtlasConfig;
use crate::contracts::job_steps;
use crate::error::{AtlasError, JobError, Result, panic_message};
use crate::progress::ProgressListener;
use crate::recipe::{Recipe, RecipeEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub modules_touched: usize,
    pub transformations_applied: usize,
}

/// Snapshot of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: String,
    pub status: JobState,
    /// 0 to 100, non-decreasing within a job.
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

impl JobStatus {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobState::Pending,
            progress: 0.0,
            current_step: None,
            error: None,
            result: None,
        }
    }
}

#[derive(Debug)]
struct JobEntry {
    status: watch::Receiver<JobStatus>,
    cancel: watch::Sender<bool>,
}

type JobTable = HashMap<String, JobEntry>;

/// Runs recipes as tracked, cancellable background jobs.
///
/// Cloning shares the job table. Methods that spawn must be called from
/// within a tokio runtime.
#[derive(Debug, Clone)]
pub struct JobRunner {
    jobs: Arc<RwLock<JobTable>>,
    engine: Arc<RecipeEngine>,
    step_delay: Duration,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::from_config(&AtlasConfig::default())
    }
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AtlasConfig) -> Self {
        Self {
            jobs: Arc::default(),
            engine: Arc::new(RecipeEngine::new()),
            step_delay: config.jobs.step_delay(),
        }
    }

    #[must_use]
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, JobTable> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, JobTable> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register job `id` and spawn its pipeline.
    ///
    /// Fails without touching the table when a job with this id is pending
    /// or running; a finished job with the same id is replaced. Returns the
    /// registration snapshot, not the outcome.
    pub fn start_job(
        &self,
        id: &str,
        recipe: Arc<dyn Recipe>,
        modules: Vec<SourceModule>,
        listener: Arc<dyn ProgressListener>,
    ) -> Result<JobStatus> {
        let initial = JobStatus::pending(id);
        let (status_tx, status_rx) = watch::channel(initial.clone());
        let (cancel_tx, cancel_rx) = watch::channel(false);

        {
            let mut jobs = self.write();
            if let Some(existing) = jobs.get(id) {
                if !existing.status.borrow().status.is_terminal() {
                    return Err(JobError::AlreadyRunning(id.to_string()).into());
                }
            }
            jobs.insert(
                id.to_string(),
                JobEntry {
                    status: status_rx,
                    cancel: cancel_tx,
                },
            );
        }

        info!(
            job = id,
            recipe = recipe.id(),
            modules = modules.len(),
            "Job registered"
        );

        let task = JobTask {
            status: initial.clone(),
            tx: Arc::new(status_tx),
            cancel: cancel_rx,
            listener,
            engine: Arc::clone(&self.engine),
            recipe,
            modules,
            step_delay: self.step_delay,
        };
        tokio::spawn(task.supervise().instrument(info_span!("job", id)));

        Ok(initial)
    }

    /// Current snapshot of job `id`.
    pub fn get_status(&self, id: &str) -> Option<JobStatus> {
        self.read().get(id).map(|e| e.status.borrow().clone())
    }

    /// A receiver holding the current status and notified on every update.
    pub fn subscribe(&self, id: &str) -> Result<watch::Receiver<JobStatus>> {
        self.read()
            .get(id)
            .map(|e| e.status.clone())
            .ok_or_else(|| JobError::NotFound(id.to_string()).into())
    }

    /// Ids of every job started on this runner, sorted.
    pub fn job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ask a running job to stop and wait for it to settle.
    ///
    /// Returns true only if the job was running and ended `cancelled`. A job
    /// that finishes before seeing the request keeps its outcome.
    ///
    /// The wait has no bound: the token is only observed at checkpoints and
    /// step delays, so a recipe whose `plan` never returns holds the caller
    /// until it does. Use [`JobRunner::request_cancel`] to trip the token
    /// without waiting.
    pub async fn cancel_job(&self, id: &str) -> bool {
        let Some(mut status) = self.request_cancel(id) else {
            return false;
        };

        let observed = status
            .wait_for(|s| s.status.is_terminal())
            .await
            .map(|s| s.status)
            .ok();
        // the task only drops its sender after a terminal write
        let settled = observed.unwrap_or_else(|| status.borrow().status);
        debug!(job = id, state = %settled, "Cancellation settled");
        settled == JobState::Cancelled
    }

    /// Trip the cancellation token of a running job without waiting.
    ///
    /// Returns a receiver for the job's status, or `None` when the job is
    /// unknown or not running.
    pub fn request_cancel(&self, id: &str) -> Option<watch::Receiver<JobStatus>> {
        let jobs = self.read();
        let entry = jobs.get(id)?;
        if entry.status.borrow().status != JobState::Running {
            return None;
        }
        entry.cancel.send_replace(true);
        Some(entry.status.clone())
    }
}

/// Why a pipeline stopped early.
enum Halt {
    Cancelled,
    Failed(String),
}

impl From<AtlasError> for Halt {
    fn from(err: AtlasError) -> Self {
        Self::Failed(err.to_string())
    }
}

/// State owned by one job's task.
struct JobTask {
    status: JobStatus,
    tx: Arc<watch::Sender<JobStatus>>,
    cancel: watch::Receiver<bool>,
    listener: Arc<dyn ProgressListener>,
    engine: Arc<RecipeEngine>,
    recipe: Arc<dyn Recipe>,
    modules: Vec<SourceModule>,
    step_delay: Duration,
}

impl JobTask {
    /// Run the pipeline on its own task and fail the job if it panics.
    async fn supervise(self) {
        let tx = Arc::clone(&self.tx);
        let listener = Arc::clone(&self.listener);
        let Err(err) = tokio::spawn(self.run().in_current_span()).await else {
            return;
        };

        let mut status = tx.borrow().clone();
        if status.status.is_terminal() {
            return;
        }
        let message = if err.is_panic() {
            format!("Job panicked: {}", panic_message(err.into_panic().as_ref()))
        } else {
            "Job task was aborted".to_string()
        };
        warn!(progress = status.progress, error = %message, "Job failed");
        status.status = JobState::Failed;
        status.error = Some(message);
        tx.send_replace(status.clone());
        listener.on_status(&status);
    }

    async fn run(mut self) {
        match self.pipeline().await {
            Ok(result) => {
                self.status.status = JobState::Completed;
                self.status.progress = 100.0;
                self.status.current_step = Some(job_steps::COMPLETED.to_string());
                info!(
                    transformations = result.transformations_applied,
                    "Job completed"
                );
                self.status.result = Some(result);
            }
            Err(Halt::Cancelled) => {
                self.status.status = JobState::Cancelled;
                self.status.current_step = Some(job_steps::CANCELLED.to_string());
                info!(progress = self.status.progress, "Job cancelled");
            }
            Err(Halt::Failed(message)) => {
                warn!(progress = self.status.progress, error = %message, "Job failed");
                self.status.status = JobState::Failed;
                self.status.error = Some(message);
            }
        }
        self.publish();
    }

    #[allow(clippy::cast_precision_loss)]
    async fn pipeline(&mut self) -> std::result::Result<JobResult, Halt> {
        self.advance(0.0, None);
        self.checkpoint().await?;

        self.advance(10.0, Some(job_steps::VALIDATING));
        self.engine
            .validate_recipe(self.recipe.as_ref(), &self.modules)
            .into_result()?;
        self.checkpoint().await?;

        self.advance(30.0, Some(job_steps::PLANNING));
        let plan = self.engine.execute(self.recipe.as_ref(), &self.modules)?;
        self.checkpoint().await?;

        self.advance(50.0, Some(job_steps::APPLYING));
        self.checkpoint().await?;

        let total = plan.steps.len();
        for (done, step) in (1..=total).zip(&plan.steps) {
            self.pause().await?;
            debug!(step = %step.id, transformation = %step.transformation.name, "Step applied");
            let label = format!("{} ({done}/{total})", job_steps::APPLYING);
            self.advance(50.0 + 50.0 * done as f64 / total as f64, Some(label.as_str()));
            self.checkpoint().await?;
        }

        Ok(JobResult {
            modules_touched: self.modules.len(),
            transformations_applied: total,
        })
    }

    /// Move to `running` at `progress`, never going backwards.
    fn advance(&mut self, progress: f64, step: Option<&str>) {
        self.status.status = JobState::Running;
        self.status.progress = self.status.progress.max(progress.clamp(0.0, 100.0));
        self.status.current_step = step.map(str::to_string);
        self.publish();
    }

    fn publish(&self) {
        self.tx.send_replace(self.status.clone());
        self.listener.on_status(&self.status);
    }

    async fn checkpoint(&self) -> std::result::Result<(), Halt> {
        tokio::task::yield_now().await;
        if *self.cancel.borrow() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Simulated per-step work, cut short by cancellation.
    async fn pause(&mut self) -> std::result::Result<(), Halt> {
        let sleep = tokio::time::sleep(self.step_delay);
        tokio::pin!(sleep);
        let tripped = tokio::select! {
            () = &mut sleep => return Ok(()),
            changed = self.cancel.wait_for(|c| *c) => changed.is_ok(),
        };
        if tripped {
            return Err(Halt::Cancelled);
        }
        // The runner is gone, so nothing can cancel any more.
        sleep.await;
        Ok(())
    }
}
