// ============================================================================
// BACKGROUND JOBS — off-thread work with progress, cancellation and a single
// terminal outcome delivered over a channel
// ============================================================================
//
// Each job runs on a rayon worker (`rayon::spawn` or a dedicated pool). The
// worker sends any number of `Progress` messages followed by exactly one
// `Finished` message; the owning context polls the channel and acts on
// results in the order they arrive.
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::io::ImageIoError;
use crate::ops::filters::FilterError;

/// Smallest progress step forwarded to the owner (except the final 1.0).
const PROGRESS_STEP: f32 = 0.01;

/// Job ids are unique across every runner in the process.
static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job #{}", self.0)
    }
}

// ============================================================================
// CANCELLATION
// ============================================================================

/// Shared flag a job polls to find out it should stop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ============================================================================
// ERRORS / OUTCOMES
// ============================================================================

#[derive(Debug)]
pub enum JobError {
    Filter(FilterError),
    Image(ImageIoError),
    /// The work panicked; payload message if it was a string.
    Panicked(String),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::Filter(e) => write!(f, "{}", e),
            JobError::Image(e) => write!(f, "{}", e),
            JobError::Panicked(msg) => write!(f, "Job panicked: {}", msg),
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JobError::Filter(e) => Some(e),
            JobError::Image(e) => Some(e),
            JobError::Panicked(_) => None,
        }
    }
}

impl From<FilterError> for JobError {
    fn from(e: FilterError) -> Self {
        JobError::Filter(e)
    }
}

impl From<ImageIoError> for JobError {
    fn from(e: ImageIoError) -> Self {
        JobError::Image(e)
    }
}

/// How a job ended. Exactly one of these is delivered per job.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Succeeded(T),
    Failed(JobError),
    /// Cancellation is not a failure. `partial` carries whatever the work
    /// returned anyway (a batch's files done so far); filter results found
    /// here must be discarded.
    Cancelled { partial: Option<T> },
}

#[derive(Debug)]
pub enum JobMessage<T> {
    Progress { job: JobId, fraction: f32 },
    Finished { job: JobId, outcome: TaskOutcome<T> },
}

// ============================================================================
// JOB CONTEXT — what the work closure sees
// ============================================================================

pub struct JobContext {
    job: JobId,
    cancel: CancelToken,
    last_progress: Mutex<f32>,
    emit: Box<dyn Fn(f32) + Send + Sync>,
}

impl JobContext {
    fn new(job: JobId, cancel: CancelToken, emit: Box<dyn Fn(f32) + Send + Sync>) -> Self {
        Self {
            job,
            cancel,
            last_progress: Mutex::new(-1.0),
            emit,
        }
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Report progress in [0, 1]. Values are clamped; anything not above the
    /// last forwarded value is dropped, so the owner only ever sees a
    /// non-decreasing sequence. Safe to call from several threads.
    pub fn report_progress(&self, fraction: f32) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let mut last = self.last_progress.lock().unwrap_or_else(|p| p.into_inner());
        let is_step = fraction >= *last + PROGRESS_STEP || (fraction >= 1.0 && *last < 1.0);
        if fraction > *last && is_step {
            *last = fraction;
            // Sent under the lock so messages leave in increasing order.
            (self.emit)(fraction);
        }
    }
}

// ============================================================================
// TASK RUNNER
// ============================================================================

/// Spawns jobs producing `T` and collects their messages on one channel.
pub struct TaskRunner<T> {
    sender: mpsc::Sender<JobMessage<T>>,
    receiver: mpsc::Receiver<JobMessage<T>>,
    pending: HashMap<JobId, CancelToken>,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl<T: Send + 'static> Default for TaskRunner<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> TaskRunner<T> {
    /// Runner on rayon's global pool.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            pending: HashMap::new(),
            pool: None,
        }
    }

    /// Runner on a dedicated pool of `threads` workers (0 = global pool).
    pub fn with_threads(threads: usize) -> Self {
        let mut runner = Self::new();
        if threads > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("filterfe-worker-{}", i))
                .build()
            {
                Ok(pool) => runner.pool = Some(Arc::new(pool)),
                Err(e) => crate::log_warn!("Worker pool unavailable ({}), using global pool", e),
            }
        }
        runner
    }

    /// Share another runner's worker pool (jobs of different result types
    /// then compete for the same threads).
    pub fn sharing_pool<U>(other: &TaskRunner<U>) -> Self {
        let mut runner = Self::new();
        runner.pool = other.pool.clone();
        runner
    }

    /// Run `work` in the background. The returned id tags every message the
    /// job produces.
    pub fn spawn<F>(&mut self, work: F) -> JobId
    where
        F: FnOnce(&JobContext) -> Result<T, JobError> + Send + 'static,
    {
        let job = JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed));

        let token = CancelToken::new();
        self.pending.insert(job, token.clone());

        let sender = self.sender.clone();
        let progress_sender = self.sender.clone();
        let task = move || {
            let ctx = JobContext::new(
                job,
                token.clone(),
                Box::new(move |fraction| {
                    let _ = progress_sender.send(JobMessage::Progress { job, fraction });
                }),
            );
            ctx.report_progress(0.0);

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| work(&ctx)));
            let outcome = match result {
                Ok(Ok(value)) if token.is_cancelled() => TaskOutcome::Cancelled {
                    partial: Some(value),
                },
                Ok(Ok(value)) => TaskOutcome::Succeeded(value),
                Ok(Err(_)) if token.is_cancelled() => TaskOutcome::Cancelled { partial: None },
                Ok(Err(e)) => TaskOutcome::Failed(e),
                Err(panic_info) => {
                    let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "unknown panic payload".to_string()
                    };
                    crate::log_err!("{} panicked: {}", job, msg);
                    TaskOutcome::Failed(JobError::Panicked(msg))
                }
            };
            let _ = sender.send(JobMessage::Finished { job, outcome });
        };

        match &self.pool {
            Some(pool) => pool.spawn(task),
            None => rayon::spawn(task),
        }
        job
    }

    /// Request cancellation. Returns `false` if the job isn't running (never
    /// existed or its outcome was already received). After `true`, the
    /// outcome delivered for `job` is `Cancelled`.
    pub fn cancel(&self, job: JobId) -> bool {
        match self.pending.get(&job) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, job: JobId) -> bool {
        self.pending.contains_key(&job)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Next message, if one is waiting.
    pub fn try_recv(&mut self) -> Option<JobMessage<T>> {
        let msg = self.receiver.try_recv().ok()?;
        Some(self.settle(msg))
    }

    /// Next message, waiting up to `timeout`. Returns `None` immediately
    /// when no job is pending.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<JobMessage<T>> {
        if self.pending.is_empty() {
            return self.try_recv();
        }
        let msg = self.receiver.recv_timeout(timeout).ok()?;
        Some(self.settle(msg))
    }

    /// Retire finished jobs. A job cancelled after its worker had already
    /// produced a value still ends as `Cancelled`.
    fn settle(&mut self, msg: JobMessage<T>) -> JobMessage<T> {
        match msg {
            JobMessage::Finished { job, outcome } => {
                let cancelled = self
                    .pending
                    .remove(&job)
                    .is_some_and(|token| token.is_cancelled());
                let outcome = match outcome {
                    TaskOutcome::Succeeded(value) if cancelled => TaskOutcome::Cancelled {
                        partial: Some(value),
                    },
                    TaskOutcome::Failed(_) if cancelled => TaskOutcome::Cancelled { partial: None },
                    other => other,
                };
                JobMessage::Finished { job, outcome }
            }
            progress => progress,
        }
    }
}
