use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::batch::{BatchCoordinator, BatchEvent, BatchOptions, BatchResult};
use crate::canvas::PixelBuffer;
use crate::components::history::ProcessingHistory;
use crate::io::{ImageIoError, filtered_output_path, save_png};
use crate::jobs::{JobContext, JobError, JobId, JobMessage, TaskOutcome, TaskRunner};
use crate::notify::{LogNotifier, Notifier, Severity};
use crate::ops::filters::{self, FilterError, FilterSpec};
use crate::project::{ImageSession, SessionId};
use crate::settings::Settings;

/// Sleep between polls while blocking on background jobs.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

// ============================================================================
// ERRORS / EVENTS
// ============================================================================

#[derive(Debug)]
pub enum WorkspaceError {
    UnknownSession(SessionId),
    /// A filter job for this session is still running.
    SessionBusy(SessionId),
    Filter(FilterError),
    Image(ImageIoError),
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceError::UnknownSession(id) => write!(f, "No open image with id {}", id),
            WorkspaceError::SessionBusy(id) => {
                write!(f, "Image {} is still being processed", id)
            }
            WorkspaceError::Filter(e) => write!(f, "{}", e),
            WorkspaceError::Image(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkspaceError::Filter(e) => Some(e),
            WorkspaceError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FilterError> for WorkspaceError {
    fn from(e: FilterError) -> Self {
        WorkspaceError::Filter(e)
    }
}

impl From<ImageIoError> for WorkspaceError {
    fn from(e: ImageIoError) -> Self {
        WorkspaceError::Image(e)
    }
}

/// Something that happened to a background job, as seen by [`Workspace::poll`].
#[derive(Debug)]
pub enum WorkspaceEvent {
    /// `session` is `None` for batch jobs.
    Progress {
        job: JobId,
        session: Option<SessionId>,
        fraction: f32,
    },
    /// The result has been committed to the session.
    FilterApplied {
        job: JobId,
        session: SessionId,
        filter: FilterSpec,
        buffer: PixelBuffer,
    },
    FilterFailed {
        job: JobId,
        session: SessionId,
        filter: FilterSpec,
        error: JobError,
    },
    FilterCancelled {
        job: JobId,
        session: SessionId,
        filter: FilterSpec,
    },
    BatchFinished { job: JobId, result: BatchResult },
    BatchFailed { job: JobId, error: JobError },
    BatchCancelled {
        job: JobId,
        partial: Option<BatchResult>,
    },
}

/// Filter job in flight: which session it will commit to, and what it does.
struct PendingFilter {
    session: SessionId,
    filter: FilterSpec,
}

// ============================================================================
// WORKSPACE — the coordinating context
// ============================================================================

/// All open images plus the machinery that processes them.
///
/// Filters run on background workers; their results only touch a session
/// when [`poll`](Self::poll) is called, so every commit happens on the
/// thread that owns the workspace, in the order jobs complete.
pub struct Workspace {
    sessions: Vec<ImageSession>,
    history: ProcessingHistory,
    settings: Settings,
    notifier: Arc<dyn Notifier>,

    filter_jobs: TaskRunner<PixelBuffer>,
    batch_jobs: TaskRunner<BatchResult>,
    pending_filters: HashMap<JobId, PendingFilter>,
    /// Session → its in-flight filter job (at most one).
    busy: HashMap<SessionId, JobId>,
    /// Batch job → number of files.
    batch_totals: HashMap<JobId, usize>,
}

impl Workspace {
    /// Workspace that reports outcomes to the session log.
    pub fn new(settings: Settings) -> Self {
        Self::with_notifier(settings, Arc::new(LogNotifier))
    }

    pub fn with_notifier(settings: Settings, notifier: Arc<dyn Notifier>) -> Self {
        let filter_jobs = TaskRunner::with_threads(settings.worker_threads);
        let batch_jobs = TaskRunner::sharing_pool(&filter_jobs);
        Self {
            sessions: Vec::new(),
            history: ProcessingHistory::new(),
            settings,
            notifier,
            filter_jobs,
            batch_jobs,
            pending_filters: HashMap::new(),
            busy: HashMap::new(),
            batch_totals: HashMap::new(),
        }
    }

    // ---- accessors ----------------------------------------------------------

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Process-wide log of applied filters.
    pub fn history(&self) -> &ProcessingHistory {
        &self.history
    }

    pub fn sessions(&self) -> &[ImageSession] {
        &self.sessions
    }

    pub fn session(&self, id: SessionId) -> Option<&ImageSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut ImageSession, WorkspaceError> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(WorkspaceError::UnknownSession(id))
    }

    pub fn output_dir(&self) -> &Path {
        &self.settings.output_dir
    }

    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) {
        self.settings.output_dir = dir.into();
    }

    /// Whether `id` has a filter job in flight.
    pub fn is_busy(&self, id: SessionId) -> bool {
        self.busy.contains_key(&id)
    }

    pub fn pending_jobs(&self) -> usize {
        self.filter_jobs.pending_count() + self.batch_jobs.pending_count()
    }

    pub fn is_idle(&self) -> bool {
        self.filter_jobs.is_idle() && self.batch_jobs.is_idle()
    }

    // ---- opening / closing --------------------------------------------------

    /// Decode `path` into a new session.
    pub fn open_image(&mut self, path: &Path) -> Result<SessionId, WorkspaceError> {
        match ImageSession::from_file(path) {
            Ok(session) => {
                crate::log_info!(
                    "Opened {} ({}x{})",
                    path.display(),
                    session.original().width(),
                    session.original().height()
                );
                let id = session.id;
                self.sessions.push(session);
                Ok(id)
            }
            Err(e) => {
                self.notifier.notify(
                    &t!("notify.error.title"),
                    &t!("notify.open_failed", path = path.display(), error = e),
                    Severity::Error,
                );
                Err(e.into())
            }
        }
    }

    /// Open several files. Each result stands alone; one bad file doesn't
    /// stop the rest from opening.
    pub fn open_images(&mut self, paths: &[PathBuf]) -> Vec<Result<SessionId, WorkspaceError>> {
        paths.iter().map(|p| self.open_image(p)).collect()
    }

    /// Adopt an already-decoded buffer as a new session.
    pub fn add_session(&mut self, name: impl Into<String>, buffer: PixelBuffer) -> SessionId {
        let session = ImageSession::new(name, buffer);
        let id = session.id;
        self.sessions.push(session);
        id
    }

    /// Close a session. A filter still running for it is cancelled and its
    /// result never reported.
    pub fn close_session(&mut self, id: SessionId) -> Result<ImageSession, WorkspaceError> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or(WorkspaceError::UnknownSession(id))?;
        if let Some(job) = self.busy.remove(&id) {
            self.filter_jobs.cancel(job);
            self.pending_filters.remove(&job);
        }
        let session = self.sessions.remove(index);
        crate::log_info!("Closed {}", session.name);
        Ok(session)
    }

    // ---- filters ------------------------------------------------------------

    /// Start `spec` on the session's current buffer in the background.
    /// The result is committed by a later [`poll`](Self::poll).
    pub fn request_filter(&mut self, id: SessionId, spec: FilterSpec) -> Result<JobId, WorkspaceError> {
        spec.validate()?;
        if self.busy.contains_key(&id) {
            return Err(WorkspaceError::SessionBusy(id));
        }
        self.spawn_filter_job(id, spec, move |ctx, source| {
            let result = filters::apply_with_progress(&source, &spec, &|fraction: f32| {
                ctx.report_progress(fraction);
                !ctx.is_cancelled()
            })?;
            Ok(result)
        })
    }

    /// Run `work` on the session's current buffer and track it as the
    /// session's in-flight filter.
    fn spawn_filter_job<F>(&mut self, id: SessionId, spec: FilterSpec, work: F) -> Result<JobId, WorkspaceError>
    where
        F: FnOnce(&JobContext, PixelBuffer) -> Result<PixelBuffer, JobError> + Send + 'static,
    {
        let session = self.session_mut(id)?;
        let source = session.current().clone();
        let name = session.name.clone();

        let job = self.filter_jobs.spawn(move |ctx| work(ctx, source));
        crate::log_info!("{}: {} on {}", job, spec, name);

        self.pending_filters.insert(job, PendingFilter { session: id, filter: spec });
        self.busy.insert(id, job);
        Ok(job)
    }

    /// Request `spec` on every open session. Each request is independent;
    /// a busy session is reported and skipped.
    pub fn apply_to_all(&mut self, spec: FilterSpec) -> Vec<(SessionId, Result<JobId, WorkspaceError>)> {
        let ids: Vec<SessionId> = self.sessions.iter().map(|s| s.id).collect();
        ids.into_iter()
            .map(|id| (id, self.request_filter(id, spec)))
            .collect()
    }

    /// Cancel a filter or batch job. `false` if it isn't running.
    pub fn cancel(&mut self, job: JobId) -> bool {
        self.filter_jobs.cancel(job) || self.batch_jobs.cancel(job)
    }

    // ---- undo / redo --------------------------------------------------------

    pub fn undo(&mut self, id: SessionId) -> Result<Option<PixelBuffer>, WorkspaceError> {
        if self.busy.contains_key(&id) {
            return Err(WorkspaceError::SessionBusy(id));
        }
        let session = self.session_mut(id)?;
        let description = session.undo_description().map(str::to_string);
        let restored = session.undo();
        if let Some(desc) = description.filter(|_| restored.is_some()) {
            crate::log_info!("Undo {} on {}", desc, session.name);
        }
        Ok(restored)
    }

    pub fn redo(&mut self, id: SessionId) -> Result<Option<PixelBuffer>, WorkspaceError> {
        if self.busy.contains_key(&id) {
            return Err(WorkspaceError::SessionBusy(id));
        }
        let session = self.session_mut(id)?;
        let description = session.redo_description().map(str::to_string);
        let restored = session.redo();
        if let Some(desc) = description.filter(|_| restored.is_some()) {
            crate::log_info!("Redo {} on {}", desc, session.name);
        }
        Ok(restored)
    }

    // ---- saving -------------------------------------------------------------

    /// Write the session's current buffer as PNG, to `destination` or to
    /// `<output_dir>/<name><suffix>.<ext>`. Returns the path written.
    pub fn save(&mut self, id: SessionId, destination: Option<&Path>) -> Result<PathBuf, WorkspaceError> {
        let output_dir = self.settings.output_dir.clone();
        let suffix = self.settings.filtered_suffix.clone();
        let notifier = Arc::clone(&self.notifier);
        let session = self.session_mut(id)?;

        let path = match destination {
            Some(p) => p.to_path_buf(),
            None => filtered_output_path(&output_dir, &session.name, &suffix),
        };

        match save_png(session.current(), &path) {
            Ok(()) => {
                session.mark_clean();
                crate::log_info!("Saved {} to {}", session.name, path.display());
                notifier.notify(
                    &t!("notify.success.title"),
                    &t!("notify.image_saved", path = path.display()),
                    Severity::Info,
                );
                Ok(path)
            }
            Err(e) => {
                notifier.notify(
                    &t!("notify.error.title"),
                    &t!("notify.save_failed", image = session.name, error = e),
                    Severity::Error,
                );
                Err(e.into())
            }
        }
    }

    // ---- batch --------------------------------------------------------------

    /// Run `filters` over `files` in the background, writing to the
    /// configured output directory.
    pub fn start_batch(&mut self, files: Vec<PathBuf>, filters: Vec<FilterSpec>) -> Result<JobId, WorkspaceError> {
        let options = BatchOptions::from_settings(&self.settings);
        self.start_batch_with(options, files, filters)
    }

    pub fn start_batch_with(
        &mut self,
        options: BatchOptions,
        files: Vec<PathBuf>,
        filters: Vec<FilterSpec>,
    ) -> Result<JobId, WorkspaceError> {
        for spec in &filters {
            spec.validate()?;
        }
        let total = files.len();
        let history = self.history.clone();
        let coordinator = BatchCoordinator::new(options);

        let job = self.batch_jobs.spawn(move |ctx| {
            coordinator.run(&files, &filters, ctx.cancel_token(), &history, |event| {
                if let BatchEvent::Finished { progress, .. } = event {
                    ctx.report_progress(progress.fraction());
                }
            })
        });
        crate::log_info!("{}: batch of {} file(s)", job, total);
        self.batch_totals.insert(job, total);
        Ok(job)
    }

    // ---- polling ------------------------------------------------------------

    /// Collect everything that happened since the last poll. Finished filter
    /// jobs are committed to their sessions here, in completion order.
    pub fn poll(&mut self) -> Vec<WorkspaceEvent> {
        let mut events = Vec::new();
        while let Some(msg) = self.filter_jobs.try_recv() {
            if let Some(event) = self.handle_filter_message(msg) {
                events.push(event);
            }
        }
        while let Some(msg) = self.batch_jobs.try_recv() {
            events.push(self.handle_batch_message(msg));
        }
        events
    }

    /// Block until no job is running; returns every event seen meanwhile.
    pub fn wait_idle(&mut self) -> Vec<WorkspaceEvent> {
        let mut events = self.poll();
        while !self.is_idle() {
            std::thread::sleep(POLL_INTERVAL);
            events.extend(self.poll());
        }
        events
    }

    /// Block until `job` has finished; returns every event seen meanwhile.
    pub fn wait_for(&mut self, job: JobId) -> Vec<WorkspaceEvent> {
        let mut events = self.poll();
        while self.filter_jobs.is_pending(job) || self.batch_jobs.is_pending(job) {
            std::thread::sleep(POLL_INTERVAL);
            events.extend(self.poll());
        }
        events
    }

    fn handle_filter_message(&mut self, msg: JobMessage<PixelBuffer>) -> Option<WorkspaceEvent> {
        match msg {
            JobMessage::Progress { job, fraction } => {
                // Jobs of closed sessions have no entry.
                let pending = self.pending_filters.get(&job)?;
                Some(WorkspaceEvent::Progress {
                    job,
                    session: Some(pending.session),
                    fraction,
                })
            }
            JobMessage::Finished { job, outcome } => {
                let PendingFilter { session: id, filter } = self.pending_filters.remove(&job)?;
                self.busy.remove(&id);
                let notifier = Arc::clone(&self.notifier);
                let history = self.history.clone();
                let session = self.sessions.iter_mut().find(|s| s.id == id)?;

                let event = match outcome {
                    TaskOutcome::Succeeded(buffer) => {
                        session.commit(buffer.clone(), filter.to_string());
                        history.add_entry(session.name.clone(), filter.to_string());
                        notifier.notify(
                            &t!("notify.success.title"),
                            &t!("notify.filter_applied", filter = filter, image = session.name),
                            Severity::Info,
                        );
                        WorkspaceEvent::FilterApplied {
                            job,
                            session: id,
                            filter,
                            buffer,
                        }
                    }
                    TaskOutcome::Failed(error) => {
                        crate::log_err!("{} failed on {}: {}", job, session.name, error);
                        notifier.notify(
                            &t!("notify.error.title"),
                            &t!("notify.filter_failed", image = session.name, error = error),
                            Severity::Error,
                        );
                        WorkspaceEvent::FilterFailed {
                            job,
                            session: id,
                            filter,
                            error,
                        }
                    }
                    TaskOutcome::Cancelled { .. } => {
                        crate::log_info!("{} cancelled on {}", job, session.name);
                        notifier.notify(
                            &t!("notify.cancelled.title"),
                            &t!("notify.filter_cancelled", image = session.name),
                            Severity::Warning,
                        );
                        WorkspaceEvent::FilterCancelled {
                            job,
                            session: id,
                            filter,
                        }
                    }
                };
                Some(event)
            }
        }
    }

    fn handle_batch_message(&mut self, msg: JobMessage<BatchResult>) -> WorkspaceEvent {
        match msg {
            JobMessage::Progress { job, fraction } => WorkspaceEvent::Progress {
                job,
                session: None,
                fraction,
            },
            JobMessage::Finished { job, outcome } => {
                let total = self.batch_totals.remove(&job).unwrap_or(0);
                match outcome {
                    TaskOutcome::Succeeded(result) => {
                        let (title, severity) = if result.failed.is_empty() {
                            (t!("notify.success.title"), Severity::Info)
                        } else {
                            (t!("notify.warning.title"), Severity::Warning)
                        };
                        self.notifier.notify(
                            &title,
                            &t!(
                                "notify.batch_finished",
                                succeeded = result.succeeded,
                                failed = result.failed.len()
                            ),
                            severity,
                        );
                        WorkspaceEvent::BatchFinished { job, result }
                    }
                    TaskOutcome::Failed(error) => {
                        self.notifier.notify(
                            &t!("notify.error.title"),
                            &t!("notify.batch_failed", error = error),
                            Severity::Error,
                        );
                        WorkspaceEvent::BatchFailed { job, error }
                    }
                    TaskOutcome::Cancelled { partial } => {
                        let completed = partial.as_ref().map(|r| r.processed()).unwrap_or(0);
                        self.notifier.notify(
                            &t!("notify.cancelled.title"),
                            &t!("notify.batch_cancelled", completed = completed, total = total),
                            Severity::Warning,
                        );
                        WorkspaceEvent::BatchCancelled { job, partial }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{ChannelNotifier, Notification};
    use std::sync::mpsc::Receiver;
    use tempfile::tempdir;

    fn workspace(output_dir: &Path) -> (Workspace, Receiver<Notification>) {
        let (notifier, rx) = ChannelNotifier::new();
        let settings = Settings {
            output_dir: output_dir.to_path_buf(),
            ..Settings::default()
        };
        (Workspace::with_notifier(settings, Arc::new(notifier)), rx)
    }

    fn red() -> PixelBuffer {
        PixelBuffer::solid(64, 64, [255, 0, 0, 255]).unwrap()
    }

    #[test]
    fn test_request_commit_and_history() {
        let dir = tempdir().unwrap();
        let (mut ws, rx) = workspace(dir.path());
        let id = ws.add_session("red.png", red());

        let job = ws.request_filter(id, FilterSpec::Grayscale).unwrap();
        assert!(ws.is_busy(id));
        let events = ws.wait_for(job);

        assert!(events.iter().any(|e| matches!(e, WorkspaceEvent::FilterApplied { job: j, .. } if *j == job)));
        assert!(!ws.is_busy(id));
        let session = ws.session(id).unwrap();
        assert_eq!(session.current().pixel(10, 10), Some([85, 85, 85, 255]));
        assert!(session.can_undo());

        let entries = ws.history().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].to_string(), "Image: red.png, Filter: Grayscale");

        let note = rx.try_recv().unwrap();
        assert_eq!(note.severity, Severity::Info);
    }

    #[test]
    fn test_second_request_while_busy_is_rejected() {
        let dir = tempdir().unwrap();
        let (mut ws, _rx) = workspace(dir.path());
        let id = ws.add_session("a", red());

        ws.request_filter(id, FilterSpec::Invert).unwrap();
        assert!(matches!(
            ws.request_filter(id, FilterSpec::Grayscale),
            Err(WorkspaceError::SessionBusy(_))
        ));
        assert!(matches!(ws.undo(id), Err(WorkspaceError::SessionBusy(_))));
        ws.wait_idle();
        assert_eq!(ws.session(id).unwrap().undo_count(), 1);
    }

    #[test]
    fn test_invalid_spec_rejected_up_front() {
        let dir = tempdir().unwrap();
        let (mut ws, _rx) = workspace(dir.path());
        let id = ws.add_session("a", red());
        let err = ws
            .request_filter(id, FilterSpec::Brightness { factor: 0.0 })
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Filter(FilterError::InvalidSpec(_))));
        assert!(!ws.is_busy(id));
        assert!(ws.is_idle());
    }

    #[test]
    fn test_unknown_session() {
        let dir = tempdir().unwrap();
        let (mut ws, _rx) = workspace(dir.path());
        let ghost = SessionId::new();
        assert!(matches!(ws.undo(ghost), Err(WorkspaceError::UnknownSession(_))));
        assert!(matches!(
            ws.request_filter(ghost, FilterSpec::Invert),
            Err(WorkspaceError::UnknownSession(_))
        ));
    }

    #[test]
    fn test_cancel_leaves_session_untouched() {
        let dir = tempdir().unwrap();
        let (mut ws, rx) = workspace(dir.path());
        let big = PixelBuffer::solid(512, 512, [10, 20, 30, 255]).unwrap();
        let id = ws.add_session("big", big.clone());

        let job = ws.request_filter(id, FilterSpec::Invert).unwrap();
        assert!(ws.cancel(job));
        let events = ws.wait_for(job);

        assert!(events.iter().any(|e| matches!(e, WorkspaceEvent::FilterCancelled { .. })));
        let session = ws.session(id).unwrap();
        assert!(session.current().ptr_eq(&big));
        assert!(!session.can_undo());
        assert!(ws.history().is_empty());
        assert!(rx.try_iter().any(|n| n.severity == Severity::Warning));
    }

    #[test]
    fn test_close_session_discards_late_result() {
        let dir = tempdir().unwrap();
        let (mut ws, _rx) = workspace(dir.path());
        let id = ws.add_session("gone", red());
        ws.request_filter(id, FilterSpec::Invert).unwrap();
        ws.close_session(id).unwrap();

        let events = ws.wait_idle();
        assert!(events.iter().all(|e| !matches!(
            e,
            WorkspaceEvent::FilterApplied { .. } | WorkspaceEvent::FilterCancelled { .. }
        )));
        assert!(ws.history().is_empty());
        assert!(ws.session(id).is_none());
    }

    #[test]
    fn test_failed_filter_leaves_session_and_history_alone() {
        let dir = tempdir().unwrap();
        let (mut ws, rx) = workspace(dir.path());
        let id = ws.add_session("red.png", red());
        let job = ws.request_filter(id, FilterSpec::Invert).unwrap();
        ws.wait_for(job);
        let before = ws.session(id).unwrap().current().clone();
        rx.try_iter().for_each(drop);

        let job = ws
            .spawn_filter_job(id, FilterSpec::Grayscale, |_, _| panic!("transform blew up"))
            .unwrap();
        let events = ws.wait_for(job);

        let failed = events.iter().find_map(|e| match e {
            WorkspaceEvent::FilterFailed { job: j, error, .. } if *j == job => Some(error),
            _ => None,
        });
        assert!(matches!(failed, Some(JobError::Panicked(msg)) if msg.contains("blew up")));
        assert!(!ws.is_busy(id));

        let session = ws.session(id).unwrap();
        assert!(session.current().ptr_eq(&before));
        assert_eq!(session.undo_count(), 1);
        assert!(!session.can_redo());
        assert_eq!(ws.history().len(), 1);

        let notes: Vec<Notification> = rx.try_iter().collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Error);

        // The session accepts new work afterwards.
        let job = ws.request_filter(id, FilterSpec::Grayscale).unwrap();
        ws.wait_for(job);
        assert_eq!(ws.session(id).unwrap().undo_count(), 2);
    }

    #[test]
    fn test_batch_with_failures_is_reported_as_warning() {
        let dir = tempdir().unwrap();
        let (mut ws, rx) = workspace(&dir.path().join("out"));
        let good = dir.path().join("good.png");
        save_png(&red(), &good).unwrap();
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"nope").unwrap();

        let job = ws.start_batch(vec![good, bad], vec![FilterSpec::Invert]).unwrap();
        ws.wait_for(job);

        let note = rx.try_iter().last().unwrap();
        assert_eq!(note.severity, Severity::Warning);
        assert_eq!(note.title, t!("notify.warning.title"));
        assert_ne!(note.title, t!("notify.success.title"));
    }

    #[test]
    fn test_save_uses_suffix_and_output_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("processed");
        let (mut ws, _rx) = workspace(&out);
        let id = ws.add_session("photo.png", red());
        let job = ws.request_filter(id, FilterSpec::Invert).unwrap();
        ws.wait_for(job);

        let path = ws.save(id, None).unwrap();
        assert_eq!(path, out.join("photo_filtered.png"));
        assert!(!ws.session(id).unwrap().is_dirty);
        let saved = crate::io::decode_image(&path).unwrap();
        assert_eq!(saved.pixel(0, 0), Some([0, 255, 255, 255]));
    }
}
