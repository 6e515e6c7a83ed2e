//! FilterFE: per-image color filters with undo/redo, background jobs and
//! batch processing.

#[macro_use]
pub mod logger;
#[macro_use]
pub mod i18n;

pub mod app;
pub mod batch;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod jobs;
pub mod notify;
pub mod ops;
pub mod project;
pub mod settings;

pub use app::{Workspace, WorkspaceError, WorkspaceEvent};
pub use batch::{BatchCoordinator, BatchOptions, BatchProgress, BatchResult};
pub use canvas::PixelBuffer;
pub use components::history::{HistoryEntry, ProcessingHistory};
pub use jobs::{CancelToken, JobError, JobId, TaskOutcome, TaskRunner};
pub use ops::filters::{FilterError, FilterSpec};
pub use project::{ImageSession, SessionId};
pub use settings::Settings;
