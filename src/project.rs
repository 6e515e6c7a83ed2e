use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::canvas::PixelBuffer;
use crate::components::history::HistoryManager;
use crate::io::{ImageIoError, decode_image, display_name};
use crate::ops::filters::{self, FilterError, FilterSpec};

/// Stable identifier for one open image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Single open image and its processing lineage.
pub struct ImageSession {
    pub id: SessionId,
    /// Display name (file name), used in history entries and output names.
    pub name: String,
    /// `None` for images that didn't come from a file.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    original: PixelBuffer,
    /// `None` until the first filter is committed; reads fall back to `original`.
    current: Option<PixelBuffer>,
    history: HistoryManager,
}

impl ImageSession {
    pub fn new(name: impl Into<String>, buffer: PixelBuffer) -> Self {
        Self {
            id: SessionId::new(),
            name: name.into(),
            path: None,
            is_dirty: false,
            original: buffer,
            current: None,
            history: HistoryManager::new(),
        }
    }

    /// Decode `path` and open it as a new session.
    pub fn from_file(path: &Path) -> Result<Self, ImageIoError> {
        let buffer = decode_image(path)?;
        let mut session = Self::new(display_name(path), buffer);
        session.path = Some(path.to_path_buf());
        Ok(session)
    }

    /// The buffer filters read from: the last committed result, or the
    /// original if nothing has been applied.
    pub fn current(&self) -> &PixelBuffer {
        self.current.as_ref().unwrap_or(&self.original)
    }

    pub fn original(&self) -> &PixelBuffer {
        &self.original
    }

    /// Whether a filter has ever been committed to this session.
    pub fn has_processed(&self) -> bool {
        self.current.is_some()
    }

    /// Run `spec` on the current buffer and commit the result.
    /// On error nothing changes.
    pub fn apply_filter(&mut self, spec: &FilterSpec) -> Result<PixelBuffer, FilterError> {
        let result = filters::apply(self.current(), spec)?;
        Ok(self.commit(result, spec.to_string()))
    }

    /// Install `result` as the new current buffer. The buffer it replaces
    /// goes onto the undo stack and the redo stack is discarded.
    pub fn commit(&mut self, result: PixelBuffer, description: String) -> PixelBuffer {
        let previous = self.current().clone();
        self.history.push(previous, description);
        self.current = Some(result.clone());
        self.is_dirty = true;
        result
    }

    /// Step back one filter. `None` (and no change) when there's nothing to undo.
    pub fn undo(&mut self) -> Option<PixelBuffer> {
        if !self.history.can_undo() {
            return None;
        }
        let current = self.current.get_or_insert_with(|| self.original.clone());
        self.history.undo(current)?;
        self.is_dirty = true;
        Some(current.clone())
    }

    pub fn redo(&mut self) -> Option<PixelBuffer> {
        if !self.history.can_redo() {
            return None;
        }
        let current = self.current.get_or_insert_with(|| self.original.clone());
        self.history.redo(current)?;
        self.is_dirty = true;
        Some(current.clone())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.history.redo_description()
    }

    pub fn undo_count(&self) -> usize {
        self.history.undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.history.redo_count()
    }

    /// Filters that can be undone, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.history.undo_history()
    }

    /// Bytes held by the undo and redo stacks.
    pub fn memory_usage(&self) -> usize {
        self.history.memory_usage()
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}
