use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::canvas::PixelBuffer;

// ============================================================================
// SNAPSHOT — one buffer held on an undo/redo stack
// ============================================================================

/// A previously-current buffer plus the name of the filter that moved the
/// session past it (so "Undo Grayscale" / "Redo Grayscale" can be shown).
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub buffer: PixelBuffer,
    pub description: String,
}

// ============================================================================
// HISTORY MANAGER - linear undo/redo over whole-buffer snapshots
// ============================================================================

/// Undo/redo stacks for one image session. Most recent entry is last.
///
/// Undo and redo only move buffers between the stacks and the caller's
/// current slot; nothing is ever recomputed.
#[derive(Default)]
pub struct HistoryManager {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    /// Running byte total across both stacks.
    total_memory: usize,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `previous` as the state before a newly committed filter.
    /// Any redo history is discarded (branching is not kept).
    pub fn push(&mut self, previous: PixelBuffer, description: String) {
        for snap in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(snap.buffer.byte_size());
        }
        self.total_memory += previous.byte_size();
        self.undo_stack.push(Snapshot {
            buffer: previous,
            description,
        });
    }

    /// Swap `current` with the top of the undo stack; the replaced buffer
    /// goes onto the redo stack. Returns the undone step's description, or
    /// `None` (leaving `current` alone) when there is nothing to undo.
    pub fn undo(&mut self, current: &mut PixelBuffer) -> Option<String> {
        let snap = self.undo_stack.pop()?;
        let replaced = mem::replace(current, snap.buffer);
        self.total_memory = self.total_memory.saturating_sub(current.byte_size()) + replaced.byte_size();
        self.redo_stack.push(Snapshot {
            buffer: replaced,
            description: snap.description.clone(),
        });
        Some(snap.description)
    }

    /// Mirror of [`undo`](Self::undo).
    pub fn redo(&mut self, current: &mut PixelBuffer) -> Option<String> {
        let snap = self.redo_stack.pop()?;
        let replaced = mem::replace(current, snap.buffer);
        self.total_memory = self.total_memory.saturating_sub(current.byte_size()) + replaced.byte_size();
        self.undo_stack.push(Snapshot {
            buffer: replaced,
            description: snap.description.clone(),
        });
        Some(snap.description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|s| s.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|s| s.description.as_str())
    }

    /// All undo descriptions (most recent first)
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|s| s.description.clone()).collect()
    }

    /// Bytes of pixel data held by both stacks. Buffers shared with the
    /// current slot are counted too.
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

// ============================================================================
// PROCESSING HISTORY — process-wide log of applied filters
// ============================================================================

/// One applied filter: which image, which filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub image_name: String,
    pub filter_name: String,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image: {}, Filter: {}", self.image_name, self.filter_name)
    }
}

/// Append-only log shared by every session and batch job.
///
/// Clones share the same log. Appends go through a mutex, so the order
/// entries were appended in is the order they are listed in.
#[derive(Clone, Default)]
pub struct ProcessingHistory {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl ProcessingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&self, image_name: impl Into<String>, filter_name: impl Into<String>) {
        let entry = HistoryEntry {
            image_name: image_name.into(),
            filter_name: filter_name.into(),
        };
        crate::log_info!("History: {}", entry);
        self.lock().push(entry);
    }

    /// Snapshot of all entries in append order.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        // Poisoned: a push either happened or it didn't.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
