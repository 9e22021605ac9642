//! # History Manager
//!
//! Bounded, inversion-based undo/redo.
//!
//! ```text
//!   record ──▶ [undo stack, cap 50] ──undo──▶ [redo stack]
//!                     ▲                            │
//!                     └────────────redo────────────┘
//! ```
//!
//! The history never touches the canvas store itself. It hands back the entry
//! and the controller applies [`HistoryEntry::revert`] or
//! [`HistoryEntry::apply`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::canvas::CanvasStore;
use crate::stroke::SharedStroke;
use crate::style::BackgroundTheme;
use crate::{CanvasError, CanvasResult};

/// Default undo capacity.
pub const MAX_UNDO_STACK: usize = 50;

/// A reversible mutation of the canvas.
///
/// Each variant carries exactly what it needs to be undone and redone
/// without consulting any other state.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    /// A stroke was committed on top of the canvas.
    AddStroke {
        /// The committed stroke.
        stroke: SharedStroke,
    },
    /// The canvas was cleared.
    ClearCanvas {
        /// Everything that was removed, in paint order.
        removed: Vec<SharedStroke>,
    },
    /// The background theme changed.
    SetBackground {
        /// Theme before the change.
        old: BackgroundTheme,
        /// Theme after the change.
        new: BackgroundTheme,
    },
    /// An eraser gesture removed a subset of strokes.
    EraseStrokes {
        /// `(original_index, stroke)` pairs in ascending index order.
        removed: Vec<(usize, SharedStroke)>,
    },
}

impl HistoryEntry {
    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AddStroke { .. } => "add-stroke",
            Self::ClearCanvas { .. } => "clear-canvas",
            Self::SetBackground { .. } => "set-background",
            Self::EraseStrokes { .. } => "erase-strokes",
        }
    }

    /// Undo this entry against the store.
    ///
    /// The store is left untouched when this fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the store no longer matches the state this entry
    /// describes (a stroke to remove is missing, or one to restore is
    /// already present).
    pub fn revert(&self, store: &mut CanvasStore) -> CanvasResult<()> {
        self.check_revert(store)?;
        match self {
            Self::AddStroke { stroke } => {
                store.remove(stroke.id())?;
            }
            Self::ClearCanvas { removed } => {
                for stroke in removed {
                    store.append(SharedStroke::clone(stroke))?;
                }
            }
            Self::SetBackground { old, .. } => {
                store.set_background(*old);
            }
            Self::EraseStrokes { removed } => {
                for (index, stroke) in removed {
                    store.insert_at(*index, SharedStroke::clone(stroke))?;
                }
            }
        }
        Ok(())
    }

    /// Redo this entry against the store.
    ///
    /// The store is left untouched when this fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the store no longer matches the state this entry
    /// expects.
    pub fn apply(&self, store: &mut CanvasStore) -> CanvasResult<()> {
        self.check_apply(store)?;
        match self {
            Self::AddStroke { stroke } => {
                store.append(SharedStroke::clone(stroke))?;
            }
            Self::ClearCanvas { .. } => {
                store.clear();
            }
            Self::SetBackground { new, .. } => {
                store.set_background(*new);
            }
            Self::EraseStrokes { removed } => {
                for (_, stroke) in removed {
                    store.remove(stroke.id())?;
                }
            }
        }
        Ok(())
    }

    /// Check that [`HistoryEntry::revert`] would succeed against `store`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::StrokeNotFound`] or
    /// [`CanvasError::DuplicateStroke`] naming the first mismatch.
    pub fn check_revert(&self, store: &CanvasStore) -> CanvasResult<()> {
        match self {
            Self::AddStroke { stroke } => require_present(store, stroke),
            Self::ClearCanvas { removed } => {
                removed.iter().try_for_each(|s| require_absent(store, s))
            }
            Self::SetBackground { .. } => Ok(()),
            Self::EraseStrokes { removed } => removed
                .iter()
                .try_for_each(|(_, s)| require_absent(store, s)),
        }
    }

    /// Check that [`HistoryEntry::apply`] would succeed against `store`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::StrokeNotFound`] or
    /// [`CanvasError::DuplicateStroke`] naming the first mismatch.
    pub fn check_apply(&self, store: &CanvasStore) -> CanvasResult<()> {
        match self {
            Self::AddStroke { stroke } => require_absent(store, stroke),
            Self::ClearCanvas { .. } | Self::SetBackground { .. } => Ok(()),
            Self::EraseStrokes { removed } => removed
                .iter()
                .try_for_each(|(_, s)| require_present(store, s)),
        }
    }
}

fn require_present(store: &CanvasStore, stroke: &SharedStroke) -> CanvasResult<()> {
    if store.contains(stroke.id()) {
        Ok(())
    } else {
        Err(CanvasError::StrokeNotFound(stroke.id().to_string()))
    }
}

fn require_absent(store: &CanvasStore, stroke: &SharedStroke) -> CanvasResult<()> {
    if store.contains(stroke.id()) {
        Err(CanvasError::DuplicateStroke(stroke.id().to_string()))
    } else {
        Ok(())
    }
}

/// Configuration for the history manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum undo depth; older entries are evicted.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_UNDO_STACK,
        }
    }
}

/// Undo and redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    /// Oldest entry at the front.
    undo: VecDeque<HistoryEntry>,
    /// Most recently undone entry at the back.
    redo: Vec<HistoryEntry>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create an empty history with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    /// Create an empty history with a custom configuration.
    ///
    /// A capacity of zero disables undo entirely.
    #[must_use]
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            undo: VecDeque::with_capacity(config.capacity.min(MAX_UNDO_STACK)),
            redo: Vec::new(),
            capacity: config.capacity,
        }
    }

    /// Maximum undo depth.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a freshly performed action.
    ///
    /// Clears the redo stack and evicts the oldest entry when over capacity.
    /// Evicting only forgets how to undo; it never touches the canvas.
    pub fn record(&mut self, entry: HistoryEntry) {
        if !self.redo.is_empty() {
            tracing::debug!("Discarding {} redo entries", self.redo.len());
            self.redo.clear();
        }
        tracing::debug!("Recording {}", entry.kind());
        self.push_undo(entry);
    }

    /// Newest undoable entry, left in place.
    #[must_use]
    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        self.undo.back()
    }

    /// Newest redoable entry, left in place.
    #[must_use]
    pub fn peek_redo(&self) -> Option<&HistoryEntry> {
        self.redo.last()
    }

    /// Move the newest entry to the redo stack and return it for reverting.
    ///
    /// Returns `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        let entry = self.undo.pop_back()?;
        tracing::debug!("Undo {}", entry.kind());
        self.redo.push(entry);
        self.redo.last()
    }

    /// Move the newest undone entry back to the undo stack and return it for
    /// re-applying.
    ///
    /// Returns `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let entry = self.redo.pop()?;
        tracing::debug!("Redo {}", entry.kind());
        self.push_undo(entry);
        self.undo.back()
    }

    /// Check if there is anything to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Check if there is anything to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undoable entries.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Number of redoable entries.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.undo.len() >= self.capacity {
            if let Some(evicted) = self.undo.pop_front() {
                tracing::debug!("Evicting oldest history entry ({})", evicted.kind());
            }
        }
        self.undo.push_back(entry);
    }
}
