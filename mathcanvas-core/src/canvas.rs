//! # Canvas Store
//!
//! The authoritative ordered collection of committed strokes. Paint order is
//! insertion order: later strokes render on top regardless of their ids.
//! Nothing here is undoable on its own; the controller layers history on top.

use std::collections::HashSet;
use std::sync::Arc;

use crate::stroke::{SharedStroke, Stroke, StrokeId};
use crate::style::BackgroundTheme;
use crate::{CanvasError, CanvasResult};

/// Default canvas width in pixels.
pub const DEFAULT_WIDTH: u32 = 800;

/// Default canvas height in pixels.
pub const DEFAULT_HEIGHT: u32 = 600;

/// A full copy of canvas state, as handed to renderers and the serializer.
///
/// Cloning is cheap: strokes are shared, never copied.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    /// Background theme.
    pub background: BackgroundTheme,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Strokes in paint order (first = bottom).
    pub strokes: Vec<SharedStroke>,
}

impl Canvas {
    /// Create an empty canvas with the default background.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            background: BackgroundTheme::default(),
            width,
            height,
            strokes: Vec::new(),
        }
    }

    /// Set the background theme.
    #[must_use]
    pub fn with_background(mut self, background: BackgroundTheme) -> Self {
        self.background = background;
        self
    }

    /// Check if the canvas has no strokes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

/// Single-writer store of committed strokes plus canvas metadata.
#[derive(Debug, Clone, Default)]
pub struct CanvasStore {
    canvas: Canvas,
    ids: HashSet<StrokeId>,
}

impl CanvasStore {
    /// Create an empty store with the given dimensions.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Canvas::new(width, height),
            ids: HashSet::new(),
        }
    }

    /// Read-only view of the live canvas.
    #[must_use]
    pub const fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Strokes in paint order.
    #[must_use]
    pub fn strokes(&self) -> &[SharedStroke] {
        &self.canvas.strokes
    }

    /// Get a stroke by ID.
    #[must_use]
    pub fn get(&self, id: StrokeId) -> Option<&SharedStroke> {
        self.canvas.strokes.iter().find(|s| s.id() == id)
    }

    /// Whether a stroke with this id is on the canvas.
    #[must_use]
    pub fn contains(&self, id: StrokeId) -> bool {
        self.ids.contains(&id)
    }

    /// Get the number of strokes on the canvas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.canvas.strokes.len()
    }

    /// Check if the canvas has no strokes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canvas.strokes.is_empty()
    }

    /// Current background theme.
    #[must_use]
    pub const fn background(&self) -> BackgroundTheme {
        self.canvas.background
    }

    /// Strokes created at or after `since_ms` (Unix milliseconds), in paint order.
    pub fn strokes_since(&self, since_ms: u64) -> impl Iterator<Item = &SharedStroke> {
        self.canvas
            .strokes
            .iter()
            .filter(move |s| s.created_at() >= since_ms)
    }

    /// Add a stroke on top of the z-order.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DuplicateStroke`] if the id is already present.
    pub fn append(&mut self, stroke: impl Into<SharedStroke>) -> CanvasResult<()> {
        let stroke = stroke.into();
        self.claim_id(&stroke)?;
        self.canvas.strokes.push(stroke);
        Ok(())
    }

    /// Insert a stroke at `index` in the z-order (clamped to the end).
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DuplicateStroke`] if the id is already present.
    pub fn insert_at(&mut self, index: usize, stroke: impl Into<SharedStroke>) -> CanvasResult<()> {
        let stroke = stroke.into();
        self.claim_id(&stroke)?;
        let index = index.min(self.canvas.strokes.len());
        self.canvas.strokes.insert(index, stroke);
        Ok(())
    }

    /// Remove a stroke by identity, returning its former index and the stroke.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::StrokeNotFound`] if no stroke has this id.
    pub fn remove(&mut self, id: StrokeId) -> CanvasResult<(usize, SharedStroke)> {
        let index = self
            .canvas
            .strokes
            .iter()
            .position(|s| s.id() == id)
            .ok_or_else(|| CanvasError::StrokeNotFound(id.to_string()))?;
        self.ids.remove(&id);
        Ok((index, self.canvas.strokes.remove(index)))
    }

    /// Remove the topmost stroke.
    pub fn remove_last(&mut self) -> Option<SharedStroke> {
        let stroke = self.canvas.strokes.pop()?;
        self.ids.remove(&stroke.id());
        Some(stroke)
    }

    /// Remove every stroke matching `pred`.
    ///
    /// Returns `(original_index, stroke)` pairs in ascending index order, so
    /// re-inserting them in sequence restores the original z-order.
    pub fn remove_where<F>(&mut self, mut pred: F) -> Vec<(usize, SharedStroke)>
    where
        F: FnMut(&Stroke) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.canvas.strokes.len());
        for (index, stroke) in self.canvas.strokes.drain(..).enumerate() {
            if pred(&stroke) {
                removed.push((index, stroke));
            } else {
                kept.push(stroke);
            }
        }
        self.canvas.strokes = kept;
        for (_, stroke) in &removed {
            self.ids.remove(&stroke.id());
        }
        removed
    }

    /// Remove all strokes, returning them in paint order.
    pub fn clear(&mut self) -> Vec<SharedStroke> {
        self.ids.clear();
        std::mem::take(&mut self.canvas.strokes)
    }

    /// Change the background theme, returning the previous one.
    pub fn set_background(&mut self, theme: BackgroundTheme) -> BackgroundTheme {
        std::mem::replace(&mut self.canvas.background, theme)
    }

    /// Copy the full canvas state.
    #[must_use]
    pub fn snapshot(&self) -> Canvas {
        self.canvas.clone()
    }

    /// Replace the full canvas state.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DuplicateStroke`] if `canvas` repeats a stroke
    /// id; the store is left unchanged.
    pub fn restore(&mut self, canvas: Canvas) -> CanvasResult<()> {
        let mut ids = HashSet::with_capacity(canvas.strokes.len());
        for stroke in &canvas.strokes {
            if !ids.insert(stroke.id()) {
                return Err(CanvasError::DuplicateStroke(stroke.id().to_string()));
            }
        }
        self.canvas = canvas;
        self.ids = ids;
        Ok(())
    }

    fn claim_id(&mut self, stroke: &Arc<Stroke>) -> CanvasResult<()> {
        if self.ids.insert(stroke.id()) {
            Ok(())
        } else {
            Err(CanvasError::DuplicateStroke(stroke.id().to_string()))
        }
    }
}
