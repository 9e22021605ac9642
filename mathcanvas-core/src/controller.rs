//! # Canvas Controller
//!
//! Orchestrates input, the canvas store, the history and the serializer.
//! It is the only component that mutates the store.
//!
//! ```text
//!            down              up / cancel
//!   Idle ────────────▶ Capturing ──────────▶ Idle
//!                       │   ▲
//!                       └───┘ move
//! ```
//!
//! Pen gestures commit one stroke on `up`. Eraser gestures remove every
//! stroke their path touches and commit one history entry on `up`.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::builder::{BuilderConfig, StrokeBuilder};
use crate::canvas::{Canvas, CanvasStore, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::document::{from_document, to_document, Document, LoadReport};
use crate::event::{PointerEvent, PointerPhase};
use crate::history::{History, HistoryConfig, HistoryEntry};
use crate::repository::{DocumentId, DocumentRepository};
use crate::stroke::{Point, SharedStroke, StrokeId};
use crate::style::{palette, BackgroundTheme, Rgba, Tool};
use crate::{CanvasError, CanvasResult};

/// Top share of the canvas reserved for the host toolbar.
pub const DEFAULT_CONTROL_BAR_FRACTION: f64 = 0.12;

/// Configuration for a drawing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Initial background theme.
    pub background: BackgroundTheme,
    /// Sample accumulation settings.
    pub builder: BuilderConfig,
    /// Undo depth.
    pub history: HistoryConfig,
    /// Smallest selectable line width.
    pub min_line_width: f64,
    /// Largest selectable line width.
    pub max_line_width: f64,
    /// Line width at session start.
    pub default_line_width: f64,
    /// Eraser reach relative to the selected line width.
    pub eraser_width_multiplier: f64,
    /// Gestures starting in this top fraction of the canvas belong to the
    /// host toolbar and are ignored. Defaults to the top 12%; `0.0` disables
    /// the band for hosts that draw their toolbar elsewhere.
    pub control_bar_fraction: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            background: BackgroundTheme::default(),
            builder: BuilderConfig::default(),
            history: HistoryConfig::default(),
            min_line_width: 2.0,
            max_line_width: 15.0,
            default_line_width: 4.0,
            eraser_width_multiplier: 4.0,
            control_bar_fraction: DEFAULT_CONTROL_BAR_FRACTION,
        }
    }
}

impl ControllerConfig {
    /// Check that the settings describe a usable session.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidConfig`] naming the first bad setting.
    pub fn validate(&self) -> CanvasResult<()> {
        if !(self.min_line_width.is_finite() && self.min_line_width > 0.0) {
            return Err(invalid(format!(
                "min_line_width must be positive, got {}",
                self.min_line_width
            )));
        }
        if !(self.max_line_width.is_finite() && self.max_line_width >= self.min_line_width) {
            return Err(invalid(format!(
                "max_line_width must be at least min_line_width ({}), got {}",
                self.min_line_width, self.max_line_width
            )));
        }
        if !self.default_line_width.is_finite() {
            return Err(invalid(format!(
                "default_line_width must be finite, got {}",
                self.default_line_width
            )));
        }
        if !(self.eraser_width_multiplier.is_finite() && self.eraser_width_multiplier > 0.0) {
            return Err(invalid(format!(
                "eraser_width_multiplier must be positive, got {}",
                self.eraser_width_multiplier
            )));
        }
        if !(0.0..1.0).contains(&self.control_bar_fraction) {
            return Err(invalid(format!(
                "control_bar_fraction must be in [0, 1), got {}",
                self.control_bar_fraction
            )));
        }
        let spacing = self.builder.min_sample_distance;
        if !(spacing.is_finite() && spacing >= 0.0) {
            return Err(invalid(format!(
                "builder.min_sample_distance must be non-negative, got {spacing}"
            )));
        }
        Ok(())
    }

    /// Clamp `width` into the selectable range. An inverted range yields
    /// `max_line_width`.
    fn clamp_width(&self, width: f64) -> f64 {
        width.max(self.min_line_width).min(self.max_line_width)
    }
}

fn invalid(message: String) -> CanvasError {
    CanvasError::InvalidConfig(message)
}

/// Currently selected tool and style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSettings {
    /// Pen or eraser.
    pub tool: Tool,
    /// Ink colour for new pen strokes.
    pub color: Rgba,
    /// Line width for new strokes.
    pub width: f64,
}

/// Gesture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    /// No pointer is down.
    Idle,
    /// A gesture with this tool is being captured.
    Capturing(Tool),
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// The event was not consumed.
    Ignored,
    /// The sample joined the pen gesture in progress.
    Capturing,
    /// An eraser sample removed this many strokes.
    Erased(usize),
    /// A pen gesture ended and its stroke was committed.
    Committed(StrokeId),
    /// An eraser gesture ended having removed this many strokes in total.
    EraseCommitted(usize),
    /// The gesture was discarded.
    Cancelled,
}

/// Removals of one eraser gesture, indexed against the canvas as it was
/// before the gesture (or before the last flush).
#[derive(Debug, Default)]
struct EraseAccumulator {
    removed: Vec<(usize, SharedStroke)>,
    total: usize,
}

impl EraseAccumulator {
    /// Merge a batch whose indices refer to the current store.
    fn absorb(&mut self, batch: Vec<(usize, SharedStroke)>) {
        self.total += batch.len();
        let mapped: Vec<_> = batch
            .into_iter()
            .map(|(index, stroke)| (self.original_index(index), stroke))
            .collect();
        self.removed.extend(mapped);
        self.removed.sort_by_key(|(index, _)| *index);
    }

    fn original_index(&self, current: usize) -> usize {
        let mut original = current;
        for (removed, _) in &self.removed {
            if *removed <= original {
                original += 1;
            } else {
                break;
            }
        }
        original
    }

    fn take_entry(&mut self) -> Option<HistoryEntry> {
        if self.removed.is_empty() {
            return None;
        }
        Some(HistoryEntry::EraseStrokes {
            removed: std::mem::take(&mut self.removed),
        })
    }
}

/// The drawing session: one canvas, one history, at most one gesture.
#[derive(Debug)]
pub struct CanvasController {
    config: ControllerConfig,
    store: CanvasStore,
    history: History,
    builder: StrokeBuilder,
    settings: ToolSettings,
    erasing: Option<EraseAccumulator>,
}

impl Default for CanvasController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl CanvasController {
    /// Start a session with an empty canvas.
    ///
    /// The configuration is taken as given; use
    /// [`CanvasController::try_new`] for settings read from outside.
    #[must_use]
    pub fn new(config: ControllerConfig) -> Self {
        let mut store = CanvasStore::new(config.width, config.height);
        store.set_background(config.background);
        let width = config.clamp_width(config.default_line_width);
        Self {
            store,
            history: History::with_config(config.history),
            builder: StrokeBuilder::with_config(config.builder),
            settings: ToolSettings {
                tool: Tool::Pen,
                color: palette::CHARCOAL,
                width,
            },
            erasing: None,
            config,
        }
    }

    /// Validate `config` and start a session with an empty canvas.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidConfig`] if
    /// [`ControllerConfig::validate`] rejects the settings.
    pub fn try_new(config: ControllerConfig) -> CanvasResult<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Live canvas, immediately paintable after any mutation.
    #[must_use]
    pub const fn canvas(&self) -> &Canvas {
        self.store.canvas()
    }

    /// Committed strokes in paint order.
    #[must_use]
    pub fn strokes(&self) -> &[SharedStroke] {
        self.store.strokes()
    }

    /// Copy of the canvas for a reader on another thread.
    #[must_use]
    pub fn snapshot(&self) -> Canvas {
        self.store.snapshot()
    }

    /// Undo/redo stacks.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Selected tool and style.
    #[must_use]
    pub const fn tool_settings(&self) -> ToolSettings {
        self.settings
    }

    /// Current gesture state.
    #[must_use]
    pub fn gesture_state(&self) -> GestureState {
        self.builder
            .active_tool()
            .map_or(GestureState::Idle, GestureState::Capturing)
    }

    /// Samples of the pen gesture in progress, for live rendering.
    #[must_use]
    pub fn in_progress(&self) -> Option<&[Point]> {
        match self.builder.active_tool() {
            Some(Tool::Pen) => self.builder.in_progress(),
            _ => None,
        }
    }

    /// Check if any stroke is on the canvas.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.store.is_empty()
    }

    /// Strokes created at or after `since_ms` (Unix milliseconds).
    #[must_use]
    pub fn recent_strokes(&self, since_ms: u64) -> Vec<SharedStroke> {
        self.store.strokes_since(since_ms).cloned().collect()
    }

    /// Check if there is anything to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
            || self
                .erasing
                .as_ref()
                .is_some_and(|e| !e.removed.is_empty())
    }

    /// Check if there is anything to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // -----------------------------------------------------------------------
    // Pointer input
    // -----------------------------------------------------------------------

    /// Route a pointer event by phase.
    ///
    /// # Errors
    ///
    /// See [`CanvasController::on_pointer_down`].
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> CanvasResult<InputOutcome> {
        match event.phase {
            PointerPhase::Down => self.on_pointer_down(event),
            PointerPhase::Move => Ok(self.on_pointer_move(event)),
            PointerPhase::Up => self.on_pointer_up(event),
            PointerPhase::Cancel => self.cancel(),
        }
    }

    /// Start a gesture with the selected tool.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidGestureState`](crate::CanvasError::InvalidGestureState)
    /// if a gesture is already active, or
    /// [`CanvasError::InvalidPoint`](crate::CanvasError::InvalidPoint) for
    /// non-finite coordinates.
    pub fn on_pointer_down(&mut self, event: &PointerEvent) -> CanvasResult<InputOutcome> {
        let point = event.point();
        if self.in_control_bar(&point) && !self.builder.is_capturing() {
            tracing::debug!("Pointer down at y={} belongs to the control bar", point.y);
            return Ok(InputOutcome::Ignored);
        }

        let ToolSettings { tool, color, width } = self.settings;
        match tool {
            Tool::Pen => {
                self.builder.begin(point, color, width, tool)?;
                Ok(InputOutcome::Capturing)
            }
            Tool::Eraser => {
                let reach = width * self.config.eraser_width_multiplier;
                self.builder.begin(point, color, reach, tool)?;
                self.erasing = Some(EraseAccumulator::default());
                Ok(InputOutcome::Erased(self.sweep(&point, &point)))
            }
        }
    }

    /// Extend the gesture in progress.
    pub fn on_pointer_move(&mut self, event: &PointerEvent) -> InputOutcome {
        let point = event.point();
        match self.builder.active_tool() {
            None => InputOutcome::Ignored,
            Some(Tool::Pen) => {
                if self.builder.extend(point) {
                    InputOutcome::Capturing
                } else {
                    InputOutcome::Ignored
                }
            }
            Some(Tool::Eraser) => {
                let Some(prev) = self.builder.last_point().copied() else {
                    return InputOutcome::Ignored;
                };
                if self.builder.extend(point) {
                    InputOutcome::Erased(self.sweep(&prev, &point))
                } else {
                    InputOutcome::Ignored
                }
            }
        }
    }

    /// Finish the gesture in progress, committing its effect to history.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store rejects the new stroke, which
    /// indicates a corrupted session.
    pub fn on_pointer_up(&mut self, event: &PointerEvent) -> CanvasResult<InputOutcome> {
        if !self.builder.is_capturing() {
            return Ok(InputOutcome::Ignored);
        }
        self.on_pointer_move(event);
        let Some(stroke) = self.builder.finish() else {
            return Ok(InputOutcome::Ignored);
        };

        match stroke.tool() {
            Tool::Pen => {
                let stroke = SharedStroke::new(stroke);
                let id = stroke.id();
                self.store.append(SharedStroke::clone(&stroke))?;
                self.history.record(HistoryEntry::AddStroke { stroke });
                tracing::debug!("Committed stroke {id}");
                Ok(InputOutcome::Committed(id))
            }
            Tool::Eraser => {
                let total = self.erasing.as_ref().map_or(0, |e| e.total);
                self.flush_erase();
                self.erasing = None;
                tracing::debug!("Eraser gesture removed {total} strokes");
                Ok(InputOutcome::EraseCommitted(total))
            }
        }
    }

    /// Discard the gesture in progress.
    ///
    /// Strokes an unfinished eraser gesture removed are put back.
    ///
    /// # Errors
    ///
    /// Returns an error if restoring erased strokes fails, which indicates a
    /// corrupted session.
    pub fn cancel(&mut self) -> CanvasResult<InputOutcome> {
        if !self.builder.cancel() {
            return Ok(InputOutcome::Ignored);
        }
        if let Some(entry) = self.erasing.take().and_then(|mut e| e.take_entry()) {
            entry.revert(&mut self.store)?;
        }
        Ok(InputOutcome::Cancelled)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Undo the most recent action. Returns `None` when there is nothing to
    /// undo.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas no longer matches the history, which
    /// indicates a corrupted session. The canvas and both stacks are then
    /// left as they were.
    pub fn undo(&mut self) -> CanvasResult<Option<HistoryEntry>> {
        self.flush_erase();
        let Some(entry) = self.history.peek_undo() else {
            return Ok(None);
        };
        if let Err(e) = entry.revert(&mut self.store) {
            tracing::error!("Undo of {} failed: {}", entry.kind(), e);
            return Err(e);
        }
        Ok(self.history.undo().cloned())
    }

    /// Redo the most recently undone action. Returns `None` when there is
    /// nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas no longer matches the history, which
    /// indicates a corrupted session. The canvas and both stacks are then
    /// left as they were.
    pub fn redo(&mut self) -> CanvasResult<Option<HistoryEntry>> {
        self.flush_erase();
        let Some(entry) = self.history.peek_redo() else {
            return Ok(None);
        };
        if let Err(e) = entry.apply(&mut self.store) {
            tracing::error!("Redo of {} failed: {}", entry.kind(), e);
            return Err(e);
        }
        Ok(self.history.redo().cloned())
    }

    /// Remove every stroke as one undoable action. Returns the number removed.
    ///
    /// Clearing an empty canvas records nothing.
    pub fn clear(&mut self) -> usize {
        self.flush_erase();
        let removed = self.store.clear();
        let count = removed.len();
        if count > 0 {
            tracing::info!("Cleared {count} strokes");
            self.history.record(HistoryEntry::ClearCanvas { removed });
        }
        count
    }

    /// Remove whole strokes touched by a circle at `point`, as one undoable
    /// action. Returns the number removed.
    pub fn erase_at(&mut self, point: Point, radius: f64) -> usize {
        self.flush_erase();
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        let removed = self.store.remove_where(|s| s.hit_by(&point, &point, radius));
        let count = removed.len();
        if count > 0 {
            self.history.record(HistoryEntry::EraseStrokes { removed });
        }
        count
    }

    /// Change the background theme as an undoable action.
    pub fn set_background(&mut self, theme: BackgroundTheme) {
        self.flush_erase();
        let old = self.store.set_background(theme);
        if old != theme {
            self.history
                .record(HistoryEntry::SetBackground { old, new: theme });
        }
    }

    /// Change the background theme by name.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownTheme`](crate::CanvasError::UnknownTheme)
    /// and leaves the background unchanged if `name` is not a theme.
    pub fn set_background_named(&mut self, name: &str) -> CanvasResult<()> {
        let theme = name.parse()?;
        self.set_background(theme);
        Ok(())
    }

    /// Select the tool for the next gesture.
    pub fn set_tool(&mut self, tool: Tool) {
        self.settings.tool = tool;
    }

    /// Select the ink colour for the next pen stroke.
    pub fn set_color(&mut self, color: Rgba) {
        self.settings.color = color;
    }

    /// Select the line width, clamped to the configured range. Non-finite
    /// values are ignored. Returns the width now in effect.
    pub fn set_width(&mut self, width: f64) -> f64 {
        if width.is_finite() {
            self.settings.width = self.config.clamp_width(width);
        }
        self.settings.width
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Serialize the canvas as it is right now.
    #[must_use]
    pub fn document(&self) -> Document {
        to_document(self.store.canvas())
    }

    /// Save the canvas through `repo`.
    ///
    /// The document is captured before this returns, so input handled while
    /// the returned future is pending does not leak into the save.
    pub fn save<'r, R>(&self, repo: &'r R) -> impl Future<Output = CanvasResult<DocumentId>> + 'r
    where
        R: DocumentRepository + ?Sized,
    {
        let document = self.document();
        async move {
            let id = repo.save(&document).await?;
            tracing::info!("Saved canvas as {id}");
            Ok(id)
        }
    }

    /// Replace the canvas with a document's contents.
    ///
    /// Both history stacks are cleared and any gesture in progress is
    /// dropped. On error the session is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::SchemaVersion`](crate::CanvasError::SchemaVersion)
    /// or [`CanvasError::MalformedDocument`](crate::CanvasError::MalformedDocument).
    pub fn load(&mut self, document: &Document) -> CanvasResult<LoadReport> {
        let loaded = from_document(document)?;
        self.store.restore(loaded.canvas)?;
        if self.builder.cancel() {
            tracing::debug!("Gesture in progress dropped by load");
        }
        self.erasing = None;
        self.history.clear();
        tracing::info!(
            "Loaded canvas with {} strokes ({} skipped)",
            self.store.len(),
            loaded.report.skipped.len()
        );
        Ok(loaded.report)
    }

    /// Fetch a document from `repo` and load it.
    ///
    /// # Errors
    ///
    /// Returns the repository's error, or any error from
    /// [`CanvasController::load`].
    pub async fn load_from<R>(&mut self, repo: &R, id: &DocumentId) -> CanvasResult<LoadReport>
    where
        R: DocumentRepository + ?Sized,
    {
        let document = repo.load(id).await?;
        self.load(&document)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn in_control_bar(&self, point: &Point) -> bool {
        self.config.control_bar_fraction > 0.0
            && point.y < f64::from(self.store.canvas().height) * self.config.control_bar_fraction
    }

    /// Erase along one eraser segment. Returns the number of strokes removed.
    fn sweep(&mut self, from: &Point, to: &Point) -> usize {
        let radius = self.eraser_radius();
        let batch = self.store.remove_where(|s| s.hit_by(from, to, radius));
        let count = batch.len();
        if let Some(acc) = self.erasing.as_mut() {
            acc.absorb(batch);
        }
        count
    }

    fn eraser_radius(&self) -> f64 {
        self.settings.width * self.config.eraser_width_multiplier / 2.0
    }

    /// Record removals of the eraser gesture in progress so far.
    fn flush_erase(&mut self) {
        if let Some(entry) = self.erasing.as_mut().and_then(EraseAccumulator::take_entry) {
            self.history.record(entry);
        }
    }
}
