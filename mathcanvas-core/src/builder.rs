//! # Stroke Builder
//!
//! Accumulates the samples of one continuous pointer gesture into a
//! [`Stroke`]. The builder never touches the canvas; the controller decides
//! what happens to the finished stroke.
//!
//! ```text
//! begin ──▶ extend* ──▶ finish ──▶ Some(stroke)
//!               │
//!               └──▶ cancel ──▶ (discarded)
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::stroke::{Point, Stroke, StrokeId};
use crate::style::{Rgba, Tool};
use crate::{CanvasError, CanvasResult};

/// Configuration for sample accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Samples closer than this to the previous one are dropped.
    pub min_sample_distance: f64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            min_sample_distance: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Gesture {
    id: StrokeId,
    points: Vec<Point>,
    color: Rgba,
    width: f64,
    tool: Tool,
}

/// Turns one pointer gesture into one stroke.
#[derive(Debug, Default)]
pub struct StrokeBuilder {
    config: BuilderConfig,
    active: Option<Gesture>,
}

impl StrokeBuilder {
    /// Create a builder with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Whether a gesture is being captured.
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// Tool of the gesture in progress.
    #[must_use]
    pub fn active_tool(&self) -> Option<Tool> {
        self.active.as_ref().map(|g| g.tool)
    }

    /// Samples of the gesture in progress, for live rendering.
    #[must_use]
    pub fn in_progress(&self) -> Option<&[Point]> {
        self.active.as_ref().map(|g| g.points.as_slice())
    }

    /// Most recently accepted sample of the gesture in progress.
    #[must_use]
    pub fn last_point(&self) -> Option<&Point> {
        self.active.as_ref().and_then(|g| g.points.last())
    }

    /// Start a new gesture at `point`.
    ///
    /// # Errors
    ///
    /// - [`CanvasError::InvalidGestureState`] if a gesture is already in progress.
    ///   This indicates a bug in the host's input routing.
    /// - [`CanvasError::InvalidPoint`] if `point` is not finite.
    /// - [`CanvasError::InvalidStroke`] if `width` is not a positive finite number.
    pub fn begin(&mut self, point: Point, color: Rgba, width: f64, tool: Tool) -> CanvasResult<()> {
        if self.active.is_some() {
            tracing::error!("begin() called while a gesture is already being captured");
            return Err(CanvasError::InvalidGestureState(
                "gesture already in progress",
            ));
        }
        if !point.is_finite() {
            return Err(CanvasError::InvalidPoint {
                x: point.x,
                y: point.y,
            });
        }
        if !(width.is_finite() && width > 0.0) {
            return Err(CanvasError::InvalidStroke(format!("width {width}")));
        }

        let id = StrokeId::new();
        tracing::debug!("Gesture {id} started with {tool:?}");
        self.active = Some(Gesture {
            id,
            points: vec![point],
            color,
            width,
            tool,
        });
        Ok(())
    }

    /// Append a sample to the gesture in progress.
    ///
    /// Returns `true` if the sample was recorded. Samples are dropped (not an
    /// error) when no gesture is active, when they are non-finite, when they
    /// go back in time, or when they lie within the minimum sample distance of
    /// the previous sample.
    pub fn extend(&mut self, point: Point) -> bool {
        let Some(gesture) = self.active.as_mut() else {
            tracing::debug!("extend() without an active gesture ignored");
            return false;
        };
        if !point.is_finite() {
            tracing::warn!("Dropping non-finite sample ({}, {})", point.x, point.y);
            return false;
        }
        // Gestures always hold at least the begin() sample.
        let Some(last) = gesture.points.last() else {
            gesture.points.push(point);
            return true;
        };
        if point.t < last.t {
            tracing::warn!(
                "Dropping out-of-order sample at t={} (last t={})",
                point.t,
                last.t
            );
            return false;
        }
        if point.distance_to(last) < self.config.min_sample_distance {
            return false;
        }
        gesture.points.push(point);
        true
    }

    /// Complete the gesture.
    ///
    /// Returns the stroke if a gesture was active (a tap yields a one-point
    /// dot) and `None` if `begin` was never called. Internal state is reset
    /// either way.
    pub fn finish(&mut self) -> Option<Stroke> {
        let gesture = self.active.take()?;
        let count = gesture.points.len();
        match Stroke::from_parts(
            gesture.id,
            gesture.points,
            gesture.color,
            gesture.width,
            gesture.tool,
            current_timestamp_ms(),
        ) {
            Ok(stroke) => {
                tracing::debug!("Gesture {} finished with {count} points", stroke.id());
                Some(stroke)
            }
            Err(e) => {
                tracing::error!("Finished gesture failed validation: {e}");
                None
            }
        }
    }

    /// Discard the gesture in progress. Returns `true` if one was active.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.active.take();
        if let Some(ref gesture) = cancelled {
            tracing::debug!("Gesture {} cancelled", gesture.id);
        }
        cancelled.is_some()
    }
}

/// Get the current Unix timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        // Timestamp will not exceed u64 max for millennia
        #[allow(clippy::cast_possible_truncation)]
        {
            d.as_millis() as u64
        }
    })
}
