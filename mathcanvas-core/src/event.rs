//! Pointer input delivered by the host's input source.

use serde::{Deserialize, Serialize};

use crate::stroke::Point;

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Pen or finger touched the surface.
    Down,
    /// Pen or finger dragged.
    Move,
    /// Pen or finger lifted.
    Up,
    /// Gesture interrupted (e.g., palm rejection).
    Cancel,
}

/// A single pointer event.
///
/// The input source guarantees at most one active gesture and monotonically
/// increasing timestamps within a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// X position in canvas coordinates.
    pub x: f64,
    /// Y position in canvas coordinates.
    pub y: f64,
    /// Pressure (0.0 to 1.0, if available).
    #[serde(default)]
    pub pressure: Option<f64>,
    /// Phase of this event.
    pub phase: PointerPhase,
    /// Timestamp in milliseconds since canvas start.
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl PointerEvent {
    /// Create a new pointer event without pressure.
    #[must_use]
    pub const fn new(phase: PointerPhase, x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            pressure: None,
            phase,
            timestamp_ms,
        }
    }

    /// Shorthand for a `Down` event.
    #[must_use]
    pub const fn down(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Down, x, y, timestamp_ms)
    }

    /// Shorthand for a `Move` event.
    #[must_use]
    pub const fn moved(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Move, x, y, timestamp_ms)
    }

    /// Shorthand for an `Up` event.
    #[must_use]
    pub const fn up(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Up, x, y, timestamp_ms)
    }

    /// Attach a pressure reading.
    #[must_use]
    pub const fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// The sample this event contributes to a stroke.
    #[must_use]
    pub const fn point(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
            pressure: self.pressure,
            t: self.timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let json = r#"{"x": 1.5, "y": 2.0, "phase": "move", "timestamp_ms": 7}"#;
        let event: PointerEvent = serde_json::from_str(json).expect("parse");
        assert_eq!(event, PointerEvent::moved(1.5, 2.0, 7));
        assert!(event.pressure.is_none());
    }

    #[test]
    fn test_point_carries_pressure_and_time() {
        let point = PointerEvent::down(3.0, 4.0, 42).with_pressure(0.5).point();
        assert_eq!(point.pressure, Some(0.5));
        assert_eq!(point.t, 42);
    }
}
