//! Strokes - the immutable building blocks of a drawing.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::style::{Rgba, Tool};
use crate::{CanvasError, CanvasResult};

/// Unique identifier for a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrokeId(Uuid);

impl StrokeId {
    /// Create a new unique stroke ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse the hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns the UUID parse error if `s` is not a UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for StrokeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One pointer sample in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Pen pressure in `0.0..=1.0`, absent for non-pressure input.
    pub pressure: Option<f64>,
    /// Monotonic timestamp in milliseconds. Only orders samples within a stroke.
    pub t: u64,
}

impl Point {
    /// Create a sample without pressure information.
    #[must_use]
    pub const fn new(x: f64, y: f64, t: u64) -> Self {
        Self {
            x,
            y,
            pressure: None,
            t,
        }
    }

    /// Attach a pressure reading.
    #[must_use]
    pub const fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Whether every numeric field is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.pressure.map_or(true, f64::is_finite)
    }

    /// Euclidean distance to another sample.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Left edge.
    pub min_x: f64,
    /// Top edge.
    pub min_y: f64,
    /// Right edge.
    pub max_x: f64,
    /// Bottom edge.
    pub max_y: f64,
}

impl Bounds {
    /// Grow the box by `amount` on every side.
    #[must_use]
    pub fn inflate(self, amount: f64) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }

    /// Whether two boxes overlap (touching counts).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    fn around(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Self {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(b) => Self {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            })
        })
    }
}

/// A committed stroke. Immutable: editing means removing and re-adding.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    id: StrokeId,
    points: Vec<Point>,
    color: Rgba,
    width: f64,
    tool: Tool,
    created_at: u64,
}

/// Strokes are shared between the store, history entries and snapshots.
pub type SharedStroke = Arc<Stroke>;

impl Stroke {
    /// Assemble a stroke, validating its structure.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidStroke`] if `points` is empty, any point is
    /// non-finite, or `width` is not a positive finite number.
    pub fn from_parts(
        id: StrokeId,
        points: Vec<Point>,
        color: Rgba,
        width: f64,
        tool: Tool,
        created_at: u64,
    ) -> CanvasResult<Self> {
        if points.is_empty() {
            return Err(CanvasError::InvalidStroke(format!("{id}: no points")));
        }
        if !(width.is_finite() && width > 0.0) {
            return Err(CanvasError::InvalidStroke(format!("{id}: width {width}")));
        }
        if let Some(bad) = points.iter().position(|p| !p.is_finite()) {
            return Err(CanvasError::InvalidStroke(format!(
                "{id}: point {bad} is not finite"
            )));
        }
        Ok(Self {
            id,
            points,
            color,
            width,
            tool,
            created_at,
        })
    }

    /// Stroke identifier.
    #[must_use]
    pub const fn id(&self) -> StrokeId {
        self.id
    }

    /// Samples in capture order. Never empty.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Ink colour.
    #[must_use]
    pub const fn color(&self) -> Rgba {
        self.color
    }

    /// Line width in canvas units.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Tool the stroke was drawn with.
    #[must_use]
    pub const fn tool(&self) -> Tool {
        self.tool
    }

    /// Creation time in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn created_at(&self) -> u64 {
        self.created_at
    }

    /// A single-point stroke renders as a dot.
    #[must_use]
    pub fn is_dot(&self) -> bool {
        self.points.len() == 1
    }

    /// Painted extent, including half the line width.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::around(self.points.iter().map(|p| (p.x, p.y)))
            .unwrap_or(Bounds {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 0.0,
                max_y: 0.0,
            })
            .inflate(self.width / 2.0)
    }

    /// Whether an eraser of `radius` swept from `from` to `to` touches the ink.
    #[must_use]
    pub fn hit_by(&self, from: &Point, to: &Point, radius: f64) -> bool {
        let Some(sweep) = Bounds::around([(from.x, from.y), (to.x, to.y)]) else {
            return false;
        };
        if !self.bounds().intersects(&sweep.inflate(radius)) {
            return false;
        }
        let reach = radius + self.width / 2.0;
        let eraser = ((from.x, from.y), (to.x, to.y));
        if let [only] = self.points.as_slice() {
            return point_segment_distance((only.x, only.y), eraser) <= reach;
        }
        self.points.windows(2).any(|w| {
            let ink = ((w[0].x, w[0].y), (w[1].x, w[1].y));
            segment_distance(ink, eraser) <= reach
        })
    }
}

type Xy = (f64, f64);

fn point_segment_distance(p: Xy, (a, b): (Xy, Xy)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    (p.0 - (a.0 + t * dx)).hypot(p.1 - (a.1 + t * dy))
}

fn segment_distance(s1: (Xy, Xy), s2: (Xy, Xy)) -> f64 {
    if segments_cross(s1, s2) {
        return 0.0;
    }
    [
        point_segment_distance(s1.0, s2),
        point_segment_distance(s1.1, s2),
        point_segment_distance(s2.0, s1),
        point_segment_distance(s2.1, s1),
    ]
    .into_iter()
    .fold(f64::INFINITY, f64::min)
}

fn segments_cross((a, b): (Xy, Xy), (c, d): (Xy, Xy)) -> bool {
    let orient = |p: Xy, q: Xy, r: Xy| (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0);
    let (d1, d2) = (orient(c, d, a), orient(c, d, b));
    let (d3, d4) = (orient(a, b, c), orient(a, b, d));
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}
