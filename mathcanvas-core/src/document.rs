//! # Serializer
//!
//! Lossless conversion between [`Canvas`] state and the persisted
//! [`Document`] format:
//!
//! ```text
//! { "version": 1,
//!   "background": "cream",
//!   "width": 800, "height": 600,
//!   "strokes": [
//!     { "id": "<uuid>", "tool": "pen", "color": "#26262EFF", "width": 4.0,
//!       "createdAt": 1700000000000,
//!       "points": [{"x": 1.0, "y": 2.0, "pressure": null, "t": 0}] } ] }
//! ```
//!
//! Undo/redo history is never persisted.
//!
//! Loading is all-or-nothing at the top level and best-effort per stroke: a
//! document with a bad `version`, `width` or `strokes` field is rejected,
//! while an unreadable stroke record is skipped and reported in the
//! [`LoadReport`].

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::stroke::{Point, Stroke, StrokeId};
use crate::style::{BackgroundTheme, Rgba, Tool};
use crate::{CanvasError, CanvasResult};

/// Highest document version this build reads and the version it writes.
pub const DOCUMENT_VERSION: u32 = 1;

/// One persisted stroke with every field explicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeRecord {
    /// Stroke identifier.
    pub id: StrokeId,
    /// Tool the stroke was drawn with.
    pub tool: Tool,
    /// Ink colour as `#RRGGBBAA`.
    pub color: Rgba,
    /// Line width.
    pub width: f64,
    /// Samples in capture order.
    pub points: Vec<Point>,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(rename = "createdAt", default)]
    pub created_at: u64,
}

impl From<&Stroke> for StrokeRecord {
    fn from(stroke: &Stroke) -> Self {
        Self {
            id: stroke.id(),
            tool: stroke.tool(),
            color: stroke.color(),
            width: stroke.width(),
            points: stroke.points().to_vec(),
            created_at: stroke.created_at(),
        }
    }
}

impl StrokeRecord {
    /// Convert record to a runtime stroke.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidStroke`] if the record has no points, a
    /// non-positive width, or non-finite samples.
    pub fn into_stroke(self) -> CanvasResult<Stroke> {
        Stroke::from_parts(
            self.id,
            self.points,
            self.color,
            self.width,
            self.tool,
            self.created_at,
        )
    }
}

/// A stroke slot in a document: either a readable record or raw JSON that
/// did not match the record schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrokeEntry {
    /// A well-typed stroke record.
    Record(StrokeRecord),
    /// Anything else; skipped on load.
    Unreadable(serde_json::Value),
}

/// Canonical persisted canvas document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Schema version.
    pub version: u32,
    /// Background theme identifier.
    pub background: String,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Strokes in paint order.
    pub strokes: Vec<StrokeEntry>,
}

impl Document {
    /// Build a document from a canvas snapshot.
    #[must_use]
    pub fn from_canvas(canvas: &Canvas) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            background: canvas.background.as_str().to_string(),
            width: canvas.width,
            height: canvas.height,
            strokes: canvas
                .strokes
                .iter()
                .map(|s| StrokeEntry::Record(StrokeRecord::from(s.as_ref())))
                .collect(),
        }
    }

    /// Serialize the document to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        serde_json::to_string(self).map_err(CanvasError::Serialization)
    }

    /// Serialize the document to indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> CanvasResult<String> {
        serde_json::to_string_pretty(self).map_err(CanvasError::Serialization)
    }

    /// Parse a document from JSON text.
    ///
    /// # Errors
    ///
    /// - [`CanvasError::SchemaVersion`] if the document is newer than
    ///   [`DOCUMENT_VERSION`].
    /// - [`CanvasError::MalformedDocument`] if the text is not JSON or a
    ///   top-level field is absent or mistyped.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CanvasError::MalformedDocument(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse a document from an already-decoded JSON value.
    ///
    /// The version is checked before anything else so newer documents are
    /// reported as such rather than as malformed.
    ///
    /// # Errors
    ///
    /// Same as [`Document::from_json`].
    pub fn from_value(value: serde_json::Value) -> CanvasResult<Self> {
        let version = value
            .get("version")
            .ok_or_else(|| CanvasError::MalformedDocument("missing field `version`".into()))?
            .as_u64()
            .ok_or_else(|| {
                CanvasError::MalformedDocument("`version` is not an unsigned integer".into())
            })?;
        check_version(version)?;
        serde_json::from_value(value).map_err(|e| CanvasError::MalformedDocument(e.to_string()))
    }
}

/// A stroke record that was skipped on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStroke {
    /// Position of the record in the document's `strokes` array.
    pub index: usize,
    /// Why it was skipped.
    pub reason: String,
}

/// Non-fatal findings from loading a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Stroke records that were dropped.
    pub skipped: Vec<SkippedStroke>,
    /// Set when the background theme was unknown and replaced by the default.
    pub unknown_background: Option<String>,
}

impl LoadReport {
    /// Whether the document loaded without any warning.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.unknown_background.is_none()
    }
}

/// A canvas rebuilt from a document, plus the warnings raised on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCanvas {
    /// The rebuilt canvas.
    pub canvas: Canvas,
    /// Non-fatal warnings.
    pub report: LoadReport,
}

/// Convert a canvas to its persisted form.
#[must_use]
pub fn to_document(canvas: &Canvas) -> Document {
    Document::from_canvas(canvas)
}

/// Rebuild a canvas from a document.
///
/// Unreadable, invalid and duplicate-id stroke records are skipped with a
/// warning; the remaining strokes keep their relative order.
///
/// # Errors
///
/// Returns [`CanvasError::SchemaVersion`] if the document is newer than
/// supported, or [`CanvasError::MalformedDocument`] for version 0.
pub fn from_document(doc: &Document) -> CanvasResult<LoadedCanvas> {
    check_version(u64::from(doc.version))?;

    let mut report = LoadReport::default();
    let background = doc.background.parse::<BackgroundTheme>().unwrap_or_else(|_| {
        tracing::warn!(
            "Unknown background theme {:?}, using {}",
            doc.background,
            BackgroundTheme::default()
        );
        report.unknown_background = Some(doc.background.clone());
        BackgroundTheme::default()
    });

    let mut canvas = Canvas::new(doc.width, doc.height).with_background(background);
    let mut seen = HashSet::with_capacity(doc.strokes.len());
    for (index, entry) in doc.strokes.iter().enumerate() {
        let result = match entry {
            StrokeEntry::Record(record) => record.clone().into_stroke().map_err(|e| e.to_string()),
            StrokeEntry::Unreadable(raw) => Err(describe_unreadable(raw)),
        };
        let result = result.and_then(|stroke| {
            if seen.insert(stroke.id()) {
                Ok(stroke)
            } else {
                Err(format!("duplicate stroke id {}", stroke.id()))
            }
        });
        match result {
            Ok(stroke) => canvas.strokes.push(Arc::new(stroke)),
            Err(reason) => {
                tracing::warn!("Skipping stroke record {index}: {reason}");
                report.skipped.push(SkippedStroke { index, reason });
            }
        }
    }

    Ok(LoadedCanvas { canvas, report })
}

fn check_version(version: u64) -> CanvasResult<()> {
    if version == 0 {
        return Err(CanvasError::MalformedDocument(
            "document version 0 is not valid".into(),
        ));
    }
    if version > u64::from(DOCUMENT_VERSION) {
        return Err(CanvasError::SchemaVersion {
            found: version,
            supported: DOCUMENT_VERSION,
        });
    }
    Ok(())
}

fn describe_unreadable(raw: &serde_json::Value) -> String {
    match serde_json::from_value::<StrokeRecord>(raw.clone()) {
        Err(e) => e.to_string(),
        Ok(_) => "record did not match the stroke schema".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::palette;

    fn sample_canvas() -> Canvas {
        let pen = Stroke::from_parts(
            StrokeId::new(),
            vec![
                Point::new(0.1, 0.2, 0).with_pressure(0.3),
                Point::new(10.000_000_000_000_2, -5.5, 16),
            ],
            palette::AZURE,
            4.25,
            Tool::Pen,
            1_700_000_000_123,
        )
        .expect("pen");
        let eraser = Stroke::from_parts(
            StrokeId::new(),
            vec![Point::new(1.0 / 3.0, 2.0 / 3.0, 5)],
            Rgba::new(1, 2, 3, 4),
            16.0,
            Tool::Eraser,
            1_700_000_000_456,
        )
        .expect("eraser");
        let mut canvas = Canvas::new(1024, 768).with_background(BackgroundTheme::Slate);
        canvas.strokes = vec![Arc::new(pen), Arc::new(eraser)];
        canvas
    }

    #[test]
    fn test_round_trip_through_json() {
        let canvas = sample_canvas();
        let json = to_document(&canvas).to_json().expect("to json");
        let doc = Document::from_json(&json).expect("from json");
        let loaded = from_document(&doc).expect("load");
        assert!(loaded.report.is_clean());
        assert_eq!(loaded.canvas, canvas);
    }

    #[test]
    fn test_document_fields_are_explicit() {
        let doc = to_document(&sample_canvas());
        let value = serde_json::to_value(&doc).expect("value");
        assert_eq!(value["version"], 1);
        assert_eq!(value["background"], "slate");
        assert_eq!(value["strokes"][1]["tool"], "eraser");
        assert_eq!(value["strokes"][1]["color"], "#01020304");
        assert!(value["strokes"][1]["points"][0]["pressure"].is_null());
        assert_eq!(value["strokes"][0]["points"][1]["t"], 16);
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let json = r#"{"version": 2, "background": "cream", "width": 1, "height": 1, "strokes": [], "layers": {}}"#;
        let result = Document::from_json(json);
        assert!(matches!(
            result,
            Err(CanvasError::SchemaVersion {
                found: 2,
                supported: 1
            })
        ));
    }

    #[test]
    fn test_malformed_top_level_is_rejected() {
        for json in [
            "not json",
            r#"{"background": "cream", "width": 1, "height": 1, "strokes": []}"#,
            r#"{"version": "1", "background": "cream", "width": 1, "height": 1, "strokes": []}"#,
            r#"{"version": 0, "background": "cream", "width": 1, "height": 1, "strokes": []}"#,
            r#"{"version": 1, "background": "cream", "width": -4, "height": 1, "strokes": []}"#,
            r#"{"version": 1, "background": "cream", "width": 1, "height": 1, "strokes": {}}"#,
        ] {
            assert!(
                matches!(
                    Document::from_json(json),
                    Err(CanvasError::MalformedDocument(_))
                ),
                "{json} should be malformed"
            );
        }
    }

    #[test]
    fn test_bad_records_are_skipped_in_order() {
        let canvas = sample_canvas();
        let mut value = serde_json::to_value(to_document(&canvas)).expect("value");
        let strokes = value["strokes"].as_array_mut().expect("array");
        strokes.insert(1, serde_json::json!({"id": "nope", "points": 3}));
        strokes.push(serde_json::json!({
            "id": StrokeId::new().to_string(), "tool": "pen", "color": "#000000FF",
            "width": 2.0, "points": []
        }));

        let doc = Document::from_value(value).expect("document");
        let loaded = from_document(&doc).expect("load");
        assert_eq!(loaded.canvas.strokes, canvas.strokes);
        let skipped: Vec<_> = loaded.report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 3]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let canvas = sample_canvas();
        let mut doc = to_document(&canvas);
        doc.strokes.push(doc.strokes[0].clone());
        let loaded = from_document(&doc).expect("load");
        assert_eq!(loaded.canvas.strokes.len(), 2);
        assert_eq!(loaded.report.skipped.len(), 1);
        assert_eq!(loaded.report.skipped[0].index, 2);
    }

    #[test]
    fn test_unknown_background_falls_back() {
        let mut doc = to_document(&Canvas::default());
        doc.background = "sepia".into();
        let loaded = from_document(&doc).expect("load");
        assert_eq!(loaded.canvas.background, BackgroundTheme::Cream);
        assert_eq!(loaded.report.unknown_background.as_deref(), Some("sepia"));
        assert!(!loaded.report.is_clean());
    }

    #[test]
    fn test_missing_pressure_and_created_at_default() {
        let json = format!(
            r##"{{"version": 1, "background": "mint", "width": 10, "height": 20,
                "strokes": [{{"id": "{}", "tool": "pen", "color": "#FF0000FF",
                "width": 3, "points": [{{"x": 1, "y": 2, "t": 0}}]}}]}}"##,
            StrokeId::new()
        );
        let doc = Document::from_json(&json).expect("document");
        let loaded = from_document(&doc).expect("load");
        let stroke = &loaded.canvas.strokes[0];
        assert_eq!(stroke.points()[0].pressure, None);
        assert_eq!(stroke.created_at(), 0);
        assert!((stroke.width() - 3.0).abs() < f64::EPSILON);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_coordinate() -> impl Strategy<Value = f64> {
            prop_oneof![-1.0e6..1.0e6f64, -1.0e300..1.0e300f64]
        }

        fn arb_point() -> impl Strategy<Value = Point> {
            (
                arb_coordinate(),
                arb_coordinate(),
                prop::option::of(0.0f64..=1.0),
                any::<u64>(),
            )
                .prop_map(|(x, y, pressure, t)| Point { x, y, pressure, t })
        }

        fn arb_tool() -> impl Strategy<Value = Tool> {
            prop_oneof![Just(Tool::Pen), Just(Tool::Eraser)]
        }

        fn arb_background() -> impl Strategy<Value = BackgroundTheme> {
            prop_oneof![
                Just(BackgroundTheme::Cream),
                Just(BackgroundTheme::Slate),
                Just(BackgroundTheme::Mint),
            ]
        }

        fn arb_stroke() -> impl Strategy<Value = Arc<Stroke>> {
            (
                prop::collection::vec(arb_point(), 1..20),
                any::<[u8; 4]>(),
                0.01f64..100.0,
                arb_tool(),
                any::<u64>(),
            )
                .prop_map(|(points, [r, g, b, a], width, tool, created_at)| {
                    let stroke = Stroke::from_parts(
                        StrokeId::new(),
                        points,
                        Rgba::new(r, g, b, a),
                        width,
                        tool,
                        created_at,
                    )
                    .expect("finite stroke");
                    Arc::new(stroke)
                })
        }

        fn arb_canvas() -> impl Strategy<Value = Canvas> {
            (
                any::<u32>(),
                any::<u32>(),
                arb_background(),
                prop::collection::vec(arb_stroke(), 0..8),
            )
                .prop_map(|(width, height, background, strokes)| {
                    let mut canvas = Canvas::new(width, height).with_background(background);
                    canvas.strokes = strokes;
                    canvas
                })
        }

        proptest! {
            #[test]
            fn prop_json_round_trip_is_lossless(canvas in arb_canvas()) {
                let json = to_document(&canvas).to_json().expect("to json");
                let doc = Document::from_json(&json).expect("from json");
                let loaded = from_document(&doc).expect("load");

                prop_assert!(loaded.report.is_clean());
                prop_assert_eq!(loaded.canvas, canvas);
            }
        }
    }
}
