//! # MathCanvas Core
//!
//! Stroke-based drawing engine for the MathCanvas learning app: freehand
//! pen and eraser input, bounded undo/redo and versioned JSON documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              CanvasController               │
//! ├─────────────────────────────────────────────┤
//! │  StrokeBuilder   │  History                 │
//! │  - Pointer input │  - Undo stack (cap 50)   │
//! │  - Sampling      │  - Redo stack            │
//! ├─────────────────────────────────────────────┤
//! │  CanvasStore     │  Document                │
//! │  - Paint order   │  - Versioned JSON        │
//! │  - Background    │  - DocumentRepository    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! All mutation goes through [`CanvasController`]. Renderers read
//! [`CanvasController::canvas`] after each call, or take a
//! [`CanvasController::snapshot`] to paint from another thread.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod canvas;
pub mod command;
pub mod controller;
pub mod document;
pub mod error;
pub mod event;
pub mod history;
pub mod repository;
pub mod stroke;
pub mod style;

pub use builder::{BuilderConfig, StrokeBuilder};
pub use canvas::{Canvas, CanvasStore};
pub use command::Command;
pub use controller::{
    CanvasController, ControllerConfig, GestureState, InputOutcome, ToolSettings,
    DEFAULT_CONTROL_BAR_FRACTION,
};
pub use document::{
    from_document, to_document, Document, LoadReport, LoadedCanvas, SkippedStroke, StrokeEntry,
    StrokeRecord, DOCUMENT_VERSION,
};
pub use error::{CanvasError, CanvasResult, PersistenceError};
pub use event::{PointerEvent, PointerPhase};
pub use history::{History, HistoryConfig, HistoryEntry, MAX_UNDO_STACK};
pub use repository::{DocumentId, DocumentRepository, FileRepository, MemoryRepository};
pub use stroke::{Bounds, Point, SharedStroke, Stroke, StrokeId};
pub use style::{palette, BackgroundTheme, Rgba, Tool};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
