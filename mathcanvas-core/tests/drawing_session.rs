//! Drawing Session Integration Tests
//!
//! Drives the controller through the public API:
//! - Undo/redo laws and bounded history
//! - Clear and erase reversibility
//! - Document round trips and lenient loading
//! - Persistence failures leaving the canvas untouched

use async_trait::async_trait;
use mathcanvas_core::{
    palette, BackgroundTheme, CanvasController, CanvasError, CanvasResult, Command,
    ControllerConfig, Document, DocumentId, DocumentRepository, InputOutcome, MemoryRepository,
    PersistenceError, PointerEvent, StrokeId, Tool, MAX_UNDO_STACK,
};
use serde_json::json;

/// A session without the toolbar band, so lines can start near the top.
fn session() -> CanvasController {
    CanvasController::new(ControllerConfig {
        control_bar_fraction: 0.0,
        ..ControllerConfig::default()
    })
}

/// Draw a horizontal line at height `y` and return its id.
fn draw_line(controller: &mut CanvasController, y: f64) -> StrokeId {
    controller
        .on_pointer_down(&PointerEvent::down(10.0, y, 0))
        .expect("down");
    controller.on_pointer_move(&PointerEvent::moved(60.0, y, 5));
    match controller
        .on_pointer_up(&PointerEvent::up(110.0, y, 10))
        .expect("up")
    {
        InputOutcome::Committed(id) => id,
        other => panic!("expected a committed stroke, got {other:?}"),
    }
}

/// Ids of the strokes on the canvas in paint order.
fn stroke_ids(controller: &CanvasController) -> Vec<StrokeId> {
    controller.strokes().iter().map(|s| s.id()).collect()
}

/// A repository whose backend is always down.
struct OfflineRepository;

#[async_trait]
impl DocumentRepository for OfflineRepository {
    async fn save(&self, _document: &Document) -> CanvasResult<DocumentId> {
        Err(PersistenceError::Unavailable("backend offline".into()).into())
    }

    async fn load(&self, _id: &DocumentId) -> CanvasResult<Document> {
        Err(PersistenceError::Unavailable("backend offline".into()).into())
    }

    async fn list(&self) -> CanvasResult<Vec<DocumentId>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// History
// ============================================================================

#[test]
fn test_undo_redo_inverse_law() {
    let mut controller = session();
    for i in 0..8 {
        draw_line(&mut controller, 20.0 + f64::from(i) * 10.0);
    }
    let committed = controller.snapshot();

    for _ in 0..8 {
        assert!(controller.undo().expect("undo").is_some());
    }
    assert!(!controller.has_content());
    assert!(controller.undo().expect("undo").is_none());

    for _ in 0..8 {
        assert!(controller.redo().expect("redo").is_some());
    }
    assert_eq!(controller.snapshot(), committed);
}

#[test]
fn test_bounded_history_keeps_evicted_strokes() {
    let mut controller = session();
    let ids: Vec<_> = (0..60)
        .map(|i| draw_line(&mut controller, f64::from(i) * 9.0))
        .collect();

    let mut undone = 0;
    while controller.undo().expect("undo").is_some() {
        undone += 1;
    }
    assert_eq!(undone, MAX_UNDO_STACK);
    assert_eq!(stroke_ids(&controller), ids[..10].to_vec());
}

#[test]
fn test_new_commit_invalidates_redo() {
    let mut controller = session();
    draw_line(&mut controller, 20.0);
    controller.undo().expect("undo");
    draw_line(&mut controller, 40.0);

    assert!(!controller.can_redo());
    assert!(controller.redo().expect("redo").is_none());
}

#[test]
fn test_clear_then_undo_restores_order() {
    let mut controller = session();
    let a = draw_line(&mut controller, 20.0);
    let b = draw_line(&mut controller, 40.0);
    let c = draw_line(&mut controller, 60.0);

    assert_eq!(controller.clear(), 3);
    assert!(!controller.has_content());
    controller.undo().expect("undo");
    assert_eq!(stroke_ids(&controller), vec![a, b, c]);

    controller.redo().expect("redo");
    assert!(!controller.has_content());
}

#[test]
fn test_single_dot_gesture() {
    let mut controller = session();
    controller
        .on_pointer_down(&PointerEvent::down(42.0, 42.0, 0).with_pressure(0.7))
        .expect("down");
    let outcome = controller
        .on_pointer_up(&PointerEvent::up(42.0, 42.0, 0))
        .expect("up");

    assert!(matches!(outcome, InputOutcome::Committed(_)));
    let stroke = &controller.strokes()[0];
    assert_eq!(stroke.points().len(), 1);
    assert!(stroke.is_dot());
    assert_eq!(stroke.points()[0].pressure, Some(0.7));
}

#[test]
fn test_eraser_gesture_undo_restores_z_order() {
    let mut controller = session();
    let ids: Vec<_> = (0..5)
        .map(|i| draw_line(&mut controller, 100.0 + f64::from(i) * 40.0))
        .collect();

    controller
        .execute(&Command::SetTool { tool: Tool::Eraser })
        .expect("tool");
    // A cancelled swipe puts everything back.
    controller
        .on_pointer_down(&PointerEvent::down(50.0, 130.0, 100))
        .expect("down");
    controller.on_pointer_move(&PointerEvent::moved(50.0, 150.0, 101));
    controller.on_pointer_move(&PointerEvent::moved(50.0, 170.0, 102));
    controller.cancel().expect("cancel");
    assert_eq!(stroke_ids(&controller), ids);

    // Hit the 2nd line, detour right of every line, come back for the 4th.
    controller
        .on_pointer_down(&PointerEvent::down(50.0, 140.0, 200))
        .expect("down");
    controller.on_pointer_move(&PointerEvent::moved(130.0, 140.0, 201));
    controller.on_pointer_move(&PointerEvent::moved(130.0, 220.0, 202));
    controller.on_pointer_move(&PointerEvent::moved(50.0, 220.0, 203));
    let outcome = controller
        .on_pointer_up(&PointerEvent::up(50.0, 220.0, 204))
        .expect("up");

    assert_eq!(outcome, InputOutcome::EraseCommitted(2));
    assert_eq!(stroke_ids(&controller), vec![ids[0], ids[2], ids[4]]);

    controller.undo().expect("undo");
    assert_eq!(stroke_ids(&controller), ids);
}

// ============================================================================
// Documents
// ============================================================================

#[test]
fn test_document_round_trip_is_lossless() {
    let mut controller = session();
    controller.set_color(palette::AZURE);
    controller.set_width(7.25);
    controller
        .on_pointer_down(&PointerEvent::down(0.1, 0.2, 1).with_pressure(0.333_333_333_3))
        .expect("down");
    controller.on_pointer_move(&PointerEvent::moved(17.123_456_789, 3.3, 2));
    controller
        .on_pointer_up(&PointerEvent::up(33.0, 1e-3, 3))
        .expect("up");
    controller.set_background(BackgroundTheme::Mint);

    let json = controller.document().to_json().expect("json");
    let document = Document::from_json(&json).expect("parse");

    let mut restored = session();
    let report = restored.load(&document).expect("load");
    assert!(report.is_clean());
    assert_eq!(restored.snapshot(), controller.snapshot());
}

#[test]
fn test_malformed_stroke_is_skipped() {
    let valid = |n: u64| {
        json!({
            "id": StrokeId::new().to_string(),
            "tool": "pen",
            "color": "#26262EFF",
            "width": 4.0,
            "points": [{"x": 1.0, "y": 2.0, "pressure": null, "t": n}]
        })
    };
    let document = json!({
        "version": 1,
        "background": "slate",
        "width": 800,
        "height": 600,
        "strokes": [
            valid(1),
            valid(2),
            {"id": "not-a-uuid", "tool": "brush", "points": "nope"},
            valid(3),
            valid(4)
        ]
    });
    let document = Document::from_value(document).expect("document");

    let mut controller = session();
    let report = controller.load(&document).expect("load");

    assert_eq!(controller.strokes().len(), 4);
    let order: Vec<_> = controller
        .strokes()
        .iter()
        .map(|s| s.points()[0].t)
        .collect();
    assert_eq!(order, vec![1, 2, 3, 4]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 2);
    assert_eq!(controller.canvas().background, BackgroundTheme::Slate);
}

#[test]
fn test_malformed_document_leaves_canvas_unchanged() {
    let mut controller = session();
    draw_line(&mut controller, 50.0);
    let before = controller.snapshot();

    let result = Document::from_json(r#"{"version": 1, "strokes": 3}"#);
    assert!(matches!(result, Err(CanvasError::MalformedDocument(_))));

    let future = Document::from_value(json!({
        "version": 2,
        "background": "cream",
        "width": 800,
        "height": 600,
        "strokes": []
    }));
    assert!(matches!(
        future,
        Err(CanvasError::SchemaVersion { found: 2, .. })
    ));
    assert_eq!(controller.snapshot(), before);
    assert!(controller.can_undo());
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_save_and_load_through_repository() {
    let repo = MemoryRepository::new();
    let mut controller = session();
    draw_line(&mut controller, 30.0);
    draw_line(&mut controller, 60.0);

    let id = controller.save(&repo).await.expect("save");
    let saved = controller.snapshot();

    controller.clear();
    draw_line(&mut controller, 90.0);

    let report = controller.load_from(&repo, &id).await.expect("load");
    assert!(report.is_clean());
    assert_eq!(controller.snapshot(), saved);
    assert!(!controller.can_undo());
    assert!(!controller.can_redo());
}

#[tokio::test]
async fn test_save_snapshot_ignores_later_edits() {
    let repo = MemoryRepository::new();
    let mut controller = session();
    draw_line(&mut controller, 30.0);

    let pending = controller.save(&repo);
    draw_line(&mut controller, 60.0);
    let id = pending.await.expect("save");

    let mut other = session();
    other.load_from(&repo, &id).await.expect("load");
    assert_eq!(other.strokes().len(), 1);
}

#[tokio::test]
async fn test_repository_failure_leaves_canvas_unchanged() {
    let mut controller = session();
    draw_line(&mut controller, 30.0);
    let before = controller.snapshot();

    let saved = controller.save(&OfflineRepository).await;
    assert!(matches!(
        saved,
        Err(CanvasError::Persistence(PersistenceError::Unavailable(_)))
    ));

    let loaded = controller
        .load_from(&OfflineRepository, &DocumentId::from("anything"))
        .await;
    assert!(loaded.is_err());
    assert_eq!(controller.snapshot(), before);
    assert!(controller.can_undo());
}
