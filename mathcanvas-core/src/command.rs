//! Discrete commands from the host toolbar.
//!
//! Commands arrive from the same thread as pointer input and are executed in
//! arrival order, so a command never interleaves with a half-handled event.

use serde::{Deserialize, Serialize};

use crate::controller::CanvasController;
use crate::stroke::Point;
use crate::style::{BackgroundTheme, Rgba, Tool};
use crate::CanvasResult;

/// A toolbar command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Undo the last action.
    Undo,
    /// Redo the last undone action.
    Redo,
    /// Remove every stroke.
    Clear,
    /// Switch background theme.
    SetBackground {
        /// New theme.
        theme: BackgroundTheme,
    },
    /// Select pen or eraser.
    SetTool {
        /// New tool.
        tool: Tool,
    },
    /// Select ink colour.
    SetColor {
        /// New colour.
        color: Rgba,
    },
    /// Select line width.
    SetWidth {
        /// Requested width, clamped by the controller.
        width: f64,
    },
    /// Erase whole strokes under a circle.
    EraseAt {
        /// Centre X.
        x: f64,
        /// Centre Y.
        y: f64,
        /// Circle radius.
        radius: f64,
    },
}

impl CanvasController {
    /// Run a toolbar command.
    ///
    /// Returns whether the canvas content or background changed.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`CanvasController::undo`] and
    /// [`CanvasController::redo`].
    pub fn execute(&mut self, command: &Command) -> CanvasResult<bool> {
        tracing::debug!("Executing {command:?}");
        let changed = match *command {
            Command::Undo => self.undo()?.is_some(),
            Command::Redo => self.redo()?.is_some(),
            Command::Clear => self.clear() > 0,
            Command::SetBackground { theme } => {
                let changed = self.canvas().background != theme;
                self.set_background(theme);
                changed
            }
            Command::SetTool { tool } => {
                self.set_tool(tool);
                false
            }
            Command::SetColor { color } => {
                self.set_color(color);
                false
            }
            Command::SetWidth { width } => {
                self.set_width(width);
                false
            }
            Command::EraseAt { x, y, radius } => self.erase_at(Point::new(x, y, 0), radius) > 0,
        };
        Ok(changed)
    }
}
