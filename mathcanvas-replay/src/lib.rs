//! # MathCanvas Replay
//!
//! Drives the drawing engine from a recorded script and saves the result.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p mathcanvas-replay -- session.jsonl --data-dir ./canvases
//! ```
//!
//! ## Script format
//!
//! One JSON object per line. Blank lines and lines starting with `#` are
//! skipped.
//!
//! ```text
//! {"phase": "down", "x": 10, "y": 120, "timestamp_ms": 0}
//! {"phase": "move", "x": 40, "y": 122, "pressure": 0.6, "timestamp_ms": 16}
//! {"phase": "up", "x": 80, "y": 125, "timestamp_ms": 33}
//! {"command": "set_background", "theme": "slate"}
//! {"command": "undo"}
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `ReplayConfig` - Script location, data directory and engine settings
//! - `Step` / `parse_script` - Script decoding with line-numbered errors
//! - `replay` - Feeds steps to a `CanvasController` and tallies the outcome

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use mathcanvas_core::{CanvasController, Command, ControllerConfig, InputOutcome, PointerEvent};
use serde::Deserialize;

/// Default directory for saved documents.
pub const DEFAULT_DATA_DIR: &str = "./canvases";

/// Command-line arguments for mathcanvas-replay.
#[derive(Debug, Clone, Parser)]
#[command(name = "mathcanvas-replay")]
#[command(about = "Replay a pointer/command script through the MathCanvas engine")]
#[command(version)]
pub struct CliArgs {
    /// Script of pointer events and commands, one JSON object per line
    pub script: PathBuf,

    /// Directory saved documents are written to
    #[arg(long, env = "MATHCANVAS_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// JSON file with engine settings (widths, history depth, canvas size)
    #[arg(long, env = "MATHCANVAS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Load this saved document before replaying
    #[arg(long)]
    pub base: Option<String>,

    /// Print the resulting document to stdout instead of saving it
    #[arg(long)]
    pub print: bool,
}

/// Replay configuration.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Script to replay.
    pub script: PathBuf,
    /// Directory for the file repository.
    pub data_dir: PathBuf,
    /// Optional engine settings file.
    pub config_path: Option<PathBuf>,
    /// Document to start from.
    pub base: Option<String>,
    /// Print instead of saving.
    pub print: bool,
}

impl ReplayConfig {
    /// Create a configuration for `script` with default values.
    #[must_use]
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            config_path: None,
            base: None,
            print: false,
        }
    }

    /// Engine settings, read from the configured file or defaulted.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read or parsed, or
    /// holds settings the engine rejects.
    pub fn controller_config(&self) -> anyhow::Result<ControllerConfig> {
        let config = match &self.config_path {
            Some(path) => load_controller_config(path)?,
            None => ControllerConfig::default(),
        };
        config.validate().with_context(|| match &self.config_path {
            Some(path) => format!("Invalid config {}", path.display()),
            None => "Invalid default config".to_string(),
        })?;
        Ok(config)
    }
}

impl From<CliArgs> for ReplayConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            script: args.script,
            data_dir: args.data_dir,
            config_path: args.config,
            base: args.base,
            print: args.print,
        }
    }
}

fn load_controller_config(path: &Path) -> anyhow::Result<ControllerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// One line of a replay script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// A pointer sample.
    Pointer(PointerEvent),
    /// A toolbar command.
    Command(Command),
}

/// Decode a script.
///
/// # Errors
///
/// Returns an error naming the first line that is not a valid step.
pub fn parse_script(text: &str) -> anyhow::Result<Vec<Step>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid step on line {}", n + 1))
        })
        .collect()
}

/// Tally of a replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Steps processed.
    pub steps: usize,
    /// Pen strokes committed.
    pub strokes_committed: usize,
    /// Strokes removed by eraser gestures.
    pub strokes_erased: usize,
    /// Commands that changed the canvas.
    pub commands_applied: usize,
    /// Steps the engine rejected.
    pub rejected: usize,
}

/// Feed `steps` to the controller in order.
///
/// Rejected steps are logged and counted; they never stop the replay. A
/// gesture still open at the end is cancelled.
pub fn replay(controller: &mut CanvasController, steps: &[Step]) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for step in steps {
        summary.steps += 1;
        match step {
            Step::Pointer(event) => match controller.handle_pointer(event) {
                Ok(InputOutcome::Committed(_)) => summary.strokes_committed += 1,
                Ok(InputOutcome::EraseCommitted(n)) => summary.strokes_erased += n,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Step {} rejected: {}", summary.steps, e);
                    summary.rejected += 1;
                }
            },
            Step::Command(command) => match controller.execute(command) {
                Ok(true) => summary.commands_applied += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Step {} rejected: {}", summary.steps, e);
                    summary.rejected += 1;
                }
            },
        }
    }

    match controller.cancel() {
        Ok(InputOutcome::Cancelled) => tracing::warn!("Script ended mid-gesture; gesture dropped"),
        Ok(_) => {}
        Err(e) => tracing::error!("Failed to drop unfinished gesture: {}", e),
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathcanvas_core::{BackgroundTheme, PointerPhase};

    const SCRIPT: &str = r#"
# two strokes, undo one, switch theme
{"phase": "down", "x": 10, "y": 120, "timestamp_ms": 0}
{"phase": "move", "x": 40, "y": 122, "pressure": 0.6, "timestamp_ms": 16}
{"phase": "up", "x": 80, "y": 125, "timestamp_ms": 33}
{"phase": "down", "x": 10, "y": 200, "timestamp_ms": 100}
{"phase": "up", "x": 90, "y": 200, "timestamp_ms": 140}
{"command": "undo"}
{"command": "set_background", "theme": "slate"}
"#;

    #[test]
    fn test_parse_script() {
        let steps = parse_script(SCRIPT).expect("parse");
        assert_eq!(steps.len(), 7);
        assert!(matches!(
            steps[1],
            Step::Pointer(PointerEvent {
                phase: PointerPhase::Move,
                pressure: Some(_),
                ..
            })
        ));
        assert_eq!(steps[5], Step::Command(Command::Undo));
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("{\"command\": \"undo\"}\n\n{\"phase\": \"sideways\"}")
            .expect_err("should fail");
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_replay_summary() {
        let steps = parse_script(SCRIPT).expect("parse");
        let mut controller = CanvasController::default();
        let summary = replay(&mut controller, &steps);

        assert_eq!(summary.steps, 7);
        assert_eq!(summary.strokes_committed, 2);
        assert_eq!(summary.commands_applied, 2);
        assert_eq!(summary.rejected, 0);
        assert_eq!(controller.strokes().len(), 1);
        assert_eq!(controller.canvas().background, BackgroundTheme::Slate);
    }

    #[test]
    fn test_replay_counts_rejections_and_drops_open_gesture() {
        let steps = parse_script(
            r#"{"phase": "down", "x": 10, "y": 110}
{"phase": "down", "x": 20, "y": 120}
{"phase": "move", "x": 50, "y": 50}"#,
        )
        .expect("parse");
        let mut controller = CanvasController::default();
        let summary = replay(&mut controller, &steps);

        assert_eq!(summary.rejected, 1);
        assert!(!controller.has_content());
    }

    #[test]
    fn test_controller_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"width": 1024, "history": {"capacity": 5}}"#).expect("write");

        let mut config = ReplayConfig::new("script.jsonl");
        assert_eq!(
            config.controller_config().expect("default"),
            ControllerConfig::default()
        );

        config.config_path = Some(path);
        let engine = config.controller_config().expect("config");
        assert_eq!(engine.width, 1024);
        assert_eq!(engine.history.capacity, 5);
        assert_eq!(engine.height, ControllerConfig::default().height);
    }

    #[test]
    fn test_controller_config_rejects_inverted_widths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"min_line_width": 10, "max_line_width": 5}"#).expect("write");

        let mut config = ReplayConfig::new("script.jsonl");
        config.config_path = Some(path);
        let err = config.controller_config().expect_err("should fail");
        assert!(err.to_string().contains("Invalid config"));
        assert!(format!("{err:#}").contains("max_line_width"));
    }

    #[test]
    fn test_default_config_keeps_toolbar_band() {
        let steps = parse_script(
            r#"{"phase": "down", "x": 10, "y": 20, "timestamp_ms": 0}
{"phase": "up", "x": 80, "y": 20, "timestamp_ms": 10}"#,
        )
        .expect("parse");
        let engine = ReplayConfig::new("script.jsonl")
            .controller_config()
            .expect("config");
        let mut controller = CanvasController::new(engine);
        let summary = replay(&mut controller, &steps);

        assert_eq!(summary.strokes_committed, 0);
        assert_eq!(summary.rejected, 0);
        assert!(!controller.has_content());
    }
}
