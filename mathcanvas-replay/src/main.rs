//! # MathCanvas Replay
//!
//! Replays a recorded script and saves the resulting canvas.

use anyhow::Context;
use clap::Parser;
use mathcanvas_core::{CanvasController, DocumentId, FileRepository};
use mathcanvas_replay::{parse_script, replay, CliArgs, ReplayConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing.
///
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mathcanvas_core=debug"));

    // Logs go to stderr so stdout stays clean for ids and documents.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ReplayConfig::from(CliArgs::parse());
    let engine = config.controller_config()?;
    tracing::info!(
        "Replaying {} on a {}x{} canvas",
        config.script.display(),
        engine.width,
        engine.height
    );

    let text = tokio::fs::read_to_string(&config.script)
        .await
        .with_context(|| format!("Failed to read {}", config.script.display()))?;
    let steps = parse_script(&text)?;

    let repo = FileRepository::new(&config.data_dir)?;
    let mut controller = CanvasController::new(engine);

    if let Some(base) = &config.base {
        let report = controller.load_from(&repo, &DocumentId::from(base.as_str())).await?;
        if !report.is_clean() {
            tracing::warn!(
                "Base document {} loaded with {} skipped strokes",
                base,
                report.skipped.len()
            );
        }
    }

    let summary = replay(&mut controller, &steps);
    tracing::info!(
        "Replayed {} steps: {} strokes committed, {} erased, {} commands applied, {} rejected",
        summary.steps,
        summary.strokes_committed,
        summary.strokes_erased,
        summary.commands_applied,
        summary.rejected
    );

    if config.print {
        println!("{}", controller.document().to_json_pretty()?);
    } else {
        let id = controller.save(&repo).await?;
        println!("{id}");
    }

    Ok(())
}
