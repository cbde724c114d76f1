//! Headless dungeon host.
//!
//! Reads game callbacks and operator commands as JSON lines on stdin, ticks
//! the engine once per period and writes every side effect as a JSON line
//! on stdout. Logs go to stderr and, optionally, a daily log file.

mod config;
mod host;
mod input;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dungeon_content::{ConfigLoader, TemplateLoader};
use dungeon_core::EngineConfig;
use instance_runtime::{Engine, Topic};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::ServerConfig;
use crate::host::{HostWorld, MemoryInventory, Outbound, StdoutHost, emit};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let server = ServerConfig::from_env();
    let _guard = setup_logging(&server)?;

    let engine = build_engine(&server)?;
    forward_events(&engine);

    run(&engine, &server).await
}

fn setup_logging(server: &ServerConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let (file_layer, guard) = match &server.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "dungeon-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(dir) = &server.log_dir {
        tracing::info!("Log file: {}/dungeon-server.log", dir.display());
    }
    Ok(guard)
}

fn build_engine(server: &ServerConfig) -> Result<Engine> {
    let config = match &server.config_path {
        Some(path) => ConfigLoader::load(path)?,
        None => EngineConfig::default(),
    };
    let templates = if server.templates_dir.is_dir() {
        TemplateLoader::load_dir(&server.templates_dir)?
    } else {
        tracing::warn!(
            "Template directory {} not found; starting without dungeons",
            server.templates_dir.display()
        );
        Vec::new()
    };
    tracing::info!(count = templates.len(), "Templates loaded");

    let host = Arc::new(StdoutHost);
    let engine = Engine::builder()
        .config(config)
        .templates(templates)
        .world(Arc::new(HostWorld::default()))
        .inventory(Arc::new(MemoryInventory::default()))
        .messenger(host.clone())
        .rewards(host)
        .build()?;
    Ok(engine)
}

/// Mirrors every bus event to stdout.
fn forward_events(engine: &Engine) {
    let topics = [Topic::Run, Topic::Room, Topic::Boss, Topic::Portal];
    for (topic, mut rx) in engine.bus().subscribe_multiple(&topics) {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(error) = emit(&Outbound::Event { event: &event }) {
                            tracing::warn!(%error, ?topic, "Event not forwarded");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(?topic, skipped, "Event forwarder lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}

async fn run(engine: &Engine, server: &ServerConfig) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(server.tick_millis));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!(tick_millis = server.tick_millis, "Dungeon host ready");

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => input::handle_line(engine, &server.templates_dir, &line),
                None => {
                    tracing::info!("Input closed");
                    break;
                }
            },
            _ = ticker.tick() => {
                if let Err(error) = engine.tick() {
                    tracing::warn!(%error, "Tick failed");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    let stopped = engine.stop_all()?;
    tracing::info!(stopped, "Runs stopped");
    Ok(())
}
