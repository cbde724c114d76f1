//! Lines read from stdin: game callbacks or operator commands.

use std::path::Path;

use anyhow::Result;
use dungeon_content::TemplateLoader;
use dungeon_core::{PlayerId, RunId};
use instance_runtime::{Engine, GameEvent};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::host::{Outbound, emit};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Line {
    Event(GameEvent),
    Command(Command),
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    StopRun {
        run: RunId,
    },
    GiveShard {
        player: PlayerId,
        dungeon: String,
        #[serde(default = "one")]
        amount: u32,
    },
    Reload,
    Status,
}

fn one() -> u32 {
    1
}

/// Parses and applies one line. Failures are logged, never fatal.
pub fn handle_line(engine: &Engine, templates_dir: &Path, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let parsed: Line = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(target: "server::input", %error, line, "Unreadable input line");
            return;
        }
    };

    let outcome = match parsed {
        Line::Event(event) => {
            debug!(target: "server::input", event = event.name(), "Dispatching");
            engine.dispatch(&event).map_err(anyhow::Error::from)
        }
        Line::Command(command) => run_command(engine, templates_dir, command),
    };

    if let Err(error) = outcome {
        warn!(target: "server::input", %error, "Input line failed");
    }
}

fn run_command(engine: &Engine, templates_dir: &Path, command: Command) -> Result<()> {
    match command {
        Command::StopRun { run } => {
            let stopped = engine.stop_run(&run)?;
            info!(target: "server::input", %run, stopped, "Stop requested");
        }
        Command::GiveShard {
            player,
            dungeon,
            amount,
        } => {
            let given = engine.give_shard(&player, &dungeon, amount)?;
            info!(target: "server::input", %player, dungeon, amount, given, "Shard issued");
        }
        Command::Reload => {
            let templates = TemplateLoader::load_dir(templates_dir)?;
            let loaded = engine.reload_templates(templates)?;
            info!(target: "server::input", count = loaded.len(), ?loaded, "Templates reloaded");
        }
        Command::Status => {
            let runs = engine.snapshots()?;
            emit(&Outbound::Status { runs: &runs })?;
        }
    }
    Ok(())
}
