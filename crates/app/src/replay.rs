//! Headless replay of a recorded event script.
//!
//! Output is JSON lines: every render command in order, then one summary
//! object with the final display mode of each layer and the lock state.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result};
use map_core::EntityRepository;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    bootstrap,
    commands::RenderCommand,
    config::{LoaderMode, MapConfig},
    dispatch::{ClientEvent, dispatch},
};

#[derive(Debug, Serialize)]
struct ReplaySummary<'a> {
    locked: bool,
    modes: BTreeMap<&'a str, &'static str>,
    rejected: usize,
}

pub fn run(config: &MapConfig, script: &Path, out: impl Write) -> Result<()> {
    let file = File::open(script)
        .with_context(|| format!("Failed to open event script {}", script.display()))?;
    let repository = bootstrap::http_repository(config)?;
    replay(config, repository, BufReader::new(file), out)
}

/// Children are always fetched inline so the output does not depend on timing.
pub fn replay(
    config: &MapConfig,
    repository: Arc<dyn EntityRepository>,
    script: impl BufRead,
    mut out: impl Write,
) -> Result<()> {
    let mut controller = bootstrap::build_controller(config, repository, LoaderMode::Blocking)?;
    write_commands(&mut out, controller.surface_mut().drain())?;

    let mut applied = 0usize;
    let mut rejected = 0usize;
    for (index, line) in script.lines().enumerate() {
        let number = index + 1;
        let line = line.with_context(|| format!("Failed to read script line {number}"))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: ClientEvent = serde_json::from_str(line)
            .with_context(|| format!("Script line {number} is not a valid event"))?;
        match dispatch(&mut controller, event) {
            Ok(commands) => {
                applied += 1;
                write_commands(&mut out, commands)?;
            }
            Err(err) => {
                rejected += 1;
                warn!("line {number}: {err:#}");
                write_commands(&mut out, controller.surface_mut().drain())?;
            }
        }
    }

    let summary = ReplaySummary {
        locked: controller.is_locked(),
        modes: controller
            .registry()
            .iter()
            .map(|(id, entry)| (id.as_str(), entry.mode.label()))
            .collect(),
        rejected,
    };
    serde_json::to_writer(&mut out, &summary)?;
    writeln!(out)?;
    out.flush()?;
    info!(applied, rejected, "replay finished");
    Ok(())
}

fn write_commands(out: &mut impl Write, commands: Vec<RenderCommand>) -> Result<()> {
    for command in commands {
        serde_json::to_writer(&mut *out, &command)?;
        writeln!(out)?;
    }
    Ok(())
}
