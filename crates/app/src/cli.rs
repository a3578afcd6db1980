use std::{io, path::PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::{
    config::{MapArgs, MapConfig},
    replay, server,
};

#[derive(Debug, Parser)]
#[command(name = "carbon-map", version, about = "Interactive map of reported carbon emissions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the map page and its event API.
    Serve(MapArgs),
    /// Feed a JSON-lines event script through the controller and print the
    /// render commands it produces.
    Replay(ReplayArgs),
}

/// CLI arguments accepted by the `replay` subcommand.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// One event object per line, e.g. `{"kind":"click","entity":"uk.ac.cam.kings"}`.
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,
    #[command(flatten)]
    pub map: MapArgs,
}

pub fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve(args) => server::run(MapConfig::try_from(args)?),
        Command::Replay(args) => {
            let config = MapConfig::try_from(args.map)?;
            replay::run(&config, &args.script, io::stdout().lock())
        }
    }
}
