//! `carbon-map` serves the interactive emissions map over HTTP, or replays a
//! recorded event script headlessly and prints the resulting render commands.

mod bootstrap;
mod cli;
mod commands;
mod config;
mod dispatch;
mod html;
mod replay;
mod server;
mod telemetry;
#[cfg(test)]
mod testing;

use clap::Parser;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    telemetry::init_tracing();
    let cli = cli::Cli::parse();
    cli::handle_command(cli)
}
