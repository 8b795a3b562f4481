mod centroid;
mod color;
mod config;
mod data;
mod error;
mod pca;
mod pipeline;
mod plot;

use anyhow::Result;
use clap::Parser;

use config::Cli;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.into_config()?;
    pipeline::run(&config)
}
