mod auth;
mod cli;
mod collector;
mod config;
mod error;
mod exporters;
mod providers;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting cistat - CI build metrics collector");
    cli.execute().await?;

    Ok(())
}
