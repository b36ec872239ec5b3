use anyhow::Result;
use clap::Parser;
use log::info;
use runcost::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting RunCost - GitHub Actions cost analyzer");
    cli.execute().await?;

    Ok(())
}
