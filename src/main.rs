use anyhow::Result;
use clap::Parser;
use ebank::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ebank::logging::init(cli.verbose, cli.json_logs);
    cli.run().await
}
