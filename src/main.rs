use clap::Parser;
use i94_warehouse::cli::{run, Cli};
use i94_warehouse::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
