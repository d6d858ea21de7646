use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use privat_eur_usd::{Cli, RateClient, format_rates, request_dates};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Cli::parse();

    // The client lives exactly as long as the batch.
    let raw = {
        let client = RateClient::new();
        client.fetch_all(&request_dates(args.days)).await
    };

    let records = format_rates(&raw)?;
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}
