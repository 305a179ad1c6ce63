use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use allocator::api::{AnalyzeArgs, CliMode, ServeArgs, build_inputs, run_http_server};
use allocator::core::run_analysis;
use allocator::holdings_csv::{read_holdings_file, write_trajectory_file};
use allocator::quotes::{FallbackPriceLookup, PriceResult, QuoteSettings};

#[derive(Parser, Debug)]
#[command(
    name = "allocator",
    about = "ETF portfolio allocator with fee-aware growth and stress projections"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Analyze one portfolio and print the result as JSON
    Analyze(AnalyzeCommand),
    /// Look up a single share price
    Price(PriceCommand),
}

#[derive(Args, Debug)]
struct AnalyzeCommand {
    #[command(flatten)]
    inputs: AnalyzeArgs,
    #[arg(long, help = "Load holdings from CSV and analyze in rebalance mode")]
    holdings_csv: Option<PathBuf>,
    #[arg(long, help = "Write the expected-scenario trajectory to CSV")]
    export_csv: Option<PathBuf>,
    #[arg(
        long,
        requires = "holdings_csv",
        help = "Look up live prices for imported holdings; failed lookups keep the CSV price"
    )]
    refresh_prices: bool,
    #[arg(long, env = "FINNHUB_API_KEY", hide_env_values = true)]
    finnhub_api_key: Option<String>,
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[derive(Args, Debug)]
struct PriceCommand {
    ticker: String,
    #[arg(long, env = "FINNHUB_API_KEY", hide_env_values = true)]
    finnhub_api_key: Option<String>,
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve(args) => run_http_server(args).await.context("server error"),
        Command::Analyze(cmd) => analyze(cmd).await,
        Command::Price(cmd) => price(cmd).await,
    }
}

async fn analyze(cmd: AnalyzeCommand) -> Result<()> {
    let mut args = cmd.inputs;
    if let Some(path) = &cmd.holdings_csv {
        args.holdings = read_holdings_file(path)?;
        args.mode = CliMode::Rebalance;
    }
    if cmd.refresh_prices {
        let lookup = FallbackPriceLookup::from_settings(&QuoteSettings {
            finnhub_api_key: cmd.finnhub_api_key,
            timeout: Duration::from_secs(cmd.timeout_secs),
        })?;
        let updated = lookup.refresh_holdings(&mut args.holdings).await;
        tracing::info!(updated, total = args.holdings.len(), "refreshed holding prices");
    }

    let inputs = build_inputs(args)?;
    let result = run_analysis(&inputs);
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(path) = &cmd.export_csv {
        write_trajectory_file(path, &result.growth.expected)
            .with_context(|| format!("write {}", path.display()))?;
        tracing::info!(path = %path.display(), "exported expected trajectory");
    }
    Ok(())
}

async fn price(cmd: PriceCommand) -> Result<()> {
    let lookup = FallbackPriceLookup::from_settings(&QuoteSettings {
        finnhub_api_key: cmd.finnhub_api_key,
        timeout: Duration::from_secs(cmd.timeout_secs),
    })?;

    let ticker = cmd.ticker.trim().to_uppercase();
    let result = match lookup.lookup(&ticker).await {
        Ok(quote) => PriceResult::found(quote),
        Err(err) => PriceResult::failed(&err),
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
