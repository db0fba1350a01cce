use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use purse_ledger::{
    seed, BalanceReporter, LedgerStore, SettlementEngine, SettlementPolicy, SledLedgerStore,
};
use purse_node::api::{self, AppState};
use purse_node::config::NodeConfig;
use purse_rates::{CurrencyPair, HttpRateSource, RateSource};

#[derive(Parser, Debug)]
#[command(author, version, about = "Purse wallet node")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Seed the ledger from a JSON record file before serving
    #[arg(long, value_name = "FILE")]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(LevelFilter::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into())
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting purse node");

    let mut config = NodeConfig::load(args.config.as_deref())?;
    if let Some(path) = args.seed {
        config.seed_file = Some(path);
    }
    config.validate()?;

    let store: Arc<dyn LedgerStore> = Arc::new(
        SledLedgerStore::open(config.data_dir.join("ledger"))
            .with_context(|| format!("opening ledger under {}", config.data_dir.display()))?,
    );

    if let Some(path) = &config.seed_file {
        let records = seed::from_json_file(path)
            .with_context(|| format!("loading seed file {}", path.display()))?;
        let summary = seed::load(store.as_ref(), records).await?;
        info!(
            "Seeded ledger from {}: {} inserted, {} skipped",
            path.display(),
            summary.inserted,
            summary.skipped
        );
    }

    let pair: CurrencyPair = config.rates.pair.parse()?;
    let rates: Arc<dyn RateSource> =
        Arc::new(HttpRateSource::new(config.rates.client_config())?);
    let engine = Arc::new(SettlementEngine::new(
        store.clone(),
        SettlementPolicy::new(
            config.settlement.dust_threshold,
            config.settlement.max_attempts,
        ),
    ));
    let reporter = Arc::new(BalanceReporter::new(store.clone(), rates, pair));

    let origin: HeaderValue = config
        .cors_origin
        .parse()
        .with_context(|| format!("invalid cors_origin {:?}", config.cors_origin))?;
    let app = api::router(
        AppState {
            store,
            engine,
            reporter,
        },
        origin,
    );

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen_addr {:?}", config.listen_addr))?;
    info!("Listening on http://{}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Purse node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", err);
        return;
    }
    info!("Shutdown signal received");
}
