use anyhow::Context;
use clap::Parser;
use guardbot::api::{BybitClient, BybitConfig, DryRunCommand, ExchangeCommand, ExchangeQuery};
use guardbot::risk::AtrRiskEngine;
use guardbot::strategy::MeanReversionEngine;
use guardbot::{BotConfig, DecisionOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Parser)]
#[command(name = "guardbot", about = "Guarded single-symbol trading loop for Bybit linear perpetuals")]
struct Args {
    /// Optional TOML settings file; environment variables override it
    #[arg(long, default_value = "guardbot.toml")]
    config: PathBuf,

    /// Run a single decision cycle and exit
    #[arg(long)]
    once: bool,

    /// Log orders instead of sending them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();
    let config = BotConfig::load(Some(args.config.as_path())).context("Failed to load configuration")?;

    tracing::info!("🚀 guardbot starting");
    tracing::info!(
        "  {} | qty {} | {}x | interval {} x{} | env={}",
        config.cycle.symbol,
        config.cycle.quantity,
        config.cycle.leverage,
        config.cycle.interval,
        config.cycle.limit,
        config.environment
    );
    tracing::info!(
        "  Guard: max {} positions, position cool-down {}s, close cool-down {}s",
        config.guard.max_open_positions,
        config.guard.position_cooldown.num_seconds(),
        config.guard.close_cooldown.num_seconds()
    );

    let client = Arc::new(
        BybitClient::new(BybitConfig::from_bot_config(&config))
            .context("Failed to build Bybit client")?,
    );
    let query: Arc<dyn ExchangeQuery> = client.clone();
    let command: Arc<dyn ExchangeCommand> = if args.dry_run {
        tracing::warn!("DRY RUN: orders will be logged, not sent");
        Arc::new(DryRunCommand)
    } else {
        client
    };

    let orchestrator = DecisionOrchestrator::new(
        query,
        command,
        Arc::new(MeanReversionEngine::default()),
        Arc::new(AtrRiskEngine::default()),
        config.cycle.clone(),
        config.guard.clone(),
    );

    if args.once {
        orchestrator.run_cycle().await;
        return Ok(());
    }

    tracing::info!(
        "🔄 Running a cycle every {}s. Press Ctrl+C to stop...",
        config.poll_interval.as_secs()
    );

    // First tick fires immediately
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("⚠️  Received Ctrl+C, shutting down...");
                break;
            }
            _ = ticker.tick() => {
                orchestrator.run_cycle().await;
            }
        }
    }

    tracing::info!("👋 guardbot stopped");
    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("guardbot=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
