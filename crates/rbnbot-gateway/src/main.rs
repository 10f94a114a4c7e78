use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use rbnbot_core::RbnbotConfig;
use rbnbot_discord::{DiscordAdapter, DiscordSink};
use rbnbot_feed::{SourceCommand, SourceSupervisor};
use rbnbot_relay::{PrefixTable, RelayEngine};

#[derive(Parser)]
#[command(name = "rbnbot")]
#[command(about = "Relay Reverse Beacon Network CW spots into a Discord channel", long_about = None)]
struct Cli {
    /// Config file (default: $RBNBOT_CONFIG, then ~/.rbnbot/rbnbot.toml)
    #[arg(long)]
    config: Option<String>,

    /// Validate the config, locate the feed executable and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rbnbot_gateway=info,rbnbot_relay=info,rbnbot_feed=info,rbnbot_discord=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > RBNBOT_CONFIG env > ~/.rbnbot/rbnbot.toml
    let config_path = cli.config.or_else(|| std::env::var("RBNBOT_CONFIG").ok());
    let config = RbnbotConfig::load(config_path.as_deref()).context("loading config")?;

    let mut command = SourceCommand::from_config(&config.source);
    let program = command.resolve().context("locating feed executable")?;
    command.program = program.to_string_lossy().into_owned();

    let resolver = PrefixTable::with_overrides(&config.continents);

    if cli.check {
        println!("config ok");
        println!("  feed:      {} {}", command.program, command.args.join(" "));
        println!("  channel:   {}", config.discord.channel_id);
        println!("  ttl:       {}s", config.relay.message_ttl_secs);
        println!("  publish:   every {}s", config.relay.publish_interval_secs);
        println!("  legend:    every {}s", config.relay.legend_interval_secs);
        println!("  prefixes:  {}", resolver.len());
        println!("  commands:  {}", config.discord.commands_enabled);
        println!("  purge:     {}", config.discord.purge_enabled);
        return Ok(());
    }

    // the first spawn must succeed; later ones are retried by the ingest loop
    let mut supervisor = SourceSupervisor::new(command, config.source.queue_capacity);
    supervisor
        .ensure_running()
        .context("starting feed process")?;
    info!(pid = ?supervisor.pid(), callsign = %config.source.callsign, "feed started");

    let sink = Arc::new(DiscordSink::from_config(&config.discord)?);
    let engine = RelayEngine::new(&config.relay, sink, Arc::new(resolver));
    let stats = engine.stats();
    let aggregator = engine.aggregator();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let tasks = engine.spawn(supervisor, shutdown_rx.clone());
    info!(channel = config.discord.channel_id, "relay started");

    let adapter = if config.discord.commands_enabled {
        let adapter = DiscordAdapter::new(&config.discord, aggregator);
        info!("Discord command handler started");
        Some(tokio::spawn(adapter.run(shutdown_rx)))
    } else {
        None
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {e}");
    }
    info!("shutting down");
    let _ = shutdown_tx.send(true);

    tasks.join().await;
    if let Some(handle) = adapter {
        if let Err(e) = handle.await {
            error!("Discord adapter panicked: {e}");
        }
    }

    let s = stats.snapshot();
    info!(
        lines = s.lines_received,
        parse_failures = s.parse_failures,
        respawn_failures = s.respawn_failures,
        batches = s.batches_published,
        oversized = s.batches_oversized,
        legends = s.legends_published,
        send_failures = s.send_failures,
        evicted = s.messages_evicted,
        delete_failures = s.delete_failures,
        "relay stopped"
    );
    Ok(())
}
