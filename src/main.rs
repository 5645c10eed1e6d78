use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "logdest", about = "Deliver log records read from stdin to configured destinations")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "logdest.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = logdest_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!("logdest starting");

    if config.destination.is_empty() {
        tracing::warn!("no destinations configured, records will be discarded");
    }

    let mut host = logdest_destination::DestinationHost::new(config.host.clone().into());
    let mut senders = Vec::with_capacity(config.destination.len());
    for dest in &config.destination {
        let options = dest
            .raw_options()
            .with_context(|| format!("invalid options for destination '{}'", dest.id))?;
        let tx = host
            .add_destination(&dest.id, &dest.plugin, options)
            .await
            .with_context(|| {
                format!(
                    "failed to initialize destination '{}' ({})",
                    dest.id, dest.plugin
                )
            })?;
        senders.push(tx);
    }

    host.start();
    tracing::info!(destinations = senders.len(), "reading records from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    senders.retain(|tx| tx.send(line.clone()).is_ok());
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read from stdin");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    tracing::info!("shutting down");
    drop(senders);
    host.shutdown().await;

    for id in host.destination_ids() {
        if let Some(stats) = host.stats(id) {
            tracing::info!(
                id,
                delivered = stats.delivered(),
                dropped = stats.dropped(),
                "destination stats"
            );
        }
    }

    Ok(())
}
