use std::path::PathBuf;

use clap::Parser;

use tikiblocks::bar::StatusBar;
use tikiblocks::config::{BarConfig, default_config_path};
use tikiblocks::sinks::{SinkKind, open_sink};

#[derive(Parser)]
#[command(
    name = "tikiblocks",
    about = "Status line built from shell command blocks, refreshed by timers and real-time signals",
    version
)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/tikiblocks/tikiblocks.json)
    #[arg(short, long, env = "TIKIBLOCKS_CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the status line; overrides `barType` from the config
    #[arg(short, long, value_enum, ignore_case = true)]
    output: Option<SinkKind>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout may be the status line itself, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = BarConfig::load(&config_path)?;

    let kind = cli.output.or(config.bar_type).unwrap_or_default();
    let sink = open_sink(kind).await?;

    tracing::info!(
        config = %config_path.display(),
        sink = %kind,
        actions = config.actions.len(),
        "Starting tikiblocks v{}",
        env!("CARGO_PKG_VERSION")
    );

    tokio::select! {
        result = StatusBar::new(config).run(sink) => {
            result?;
            // Nothing will change any more, but the last line stays valid.
            tracing::info!("Keeping last status line until interrupted");
            tokio::signal::ctrl_c().await?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, exiting");
        }
    }

    Ok(())
}
