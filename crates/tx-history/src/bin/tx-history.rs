use std::{
    path::{
        Path,
        PathBuf,
    },
    sync::Arc,
};

use anyhow::{
    Context,
    Result,
};
use clap::{
    Parser,
    Subcommand,
};
use tracing::info;
use tracing_subscriber::{
    EnvFilter,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use tx_history::{
    HistoryConfig,
    replay::{
        RecordedSnapshot,
        Replayer,
    },
    scroll::ScrollTarget,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Transaction history view engine", long_about = None)]
struct Cli {
    /// JSON config file. Defaults apply when omitted.
    #[arg(long, env = "TX_HISTORY_CONFIG")]
    config: Option<PathBuf>,
    /// Overrides `scroll_delay_ms` from the config file
    #[arg(long, env = "TX_HISTORY_SCROLL_DELAY_MS")]
    scroll_delay_ms: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay recorded store snapshots through a session and print every
    /// view update as a JSON line
    Replay {
        /// JSON array of feed snapshots
        #[arg(long, env = "TX_HISTORY_FEED")]
        feed: PathBuf,
    },
}

struct LoggingScrollTarget;

impl ScrollTarget for LoggingScrollTarget {
    fn scroll_to_index(&self, index: usize, animated: bool) {
        info!(index, animated, "scrolled history");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => HistoryConfig::from_file(path)?,
        None => HistoryConfig::default(),
    };
    if let Some(delay) = cli.scroll_delay_ms {
        config.scroll_delay_ms = delay;
    }
    let config = config.validate()?;

    match cli.command {
        Command::Replay { feed } => replay(config, &feed).await,
    }
}

async fn replay(config: HistoryConfig, path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read feed file: {}", path.display()))?;
    let snapshots: Vec<RecordedSnapshot> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse feed file: {}", path.display()))?;
    let Some(first) = snapshots.first() else {
        info!("feed file is empty, nothing to replay");
        return Ok(());
    };

    let settle = config.scroll_delay();
    let mut replayer = Replayer::new(first.selector(), config)?;
    let target: Arc<dyn ScrollTarget> = Arc::new(LoggingScrollTarget);
    replayer.set_scroll_target(&target);

    info!(snapshots = snapshots.len(), "replaying feed");
    for snapshot in &snapshots {
        let line = replayer.apply(snapshot);
        println!("{}", serde_json::to_string(&line)?);
        // Let scrolls scheduled by this step run before the next one.
        tokio::time::sleep(settle).await;
    }

    replayer.finish();
    Ok(())
}
