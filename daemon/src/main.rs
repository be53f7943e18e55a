//! evote daemon: entry point for running a vote ledger node.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use evote_node::{
    init_logging, NodeConfig, ShutdownController, SubmitError, VoteNode, VoteRequest,
};
use evote_ledger::ChainSnapshot;
use evote_nullables::ElectionFixture;
use evote_store::{ElectoralRoll, MemoryRegistry};

#[derive(Parser)]
#[command(name = "evote-daemon", about = "evote vote ledger daemon")]
struct Cli {
    /// Leading zero hex digits required of every block hash.
    #[arg(long, env = "EVOTE_DIFFICULTY")]
    difficulty: Option<u32>,

    /// Pool size at which a block is sealed.
    #[arg(long, env = "EVOTE_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Seconds between flushes of a partially filled pool (0 disables).
    #[arg(long, env = "EVOTE_FLUSH_INTERVAL_SECS")]
    flush_interval_secs: Option<u64>,

    /// Milliseconds a submission waits for its voter's lock.
    #[arg(long, env = "EVOTE_LOCK_TIMEOUT_MS")]
    lock_timeout_ms: Option<u64>,

    /// Collect Prometheus metrics and dump them on exit.
    #[arg(long, env = "EVOTE_ENABLE_METRICS")]
    metrics: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "EVOTE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "EVOTE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "EVOTE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run a node over an electoral roll until SIGINT/SIGTERM.
    Run {
        /// TOML electoral roll with `[[voters]]` and `[[candidates]]` tables.
        #[arg(long, env = "EVOTE_ROLL")]
        roll: PathBuf,

        /// Restore the chain and its revocations from this bincode snapshot.
        #[arg(long, env = "EVOTE_SNAPSHOT_IN")]
        snapshot_in: Option<PathBuf>,

        /// Write a bincode chain snapshot here on shutdown.
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
    },
    /// Run a self-contained demo election and print the results.
    Demo {
        #[arg(long, default_value_t = 25)]
        voters: usize,

        #[arg(long, default_value_t = 3)]
        candidates: usize,

        #[arg(long, default_value = "Demo Central")]
        constituency: String,

        /// Write a bincode chain snapshot here after the final seal.
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
    },
}

impl Cli {
    /// File settings (or defaults) with CLI flags and env vars layered on top.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let base = match &self.config {
            Some(path) => {
                let path_str = path.to_str().context("config path is not valid UTF-8")?;
                NodeConfig::from_toml_file(path_str)
                    .with_context(|| format!("loading config {}", path.display()))?
            }
            None => NodeConfig::default(),
        };

        let config = NodeConfig {
            difficulty: self.difficulty.unwrap_or(base.difficulty),
            batch_size: self.batch_size.unwrap_or(base.batch_size),
            flush_interval_secs: self.flush_interval_secs.unwrap_or(base.flush_interval_secs),
            lock_timeout_ms: self.lock_timeout_ms.unwrap_or(base.lock_timeout_ms),
            enable_metrics: self.metrics || base.enable_metrics,
            log_level: self.log_level.clone().unwrap_or(base.log_level),
            log_format: self.log_format.clone().unwrap_or(base.log_format),
        };
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;

    if let Err(e) = init_logging(config.log_format()?, &config.log_level) {
        eprintln!("logging already initialised: {e}");
    }
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Command::Run {
            roll,
            snapshot_in,
            snapshot_out,
        } => run(config, &roll, snapshot_in.as_deref(), snapshot_out.as_deref()).await,
        Command::Demo {
            voters,
            candidates,
            constituency,
            snapshot_out,
        } => {
            demo(
                config,
                &constituency,
                voters,
                candidates,
                snapshot_out.as_deref(),
            )
            .await
        }
    }
}

async fn run(
    config: NodeConfig,
    roll_path: &Path,
    snapshot_in: Option<&Path>,
    snapshot_out: Option<&Path>,
) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(roll_path)
        .with_context(|| format!("reading electoral roll {}", roll_path.display()))?;
    let roll: ElectoralRoll = toml::from_str(&contents)
        .with_context(|| format!("parsing electoral roll {}", roll_path.display()))?;
    let registry = Arc::new(MemoryRegistry::from_roll(&roll)?);
    tracing::info!(
        voters = roll.voters.len(),
        candidates = roll.candidates.len(),
        "electoral roll loaded"
    );

    let mut builder = VoteNode::builder(config, registry.clone(), registry);
    if let Some(path) = snapshot_in {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let snapshot = ChainSnapshot::from_bytes(&bytes)
            .with_context(|| format!("decoding snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), blocks = snapshot.block_count(), "loaded chain snapshot");
        builder = builder.snapshot(snapshot);
    }
    let mut node = builder.build().context("building vote node")?;
    if !node.health_check().is_healthy() {
        tracing::error!("restored chain failed its health check, running fail-closed");
    }
    node.start().await?;

    let shutdown = ShutdownController::new();
    shutdown.wait_for_signal().await?;

    node.stop().await?;
    finish(&node, snapshot_out)?;
    tracing::info!("evote daemon exited cleanly");
    Ok(())
}

async fn demo(
    config: NodeConfig,
    constituency: &str,
    voters: usize,
    candidates: usize,
    snapshot_out: Option<&Path>,
) -> anyhow::Result<()> {
    anyhow::ensure!(candidates > 0, "a demo election needs at least one candidate");

    let fixture = ElectionFixture::new(constituency, voters, candidates);
    let mut node = VoteNode::new(config, fixture.registry.clone(), fixture.registry.clone())?;
    node.start().await?;

    let mut accepted = 0usize;
    for (n, voter) in fixture.voters.iter().enumerate() {
        let request = VoteRequest {
            voter_id: voter.clone(),
            candidate_id: fixture.candidates[n % candidates].clone(),
            constituency: fixture.constituency.clone(),
            session_nonce: format!("demo-session-{n}"),
        };
        match node.submit(request).await {
            Ok(receipt) => {
                accepted += 1;
                tracing::debug!(voter = %voter, receipt = %receipt.receipt_id, "demo vote accepted");
            }
            Err(e) => tracing::warn!(voter = %voter, error = %e, "demo vote rejected"),
        }
    }

    // A second attempt by the first voter must be refused.
    if let Some(voter) = fixture.voters.first() {
        let retry = VoteRequest {
            voter_id: voter.clone(),
            candidate_id: fixture.candidates[0].clone(),
            constituency: fixture.constituency.clone(),
            session_nonce: "demo-session-retry".to_string(),
        };
        match node.submit(retry).await {
            Err(SubmitError::AlreadyVoted) => tracing::info!(voter = %voter, "double vote refused"),
            other => anyhow::bail!("double vote was not refused: {other:?}"),
        }
    }

    node.stop().await?;

    println!("accepted {accepted} of {voters} votes");
    println!(
        "{}",
        serde_json::to_string_pretty(&node.results(&fixture.constituency))?
    );
    finish(&node, snapshot_out)
}

/// Print final stats and health, dump metrics and export the chain if asked.
fn finish(node: &VoteNode, snapshot_out: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&node.stats())?);

    let health = node.health_check();
    println!("{}", serde_json::to_string_pretty(&health)?);
    if !health.is_healthy() {
        tracing::error!(?health, "ledger is unhealthy");
    }

    if let Some(metrics) = node.metrics() {
        print!("{}", metrics.render()?);
    }

    if let Some(path) = snapshot_out {
        let snapshot = node.snapshot();
        std::fs::write(path, snapshot.to_bytes()?)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            blocks = snapshot.block_count(),
            "chain snapshot written"
        );
    }
    Ok(())
}
