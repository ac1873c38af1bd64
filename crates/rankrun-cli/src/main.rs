use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use rankrun_core::domain::{DEFAULT_DESCRIPTOR_CAPACITY, IndexMode, LengthPolicy};
use rankrun_core::impls::{EnvFabric, StaticFabric};
use rankrun_core::ports::Fabric;
use rankrun_core::{RunConfig, Runner, StatusPolicy};

#[derive(Parser, Debug)]
#[command(name = "rankrun")]
#[command(version)]
#[command(about = "Launch this worker's line of a task manifest, passing its rank")]
struct Args {
    /// Batch index M: the manifest line (0-based) this run is responsible for
    #[arg(allow_negative_numbers = true)]
    batch_index: String,

    /// Task manifest, one descriptor per line
    #[arg(long, env = "RANKRUN_MANIFEST", default_value = "list")]
    manifest: PathBuf,

    /// Prefix placed before the descriptor (empty to run descriptors directly)
    #[arg(long, env = "RANKRUN_RUNNER", default_value = "python")]
    runner: String,

    /// Descriptor buffer size in bytes; the longest accepted descriptor is one byte less
    #[arg(long, env = "RANKRUN_MAX_DESCRIPTOR_BYTES", default_value_t = DEFAULT_DESCRIPTOR_CAPACITY)]
    max_descriptor_bytes: usize,

    /// What to do with a descriptor over the limit
    #[arg(long, env = "RANKRUN_ON_LONG_DESCRIPTOR", value_enum, default_value = "reject")]
    on_long_descriptor: LongDescriptor,

    /// How the manifest line is computed from M
    #[arg(long, env = "RANKRUN_INDEX_MODE", value_enum, default_value = "batch")]
    index_mode: IndexModeArg,

    /// Exit with the job's status when it fails (default: log and exit 0)
    #[arg(long, env = "RANKRUN_PROPAGATE_STATUS")]
    propagate_status: bool,

    /// Kill the job after this many milliseconds
    #[arg(long, env = "RANKRUN_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Shell used to run the invocation
    #[arg(long, env = "RANKRUN_SHELL", default_value = "sh")]
    shell: String,

    /// Rank of this worker (skips launcher environment detection)
    #[arg(long, requires = "world_size")]
    rank: Option<u32>,

    /// Number of workers in the group
    #[arg(long, requires = "rank")]
    world_size: Option<u32>,

    /// Select and print the invocation without launching it
    #[arg(long)]
    dry_run: bool,

    /// Print a run report on stdout when done
    #[arg(long, value_enum, default_value = "none")]
    report: ReportFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LongDescriptor {
    Reject,
    Truncate,
    /// Ignore the limit
    Allow,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IndexModeArg {
    /// line = M
    Batch,
    /// line = M * world_size + rank
    Strided,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    None,
    Json,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        let capacity = self.max_descriptor_bytes;
        let length_policy = match self.on_long_descriptor {
            LongDescriptor::Reject => LengthPolicy::Reject { capacity },
            LongDescriptor::Truncate => LengthPolicy::Truncate { capacity },
            LongDescriptor::Allow => LengthPolicy::Unbounded,
        };
        let index_mode = match self.index_mode {
            IndexModeArg::Batch => IndexMode::Batch,
            IndexModeArg::Strided => IndexMode::Strided,
        };
        let status_policy = if self.propagate_status {
            StatusPolicy::Propagate
        } else {
            StatusPolicy::Discard
        };

        let mut config = RunConfig::new(&self.manifest, &self.runner)
            .with_length_policy(length_policy)
            .with_index_mode(index_mode)
            .with_status_policy(status_policy)
            .with_shell(&self.shell, vec!["-c".to_string()])
            .with_dry_run(self.dry_run);
        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout_ms(ms);
        }
        config
    }

    fn fabric(&self) -> Box<dyn Fabric> {
        match (self.rank, self.world_size) {
            (Some(rank), Some(world_size)) => Box::new(StaticFabric::new(rank, world_size)),
            _ => Box::new(EnvFabric::from_env()),
        }
    }
}

/// SIGINT / SIGTERM を受けたら cancel に `true` を送る
#[cfg(unix)]
async fn forward_shutdown_signals(cancel: watch::Sender<bool>) {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Failed to install signal handlers, cancellation disabled");
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, cancelling job"),
        _ = sigint.recv() => tracing::info!("Received SIGINT, cancelling job"),
    }
    let _ = cancel.send(true);
}

#[cfg(not(unix))]
async fn forward_shutdown_signals(cancel: watch::Sender<bool>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl-C, cancelling job");
        let _ = cancel.send(true);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // stdout はジョブの出力とレポート用。ログは stderr に出す
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.run_config();
    tracing::debug!(?config, "Loaded configuration");

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(forward_shutdown_signals(cancel_tx));

    let runner = Runner::from_config(&config).with_cancel(cancel_rx);
    let fabric = args.fabric();
    let report = runner.run(fabric.as_ref(), &args.batch_index).await;

    if let ReportFormat::Json = args.report {
        match report.to_json_line() {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "Failed to serialize run report"),
        }
    }

    ExitCode::from(report.exit_status)
}
