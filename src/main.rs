//! pipevisor
//!
//! Runs `--producer` and `--consumer` joined by a pipe, the way a shell runs
//! `producer | consumer`, and restarts the pair whenever either side exits
//! (unless `--norestart`). SIGHUP, SIGINT and SIGTERM stop the program once
//! the running pair has exited.
//!
//! The process always exits with status 1: the supervisor loop has no clean
//! exit path, only "policy said stop" and "shutdown requested".

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pipevisor::{
    LogWriter, RestartPolicy, SignalListener, Stopped, Subscribe, Supervisor, SupervisorConfig,
};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pipevisor", version)]
#[command(about = "Supervise a producer | consumer pipeline", long_about = None)]
struct Cli {
    /// Path to the producer executable (writes to stdout)
    #[arg(long, env = "PIPEVISOR_PRODUCER", value_name = "PATH")]
    producer: PathBuf,

    /// Path to the consumer executable (reads from stdin)
    #[arg(long, env = "PIPEVISOR_CONSUMER", value_name = "PATH")]
    consumer: PathBuf,

    /// Debug logging
    #[arg(long)]
    debug: bool,

    /// Do not restart a failed pipeline, just quit
    #[arg(long)]
    norestart: bool,

    /// Seconds between SIGTERM and SIGKILL for a child that does not exit (0 = never)
    #[arg(long, value_name = "SECONDS", default_value_t = 0)]
    kill_after: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help / --version print to stdout and succeed; usage errors exit 1.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_logging(cli.debug);

    match run(cli).await {
        Ok(stopped) => debug!(
            generations = stopped.generations,
            reason = stopped.reason.as_str(),
            "exiting"
        ),
        Err(e) => error!("{e:#}"),
    }
    ExitCode::FAILURE
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();
}

async fn run(cli: Cli) -> Result<Stopped> {
    let cfg = build_config(&cli)?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let sup = Supervisor::builder(cfg).with_subscribers(subs).build();

    let signals = SignalListener::install(sup.shutdown_token(), sup.bus().clone())?;
    tokio::spawn(signals.run());

    Ok(sup.run().await?)
}

fn build_config(cli: &Cli) -> Result<SupervisorConfig> {
    let producer = absolute(&cli.producer, "producer")?;
    let consumer = absolute(&cli.consumer, "consumer")?;

    let mut cfg = SupervisorConfig::new(producer, consumer);
    cfg.restart = RestartPolicy::from_norestart(cli.norestart);
    cfg.kill_after = Duration::from_secs(cli.kill_after);
    Ok(cfg)
}

fn absolute(path: &Path, what: &str) -> Result<PathBuf> {
    let abs = std::path::absolute(path)
        .with_context(|| format!("resolving {what} path {}", path.display()))?;
    debug!("abs {what}: {}", abs.display());
    Ok(abs)
}
