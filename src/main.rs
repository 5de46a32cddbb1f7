use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use taskq::dispatch::{ExecutionResult, WorkerArgs, run_worker};
use taskq::{App, Config};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("worker") => worker(args.collect()),
        Some(other) => anyhow::bail!("unknown command `{other}` (expected no arguments or `worker`)"),
        None => serve(),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

// ── Worker process ──────────────────────────────────────────────────────

fn worker(args: Vec<String>) -> anyhow::Result<()> {
    // stdout stays free for the task; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = WorkerArgs::parse(args).context("invalid worker arguments")?;
    match run_worker(&args) {
        ExecutionResult::Success => Ok(()),
        ExecutionResult::Failure => std::process::exit(1),
    }
}

// ── Server ──────────────────────────────────────────────────────────────

fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "taskq.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();
    guard
}

fn serve() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    let _log_guard = init_tracing(&config);

    eprintln!("taskq v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   HTTP: http://{}", config.http_addr);
    eprintln!(
        "   Slots: {}  Workers: {} ({:?})",
        config.max_running_tasks, config.pool_workers, config.executor
    );

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?
        .block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.http_addr;
    let mut app = App::build(config)?;
    app.start();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server started");

    let served = axum::serve(listener, app.router())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Unable to listen for Ctrl-C");
            }
            tracing::info!("Ctrl-C received");
        })
        .await;

    app.shutdown().await;
    served.context("HTTP server failed")
}
