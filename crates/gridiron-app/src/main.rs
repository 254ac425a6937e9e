// Gridiron command-line entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log file under logs/, or stderr with --log-stderr)
// 3. Load settings, copying defaults/ into config/ on first run
// 4. Load the slate named in settings
// 5. Run the subcommand on a blocking task; Ctrl-C cancels it at the next
//    wave or batch boundary
// 6. Write the JSON response to stdout or --out

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gridiron_app::protocol::LineupSet;
use gridiron_app::{config, Service};
use gridiron_core::CancelFlag;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "gridiron", version, about = "DraftKings NFL lineup optimizer and contest simulator")]
struct Cli {
    /// Log to stderr instead of logs/gridiron.log.
    #[arg(long, global = true)]
    log_stderr: bool,

    /// Write the JSON response here instead of stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the player catalog.
    Players,
    /// Build lineups. Request fields override [optimizer] settings.
    Optimize {
        #[arg(long)]
        request: Option<PathBuf>,
    },
    /// Simulate a contest. Without --lineups the optimizer runs first.
    Simulate {
        #[arg(long)]
        request: Option<PathBuf>,
        /// A saved optimizer response to simulate.
        #[arg(long)]
        lineups: Option<PathBuf>,
    },
    /// Pool statistics for a saved optimizer response.
    Stats {
        #[arg(long)]
        lineups: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.log_stderr)?;
    info!("gridiron starting");

    let settings = config::load_settings().context("failed to load settings")?;
    let service = Arc::new(Service::from_settings(settings).context("failed to load player catalog")?);
    info!("Slate loaded: {} players", service.catalog().len());

    let cancel = CancelFlag::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received; cancelling at the next checkpoint");
                cancel.cancel();
            }
        }
    });

    let out = cli.out.as_deref();
    let success = match cli.command {
        Command::Players => {
            emit(&service.players(), out)?;
            true
        }
        Command::Optimize { request } => {
            let request = read_request(request.as_deref())?;
            let response = tokio::task::spawn_blocking({
                let service = Arc::clone(&service);
                move || service.optimize(&request, &cancel)
            })
            .await
            .context("optimizer task failed")?;
            emit(&response, out)?;
            response.success
        }
        Command::Simulate { request, lineups } => {
            let request = read_request(request.as_deref())?;
            let lineups = lineups.as_deref().map(read_lineups).transpose()?;
            let response = tokio::task::spawn_blocking({
                let service = Arc::clone(&service);
                move || service.simulate(&request, lineups.as_ref(), &cancel)
            })
            .await
            .context("simulation task failed")?;
            emit(&response, out)?;
            response.success
        }
        Command::Stats { lineups } => {
            let response = service.stats(&read_lineups(&lineups)?);
            emit(&response, out)?;
            response.success
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn read_request(path: Option<&Path>) -> anyhow::Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Null);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("request {} is not valid JSON", path.display()))
}

fn read_lineups(path: &Path) -> anyhow::Result<LineupSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read lineups {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} has no `lineups` array", path.display()))
}

fn emit<T: Serialize>(response: &T, out: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(response).context("failed to encode response")?;
    match out {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn init_tracing(log_stderr: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridiron=info,warn"));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    if log_stderr {
        let subscriber = builder.with_writer(std::io::stderr).finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")?;
    } else {
        let log_dir = std::env::current_dir()?.join("logs");
        std::fs::create_dir_all(&log_dir)?;
        let log_file = std::fs::File::create(log_dir.join("gridiron.log"))?;
        let subscriber = builder.with_writer(log_file).finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")?;
    }

    Ok(())
}
