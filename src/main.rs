use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use connect_four_showdown::config::AppConfig;
use connect_four_showdown::inference::{InferenceClient, MetricsSummary};
use connect_four_showdown::logging;
use connect_four_showdown::orchestrator::{MatchSnapshot, Phase};
use connect_four_showdown::session::{Session, SessionCommand, SessionUpdate};
use connect_four_showdown::telemetry::{StreamState, TelemetryStream};

/// Play Connect Four against a remote model from the terminal.
#[derive(Parser)]
#[command(name = "showdown", about = "Play Connect Four against a remote model")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "showdown.toml")]
    config: PathBuf,

    /// Override the inference service root URL
    #[arg(long)]
    server: Option<String>,

    /// Override the backend to start on
    #[arg(long)]
    backend: Option<String>,

    /// Override the log filter (RUST_LOG still wins)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,
}

const HELP: &str = "commands: 1-7 drop a disc | b <key> switch backend | retry | r reset | backends | q quit";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(server) = cli.server {
        config.service.base_url = server;
    }
    if let Some(backend) = cli.backend {
        config.service.default_backend = backend;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.validate().context("validating command-line overrides")?;

    logging::init(&config.logging.level);

    let client = InferenceClient::from_config(&config.service)
        .context("creating inference client")?;
    let stream = TelemetryStream::from_config(&config.service, &config.telemetry)
        .context("deriving telemetry URL")?;
    info!(server = %client.base_url(), telemetry = %stream.url(), "starting showdown");

    let shutdown = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(256);
    let stream_task = tokio::spawn(stream.run(event_tx, shutdown.clone()));

    let (command_tx, command_rx) = mpsc::channel(16);
    let (update_tx, mut update_rx) = mpsc::channel(64);
    let session = Session::from_config(client, &config);
    let session_task = tokio::spawn(session.run(command_rx, event_rx, update_tx));

    // Blocking stdin reader on its own thread so it never holds up shutdown
    std::thread::spawn(move || read_commands(command_tx));

    println!("{HELP}");
    let mut view = View::default();
    while let Some(update) = update_rx.recv().await {
        view.apply(update);
    }

    shutdown.cancel();
    let last = session_task.await.context("session task panicked")?;
    stream_task.await.context("telemetry task panicked")?;
    println!("{}", last.status);
    Ok(())
}

fn read_commands(commands: mpsc::Sender<SessionCommand>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<SessionCommand>() {
            Ok(command) => {
                let quit = command == SessionCommand::Shutdown;
                if commands.blocking_send(command).is_err() || quit {
                    return;
                }
            }
            Err(e) => eprintln!("{e}. {HELP}"),
        }
    }
    // EOF
    let _ = commands.blocking_send(SessionCommand::Shutdown);
}

/// Plain-text rendering of session updates. Only prints what changed.
#[derive(Default)]
struct View {
    last_match: Option<MatchSnapshot>,
    stream: Option<StreamState>,
    samples_seen: usize,
}

impl View {
    fn apply(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Match(snapshot) => {
                if self.last_match.as_ref() != Some(&snapshot) {
                    render_match(&snapshot);
                    self.last_match = Some(snapshot);
                }
            }
            SessionUpdate::Backends(backends) => {
                let names: Vec<String> = backends
                    .iter()
                    .map(|b| format!("{} ({})", b.key, b.display_name))
                    .collect();
                println!("backends: {}", names.join(", "));
            }
            SessionUpdate::Summary(summary) => render_summary(&summary),
            SessionUpdate::Telemetry(samples) => {
                self.samples_seen = samples.len();
            }
            SessionUpdate::Stream(state) => {
                if self.stream != Some(state) {
                    println!(
                        "telemetry: {state:?} ({} samples buffered)",
                        self.samples_seen
                    );
                    self.stream = Some(state);
                }
            }
        }
    }
}

fn render_match(snapshot: &MatchSnapshot) {
    println!();
    println!("{}", snapshot.board);
    if let Some(column) = snapshot.hint_column {
        println!("hint: column {}", column + 1);
    }
    let latency = match (snapshot.last_latency_ms, &snapshot.last_backend) {
        (Some(ms), Some(backend)) => format!(" | last move {ms:.1} ms on {backend}"),
        _ => String::new(),
    };
    println!("[{}]{latency}", snapshot.backend);
    println!("{}", snapshot.status);
    if snapshot.phase == Phase::OpponentStalled {
        println!("type `retry` to ask again, or `b <key>` to switch backend first");
    }
}

fn render_summary(summary: &MetricsSummary) {
    let overall = &summary.overall;
    if overall.latency_ms.count == 0.0 {
        return;
    }
    println!(
        "latency p50 {:.1} ms, p95 {:.1} ms over {} calls",
        overall.latency_ms.p50, overall.latency_ms.p95, overall.latency_ms.count
    );
}
