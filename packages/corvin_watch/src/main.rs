//! corvin-watch: tail a Corvin server's task event stream.
//!
//! Subscribes to the server's SSE task stream and prints one line per
//! progress update. SIGUSR1 pauses the stream (the subscription closes its
//! connection, as a hidden browser tab would), SIGUSR2 resumes it, and
//! Ctrl-C shuts down.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;
use tracing_subscriber::prelude::*;

use corvin_events::{
    FnHandler, HostSignal, SseConnector, Subscriber, SubscriberOptions, TaskEvent,
};

mod config;

use config::FileConfig;

#[derive(Parser)]
#[command(name = "corvin-watch")]
#[command(about = "Tail task/download progress from a Corvin server")]
struct Cli {
    /// Stream endpoint (overrides config.toml / CORVIN_STREAM__ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Custom data directory (defaults to ~/.corvin)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Start paused; resume with SIGUSR2
    #[arg(long)]
    paused: bool,
}

fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "corvin_watch=debug,corvin_events=debug,info"
    } else {
        "corvin_watch=info,corvin_events=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".corvin"))
        .unwrap_or_else(|| PathBuf::from(".corvin"))
}

fn print_event(event: &TaskEvent) {
    let title = event.title.as_deref().unwrap_or("(untitled)");
    match event.progress {
        Some(progress) => println!(
            "task {:>4}  {:<12} {:>5.1}%  {}",
            event.id, event.status, progress, title
        ),
        None => println!("task {:>4}  {:<12}         {}", event.id, event.status, title),
    }
    if let Some(detail) = &event.detail {
        println!("           {}", detail);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let file_config: FileConfig = config::load_config(&data_dir)
        .extract()
        .context("invalid configuration")?;

    let endpoint = cli.endpoint.unwrap_or(file_config.stream.endpoint);
    let paused = cli.paused || file_config.stream.paused_on_start;

    info!(endpoint = %endpoint, "watching task stream");

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<TaskEvent>();
    let (error_tx, mut error_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    let handler = FnHandler::new(
        move |event: TaskEvent| {
            let _ = event_tx.send(event);
        },
        move || {
            let _ = error_tx.send(());
        },
    );

    let subscriber = Subscriber::spawn(
        SseConnector::new(),
        handler,
        SubscriberOptions {
            endpoint: Some(endpoint),
            visible: !paused,
            focused: true,
        },
    );

    let mut pause_signal =
        signal(SignalKind::user_defined1()).context("failed to install SIGUSR1 handler")?;
    let mut resume_signal =
        signal(SignalKind::user_defined2()).context("failed to install SIGUSR2 handler")?;

    if paused {
        eprintln!("[corvin: paused - send SIGUSR2 to resume]");
    }

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                print_event(&event);
            }
            Some(()) = error_rx.recv() => {
                eprintln!("[corvin: stream error - reconnects on next resume]");
            }
            _ = pause_signal.recv() => {
                info!("pausing stream");
                subscriber
                    .notify(HostSignal::Visibility { visible: false })
                    .await?;
                eprintln!("[corvin: paused]");
            }
            _ = resume_signal.recv() => {
                info!("resuming stream");
                subscriber
                    .notify(HostSignal::Visibility { visible: true })
                    .await?;
                eprintln!("[corvin: resumed]");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                let _ = subscriber.notify(HostSignal::Unload).await;
                break;
            }
        }
    }

    subscriber.shutdown().await;
    eprintln!("[corvin: disconnected]");
    Ok(())
}
