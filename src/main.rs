//! gokey-control: command-line control surface for the GõKey input engine
//!
//! Talks to the running engine over its Unix socket:
//! - `status` prints the mirrored state
//! - `toggle` flips Vietnamese input on or off
//! - `watch` follows pushed state changes until interrupted
//! - `record` captures a new toggle hotkey from the keyboard (macOS)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gokey_control::config::Config;
use gokey_control::dispatch::Dispatcher;
use gokey_control::gateway::Gateway;
use gokey_control::ipc::UnixTransport;
use gokey_control::lifecycle::{ForegroundSignal, ShutdownSignal};
use gokey_control::state::{StateStore, Surface, SyncTrigger, UiSnapshot};

/// Command-line interface for `gokey-control`
#[derive(Parser, Debug)]
#[command(
    name = "gokey-control",
    about = "Control surface for the GõKey Vietnamese input engine",
    version
)]
struct Cli {
    /// Engine socket path; overrides GOKEY_SOCKET
    #[arg(long, value_name = "PATH")]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the current engine state
    Status,
    /// Flip Vietnamese input on or off
    Toggle,
    /// Follow state changes until interrupted
    Watch,
    /// Record a new toggle hotkey from the keyboard
    Record {
        /// How long to listen for key presses
        #[arg(long, default_value_t = 5)]
        seconds: u64,

        /// Save the recorded hotkey if the engine accepts it
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(socket) = cli.socket {
        config.socket_path = socket;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        socket = ?config.socket_path,
        "gokey-control starting"
    );

    let transport = Arc::new(UnixTransport::new(&config.socket_path));
    let gateway = Gateway::new(transport.clone());
    let dispatcher = Dispatcher::new(gateway, StateStore::new());

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Status => status(&dispatcher).await,
        Commands::Toggle => toggle(&dispatcher).await,
        Commands::Watch => watch(&dispatcher, transport).await,
        Commands::Record { seconds, save } => record(&dispatcher, seconds, save).await,
    }
}

fn print_snapshot(snapshot: &UiSnapshot) {
    println!(
        "{} | {} | hotkey {} | macros {} | excluded apps {} | engine {}",
        if snapshot.is_enabled { "Vietnamese" } else { "English" },
        snapshot.typing_method,
        snapshot.hotkey.display(),
        snapshot.macros.len(),
        snapshot.excluded_apps.len(),
        snapshot.version,
    );
}

async fn status(dispatcher: &Dispatcher) -> Result<()> {
    if !dispatcher.refresh(SyncTrigger::Mount).await {
        bail!("engine unreachable");
    }
    match dispatcher.store().surface() {
        Surface::Ready(snapshot) => print_snapshot(&snapshot),
        Surface::PermissionRequired => {
            println!("Accessibility permission required: grant access in System Settings")
        }
        Surface::Loading => bail!("no state received"),
    }
    Ok(())
}

async fn toggle(dispatcher: &Dispatcher) -> Result<()> {
    if !dispatcher.refresh(SyncTrigger::Mount).await {
        bail!("engine unreachable");
    }
    match dispatcher.toggle_enabled().await {
        Some(snapshot) => {
            print_snapshot(&snapshot);
            Ok(())
        }
        None => bail!("toggle failed"),
    }
}

async fn watch(dispatcher: &Dispatcher, transport: Arc<UnixTransport>) -> Result<()> {
    let store = dispatcher.store().clone();
    let mut changes = store.subscribe();
    let mut notices = dispatcher.notices();
    let mut foreground = ForegroundSignal::new()?;
    let shutdown_signal = ShutdownSignal::new();
    let shutdown = shutdown_signal.wait();
    tokio::pin!(shutdown);

    let sync = store.subscribe_to_external_events(dispatcher.gateway().clone(), transport);
    dispatcher.refresh(SyncTrigger::Mount).await;

    info!("watching engine state, entering main loop");

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let surface = store.surface();
                match surface {
                    Surface::Ready(snapshot) => print_snapshot(&snapshot),
                    Surface::PermissionRequired => println!("Accessibility permission required"),
                    Surface::Loading => {}
                }
            }

            notice = notices.recv() => match notice {
                Ok(notice) => warn!(%notice, "engine notice"),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "notice receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            resumed = foreground.recv() => {
                if resumed.is_none() {
                    break;
                }
                dispatcher.refresh(SyncTrigger::Foreground).await;
            }

            result = &mut shutdown => {
                result?;
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!("shutting down...");
    let _ = sync.stop().await;
    info!("gokey-control stopped");

    Ok(())
}

#[cfg(target_os = "macos")]
async fn record(dispatcher: &Dispatcher, seconds: u64, save: bool) -> Result<()> {
    use std::time::Duration;

    use gokey_control::hotkey::{HotkeyCapture, KeyListener, Review};
    use tokio::sync::mpsc;

    if !dispatcher.refresh(SyncTrigger::Mount).await {
        bail!("engine unreachable");
    }
    let mut capture = HotkeyCapture::new(dispatcher.clone());
    println!("Current hotkey: {}", capture.committed_display());

    let (key_tx, mut key_rx) = mpsc::channel(32);
    let listener = KeyListener::new(key_tx);
    listener.start()?;
    capture.start_recording()?;
    println!("Press the new hotkey within {seconds}s...");

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            key = key_rx.recv() => match key {
                Some(key) => {
                    capture.handle_key_down(&key);
                    let tokens: Vec<String> =
                        capture.phase().tokens().iter().map(|t| t.symbol()).collect();
                    println!("  {}", tokens.join(" + "));
                }
                None => break,
            },
        }
    }
    listener.stop();
    capture.stop_recording().await;

    let Some(candidate) = capture.phase().candidate().copied() else {
        println!("No hotkey recorded");
        return Ok(());
    };
    match capture.review() {
        Some(Review::Available) => println!("{} is available", candidate.hotkey().display()),
        Some(Review::Conflict(message)) => println!("{candidate} conflicts: {message}"),
        Some(Review::Invalid(message)) => println!("{candidate} is invalid: {message}"),
        None => println!("{candidate} is already the current hotkey"),
    }

    if save && capture.can_save() {
        capture.save().await?;
        println!("Saved. Current hotkey: {}", capture.committed_display());
    } else {
        capture.cancel();
    }
    Ok(())
}

#[cfg(not(target_os = "macos"))]
async fn record(_dispatcher: &Dispatcher, _seconds: u64, _save: bool) -> Result<()> {
    bail!("hotkey recording needs the macOS event tap")
}
