use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use replay_recorder::{
    create_router, Action, AppState, Config, ModeKind, ReplayStore, SessionController,
    SessionHandle, SimulatedSession,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "replay-recorder")]
#[command(about = "Record sensor sessions to replay files and play them back", version)]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/replay-recorder")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API
    Serve,
    /// List stored replays
    List,
    /// Delete a stored replay
    Delete {
        /// File name of the replay
        name: String,
    },
    /// Record a new replay
    Record {
        /// Seconds to record for
        #[arg(short, long, default_value = "10")]
        duration: u64,
    },
    /// Play a stored replay until it finishes
    Replay {
        /// File name of the replay
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let cfg = Config::load(&cli.config)?;
    let store = cfg.replay_store()?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Replays: {}", store.location().display());

    match cli.command {
        Command::Serve => serve(&cfg, store).await,
        Command::List => list(&store),
        Command::Delete { name } => {
            let path = store.resolve(&name)?;
            store.delete(&path)?;
            println!("Deleted {}", name);
            Ok(())
        }
        Command::Record { duration } => record(&cfg, store, Duration::from_secs(duration)).await,
        Command::Replay { name } => replay(&cfg, store, &name).await,
    }
}

fn start_controller(cfg: &Config, store: ReplayStore) -> (SessionHandle, JoinHandle<()>) {
    let mut engine = SimulatedSession::new(cfg.simulation.frame_rate);
    engine.set_available(cfg.simulation.available);

    SessionController::spawn(engine, store, cfg.replay_resolver(), cfg.tracking_options())
}

async fn serve(cfg: &Config, store: ReplayStore) -> Result<()> {
    let (session, controller) = start_controller(cfg, store.clone());
    session.appear().await.context("Failed to start session")?;

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP API listening on {}", addr);

    let router = create_router(AppState::new(session.clone(), store));
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    info!("Shutting down");
    session.shutdown().await?;
    controller.await.context("Session controller panicked")?;

    Ok(())
}

fn list(store: &ReplayStore) -> Result<()> {
    let replays = store.enumerate()?;
    if replays.is_empty() {
        println!("No replays in {}", store.location().display());
    }
    for path in replays {
        if let Some(name) = path.file_name() {
            println!("{}", name.to_string_lossy());
        }
    }
    Ok(())
}

async fn record(cfg: &Config, store: ReplayStore, duration: Duration) -> Result<()> {
    let (session, controller) = start_controller(cfg, store);
    session.appear().await.context("Failed to start session")?;

    let path = session.start_recording().await?;
    info!("Recording for {}s (Ctrl+C to stop early)", duration.as_secs());

    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    session.stop_recording().await?;
    session.shutdown().await?;
    controller.await.context("Session controller panicked")?;

    println!("Saved {}", path.display());
    Ok(())
}

async fn replay(cfg: &Config, store: ReplayStore, name: &str) -> Result<()> {
    let path = store.resolve(name)?;
    let (session, controller) = start_controller(cfg, store);
    session.appear().await.context("Failed to start session")?;

    if let Some(backend) = session.start_replay(Some(path)).await? {
        info!("Replaying {} with the {} reader", name, backend);
    }

    // A replay that fails to load drops back to Normal instead of finishing
    let ended = session.wait_until(|status| {
        matches!(status.mode, ModeKind::ReplayFinished | ModeKind::Normal)
    });

    tokio::select! {
        status = ended => match status?.mode {
            ModeKind::ReplayFinished => println!("Replay finished: {}", name),
            _ => warn!("Replay stopped early"),
        },
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    let status = session.current();
    if let Some(reason) = &status.last_error {
        warn!("Replay failed: {}", reason);
    }
    if status.allows(Action::StopReplay) {
        session.stop_replay().await?;
    }

    session.shutdown().await?;
    controller.await.context("Session controller panicked")?;

    Ok(())
}
