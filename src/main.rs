use std::sync::Arc;

use clap::Parser;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use interstitial_rs::api_client::{ApiClient, Backend};
use interstitial_rs::bump::{BumpController, BumpHandle, BumpSurfaces};
use interstitial_rs::config::{load_config, AppConfig, DisplayKind};
use interstitial_rs::diagnostics::{DiagnosticsHandle, DiagnosticsSlideshow};
use interstitial_rs::errors::AppError;
use interstitial_rs::input::Key;
use interstitial_rs::ppv::{PpvHandle, PpvSurfaces, PpvViewer};
use interstitial_rs::presentation::BumpOverrides;
use interstitial_rs::remote::{RemoteEntryController, RemoteHandle};
use interstitial_rs::status_poller::{StatusHandle, StatusPoller, StatusSurfaces};
use interstitial_rs::surface::LogSurface;

/// Runs one interstitial display against the station server.
///
/// Key names (`PageUp`, `Enter`, `7`, ...) read from stdin, one per line, are
/// forwarded to the display. A bump also accepts a JSON override object per line.
#[derive(Parser, Debug)]
#[command(name = "interstitial", version)]
struct Args {
    /// INI configuration file.
    #[arg(short, long, default_value = "/etc/interstitial.conf")]
    config: String,

    /// Display to run instead of the configured one.
    #[arg(short, long)]
    display: Option<DisplayKind>,
}

/// The running display and the handles needed to drive it.
enum Session {
    Bump(BumpHandle),
    Ppv(PpvHandle),
    Diagnostics(DiagnosticsHandle),
    Remote { entry: RemoteHandle, status: StatusHandle },
}

impl Session {
    fn handle_line(&self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Session::Bump(bump) = self {
            if line.trim_start().starts_with('{') {
                match serde_json::from_str::<BumpOverrides>(line) {
                    Ok(overrides) => bump.update(overrides),
                    Err(e) => warn!("Ignoring invalid bump update: {}", e),
                }
                return;
            }
        }
        let Some(key) = Key::parse(line) else {
            debug!("Ignoring unknown key '{}'", line);
            return;
        };
        match self {
            Session::Bump(_) => debug!("Bump ignores key {:?}", key),
            Session::Ppv(ppv) => ppv.key(key),
            Session::Diagnostics(diagnostics) => diagnostics.key(key),
            Session::Remote { entry, .. } => entry.key(key),
        }
    }

    fn shutdown(&self) {
        match self {
            Session::Bump(bump) => bump.shutdown(),
            Session::Ppv(ppv) => ppv.shutdown(),
            Session::Diagnostics(diagnostics) => diagnostics.shutdown(),
            Session::Remote { entry, status } => {
                entry.shutdown();
                status.shutdown();
            }
        }
    }
}

async fn start(config: &AppConfig, backend: Arc<dyn Backend>) -> Result<(Session, Vec<JoinHandle<()>>), AppError> {
    info!("Starting {} display against {}", config.display, config.api_url);
    let started = match config.display {
        DisplayKind::Bump => {
            let surfaces = BumpSurfaces {
                stage: LogSurface::boxed("bump"),
                title: LogSurface::boxed("bump-title"),
                subtitle: LogSurface::boxed("bump-subtitle"),
                details: [
                    LogSurface::boxed("bump-detail-1"),
                    LogSurface::boxed("bump-detail-2"),
                    LogSurface::boxed("bump-detail-3"),
                ],
                audio: LogSurface::boxed("bump-music"),
            };
            let (handle, task) = BumpController::spawn(config.bump_config(), surfaces, backend);
            (Session::Bump(handle), vec![task])
        }
        DisplayKind::Ppv => {
            let surfaces = PpvSurfaces {
                stage: LogSurface::boxed("ppv"),
                image: LogSurface::boxed("ppv-image"),
                title: LogSurface::boxed("ppv-title"),
                details: LogSurface::boxed("ppv-details"),
                description: LogSurface::boxed("ppv-description"),
                counter: LogSurface::boxed("ppv-counter"),
                notice: LogSurface::boxed("ppv-alert"),
                audio: LogSurface::boxed("ppv-music"),
            };
            let (handle, task) = PpvViewer::spawn(config.ppv_config()?, surfaces, backend);
            (Session::Ppv(handle), vec![task])
        }
        DisplayKind::Diagnostics => {
            let (handle, task) =
                DiagnosticsSlideshow::spawn(config.diagnostics_config(), LogSurface::boxed("diagnostics"), backend);
            (Session::Diagnostics(handle), vec![task])
        }
        DisplayKind::Remote => {
            match backend.queue_connected().await {
                Ok(connected) => info!("Player command queue connected: {}", connected),
                Err(e) => warn!("Could not query player command queue: {}", e),
            }
            let remote = config.remote_config();
            let surfaces = StatusSurfaces {
                channel: LogSurface::boxed("remote-channel"),
                name: LogSurface::boxed("remote-network"),
            };
            let (status, status_task) = StatusPoller::spawn(remote.poll_interval, surfaces, backend.clone());
            let (entry, entry_task) =
                RemoteEntryController::spawn(&remote, LogSurface::boxed("remote-entry"), backend, Some(status.clone()));
            (Session::Remote { entry, status }, vec![status_task, entry_task])
        }
    };
    Ok(started)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("Starting interstitial_rs application...");

    let mut config = load_config(&args.config)?;
    if let Some(display) = args.display {
        info!("Display overridden on the command line: {}", display);
        config.display = display;
    }
    let backend: Arc<dyn Backend> = Arc::new(ApiClient::new(&config.api_url)?);
    let (session, tasks) = start(&config, backend).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => session.handle_line(&line),
                Ok(None) => {
                    debug!("Stdin closed; running until interrupted");
                    stdin_open = false;
                }
                Err(e) => {
                    error!("Error reading stdin: {}", e);
                    stdin_open = false;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Error waiting for Ctrl-C: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down {} display", config.display);
    session.shutdown();
    for task in tasks {
        if let Err(e) = task.await {
            error!("Display task failed: {}", e);
        }
    }
    Ok(())
}
