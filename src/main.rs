//! Vocalyx Sync - Real-time dashboard synchronization for the Vocalyx
//! transcription service.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use async_trait::async_trait;
use vocalyx_sync::client::{
    ConnectionState, DashboardObserver, DashboardSyncClient, SyncError,
};
use vocalyx_sync::config::{ConfigLoader, SyncConfig};
use vocalyx_sync::model::DashboardModel;
use vocalyx_sync::protocol::{DashboardState, StateRequest, Transcription, WorkerStats};
use vocalyx_sync::render::render_dashboard;

#[derive(Parser)]
#[command(
    name = "vocalyx-sync",
    about = "Live terminal view of the Vocalyx transcription dashboard",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a config file (defaults to the standard search paths).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and follow dashboard updates live.
    Watch {
        /// Dashboard backend hostname.
        #[arg(long)]
        host: Option<String>,
        /// Port of the HTTP surface serving the token endpoint.
        #[arg(long)]
        http_port: Option<u16>,
        /// Port of the WebSocket update channel.
        #[arg(long)]
        ws_port: Option<u16>,
        /// Page to request.
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Page size.
        #[arg(long)]
        limit: Option<u32>,
        /// Filter by status (pending, processing, done, error).
        #[arg(long)]
        status: Option<String>,
        /// Filter by project name.
        #[arg(long)]
        project: Option<String>,
        /// Free-text search.
        #[arg(long)]
        search: Option<String>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Event the observer hands back to the main loop.
enum UiEvent {
    /// The backend signalled a change; re-request with current filters.
    Refresh,
    /// The session is invalid; the user must log in again.
    AuthRequired,
}

/// Observer that maintains a [`DashboardModel`] and redraws the terminal.
struct TerminalObserver {
    model: Mutex<DashboardModel>,
    events: mpsc::UnboundedSender<UiEvent>,
}

impl TerminalObserver {
    fn new(page: u32, limit: u32, events: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self {
            model: Mutex::new(DashboardModel::new(page, limit)),
            events,
        }
    }

    async fn redraw(&self) {
        let model = self.model.lock().await;
        print!("\x1B[2J\x1B[H{}", render_dashboard(&model));
    }
}

#[async_trait]
impl DashboardObserver for TerminalObserver {
    async fn on_connection_state(&self, state: ConnectionState) {
        tracing::info!(%state, "Update channel state changed");
    }

    async fn on_full_state(&self, state: &DashboardState) {
        self.model.lock().await.apply_full_state(state);
        self.redraw().await;
    }

    async fn on_transcription_updated(&self, transcription: &Transcription) {
        let changed = self.model.lock().await.apply_transcription(transcription);
        if changed {
            self.redraw().await;
        }
    }

    async fn on_worker_stats(&self, stats: &WorkerStats) {
        self.model.lock().await.apply_worker_stats(stats);
        self.redraw().await;
    }

    async fn on_refresh_needed(&self) {
        let _ = self.events.send(UiEvent::Refresh);
    }

    async fn on_server_error(&self, message: &str) {
        tracing::warn!(message, "Server reported an error");
    }

    async fn on_error(&self, error: &SyncError) {
        tracing::error!(error = %error, "Sync error");
    }

    async fn on_auth_required(&self) {
        let _ = self.events.send(UiEvent::AuthRequired);
    }
}

struct WatchArgs {
    page: u32,
    limit: u32,
    status: Option<String>,
    project: Option<String>,
    search: Option<String>,
}

impl WatchArgs {
    fn request(&self) -> StateRequest {
        let mut request = StateRequest::new(self.page, self.limit);
        if let Some(status) = &self.status {
            request = request.with_status(status.clone());
        }
        if let Some(project) = &self.project {
            request = request.with_project(project.clone());
        }
        if let Some(search) = &self.search {
            request = request.with_search(search.clone());
        }
        request
    }
}

async fn watch(config: SyncConfig, args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let observer = Arc::new(TerminalObserver::new(args.page, args.limit, events_tx));

    let client = DashboardSyncClient::new(config, observer)?;
    client.connect();

    match client.request_dashboard_state(args.request()).await {
        Ok(_) => {}
        Err(SyncError::RequestTimeout(_)) => {
            tracing::warn!("Initial state request timed out, waiting for pushed updates");
        }
        Err(err) => return Err(err.into()),
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            event = events_rx.recv() => match event {
                Some(UiEvent::Refresh) => {
                    let client = client.clone();
                    let request = args.request();
                    tokio::spawn(async move {
                        if let Err(err) = client.request_dashboard_state(request).await {
                            tracing::warn!(error = %err, "Refresh request failed");
                        }
                    });
                }
                Some(UiEvent::AuthRequired) => {
                    eprintln!("Session expired: log in to the dashboard and restart.");
                    client.shutdown();
                    return Err("re-authentication required".into());
                }
                None => break,
            },
        }
    }

    client.shutdown();
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let loader = cli
        .config
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let mut config = loader.load()?;

    match cli.command {
        Commands::Watch {
            host,
            http_port,
            ws_port,
            page,
            limit,
            status,
            project,
            search,
        } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = http_port {
                config.http_port = port;
            }
            if let Some(port) = ws_port {
                config.ws_port = port;
            }
            let limit = limit.unwrap_or(config.page_limit);
            tracing::info!(
                host = %config.host,
                ws_port = config.ws_port,
                page,
                limit,
                "Starting dashboard watch"
            );
            watch(
                config,
                WatchArgs {
                    page,
                    limit,
                    status,
                    project,
                    search,
                },
            )
            .await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
