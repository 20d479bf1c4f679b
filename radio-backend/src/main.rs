//! radio-backend - Main entry point
//!
//! Writes engine configuration, sends control commands and answers the
//! engine's callbacks, either as one-shot subcommands or as an HTTP service.
//! Logs go to stderr: the engine reads callback answers from stdout.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use radio_common::config::TomlConfig;
use radio_common::db::{init_database, SqliteStore};
use radio_common::models::Station;
use radio_common::{StationFilesystem, StationRepository};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use radio_backend::adapters::{AdapterKind, AdapterRegistry};
use radio_backend::liquidsoap::Liquidsoap;
use radio_backend::{build_router, AppState, RuntimeBridge};

#[derive(Parser, Debug)]
#[command(name = "radio-backend")]
#[command(about = "Liquidsoap configuration compiler and engine control")]
#[command(version)]
struct Args {
    /// Bootstrap configuration file
    #[arg(short, long, env = "RADIO_BACKEND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile and write a station's engine configuration
    WriteConfig { station_id: i64 },

    /// Engine callbacks (invoked by the generated program)
    #[command(subcommand)]
    Internal(Internal),

    /// Skip the current track
    Skip { station_id: i64 },

    /// Queue a track in manual AutoDJ mode
    Request { station_id: i64, uri: String },

    /// Disconnect the live DJ
    Disconnect { station_id: i64 },

    /// Send a raw control command
    Command {
        station_id: i64,
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// List adapters
    Adapters {
        /// Only adapters whose software is installed
        #[arg(long)]
        installed: bool,
    },

    /// Serve the internal callback API
    Serve {
        #[arg(short, long, default_value = "6050", env = "RADIO_BACKEND_PORT")]
        port: u16,

        #[arg(long, default_value = "127.0.0.1", env = "RADIO_BACKEND_BIND")]
        bind: std::net::IpAddr,
    },

    /// Print the command line that starts a station's engine
    EngineCommand { station_id: i64 },
}

#[derive(Subcommand, Debug)]
enum Internal {
    Nextsong {
        station_id: i64,
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        as_autodj: bool,
    },
    Auth {
        station_id: i64,
        #[arg(long, default_value = "")]
        dj_user: String,
        #[arg(long, default_value = "")]
        dj_password: String,
    },
    Djon { station_id: i64 },
    Djoff { station_id: i64 },
}

struct Services {
    config: TomlConfig,
    store: Arc<SqliteStore>,
    registry: AdapterRegistry,
}

impl Services {
    async fn open(config: TomlConfig) -> Result<Self> {
        let pool = init_database(&config.database_path)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
        let registry = AdapterRegistry::from_config(&config);

        Ok(Self {
            config,
            store: Arc::new(SqliteStore::new(pool)),
            registry,
        })
    }

    async fn station(&self, station_id: i64) -> Result<Station> {
        self.store
            .station(station_id)
            .await
            .with_context(|| format!("Failed to load station {}", station_id))
    }

    fn liquidsoap(&self, station: &Station) -> Result<&Liquidsoap> {
        Ok(self.registry.backend_for(station)?.as_liquidsoap()?)
    }

    fn bridge(&self) -> RuntimeBridge {
        RuntimeBridge::new(
            self.store.clone(),
            self.store.clone(),
            StationFilesystem::new(&self.config.stations_root),
            self.config.error_sound_path.clone(),
        )
    }
}

fn init_tracing(level: &str) {
    let default_filter = format!("radio_backend={level},radio_common={level},tower_http={level}");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging.level);

    info!(
        "radio-backend {} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        radio_backend::GIT_HASH,
        radio_backend::BUILD_TIMESTAMP,
        radio_backend::BUILD_PROFILE
    );

    if let Command::Adapters { installed } = args.command {
        list_adapters(&AdapterRegistry::from_config(&config), installed);
        return Ok(());
    }

    let services = Services::open(config).await?;

    match args.command {
        Command::WriteConfig { station_id } => {
            let station = services.station(station_id).await?;
            let remote_kinds = services.registry.remote_adapters(&station)?;
            let path = services
                .liquidsoap(&station)?
                .write_configuration(services.store.as_ref(), &station, remote_kinds)
                .await
                .with_context(|| format!("Failed to write configuration for station {}", station_id))?;
            println!("{}", path.display());
        }
        Command::Internal(internal) => run_internal(&services, internal).await?,
        Command::Skip { station_id } => {
            let station = services.station(station_id).await?;
            print_lines(&services.liquidsoap(&station)?.skip(&station).await?);
        }
        Command::Request { station_id, uri } => {
            let station = services.station(station_id).await?;
            print_lines(&services.liquidsoap(&station)?.enqueue_request(&station, &uri).await?);
        }
        Command::Disconnect { station_id } => {
            let station = services.station(station_id).await?;
            let lines = services
                .liquidsoap(&station)?
                .disconnect_streamer(services.store.as_ref(), &station)
                .await?;
            print_lines(&lines);
        }
        Command::Command { station_id, command } => {
            let station = services.station(station_id).await?;
            let lines = services
                .liquidsoap(&station)?
                .command(&station, &command.join(" "))
                .await?;
            print_lines(&lines);
        }
        Command::EngineCommand { station_id } => {
            let station = services.station(station_id).await?;
            println!("{}", services.liquidsoap(&station)?.command_line(&station));
        }
        Command::Serve { port, bind } => serve(services, SocketAddr::new(bind, port)).await?,
        Command::Adapters { .. } => {}
    }

    Ok(())
}

/// Callback answers always go to stdout, failures included, so the engine
/// can fall back instead of waiting on an empty response.
async fn run_internal(services: &Services, internal: Internal) -> Result<()> {
    let bridge = services.bridge();

    match internal {
        Internal::Nextsong { station_id, as_autodj } => {
            let result = match services.station(station_id).await {
                Ok(station) => bridge.next_song(&station, as_autodj).await.map_err(anyhow::Error::from),
                Err(e) => Err(e),
            };
            match result {
                Ok(track) => println!("{}", track),
                Err(e) => {
                    error!(station_id, "Next song lookup failed: {:#}", e);
                    println!("Error: {}", e);
                }
            }
        }
        Internal::Auth {
            station_id,
            dj_user,
            dj_password,
        } => {
            let station = services.station(station_id).await?;
            let allowed = match bridge.authenticate(&station, &dj_user, &dj_password).await {
                Ok(allowed) => allowed,
                Err(e) => {
                    error!(station_id, "DJ authentication failed: {}", e);
                    false
                }
            };
            println!("{}", allowed);
        }
        Internal::Djon { station_id } => {
            let station = services.station(station_id).await?;
            bridge.toggle_live(&station, true).await?;
            println!("received");
        }
        Internal::Djoff { station_id } => {
            let station = services.station(station_id).await?;
            bridge.toggle_live(&station, false).await?;
            println!("received");
        }
    }

    Ok(())
}

fn list_adapters(registry: &AdapterRegistry, installed: bool) {
    println!("Backends:");
    for adapter in registry.list_backends(installed) {
        println!("  {:<12} {}", adapter.id, adapter.name);
    }
    println!("Frontends:");
    for adapter in registry.list_frontends(installed) {
        println!("  {:<12} {}", adapter.id, adapter.name);
    }
    println!("Remotes:");
    for adapter in registry.list_remotes() {
        println!("  {:<12} {}", adapter.kind.id(), adapter.name);
    }
}

async fn serve(services: Services, addr: SocketAddr) -> Result<()> {
    let app = build_router(AppState::new(Arc::new(services.bridge())));

    info!("Starting internal API on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
