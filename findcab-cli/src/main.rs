//! findcab - cab location-tracking server.
//!
//! Starts the REST API over the selected storage backend and runs until
//! SIGINT/SIGTERM.

mod error;

use clap::{Parser, ValueEnum};
use error::CliError;
use findcab::config::{ServerConfig, SqliteConfig};
use findcab::logging::{default_log_file, init_logging};
use findcab::service::{CabService, MemoryCabService, SqliteCabService};
use findcab::{http, VERSION};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, ValueEnum)]
enum BackendType {
    /// Volatile in-memory store (records are lost on exit)
    Memory,
    /// Persistent SQLite store with an R*Tree spatial index
    Sqlite,
}

#[derive(Parser)]
#[command(name = "findcab")]
#[command(about = "Track cab positions and answer proximity queries", long_about = None)]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Host/interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Storage backend
    #[arg(long, value_enum, default_value = "sqlite")]
    backend: BackendType,

    /// SQLite database file (ignored with --backend memory)
    #[arg(long, default_value = "findcab.db")]
    db_path: String,

    /// Records table name inside the database
    #[arg(long, default_value = "cabs")]
    table: String,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        err.exit();
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let _guard =
        init_logging(&args.log_dir, default_log_file()).map_err(CliError::LoggingInit)?;
    info!(version = VERSION, "findcab starting");

    let service: Arc<dyn CabService> = match args.backend {
        BackendType::Memory => {
            info!("using in-memory backend");
            Arc::new(MemoryCabService::new())
        }
        BackendType::Sqlite => {
            let config = SqliteConfig::default()
                .with_path(&args.db_path)
                .with_table(&args.table);
            Arc::new(SqliteCabService::open(config).map_err(CliError::Backend)?)
        }
    };

    let server = ServerConfig::default()
        .with_host(args.host)
        .with_port(args.port);
    let addr = server.bind_address();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|error| CliError::Bind {
                addr: addr.clone(),
                error,
            })?;
        http::serve(listener, service).await.map_err(CliError::Serve)
    })
}
