use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use enrollment_service::{
    api,
    config::{AuthConfig, StorageConfig},
    db,
    registrar::Registrar,
};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

#[derive(Parser)]
#[command(name = "enrollment-service")]
#[command(about = "Student registration, course enrollment and course ratings over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = DEFAULT_HOST)]
        host: IpAddr,

        /// SQLite database file (overrides ENROLLMENT_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "enrollment_service=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port, host, db }) => serve(host, port, db).await,
        None => {
            let host = DEFAULT_HOST.parse().context("Invalid default host")?;
            serve(host, DEFAULT_PORT, None).await
        }
    }
}

async fn serve(host: IpAddr, port: u16, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    let auth = AuthConfig::from_env().context("Invalid authentication configuration")?;
    let mut storage = StorageConfig::from_env().context("Invalid storage configuration")?;
    if db_path.is_some() {
        storage.path = db_path;
    }
    let security = api::SecurityConfig::from_env();

    let database = match &storage.path {
        Some(path) => db::Database::open_with_timeout(path.clone(), storage.operation_timeout)?,
        None => db::Database::open_default()?,
    };
    database.migrate()?;
    let seeded = database.seed_courses()?;
    if seeded > 0 {
        tracing::info!("Seeded {} courses", seeded);
    }

    let registrar = Registrar::new(database, &auth, &storage)?;
    let app = api::create_router_with_config(registrar, security);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Enrollment service listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}
