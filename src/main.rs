//! # Main — CLI Entry Point
//!
//! Two subcommands: `serve` runs the HTTP/WebSocket server, `migrate`
//! applies the schema and exits.
//!
//! ## Global Options
//!
//! - `--database-url` / `DATABASE_URL`: PostgreSQL connection string.
//! - `--jwt-secret` / `JWT_SECRET`: HS256 signing secret for auth tokens.
//! - `LOG_FORMAT=json`: switch log output to JSON lines.

use anyhow::Result;
use clap::{Parser, Subcommand};

use questline::{db, resolver, server};

#[derive(Parser)]
#[command(name = "questline", about = "Gamified team task tracker")]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Secret used to sign auth tokens
    #[arg(long, env = "JWT_SECRET", default_value = "questline-dev-secret")]
    jwt_secret: String,

    /// How many level-ups a single XP award may trigger
    #[arg(long, env = "QUESTLINE_MAX_LEVEL_UPS", default_value_t = 1)]
    max_level_ups: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 7100)]
        port: u16,
    },
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let database_url = cli.database_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("DATABASE_URL is required (set via --database-url or env)")
    })?;

    match cli.command {
        Commands::Serve { port } => {
            let settings = resolver::Settings {
                max_level_ups_per_award: cli.max_level_ups,
            };
            server::run(port, database_url, cli.jwt_secret.clone(), settings).await
        }
        Commands::Migrate => {
            let database = db::Database::connect(database_url).await?;
            database.migrate().await?;
            tracing::info!("migrations applied");
            Ok(())
        }
    }
}
