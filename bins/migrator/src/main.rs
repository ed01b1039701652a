//! Database migration runner for Lectern.
//!
//! Reads the database URL from the same configuration as the server
//! (`LECTERN__DATABASE__URL` or `DATABASE_URL`).
//!
//! Usage:
//!   migrator up [-n N]    - Run pending migrations
//!   migrator down [-n N]  - Rollback migrations (last one by default)
//!   migrator status       - Show migration status
//!   migrator fresh        - Drop all tables and re-run migrations
//!   migrator reset        - Rollback all migrations

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lectern_db::connect;
use lectern_db::migration::{Migrator, MigratorTrait};
use lectern_shared::AppConfig;

#[derive(Parser)]
#[command(name = "migrator", about = "Lectern database migrations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run pending migrations
    Up {
        /// Number of migrations to apply (all by default)
        #[arg(short = 'n', long)]
        num: Option<u32>,
    },
    /// Rollback applied migrations
    Down {
        /// Number of migrations to rollback
        #[arg(short = 'n', long, default_value = "1")]
        num: u32,
    },
    /// Show migration status
    Status,
    /// Drop all tables and re-run every migration
    Fresh,
    /// Rollback all applied migrations
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lectern=info,sea_orm_migration=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    match cli.command.unwrap_or(Command::Up { num: None }) {
        Command::Up { num } => {
            Migrator::up(&db, num).await?;
            info!("Migrations applied");
        }
        Command::Down { num } => {
            Migrator::down(&db, Some(num)).await?;
            info!(count = num, "Migrations rolled back");
        }
        Command::Status => Migrator::status(&db).await?,
        Command::Fresh => {
            Migrator::fresh(&db).await?;
            info!("Database recreated");
        }
        Command::Reset => {
            Migrator::reset(&db).await?;
            info!("All migrations rolled back");
        }
    }

    db.close().await?;
    Ok(())
}
