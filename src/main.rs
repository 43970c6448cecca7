//! # Compliance API Main Entry Point

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};

use compliance::{config::ConfigLoader, db, seeds, server, telemetry};

#[derive(Parser)]
#[command(name = "compliance", about = "Multi-tenant regulatory-compliance API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run migrations, seed the catalog and start the HTTP server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Seed the shared requirement catalog and exit
    Seed,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load()?;
    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let pool = db::init_pool(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            Migrator::up(&pool, None).await?;
            tracing::info!("Migrations applied");
        }
        Command::Seed => {
            Migrator::up(&pool, None).await?;
            seeds::seed_requirement_catalog(&pool).await?;
            tracing::info!("Catalog seeded");
        }
        Command::Serve => {
            Migrator::up(&pool, None).await?;
            if config.seed_catalog {
                seeds::seed_requirement_catalog(&pool).await?;
            }
            server::run_server(config, pool).await?;
        }
    }

    Ok(())
}
