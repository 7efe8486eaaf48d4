mod categories;

use clap::{Parser, Subcommand};
use flipdesk_core::AppConfig;
use tracing_subscriber::EnvFilter;

use crate::categories::CategoriesCommands;

#[derive(Debug, Parser)]
#[command(name = "flipdesk-cli")]
#[command(about = "flipdesk eBay category tooling")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Sync, browse and resolve eBay categories
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("flipdesk-cli: run with --help to list commands");
        return Ok(());
    };

    let config = flipdesk_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Db { command } => run_db(&config, command).await,
        Commands::Categories { command } => categories::run(&config, command).await,
    }
}

async fn run_db(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    match command {
        DbCommands::Ping => {
            flipdesk_db::health_check(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = flipdesk_db::run_migrations(&pool).await?;
            println!("migrations applied: {applied}");
        }
    }
    Ok(())
}

/// Opens the Postgres pool described by `config`.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = flipdesk_db::PoolConfig::from_app_config(config);
    let pool = flipdesk_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}
