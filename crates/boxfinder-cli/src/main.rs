mod discover;
mod runs;

use boxfinder_core::AppConfig;
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use crate::discover::DiscoverCommands;
use crate::runs::{CandidatesCommands, RunsCommands};

#[derive(Debug, Parser)]
#[command(name = "boxfinder-cli")]
#[command(about = "Gym discovery and directory sync")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Search for gyms and sync them into the directory
    Discover {
        #[command(subcommand)]
        command: DiscoverCommands,
    },
    /// Inspect past discovery runs
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
    /// Review records flagged as possibly closed
    Candidates {
        #[command(subcommand)]
        command: CandidatesCommands,
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
        println!("boxfinder-cli: no command given; see --help");
        return Ok(());
    };

    let config = boxfinder_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Db { command } => run_db(&config, command).await,
        Commands::Discover {
            command: DiscoverCommands::Regions,
        } => discover::run_regions(&config),
        Commands::Discover {
            command:
                DiscoverCommands::Run {
                    dry_run,
                    skip_enrich,
                },
        } => {
            let pool = connect(&config).await?;
            discover::run_discover(&config, pool, dry_run, skip_enrich).await
        }
        Commands::Runs { command } => {
            let pool = connect(&config).await?;
            match command {
                RunsCommands::List { limit } => runs::run_runs_list(&pool, limit).await,
                RunsCommands::Show { run_id } => runs::run_runs_show(&pool, run_id).await,
            }
        }
        Commands::Candidates { command } => {
            let pool = connect(&config).await?;
            match command {
                CandidatesCommands::List => runs::run_candidates_list(&pool).await,
                CandidatesCommands::Resolve { record_id } => {
                    runs::run_candidates_resolve(&pool, record_id).await
                }
            }
        }
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool_config = boxfinder_db::PoolConfig::from_app_config(config);
    let pool = boxfinder_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

async fn run_db(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    match command {
        DbCommands::Ping => {
            boxfinder_db::ping(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = boxfinder_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}
