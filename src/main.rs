use std::fs::File;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use activity_import::database::connection::{establish_connection, get_database_url};
use activity_import::database::migrations::{Migrator, MigratorTrait};
use activity_import::services::{
    ActivityImportService, ActivityQueryService, SeaOrmActivityRepository,
};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and load a tab-delimited activity spreadsheet
    ImportActivity {
        /// Path to the activity spreadsheet
        activity_file: String,
        /// Machine-learning model the spreadsheet belongs to
        ml_model_name: String,
        #[clap(short, long, default_value = "activity.db")]
        database: String,
    },
    /// Print activity values for one sample under one model
    Activity {
        #[clap(short, long)]
        model: String,
        /// Sample's external data-source key
        #[clap(short, long)]
        sample: String,
        #[clap(short, long, default_value = "activity.db")]
        database: String,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init {
        #[clap(short, long, default_value = "activity.db")]
        database: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match args.command {
        Commands::ImportActivity {
            activity_file,
            ml_model_name,
            database,
        } => {
            info!("Importing activity file: {}", activity_file);
            let db = establish_connection(&get_database_url(Some(&database))).await?;
            Migrator::up(&db, None).await?;

            let mut file = File::open(&activity_file)
                .with_context(|| format!("Failed to open activity file: {}", activity_file))?;
            let service = ActivityImportService::new(SeaOrmActivityRepository::new(db));
            if let Err(err) = service.import_activity(&mut file, &ml_model_name).await {
                let context = if err.is_validation_error() {
                    "Data import encountered an error: invalid input activity file"
                } else {
                    "Data import encountered an error: import_activity failed"
                };
                return Err(anyhow::Error::new(err).context(context));
            }
            println!("Activity data import succeeded");
        }
        Commands::Activity {
            model,
            sample,
            database,
        } => {
            let db = establish_connection(&get_database_url(Some(&database))).await?;
            let service = ActivityQueryService::new(db);
            for (node_name, value) in service.activity_for_sample(&model, &sample).await? {
                println!("{}\t{}", node_name, value);
            }
        }
        Commands::Db { command } => match command {
            DbCommands::Init { database } => {
                info!("Initializing database: {}", database);
                let db = establish_connection(&get_database_url(Some(&database))).await?;
                Migrator::up(&db, None).await?;
            }
        },
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}
