pub mod ai;
pub mod api;
pub mod builder;
pub mod charts;
pub mod commands;
pub mod config;
pub mod connections;
pub mod dashboard;
pub mod ids;
pub mod notify;
pub mod saved;
pub mod schema;
pub mod semantic;
pub mod storage;
mod validation;

use anyhow::{Context, Result};
use charts::ChartKind;
use clap::{Parser, Subcommand};
use commands::AppState;
use config::Settings;
use dashboard::{ExportFormat, Frequency, ScheduleRequest};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "insightdeck")]
#[command(about = "Command-line client for the InsightDeck BI backend")]
struct Cli {
    /// Settings file (defaults to ./insightdeck.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connections known to the backend
    Connections,

    /// Print the tables and columns of a connection
    Schema {
        #[arg(long, short)]
        connection: String,
    },

    /// Generate SQL for a visual query configuration
    Preview {
        #[arg(long, short)]
        connection: String,

        /// JSON file holding the builder configuration
        #[arg(long)]
        config_file: PathBuf,
    },

    /// Ask for join suggestions between tables
    Suggest {
        #[arg(long, short)]
        connection: String,

        #[arg(required = true)]
        tables: Vec<String>,
    },

    /// List saved visual queries in the workspace
    Queries {
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Validate chart data and print what would be rendered
    ValidateChart {
        #[arg(long, short)]
        kind: ChartKind,

        #[arg(long, short)]
        file: PathBuf,
    },

    /// Export a dashboard and wait for the file
    Export {
        #[arg(long, short)]
        dashboard: String,

        #[arg(long, short, default_value = "pdf")]
        format: ExportFormat,
    },

    /// Schedule a recurring dashboard report
    Schedule {
        #[arg(long, short)]
        dashboard: String,

        #[arg(long)]
        frequency: Frequency,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "pdf")]
        format: ExportFormat,
    },

    /// Ask the assistant about a JSON array of rows
    Explain {
        #[arg(long, short)]
        file: PathBuf,

        /// Free-form context such as the chart title
        #[arg(long)]
        context: Option<String>,
    },

    /// Turn a natural-language question into SQL
    Ask {
        #[arg(long, short)]
        connection: String,

        prompt: String,
    },

    /// Show locally recorded SQL
    History {
        #[arg(long, short)]
        connection: Option<String>,

        #[arg(long, default_value = "20")]
        limit: i64,
    },

    /// Search previously asked prompts
    Prompts {
        #[arg(long, short, default_value = "")]
        search: String,

        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

pub fn run() -> Result<()> {
    // Logs go to stderr; stdout carries JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Chart validation is offline.
    if let Commands::ValidateChart { kind, file } = &cli.command {
        let data = read_json(file)?;
        return print_json(&commands::validate_chart(*kind, data));
    }

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("Failed to load settings")?;
    let state = AppState::new(settings)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(dispatch(&state, cli.command))
}

async fn dispatch(state: &AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Connections => print_json(&commands::list_connections(state).await?),
        Commands::Schema { connection } => print_json(&commands::get_schema(state, &connection).await?),
        Commands::Preview {
            connection,
            config_file,
        } => {
            let config = read_json(&config_file)?;
            let output = commands::preview_sql(state, &connection, &config).await?;
            print_json(&output)?;
            output.ensure_generated()
        }
        Commands::Suggest { connection, tables } => {
            print_json(&commands::suggest_joins(state, &connection, &tables).await?)
        }
        Commands::Queries { search } => {
            print_json(&commands::saved_queries(state, search.as_deref()).await?)
        }
        Commands::ValidateChart { kind, file } => {
            let data = read_json(&file)?;
            print_json(&commands::validate_chart(kind, data))
        }
        Commands::Export { dashboard, format } => {
            print_json(&commands::export_dashboard(state, &dashboard, format).await?)
        }
        Commands::Schedule {
            dashboard,
            frequency,
            email,
            format,
        } => {
            let request = ScheduleRequest {
                frequency,
                email,
                format,
            };
            print_json(&commands::schedule(state, &dashboard, &request).await?)
        }
        Commands::Explain { file, context } => {
            let rows: Vec<serde_json::Value> = read_json(&file)?;
            let context = context.map(serde_json::Value::String).unwrap_or_default();
            print_json(&commands::explain(state, &rows, &context).await?)
        }
        Commands::Ask { connection, prompt } => {
            println!("{}", commands::generate_sql(state, &connection, &prompt).await?);
            Ok(())
        }
        Commands::History { connection, limit } => {
            print_json(&commands::sql_history(state, connection.as_deref(), limit).await?)
        }
        Commands::Prompts { search, limit } => {
            print_json(&commands::search_prompts(state, &search, limit).await?)
        }
    }
}
