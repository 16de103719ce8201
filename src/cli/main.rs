//! CLI binary entry point for despesas

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use despesas_explorer::cli::commands::FilterArgs;
use despesas_explorer::cli::commands::facets::{FacetsArgs, handle_facets};
use despesas_explorer::cli::commands::index::handle_index;
use despesas_explorer::cli::commands::init::{InitArgs, handle_init};
use despesas_explorer::cli::commands::ingest::{IngestArgs, handle_ingest};
use despesas_explorer::cli::commands::page::{PageArgs, handle_page};
use despesas_explorer::cli::commands::query::{QueryArgs, handle_query};
use despesas_explorer::cli::commands::schema::handle_schema;

#[derive(Parser)]
#[command(name = "despesas")]
#[command(about = "Load expense Parquet files into DuckDB and explore them through facets")]
#[command(version)]
struct Cli {
    /// Workspace directory holding .despesas.toml and the database
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a .despesas.toml into the workspace
    Init {
        /// Table name (writes a generated config instead of the commented sample)
        #[arg(long)]
        table: Option<String>,
        /// Source directory of the Parquet files
        #[arg(short, long)]
        source: Option<String>,
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Load the Parquet files into the store and build indexes
    Ingest {
        /// Source directory (defaults to [ingest].source_dir)
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// File glob tried first (defaults to [ingest].pattern)
        #[arg(short, long)]
        pattern: Option<String>,
        /// Reload even if the table already exists
        #[arg(long)]
        force: bool,
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Create missing indexes on integer and date columns
    Index,
    /// Show rows in insertion order, without filters
    Page {
        #[arg(short, long, default_value_t = 1000)]
        limit: i64,
        #[arg(short, long, default_value_t = 0)]
        offset: i64,
        /// Output format: table, json, csv
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Show the options still reachable for each filter dimension
    Facets {
        /// Only this dimension (year, quarter, month, action, superior-organ,
        /// budget-plan, economic-category, amendment-author)
        #[arg(short, long)]
        dimension: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Show the rows matching the filters (at least one filter required)
    Query {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output format: table, json, csv
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Show the columns of the stored table
    Schema {
        /// Output format: table, json, csv
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let workspace = cli.workspace;

    let result = match cli.command {
        Commands::Init {
            table,
            source,
            force,
        } => handle_init(&InitArgs {
            workspace,
            table,
            source,
            force,
        })
        .map(|_| ()),
        Commands::Ingest {
            source,
            pattern,
            force,
            format,
        } => handle_ingest(&IngestArgs {
            workspace,
            source,
            pattern,
            force,
            format,
        }),
        Commands::Index => handle_index(&workspace),
        Commands::Page {
            limit,
            offset,
            format,
        } => handle_page(&PageArgs {
            workspace,
            limit,
            offset,
            format,
        }),
        Commands::Facets {
            dimension,
            filters,
            format,
        } => handle_facets(&FacetsArgs {
            workspace,
            dimension,
            filters,
            format,
        }),
        Commands::Query { filters, format } => handle_query(&QueryArgs {
            workspace,
            filters,
            format,
        }),
        Commands::Schema { format } => handle_schema(&workspace, &format),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
