//! Trellis CLI - notes in, graphs and analyses out.
//!
//! This is the main entry point for users working with N4L files.
//! It parses notation, builds graph snapshots, runs the analysis
//! battery and serves the WebSocket API.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(author = "Trellis Contributors")]
#[command(version)]
#[command(about = "Turn N4L notes into a knowledge graph and analyze it", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an N4L file into subjects and notes-by-context
    Parse {
        /// The notation file to parse
        file: PathBuf,

        /// Emit raw JSON instead of a formatted report
        #[arg(long)]
        json: bool,
    },

    /// Build a graph snapshot from an N4L file
    Graph {
        /// The notation file to parse
        file: PathBuf,

        /// Output file for the graph JSON (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Search the graph for nodes matching a query
    Query {
        /// The notation file to parse
        file: PathBuf,

        /// Search query (case-insensitive substring)
        query: String,
    },

    /// Run consistency checks and question generation
    Analyze {
        /// The notation file to analyze
        file: PathBuf,

        /// Emit raw JSON instead of a formatted report
        #[arg(long)]
        json: bool,
    },

    /// Print the density metric report
    Metrics {
        /// The notation file to analyze
        file: PathBuf,
    },

    /// Extract the chronological timeline
    Timeline {
        /// The notation file to analyze
        file: PathBuf,
    },

    /// Start the Trellis server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "7641")]
        port: u16,

        /// Path of the version-history file
        #[arg(long, default_value = "versions_history.json")]
        history_file: PathBuf,

        /// Endpoint of the generative-text service
        #[arg(long, default_value = "http://localhost:11434/api/generate")]
        oracle_url: String,

        /// Model name passed to the generative-text service
        #[arg(long, default_value = "gpt-oss:20b")]
        oracle_model: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Parse { file, json } => commands::parse(&file, json),
        Commands::Graph { file, output } => commands::graph(&file, output.as_deref()),
        Commands::Query { file, query } => commands::query(&file, &query),
        Commands::Analyze { file, json } => commands::analyze(&file, json),
        Commands::Metrics { file } => commands::metrics(&file),
        Commands::Timeline { file } => commands::timeline(&file),
        Commands::Serve {
            port,
            history_file,
            oracle_url,
            oracle_model,
        } => commands::serve(port, &history_file, &oracle_url, &oracle_model).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
