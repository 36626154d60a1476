//! judgearc CLI — code responses against a rubric and track progress.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "judgearc", version, about = "Rubric coding sessions and progress reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive coding session over a batch
    Code {
        /// Batch descriptor JSON
        #[arg(long)]
        batch: PathBuf,

        /// Rater id (overrides config and JUDGEARC_USER)
        #[arg(long)]
        user: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show coding and review progress per competency and task
    Progress {
        /// Output format: text, table, markdown, json, html
        #[arg(long, default_value = "table")]
        format: String,

        /// Write the report to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        sources: commands::Sources,
    },

    /// List stored judgment records
    Records {
        /// Only records of this rater
        #[arg(long)]
        user: Option<u64>,

        /// Only records whose response title starts with this prefix
        #[arg(long)]
        title_prefix: Option<String>,

        /// Only records of this judgment type: code or review
        #[arg(long = "type")]
        judg_type: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        #[command(flatten)]
        sources: commands::Sources,
    },

    /// Validate a batch descriptor
    Validate {
        /// Batch descriptor JSON
        #[arg(long)]
        batch: PathBuf,

        /// Catalog to resolve response ids against
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Create starter config, catalog, and example batch
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("judgearc=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Code {
            batch,
            user,
            config,
        } => commands::code::execute(batch, user, config).await,
        Commands::Progress {
            format,
            output,
            sources,
        } => commands::progress::execute(format, output, sources).await,
        Commands::Records {
            user,
            title_prefix,
            judg_type,
            format,
            sources,
        } => commands::records::execute(user, title_prefix, judg_type, format, sources).await,
        Commands::Validate { batch, catalog } => commands::validate::execute(batch, catalog),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
