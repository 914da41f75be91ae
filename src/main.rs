//! # Job Match CLI (`jobmatch`)
//!
//! ## Usage
//!
//! ```bash
//! jobmatch --config ./config/jobmatch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `jobmatch init` | Create the SQLite database and run schema migrations |
//! | `jobmatch index build --dataset F` | Embed and index job postings |
//! | `jobmatch status` | Show collection size, model and readiness |
//! | `jobmatch search "<text>"` | Raw nearest postings, optionally filtered |
//! | `jobmatch query "<question>"` | Answer a question against a résumé |
//! | `jobmatch resume set <user> <file>` | Store a user's résumé text |
//! | `jobmatch serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use job_match::query_cmd::ResumeInput;
use job_match::{config, index_cmd, migrate, query_cmd, resume, server, stats};

/// Job Match CLI: semantic matching of résumés against job postings.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/jobmatch.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "jobmatch",
    about = "Job Match — semantic résumé-to-job matching with facet aggregation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/jobmatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Manage the job posting index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Show collection status and readiness.
    Status,

    /// Search indexed postings by text similarity.
    Search {
        /// Text to embed and match.
        text: String,

        /// Maximum number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        limit: Option<usize>,

        /// Metadata equality filter, e.g. `--filter role="Data Analyst"`.
        /// Repeat for a conjunction.
        #[arg(long = "filter", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,
    },

    /// Answer a question about career fit using a résumé.
    Query {
        /// The user's question.
        question: String,

        /// Résumé text file.
        #[arg(long, conflicts_with = "user", required_unless_present = "user")]
        resume: Option<PathBuf>,

        /// Use the stored résumé of this user.
        #[arg(long)]
        user: Option<String>,

        /// Print the full outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage stored résumés.
    Resume {
        #[command(subcommand)]
        action: ResumeAction,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum IndexAction {
    /// Embed the dataset into the configured collection.
    ///
    /// A populated collection is left alone unless `--force-recreate` is
    /// given, which clears it first.
    Build {
        /// Dataset file (`.csv`, `.jsonl` or `.ndjson`).
        #[arg(long)]
        dataset: PathBuf,

        /// Clear the collection and rebuild from scratch.
        #[arg(long)]
        force_recreate: bool,

        /// Override `index.batch_size`.
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ResumeAction {
    /// Store (or replace) a user's résumé text.
    Set { user_id: String, file: PathBuf },
}

/// Parse a `KEY=VALUE` string into a tuple.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index { action } => match action {
            IndexAction::Build {
                dataset,
                force_recreate,
                batch_size,
            } => {
                index_cmd::run_index_build(&cfg, &dataset, force_recreate, batch_size).await?;
            }
        },
        Commands::Status => {
            stats::run_status(&cfg).await?;
        }
        Commands::Search {
            text,
            limit,
            filters,
        } => {
            query_cmd::run_search(&cfg, &text, limit, &filters).await?;
        }
        Commands::Query {
            question,
            resume,
            user,
            json,
        } => {
            let input = match (&resume, &user) {
                (Some(path), _) => ResumeInput::File(path),
                (None, Some(user_id)) => ResumeInput::User(user_id),
                (None, None) => anyhow::bail!("either --resume or --user is required"),
            };
            query_cmd::run_query(&cfg, &question, input, json).await?;
        }
        Commands::Resume { action } => match action {
            ResumeAction::Set { user_id, file } => {
                resume::run_resume_set(&cfg, &user_id, &file).await?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
