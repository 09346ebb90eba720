//! Hirebot CLI entry point.
//!
//! `chat` runs an interactive conversation on stdin. The remaining
//! subcommands manage the interview calendar and knowledge base directly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use hirebot::agent::intent::Action;
use hirebot::agent::sessions::ConversationRegistry;
use hirebot::agent::AgentServices;
use hirebot::candidates::SqliteCandidateStore;
use hirebot::config::{data_dir, Config};
use hirebot::credentials::load_credentials;
use hirebot::knowledge::SqliteDocumentStore;
use hirebot::providers::router::ModelRouter;
use hirebot::scheduling::format::format_status;
use hirebot::scheduling::seed::seed_sample_slots;
use hirebot::scheduling::slot::SlotQuery;
use hirebot::scheduling::store::SlotStore;
use hirebot::scheduling::SchedulingCoordinator;

/// Recruiting assistant that registers candidates and books interviews.
#[derive(Parser)]
#[command(name = "hirebot", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Chat with the assistant on stdin.
    Chat {
        /// Conversation identifier.
        #[arg(long, default_value = "cli")]
        conversation: String,
    },
    /// Insert sample interview slots through the end of the year.
    Seed {
        /// First day to seed (YYYY-MM-DD, default today).
        #[arg(long)]
        from: Option<NaiveDate>,
    },
    /// List available slots.
    Slots {
        /// Position to search (default from config).
        #[arg(long)]
        position: Option<String>,
        /// Inclusive start date (YYYY-MM-DD).
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Inclusive end date (YYYY-MM-DD).
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Show a candidate's interview.
    Schedule {
        /// Candidate phone number.
        #[arg(long)]
        phone: String,
    },
    /// Cancel a candidate's interviews.
    Cancel {
        /// Candidate phone number.
        #[arg(long)]
        phone: String,
    },
    /// Add a text file to the knowledge base.
    Ingest {
        /// File to ingest; paragraphs become documents.
        path: PathBuf,
        /// Position the file describes.
        #[arg(long)]
        position: Option<String>,
    },
    /// Print candidate, slot and document counts.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;

    match cli.command {
        Command::Chat { conversation } => handle_chat(config, &conversation).await,
        Command::Seed { from } => handle_seed(config, from).await,
        Command::Slots { position, from, to } => handle_slots(config, position, from, to).await,
        Command::Schedule { phone } => handle_schedule(config, &phone).await,
        Command::Cancel { phone } => handle_cancel(config, &phone).await,
        Command::Ingest { path, position } => handle_ingest(config, &path, position.as_deref()).await,
        Command::Stats => handle_stats(config).await,
    }
}

/// Open and migrate the database. Refuses to continue without it.
async fn open_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let path = config.database_path()?;
    hirebot::db::open(&path, config.database.max_connections)
        .await
        .with_context(|| format!("slot store unavailable at {}", path.display()))
}

fn coordinator(config: &Config, pool: &SqlitePool) -> SchedulingCoordinator {
    SchedulingCoordinator::new(SlotStore::new(pool.clone()), &config.scheduling)
}

/// Run an interactive conversation.
async fn handle_chat(config: Config, conversation: &str) -> anyhow::Result<()> {
    let _logging_guard = hirebot::logging::init_production(&config.log_dir()?)?;
    let pool = open_database(&config).await?;
    let scheduling = coordinator(&config, &pool);

    if config.scheduling.seed_sample_slots && scheduling.store().count_slots(true).await? == 0 {
        let mut rng = rand::thread_rng();
        seed_sample_slots(
            scheduling.store(),
            Local::now().date_naive(),
            &config.scheduling.positions,
            &mut rng,
        )
        .await?;
    }

    let credentials = load_credentials(&data_dir()?.join(".env"))?;
    let models = match ModelRouter::from_config(&config.models, &credentials) {
        Ok(router) => {
            info!(default = %config.models.default, "model router ready");
            Some(router)
        }
        Err(e) => {
            warn!(error = %e, "no model available, using fallbacks only");
            None
        }
    };

    let services = AgentServices {
        models,
        scheduling,
        candidates: Arc::new(SqliteCandidateStore::new(pool.clone())),
        documents: Arc::new(SqliteDocumentStore::new(pool)),
    };
    let registry = ConversationRegistry::new(config, services);

    println!("Hi! I'm the recruiting assistant. Type /reset to start over or /quit to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                let orchestrator = registry.get_or_create(conversation).await;
                orchestrator.lock().await.reset_conversation();
                println!("(conversation reset)");
                continue;
            }
            _ => {}
        }
        let response = registry.process_message(conversation, line).await;
        println!("{}", response.message);
        if response.action == Action::End {
            println!("(conversation ended)");
        }
    }
    Ok(())
}

/// Insert sample slots.
async fn handle_seed(config: Config, from: Option<NaiveDate>) -> anyhow::Result<()> {
    hirebot::logging::init_cli();
    let pool = open_database(&config).await?;
    let store = SlotStore::new(pool);
    let from = from.unwrap_or_else(|| Local::now().date_naive());
    let mut rng = rand::thread_rng();
    let inserted = seed_sample_slots(&store, from, &config.scheduling.positions, &mut rng).await?;
    println!("inserted {inserted} slots");
    Ok(())
}

/// List available slots.
async fn handle_slots(
    config: Config,
    position: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> anyhow::Result<()> {
    hirebot::logging::init_cli();
    let pool = open_database(&config).await?;
    let scheduling = coordinator(&config, &pool);
    let position = position.unwrap_or_else(|| scheduling.default_position().to_owned());
    let query = SlotQuery::for_position(position.clone()).between(from, to);
    let slots = scheduling.store().search(&query).await?;
    if slots.is_empty() {
        println!("no available slots for {position}");
    }
    for slot in slots {
        println!("{}  {}", slot.key(), slot.position);
    }
    Ok(())
}

/// Show a candidate's booking.
async fn handle_schedule(config: Config, phone: &str) -> anyhow::Result<()> {
    hirebot::logging::init_cli();
    let pool = open_database(&config).await?;
    let interview = coordinator(&config, &pool).get_schedule(phone).await?;
    println!("{}", format_status(interview.as_ref()));
    Ok(())
}

/// Cancel a candidate's bookings.
async fn handle_cancel(config: Config, phone: &str) -> anyhow::Result<()> {
    hirebot::logging::init_cli();
    let pool = open_database(&config).await?;
    let released = SlotStore::new(pool).cancel(phone).await?;
    println!("released {released} interview(s)");
    Ok(())
}

/// Ingest a knowledge file.
async fn handle_ingest(
    config: Config,
    path: &std::path::Path,
    position: Option<&str>,
) -> anyhow::Result<()> {
    hirebot::logging::init_cli();
    let pool = open_database(&config).await?;
    let chunks = SqliteDocumentStore::new(pool)
        .ingest_file(path, position)
        .await?;
    println!("ingested {chunks} document(s) from {}", path.display());
    Ok(())
}

/// Print counts.
async fn handle_stats(config: Config) -> anyhow::Result<()> {
    hirebot::logging::init_cli();
    let pool = open_database(&config).await?;
    let candidates = SqliteCandidateStore::new(pool.clone()).stats().await?;
    let store = SlotStore::new(pool.clone());
    let total = store.count_slots(false).await?;
    let available = store.count_slots(true).await?;
    let positions = SqliteDocumentStore::new(pool).positions().await?;
    println!("candidates:   {}", candidates.candidates);
    println!("transcripts:  {}", candidates.transcripts);
    println!("slots:        {available} available / {total} total");
    println!("doc positions: {}", positions.join(", "));
    Ok(())
}
