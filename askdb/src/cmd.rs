use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use common::agent::{RetryPolicy, Session, MAX_ATTEMPTS};
use common::config::{Settings, DEFAULT_DATABASE};
use common::db::Database;
use common::schema::TABLES;
use common::tracing::init_tracing;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "askdb")]
#[command(about = "ask the employee database questions in plain language", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question and print the rows behind the answer
    Ask {
        /// The question, in any language
        #[arg(required = true)]
        question: Vec<String>,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Interactive question loop
    Chat {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Check that the database file is reachable and holds the expected tables
    Check {
        /// SQLite database path
        #[arg(long, env = "ASKDB_DATABASE", default_value = DEFAULT_DATABASE)]
        database: PathBuf,
    },

    /// Create an empty database with the employee schema
    Init {
        /// SQLite database path
        #[arg(long, env = "ASKDB_DATABASE", default_value = DEFAULT_DATABASE)]
        database: PathBuf,

        /// Replace an existing file
        #[arg(long, default_value = "false")]
        force: bool,
    },
}

#[derive(Args)]
struct SessionArgs {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// SQLite database path
    #[arg(long, env = "ASKDB_DATABASE")]
    database: Option<PathBuf>,

    /// Model that writes the sql query
    #[arg(long, env = "ASKDB_SQL_MODEL")]
    sql_model: Option<String>,

    /// Model that phrases the answer
    #[arg(long, env = "ASKDB_RESPONSE_MODEL")]
    response_model: Option<String>,

    /// Delay between attempts in milliseconds
    #[arg(long, default_value = "1000")]
    retry_delay_ms: u64,

    /// Forget the turns of failed attempts instead of replaying them to the models
    #[arg(long, default_value = "false")]
    rollback_failed_turns: bool,

    /// Skip the startup request that validates the api key
    #[arg(long, default_value = "false")]
    skip_key_check: bool,
}

impl SessionArgs {
    fn into_settings(self) -> Result<(Settings, bool)> {
        let retry = RetryPolicy {
            max_attempts: MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            rollback_failed_turns: self.rollback_failed_turns,
        };

        let settings = Settings::resolve(
            self.api_key,
            self.database,
            self.sql_model,
            self.response_model,
            retry,
        )?;

        Ok((settings, !self.skip_key_check))
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let _guard = init_tracing("askdb")?;

        match self.command {
            Commands::Ask { question, session } => {
                let (settings, verify) = session.into_settings()?;
                let mut session = start_session(&settings, verify).await?;
                ask_once(&mut session, &question.join(" ")).await
            }
            Commands::Chat { session } => {
                let (settings, verify) = session.into_settings()?;
                let mut session = start_session(&settings, verify).await?;
                crate::repl::run(&mut session, &settings).await
            }
            Commands::Check { database } => check_database(&database),
            Commands::Init { database, force } => init_database(&database, force),
        }
    }
}

/// build the session once for the life of the process: key check, database,
/// one gemini client shared by both stages
async fn start_session(settings: &Settings, verify: bool) -> Result<Session> {
    let client = settings.gemini_client()?;

    if verify {
        tracing::info!("checking gemini api key");
        client.verify_key(&settings.sql_model).await?;
    }

    let session = settings
        .open_session(Arc::new(client))
        .with_context(|| format!("cannot start session on {}", settings.database.display()))?;

    Ok(session)
}

async fn ask_once(session: &mut Session, question: &str) -> Result<()> {
    let answer = session.ask(question).await;
    crate::table::print_answer(&answer);
    Ok(())
}

fn check_database(path: &Path) -> Result<()> {
    println!("Current working directory: {}", std::env::current_dir()?.display());
    println!("Database file exists: {}", path.exists());

    if !path.exists() {
        bail!("database file not found: {}", path.display());
    }

    let db = Database::open(path)?;

    let tables = db.list_tables()?;
    println!("\nTables in database: {}", tables.join(", "));

    let missing: Vec<&str> = TABLES
        .iter()
        .map(|t| t.name)
        .filter(|name| !tables.iter().any(|t| t.eq_ignore_ascii_case(name)))
        .collect();

    if !missing.is_empty() {
        bail!("database is missing expected tables: {}", missing.join(", "));
    }

    let count = db.count_rows("employees")?;
    println!("\nNumber of employees: {}", count);

    Ok(())
}

fn init_database(path: &Path, force: bool) -> Result<()> {
    if path.exists() {
        if !force {
            bail!(
                "{} already exists; pass --force to replace it",
                path.display()
            );
        }
        std::fs::remove_file(path)
            .with_context(|| format!("cannot remove {}", path.display()))?;
    }

    Database::create(path)?;
    println!("created {} with {} tables", path.display(), TABLES.len());

    Ok(())
}
