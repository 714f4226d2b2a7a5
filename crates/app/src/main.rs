mod commands;
mod config;
mod server;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use services::{AppServices, Clock};

use commands::Today;

#[derive(Parser)]
#[command(name = "study-plan", about = "Keeps daily study plans within their reading budget")]
struct Cli {
    /// Database URL (overrides STUDY_PLAN_DB_URL env var)
    #[arg(long = "db", global = true)]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the rebalance HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Rebalance a plan document on disk (no database)
    Rebalance {
        /// Plan document (JSON)
        #[arg(long)]
        input: PathBuf,
        /// Days since the plan was created; negative values mean day 0
        #[arg(long, allow_negative_numbers = true, conflicts_with = "today")]
        day_offset: Option<i64>,
        /// Today's date (YYYY-MM-DD or RFC3339) instead of an offset
        #[arg(long)]
        today: Option<String>,
        /// Write the result here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Create or upgrade the database schema
    Migrate,
    /// List the stored plans of one user
    List {
        /// Owner of the plans
        #[arg(long)]
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Rebalance {
        input,
        day_offset,
        today,
        output,
    } = &cli.command
    {
        let today = match (day_offset, today) {
            (Some(offset), _) => Today::Offset(*offset),
            (None, Some(raw)) => Today::Date(raw.clone()),
            (None, None) => Today::Clock(Clock::default_clock()),
        };
        commands::run_rebalance(input, &today, output.as_deref())?;
        return Ok(());
    }

    // Everything else needs the database.
    let db_url = config::resolve_db_url(cli.db_url, std::env::var(config::DB_URL_ENV).ok());
    config::prepare_sqlite_file(&db_url)?;

    match cli.command {
        Commands::Migrate => commands::run_migrate(&db_url).await,
        Commands::Serve { bind, port } => {
            let services = AppServices::new_sqlite(&db_url, Clock::default_clock())
                .await
                .with_context(|| format!("failed to open {db_url}"))?;
            server::run_serve(services, &bind, port).await
        }
        Commands::List { user_id } => {
            let services = AppServices::new_sqlite(&db_url, Clock::default_clock())
                .await
                .with_context(|| format!("failed to open {db_url}"))?;
            commands::run_list(&services, &user_id).await
        }
        Commands::Rebalance { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn rebalance_accepts_negative_offsets() {
        let cli = Cli::try_parse_from([
            "study-plan",
            "rebalance",
            "--input",
            "plan.json",
            "--day-offset",
            "-2",
        ])
        .unwrap();
        match cli.command {
            Commands::Rebalance { day_offset, .. } => assert_eq!(day_offset, Some(-2)),
            _ => panic!("expected rebalance"),
        }
    }

    #[test]
    fn offset_and_date_are_exclusive() {
        let res = Cli::try_parse_from([
            "study-plan",
            "rebalance",
            "--input",
            "plan.json",
            "--day-offset",
            "1",
            "--today",
            "2024-01-01",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn db_flag_is_global() {
        let cli = Cli::try_parse_from(["study-plan", "migrate", "--db", "sqlite::memory:"]).unwrap();
        assert_eq!(cli.db_url.as_deref(), Some("sqlite::memory:"));
        assert!(matches!(cli.command, Commands::Migrate));
    }
}
