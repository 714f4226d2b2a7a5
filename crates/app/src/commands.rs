//! Subcommands that don't need the HTTP server.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};

use services::{AppServices, PlanProgress, RebalanceService};
use storage::sqlite::SqliteRepository;
use study_core::Clock;
use study_core::document::PlanDocument;
use study_core::model::{Plan, UserId};
use study_core::rebalance::RebalanceReport;
use study_core::time::{day_offset, parse_today_iso};

/// How the `rebalance` command picks "today".
#[derive(Debug, Clone)]
pub enum Today {
    Offset(i64),
    Date(String),
    Clock(Clock),
}

impl Today {
    fn offset_for(&self, plan: &Plan) -> Result<i64> {
        match self {
            Self::Offset(n) => Ok(*n),
            Self::Date(raw) => Ok(day_offset(plan.created_at(), parse_today_iso(raw)?)),
            Self::Clock(clock) => Ok(day_offset(plan.created_at(), clock.today())),
        }
    }
}

/// Rebalance a plan document read from `input` without touching storage.
///
/// The result goes to `output`, or stdout when no path is given.
pub fn run_rebalance(input: &Path, today: &Today, output: Option<&Path>) -> Result<RebalanceReport> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let document: PlanDocument = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a plan document", input.display()))?;
    let plan = Plan::try_from(document)?;

    let offset = today.offset_for(&plan)?;
    let out = RebalanceService::preview(&plan, offset);
    let json = serde_json::to_string_pretty(&PlanDocument::from(&out.plan))?;

    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }

    tracing::info!(
        plan_id = %out.plan.id(),
        day_offset = offset,
        sessions_locked = out.report.sessions_locked,
        activities_carried = out.report.activities_carried,
        sessions_repacked = out.report.sessions_repacked,
        "rebalanced plan file"
    );
    Ok(out.report)
}

/// Create or upgrade the schema at `db_url`.
pub async fn run_migrate(db_url: &str) -> Result<()> {
    let repo = SqliteRepository::connect(db_url)
        .await
        .with_context(|| format!("failed to open {db_url}"))?;
    repo.migrate().await.context("migration failed")?;
    tracing::info!(db = %db_url, "database is up to date");
    Ok(())
}

/// Print one line per plan owned by `user_id`.
pub async fn run_list(services: &AppServices, user_id: &str) -> Result<()> {
    let user_id: UserId = user_id.parse()?;
    let stored = services.plans().list_plans_for_user(&user_id).await?;
    if stored.is_empty() {
        bail!("no plans found for user {user_id}");
    }

    let mut stdout = std::io::stdout().lock();
    for entry in stored {
        let progress = PlanProgress::from_plan(&entry.plan);
        writeln!(
            stdout,
            "{}\tv{}\t{} sessions\t{}/{} min done\t{} deferred",
            entry.plan.id(),
            entry.version,
            entry.plan.sessions().len(),
            progress.completed_minutes,
            progress.planned_minutes,
            progress.deferred_count,
        )?;
    }
    Ok(())
}
