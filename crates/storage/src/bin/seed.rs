use std::fmt;

use chrono::{DateTime, Duration, Utc};
use storage::repository::{Storage, StorageError};
use study_core::model::{Activity, Plan, PlanId, Session, UserId};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    plan_id: PlanId,
    user_id: UserId,
    days: u32,
    budget: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDays { raw: String },
    InvalidBudget { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw:?}"),
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
            ArgsError::InvalidBudget { raw } => write!(f, "invalid --budget value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("STUDY_PLAN_DB_URL")
            .unwrap_or_else(|_| "sqlite:study-plan.sqlite3?mode=rwc".into());
        let mut plan_id = PlanId::new("demo-plan");
        let mut user_id = UserId::new("demo-user");
        let mut days = 5;
        let mut budget = 30;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--plan-id" => {
                    plan_id = parse_id("--plan-id", require_value(&mut args, "--plan-id")?)?;
                }
                "--user-id" => {
                    user_id = parse_id("--user-id", require_value(&mut args, "--user-id")?)?;
                }
                "--days" => {
                    let value = require_value(&mut args, "--days")?;
                    days = value
                        .parse::<u32>()
                        .ok()
                        .filter(|d| *d > 0)
                        .ok_or(ArgsError::InvalidDays { raw: value })?;
                }
                "--budget" => {
                    let value = require_value(&mut args, "--budget")?;
                    budget = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidBudget { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            plan_id,
            user_id,
            days,
            budget,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:study-plan.sqlite3?mode=rwc)");
    eprintln!("  --plan-id <id>            Plan id to write (default: demo-plan)");
    eprintln!("  --user-id <id>            Owner of the plan (default: demo-user)");
    eprintln!("  --days <n>                Number of daily sessions (default: 5)");
    eprintln!("  --budget <minutes>        Daily reading budget (default: 30)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_PLAN_DB_URL");
}

/// A plan created two days ago where the learner only finished the first
/// reading, so the next rebalance has overdue work to carry.
fn demo_plan(args: &Args, now: DateTime<Utc>) -> Plan {
    let sessions = (1..=args.days)
        .map(|day| {
            let chapter = format!("chapter-{day}");
            let mut activities = vec![
                Activity::read(chapter.as_str(), 20),
                Activity::quiz(chapter.as_str(), "remember", 5),
            ];
            if day > 1 {
                activities.push(Activity::quiz(format!("chapter-{}", day - 1), "understand", 5));
            }
            Session::new(day.to_string(), activities)
        })
        .collect();

    let mut plan = Plan::new(
        args.plan_id.clone(),
        args.user_id.clone(),
        now - Duration::days(2),
        args.budget,
        sessions,
    );
    if let Some(first) = plan
        .session_mut(0)
        .and_then(|session| session.activities_mut())
        .and_then(|activities| activities.first_mut())
    {
        first.mark_completed();
    }
    plan
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let plan = demo_plan(&args, now);

    let version = match storage.plans.insert_plan(&plan).await {
        Ok(version) => version,
        Err(StorageError::Conflict) => {
            let existing = storage.plans.get_plan(plan.id()).await?;
            storage.plans.save_plan(&plan, existing.version).await?
        }
        Err(err) => return Err(err.into()),
    };

    println!(
        "Seeded plan {} for {} ({} sessions, {} min/day, version {}) into {}",
        plan.id(),
        plan.user_id(),
        plan.sessions().len(),
        plan.daily_budget_minutes(),
        version,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
