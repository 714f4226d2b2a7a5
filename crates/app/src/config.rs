//! Database location resolution: CLI flag > `STUDY_PLAN_DB_URL` > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub const DB_URL_ENV: &str = "STUDY_PLAN_DB_URL";
pub const DEFAULT_DB_URL: &str = "sqlite://study-plan.sqlite3";

/// Pick the database URL from the flag, then the environment value, then the
/// default, and normalize it.
pub fn resolve_db_url(flag: Option<String>, env: Option<String>) -> String {
    let raw = flag
        .filter(|v| !v.trim().is_empty())
        .or_else(|| env.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_DB_URL.to_string());
    normalize_sqlite_url(raw)
}

fn is_in_memory(url: &str) -> bool {
    url == "sqlite::memory:" || url.contains("mode=memory")
}

/// Rewrite relative `sqlite:` paths into absolute `sqlite://` URLs.
pub fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim().to_string();
    if is_in_memory(&trimmed) {
        return trimmed;
    }

    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed.as_str());
    let (path_str, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    match query {
        Some(query) => format!("sqlite://{}?{query}", absolute.display()),
        None => format!("sqlite://{}", absolute.display()),
    }
}

/// Make sure the database file and its parent directory exist.
pub fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if is_in_memory(db_url) {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
    }

    Ok(())
}
