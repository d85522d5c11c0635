//! `revtrack status`: what the store currently believes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use revtrack_core::{
    Environment, RevisionStore, ServiceRevisionRecord, ServiceTagRecord, SqliteStore, TagStore,
};

use crate::Session;

/// Arguments for `revtrack status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let store = session.open_store()?;
        let rows = build_rows(&store)?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(session, rows);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ServiceStatus {
    #[serde(flatten)]
    revision: ServiceRevisionRecord,
    tag: Option<ServiceTagRecord>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "service")]
    service: String,
    #[tabled(rename = "revision")]
    revision: String,
    #[tabled(rename = "commit")]
    commit: String,
    #[tabled(rename = "deployed")]
    deployed: String,
    #[tabled(rename = "tag")]
    tag: String,
    #[tabled(rename = "beta")]
    beta: String,
    #[tabled(rename = "alpha")]
    alpha: String,
    #[tabled(rename = "tagged")]
    tagged: String,
}

fn build_rows(store: &SqliteStore) -> Result<Vec<ServiceStatus>> {
    let revisions = store
        .list_revisions()
        .context("failed to list revision records")?;

    let mut rows = Vec::with_capacity(revisions.len());
    for revision in revisions {
        let tag = store
            .find_tag(&revision.service_name)
            .with_context(|| format!("failed to load tag for '{}'", revision.service_name))?;
        rows.push(ServiceStatus { revision, tag });
    }
    Ok(rows)
}

fn print_table(session: &Session, rows: Vec<ServiceStatus>) {
    let pending = rows.iter().filter(|r| !r.revision.deployed).count();
    println!(
        "revtrack v{} | {} | {} services | {} pending deploy",
        env!("CARGO_PKG_VERSION"),
        session.database.display(),
        rows.len(),
        pending,
    );

    if rows.is_empty() {
        println!("No revision records. Run 'revtrack seed --log <file>' to initialise.");
        return;
    }

    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            service: row.revision.service_name.to_string(),
            revision: short(row.revision.rev_id.as_str(), 12),
            commit: row.revision.commit_id.to_string(),
            deployed: flag(row.revision.deployed),
            tag: row.tag.as_ref().map(|t| t.tag.clone()).unwrap_or_default(),
            beta: promotion(row.tag.as_ref(), Environment::Beta),
            alpha: promotion(row.tag.as_ref(), Environment::Alpha),
            tagged: row
                .tag
                .as_ref()
                .map(|t| format_age(t.updated_at, Utc::now()))
                .unwrap_or_default(),
        })
        .collect();

    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn short(value: &str, len: usize) -> String {
    value.chars().take(len).collect()
}

fn flag(on: bool) -> String {
    if on {
        "yes".green().to_string()
    } else {
        "no".yellow().bold().to_string()
    }
}

fn promotion(tag: Option<&ServiceTagRecord>, env: Environment) -> String {
    match tag {
        Some(record) => flag(record.is_promoted_to(env)),
        None => "-".bright_black().to_string(),
    }
}

fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
