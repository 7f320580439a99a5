//! `plansync status`: what the state document says about the last sync.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use plansync_core::types::is_assigned;
use plansync_state::{load_state, Section, SyncState, DEFAULT_STATE_FILE};

/// Arguments for `plansync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// State document to inspect.
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    pub sync_state: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let state = load_state(Some(&self.sync_state));
        let report = build_report(&self.sync_state, &state);
        if self.json {
            print_json(&report)?;
            return Ok(());
        }

        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionStatus {
    section: &'static str,
    total: usize,
    synced: usize,
    pending: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    path: String,
    project_name: Option<String>,
    iteration_root_path: Option<String>,
    last_full_sync: Option<String>,
    sections: Vec<SectionStatus>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "section")]
    section: String,
    #[tabled(rename = "items")]
    total: usize,
    #[tabled(rename = "synced")]
    synced: String,
    #[tabled(rename = "pending")]
    pending: String,
}

fn build_report(path: &Path, state: &SyncState) -> StatusReport {
    let sections = Section::ALL
        .iter()
        .map(|section| {
            let records = state.section(*section);
            let synced = records
                .values()
                .filter(|record| is_assigned(record.devops_id.as_ref()))
                .count();
            SectionStatus {
                section: section.key(),
                total: records.len(),
                synced,
                pending: records.len() - synced,
            }
        })
        .collect();

    StatusReport {
        path: path.display().to_string(),
        project_name: state.header.project_name.clone(),
        iteration_root_path: state.header.iteration_root_path.clone(),
        last_full_sync: state.header.last_full_sync.clone(),
        sections,
    }
}

fn print_json(report: &StatusReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(report: StatusReport) {
    let total: usize = report.sections.iter().map(|s| s.total).sum();
    if total == 0 {
        println!("No sync state at {}. Run 'plansync diff' to plan a first sync.", report.path);
        return;
    }

    println!(
        "plansync v{} | {} | project {} | last sync {}",
        env!("CARGO_PKG_VERSION"),
        report.path,
        report.project_name.as_deref().unwrap_or("-").bold(),
        report
            .last_full_sync
            .as_deref()
            .map(describe_sync_time)
            .unwrap_or_else(|| "never".to_string()),
    );

    let rows: Vec<StatusTableRow> = report
        .sections
        .iter()
        .map(|s| StatusTableRow {
            section: s.section.to_string(),
            total: s.total,
            synced: s.synced.to_string().green().to_string(),
            pending: if s.pending > 0 {
                s.pending.to_string().yellow().bold().to_string()
            } else {
                s.pending.to_string()
            },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let pending: usize = report.sections.iter().map(|s| s.pending).sum();
    if pending > 0 {
        println!("{pending} item(s) have no tracker ID yet; the next sync will retry them.");
    }
}

/// `2026-01-01T00:00:00Z (3d ago)`, or the raw text if it is not RFC 3339.
fn describe_sync_time(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => format!("{raw} ({} ago)", format_age(ts.with_timezone(&Utc), Utc::now())),
        Err(_) => raw.to_string(),
    }
}

fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(then).num_seconds().max(0);
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
