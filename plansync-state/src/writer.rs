//! State document writer.
//!
//! ## `write_state`: merge and replace
//!
//! 1. Load the current document at the destination (prior iterations).
//! 2. Drop ORPHANED items; resolve each remaining item's external ID from the
//!    sync results, falling back to the diff report.
//! 3. Merge iterations by slug: created > skipped > previously persisted.
//! 4. Render the whole document in numeric-aware ID order.
//! 5. Write to `<path>.tmp`, then rename over `<path>`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use plansync_core::{
    types::is_assigned, Classification, ClassifiedItem, DiffReport, ExternalId, SyncConfig,
    SyncResults,
};

use crate::error::{io_err, StateError};
use crate::reader::{load_state, Section, StateRecord, SyncState};
use crate::sort::compare_ids;

const SYNCED: &str = "synced";
const PENDING: &str = "pending";

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// Records written per category, plus items still waiting for an external ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteCounts {
    pub epics: usize,
    pub stories: usize,
    pub tasks: usize,
    pub iterations: usize,
    pub pending_stories: usize,
    pub pending_tasks: usize,
}

// ---------------------------------------------------------------------------
// Item merge
// ---------------------------------------------------------------------------

/// The sync results win when they hold a value (even a placeholder); `null`
/// or a missing key keeps the identifier carried by the diff report.
fn resolve_id(
    id_map: &BTreeMap<String, Option<ExternalId>>,
    id: &str,
    carried: Option<&ExternalId>,
) -> Option<ExternalId> {
    match id_map.get(id) {
        Some(Some(fresh)) => Some(fresh.clone()),
        _ => carried.cloned(),
    }
}

fn status_for(devops_id: Option<&ExternalId>) -> String {
    let status = if is_assigned(devops_id) { SYNCED } else { PENDING };
    status.to_owned()
}

fn retained<T>(items: &[ClassifiedItem<T>]) -> impl Iterator<Item = &ClassifiedItem<T>> {
    items
        .iter()
        .filter(|item| item.classification != Classification::Orphaned)
}

fn merge_items<T>(
    items: &[ClassifiedItem<T>],
    id_map: &BTreeMap<String, Option<ExternalId>>,
    mut decorate: impl FnMut(&ClassifiedItem<T>, &mut StateRecord),
) -> BTreeMap<String, StateRecord> {
    let mut out = BTreeMap::new();
    for item in retained(items) {
        let devops_id = resolve_id(id_map, &item.id, item.devops_id.as_ref());
        let mut record = StateRecord {
            status: Some(status_for(devops_id.as_ref())),
            devops_id,
            content_hash: item.content_hash.clone(),
            ..StateRecord::default()
        };
        decorate(item, &mut record);
        out.insert(item.id.clone(), record);
    }
    out
}

fn parent_id(entity_parent: Option<&str>, prior: Option<&String>) -> Option<String> {
    entity_parent
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .or_else(|| prior.cloned())
}

// ---------------------------------------------------------------------------
// Iteration merge
// ---------------------------------------------------------------------------

/// Iterations touched by this run, keyed by slug.
///
/// Only entries of the `created` and `skipped` lists become records; created
/// entries override skipped ones with the same slug.
pub fn build_iteration_map(results: &SyncResults) -> BTreeMap<String, StateRecord> {
    let mut out: BTreeMap<String, StateRecord> = BTreeMap::new();
    let skipped = results.iterations.skipped.iter();
    let created = results.iterations.created.iter();
    for entry in skipped.chain(created) {
        if entry.slug.is_empty() {
            continue;
        }
        out.insert(
            entry.slug.clone(),
            StateRecord {
                devops_id: entry.devops_id.clone(),
                epic_id: (!entry.epic_id.is_empty()).then(|| entry.epic_id.clone()),
                ..StateRecord::default()
            },
        );
    }
    out
}

/// Fill gaps in this run's iterations from the diff report and prior state,
/// then add prior iterations this run did not touch.
fn merge_iterations(
    report: &DiffReport,
    results: &SyncResults,
    prior: &BTreeMap<String, StateRecord>,
) -> BTreeMap<String, StateRecord> {
    let mut merged = build_iteration_map(results);
    for (slug, record) in merged.iter_mut() {
        let from_report = report.iterations.iter().find(|it| &it.slug == slug);
        let from_prior = prior.get(slug);
        if !is_assigned(record.devops_id.as_ref()) {
            record.devops_id = from_report
                .and_then(|it| it.devops_id.clone())
                .filter(ExternalId::is_assigned)
                .or_else(|| from_prior.and_then(|p| p.devops_id.clone()))
                .or(record.devops_id.take());
        }
        if record.epic_id.is_none() {
            record.epic_id = from_report
                .map(|it| it.epic_id.clone())
                .filter(|e| !e.is_empty())
                .or_else(|| from_prior.and_then(|p| p.epic_id.clone()));
        }
    }
    for (slug, record) in prior {
        merged
            .entry(slug.clone())
            .or_insert_with(|| StateRecord {
                devops_id: record.devops_id.clone(),
                epic_id: record.epic_id.clone(),
                ..StateRecord::default()
            });
    }
    merged
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

// The reader has no escape syntax: keep values on one line, without quotes.
fn quote(value: &str) -> String {
    let flat: String = value
        .chars()
        .map(|c| match c {
            '"' => '\'',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect();
    format!("\"{flat}\"")
}

/// Item keys go through [`quote`] too, but a key it has to alter no longer
/// matches the ID the next diff parses, so say so.
fn render_key(section: Section, id: &str) -> String {
    if id.contains(['"', '\n', '\r']) {
        tracing::warn!(
            "{} key {id:?} contains quotes or line breaks; it is written altered and will not match on the next diff",
            section.key()
        );
    }
    quote(id)
}

fn quote_opt(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .map(quote)
        .unwrap_or_default()
}

fn render_id(id: Option<&ExternalId>) -> String {
    match id {
        Some(ExternalId::Number(n)) => n.to_string(),
        Some(ExternalId::Text(s)) => quote(s),
        None => String::new(),
    }
}

fn push_property(out: &mut String, key: &str, value: &str) {
    if value.is_empty() {
        let _ = writeln!(out, "    {key}:");
    } else {
        let _ = writeln!(out, "    {key}: {value}");
    }
}

fn render_record(out: &mut String, section: Section, record: &StateRecord) {
    match section {
        Section::Iterations => {
            push_property(out, "epicId", &quote_opt(record.epic_id.as_deref()));
            push_property(out, "devopsId", &render_id(record.devops_id.as_ref()));
        }
        Section::Epics | Section::Stories | Section::Tasks => {
            push_property(out, "devopsId", &render_id(record.devops_id.as_ref()));
            if section == Section::Stories {
                push_property(out, "epicId", &quote_opt(record.epic_id.as_deref()));
                push_property(
                    out,
                    "epicDevopsId",
                    &render_id(record.epic_devops_id.as_ref()),
                );
            }
            if section == Section::Tasks {
                push_property(out, "storyId", &quote_opt(record.story_id.as_deref()));
                push_property(
                    out,
                    "storyDevopsId",
                    &render_id(record.story_devops_id.as_ref()),
                );
            }
            push_property(out, "contentHash", &quote(&record.content_hash));
            push_property(out, "status", &quote(record.status.as_deref().unwrap_or(PENDING)));
        }
    }
}

fn render_section(out: &mut String, section: Section, records: &BTreeMap<String, StateRecord>) {
    let _ = writeln!(out, "{}:", section.key());
    let mut ids: Vec<&String> = records.keys().collect();
    ids.sort_by(|a, b| compare_ids(a, b));
    for id in ids {
        let _ = writeln!(out, "  {}:", render_key(section, id));
        render_record(out, section, &records[id]);
    }
}

fn render_document(state: &SyncState, config: &SyncConfig, timestamp: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str("# plansync state. Generated on every sync run; manual edits are overwritten.\n");
    let _ = writeln!(out, "projectName: {}", quote(&config.project_name));
    let _ = writeln!(out, "iterationRootPath: {}", quote(&config.iteration_root_path));
    let _ = writeln!(
        out,
        "lastFullSync: {}",
        quote(&timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
    );
    for section in Section::ALL {
        render_section(&mut out, section, state.section(section));
    }
    out
}

// ---------------------------------------------------------------------------
// Atomic write
// ---------------------------------------------------------------------------

/// Replace `path` with `content` via a `<path>.tmp` sibling and rename.
///
/// Missing parent directories are created. The temp file never outlives a
/// failed call.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), StateError> {
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    atomic_write_with_tmp(path, content, &tmp)
}

fn atomic_write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), StateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Err(e) = std::fs::write(tmp, content) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(tmp, e));
    }
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// write_state
// ---------------------------------------------------------------------------

/// Merge `report` with `results` and replace the state document at `path`.
pub fn write_state(
    report: &DiffReport,
    results: &SyncResults,
    config: &SyncConfig,
    timestamp: DateTime<Utc>,
    path: &Path,
) -> Result<WriteCounts, StateError> {
    let prior = load_state(Some(path));
    let next = merge_state(report, results, &prior);
    let counts = count(&next);

    let document = render_document(&next, config, timestamp);
    atomic_write(path, &document)?;

    tracing::info!(
        "wrote {}: {} epics, {} stories ({} pending), {} tasks ({} pending), {} iterations",
        path.display(),
        counts.epics,
        counts.stories,
        counts.pending_stories,
        counts.tasks,
        counts.pending_tasks,
        counts.iterations,
    );
    Ok(counts)
}

fn merge_state(report: &DiffReport, results: &SyncResults, prior: &SyncState) -> SyncState {
    let epics = merge_items(&report.epics, &results.epic_id_map, |_, _| {});

    let stories = merge_items(&report.stories, &results.story_id_map, |item, record| {
        let prior_record = prior.stories.get(&item.id);
        record.epic_id = parent_id(
            item.entity.as_ref().map(|s| s.epic_id.as_str()),
            prior_record.and_then(|p| p.epic_id.as_ref()),
        );
        record.epic_devops_id = record
            .epic_id
            .as_ref()
            .and_then(|epic| epics.get(epic))
            .and_then(|epic| epic.devops_id.clone())
            .filter(ExternalId::is_assigned);
    });

    let tasks = merge_items(&report.tasks, &results.task_id_map, |item, record| {
        let prior_record = prior.tasks.get(&item.id);
        record.story_id = parent_id(
            item.entity.as_ref().map(|t| t.story_id.as_str()),
            prior_record.and_then(|p| p.story_id.as_ref()),
        );
        record.story_devops_id = record
            .story_id
            .as_ref()
            .and_then(|story| stories.get(story))
            .and_then(|story| story.devops_id.clone())
            .filter(ExternalId::is_assigned);
    });

    let iterations = merge_iterations(report, results, &prior.iterations);

    SyncState {
        header: prior.header.clone(),
        epics,
        stories,
        tasks,
        iterations,
    }
}

fn count(state: &SyncState) -> WriteCounts {
    let pending = |records: &BTreeMap<String, StateRecord>| {
        records
            .values()
            .filter(|r| !is_assigned(r.devops_id.as_ref()))
            .count()
    };
    WriteCounts {
        epics: state.epics.len(),
        stories: state.stories.len(),
        tasks: state.tasks.len(),
        iterations: state.iterations.len(),
        pending_stories: pending(&state.stories),
        pending_tasks: pending(&state.tasks),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
