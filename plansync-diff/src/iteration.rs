//! Per-epic iterations and their membership deltas.
//!
//! Only epics the tracker reports as `in-progress` or `done` get an iteration.
//! An iteration that already exists externally reports only the members the
//! prior state has never seen, so the sync executor does not re-add stories
//! and tasks that are already linked.

use std::collections::BTreeMap;

use plansync_core::{types::is_assigned, Classification, IterationDelta, ParsedArtifacts};
use plansync_state::{StateRecord, SyncState};

/// Upper bound on slug length, prefix included.
pub const MAX_SLUG_LEN: usize = 128;

/// Epic statuses that warrant an iteration.
pub const ACTIVE_EPIC_STATUSES: [&str; 2] = ["in-progress", "done"];

/// `epic-<id>-<title>`, lowercased, restricted to ASCII letters, digits and
/// hyphens, truncated to [`MAX_SLUG_LEN`] without a trailing hyphen.
pub fn iteration_slug(epic_id: &str, title: &str) -> String {
    let mut words = String::new();
    let mut separator = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if separator && !words.is_empty() {
                words.push('-');
            }
            separator = false;
            words.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            separator = true;
        }
    }

    let slug = format!("epic-{}-{words}", epic_id.trim().to_lowercase());
    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_owned()
}

fn push_unique<'a>(list: &mut Vec<&'a str>, id: &'a str) {
    if !id.is_empty() && !list.contains(&id) {
        list.push(id);
    }
}

/// Slug of the stored iteration already bound to `epic_id`, if any.
fn existing_slug<'a>(state: &'a SyncState, epic_id: &str) -> Option<&'a str> {
    state
        .iterations
        .iter()
        .find(|(_, record)| record.epic_id.as_deref() == Some(epic_id))
        .map(|(slug, _)| slug.as_str())
}

/// Derive one [`IterationDelta`] per active epic.
pub fn resolve_iterations(parsed: &ParsedArtifacts, state: &SyncState) -> Vec<IterationDelta> {
    let mut stories_by_epic: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for story in &parsed.stories {
        if !story.epic_id.is_empty() {
            push_unique(stories_by_epic.entry(&story.epic_id).or_default(), &story.id);
        }
    }
    for iteration in &parsed.iterations {
        if iteration.epic_id.is_empty() {
            continue;
        }
        let members = stories_by_epic.entry(&iteration.epic_id).or_default();
        for story_id in &iteration.stories {
            push_unique(members, story_id);
        }
    }

    let mut tasks_by_story: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for task in &parsed.tasks {
        if !task.story_id.is_empty() {
            push_unique(tasks_by_story.entry(&task.story_id).or_default(), &task.id);
        }
    }

    let mut out = Vec::new();
    for epic in &parsed.epics {
        // Tracker statuses are exact tokens; "Done" is not "done".
        let status = parsed
            .epic_statuses
            .get(&epic.id)
            .map(String::as_str)
            .unwrap_or_default();
        if !ACTIVE_EPIC_STATUSES.contains(&status) {
            tracing::debug!("epic {}: status '{status}', no iteration", epic.id);
            continue;
        }

        let slug = match existing_slug(state, &epic.id) {
            Some(slug) => slug.to_owned(),
            None => iteration_slug(&epic.id, &epic.title),
        };

        let story_ids: Vec<&str> = stories_by_epic
            .get(epic.id.as_str())
            .cloned()
            .unwrap_or_default();
        let task_ids: Vec<&str> = story_ids
            .iter()
            .flat_map(|sid| tasks_by_story.get(sid).into_iter().flatten().copied())
            .collect();

        let stored = state
            .iterations
            .get(&slug)
            .filter(|record| is_assigned(record.devops_id.as_ref()));

        let delta = match stored {
            Some(record) => IterationDelta {
                story_ids: member_ids(&story_ids, Some(&state.stories)),
                task_ids: member_ids(&task_ids, Some(&state.tasks)),
                slug,
                epic_id: epic.id.clone(),
                classification: Classification::Exists,
                devops_id: record.devops_id.clone(),
            },
            None => IterationDelta {
                story_ids: member_ids(&story_ids, None),
                task_ids: member_ids(&task_ids, None),
                slug,
                epic_id: epic.id.clone(),
                classification: Classification::New,
                devops_id: None,
            },
        };
        tracing::debug!(
            "iteration {}: {} (+{} stories, +{} tasks)",
            delta.slug,
            delta.classification,
            delta.story_ids.len(),
            delta.task_ids.len()
        );
        out.push(delta);
    }
    out
}

/// Owned copies of `ids`, minus those already present in `synced`.
fn member_ids(ids: &[&str], synced: Option<&BTreeMap<String, StateRecord>>) -> Vec<String> {
    ids.iter()
        .filter(|id| synced.map_or(true, |synced| !synced.contains_key(**id)))
        .map(|id| (*id).to_owned())
        .collect()
}
