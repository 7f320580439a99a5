//! Assembly of the full diff report.

use plansync_core::{
    Classification, ClassificationCounts, ClassifiedItem, DiffReport, DiffSummary, IterationDelta,
    ParsedArtifacts,
};
use plansync_state::SyncState;

use crate::classify::classify;
use crate::fingerprint::{fingerprint_epic, fingerprint_story, fingerprint_task};
use crate::iteration::resolve_iterations;

/// Story status that does not require a separate state transition call.
const DRAFT_STATUS: &str = "draft";

/// Classify every category of `parsed` against `state`.
pub fn build_report(parsed: &ParsedArtifacts, state: &SyncState) -> DiffReport {
    let epics = classify(&parsed.epics, &state.epics, fingerprint_epic);
    let stories = classify(&parsed.stories, &state.stories, |story| {
        fingerprint_story(story, parsed.story_statuses.get(&story.id).map(String::as_str))
    });
    let tasks = classify(&parsed.tasks, &state.tasks, fingerprint_task);
    let iterations = resolve_iterations(parsed, state);

    let mut summary = DiffSummary {
        epics: counts(&epics),
        stories: counts(&stories),
        tasks: counts(&tasks),
        iterations: iterations.iter().map(|i| i.classification).collect(),
        estimated_cli_calls: 0,
    };
    let transitions = stories
        .iter()
        .filter(|item| item.classification == Classification::New)
        .filter(|item| needs_transition(parsed.story_statuses.get(&item.id)))
        .count();
    summary.estimated_cli_calls = estimate_cli_calls(&summary, transitions, &iterations);

    tracing::info!(
        "diff: epics {}, stories {}, tasks {}, iterations {}, ~{} tracker calls",
        format_counts(&summary.epics),
        format_counts(&summary.stories),
        format_counts(&summary.tasks),
        format_counts(&summary.iterations),
        summary.estimated_cli_calls
    );

    DiffReport {
        epics,
        stories,
        tasks,
        iterations,
        story_statuses: parsed.story_statuses.clone(),
        summary,
    }
}

/// Tracker calls the sync executor will make for this diff.
///
/// NEW stories and tasks cost a create plus a parent link; a NEW story with a
/// non-draft status costs one more call to move it into that state. A NEW
/// iteration costs a create plus one assignment per member story.
pub fn estimate_cli_calls(
    summary: &DiffSummary,
    story_transitions: usize,
    iterations: &[IterationDelta],
) -> usize {
    let iteration_assignments: usize = iterations
        .iter()
        .filter(|i| i.classification == Classification::New)
        .map(|i| i.story_ids.len())
        .sum();

    summary.epics.new
        + summary.epics.changed
        + 2 * summary.stories.new
        + story_transitions
        + summary.stories.changed
        + 2 * summary.tasks.new
        + summary.tasks.changed
        + summary.iterations.new
        + iteration_assignments
}

fn needs_transition(status: Option<&String>) -> bool {
    status.is_some_and(|status| !status.is_empty() && status != DRAFT_STATUS)
}

fn counts<T>(items: &[ClassifiedItem<T>]) -> ClassificationCounts {
    items.iter().map(|item| item.classification).collect()
}

fn format_counts(counts: &ClassificationCounts) -> String {
    let parts: Vec<String> = Classification::ALL
        .iter()
        .filter(|c| counts.get(**c) > 0)
        .map(|c| format!("{}={}", c, counts.get(*c)))
        .collect();
    if parts.is_empty() {
        "none".to_owned()
    } else {
        parts.join(" ")
    }
}
