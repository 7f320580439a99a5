//! End-to-end diff behaviour: fingerprint stability, classification
//! coverage, iteration deltas and the diff → write → re-read cycle.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use plansync_core::{
    Classification, Epic, ExternalId, IterationRef, ParsedArtifacts, ParsedIteration, Story,
    SyncConfig, SyncResults, Task,
};
use plansync_diff::{
    build_report, fingerprint_epic, fingerprint_story, fingerprint_task, resolve_iterations,
};
use plansync_state::{load_state, parse_state, write_state, SyncState};
use rstest::rstest;
use tempfile::TempDir;

fn epic(id: &str, title: &str) -> Epic {
    Epic {
        id: id.into(),
        title: title.into(),
        ..Epic::default()
    }
}

fn story(id: &str, epic_id: &str) -> Story {
    Story {
        id: id.into(),
        epic_id: epic_id.into(),
        title: format!("Story {id}"),
        ..Story::default()
    }
}

fn task(id: &str, story_id: &str) -> Task {
    Task {
        id: id.into(),
        story_id: story_id.into(),
        description: format!("Do {id}"),
        ..Task::default()
    }
}

fn statuses(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

#[test]
fn epic_fingerprint_is_deterministic() {
    let e = Epic {
        requirements: vec!["FR-1".into(), "FR-2".into()],
        ..epic("1", "Foundation")
    };
    assert_eq!(fingerprint_epic(&e), fingerprint_epic(&e.clone()));
}

#[test]
fn epic_fingerprint_ignores_requirement_order() {
    let a = Epic {
        requirements: vec!["FR-1".into(), "ARCH-2".into(), "NFR-3".into()],
        ..epic("1", "Foundation")
    };
    let b = Epic {
        requirements: vec!["NFR-3".into(), "FR-1".into(), "ARCH-2".into()],
        ..epic("1", "Foundation")
    };
    assert_eq!(fingerprint_epic(&a), fingerprint_epic(&b));
}

#[rstest]
#[case("Foundation Infrastructure", "  foundation   INFRASTRUCTURE ")]
#[case("Foundation Infrastructure", "Foundation\n\tInfrastructure")]
fn epic_fingerprint_ignores_whitespace_and_case(#[case] a: &str, #[case] b: &str) {
    assert_eq!(fingerprint_epic(&epic("1", a)), fingerprint_epic(&epic("1", b)));
}

#[test]
fn epic_fingerprint_ignores_priority_and_tags() {
    let plain = epic("1", "Foundation");
    let enriched = Epic {
        priority: Some(1),
        tags: vec!["platform".into()],
        ..plain.clone()
    };
    assert_eq!(fingerprint_epic(&plain), fingerprint_epic(&enriched));
}

#[test]
fn epic_fingerprint_tracks_semantic_fields() {
    let base = epic("1", "Foundation");
    let described = Epic {
        description: "Set up the workspace".into(),
        ..base.clone()
    };
    assert_ne!(fingerprint_epic(&base), fingerprint_epic(&described));
}

#[test]
fn story_fingerprint_includes_status() {
    let s = story("1.1", "1");
    assert_ne!(
        fingerprint_story(&s, Some("ready-for-dev")),
        fingerprint_story(&s, Some("done"))
    );
    assert_eq!(fingerprint_story(&s, None), fingerprint_story(&s, Some("")));
}

#[test]
fn task_fingerprint_ignores_enrichment() {
    let plain = task("1.1-T1", "1.1");
    let enriched = Task {
        priority: Some(2),
        tags: vec!["backend".into()],
        subtask_html: Some("<ul><li>x</li></ul>".into()),
        ac_references: vec![1, 3],
        clean_title: Some("Do it".into()),
        file_path: Some("src/lib.rs:10".into()),
        is_review_followup: true,
        review_round: Some(2),
        ..plain.clone()
    };
    assert_eq!(fingerprint_task(&plain), fingerprint_task(&enriched));

    let done = Task {
        complete: true,
        ..plain.clone()
    };
    assert_ne!(fingerprint_task(&plain), fingerprint_task(&done));
}

#[test]
fn odd_cosmetic_values_parse_and_keep_the_fingerprint() {
    let parsed: ParsedArtifacts = serde_json::from_str(
        r#"{
          "stories": [
            {"id": "1.1", "epicId": "1", "title": "Setup", "priority": "high"}
          ],
          "tasks": [
            {"id": "1.1-T1", "storyId": "1.1", "description": "Init", "complete": false,
             "acReferences": ["AC1", "AC2"], "reviewRound": "first"}
          ]
        }"#,
    )
    .expect("cosmetic fields never fail the document");

    let story_plain: Story =
        serde_json::from_str(r#"{"id": "1.1", "epicId": "1", "title": "Setup"}"#).expect("story");
    let task_plain: Task = serde_json::from_str(
        r#"{"id": "1.1-T1", "storyId": "1.1", "description": "Init", "complete": false}"#,
    )
    .expect("task");

    assert_eq!(
        fingerprint_story(&parsed.stories[0], None),
        fingerprint_story(&story_plain, None)
    );
    assert_eq!(fingerprint_task(&parsed.tasks[0]), fingerprint_task(&task_plain));
}

// ---------------------------------------------------------------------------
// Classification coverage
// ---------------------------------------------------------------------------

#[test]
fn every_id_appears_exactly_once() {
    let parsed = ParsedArtifacts {
        epics: vec![epic("1", "A"), epic("2", "B")],
        stories: vec![story("1.1", "1"), story("2.1", "2")],
        tasks: vec![task("1.1-T1", "1.1")],
        ..ParsedArtifacts::default()
    };
    let state = parse_state(
        "epics:\n  \"1\":\n    devopsId: 10\n    contentHash: \"x\"\n  \"3\":\n    devopsId: 30\n    contentHash: \"y\"\nstories:\n  \"9.9\":\n    devopsId: 99\n    contentHash: \"z\"\n",
    );

    let report = build_report(&parsed, &state);

    let epic_ids: Vec<&str> = report.epics.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(epic_ids, ["1", "2", "3"]);
    assert_eq!(report.epics[0].classification, Classification::Changed);
    assert_eq!(report.epics[1].classification, Classification::New);
    assert_eq!(report.epics[2].classification, Classification::Orphaned);
    assert!(report.epics[2].entity.is_none());

    let story_ids: Vec<&str> = report.stories.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(story_ids, ["1.1", "2.1", "9.9"]);
    assert_eq!(report.summary.stories.orphaned, 1);
    assert_eq!(report.summary.tasks.new, 1);
}

#[test]
fn story_lifecycle_new_unchanged_changed() {
    let dir = TempDir::new().expect("tempdir");
    let state_path = dir.path().join("sync-state.yaml");
    let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    let mut parsed = ParsedArtifacts {
        epics: vec![epic("1", "Foundation")],
        stories: vec![story("1.1", "1")],
        story_statuses: statuses(&[("1.1", "ready-for-dev")]),
        ..ParsedArtifacts::default()
    };

    // A record with an ID but no fingerprint still classifies as NEW.
    std::fs::write(
        &state_path,
        "stories:\n  \"1.1\":\n    devopsId: 101\n    contentHash:\n",
    )
    .expect("seed state");
    let first = build_report(&parsed, &load_state(Some(&state_path)));
    assert_eq!(first.stories[0].classification, Classification::New);
    assert_eq!(first.stories[0].devops_id, Some(ExternalId::Number(101)));

    let results = SyncResults {
        epic_id_map: [("1".to_string(), Some(ExternalId::Number(1)))].into(),
        ..SyncResults::default()
    };
    write_state(&first, &results, &SyncConfig::default(), ts, &state_path).expect("write");

    let second = build_report(&parsed, &load_state(Some(&state_path)));
    assert_eq!(second.stories[0].classification, Classification::Unchanged);
    assert_eq!(second.epics[0].classification, Classification::Unchanged);

    parsed.story_statuses = statuses(&[("1.1", "in-progress")]);
    let third = build_report(&parsed, &load_state(Some(&state_path)));
    assert_eq!(third.stories[0].classification, Classification::Changed);
    assert_eq!(third.stories[0].devops_id, Some(ExternalId::Number(101)));
}

// ---------------------------------------------------------------------------
// Iterations
// ---------------------------------------------------------------------------

const EXISTING_ITERATION_STATE: &str = "\
epics:
  \"1\":
    devopsId: 1
    contentHash: \"aaa\"
stories:
  \"1.1\":
    devopsId: 101
    contentHash: \"bbb\"
  \"1.2\":
    devopsId: 102
    contentHash: \"ccc\"
tasks:
  \"1.1-T1\":
    devopsId: 1001
    contentHash: \"ddd\"
iterations:
  epic-1-foundation:
    devopsId: 500
    epicId: \"1\"
";

fn foundation_with_new_story() -> ParsedArtifacts {
    ParsedArtifacts {
        epics: vec![epic("1", "Foundation")],
        stories: vec![story("1.1", "1"), story("1.2", "1"), story("1.3", "1")],
        tasks: vec![task("1.1-T1", "1.1"), task("1.3-T1", "1.3")],
        epic_statuses: statuses(&[("1", "in-progress")]),
        ..ParsedArtifacts::default()
    }
}

#[test]
fn existing_iteration_reports_only_unsynced_members() {
    let state = parse_state(EXISTING_ITERATION_STATE);
    let deltas = resolve_iterations(&foundation_with_new_story(), &state);

    assert_eq!(deltas.len(), 1);
    let delta = &deltas[0];
    assert_eq!(delta.slug, "epic-1-foundation");
    assert_eq!(delta.classification, Classification::Exists);
    assert_eq!(delta.devops_id, Some(ExternalId::Number(500)));
    assert_eq!(delta.story_ids, ["1.3"]);
    assert_eq!(delta.task_ids, ["1.3-T1"]);
}

#[test]
fn existing_iteration_keeps_slug_after_epic_rename() {
    let state = parse_state(EXISTING_ITERATION_STATE);
    let mut parsed = foundation_with_new_story();
    parsed.epics[0].title = "Foundation and Tooling".into();

    let deltas = resolve_iterations(&parsed, &state);
    assert_eq!(deltas[0].slug, "epic-1-foundation");
    assert_eq!(deltas[0].classification, Classification::Exists);
}

#[test]
fn new_iteration_lists_every_member() {
    let deltas = resolve_iterations(&foundation_with_new_story(), &SyncState::default());

    assert_eq!(deltas.len(), 1);
    let delta = &deltas[0];
    assert_eq!(delta.classification, Classification::New);
    assert_eq!(delta.devops_id, None);
    assert_eq!(delta.story_ids, ["1.1", "1.2", "1.3"]);
    assert_eq!(delta.task_ids, ["1.1-T1", "1.3-T1"]);
}

#[test]
fn stored_iteration_without_id_is_new() {
    let state = parse_state("iterations:\n  epic-1-foundation:\n    devopsId: \"None\"\n    epicId: \"1\"\n");
    let deltas = resolve_iterations(&foundation_with_new_story(), &state);
    assert_eq!(deltas[0].classification, Classification::New);
    assert_eq!(deltas[0].slug, "epic-1-foundation");
    assert_eq!(deltas[0].story_ids.len(), 3);
}

#[rstest]
#[case("backlog", false)]
#[case("", false)]
#[case("in-progress", true)]
#[case("done", true)]
#[case("Done", false)]
#[case(" done", false)]
fn iteration_only_for_active_epics(#[case] status: &str, #[case] expected: bool) {
    let parsed = ParsedArtifacts {
        epics: vec![epic("1", "Foundation")],
        stories: vec![story("1.1", "1")],
        epic_statuses: statuses(&[("1", status)]),
        ..ParsedArtifacts::default()
    };
    let deltas = resolve_iterations(&parsed, &SyncState::default());
    assert_eq!(!deltas.is_empty(), expected);
}

#[test]
fn parsed_iteration_stories_join_membership() {
    let parsed = ParsedArtifacts {
        epics: vec![epic("2", "Security")],
        stories: vec![story("2.1", "2")],
        iterations: vec![ParsedIteration {
            name: Some("Sprint 2".into()),
            epic_id: "2".into(),
            stories: vec!["2.1".into(), "2.2".into()],
        }],
        epic_statuses: statuses(&[("2", "done")]),
        ..ParsedArtifacts::default()
    };
    let deltas = resolve_iterations(&parsed, &SyncState::default());
    assert_eq!(deltas[0].story_ids, ["2.1", "2.2"]);
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn write_then_reload_preserves_ids_and_fingerprints() {
    let dir = TempDir::new().expect("tempdir");
    let state_path = dir.path().join("sync-state.yaml");
    let ts = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();

    let parsed = foundation_with_new_story();
    let report = build_report(&parsed, &SyncState::default());

    let results = SyncResults {
        epic_id_map: [("1".to_string(), Some(ExternalId::Number(1)))].into(),
        story_id_map: [
            ("1.1".to_string(), Some(ExternalId::Number(101))),
            ("1.2".to_string(), Some(ExternalId::Number(102))),
            ("1.3".to_string(), None),
        ]
        .into(),
        task_id_map: [
            ("1.1-T1".to_string(), Some(ExternalId::Number(1001))),
            ("1.3-T1".to_string(), Some(ExternalId::from("T-77"))),
        ]
        .into(),
        iterations: plansync_core::IterationOutcomes {
            created: vec![IterationRef {
                slug: "epic-1-foundation".into(),
                epic_id: "1".into(),
                devops_id: Some(ExternalId::Number(500)),
            }],
            ..Default::default()
        },
    };
    let config = SyncConfig {
        project_name: "Acme".into(),
        iteration_root_path: "Acme\\Sprints".into(),
    };
    write_state(&report, &results, &config, ts, &state_path).expect("write");

    let reloaded = load_state(Some(&state_path));
    let expected_ids: BTreeMap<&str, Option<ExternalId>> = [
        ("1.1", Some(ExternalId::Number(101))),
        ("1.2", Some(ExternalId::Number(102))),
        ("1.3", None),
    ]
    .into();
    for item in &report.stories {
        let record = &reloaded.stories[&item.id];
        assert_eq!(record.content_hash, item.content_hash, "{}", item.id);
        assert_eq!(record.devops_id, expected_ids[item.id.as_str()], "{}", item.id);
    }
    for item in &report.tasks {
        assert_eq!(reloaded.tasks[&item.id].content_hash, item.content_hash);
    }
    assert_eq!(
        reloaded.tasks["1.3-T1"].devops_id,
        Some(ExternalId::from("T-77"))
    );
    assert_eq!(
        reloaded.iterations["epic-1-foundation"].devops_id,
        Some(ExternalId::Number(500))
    );

    // Story 1.3 has no ID yet but is already recorded, so the iteration
    // does not list it again.
    let again = build_report(&parsed, &reloaded);
    assert_eq!(again.summary.epics.unchanged, 1);
    assert_eq!(again.summary.stories.unchanged, 3);
    assert_eq!(again.summary.tasks.unchanged, 2);
    assert_eq!(again.summary.iterations.exists, 1);
    assert!(again.iterations[0].story_ids.is_empty());
}
