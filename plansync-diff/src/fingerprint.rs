//! Content fingerprints.
//!
//! A fingerprint is the first 12 hex characters of the SHA-256 digest of the
//! pipe-joined, normalized semantic fields of an entity. Only the fields
//! listed per kind feed the digest; priority, tags, rendered HTML, review
//! metadata and file breadcrumbs never do, so enriching the parser output
//! cannot produce spurious CHANGED classifications.

use sha2::{Digest, Sha256};

use plansync_core::{Epic, Story, Task};

/// Hex characters kept from the SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 12;

/// Trim, collapse whitespace runs to one space, lowercase.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalize each element, drop empties, sort, join with `,`.
pub fn normalize_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut normalized: Vec<String> = items
        .iter()
        .map(|item| normalize(item.as_ref()))
        .filter(|item| !item.is_empty())
        .collect();
    normalized.sort();
    normalized.join(",")
}

/// Truncated SHA-256 hex digest of `content`.
pub fn compute_hash(content: &str) -> String {
    let mut h = Sha256::new();
    h.update(content.as_bytes());
    let mut digest = hex::encode(h.finalize());
    digest.truncate(FINGERPRINT_LEN);
    digest
}

fn hash_parts(parts: &[String]) -> String {
    compute_hash(&parts.join("|"))
}

/// title | description | phase | requirements
pub fn fingerprint_epic(epic: &Epic) -> String {
    hash_parts(&[
        normalize(&epic.title),
        normalize(&epic.description),
        normalize(&epic.phase),
        normalize_list(&epic.requirements),
    ])
}

/// title | narrative | acceptance | external status
///
/// `status` is the story's status in the tracker, looked up by the caller.
pub fn fingerprint_story(story: &Story, status: Option<&str>) -> String {
    hash_parts(&[
        normalize(&story.title),
        normalize(&story.user_story_text),
        normalize(&story.acceptance_criteria),
        normalize(status.unwrap_or_default()),
    ])
}

/// description | complete/incomplete
pub fn fingerprint_task(task: &Task) -> String {
    let state = if task.complete { "complete" } else { "incomplete" };
    hash_parts(&[normalize(&task.description), state.to_owned()])
}
