//! Domain types for plansync.
//!
//! Parsed artifacts arrive as camelCase JSON from the artifact parser; every
//! entity is a closed struct, so unknown keys are dropped on load instead of
//! being carried from one document to the next.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, DeserializeOwned};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// External identifier
// ---------------------------------------------------------------------------

/// Textual placeholder written by earlier tooling for "no identifier yet".
pub const UNASSIGNED_PLACEHOLDER: &str = "None";

/// Identifier assigned by the external tracking system.
///
/// Work items get numbers, iterations usually get GUID strings. "Not yet
/// assigned" is `Option::None`; a `Text` holding the placeholder is kept as-is
/// so it round-trips through the state file, and [`ExternalId::is_assigned`]
/// reports it as unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Number(i64),
    Text(String),
}

impl ExternalId {
    /// Parse a raw state-file value. Integer-looking values become numbers.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(n) => ExternalId::Number(n),
            Err(_) => ExternalId::Text(raw.to_owned()),
        }
    }

    /// `false` for empty text and the `None`/`null` placeholders.
    pub fn is_assigned(&self) -> bool {
        match self {
            ExternalId::Number(_) => true,
            ExternalId::Text(s) => {
                let s = s.trim();
                !(s.is_empty() || s == UNASSIGNED_PLACEHOLDER || s.eq_ignore_ascii_case("null"))
            }
        }
    }
}

/// `true` only when `id` is present and holds a real identifier.
pub fn is_assigned(id: Option<&ExternalId>) -> bool {
    id.is_some_and(ExternalId::is_assigned)
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalId::Number(n) => n.fmt(f),
            ExternalId::Text(s) => s.fmt(f),
        }
    }
}

impl From<i64> for ExternalId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Outcome of comparing one item against the prior sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// No prior record (or a prior record without a fingerprint).
    New,
    /// Prior fingerprint differs from the fresh one.
    Changed,
    /// Prior fingerprint matches.
    Unchanged,
    /// Prior record with no parsed counterpart.
    Orphaned,
    /// Iteration only: slug already mapped to an external iteration.
    Exists,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::New,
        Classification::Changed,
        Classification::Unchanged,
        Classification::Orphaned,
        Classification::Exists,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::New => "NEW",
            Classification::Changed => "CHANGED",
            Classification::Unchanged => "UNCHANGED",
            Classification::Orphaned => "ORPHANED",
            Classification::Exists => "EXISTS",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parsed entities
// ---------------------------------------------------------------------------

/// Anything the classifier can key by ID.
pub trait Entity {
    fn id(&self) -> &str;
}

/// The artifact parser emits `null` for absent text; treat it as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Cosmetic fields never feed a fingerprint, so a value of the wrong shape
/// (`"priority": "high"`) reads as absent rather than failing the document.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// List form of [`lenient`]: keeps the elements that fit, drops the rest.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// A planning epic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epic {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phase: String,
    /// Requirement references (e.g. `FR-1`, `ARCH-2`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub requirements: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
}

/// A user story belonging to an epic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub epic_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_story_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub acceptance_criteria: String,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
}

/// A checklist task belonging to a story.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub story_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub complete: bool,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
    /// Pre-rendered HTML for nested subtasks.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtask_html: Option<String>,
    /// Acceptance-criteria numbers this task addresses.
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub ac_references: Vec<u32>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub clean_title: Option<String>,
    /// `path:line` breadcrumb for review follow-ups.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_path: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_review_followup: bool,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub review_round: Option<u32>,
}

/// An iteration entry pre-associated by the artifact parser.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIteration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub epic_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stories: Vec<String>,
}

impl Entity for Epic {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Story {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Root of the artifact parser's output document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedArtifacts {
    #[serde(default)]
    pub epics: Vec<Epic>,
    #[serde(default)]
    pub stories: Vec<Story>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub iterations: Vec<ParsedIteration>,
    /// Story ID → external status string (e.g. `in-progress`).
    #[serde(default)]
    pub story_statuses: BTreeMap<String, String>,
    /// Epic ID → external status string.
    #[serde(default)]
    pub epic_statuses: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Diff report
// ---------------------------------------------------------------------------

/// One entity after classification.
///
/// On the wire an item is flat: the parsed record's own keys (`epicId`,
/// `title`, ...) sit next to `classification`, `contentHash` and `devopsId`.
/// Orphans have no parsed counterpart, so their `entity` is always `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedItem<T> {
    pub id: String,
    pub classification: Classification,
    pub content_hash: String,
    pub devops_id: Option<ExternalId>,
    pub entity: Option<T>,
}

/// The keys a classified item adds on top of its record.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemAnnotations {
    id: String,
    classification: Classification,
    content_hash: String,
    #[serde(default)]
    devops_id: Option<ExternalId>,
}

impl<T: Serialize> Serialize for ClassifiedItem<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut fields = match &self.entity {
            Some(entity) => match serde_json::to_value(entity) {
                Ok(Value::Object(fields)) => fields,
                Ok(_) => return Err(ser::Error::custom("classified record must be an object")),
                Err(err) => return Err(ser::Error::custom(err)),
            },
            None => Map::new(),
        };
        let devops_id = match &self.devops_id {
            Some(ExternalId::Number(n)) => Value::from(*n),
            Some(ExternalId::Text(text)) => Value::String(text.clone()),
            None => Value::Null,
        };
        fields.insert("id".into(), Value::String(self.id.clone()));
        fields.insert(
            "classification".into(),
            Value::String(self.classification.as_str().into()),
        );
        fields.insert("contentHash".into(), Value::String(self.content_hash.clone()));
        fields.insert("devopsId".into(), devops_id);
        fields.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ClassifiedItem<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let annotations = match serde_json::from_value::<ItemAnnotations>(Value::Object(
            fields.clone(),
        )) {
            Ok(annotations) => annotations,
            Err(err) => return Err(de::Error::custom(err)),
        };
        let entity = match annotations.classification {
            Classification::Orphaned => None,
            _ => match serde_json::from_value(Value::Object(fields)) {
                Ok(entity) => Some(entity),
                Err(err) => return Err(de::Error::custom(err)),
            },
        };
        Ok(ClassifiedItem {
            id: annotations.id,
            classification: annotations.classification,
            content_hash: annotations.content_hash,
            devops_id: annotations.devops_id,
            entity,
        })
    }
}

/// Iteration membership delta for one epic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationDelta {
    pub slug: String,
    pub epic_id: String,
    #[serde(default)]
    pub story_ids: Vec<String>,
    #[serde(default)]
    pub task_ids: Vec<String>,
    pub classification: Classification,
    pub devops_id: Option<ExternalId>,
}

/// Per-classification counts for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassificationCounts {
    #[serde(rename = "NEW", default)]
    pub new: usize,
    #[serde(rename = "CHANGED", default)]
    pub changed: usize,
    #[serde(rename = "UNCHANGED", default)]
    pub unchanged: usize,
    #[serde(rename = "ORPHANED", default)]
    pub orphaned: usize,
    #[serde(rename = "EXISTS", default)]
    pub exists: usize,
}

impl ClassificationCounts {
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::New => self.new += 1,
            Classification::Changed => self.changed += 1,
            Classification::Unchanged => self.unchanged += 1,
            Classification::Orphaned => self.orphaned += 1,
            Classification::Exists => self.exists += 1,
        }
    }

    pub fn get(&self, classification: Classification) -> usize {
        match classification {
            Classification::New => self.new,
            Classification::Changed => self.changed,
            Classification::Unchanged => self.unchanged,
            Classification::Orphaned => self.orphaned,
            Classification::Exists => self.exists,
        }
    }

    pub fn total(&self) -> usize {
        Classification::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

impl FromIterator<Classification> for ClassificationCounts {
    fn from_iter<I: IntoIterator<Item = Classification>>(iter: I) -> Self {
        let mut counts = Self::default();
        for c in iter {
            counts.record(c);
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub epics: ClassificationCounts,
    pub stories: ClassificationCounts,
    pub tasks: ClassificationCounts,
    pub iterations: ClassificationCounts,
    /// Calls the sync executor is expected to make against the tracker.
    pub estimated_cli_calls: usize,
}

/// Output of a diff run; input to the state writer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    #[serde(default)]
    pub epics: Vec<ClassifiedItem<Epic>>,
    #[serde(default)]
    pub stories: Vec<ClassifiedItem<Story>>,
    #[serde(default)]
    pub tasks: Vec<ClassifiedItem<Task>>,
    #[serde(default)]
    pub iterations: Vec<IterationDelta>,
    #[serde(default)]
    pub story_statuses: BTreeMap<String, String>,
    #[serde(default)]
    pub summary: DiffSummary,
}

// ---------------------------------------------------------------------------
// Sync results
// ---------------------------------------------------------------------------

/// Iteration reference reported by the sync executor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationRef {
    #[serde(default)]
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub epic_id: String,
    #[serde(default)]
    pub devops_id: Option<ExternalId>,
}

/// Work item moved into an iteration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Movement {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
}

/// Iteration outcomes, bucketed by what happened to each iteration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IterationOutcomes {
    #[serde(default)]
    pub created: Vec<IterationRef>,
    #[serde(default)]
    pub failed: Vec<IterationRef>,
    #[serde(default)]
    pub skipped: Vec<IterationRef>,
    #[serde(default)]
    pub movements: Vec<Movement>,
}

/// Output of the external sync executor.
///
/// ID maps may hold `null` for items whose create call failed; those fall back
/// to the identifier carried in the diff report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResults {
    #[serde(default)]
    pub epic_id_map: BTreeMap<String, Option<ExternalId>>,
    #[serde(default)]
    pub story_id_map: BTreeMap<String, Option<ExternalId>>,
    #[serde(default)]
    pub task_id_map: BTreeMap<String, Option<ExternalId>>,
    #[serde(default)]
    pub iterations: IterationOutcomes,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
