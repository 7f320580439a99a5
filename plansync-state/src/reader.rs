//! State document reader.
//!
//! The state file is a narrow, line-oriented YAML subset:
//!
//! ```text
//! lastFullSync: "2026-01-01T00:00:00Z"
//! epics:
//!   "1":
//!     devopsId: 12345
//!     contentHash: "abc123def456"
//! stories:
//!   "1.1":
//!     devopsId: 12346
//!     epicDevopsId:
//!     contentHash: "def456ghi789"
//! tasks:
//! iterations:
//!   epic-1-foundation:
//!     epicId: "1"
//!     devopsId: "guid-here"
//! ```
//!
//! Parsing is a forward-only state machine over classified lines
//! (section → item → property). An item is flushed into its section only at a
//! boundary: the next item header, any top-level line, or end of input.

use std::collections::BTreeMap;
use std::path::Path;

use plansync_core::ExternalId;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One of the four fixed top-level sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Epics,
    Stories,
    Tasks,
    Iterations,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Epics,
        Section::Stories,
        Section::Tasks,
        Section::Iterations,
    ];

    /// Header key as it appears in the document.
    pub fn key(&self) -> &'static str {
        match self {
            Section::Epics => "epics",
            Section::Stories => "stories",
            Section::Tasks => "tasks",
            Section::Iterations => "iterations",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }
}

/// Prior sync record for one item or iteration.
///
/// Unknown property keys are dropped on read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateRecord {
    pub devops_id: Option<ExternalId>,
    pub content_hash: String,
    pub epic_id: Option<String>,
    pub story_id: Option<String>,
    pub epic_devops_id: Option<ExternalId>,
    pub story_devops_id: Option<ExternalId>,
    /// `synced` or `pending`, as written by the last run.
    pub status: Option<String>,
}

impl StateRecord {
    /// Apply one `key: value` property. Returns `false` for unknown keys.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match key {
            "devopsId" => self.devops_id = parse_external_id(value),
            "epicDevopsId" => self.epic_devops_id = parse_external_id(value),
            "storyDevopsId" => self.story_devops_id = parse_external_id(value),
            "contentHash" => self.content_hash = value.to_owned(),
            "epicId" => self.epic_id = non_empty(value),
            "storyId" => self.story_id = non_empty(value),
            "status" => self.status = non_empty(value),
            _ => return false,
        }
        true
    }
}

fn parse_external_id(value: &str) -> Option<ExternalId> {
    if value.is_empty() {
        None
    } else {
        Some(ExternalId::parse(value))
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

/// Top-level scalars written above the sections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateHeader {
    pub project_name: Option<String>,
    pub iteration_root_path: Option<String>,
    pub last_full_sync: Option<String>,
}

/// Everything a run knows about the previous generation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncState {
    pub header: StateHeader,
    pub epics: BTreeMap<String, StateRecord>,
    pub stories: BTreeMap<String, StateRecord>,
    pub tasks: BTreeMap<String, StateRecord>,
    pub iterations: BTreeMap<String, StateRecord>,
}

impl SyncState {
    pub fn section(&self, section: Section) -> &BTreeMap<String, StateRecord> {
        match section {
            Section::Epics => &self.epics,
            Section::Stories => &self.stories,
            Section::Tasks => &self.tasks,
            Section::Iterations => &self.iterations,
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut BTreeMap<String, StateRecord> {
        match section {
            Section::Epics => &mut self.epics,
            Section::Stories => &mut self.stories,
            Section::Tasks => &mut self.tasks,
            Section::Iterations => &mut self.iterations,
        }
    }

    pub fn is_empty(&self) -> bool {
        Section::ALL.iter().all(|s| self.section(*s).is_empty())
    }
}

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind<'a> {
    Blank,
    Section(Section),
    /// Any other top-level key; resets section context.
    TopLevel { key: &'a str, value: &'a str },
    /// Two-space indented `id:` (id optionally double-quoted).
    ItemHeader(&'a str),
    /// Four-space indented `key: value` (value may be empty).
    Property { key: &'a str, value: &'a str },
    Unrecognized,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Content after exactly `n` spaces of indentation, if the line has that.
fn at_indent(line: &str, n: usize) -> Option<&str> {
    let rest = line.get(n..)?;
    let indent_ok = line.as_bytes()[..n].iter().all(|b| *b == b' ');
    let next_ok = rest.chars().next().is_some_and(|c| !c.is_whitespace());
    (indent_ok && next_ok).then_some(rest)
}

fn unquote(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim_end();
    let Some(first) = line.chars().next() else {
        return LineKind::Blank;
    };

    if !first.is_whitespace() {
        if !is_word_char(first) {
            return LineKind::Unrecognized;
        }
        let (key, value) = match line.split_once(':') {
            Some((key, value)) => (key.trim(), unquote(value.trim())),
            None => (line, ""),
        };
        if value.is_empty() {
            if let Some(section) = Section::from_key(key) {
                return LineKind::Section(section);
            }
        }
        return LineKind::TopLevel { key, value };
    }

    if let Some(rest) = at_indent(line, 2) {
        let Some(inner) = rest.strip_suffix(':') else {
            return LineKind::Unrecognized;
        };
        let quoted = inner.len() >= 2 && inner.starts_with('"') && inner.ends_with('"');
        let id = unquote(inner).trim();
        // Only a quoted header may carry a colon inside its ID.
        if id.is_empty() || id.contains('"') || (!quoted && id.contains(':')) {
            return LineKind::Unrecognized;
        }
        return LineKind::ItemHeader(id);
    }

    if let Some(rest) = at_indent(line, 4) {
        let Some((key, value)) = rest.split_once(':') else {
            return LineKind::Unrecognized;
        };
        if key.is_empty() || !key.chars().all(is_word_char) {
            return LineKind::Unrecognized;
        }
        let value = unquote(value.trim()).trim();
        if value.contains('"') {
            return LineKind::Unrecognized;
        }
        return LineKind::Property { key, value };
    }

    LineKind::Unrecognized
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PendingItem {
    id: String,
    record: StateRecord,
    properties: usize,
}

#[derive(Debug, Default)]
struct Reader {
    state: SyncState,
    section: Option<Section>,
    item: Option<PendingItem>,
    skipped: usize,
}

impl Reader {
    fn feed(&mut self, line: &str) {
        match classify_line(line) {
            LineKind::Blank => {}
            LineKind::Section(section) => {
                self.flush();
                self.section = Some(section);
            }
            LineKind::TopLevel { key, value } => {
                self.flush();
                self.section = None;
                self.capture_header(key, value);
            }
            LineKind::ItemHeader(id) => {
                self.flush();
                if self.section.is_some() {
                    self.item = Some(PendingItem {
                        id: id.to_owned(),
                        record: StateRecord::default(),
                        properties: 0,
                    });
                }
            }
            LineKind::Property { key, value } => match self.item.as_mut() {
                Some(item) => {
                    item.properties += 1;
                    if !item.record.set(key, value) {
                        tracing::debug!("ignoring unknown property '{key}' on '{}'", item.id);
                    }
                }
                None => self.skipped += 1,
            },
            LineKind::Unrecognized => self.skipped += 1,
        }
    }

    fn capture_header(&mut self, key: &str, value: &str) {
        let slot = match key {
            "projectName" => &mut self.state.header.project_name,
            "iterationRootPath" => &mut self.state.header.iteration_root_path,
            "lastFullSync" => &mut self.state.header.last_full_sync,
            _ => return,
        };
        *slot = non_empty(value);
    }

    /// Move the pending item, if any, into its section.
    fn flush(&mut self) {
        let Some(item) = self.item.take() else {
            return;
        };
        let Some(section) = self.section else {
            return;
        };
        if item.properties == 0 {
            tracing::debug!("dropping '{}' in {}: no properties", item.id, section.key());
            return;
        }
        self.state.section_mut(section).insert(item.id, item.record);
    }

    fn finish(mut self) -> SyncState {
        self.flush();
        if self.skipped > 0 {
            tracing::debug!("skipped {} unrecognized state line(s)", self.skipped);
        }
        self.state
    }
}

/// State document name used when a caller does not name one.
pub const DEFAULT_STATE_FILE: &str = "devops-sync.yaml";

/// Parse state document text. Lines matching no pattern are skipped.
pub fn parse_state(contents: &str) -> SyncState {
    let mut reader = Reader::default();
    for line in contents.lines() {
        reader.feed(line);
    }
    reader.finish()
}

/// Load the state document at `path`.
///
/// `None`, an empty path, or an unreadable file all yield an empty state.
pub fn load_state(path: Option<&Path>) -> SyncState {
    let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
        return SyncState::default();
    };
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_state(&contents),
        Err(err) => {
            tracing::debug!("no prior state at {}: {err}", path.display());
            SyncState::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
