//! State document load/save with schema + invariant validation.
//!
//! The store exposes the document as a list of entries: one per record in
//! the full-control shape, or a single entry covering every output in the
//! shared shape. Entries are addressed by [`EntryId`].
//!
//! Saving writes back the JSON that was loaded, with `brightness` and
//! `gamma` replaced only on entries whose levels changed. Key order,
//! number spelling, and unknown fields of everything else come out as
//! they went in.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use jsonschema::validator_for;
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::invariants::validate_invariants;
use crate::core::types::{Deltas, Levels, StateDocument};
use crate::error::{ControlError, Result};

const STATE_SCHEMA: &str = include_str!("../../schemas/state.schema.json");

/// Index of one entry in a loaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub usize);

/// In-memory copy of the state document bound to its path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    document: StateDocument,
    /// The document as loaded; the source of truth for `save`.
    raw: Value,
}

impl StateStore {
    /// Read, schema-check, parse, and invariant-check the document at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading state");
        let contents = fs::read_to_string(path).map_err(|source| ControlError::StateUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let (raw, document) = parse_document(&contents).map_err(|reason| malformed(path, reason))?;
        let store = Self::checked(path, document, raw)?;
        debug!(entries = store.len(), "state loaded");
        Ok(store)
    }

    /// Wrap an already-parsed document, checking invariants.
    pub fn from_document(path: &Path, document: StateDocument) -> Result<Self> {
        let raw = serde_json::to_value(&document)
            .map_err(|err| malformed(path, format!("serialize: {}", err)))?;
        Self::checked(path, document, raw)
    }

    fn checked(path: &Path, document: StateDocument, raw: Value) -> Result<Self> {
        let errors = validate_invariants(&document);
        if !errors.is_empty() {
            return Err(malformed(
                path,
                format!("invariants failed: {}", errors.join("; ")),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            document,
            raw,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &StateDocument {
        &self.document
    }

    pub fn len(&self) -> usize {
        match &self.document {
            StateDocument::Outputs(records) => records.len(),
            StateDocument::Shared(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry, in document order.
    pub fn entry_ids(&self) -> Vec<EntryId> {
        (0..self.len()).map(EntryId).collect()
    }

    /// Find the entry whose output name or alias is `identifier`.
    pub fn resolve(&self, identifier: &str) -> Result<EntryId> {
        let found = match &self.document {
            StateDocument::Outputs(records) => records.iter().position(|r| r.matches(identifier)),
            StateDocument::Shared(shared) => shared
                .outputs
                .iter()
                .any(|output| output == identifier)
                .then_some(0),
        };
        found
            .map(EntryId)
            .ok_or_else(|| ControlError::UnknownOutput(identifier.to_string()))
    }

    /// Output names driven by `id`.
    pub fn outputs(&self, id: EntryId) -> Vec<&str> {
        match &self.document {
            StateDocument::Outputs(records) => vec![records[id.0].output.as_str()],
            StateDocument::Shared(shared) => shared.outputs.iter().map(String::as_str).collect(),
        }
    }

    /// Name used for `id` in reports and logs.
    pub fn label(&self, id: EntryId) -> String {
        self.outputs(id).join(",")
    }

    pub fn levels(&self, id: EntryId) -> Levels {
        match &self.document {
            StateDocument::Outputs(records) => records[id.0].levels(),
            StateDocument::Shared(shared) => shared.levels(),
        }
    }

    pub fn deltas(&self, id: EntryId, defaults: &Deltas) -> Deltas {
        match &self.document {
            StateDocument::Outputs(records) => records[id.0].deltas(defaults),
            StateDocument::Shared(shared) => shared.deltas(defaults),
        }
    }

    /// Record new levels for `id`. Equal levels leave the entry untouched.
    pub fn set_levels(&mut self, id: EntryId, levels: Levels) {
        if self.levels(id) == levels {
            return;
        }
        let entry = match &mut self.document {
            StateDocument::Outputs(records) => {
                records[id.0].set_levels(levels);
                self.raw.get_mut(id.0)
            }
            StateDocument::Shared(shared) => {
                shared.set_levels(levels);
                Some(&mut self.raw)
            }
        };
        if let Some(Value::Object(fields)) = entry {
            // Existing keys keep their position.
            fields.insert("brightness".to_string(), json!(levels.brightness));
            fields.insert("gamma".to_string(), json!(levels.gamma));
        }
    }

    /// Atomically write the document back (temp file + rename).
    pub fn save(&self) -> Result<()> {
        debug!(path = %self.path.display(), entries = self.len(), "writing state");
        let persist = || -> anyhow::Result<()> {
            let mut buf = serde_json::to_string_pretty(&self.raw).context("serialize state")?;
            buf.push('\n');
            write_atomic(&self.path, &buf)
        };
        persist().map_err(|source| ControlError::PersistFailure {
            path: self.path.clone(),
            source,
        })
    }
}

/// Levels stored for `output` in another state document.
pub fn load_preset(path: &Path, output: &str) -> Result<Levels> {
    let unavailable = |reason: String| ControlError::PresetUnavailable {
        path: path.to_path_buf(),
        output: output.to_string(),
        reason,
    };
    let contents = fs::read_to_string(path).map_err(|err| unavailable(err.to_string()))?;
    let (_, document) = parse_document(&contents).map_err(unavailable)?;
    let levels = match &document {
        StateDocument::Outputs(records) => records
            .iter()
            .find(|record| record.output == output)
            .map(|record| record.levels()),
        StateDocument::Shared(shared) => shared
            .outputs
            .iter()
            .any(|name| name == output)
            .then(|| shared.levels()),
    };
    levels.ok_or_else(|| unavailable("no values for this output".to_string()))
}

/// Parse `contents` into the raw JSON and its typed view.
fn parse_document(contents: &str) -> std::result::Result<(Value, StateDocument), String> {
    let value: Value =
        serde_json::from_str(contents).map_err(|err| format!("parse json: {}", err))?;
    validate_schema(&value)?;
    let document = StateDocument::deserialize(&value).map_err(|err| format!("deserialize: {}", err))?;
    Ok((value, document))
}

fn validate_schema(instance: &Value) -> std::result::Result<(), String> {
    let schema: Value =
        serde_json::from_str(STATE_SCHEMA).map_err(|err| format!("parse schema: {}", err))?;
    let compiled = validator_for(&schema).map_err(|err| format!("invalid schema: {}", err))?;
    if compiled.is_valid(instance) {
        return Ok(());
    }
    let messages = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    Err(format!("schema validation failed: {}", messages.join("; ")))
}

fn malformed(path: &Path, reason: String) -> ControlError {
    ControlError::MalformedState {
        path: path.to_path_buf(),
        reason,
    }
}

fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    // Unique per writer; dropped (and removed) if anything below fails.
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp state in {}", parent.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("write temp state {}", tmp.path().display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("sync temp state {}", tmp.path().display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replace state {}", path.display()))?;
    Ok(())
}
