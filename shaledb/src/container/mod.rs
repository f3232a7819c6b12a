// The shared entry store behind both the database and table variants: an
// ordered mapping from decimal-string identifier to schemaless entry, with
// count and timestamp bookkeeping. No constraint validation happens here;
// callers compose the field/constraint layer before inserting.

use crate::commit::CommitService;
use crate::error::{Result, ShaleDbError};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One schemaless record: named values keyed by field name.
pub type Entry = Map<String, Value>;

/// System field stamped on every entry at insertion, never mutated after.
pub const ADDED_AT: &str = "_added_at";

/// The core mutable collection: identity, timestamps, open metadata, and the
/// entry map. Entry identifiers are monotonically increasing decimal strings
/// and are never reused within the lifetime of one container instance, even
/// after removals.
#[derive(Debug, Clone)]
pub struct Container {
    identifier: String,
    name: String,
    path: PathBuf,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    metadata: Map<String, Value>,
    entries: BTreeMap<String, Entry>,
    next_id: u64,
}

impl Container {
    /// Assemble a container from explicit parts. The id counter resumes past
    /// the highest numeric identifier already present, so loaded containers
    /// keep the never-reuse guarantee.
    pub fn from_parts(
        identifier: String,
        name: String,
        path: PathBuf,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        metadata: Map<String, Value>,
        entries: BTreeMap<String, Entry>,
    ) -> Self {
        let next_id = entries
            .keys()
            .filter_map(|k| k.parse::<u64>().ok())
            .map(|n| n + 1)
            .max()
            .unwrap_or(0)
            .max(entries.len() as u64);

        Container {
            identifier,
            name,
            path,
            created_at,
            updated_at,
            metadata,
            entries,
            next_id,
        }
    }

    /// A fresh, empty container with a generated identifier.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Container::from_parts(
            uuid::Uuid::new_v4().simple().to_string(),
            name.into(),
            path.into(),
            now,
            now,
            Map::new(),
            BTreeMap::new(),
        )
    }

    // ── Identity & timestamps ───────────────────────────────────────

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path reassignment is exposed publicly only on the table variant.
    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ── Entry operations ────────────────────────────────────────────

    /// Insert an entry under the next sequential identifier, stamping
    /// `_added_at`. Returns the assigned identifier as an integer.
    pub fn insert(&mut self, entry: Entry) -> u64 {
        self.insert_at(entry, Utc::now(), false)
    }

    fn insert_at(&mut self, mut entry: Entry, timestamp: DateTime<Utc>, bulk: bool) -> u64 {
        let id = self.next_id;
        entry.insert(
            ADDED_AT.to_string(),
            Value::String(timestamp.to_rfc3339()),
        );
        self.entries.insert(id.to_string(), entry);
        self.next_id += 1;
        if !bulk {
            self.updated_at = timestamp;
        }
        id
    }

    /// Insert a batch of entries under one shared timestamp. `updated_at`
    /// advances once at the end. Not atomic across entries.
    pub fn insert_bulk(&mut self, entries: Vec<Entry>) -> Vec<u64> {
        let timestamp = Utc::now();
        let ids = entries
            .into_iter()
            .map(|entry| self.insert_at(entry, timestamp, true))
            .collect();
        self.updated_at = timestamp;
        ids
    }

    pub fn get(&self, identifier: &str) -> Result<&Entry> {
        self.entries
            .get(identifier)
            .ok_or_else(|| ShaleDbError::not_found(identifier))
    }

    /// Look up a batch of identifiers. Every missing identifier is collected
    /// into one aggregate error; no partial results are returned.
    pub fn get_bulk(&self, identifiers: &[&str]) -> Result<Vec<&Entry>> {
        let mut found = Vec::with_capacity(identifiers.len());
        let mut missing = Vec::new();

        for id in identifiers {
            match self.entries.get(*id) {
                Some(entry) => found.push(entry),
                None => missing.push((*id).to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(ShaleDbError::NotFound {
                identifiers: missing,
            });
        }
        Ok(found)
    }

    /// Merge a partial entry into the stored entry, field by field. Fields
    /// present in `entry` overwrite; the rest of the record is untouched.
    pub fn update(&mut self, entry: &Entry, identifier: &str) -> Result<bool> {
        self.update_at(entry, identifier, Utc::now(), false)
    }

    fn update_at(
        &mut self,
        entry: &Entry,
        identifier: &str,
        timestamp: DateTime<Utc>,
        bulk: bool,
    ) -> Result<bool> {
        let stored = self
            .entries
            .get_mut(identifier)
            .ok_or_else(|| ShaleDbError::not_found(identifier))?;

        for (key, value) in entry {
            stored.insert(key.clone(), value.clone());
        }
        if !bulk {
            self.updated_at = timestamp;
        }
        Ok(true)
    }

    /// Update entries pairwise with identifiers (positional zip; the shorter
    /// side truncates the pairing). All not-found failures are aggregated
    /// into one error. Returns true only if every update succeeded.
    pub fn update_bulk(&mut self, entries: &[Entry], identifiers: &[&str]) -> Result<bool> {
        let timestamp = Utc::now();
        let mut missing = Vec::new();
        let mut all_ok = true;

        for (entry, id) in entries.iter().zip(identifiers) {
            match self.update_at(entry, id, timestamp, true) {
                Ok(ok) => all_ok &= ok,
                Err(ShaleDbError::NotFound { identifiers }) => missing.extend(identifiers),
                Err(other) => return Err(other),
            }
        }

        if !missing.is_empty() {
            return Err(ShaleDbError::NotFound {
                identifiers: missing,
            });
        }
        self.updated_at = timestamp;
        Ok(all_ok)
    }

    /// Remove an entry. Returns true if something was removed. Removal never
    /// disturbs the identifier counter, so removed ids are not reassigned.
    pub fn remove(&mut self, identifier: &str) -> bool {
        self.remove_at(identifier, Utc::now(), false)
    }

    fn remove_at(&mut self, identifier: &str, timestamp: DateTime<Utc>, bulk: bool) -> bool {
        let removed = self.entries.remove(identifier).is_some();
        if !bulk {
            self.updated_at = timestamp;
        }
        removed
    }

    /// Remove a batch of identifiers under one shared timestamp. Returns the
    /// conjunction of the individual results; a missing identifier yields
    /// false for the batch rather than an error.
    pub fn remove_bulk(&mut self, identifiers: &[&str]) -> bool {
        let timestamp = Utc::now();
        let mut all_removed = true;
        for id in identifiers {
            all_removed &= self.remove_at(id, timestamp, true);
        }
        self.updated_at = timestamp;
        all_removed
    }

    // ── Projections ─────────────────────────────────────────────────

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn all(&self) -> Vec<&Entry> {
        self.entries.values().collect()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The element count. Always equals the number of stored entries.
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn size(&self) -> usize {
        self.total()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Metadata ────────────────────────────────────────────────────

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn get_metadata_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.metadata.get(key).unwrap_or(default)
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    // ── Snapshot & commit ───────────────────────────────────────────

    /// Canonical serializable snapshot of this container. Variants may add
    /// their own top-level keys on top of this base form.
    pub fn to_snapshot(&self) -> Value {
        let mut values = Map::new();
        for (id, entry) in &self.entries {
            values.insert(id.clone(), Value::Object(entry.clone()));
        }

        serde_json::json!({
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
            "identifier": self.identifier,
            "name": self.name,
            "path": self.path.to_string_lossy(),
            "metadata": Value::Object(self.metadata.clone()),
            "entries": {
                "total": self.total(),
                "values": Value::Object(values),
            },
        })
    }

    /// Durably write this container's snapshot through the commit service.
    pub fn commit(&self, commits: &CommitService) -> Result<()> {
        commits.commit(&self.to_snapshot())
    }
}

/// Parse an optional RFC 3339 timestamp out of a loaded document.
pub(crate) fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Pull the `entries.values` map out of a loaded document.
pub(crate) fn parse_entries(document: &Value) -> BTreeMap<String, Entry> {
    let mut entries = BTreeMap::new();
    if let Some(values) = document
        .get("entries")
        .and_then(|e| e.get("values"))
        .and_then(Value::as_object)
    {
        for (id, entry) in values {
            if let Value::Object(map) = entry {
                entries.insert(id.clone(), map.clone());
            }
        }
    }
    entries
}
