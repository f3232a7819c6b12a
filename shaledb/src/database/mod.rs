// The database variant: a container whose entry payloads are table
// descriptors (identifier, name, path) -- a table of tables.

use crate::commit::CommitService;
use crate::container::{parse_entries, parse_timestamp, Container, Entry};
use crate::error::{Result, ShaleDbError};
use crate::files;
use crate::table::{Table, TableBuilder};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A named collection of table descriptors backed by one JSON document.
#[derive(Debug, Clone)]
pub struct Database {
    container: Container,
}

impl Database {
    /// A fresh database with defaults for everything but the name. The
    /// backing file is `<name>.json` in the current directory.
    pub fn create_default(name: impl Into<String>) -> Self {
        let name = name.into();
        let path = PathBuf::from(format!("{name}.json"));
        Database {
            container: Container::new(name, path),
        }
    }

    pub(crate) fn from_container(container: Container) -> Self {
        Database { container }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    // ── Entry API (mirrors the container) ───────────────────────────

    pub fn insert(&mut self, entry: Entry) -> u64 {
        self.container.insert(entry)
    }

    pub fn insert_bulk(&mut self, entries: Vec<Entry>) -> Vec<u64> {
        self.container.insert_bulk(entries)
    }

    pub fn get(&self, identifier: &str) -> Result<&Entry> {
        self.container.get(identifier)
    }

    pub fn get_bulk(&self, identifiers: &[&str]) -> Result<Vec<&Entry>> {
        self.container.get_bulk(identifiers)
    }

    pub fn update(&mut self, entry: &Entry, identifier: &str) -> Result<bool> {
        self.container.update(entry, identifier)
    }

    pub fn update_bulk(&mut self, entries: &[Entry], identifiers: &[&str]) -> Result<bool> {
        self.container.update_bulk(entries, identifiers)
    }

    pub fn remove(&mut self, identifier: &str) -> bool {
        self.container.remove(identifier)
    }

    pub fn remove_bulk(&mut self, identifiers: &[&str]) -> bool {
        self.container.remove_bulk(identifiers)
    }

    pub fn all(&self) -> Vec<&Entry> {
        self.container.all()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.container.keys()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.container.contains(identifier)
    }

    pub fn total(&self) -> usize {
        self.container.total()
    }

    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.container.set_metadata(key, value)
    }

    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.container.get_metadata(key)
    }

    pub fn identifier(&self) -> &str {
        self.container.identifier()
    }

    pub fn name(&self) -> &str {
        self.container.name()
    }

    pub fn path(&self) -> &Path {
        self.container.path()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.container.created_at()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.container.updated_at()
    }

    pub fn to_snapshot(&self) -> Value {
        self.container.to_snapshot()
    }

    pub fn commit(&self, commits: &CommitService) -> Result<()> {
        commits.commit(&self.to_snapshot())
    }

    // ── Table registry ──────────────────────────────────────────────

    fn descriptor(table: &Table) -> Entry {
        let mut entry = Entry::new();
        entry.insert(
            "identifier".to_string(),
            Value::String(table.identifier().to_string()),
        );
        entry.insert("name".to_string(), Value::String(table.name().to_string()));
        entry.insert(
            "path".to_string(),
            Value::String(table.path().to_string_lossy().into_owned()),
        );
        entry
    }

    /// Register a table's descriptor as an entry. Returns the entry id.
    pub fn add_table(&mut self, table: &Table) -> u64 {
        self.container.insert(Self::descriptor(table))
    }

    /// Register several tables under one shared timestamp.
    pub fn add_tables(&mut self, tables: &[Table]) -> Vec<u64> {
        self.container
            .insert_bulk(tables.iter().map(Self::descriptor).collect())
    }

    /// Build a new table, register its descriptor, and hand it back. The
    /// table's file defaults to `<name>.json` next to this database's file.
    pub fn create_table(&mut self, name: impl Into<String>) -> Result<Table> {
        let name = name.into();
        let directory = self
            .container
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let table = TableBuilder::new()
            .with_name(&name)
            .with_path(directory)
            .with_database(self.name())
            .build()?;

        self.add_table(&table);
        Ok(table)
    }

    fn rebuild_table(&self, descriptor: &Entry) -> Result<Table> {
        let mut builder = TableBuilder::new().with_database(self.name());
        if let Some(name) = descriptor.get("name").and_then(Value::as_str) {
            builder = builder.with_name(name);
        }
        if let Some(id) = descriptor.get("identifier").and_then(Value::as_str) {
            builder = builder.with_identifier(id);
        }
        if let Some(path) = descriptor.get("path").and_then(Value::as_str) {
            builder = builder.with_path(path);
        }
        builder.build()
    }

    /// Find a registered table by its uuid identifier (not the entry id).
    pub fn get_table(&self, identifier: &str) -> Result<Table> {
        let descriptor = self
            .container
            .all()
            .into_iter()
            .find(|entry| entry.get("identifier").and_then(Value::as_str) == Some(identifier))
            .ok_or_else(|| ShaleDbError::not_found(identifier))?;

        self.rebuild_table(descriptor)
    }

    /// Find several registered tables. Missing identifiers are aggregated
    /// into one error; no partial results.
    pub fn get_tables(&self, identifiers: &[&str]) -> Result<Vec<Table>> {
        let mut tables = Vec::with_capacity(identifiers.len());
        let mut missing = Vec::new();

        for id in identifiers {
            match self.get_table(id) {
                Ok(table) => tables.push(table),
                Err(ShaleDbError::NotFound { .. }) => missing.push((*id).to_string()),
                Err(other) => return Err(other),
            }
        }

        if !missing.is_empty() {
            return Err(ShaleDbError::NotFound {
                identifiers: missing,
            });
        }
        Ok(tables)
    }
}

/// Step-by-step construction of a [`Database`], supplying defaults for
/// everything except the name.
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    name: Option<String>,
    path: Option<PathBuf>,
    identifier: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    metadata: Map<String, Value>,
    entries: BTreeMap<String, Entry>,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        DatabaseBuilder::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// A directory (the file becomes `<dir>/<name>.json`) or a full `.json`
    /// file path, which is used verbatim.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Seed entries, assigned sequential identifiers in order.
    pub fn with_entries(mut self, entries: Vec<Entry>) -> Self {
        for entry in entries {
            let id = self.entries.len().to_string();
            self.entries.insert(id, entry);
        }
        self
    }

    pub(crate) fn into_container(self) -> Result<Container> {
        let name = self
            .name
            .ok_or_else(|| ShaleDbError::Builder("a name is required".to_string()))?;

        let path = resolve_document_path(self.path, &name);
        let identifier = self
            .identifier
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let now = Utc::now();

        Ok(Container::from_parts(
            identifier,
            name,
            path,
            self.created_at.unwrap_or(now),
            self.updated_at.unwrap_or(now),
            self.metadata,
            self.entries,
        ))
    }

    pub fn build(self) -> Result<Database> {
        Ok(Database::from_container(self.into_container()?))
    }
}

/// Compose the backing file path: a `.json` path is taken verbatim, anything
/// else is treated as a directory holding `<name>.json`.
pub(crate) fn resolve_document_path(path: Option<PathBuf>, name: &str) -> PathBuf {
    match path {
        Some(p) if p.extension().is_some_and(|ext| ext == "json") => p,
        Some(dir) => dir.join(format!("{name}.json")),
        None => PathBuf::from(format!("{name}.json")),
    }
}

/// Loads a database from its backing JSON document.
pub struct DatabaseLoader;

impl DatabaseLoader {
    pub fn load(path: &Path) -> Result<Database> {
        if !path.exists() {
            return Err(ShaleDbError::FileMissing(path.to_path_buf()));
        }

        let content = files::read_or_empty(path);
        let document: Value = serde_json::from_str(&content)?;
        let now = Utc::now();

        let container = Container::from_parts(
            document
                .get("identifier")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
            document
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            document
                .get("path")
                .and_then(Value::as_str)
                .map(PathBuf::from)
                .unwrap_or_else(|| path.to_path_buf()),
            parse_timestamp(document.get("created_at")).unwrap_or(now),
            parse_timestamp(document.get("updated_at")).unwrap_or(now),
            document
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            parse_entries(&document),
        );

        Ok(Database::from_container(container))
    }
}
