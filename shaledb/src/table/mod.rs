// The table variant: a container plus a field definition map and a back
// reference to the owning database's name. The definition is declarative
// only; entries are not checked against it on insert.

use crate::commit::CommitService;
use crate::container::{parse_entries, parse_timestamp, Container, Entry};
use crate::database::resolve_document_path;
use crate::error::{Result, ShaleDbError};
use crate::field::Field;
use crate::files;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A named collection of entries with an attached field definition, backed
/// by one JSON document.
#[derive(Debug, Clone)]
pub struct Table {
    container: Container,
    database: String,
    definition: Map<String, Value>,
}

impl Table {
    /// A fresh table with defaults for everything but the name. The backing
    /// file is `<name>.json` in the current directory.
    pub fn create_default(name: impl Into<String>) -> Self {
        let name = name.into();
        let path = PathBuf::from(format!("{name}.json"));
        Table {
            container: Container::new(name, path),
            database: String::new(),
            definition: Map::new(),
        }
    }

    fn from_parts(container: Container, database: String, definition: Map<String, Value>) -> Self {
        Table {
            container,
            database,
            definition,
        }
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

    /// Point this table at a different backing file.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.container.set_path(path.into());
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.container.created_at()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.container.updated_at()
    }

    // ── Definition ──────────────────────────────────────────────────

    /// The owning database's name; empty for a standalone table.
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn set_database(&mut self, database: impl Into<String>) {
        self.database = database.into();
    }

    /// Record a field declaration in the definition, keyed by field name.
    pub fn set_field(&mut self, field: &Field) {
        self.definition
            .insert(field.name().to_string(), field.to_value());
    }

    /// Rebuild a field declaration out of the definition.
    pub fn field(&self, name: &str) -> Result<Field> {
        let declared = self
            .definition
            .get(name)
            .ok_or_else(|| ShaleDbError::not_found(name))?;
        Field::from_value(declared)
    }

    pub fn definition(&self) -> &Map<String, Value> {
        &self.definition
    }

    // ── Snapshot & commit ───────────────────────────────────────────

    /// The container's snapshot with the table-only keys added on top.
    pub fn to_snapshot(&self) -> Value {
        let mut snapshot = self.container.to_snapshot();
        if let Some(map) = snapshot.as_object_mut() {
            map.insert(
                "database".to_string(),
                Value::String(self.database.clone()),
            );
            map.insert(
                "definition".to_string(),
                Value::Object(self.definition.clone()),
            );
        }
        snapshot
    }

    pub fn commit(&self, commits: &CommitService) -> Result<()> {
        commits.commit(&self.to_snapshot())
    }
}

/// Step-by-step construction of a [`Table`], supplying defaults for
/// everything except the name.
#[derive(Debug, Default)]
pub struct TableBuilder {
    name: Option<String>,
    path: Option<PathBuf>,
    identifier: Option<String>,
    database: Option<String>,
    definition: Map<String, Value>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    metadata: Map<String, Value>,
    entries: BTreeMap<String, Entry>,
}

impl TableBuilder {
    pub fn new() -> Self {
        TableBuilder::default()
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

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_definition(mut self, definition: Map<String, Value>) -> Self {
        self.definition = definition;
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

    pub fn build(self) -> Result<Table> {
        let name = self
            .name
            .ok_or_else(|| ShaleDbError::Builder("a name is required".to_string()))?;

        let path = resolve_document_path(self.path, &name);
        let identifier = self
            .identifier
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let now = Utc::now();

        let container = Container::from_parts(
            identifier,
            name,
            path,
            self.created_at.unwrap_or(now),
            self.updated_at.unwrap_or(now),
            self.metadata,
            self.entries,
        );

        Ok(Table::from_parts(
            container,
            self.database.unwrap_or_default(),
            self.definition,
        ))
    }
}

/// Loads a table from its backing JSON document.
pub struct TableLoader;

impl TableLoader {
    pub fn load(path: &Path) -> Result<Table> {
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

        Ok(Table::from_parts(
            container,
            document
                .get("database")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            document
                .get("definition")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(pairs: Value) -> Entry {
        pairs.as_object().unwrap().clone()
    }

    #[test]
    fn test_builder_requires_name() {
        assert!(TableBuilder::new().build().is_err());
    }

    #[test]
    fn test_builder_composes_path_and_back_reference() {
        let table = TableBuilder::new()
            .with_name("users")
            .with_path("/data")
            .with_database("main")
            .build()
            .unwrap();
        assert_eq!(table.path(), Path::new("/data/users.json"));
        assert_eq!(table.database(), "main");
    }

    #[test]
    fn test_create_default() {
        let table = Table::create_default("users");
        assert_eq!(table.name(), "users");
        assert_eq!(table.path(), Path::new("users.json"));
        assert_eq!(table.database(), "");
        assert!(table.definition().is_empty());
    }

    #[test]
    fn test_set_path() {
        let mut table = Table::create_default("users");
        table.set_path("/elsewhere/users.json");
        assert_eq!(table.path(), Path::new("/elsewhere/users.json"));
    }

    #[test]
    fn test_field_declaration_round_trip() {
        let mut table = Table::create_default("users");
        let mut email = Field::new("email", FieldType::String, Value::Null, true).unwrap();
        email.set(json!("a@b.c")).unwrap();
        table.set_field(&email);

        let restored = table.field("email").unwrap();
        assert_eq!(restored.name(), "email");
        assert_eq!(restored.field_type(), FieldType::String);
        assert_eq!(restored.get(), &json!("a@b.c"));

        assert!(table.field("missing").is_err());
    }

    #[test]
    fn test_snapshot_carries_table_keys() {
        let mut table = TableBuilder::new()
            .with_name("users")
            .with_database("main")
            .build()
            .unwrap();
        let age = Field::new("age", FieldType::Integer, Value::Null, true).unwrap();
        table.set_field(&age);
        table.insert(entry(json!({"age": 30})));

        let snapshot = table.to_snapshot();
        assert_eq!(snapshot["database"], json!("main"));
        assert_eq!(snapshot["definition"]["age"]["type"], json!("integer"));
        assert_eq!(snapshot["entries"]["total"], json!(1));
    }

    #[test]
    fn test_loader_missing_path() {
        let err = TableLoader::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ShaleDbError::FileMissing(_)));
    }

    #[test]
    fn test_commit_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut table = TableBuilder::new()
            .with_name("users")
            .with_path(tmp.path())
            .with_database("main")
            .build()
            .unwrap();
        let email = Field::new("email", FieldType::String, Value::Null, true).unwrap();
        table.set_field(&email);
        table.insert(entry(json!({"email": "a@b.c"})));
        table.insert(entry(json!({"email": "d@e.f"})));

        let commits = CommitService::new();
        table.commit(&commits).unwrap();

        let loaded = TableLoader::load(table.path()).unwrap();
        assert_eq!(loaded.name(), "users");
        assert_eq!(loaded.database(), "main");
        assert_eq!(loaded.identifier(), table.identifier());
        assert_eq!(loaded.total(), 2);
        assert_eq!(loaded.get("0").unwrap()["email"], json!("a@b.c"));
        assert_eq!(
            loaded.field("email").unwrap().field_type(),
            FieldType::String
        );
    }

    #[test]
    fn test_loaded_table_resumes_id_counter() {
        let tmp = TempDir::new().unwrap();
        let mut table = TableBuilder::new()
            .with_name("seq")
            .with_path(tmp.path())
            .build()
            .unwrap();
        table.insert(entry(json!({"n": 0})));
        table.insert(entry(json!({"n": 1})));
        table.commit(&CommitService::new()).unwrap();

        let mut loaded = TableLoader::load(table.path()).unwrap();
        let id = loaded.insert(entry(json!({"n": 2})));
        assert_eq!(id, 2);
    }
}
