// The durability layer: serialize a container snapshot, reconcile it with
// whatever is on disk, and replace the target file crash-safely.
//
// One service instance is constructed explicitly and passed to callers;
// commits from two processes racing on the same path are out of scope. The
// leaf-level merge is the only mitigation for lost updates across processes.

use crate::error::{Result, ShaleDbError};
use crate::files;
use serde_json::Value;
use std::path::Path;

/// Commits container snapshots to their backing files.
#[derive(Debug, Default)]
pub struct CommitService;

impl CommitService {
    pub fn new() -> Self {
        CommitService
    }

    /// Commit a snapshot to the path recorded inside it.
    ///
    /// A missing or empty target file is "no prior state": the snapshot is
    /// written as-is. Otherwise the prior document is deserialized and the
    /// snapshot is deep-merged into it before a write-temp-then-rename
    /// replace, so keys untouched by this snapshot survive concurrent
    /// external edits. Any failure is logged with the document name and
    /// re-raised as a commit error; in-memory state is never altered.
    pub fn commit(&self, snapshot: &Value) -> Result<()> {
        let name = snapshot
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();

        match self.write_snapshot(snapshot) {
            Ok(()) => {
                log::info!("committed '{name}' successfully");
                Ok(())
            }
            Err(e) => {
                log::error!("failed to commit '{name}': {e}");
                Err(ShaleDbError::Commit {
                    name,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn write_snapshot(&self, snapshot: &Value) -> Result<()> {
        let path = snapshot
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ShaleDbError::Builder("snapshot is missing 'path'".to_string()))?;
        let path = Path::new(path);

        let existing = files::read_or_empty(path);
        if existing.is_empty() {
            // No prior state, nothing to reconcile.
            let serialized = serde_json::to_string_pretty(snapshot)?;
            return files::write(path, &serialized);
        }

        let old: Value = serde_json::from_str(&existing)?;
        let merged = merge_values(snapshot, &old);
        let serialized = serde_json::to_string_pretty(&merged)?;
        files::replace_atomic(path, &serialized)
    }
}

/// Deep-merge `new` into `old`, leaf-level last-committer-wins: for each key
/// in `new`, an absent-or-null prior value is replaced; two objects merge
/// recursively; anything else (scalar over scalar, sequence over sequence)
/// is overwritten outright. Keys only present in `old` are preserved.
pub fn merge_values(new: &Value, old: &Value) -> Value {
    match (new, old) {
        (Value::Object(new_map), Value::Object(old_map)) => {
            let mut result = old_map.clone();
            for (key, new_value) in new_map {
                let merged = match result.get(key) {
                    None | Some(Value::Null) => new_value.clone(),
                    Some(old_value) if new_value.is_object() && old_value.is_object() => {
                        merge_values(new_value, old_value)
                    }
                    Some(_) => new_value.clone(),
                };
                result.insert(key.clone(), merged);
            }
            Value::Object(result)
        }
        _ => new.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_merge_new_scalar_wins() {
        let merged = merge_values(&json!({"a": 2}), &json!({"a": 1}));
        assert_eq!(merged, json!({"a": 2}));
    }

    #[test]
    fn test_merge_preserves_untouched_keys() {
        let merged = merge_values(&json!({"a": 2}), &json!({"a": 1, "b": "kept"}));
        assert_eq!(merged, json!({"a": 2, "b": "kept"}));
    }

    #[test]
    fn test_merge_recurses_into_objects() {
        let old = json!({"entries": {"values": {"0": {"a": 1}}}});
        let new = json!({"entries": {"values": {"1": {"b": 2}}}});
        let merged = merge_values(&new, &old);
        assert_eq!(
            merged,
            json!({"entries": {"values": {"0": {"a": 1}, "1": {"b": 2}}}})
        );
    }

    #[test]
    fn test_merge_null_prior_takes_new() {
        let merged = merge_values(&json!({"a": {"x": 1}}), &json!({"a": null}));
        assert_eq!(merged, json!({"a": {"x": 1}}));
    }

    #[test]
    fn test_merge_sequence_overwritten_whole() {
        let merged = merge_values(&json!({"tags": [3]}), &json!({"tags": [1, 2]}));
        assert_eq!(merged, json!({"tags": [3]}));
    }

    #[test]
    fn test_commit_fresh_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fresh.json");
        let snapshot = json!({
            "name": "fresh",
            "path": path.to_string_lossy(),
            "entries": {"total": 0, "values": {}},
        });

        CommitService::new().commit(&snapshot).unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["name"], json!("fresh"));
    }

    #[test]
    fn test_commit_merges_with_prior_state() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.json");
        std::fs::write(
            &path,
            json!({"entries": {"values": {"0": {"a": 1}}}}).to_string(),
        )
        .unwrap();

        let snapshot = json!({
            "name": "doc",
            "path": path.to_string_lossy(),
            "entries": {"values": {"1": {"b": 2}}},
        });
        CommitService::new().commit(&snapshot).unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["entries"]["values"]["0"], json!({"a": 1}));
        assert_eq!(written["entries"]["values"]["1"], json!({"b": 2}));
    }

    #[test]
    fn test_commit_unwritable_path_is_commit_error() {
        let tmp = TempDir::new().unwrap();
        // The target is a directory, so the write must fail.
        let snapshot = json!({
            "name": "broken",
            "path": tmp.path().to_string_lossy(),
        });

        let err = CommitService::new().commit(&snapshot).unwrap_err();
        match err {
            ShaleDbError::Commit { name, .. } => assert_eq!(name, "broken"),
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn test_commit_missing_path_is_commit_error() {
        let err = CommitService::new()
            .commit(&json!({"name": "nopath"}))
            .unwrap_err();
        assert!(matches!(err, ShaleDbError::Commit { .. }));
    }
}
