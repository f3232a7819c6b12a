// Locked file primitives backing the commit protocol.
//
// Every read, write, and rename goes through one process-wide mutex so that
// concurrent tasks within this process never interleave partial file I/O on
// the backing documents. No cross-process lock is taken; the commit layer's
// merge-before-write is the only mitigation across processes.

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

static FILE_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> std::sync::MutexGuard<'static, ()> {
    // A poisoned lock only means another task panicked mid-I/O; the guard
    // itself is still usable.
    FILE_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read a file's contents, returning an empty string for a missing or
/// unreadable file. This is the "no prior state" signal for commits.
pub fn read_or_empty(path: &Path) -> String {
    let _guard = lock();
    std::fs::read_to_string(path).unwrap_or_default()
}

/// Write content to a path, creating parent directories as needed.
pub fn write(path: &Path, content: &str) -> Result<()> {
    let _guard = lock();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Crash-safe replace: write content to a sibling temp path, then atomically
/// rename it over the target. A reader never observes a partially written
/// target; a crash mid-write leaves the original untouched and at worst
/// leaks an orphan temp file.
pub fn replace_atomic(path: &Path, content: &str) -> Result<()> {
    let temp = temp_path(path);
    {
        let _guard = lock();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, path)?;
    }
    Ok(())
}

/// Sibling temp path for atomic replace: `name.json` -> `name_tmp.json`.
pub fn temp_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_tmp.{}", stem, ext.to_string_lossy()),
        None => format!("{stem}_tmp"),
    };
    path.with_file_name(name)
}
