//! Filesystem helpers shared by the stages.

use crate::error::ArchiveError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn ensure_directory(path: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(path).map_err(|e| ArchiveError::io(path, e))
}

/// Fail unless `path` is an existing directory. Stages call this on their
/// input root so a mistyped path is fatal instead of an empty, clean run.
pub fn require_directory(path: &Path) -> Result<(), ArchiveError> {
    let meta = fs::metadata(path).map_err(|e| ArchiveError::io(path, e))?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(ArchiveError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        ))
    }
}

/// Serialise `value` as pretty JSON and write it atomically: temp file, then
/// rename, so a crash never leaves a half-written record behind.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), ArchiveError> {
    let mut data = serde_json::to_vec_pretty(value).map_err(|source| ArchiveError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    data.push(b'\n');
    write_atomic(path, &data)
}

pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ArchiveError> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data).map_err(|e| ArchiveError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| ArchiveError::io(path, e))
}

/// Every regular file under `root` (recursive) whose extension matches `ext`
/// case-insensitively, sorted by path.
///
/// A missing root yields an empty list; the caller decides whether that is
/// an error.
pub fn find_files(root: &Path, ext: &str) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_extension(path, ext))
        .collect();
    paths.sort();
    paths
}

/// Regular files directly inside `dir` with extension `ext`, sorted by name.
pub fn list_dir(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, ArchiveError> {
    let entries = fs::read_dir(dir).map_err(|e| ArchiveError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ArchiveError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && has_extension(&path, ext) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
