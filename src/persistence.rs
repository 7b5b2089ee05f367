//! Atomic JSON document persistence.
//!
//! Every on-disk document in this crate (`config.json`, `palettes.json`,
//! `playlists.json`, `library.json`) goes through [`load_or_default`] and
//! [`save`]. The write path is temp-file-then-rename, so a crash mid-write
//! never corrupts the previous good copy. A missing file is not an error: it is treated as
//! "defaults", and a malformed file falls back to defaults rather than
//! panicking (logged at `warn`).

use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize JSON: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Loads `path` as JSON, deserializing into `T`. If the file does not exist
/// or fails to parse, returns `default` (a parse failure is logged, a
/// missing file is not).
pub fn load_or_default<T>(path: &Path, default: T) -> T
where
    T: serde::de::DeserializeOwned,
{
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return default,
        Err(e) => {
            log::warn!("failed to read {}: {e}", path.display());
            return default;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("failed to parse {} as JSON, using defaults: {e}", path.display());
            default
        }
    }
}

/// Serializes `value` as pretty JSON and writes it atomically (temp file,
/// then rename over `path`). Creates parent directories if needed.
pub fn save<T>(path: &Path, value: &T) -> Result<(), PersistError>
where
    T: serde::Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PersistError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let bytes = serde_json::to_vec_pretty(value).map_err(PersistError::Serialize)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &bytes).map_err(|e| PersistError::Io {
        path: tmp.display().to_string(),
        source: e,
    })?;
    fs::rename(&tmp, path).map_err(|e| PersistError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Default)]
    struct Doc {
        a: i32,
        b: String,
    }

    #[test]
    fn missing_file_returns_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let v: Doc = load_or_default(&path, Doc { a: 7, b: "x".into() });
        assert_eq!(v, Doc { a: 7, b: "x".into() });
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let doc = Doc { a: 1, b: "hi".into() };
        save(&path, &doc).unwrap();
        let loaded: Doc = load_or_default(&path, Doc::default());
        assert_eq!(loaded, doc);
    }

    #[test]
    fn malformed_file_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"{not json").unwrap();
        let v: Doc = load_or_default(&path, Doc { a: 9, b: "fallback".into() });
        assert_eq!(v, Doc { a: 9, b: "fallback".into() });
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/doc.json");
        save(&path, &Doc { a: 1, b: "z".into() }).unwrap();
        assert!(path.exists());
    }
}
