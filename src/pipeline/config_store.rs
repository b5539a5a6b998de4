//! Named id lists handed from one pipeline run to the next.
//!
//! Each file holds a single `key: [values...]` mapping in YAML, e.g.
//!
//! ```yaml
//! id:
//! - 4aawyAB9vmqN3uQ7FjRGTy
//! - 2t0AfNqhtlMnjFxbTzmPqO
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Key {key:?} not found in {path:?}")]
    KeyNotFound { path: PathBuf, key: String },

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigStoreError::KeyNotFound { .. })
            || matches!(self, ConfigStoreError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Path of the list file called `name` inside `dir`.
pub fn list_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.yaml", name))
}

/// Write `{key: values}` to `<dir>/<name>.yaml`, replacing any previous file.
pub fn save(dir: &Path, name: &str, key: &str, values: &[String]) -> Result<PathBuf, ConfigStoreError> {
    let path = list_path(dir, name);
    let io_error = |source| ConfigStoreError::Io {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(dir).map_err(io_error)?;

    let mut document = BTreeMap::new();
    document.insert(key, values);
    let content = serde_yaml::to_string(&document).map_err(|source| ConfigStoreError::Parse {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, content).map_err(io_error)?;

    info!("Saved {} values under {:?} to {:?}", values.len(), key, path);
    Ok(path)
}

/// Read back the list stored under `key` in the file at `path`.
pub fn load(path: &Path, key: &str) -> Result<Vec<String>, ConfigStoreError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigStoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut document: BTreeMap<String, Vec<String>> =
        serde_yaml::from_str(&content).map_err(|source| ConfigStoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    document
        .remove(key)
        .ok_or_else(|| ConfigStoreError::KeyNotFound {
            path: path.to_path_buf(),
            key: key.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_save_then_load_returns_same_list_in_order() {
        let dir = TempDir::new().unwrap();
        let values = ids(&["z", "a", "m"]);

        let path = save(dir.path(), "releases_id_RU", "id", &values).unwrap();

        assert_eq!(path, dir.path().join("releases_id_RU.yaml"));
        assert_eq!(load(&path, "id").unwrap(), values);
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = save(dir.path(), "list", "id", &ids(&["a"])).unwrap();

        let err = load(&path, "artist_id").unwrap_err();

        assert!(matches!(err, ConfigStoreError::KeyNotFound { ref key, .. } if key == "artist_id"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("nope.yaml"), "id").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_save_overwrites_previous_list() {
        let dir = TempDir::new().unwrap();
        save(dir.path(), "list", "id", &ids(&["a", "b"])).unwrap();
        let path = save(dir.path(), "list", "other", &ids(&["c"])).unwrap();

        assert!(load(&path, "id").unwrap_err().is_not_found());
        assert_eq!(load(&path, "other").unwrap(), ids(&["c"]));
    }

    #[test]
    fn test_reads_hand_written_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("handmade.yaml");
        fs::write(&path, "id:\n- 4aawyAB9vmqN3uQ7FjRGTy\n- 2t0AfNqhtlMnjFxbTzmPqO\n").unwrap();

        assert_eq!(
            load(&path, "id").unwrap(),
            ids(&["4aawyAB9vmqN3uQ7FjRGTy", "2t0AfNqhtlMnjFxbTzmPqO"])
        );
    }

    #[test]
    fn test_empty_list_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = save(dir.path(), "empty", "id", &[]).unwrap();
        assert!(load(&path, "id").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "id: [unterminated").unwrap();

        assert!(matches!(load(&path, "id"), Err(ConfigStoreError::Parse { .. })));
    }
}
