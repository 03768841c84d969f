use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use crate::error::StoreResult;
use crate::store::kv::KeyValueStore;

/// One `<key>.json` file per key under a data directory. Writes go to a
/// temp file first and are renamed into place.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> StoreResult<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keycoach");
        Self::with_base_dir(base_dir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> StoreResult<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for JsonStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.file_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.file_path(key);
        let tmp_path = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.file_path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_set_get_remove() {
        let (_dir, mut store) = make_test_store();
        assert_eq!(store.get("next_sentence").unwrap(), None);

        store.set("next_sentence", "\"hello\"").unwrap();
        assert_eq!(store.get("next_sentence").unwrap().as_deref(), Some("\"hello\""));
        assert!(store.file_path("next_sentence").exists());

        store.remove("next_sentence").unwrap();
        assert_eq!(store.get("next_sentence").unwrap(), None);
        store.remove("next_sentence").unwrap();
    }

    #[test]
    fn test_no_residual_tmp_files() {
        let (dir, mut store) = make_test_store();
        store.set("preferences", "{}").unwrap();
        store.set("preferences", "{\"a\":1}").unwrap();

        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
    }

    #[test]
    fn test_keys_cannot_escape_base_dir() {
        let (dir, mut store) = make_test_store();
        store.set("../outside", "1").unwrap();
        assert!(dir.path().join("___outside.json").exists());
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let (dir, _) = make_test_store();
        let mut bad = JsonStore {
            base_dir: dir.path().join("gone"),
        };
        assert!(bad.set("k", "v").is_err());
    }
}
