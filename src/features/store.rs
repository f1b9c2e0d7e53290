use crate::error::{Result, SignatureError};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::Builder;

/// Named string slots, the shape of the host's persistent settings.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per slot inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut tmp = Builder::new()
            .prefix(".sig_")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(self.path_for(key))
            .map_err(|e| SignatureError::Storage(e.error.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedSignature {
    #[serde(rename = "dataUrl")]
    pub image_data: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Bounded list of saved signatures, oldest evicted first.
#[derive(Debug)]
pub struct SignatureStore<S: KeyValueStore> {
    backend: S,
    key: String,
    capacity: usize,
}

impl<S: KeyValueStore> SignatureStore<S> {
    pub fn new(backend: S, key: impl Into<String>, capacity: usize) -> Self {
        Self {
            backend,
            key: key.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Missing or unreadable data yields an empty list.
    pub fn list(&self) -> Vec<SavedSignature> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("saved signatures unreadable, treating as empty: {e}");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<SavedSignature>>(&raw) {
            Ok(list) => list,
            Err(e) => {
                log::warn!("saved signatures corrupt, treating as empty: {e}");
                Vec::new()
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<SavedSignature> {
        self.list().into_iter().nth(index)
    }

    pub fn append(&mut self, image_data: &str) -> Result<SavedSignature> {
        let entry = SavedSignature {
            image_data: image_data.to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let mut list = self.list();
        list.push(entry.clone());
        if list.len() > self.capacity {
            let overflow = list.len() - self.capacity;
            list.drain(..overflow);
        }
        self.write(&list)?;
        Ok(entry)
    }

    /// Out-of-range indexes leave the slot untouched.
    pub fn delete_at(&mut self, index: usize) -> Result<Option<SavedSignature>> {
        let mut list = self.list();
        if index >= list.len() {
            return Ok(None);
        }
        let removed = list.remove(index);
        self.write(&list)?;
        Ok(Some(removed))
    }

    fn write(&mut self, list: &[SavedSignature]) -> Result<()> {
        let content = serde_json::to_string(list)?;
        self.backend.set(&self.key, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "pdfEditorSignatures";

    fn store() -> SignatureStore<MemoryStore> {
        SignatureStore::new(MemoryStore::new(), KEY, 5)
    }

    #[test]
    fn empty_slot_lists_nothing() {
        assert!(store().list().is_empty());
    }

    #[test]
    fn sixth_append_evicts_oldest() {
        let mut store = store();
        for i in 0..6 {
            store.append(&format!("data:image/png;base64,{i}")).unwrap();
        }
        let list = store.list();
        assert_eq!(list.len(), 5);
        assert_eq!(list[0].image_data, "data:image/png;base64,1");
        assert_eq!(list[4].image_data, "data:image/png;base64,5");
    }

    #[test]
    fn corrupt_slot_degrades_to_empty_and_recovers() {
        let mut backend = MemoryStore::new();
        backend.set(KEY, "{not json").unwrap();
        let mut store = SignatureStore::new(backend, KEY, 5);
        assert!(store.list().is_empty());
        store.append("a").unwrap();
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn delete_removes_one_entry() {
        let mut store = store();
        for name in ["a", "b", "c"] {
            store.append(name).unwrap();
        }
        let removed = store.delete_at(1).unwrap().unwrap();
        assert_eq!(removed.image_data, "b");
        let names: Vec<_> = store.list().into_iter().map(|s| s.image_data).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(store.delete_at(7).unwrap().is_none());
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn stored_json_uses_editor_field_names() {
        let mut store = store();
        store.append("data:x").unwrap();
        let raw = store.backend().get(KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["dataUrl"], "data:x");
        assert!(value[0]["createdAt"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = SignatureStore::new(FileStore::new(dir.path()), KEY, 5);
            store.append("first").unwrap();
            store.append("second").unwrap();
        }
        let store = SignatureStore::new(FileStore::new(dir.path()), KEY, 5);
        let list = store.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].image_data, "second");
        assert!(dir.path().join(format!("{KEY}.json")).exists());
    }

    #[test]
    fn file_store_missing_dir_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignatureStore::new(FileStore::new(dir.path().join("nested")), KEY, 5);
        assert!(store.list().is_empty());
    }
}
