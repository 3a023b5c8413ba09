//! Vector store and its on-disk format
//!
//! A store is an ordered list of (text, vector) pairs built in one pass and read
//! back unchanged by every later query. Persistence is a single bincode blob:
//! f32 values round-trip bit for bit. Saves go through a temp file and a rename,
//! so a crash mid-write never leaves a truncated store at the target path.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Bumped whenever the serialized layout changes
pub const FORMAT_VERSION: u32 = 1;

/// A passage and its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Passage text
    pub text: String,
    /// Embedding vector
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    /// Create a new record
    pub fn new(text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            vector,
        }
    }
}

/// Ordered collection of embedding records with a uniform dimensionality
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorStore {
    model: String,
    dimension: Option<usize>,
    records: Vec<EmbeddingRecord>,
}

/// Serialized layout
#[derive(Serialize, Deserialize)]
struct VectorStoreData {
    format_version: u32,
    model: String,
    dimension: Option<usize>,
    records: Vec<EmbeddingRecord>,
}

impl VectorStore {
    /// Create an empty store for vectors produced by `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            dimension: None,
            records: Vec::new(),
        }
    }

    /// Append a record
    ///
    /// The first record fixes the dimensionality; later records must match it.
    pub fn push(&mut self, record: EmbeddingRecord) -> Result<()> {
        let actual = record.vector.len();
        match self.dimension {
            Some(expected) if expected != actual => {
                return Err(Error::DimensionMismatch { expected, actual });
            }
            Some(_) => {}
            None => self.dimension = Some(actual),
        }
        self.records.push(record);
        Ok(())
    }

    /// Embedding model the vectors were produced with
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Vector dimensionality, `None` while the store is empty
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Records in insertion order
    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    /// Iterate records in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, EmbeddingRecord> {
        self.records.iter()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Persist atomically to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let data = VectorStoreData {
            format_version: FORMAT_VERSION,
            model: self.model.clone(),
            dimension: self.dimension,
            records: self.records.clone(),
        };

        let tmp_path = tmp_path(path);
        let written = (|| -> Result<()> {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            bincode::serialize_into(&mut writer, &data)
                .map_err(|e| Error::Internal(format!("Serialization failed: {}", e)))?;
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| Error::Io(e.into_error()))?
                .sync_all()?;
            Ok(())
        })();

        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        info!(
            path = %path.display(),
            records = self.len(),
            "Vector store saved"
        );
        Ok(())
    }

    /// Load a store previously written by [`VectorStore::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        // Decoding from a slice bounds every length prefix by the bytes actually
        // present, so a damaged header cannot trigger a huge allocation.
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::StoreNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let data: VectorStoreData = bincode::deserialize(&bytes)
            .map_err(|e| Error::StoreCorrupt(format!("Deserialization failed: {}", e)))?;

        if data.format_version != FORMAT_VERSION {
            return Err(Error::StoreCorrupt(format!(
                "unsupported format version {} (expected {})",
                data.format_version, FORMAT_VERSION
            )));
        }

        if let Some(expected) = data.dimension {
            if let Some((idx, bad)) = data
                .records
                .iter()
                .enumerate()
                .find(|(_, r)| r.vector.len() != expected)
            {
                return Err(Error::StoreCorrupt(format!(
                    "record {} has {} dimensions, store header says {}",
                    idx,
                    bad.vector.len(),
                    expected
                )));
            }
        } else if !data.records.is_empty() {
            return Err(Error::StoreCorrupt(
                "records present but no dimension recorded".to_string(),
            ));
        }

        debug!(
            path = %path.display(),
            records = data.records.len(),
            model = %data.model,
            "Vector store loaded"
        );

        Ok(Self {
            model: data.model,
            dimension: data.dimension,
            records: data.records,
        })
    }
}

impl<'a> IntoIterator for &'a VectorStore {
    type Item = &'a EmbeddingRecord;
    type IntoIter = std::slice::Iter<'a, EmbeddingRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> VectorStore {
        let mut store = VectorStore::new("bge-m3:567m");
        store
            .push(EmbeddingRecord::new("Right to Equality", vec![0.1, -0.25, 1e-7]))
            .unwrap();
        store
            .push(EmbeddingRecord::new("Right to Freedom", vec![0.3, 0.2, f32::MIN_POSITIVE]))
            .unwrap();
        store
            .push(EmbeddingRecord::new("Right to Equality", vec![0.0, 0.0, 0.0]))
            .unwrap();
        store
    }

    #[test]
    fn test_vector_store_new() {
        let store = VectorStore::new("m");
        assert_eq!(store.model(), "m");
        assert_eq!(store.dimension(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut store = VectorStore::new("m");
        store.push(EmbeddingRecord::new("a", vec![1.0, 0.0])).unwrap();

        let err = store
            .push(EmbeddingRecord::new("b", vec![1.0, 0.0, 0.0]))
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.bin");

        let store = sample();
        store.save(&path).unwrap();
        let loaded = VectorStore::load(&path).unwrap();

        // Duplicates and insertion order survive; floats are bit-exact.
        assert_eq!(loaded, store);
        assert_eq!(loaded.dimension(), Some(3));
        assert!(!dir.path().join("vectors.bin.tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("db").join("vectors.bin");
        sample().save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_empty_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        VectorStore::new("m").save(&path).unwrap();

        let loaded = VectorStore::load(&path).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimension(), None);
    }

    #[test]
    fn test_save_replaces_existing_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.bin");
        sample().save(&path).unwrap();

        let mut smaller = VectorStore::new("m");
        smaller.push(EmbeddingRecord::new("only", vec![1.0])).unwrap();
        smaller.save(&path).unwrap();

        assert_eq!(VectorStore::load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let path = dir.path().join("vectors.bin");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let err = sample().save(&path).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!dir.path().join("vectors.bin.tmp").exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let err = VectorStore::load(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, Error::StoreNotFound { .. }));
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, b"not a vector store").unwrap();

        let err = VectorStore::load(&path).unwrap_err();
        assert!(matches!(err, Error::StoreCorrupt(_)));
    }

    #[test]
    fn test_load_truncated_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.bin");
        sample().save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(
            VectorStore::load(&path),
            Err(Error::StoreCorrupt(_))
        ));
    }

    #[test]
    fn test_iteration_order() {
        let store = sample();
        let texts: Vec<&str> = store.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Right to Equality", "Right to Freedom", "Right to Equality"]
        );
    }
}
