//! JSON snapshot persistence used by [`super::MemoryStore`].

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::fs;

use crate::dao::storage::StorageError;

/// Failures that can occur while reading or writing the snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot exists but could not be read.
    #[error("failed to read snapshot `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The snapshot content is not valid JSON for the expected tables.
    #[error("failed to decode snapshot `{path}`")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The tables could not be encoded.
    #[error("failed to encode snapshot")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
    /// The parent directory could not be created or inspected.
    #[error("snapshot directory `{path}` is not usable")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing the temporary file or moving it into place failed.
    #[error("failed to write snapshot `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<SnapshotError> for StorageError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Decode { .. } => StorageError::corrupt(err.to_string(), err),
            _ => StorageError::unavailable(err.to_string(), err),
        }
    }
}

/// Location of a JSON snapshot replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Point at `path`; nothing is touched until the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the snapshot, returning `T::default()` when it does not exist yet.
    pub async fn load<T>(&self) -> Result<T, SnapshotError>
    where
        T: DeserializeOwned + Default,
    {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Decode {
                path: self.path.clone(),
                source,
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(source) => Err(SnapshotError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Encode `value` and replace the snapshot with it (temporary file + rename).
    pub async fn save<T>(&self, value: &T) -> Result<(), SnapshotError>
    where
        T: Serialize,
    {
        let bytes =
            serde_json::to_vec_pretty(value).map_err(|source| SnapshotError::Encode { source })?;

        self.ensure_directory().await?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)
            .await
            .map_err(|source| SnapshotError::Write {
                path: tmp.clone(),
                source,
            })?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| SnapshotError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// Check that the snapshot directory is still reachable.
    pub async fn probe(&self) -> Result<(), SnapshotError> {
        let dir = self.directory();
        fs::metadata(&dir)
            .await
            .map(|_| ())
            .map_err(|source| SnapshotError::Directory { path: dir, source })
    }

    async fn ensure_directory(&self) -> Result<(), SnapshotError> {
        let dir = self.directory();
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| SnapshotError::Directory { path: dir, source })
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use uuid::Uuid;

    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("quiz-buzzer-{}", Uuid::new_v4().simple()))
            .join("state.json")
    }

    #[tokio::test]
    async fn missing_snapshot_loads_default() {
        let file = SnapshotFile::new(scratch_path());
        let loaded: BTreeMap<String, u32> = file.load().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn save_creates_directory_and_replaces_content() {
        let path = scratch_path();
        let file = SnapshotFile::new(&path);

        let mut tables = BTreeMap::new();
        tables.insert("alpha".to_string(), 1_u32);
        file.save(&tables).await.unwrap();
        tables.insert("beta".to_string(), 2);
        file.save(&tables).await.unwrap();

        let loaded: BTreeMap<String, u32> = file.load().await.unwrap();
        assert_eq!(loaded, tables);
        assert!(!path.with_extension("json.tmp").exists());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn corrupted_snapshot_is_reported() {
        let path = scratch_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();

        let err = SnapshotFile::new(&path)
            .load::<BTreeMap<String, u32>>()
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Decode { .. }));
        assert!(!StorageError::from(err).is_transient());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
