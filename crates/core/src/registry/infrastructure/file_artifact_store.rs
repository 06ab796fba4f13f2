use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::classification::domain::attribute_classifier::AttributeKind;
use crate::registry::domain::artifact_store::ArtifactStore;
use crate::registry::domain::model_artifact::ArtifactError;
use crate::shared::constants::{AGE_ARTIFACT_NAME, GENDER_ARTIFACT_NAME};
use crate::shared::model_resolver::{model_cache_dir, ModelResolveError};

/// Stores one JSON artifact per attribute in a directory.
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<model cache>/classifiers`.
    pub fn default_dir() -> Result<PathBuf, ModelResolveError> {
        Ok(model_cache_dir()?.join("classifiers"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: AttributeKind) -> PathBuf {
        let name = match kind {
            AttributeKind::Gender => GENDER_ARTIFACT_NAME,
            AttributeKind::Age => AGE_ARTIFACT_NAME,
        };
        self.dir.join(name)
    }
}

impl ArtifactStore for FileArtifactStore {
    fn read(&self, kind: AttributeKind) -> Result<Vec<u8>, ArtifactError> {
        match fs::read(self.path_for(kind)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ArtifactError::Missing(kind)),
            Err(e) => Err(ArtifactError::Io(e)),
        }
    }

    fn write(&self, kind: AttributeKind, bytes: &[u8]) -> Result<(), ArtifactError> {
        fs::create_dir_all(&self.dir)?;

        let dest = self.path_for(kind);
        let temp_path = dest.with_extension("part");
        let result = fs::File::create(&temp_path).and_then(|mut file| {
            file.write_all(bytes)?;
            file.flush()
        });
        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        fs::rename(&temp_path, &dest)?;
        log::debug!("Wrote {kind} artifact to {}", dest.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_is_missing() {
        let tmp = TempDir::new().unwrap();
        let store = FileArtifactStore::new(tmp.path());
        assert!(matches!(
            store.read(AttributeKind::Age),
            Err(ArtifactError::Missing(AttributeKind::Age))
        ));
    }

    #[test]
    fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let store = FileArtifactStore::new(tmp.path().join("nested").join("classifiers"));
        store.write(AttributeKind::Gender, b"{}").unwrap();

        assert_eq!(store.read(AttributeKind::Gender).unwrap(), b"{}");
        assert!(store.path_for(AttributeKind::Gender).ends_with(GENDER_ARTIFACT_NAME));
        assert!(!store
            .path_for(AttributeKind::Gender)
            .with_extension("part")
            .exists());
    }

    #[test]
    fn test_kinds_use_separate_files() {
        let tmp = TempDir::new().unwrap();
        let store = FileArtifactStore::new(tmp.path());
        store.write(AttributeKind::Gender, b"g").unwrap();
        store.write(AttributeKind::Age, b"a").unwrap();
        assert_eq!(store.read(AttributeKind::Gender).unwrap(), b"g");
        assert_eq!(store.read(AttributeKind::Age).unwrap(), b"a");
    }

    #[test]
    fn test_write_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = FileArtifactStore::new(tmp.path());
        store.write(AttributeKind::Gender, b"old").unwrap();
        store.write(AttributeKind::Gender, b"new").unwrap();
        assert_eq!(store.read(AttributeKind::Gender).unwrap(), b"new");
    }

    #[test]
    fn test_unreadable_path_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let store = FileArtifactStore::new(tmp.path());
        fs::create_dir_all(store.path_for(AttributeKind::Gender)).unwrap();
        assert!(matches!(
            store.read(AttributeKind::Gender),
            Err(ArtifactError::Io(_))
        ));
    }
}
