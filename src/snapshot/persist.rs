//! Snapshot file persistence
//!
//! Saves go to a sibling temporary file that is synced and then renamed over
//! the target, so readers only ever see a complete document.

use crate::error::{RatingError, Result};
use crate::snapshot::codec::{RatingSnapshot, SnapshotImport};
use anyhow::Context;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A snapshot document on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &str, err: std::io::Error) -> anyhow::Error {
        RatingError::SnapshotIo {
            message: format!("{} {}: {}", action, self.path.display(), err),
        }
        .into()
    }

    /// Write a snapshot atomically
    pub fn save(&self, snapshot: &RatingSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error("create directory for", e))?;
        }

        let payload = snapshot.to_json().context("serialize snapshot")?;
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let written = self.write_and_replace(&tmp, payload.as_bytes());
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written?;

        debug!(
            "Saved snapshot with {} teams to {}",
            snapshot.teams.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Write `payload` to `tmp`, sync it, and rename it over the target
    fn write_and_replace(&self, tmp: &Path, payload: &[u8]) -> Result<()> {
        let mut file = File::create(tmp).map_err(|e| self.io_error("create temporary file for", e))?;
        file.write_all(payload).map_err(|e| self.io_error("write", e))?;
        file.sync_all().map_err(|e| self.io_error("sync", e))?;
        drop(file);

        fs::rename(tmp, &self.path).map_err(|e| self.io_error("rename temporary file to", e))
    }

    /// Read and decode a snapshot
    ///
    /// A missing file is `SnapshotNotFound`; unreadable JSON is `SnapshotParse`.
    pub fn load(&self) -> Result<SnapshotImport> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RatingError::SnapshotNotFound {
                    path: self.path.display().to_string(),
                }
                .into())
            }
            Err(e) => return Err(self.io_error("read", e)),
        };

        SnapshotImport::from_json(&raw)
            .with_context(|| format!("decode snapshot {}", self.path.display()))
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use crate::rating::environment::RatingEnvironment;
    use crate::snapshot::codec::DEFAULT_SOURCE;
    use crate::types::{SessionContext, TeamBelief};

    fn snapshot() -> RatingSnapshot {
        RatingSnapshot::capture(
            &RatingEnvironment::default(),
            vec![("frc254".to_string(), TeamBelief::new(31.0, 3.0))],
            &SessionContext::default(),
            DEFAULT_SOURCE,
        )
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested").join("ratings.json"));

        file.save(&snapshot()).unwrap();
        assert!(file.exists());

        let loaded = file.load().unwrap();
        assert_eq!(loaded.entries, vec![("frc254".to_string(), TeamBelief::new(31.0, 3.0))]);
        assert!(!dir.path().join("nested").join("ratings.json.tmp").exists());
    }

    #[test]
    fn test_save_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("ratings.json"));

        file.save(&snapshot()).unwrap();
        let empty = RatingSnapshot::capture(
            &RatingEnvironment::default(),
            Vec::new(),
            &SessionContext::default(),
            DEFAULT_SOURCE,
        );
        file.save(&empty).unwrap();

        assert!(file.load().unwrap().entries.is_empty());
    }

    #[test]
    fn test_failed_replace_cleans_up_and_keeps_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratings.json");
        // A non-empty directory at the target cannot be replaced by a file
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let err = SnapshotFile::new(&path).save(&snapshot()).unwrap_err();
        assert!(matches!(classify(&err), Some(RatingError::SnapshotIo { .. })));
        assert!(!dir.path().join("ratings.json.tmp").exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("absent.json"));

        let err = file.load().unwrap_err();
        assert!(matches!(classify(&err), Some(RatingError::SnapshotNotFound { .. })));
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratings.json");
        fs::write(&path, "{\"teams\": [").unwrap();

        let err = SnapshotFile::new(&path).load().unwrap_err();
        assert!(matches!(classify(&err), Some(RatingError::SnapshotParse { .. })));
    }
}
