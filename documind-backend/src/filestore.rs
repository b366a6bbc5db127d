//! On-disk storage for uploaded document files.
//!
//! Files live under a per-owner directory (`<root>/<owner-uuid>/`) so that
//! different owners can never collide on a filename, and bulk cleanup of one
//! owner is a single directory removal. Stored names are prefixed with a
//! random UUID so concurrent uploads of the same original filename never
//! overwrite each other.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;

/// Reference to a stored file: a storage-relative path plus its byte length.
#[derive(Clone, Debug)]
pub struct StoredFile {
    pub path: String,
    pub size: i64,
}

#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Idempotently create and return the owner's directory. Safe to call
    /// concurrently for the same owner - `create_dir_all` does not fail when
    /// the directory already exists.
    async fn user_dir(&self, owner_id: Uuid) -> Result<PathBuf, Error> {
        let dir = self.root.join(owner_id.to_string());
        fs::create_dir_all(&dir)
            .await
            .map_err(|err| Error::Storage(format!("Failed to create user directory: {err}")))?;
        Ok(dir)
    }

    /// Write `bytes` under the owner's directory with a collision-safe name.
    pub async fn save(
        &self,
        owner_id: Uuid,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, Error> {
        let dir = self.user_dir(owner_id).await?;

        let unique_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name));
        let target = dir.join(&unique_name);

        fs::write(&target, bytes)
            .await
            .map_err(|err| Error::Storage(format!("Failed to write {}: {err}", target.display())))?;

        debug!(
            "Stored {} bytes for owner {} as {}",
            bytes.len(),
            owner_id,
            unique_name
        );

        Ok(StoredFile {
            path: format!("{}/{}", owner_id, unique_name),
            size: bytes.len() as i64,
        })
    }

    /// Read a stored file back. A missing file is `NotFound`; any other io
    /// failure is a `Storage` error so callers can tell the two apart.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, Error> {
        let target = self.resolve(path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Stored file {} not found", path)))
            }
            Err(err) => Err(Error::Storage(format!(
                "Failed to read {}: {err}",
                target.display()
            ))),
        }
    }

    /// Remove a stored file. Absence is not an error, so deletion is
    /// idempotent.
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("Stored file {} already absent", path);
                Ok(())
            }
            Err(err) => Err(Error::Storage(format!(
                "Failed to delete {}: {err}",
                target.display()
            ))),
        }
    }

    /// Map a storage-relative path under the root, rejecting anything that
    /// would escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(Error::Storage(format!("Invalid storage path: {}", path)));
        }
        Ok(self.root.join(relative))
    }
}

/// Keep only filesystem-safe characters from an uploaded filename.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}
