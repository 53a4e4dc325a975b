//! Named resource storage.
//!
//! Rules, masks, wordlists, and persisted hash lists are byte blobs
//! addressed by name. Writes are atomic (tmp file + rename), so a reader
//! never observes a partial overwrite.

use std::path::PathBuf;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crackd_core::{CrackdError, Result};

/// A named blob store for one resource kind.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Stores `bytes` under `name`, atomically overwriting any existing
    /// resource of the same name.
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<()>;

    async fn get(&self, name: &str) -> Result<Vec<u8>>;

    async fn exists(&self, name: &str) -> bool;

    /// Names of all stored resources, sorted.
    async fn list(&self) -> Result<Vec<String>>;

    /// Filesystem path of a (not necessarily existing) resource; the
    /// engine consumes resources by path.
    fn path_of(&self, name: &str) -> Result<PathBuf>;
}

/// Validates a resource or session name.
///
/// Names become path components, so separators and traversal sequences
/// are rejected outright.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CrackdError::validation("name must not be empty"));
    }
    if name.starts_with('.') {
        return Err(CrackdError::validation(format!(
            "name '{}' must not start with a dot",
            name
        )));
    }
    let ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !ok {
        return Err(CrackdError::validation(format!(
            "name '{}' contains characters outside [A-Za-z0-9._-]",
            name
        )));
    }
    Ok(())
}

/// Directory-backed [`ResourceStore`].
pub struct FsResourceStore {
    root: PathBuf,
    kind: &'static str,
}

impl FsResourceStore {
    /// Opens (creating if needed) a store rooted at `root`. `kind` names
    /// the resource kind in errors ("rule", "wordlist", ...).
    pub async fn open(root: impl Into<PathBuf>, kind: &'static str) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root, kind })
    }
}

#[async_trait]
impl ResourceStore for FsResourceStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let target = self.path_of(name)?;
        // Unique tmp name so concurrent overwrites of one resource cannot
        // interleave their writes; the rename decides who wins.
        let tmp = self
            .root
            .join(format!(".{}.{:08x}.tmp", name, rand::thread_rng().gen::<u32>()));
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        debug!(kind = self.kind, name, size = bytes.len(), "stored resource");
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_of(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(CrackdError::not_found(self.kind, name))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn exists(&self, name: &str) -> bool {
        match self.path_of(name) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type().await?.is_file() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn path_of(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}
