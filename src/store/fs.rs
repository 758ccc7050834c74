//! Filesystem realization of the object collaborator.
//!
//! Objects live under a root directory using their store path verbatim.
//! Public visibility is a sidecar marker file (`<object>.public`) so that
//! moving an object does not silently carry visibility along, matching the
//! two distinct sub-steps of the relocation contract.

use crate::store::ObjectStore;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn local(&self, object: &str) -> PathBuf {
        self.root.join(object)
    }

    fn marker(&self, object: &str) -> PathBuf {
        self.root.join(format!("{}.public", object))
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    #[instrument(skip_all)]
    async fn exists(&self, object: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.local(object)).await?)
    }

    #[instrument(skip_all)]
    async fn move_object(&self, src: &str, dst: &str) -> Result<()> {
        let from = self.local(src);
        let to = self.local(dst);
        Self::ensure_parent(&to).await?;
        tokio::fs::rename(&from, &to)
            .await
            .with_context(|| format!("failed to move {} to {}", src, dst))?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn make_public(&self, object: &str) -> Result<()> {
        if !self.exists(object).await? {
            bail!("cannot publish missing object {}", object);
        }
        let marker = self.marker(object);
        Self::ensure_parent(&marker).await?;
        tokio::fs::write(&marker, b"")
            .await
            .with_context(|| format!("failed to mark {} public", object))?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn is_public(&self, object: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.marker(object)).await?)
    }

    #[instrument(skip_all)]
    async fn delete(&self, object: &str) -> Result<()> {
        for path in [self.local(object), self.marker(object)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err).with_context(|| format!("failed to delete {}", object))
                }
            }
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn upload(&self, bytes: &[u8], dst: &str) -> Result<()> {
        let to = self.local(dst);
        Self::ensure_parent(&to).await?;
        tokio::fs::write(&to, bytes)
            .await
            .with_context(|| format!("failed to upload {}", dst))?;
        Ok(())
    }
}
