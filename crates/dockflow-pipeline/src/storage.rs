//! Artifact store clients.
//!
//! Inputs are downloaded by reference and outputs uploaded by key. Each call
//! succeeds or fails as a whole; callers aggregate per-object outcomes.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use dockflow_config::{StorageBackend, StorageConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Store rejected '{key}' with status {status}")]
    Rejected { key: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Remote object store holding job inputs and published results.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Copy the object named by `reference` to the local file `dest`.
    async fn download(&self, reference: &str, dest: &Path) -> Result<(), StoreError>;

    /// Publish the local file `local` under `key`.
    async fn upload(&self, local: &Path, key: &str) -> Result<(), StoreError>;
}

/// Join key segments with single slashes, dropping empty segments.
pub fn object_key(segments: &[&str]) -> String {
    segments
        .iter()
        .flat_map(|s| s.split('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the store selected by the `[storage]` config section.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn ArtifactStore>, StoreError> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalStore::new(&config.root))),
        StorageBackend::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or_else(|| StoreError::InvalidKey("storage.base_url is not set".to_string()))?;
            Ok(Arc::new(HttpStore::new(
                base_url,
                Duration::from_secs(config.request_timeout_secs),
            )?))
        }
    }
}

// ── Local filesystem bucket ───────────────────────────────────────────────────

/// A directory on the local filesystem acting as the bucket.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let key = key.strip_prefix("file://").unwrap_or(key);
        let relative = Path::new(key.trim_start_matches('/'));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn download(&self, reference: &str, dest: &Path) -> Result<(), StoreError> {
        let source = self.resolve(reference)?;
        if !fs::try_exists(&source).await? {
            return Err(StoreError::NotFound(reference.to_string()));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&source, dest).await?;
        debug!("Fetched {} -> {:?}", reference, dest);
        Ok(())
    }

    async fn upload(&self, local: &Path, key: &str) -> Result<(), StoreError> {
        let target = self.resolve(key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(local, &target).await?;
        debug!("Published {:?} -> {:?}", local, target);
        Ok(())
    }
}

// ── HTTP object endpoint ──────────────────────────────────────────────────────

/// Object endpoint speaking plain GET (download) and PUT (upload).
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL of an object. References that already are URLs are used as-is.
    pub fn url_for(&self, key: &str) -> String {
        if key.starts_with("http://") || key.starts_with("https://") {
            key.to_string()
        } else {
            format!("{}/{}", self.base_url, object_key(&[key]))
        }
    }
}

#[async_trait]
impl ArtifactStore for HttpStore {
    async fn download(&self, reference: &str, dest: &Path) -> Result<(), StoreError> {
        let url = self.url_for(reference);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(reference.to_string()));
        }
        if !status.is_success() {
            return Err(StoreError::Rejected {
                key: reference.to_string(),
                status: status.as_u16(),
            });
        }
        let content = response.bytes().await?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(dest, content).await?;
        debug!("Fetched {} -> {:?}", url, dest);
        Ok(())
    }

    async fn upload(&self, local: &Path, key: &str) -> Result<(), StoreError> {
        let body = fs::read(local).await?;
        let url = self.url_for(key);
        let response = self.client.put(&url).body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }
        debug!("Published {:?} -> {}", local, url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_object_key_normalises_slashes() {
        assert_eq!(
            object_key(&["adapter_autodock/basic_docking/", "ligand_docking", "20240101_120000.pdbqt"]),
            "adapter_autodock/basic_docking/ligand_docking/20240101_120000.pdbqt"
        );
        assert_eq!(object_key(&["/runs//a/", "", "b.sdf"]), "runs/a/b.sdf");
    }

    #[tokio::test]
    async fn test_local_store_round_trip() {
        let bucket = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let store = LocalStore::new(bucket.path());

        let local = scratch.path().join("pose.sdf");
        std::fs::write(&local, "pose").unwrap();
        store.upload(&local, "runs/ligand_pose/x.sdf").await.unwrap();
        assert!(bucket.path().join("runs/ligand_pose/x.sdf").is_file());

        let fetched = scratch.path().join("inputs/pose.sdf");
        store.download("runs/ligand_pose/x.sdf", &fetched).await.unwrap();
        assert_eq!(std::fs::read_to_string(fetched).unwrap(), "pose");
    }

    #[tokio::test]
    async fn test_local_store_missing_object() {
        let bucket = tempdir().unwrap();
        let store = LocalStore::new(bucket.path());
        let err = store
            .download("ligands/absent.smi", &bucket.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_local_store_rejects_traversal() {
        let bucket = tempdir().unwrap();
        let store = LocalStore::new(bucket.path());
        let err = store
            .upload(Path::new("/etc/hosts"), "../escape.pdb")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[test]
    fn test_http_store_urls() {
        let store = HttpStore::new("http://objects.local/bucket/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            store.url_for("/runs/ligand_pose/x.sdf"),
            "http://objects.local/bucket/runs/ligand_pose/x.sdf"
        );
        assert_eq!(store.url_for("https://cdn.local/a.pdb"), "https://cdn.local/a.pdb");
    }

    #[test]
    fn test_from_config_local() {
        let config = StorageConfig::default();
        assert!(from_config(&config).is_ok());
    }
}
