//! Per-job scratch directory.
//!
//! Each job gets `<scratch_root>/<job_id>/`, so concurrent jobs never see each
//! other's files. Stages agree on hand-off locations through [`Workspace::path`].

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use dockflow_common::Result;

use crate::artifact::ArtifactRole;

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create (if needed) the scratch directory for `job_id` under `scratch_root`.
    pub async fn allocate(scratch_root: &Path, job_id: Uuid) -> Result<Self> {
        let scratch_root = if scratch_root.is_absolute() {
            scratch_root.to_path_buf()
        } else {
            std::env::current_dir()?.join(scratch_root)
        };
        Self::open(scratch_root.join(job_id.to_string())).await
    }

    /// Use `root` itself as the scratch directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove everything inside the scratch directory. Idempotent.
    pub async fn reset(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        let mut entries = fs::read_dir(&self.root).await?;
        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                fs::remove_dir_all(entry.path()).await?;
            } else {
                fs::remove_file(entry.path()).await?;
            }
            removed += 1;
        }
        debug!("Scratch {:?} reset ({} entries removed)", self.root, removed);
        Ok(())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        let mut entries = fs::read_dir(&self.root).await?;
        Ok(entries.next_entry().await?.is_none())
    }

    /// Well-known location of an artifact role.
    pub fn path(&self, role: ArtifactRole) -> PathBuf {
        self.root.join(role.relative_path())
    }

    /// Location for a fetched input, keeping the extension of its remote reference.
    pub fn input_path(&self, role: ArtifactRole, reference: &str) -> PathBuf {
        let base = self.path(role);
        let file_name = reference.rsplit('/').next().unwrap_or(reference);
        match Path::new(file_name).extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => base.with_extension(ext),
            _ => base,
        }
    }

    /// Delete the scratch directory itself.
    pub async fn dispose(self) -> Result<()> {
        if fs::try_exists(&self.root).await? {
            fs::remove_dir_all(&self.root).await?;
        }
        debug!("Scratch {:?} removed", self.root);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_reset_empties_scratch_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path().join("job")).await.unwrap();

        std::fs::write(ws.path(ArtifactRole::DockingResult), "stale").unwrap();
        std::fs::create_dir_all(ws.path(ArtifactRole::LigandPrepared).parent().unwrap()).unwrap();
        std::fs::write(ws.path(ArtifactRole::LigandPrepared), "stale").unwrap();
        assert!(!ws.is_empty().await.unwrap());

        ws.reset().await.unwrap();
        assert!(ws.is_empty().await.unwrap());

        ws.reset().await.unwrap();
        assert!(ws.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_jobs_get_distinct_directories() {
        let dir = tempdir().unwrap();
        let a = Workspace::allocate(dir.path(), Uuid::new_v4()).await.unwrap();
        let b = Workspace::allocate(dir.path(), Uuid::new_v4()).await.unwrap();
        assert_ne!(a.root(), b.root());
        assert_ne!(a.path(ArtifactRole::LigandPose), b.path(ArtifactRole::LigandPose));
    }

    #[tokio::test]
    async fn test_paths_are_deterministic_and_absolute() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path()).await.unwrap();
        assert_eq!(ws.path(ArtifactRole::LigandPose), dir.path().join("pose.sdf"));
        assert_eq!(ws.path(ArtifactRole::LigandPose), ws.path(ArtifactRole::LigandPose));
        assert!(ws.path(ArtifactRole::BoxConfig).is_absolute());
    }

    #[tokio::test]
    async fn test_input_path_keeps_reference_extension() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path()).await.unwrap();
        assert_eq!(
            ws.input_path(ArtifactRole::ReceptorInput, "targets/1abc.pdb"),
            dir.path().join("inputs/receptor.pdb")
        );
        assert_eq!(
            ws.input_path(ArtifactRole::LigandInput, "ligands.v2/aspirin"),
            dir.path().join("inputs/ligand")
        );
    }

    #[tokio::test]
    async fn test_dispose_removes_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("job");
        let ws = Workspace::open(&root).await.unwrap();
        std::fs::write(ws.path(ArtifactRole::LigandPose), "pose").unwrap();
        ws.dispose().await.unwrap();
        assert!(!root.exists());
    }
}
