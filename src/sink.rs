//! Destinations for finished artifacts.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::pdf::Artifact;

/// Where an export ends up. `save` is the second suspension point of an export.
#[allow(async_fn_in_trait)]
pub trait ArtifactSink {
    /// Persist `artifact`, returning a description of where it went.
    async fn save(&self, artifact: &Artifact) -> Result<String>;
}

/// Writes artifacts into a directory under their fixed file name
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    async fn save(&self, artifact: &Artifact) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::Assembly(format!("cannot create {}: {}", self.dir.display(), e)))?;
        let path = self.dir.join(&artifact.file_name);
        tokio::fs::write(&path, &artifact.bytes)
            .await
            .map_err(|e| Error::Assembly(format!("cannot write {}: {}", path.display(), e)))?;
        log::info!("saved {} ({} bytes)", path.display(), artifact.bytes.len());
        Ok(path.display().to_string())
    }
}

/// Keeps artifacts in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    saved: Rc<RefCell<Vec<Artifact>>>,
    reject: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose saves always fail, like a dismissed save dialog
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<Artifact> {
        self.saved.borrow().clone()
    }

    pub fn last(&self) -> Option<Artifact> {
        self.saved.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.saved.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.borrow().is_empty()
    }
}

impl ArtifactSink for MemorySink {
    async fn save(&self, artifact: &Artifact) -> Result<String> {
        tokio::task::yield_now().await;
        if self.reject {
            return Err(Error::Assembly("save was rejected".into()));
        }
        let mut saved = self.saved.borrow_mut();
        saved.push(artifact.clone());
        Ok(format!("memory:{}#{}", artifact.file_name, saved.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::assemble;
    use crate::rendering::RenderSnapshot;

    fn artifact() -> Artifact {
        assemble(&RenderSnapshot::solid(4, 4, [0, 0, 0, 255]).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn directory_sink_writes_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        let artifact = artifact();
        let location = sink.save(&artifact).await.unwrap();
        assert!(location.ends_with("markdown-export.pdf"));
        let written = std::fs::read(dir.path().join("out").join("markdown-export.pdf")).unwrap();
        assert_eq!(written, artifact.bytes);
    }

    #[tokio::test]
    async fn memory_sink_shares_store_and_can_reject() {
        let sink = MemorySink::new();
        let view = sink.clone();
        sink.save(&artifact()).await.unwrap();
        assert_eq!(view.len(), 1);

        let rejecting = MemorySink::rejecting();
        assert!(matches!(rejecting.save(&artifact()).await, Err(Error::Assembly(_))));
        assert!(rejecting.is_empty());
    }
}
