//! Session storage backends

use crate::error::{CoreError, CoreResult};
use crate::session::SessionRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Storage for the current session.
///
/// Exactly one session is current at a time; `set` replaces it wholesale.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self) -> CoreResult<Option<SessionRecord>>;
    async fn set(&self, session: SessionRecord) -> CoreResult<()>;
    async fn clear(&self) -> CoreResult<()>;
}

/// Process-wide in-memory store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    current: RwLock<Option<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self) -> CoreResult<Option<SessionRecord>> {
        Ok(self.current.read().await.clone())
    }

    async fn set(&self, session: SessionRecord) -> CoreResult<()> {
        *self.current.write().await = Some(session);
        Ok(())
    }

    async fn clear(&self) -> CoreResult<()> {
        *self.current.write().await = None;
        Ok(())
    }
}

/// Store that keeps the session as JSON in a single file so it survives
/// between CLI invocations
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: RwLock<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self) -> CoreResult<Option<SessionRecord>> {
        let _guard = self.lock.read().await;
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            CoreError::store_error(format!(
                "corrupt session file {}: {e}",
                self.path.display()
            ))
        })
    }

    async fn set(&self, session: SessionRecord) -> CoreResult<()> {
        let _guard = self.lock.write().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&session)?;
        // Readers only ever see a complete file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "Session persisted");
        Ok(())
    }

    async fn clear(&self) -> CoreResult<()> {
        let _guard = self.lock.write().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::store::SessionStoreTestSuite;

    #[tokio::test]
    async fn test_memory_store() {
        SessionStoreTestSuite::new(MemorySessionStore::new())
            .run_all_tests()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));
        SessionStoreTestSuite::new(store).run_all_tests().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let session = SessionStoreTestSuite::<MemorySessionStore>::sample_session("reopen");
        FileSessionStore::new(&path).set(session.clone()).await.unwrap();

        let reopened = FileSessionStore::new(&path);
        assert_eq!(reopened.get().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let result = FileSessionStore::new(&path).get().await;
        assert!(matches!(result, Err(CoreError::Store { .. })));
    }
}
