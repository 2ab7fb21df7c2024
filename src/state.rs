// State management for counsel-review

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::RwLock;

use crate::database::DatabaseManager;
use crate::storage::{FsObjectStore, ObjectStore};
use crate::transcription::{StaticTranscriptionEngine, TranscriptionEngine};

/// Wrapper around DatabaseManager for shared access
pub struct DbWrapper {
    inner: Arc<DatabaseManager>,
}

impl DbWrapper {
    pub fn new(db: DatabaseManager) -> Self {
        Self {
            inner: Arc::new(db),
        }
    }

    pub fn inner(&self) -> &DatabaseManager {
        &self.inner
    }

    pub fn arc(&self) -> Arc<DatabaseManager> {
        self.inner.clone()
    }
}

impl std::ops::Deref for DbWrapper {
    type Target = DatabaseManager;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct AppState {
    /// Database manager for SQLite persistence
    database: Arc<RwLock<Option<DbWrapper>>>,
    /// Object store for session recordings and voice feedback
    object_store: Arc<dyn ObjectStore>,
    /// Transcription collaborator used for new uploads
    transcription_engine: Arc<dyn TranscriptionEngine>,
}

impl AppState {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        transcription_engine: Arc<dyn TranscriptionEngine>,
    ) -> Self {
        Self {
            database: Arc::new(RwLock::new(None)),
            object_store,
            transcription_engine,
        }
    }

    /// Local-first defaults: objects under the platform data directory and
    /// the canned transcription engine until a real provider is configured
    pub fn with_default_stores() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .context("Failed to resolve platform data directory")?
            .join("counsel-review");

        Ok(Self::new(
            Arc::new(FsObjectStore::new(data_dir.join("objects"))),
            Arc::new(StaticTranscriptionEngine::counseling_demo()),
        ))
    }

    /// Initialize the database manager
    pub async fn init_database(&self, db: DatabaseManager) {
        let mut guard = self.database.write().await;
        *guard = Some(DbWrapper::new(db));
    }

    /// Get the database Arc for cloning (used by background tasks)
    pub async fn database_arc(&self) -> Option<Arc<DatabaseManager>> {
        let guard = self.database.read().await;
        guard.as_ref().map(|wrapper| wrapper.arc())
    }

    /// Get the database manager, panicking if not initialized.
    /// Use this only when you're sure the database is initialized.
    pub async fn db(&self) -> impl std::ops::Deref<Target = DatabaseManager> + '_ {
        let guard = self.database.read().await;
        tokio::sync::RwLockReadGuard::map(guard, |opt| {
            opt.as_ref().expect("Database not initialized").inner()
        })
    }

    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.object_store.clone()
    }

    pub fn transcription_engine(&self) -> Arc<dyn TranscriptionEngine> {
        self.transcription_engine.clone()
    }
}
