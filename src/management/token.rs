use std::{future::Future, io::ErrorKind, path::PathBuf};

use tokio::sync::RwLock;

use crate::{error::AuthError, types::Credential};

/// Persistence for the current [`Credential`].
///
/// Implementations store and remove the access token, refresh token and expiry as
/// one unit: `load` returns either a complete credential or `None`, never a mix
/// of old and new fields.
pub trait TokenStore: Send + Sync + 'static {
    fn save(&self, credential: &Credential) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn load(&self) -> impl Future<Output = Result<Option<Credential>, AuthError>> + Send;

    fn clear(&self) -> impl Future<Output = Result<(), AuthError>> + Send;
}

/// Keeps the credential as a single JSON document on disk.
///
/// Writes go to a sibling temporary file which is then renamed over the target, so a
/// concurrent reader sees either the previous document or the new one.
pub struct FileTokenStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl TokenStore for FileTokenStore {
    async fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        let _guard = self.lock.write().await;

        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(credential)?;
        let tmp = self.tmp_path();
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<Credential>, AuthError> {
        let _guard = self.lock.read().await;

        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let credential: Credential = serde_json::from_str(&content)?;
        Ok(Some(credential))
    }

    async fn clear(&self) -> Result<(), AuthError> {
        let _guard = self.lock.write().await;

        for path in [self.path.clone(), self.tmp_path()] {
            match async_fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// In-process store, useful for embedding and tests.
#[derive(Default)]
pub struct MemoryTokenStore {
    credential: RwLock<Option<Credential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    async fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        *self.credential.write().await = Some(credential.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<Credential>, AuthError> {
        Ok(self.credential.read().await.clone())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        *self.credential.write().await = None;
        Ok(())
    }
}
