//! Persistência do TokenRecord
//!
//! Único componente que toca armazenamento durável. Cada escrita grava o
//! registro completo; a serialização de escritas é garantida pelo
//! `TokenManager` (single-flight do refresh).

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::error::StoreError;
use super::token::TokenRecord;
use crate::utils::logging::*;

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// `Ok(None)` quando nunca houve handshake
    async fn load(&self) -> Result<Option<TokenRecord>, StoreError>;

    async fn save(&self, record: &TokenRecord) -> Result<(), StoreError>;

    /// Remove o registro (de-autorização)
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Arquivo JSON no disco local
///
/// Escrita atômica (arquivo temporário + rename) com permissão 0600 em unix.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tokens.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<TokenRecord>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<TokenRecord>(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // Arquivo corrompido equivale a nunca ter autorizado
                log_warning(&format!(
                    "⚠️ [TokenStore] {} ilegível, ignorando: {}",
                    self.path.display(),
                    e
                ));
                Ok(None)
            }
        }
    }

    async fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.temp_path();

        tokio::fs::write(&tmp, &json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!("[TokenStore] Token salvo em {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Store em memória (testes e execução sem disco)
#[derive(Default)]
pub struct MemoryTokenStore {
    record: RwLock<Option<TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: TokenRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.record.read().await.clone())
    }

    async fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
        *self.record.write().await = Some(record.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.record.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeSet;

    fn sample_record() -> TokenRecord {
        TokenRecord {
            access_token: "at-1".to_string(),
            refresh_token: "rt-1".to_string(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap() + Duration::milliseconds(678),
            scope: BTreeSet::from(["offline_access".to_string(), "write:jira-work".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("tokens.json"));

        assert!(store.load().await.unwrap().is_none());

        let record = sample_record();
        store.save(&record).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));
        store.save(&sample_record()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileTokenStore::new(path.clone());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));

        store.save(&sample_record()).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryTokenStore::new();
        store.save(&sample_record()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(sample_record()));
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }
}
