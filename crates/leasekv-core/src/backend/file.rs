// # File KV Store
//
// File-based implementation of KvStore for single-host deployments that do
// not run a Consul agent.
//
// ## Crash Recovery
//
// - Atomic writes: write-then-rename
// - Corruption detection: JSON is validated on open
// - Automatic backup: the previous file is kept as `.backup`
// - Recovery: falls back to the backup if the main file is corrupted
//
// ## Concurrency
//
// Hook invocations may run as overlapping processes. Every mutation holds
// an exclusive advisory lock on the `.lock` sidecar for its whole
// read-modify-write and re-reads the file under that lock, so a write
// acknowledged by one process is never dropped by another. Temp files are
// named per process.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "entries": {
//     "DNSMASQ/192.168.1.222": "{\"ip\":\"192.168.1.222\",...}"
//   }
// }
// ```

use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::kv_store::KvStore;

/// Store file format version
const STORE_FILE_VERSION: &str = "1.0";

/// File-backed key-value store
///
/// The whole map is loaded on [`FileKvStore::open`] and rewritten after
/// every mutation, so a returned `Ok` means the change is on disk.
///
/// # Example
///
/// ```rust,no_run
/// use leasekv_core::backend::FileKvStore;
/// use leasekv_core::traits::KvStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileKvStore::open("/var/lib/leasekv/leases.json").await?;
///     store.put("DNSMASQ/10.0.0.2", b"{}").await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

/// Exclusive advisory lock on the store's sidecar file
///
/// Released on drop.
struct StoreLock {
    file: fs::File,
}

impl StoreLock {
    async fn acquire(path: &Path) -> Result<Self, Error> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .await
            .map_err(|e| {
                Error::store_unavailable(format!(
                    "Failed to open lock file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        file.lock_exclusive().map_err(|e| {
            Error::store_unavailable(format!("Failed to lock {}: {}", path.display(), e))
        })?;

        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release store lock: {}", e);
        }
    }
}

/// Serializable store file format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    entries: BTreeMap<String, String>,
}

impl FileKvStore {
    /// Open or create a file store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Load the existing file
    /// 3. If it is corrupted, load the backup instead
    /// 4. If both fail, start empty
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let entries = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_with_recovery(path: &Path) -> Result<BTreeMap<String, String>, Error> {
        match Self::load(path).await {
            Ok(entries) => {
                tracing::debug!("Loaded {} entries from {}", entries.len(), path.display());
                Ok(entries)
            }
            Err(Error::Decode(reason)) => {
                tracing::warn!(
                    "Store file {} is corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    reason
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with an empty store.");
                    return Ok(BTreeMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(entries) => {
                        tracing::info!("Recovered {} entries from backup", entries.len());
                        if let Err(e) = fs::copy(&backup_path, path).await {
                            tracing::error!("Failed to restore store file from backup: {}", e);
                        }
                        Ok(entries)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unreadable: {}. Starting with an empty store.",
                            backup_err
                        );
                        Ok(BTreeMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<BTreeMap<String, String>, Error> {
        if !path.exists() {
            tracing::debug!("Store file does not exist yet: {}", path.display());
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path).await?;

        let file: StoreFileFormat = serde_json::from_str(&content)
            .map_err(|e| Error::decode(format!("{}: {}", path.display(), e)))?;

        if file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. Loading anyway.",
                STORE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.entries)
    }

    /// Write the map atomically: temp file, backup, rename
    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        let file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            entries: entries.clone(),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::encode(format!("Failed to serialize store file: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path).await?;
            temp.write_all(json.as_bytes()).await?;
            temp.sync_all().await?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store_unavailable(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Store written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension(format!("{}.tmp", std::process::id()));
        temp
    }

    fn lock_path(&self) -> PathBuf {
        let mut lock = self.path.clone();
        lock.set_extension("lock");
        lock
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, Error> {
        let guard = self.entries.read().await;
        Ok(guard
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        let guard = self.entries.read().await;
        guard
            .get(key)
            .map(|value| value.clone().into_bytes())
            .ok_or_else(|| Error::not_found(key))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        let value = std::str::from_utf8(value).map_err(|e| {
            Error::store_rejected(format!("Value for {} is not valid UTF-8: {}", key, e))
        })?;

        let _lock = StoreLock::acquire(&self.lock_path()).await?;
        let mut guard = self.entries.write().await;
        *guard = Self::load_with_recovery(&self.path).await?;
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard).await
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let _lock = StoreLock::acquire(&self.lock_path()).await?;
        let mut guard = self.entries.write().await;
        *guard = Self::load_with_recovery(&self.path).await?;
        if guard.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&guard).await
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
