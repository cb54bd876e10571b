//! Durable key-value storage for JSON documents
//!
//! Each logical record type (faucet claims, deployed tokens) is one JSON
//! document addressed by key. Writes replace the whole document.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

/// Key of the faucet claim ledger document.
pub const CLAIMS_KEY: &str = "faucet-claims";
/// Key of the deployed-token list document.
pub const DEPLOYED_TOKENS_KEY: &str = "deployed-tokens";

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns `None` when no document has been written under `key`.
    async fn read_document(&self, key: &str) -> Result<Option<Value>>;

    async fn write_document(&self, key: &str, document: &Value) -> Result<()>;
}

/// Stores each document as `<base_dir>/<key>.json`.
#[derive(Debug)]
pub struct JsonFileStore {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the store, creating the base directory if it doesn't exist.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create store directory {}", base_dir.display()))?;
        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn document_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(anyhow!("Invalid document key '{}'", key));
        }
        Ok(self.base_dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn read_document(&self, key: &str) -> Result<Option<Value>> {
        let path = self.document_path(key)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let document = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(document))
    }

    async fn write_document(&self, key: &str, document: &Value) -> Result<()> {
        let path = self.document_path(key)?;
        let content =
            serde_json::to_string_pretty(document).context("Failed to serialize document")?;

        let _guard = self.write_lock.lock().await;

        // Write to a temp file, then rename over the target (atomic on Unix-like systems)
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;

        if let Err(rename_err) = tokio::fs::rename(&temp_path, &path).await {
            // If rename fails (e.g., cross-device), try copy + remove
            tokio::fs::copy(&temp_path, &path)
                .await
                .with_context(|| format!("Failed to finalize {} ({})", path.display(), rename_err))?;
            tokio::fs::remove_file(&temp_path).await.ok();
        }
        Ok(())
    }
}

/// In-process store used by tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_document(self, key: &str, document: Value) -> Self {
        self.documents.write().await.insert(key.to_string(), document);
        self
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read_document(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn write_document(&self, key: &str, document: &Value) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(key.to_string(), document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_document_reads_as_none() {
        let temp_dir = tempdir().unwrap();
        let store = JsonFileStore::open(temp_dir.path().join("cache")).unwrap();
        assert!(store.read_document(CLAIMS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read_round_trips_through_disk() {
        let temp_dir = tempdir().unwrap();
        let store = JsonFileStore::open(temp_dir.path()).unwrap();
        let doc = json!([{"address": "0xabc", "timestamp": 1}]);

        store.write_document(CLAIMS_KEY, &doc).await.unwrap();

        assert!(temp_dir.path().join("faucet-claims.json").exists());
        assert!(!temp_dir.path().join("faucet-claims.json.tmp").exists());

        let reopened = JsonFileStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.read_document(CLAIMS_KEY).await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn write_replaces_whole_document() {
        let temp_dir = tempdir().unwrap();
        let store = JsonFileStore::open(temp_dir.path()).unwrap();
        store.write_document(DEPLOYED_TOKENS_KEY, &json!([1, 2, 3])).await.unwrap();
        store.write_document(DEPLOYED_TOKENS_KEY, &json!([4])).await.unwrap();
        assert_eq!(
            store.read_document(DEPLOYED_TOKENS_KEY).await.unwrap(),
            Some(json!([4]))
        );
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(temp_dir.path().join("faucet-claims.json"), "{not json").unwrap();
        let store = JsonFileStore::open(temp_dir.path()).unwrap();
        assert!(store.read_document(CLAIMS_KEY).await.is_err());
    }

    #[tokio::test]
    async fn rejects_path_like_keys() {
        let temp_dir = tempdir().unwrap();
        let store = JsonFileStore::open(temp_dir.path()).unwrap();
        assert!(store.read_document("../etc/passwd").await.is_err());
        assert!(store.write_document("", &json!(null)).await.is_err());
    }

    #[tokio::test]
    async fn memory_store_keeps_documents_per_key() {
        let store = MemoryStore::new()
            .with_document(CLAIMS_KEY, json!([]))
            .await;
        store.write_document(DEPLOYED_TOKENS_KEY, &json!(["x"])).await.unwrap();
        assert_eq!(store.read_document(CLAIMS_KEY).await.unwrap(), Some(json!([])));
        assert_eq!(
            store.read_document(DEPLOYED_TOKENS_KEY).await.unwrap(),
            Some(json!(["x"]))
        );
    }
}
