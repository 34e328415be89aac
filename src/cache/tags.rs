//! Text tag store.

use tokio::sync::Mutex;

use super::record::{Record, RecordPatch};
use super::shelf::Shelf;
use super::StoreError;

pub struct TagStore {
    shelf: Mutex<Shelf>,
}

impl TagStore {
    pub(crate) fn new(shelf: Shelf) -> Self {
        Self {
            shelf: Mutex::new(shelf),
        }
    }

    /// Add a tag. Fails if `key` is already in use.
    pub async fn create(
        &self,
        key: &str,
        content: &str,
        url: Option<String>,
        owner: &str,
    ) -> Result<Record, StoreError> {
        let mut shelf = self.shelf.lock().await;
        let record = Record::new(key, content, owner).with_url(url);
        shelf.insert(record.clone())?;

        tracing::info!("Created tag '{}' (owner: {})", key, owner);
        Ok(record)
    }

    /// Rename and/or rewrite a tag.
    pub async fn update(
        &self,
        key: &str,
        new_key: Option<String>,
        content: Option<String>,
        url: Option<String>,
        owner: &str,
    ) -> Result<Record, StoreError> {
        let mut shelf = self.shelf.lock().await;
        let patch = RecordPatch::new(owner).key(new_key).value(content).url(url);
        let updated = shelf.update(key, patch)?;

        tracing::info!("Updated tag '{}' -> '{}' (owner: {})", key, updated.key, owner);
        Ok(updated)
    }

    /// Soft-delete a tag.
    pub async fn delete(&self, key: &str, owner: &str) -> Result<Record, StoreError> {
        let mut shelf = self.shelf.lock().await;
        let removed = shelf.remove(key, owner)?;

        tracing::info!("Deleted tag '{}' (owner: {})", key, owner);
        Ok(removed)
    }

    pub async fn fetch(&self, key: Option<&str>) -> Option<Record> {
        let key = key?;
        self.shelf.lock().await.get(key).cloned()
    }

    /// Active tags, optionally only those whose key contains `filter`.
    pub async fn list(&self, filter: Option<&str>) -> Vec<Record> {
        let shelf = self.shelf.lock().await;
        shelf
            .active()
            .filter(|r| filter.map_or(true, |f| r.key.contains(f)))
            .cloned()
            .collect()
    }

    /// Permanently drop every deleted tag and return them.
    pub async fn purge(&self) -> Result<Vec<Record>, StoreError> {
        let mut shelf = self.shelf.lock().await;
        let purged = shelf.purge()?;

        tracing::info!("Purged {} deleted tag(s)", purged.len());
        Ok(purged)
    }
}
