//! Image tag store. Each record owns `<value>.png` in the directory that
//! matches its state.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use super::fetch::ImageFetcher;
use super::ident::random_id;
use super::record::{Record, RecordPatch};
use super::shelf::Shelf;
use super::StoreError;

pub struct ImageStore {
    shelf: Mutex<Shelf>,
    active_dir: PathBuf,
    deleted_dir: PathBuf,
    fetcher: Arc<dyn ImageFetcher>,
}

impl ImageStore {
    pub(crate) fn new(
        shelf: Shelf,
        active_dir: PathBuf,
        deleted_dir: PathBuf,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            shelf: Mutex::new(shelf),
            active_dir,
            deleted_dir,
            fetcher,
        }
    }

    /// Path of the live file for an image id.
    pub fn active_path(&self, id: &str) -> PathBuf {
        image_path(&self.active_dir, id)
    }

    /// Path of the trashed file for an image id.
    pub fn deleted_path(&self, id: &str) -> PathBuf {
        image_path(&self.deleted_dir, id)
    }

    /// Download `url` and store it under `key`.
    ///
    /// The download runs without holding the lock. The record is only added
    /// once the file is on disk, and the file is removed again if the record
    /// cannot be saved.
    pub async fn create(&self, key: &str, url: &str, owner: &str) -> Result<Record, StoreError> {
        self.shelf.lock().await.ensure_vacant(key)?;
        let bytes = self.fetcher.fetch(url).await?;

        let mut shelf = self.shelf.lock().await;
        shelf.ensure_vacant(key)?;

        let id = random_id();
        let path = self.active_path(&id);
        fs::write(&path, &bytes).await?;

        let record = Record::new(key, &id, owner);
        if let Err(e) = shelf.insert(record.clone()) {
            discard(&path).await;
            return Err(e);
        }

        tracing::info!("Created image '{}' as {} (owner: {})", key, id, owner);
        Ok(record)
    }

    /// Rename an image and/or replace its contents with the image at `url`.
    ///
    /// New contents are staged next to the live file and only swapped in
    /// once the record is saved.
    pub async fn update(
        &self,
        key: &str,
        new_key: Option<String>,
        url: Option<&str>,
        owner: &str,
    ) -> Result<Record, StoreError> {
        {
            let shelf = self.shelf.lock().await;
            shelf.ensure_renamable(key, new_key.as_deref())?;
            if !shelf.contains(key) {
                return Err(StoreError::NotFound(shelf.kind()));
            }
        }
        let bytes = match url {
            Some(url) => Some(self.fetcher.fetch(url).await?),
            None => None,
        };

        let mut shelf = self.shelf.lock().await;
        let id = shelf
            .get(key)
            .map(|r| r.value.clone())
            .ok_or(StoreError::NotFound(shelf.kind()))?;

        let staged = match &bytes {
            Some(bytes) => {
                let staged = self.active_dir.join(format!("{}.png.part", id));
                fs::write(&staged, bytes).await?;
                Some(staged)
            }
            None => None,
        };

        let updated = match shelf.update(key, RecordPatch::new(owner).key(new_key)) {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(staged) = &staged {
                    discard(staged).await;
                }
                return Err(e);
            }
        };
        if let Some(staged) = staged {
            fs::rename(&staged, self.active_path(&id)).await?;
        }

        tracing::info!("Updated image '{}' -> '{}' (owner: {})", key, updated.key, owner);
        Ok(updated)
    }

    /// Soft-delete an image, moving its file to the deleted directory.
    pub async fn delete(&self, key: &str, owner: &str) -> Result<Record, StoreError> {
        let mut shelf = self.shelf.lock().await;
        let id = shelf
            .get(key)
            .map(|r| r.value.clone())
            .ok_or(StoreError::NotFound(shelf.kind()))?;
        let (active, trashed) = (self.active_path(&id), self.deleted_path(&id));

        let moved = match fs::rename(&active, &trashed).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Image file for '{}' ({}) is missing", key, id);
                false
            }
            Err(e) => return Err(e.into()),
        };

        match shelf.remove(key, owner) {
            Ok(removed) => {
                tracing::info!("Deleted image '{}' (owner: {})", key, owner);
                Ok(removed)
            }
            Err(e) => {
                if moved {
                    if let Err(restore) = fs::rename(&trashed, &active).await {
                        tracing::warn!("Failed to restore image file {}: {}", id, restore);
                    }
                }
                Err(e)
            }
        }
    }

    /// The active record for `key` and the path of its file.
    pub async fn fetch(&self, key: Option<&str>) -> Option<(Record, PathBuf)> {
        let key = key?;
        let shelf = self.shelf.lock().await;
        shelf.get(key).map(|r| (r.clone(), self.active_path(&r.value)))
    }

    /// Active images, optionally only those whose key contains `filter`.
    pub async fn list(&self, filter: Option<&str>) -> Vec<Record> {
        let shelf = self.shelf.lock().await;
        shelf
            .active()
            .filter(|r| filter.map_or(true, |f| r.key.contains(f)))
            .cloned()
            .collect()
    }

    /// Drop every deleted record, then unlink their files.
    pub async fn purge(&self) -> Result<Vec<Record>, StoreError> {
        let mut shelf = self.shelf.lock().await;
        let purged = shelf.purge()?;

        for record in &purged {
            match fs::remove_file(self.deleted_path(&record.value)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::warn!("Deleted image file {} already gone", record.value);
                }
                Err(e) => {
                    tracing::warn!("Failed to remove image file {}: {}", record.value, e);
                }
            }
        }

        tracing::info!("Purged {} deleted image(s)", purged.len());
        Ok(purged)
    }
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

fn image_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.png", id))
}
