//! Tag and image cache with soft deletion and JSON persistence.
//!
//! Layout under the cache root:
//! - storage/tags.json, deleted/tags.json : text tags
//! - storage/meta.json, deleted/meta.json : image records
//! - storage/images/, deleted/images/     : `<id>.png` files

pub mod fetch;
pub mod ident;
pub mod images;
pub mod persist;
pub mod record;
pub mod shelf;
pub mod tags;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub use fetch::{HttpFetcher, ImageFetcher};
pub use images::ImageStore;
pub use record::{Record, RecordPatch, RecordState};
pub use tags::TagStore;

use shelf::Shelf;

pub const STORAGE_DIR: &str = "storage";
pub const DELETED_DIR: &str = "deleted";
pub const IMAGES_DIR: &str = "images";
pub const TAGS_FILE: &str = "tags.json";
pub const IMAGES_FILE: &str = "meta.json";

/// Record domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Tag,
    Image,
}

impl Kind {
    fn file_name(&self) -> &'static str {
        match self {
            Kind::Tag => TAGS_FILE,
            Kind::Image => IMAGES_FILE,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Tag => write!(f, "Tag"),
            Kind::Image => write!(f, "Image"),
        }
    }
}

/// Cache failures. Validation variants render as the message shown to users.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} already exists")]
    AlreadyExists(Kind),

    #[error("{0} cannot be renamed as the new name is already in use.")]
    RenameConflict(Kind),

    #[error("No {} found with that key.", .0.to_string().to_lowercase())]
    NotFound(Kind),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether this is a user mistake rather than an I/O problem.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::AlreadyExists(_) | StoreError::RenameConflict(_) | StoreError::NotFound(_)
        )
    }
}

/// Handle to both record domains.
pub struct Cache {
    root: PathBuf,
    pub tags: TagStore,
    pub images: ImageStore,
}

impl Cache {
    /// Create the directory layout under `root` and load every record file.
    pub fn open(root: impl AsRef<Path>, fetcher: Arc<dyn ImageFetcher>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        let storage = root.join(STORAGE_DIR);
        let deleted = root.join(DELETED_DIR);

        let active_images = storage.join(IMAGES_DIR);
        let deleted_images = deleted.join(IMAGES_DIR);
        std::fs::create_dir_all(&active_images)?;
        std::fs::create_dir_all(&deleted_images)?;

        let shelf_for = |kind: Kind| {
            Shelf::load(
                kind,
                storage.join(kind.file_name()),
                deleted.join(kind.file_name()),
            )
        };

        let cache = Self {
            tags: TagStore::new(shelf_for(Kind::Tag)),
            images: ImageStore::new(
                shelf_for(Kind::Image),
                active_images,
                deleted_images,
                fetcher,
            ),
            root,
        };

        tracing::info!("Opened cache at {}", cache.root.display());
        Ok(cache)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
