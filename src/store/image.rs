//! Image sinks for uploaded laptop pictures.
//!
//! The upload handler only talks to the [`ImageStore`] trait. Two backends
//! are provided:
//!
//! - **DiskImageStore**: writes `<dir>/<image_id><image_type>` and keeps the
//!   metadata in memory
//! - **MemoryImageStore**: keeps everything in memory (tests, embedding)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

/// An image accepted by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub laptop_id: String,
    pub image_type: String,
    pub size: usize,
}

/// Sink for complete uploaded images.
///
/// `save` is only ever called with a fully received image; partial uploads
/// never reach the store.
#[async_trait]
pub trait ImageStore: Send + Sync + 'static {
    /// Persists `data` and returns the new image id.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be written.
    async fn save(&self, laptop_id: &str, image_type: &str, data: Vec<u8>) -> Result<String>;
}

/// Turns an image type such as `jpg` or `.png` into the dotted extension
/// used for file names (`.jpg`, `.png`).
///
/// Apart from the optional leading dot, the type must be 1 to 16 ASCII
/// alphanumerics.
///
/// # Errors
///
/// Returns an error describing why the type was rejected.
pub fn normalize_image_type(image_type: &str) -> Result<String> {
    let ext = image_type.strip_prefix('.').unwrap_or(image_type);
    if ext.is_empty() || ext.len() > 16 {
        bail!("image type must have 1 to 16 characters: {image_type:?}");
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("image type must be alphanumeric: {image_type:?}");
    }
    Ok(format!(".{ext}"))
}

/// Filesystem-backed [`ImageStore`].
pub struct DiskImageStore {
    image_dir: PathBuf,
    images: RwLock<HashMap<String, StoredImage>>,
}

impl DiskImageStore {
    /// Creates a store writing into `image_dir`. The directory is created on
    /// first save.
    pub fn new<P: AsRef<Path>>(image_dir: P) -> Self {
        Self {
            image_dir: image_dir.as_ref().to_path_buf(),
            images: RwLock::new(HashMap::new()),
        }
    }

    /// Returns metadata of a saved image.
    pub fn info(&self, image_id: &str) -> Option<StoredImage> {
        self.images.read().get(image_id).cloned()
    }

    /// Path an image with this id and type is written to.
    pub fn image_path(&self, image_id: &str, image_type: &str) -> PathBuf {
        self.image_dir.join(format!("{image_id}{image_type}"))
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    async fn save(&self, laptop_id: &str, image_type: &str, data: Vec<u8>) -> Result<String> {
        let image_type = normalize_image_type(image_type)?;

        let image_id = Uuid::new_v4().to_string();
        let path = self.image_path(&image_id, &image_type);

        tokio::fs::create_dir_all(&self.image_dir)
            .await
            .with_context(|| {
                format!("Failed to create image directory: {}", self.image_dir.display())
            })?;
        tokio::fs::write(&path, &data)
            .await
            .with_context(|| format!("Failed to write image file: {}", path.display()))?;

        self.images.write().insert(
            image_id.clone(),
            StoredImage {
                laptop_id: laptop_id.to_string(),
                image_type,
                size: data.len(),
            },
        );

        Ok(image_id)
    }
}

/// In-memory [`ImageStore`].
#[derive(Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<String, (StoredImage, Vec<u8>)>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of images saved so far.
    pub fn len(&self) -> usize {
        self.images.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.read().is_empty()
    }

    /// Returns the metadata and bytes of a saved image.
    pub fn get(&self, image_id: &str) -> Option<(StoredImage, Vec<u8>)> {
        self.images.read().get(image_id).cloned()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn save(&self, laptop_id: &str, image_type: &str, data: Vec<u8>) -> Result<String> {
        let image_type = normalize_image_type(image_type)?;

        let image_id = Uuid::new_v4().to_string();
        let info = StoredImage {
            laptop_id: laptop_id.to_string(),
            image_type,
            size: data.len(),
        };
        self.images.write().insert(image_id.clone(), (info, data));
        Ok(image_id)
    }
}
