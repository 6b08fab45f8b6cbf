//! Stored image references and the upload directory layout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Public URL prefix under which the uploads directory is served.
pub const UPLOADS_URL_PREFIX: &str = "uploads";
pub const MAX_IMAGES_PER_REQUEST: usize = 5;
pub const MAX_IMAGE_BYTES: usize = 5_000_000;

/// Feature partition of the uploads directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadArea {
    Listings,
    Reviews,
}

impl UploadArea {
    pub const fn directory(self) -> &'static str {
        match self {
            UploadArea::Listings => "listings",
            UploadArea::Reviews => "reviews",
        }
    }

    pub const fn file_prefix(self) -> &'static str {
        match self {
            UploadArea::Listings => "listing",
            UploadArea::Reviews => "review",
        }
    }
}

/// Image received from a multipart request, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// The file name's extension only when it agrees with the declared content type,
    /// otherwise one derived from the content type.
    fn extension(&self) -> String {
        let declared = self.content_type.parse::<mime::Mime>().ok();
        let essence = declared
            .as_ref()
            .map(|mime| mime.essence_str())
            .unwrap_or(self.content_type.as_str());

        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| {
                mime_guess::from_ext(ext)
                    .iter()
                    .any(|guess| guess.essence_str() == essence)
            });

        from_name
            .or_else(|| {
                mime_guess::get_mime_extensions_str(essence)
                    .and_then(|exts| exts.first())
                    .map(|ext| ext.to_string())
            })
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }
}

/// Reference to a stored file, e.g. `uploads/listings/listing-1717-42.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredImage(pub String);

impl StoredImage {
    pub fn file_name(&self) -> Option<&str> {
        self.0.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored image reference '{0}' is outside the uploads directory")]
    ForeignReference(String),
}

/// Check count, size, and content type before anything is written.
pub fn validate_uploads(uploads: &[ImageUpload]) -> Result<(), String> {
    if uploads.len() > MAX_IMAGES_PER_REQUEST {
        return Err(format!(
            "At most {MAX_IMAGES_PER_REQUEST} images can be uploaded"
        ));
    }
    for upload in uploads {
        let is_image = upload
            .content_type
            .parse::<mime::Mime>()
            .map(|parsed| parsed.type_() == mime::IMAGE)
            .unwrap_or(false);
        if !is_image {
            return Err("Only images are allowed".to_string());
        }
        if upload.bytes.len() > MAX_IMAGE_BYTES {
            return Err("File too large".to_string());
        }
    }
    Ok(())
}

/// `<prefix>-<unix millis>-<random>.<ext>`
pub fn generate_file_name(area: UploadArea, upload: &ImageUpload) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!(
        "{}-{}-{}{}",
        area.file_prefix(),
        Utc::now().timestamp_millis(),
        suffix,
        upload.extension()
    )
}

/// Outbound file storage seam.
pub trait ImageStore: Send + Sync {
    fn store(&self, area: UploadArea, upload: ImageUpload) -> Result<StoredImage, StorageError>;
    /// Removing a file that is already gone is not an error.
    fn remove(&self, image: &StoredImage) -> Result<(), StorageError>;
}

/// Stores images on the local filesystem beneath a root directory.
#[derive(Debug, Clone)]
pub struct DiskImageStore {
    root: PathBuf,
}

impl DiskImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the per-area directories.
    pub fn prepare(&self) -> Result<(), StorageError> {
        for area in [UploadArea::Listings, UploadArea::Reviews] {
            fs::create_dir_all(self.root.join(area.directory()))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, image: &StoredImage) -> Result<PathBuf, StorageError> {
        let foreign = || StorageError::ForeignReference(image.0.clone());
        let relative = image
            .0
            .trim_start_matches('/')
            .strip_prefix(UPLOADS_URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(foreign)?;
        let mut parts = relative.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(dir), Some(file), None)
                if [UploadArea::Listings, UploadArea::Reviews]
                    .iter()
                    .any(|area| area.directory() == dir)
                    && !file.is_empty()
                    && file != ".."
                    && file != "." =>
            {
                Ok(self.root.join(dir).join(file))
            }
            _ => Err(foreign()),
        }
    }
}

impl ImageStore for DiskImageStore {
    fn store(&self, area: UploadArea, upload: ImageUpload) -> Result<StoredImage, StorageError> {
        let directory = self.root.join(area.directory());
        fs::create_dir_all(&directory)?;
        let file_name = generate_file_name(area, &upload);
        fs::write(directory.join(&file_name), &upload.bytes)?;
        Ok(StoredImage(format!(
            "{UPLOADS_URL_PREFIX}/{}/{file_name}",
            area.directory()
        )))
    }

    fn remove(&self, image: &StoredImage) -> Result<(), StorageError> {
        let path = self.resolve(image)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

/// Keeps image bytes in memory; used by tests and the CLI demo.
#[derive(Debug, Default, Clone)]
pub struct MemoryImageStore {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryImageStore {
    pub fn contains(&self, image: &StoredImage) -> bool {
        self.files
            .lock()
            .expect("image store mutex poisoned")
            .contains_key(&image.0)
    }

    pub fn len(&self) -> usize {
        self.files.lock().expect("image store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageStore for MemoryImageStore {
    fn store(&self, area: UploadArea, upload: ImageUpload) -> Result<StoredImage, StorageError> {
        let file_name = generate_file_name(area, &upload);
        let image = StoredImage(format!(
            "{UPLOADS_URL_PREFIX}/{}/{file_name}",
            area.directory()
        ));
        self.files
            .lock()
            .expect("image store mutex poisoned")
            .insert(image.0.clone(), upload.bytes);
        Ok(image)
    }

    fn remove(&self, image: &StoredImage) -> Result<(), StorageError> {
        self.files
            .lock()
            .expect("image store mutex poisoned")
            .remove(&image.0);
        Ok(())
    }
}

/// Store every upload, removing the ones already written if a later write fails.
pub fn store_batch(
    store: &dyn ImageStore,
    area: UploadArea,
    uploads: Vec<ImageUpload>,
) -> Result<Vec<StoredImage>, StorageError> {
    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match store.store(area, upload) {
            Ok(image) => stored.push(image),
            Err(err) => {
                discard(store, &stored);
                return Err(err);
            }
        }
    }
    Ok(stored)
}

/// Best-effort removal; failures are logged and skipped.
pub fn discard(store: &dyn ImageStore, images: &[StoredImage]) {
    for image in images {
        if let Err(err) = store.remove(image) {
            tracing::warn!(image = %image.0, error = %err, "failed to remove stored image");
        }
    }
}
