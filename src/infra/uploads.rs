//! Filesystem storage for post images.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

/// Directory (relative to the storage root) that post images are written to.
pub const POST_IMAGE_DIR: &str = "posts";

const CHECKSUM_PREFIX_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file is not a supported image: {0}")]
    NotAnImage(String),
}

/// Pixel size of a decoded image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone)]
pub struct StoredImage {
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: u64,
    pub dimensions: ImageDimensions,
}

#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Check that `data` starts with a recognised image header.
    pub fn inspect_image(data: &[u8]) -> Result<ImageDimensions, UploadStorageError> {
        if data.is_empty() {
            return Err(UploadStorageError::EmptyPayload);
        }
        let size = imagesize::blob_size(data)
            .map_err(|err| UploadStorageError::NotAnImage(err.to_string()))?;
        Ok(ImageDimensions {
            width: size.width,
            height: size.height,
        })
    }

    /// Validate and write an image, returning where it was stored.
    ///
    /// Identical payloads uploaded under the same name share one file.
    pub async fn store_image(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredImage, UploadStorageError> {
        let dimensions = Self::inspect_image(&data)?;

        let checksum = hex::encode(Sha256::digest(&data));
        let stored_path = format!(
            "{POST_IMAGE_DIR}/{}-{}",
            &checksum[..CHECKSUM_PREFIX_LEN],
            sanitize_filename(original_name)
        );
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(StoredImage {
            stored_path,
            checksum,
            size_bytes: data.len() as u64,
            dimensions,
        })
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

/// `Content-Type` for a stored file, guessed from its extension.
pub fn content_type_for(stored_path: &str) -> String {
    mime_guess::from_path(stored_path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "image".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}
