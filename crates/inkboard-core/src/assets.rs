//! Image uploads for image items.

use crate::storage::BoxFuture;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use uuid::Uuid;

/// Bucket uploaded board images are stored under.
pub const IMAGE_BUCKET: &str = "whiteboard-images";

/// Asset upload errors.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Upload rejected: {0}")]
    Rejected(String),
    #[error("Nothing to upload")]
    Empty,
    #[error("Asset error: {0}")]
    Other(String),
}

/// Public reference to an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub url: String,
}

/// Image format of uploaded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.starts_with(b"GIF8") {
            return Some(ImageFormat::Gif);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }

    /// Best guess from the file name first, then the content.
    pub fn detect(data: &[u8], name_hint: &str) -> Option<Self> {
        Path::new(name_hint)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .or_else(|| Self::from_magic_bytes(data))
    }
}

/// Object path for a new upload: `whiteboards/<random>.<ext>`.
fn object_path(data: &[u8], name_hint: &str) -> String {
    let ext = Path::new(name_hint)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .or_else(|| ImageFormat::from_magic_bytes(data).map(|f| f.extension().to_string()))
        .unwrap_or_else(|| "bin".to_string());
    format!("whiteboards/{}.{}", Uuid::new_v4().simple(), ext)
}

/// Binary asset upload.
#[cfg(not(target_arch = "wasm32"))]
pub trait AssetStore: Send + Sync {
    /// Upload `data` and return its public reference.
    fn upload(&self, data: &[u8], name_hint: &str) -> BoxFuture<'_, Result<AssetRef, AssetError>>;
}

/// Binary asset upload (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait AssetStore {
    /// Upload `data` and return its public reference.
    fn upload(&self, data: &[u8], name_hint: &str) -> BoxFuture<'_, Result<AssetRef, AssetError>>;
}

/// In-memory asset bucket for testing and offline use.
#[derive(Default)]
pub struct MemoryAssets {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail (or succeed again).
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Stored bytes for an asset URL.
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        let path = url.strip_prefix(&format!("memory://{}/", IMAGE_BUCKET))?;
        self.objects.read().ok()?.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetStore for MemoryAssets {
    fn upload(&self, data: &[u8], name_hint: &str) -> BoxFuture<'_, Result<AssetRef, AssetError>> {
        let data = data.to_vec();
        let path = object_path(&data, name_hint);

        Box::pin(async move {
            if self.fail_uploads.load(Ordering::SeqCst) {
                return Err(AssetError::Rejected("bucket unavailable".to_string()));
            }
            if data.is_empty() {
                return Err(AssetError::Empty);
            }
            let mut objects = self
                .objects
                .write()
                .map_err(|e| AssetError::Other(format!("Lock error: {}", e)))?;
            let url = format!("memory://{}/{}", IMAGE_BUCKET, path);
            objects.insert(path, data);
            Ok(AssetRef { url })
        })
    }
}

/// Inlines uploads as base64 `data:` URLs; no remote bucket needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUrlAssets;

impl AssetStore for DataUrlAssets {
    fn upload(&self, data: &[u8], name_hint: &str) -> BoxFuture<'_, Result<AssetRef, AssetError>> {
        let result = if data.is_empty() {
            Err(AssetError::Empty)
        } else {
            let mime = ImageFormat::detect(data, name_hint)
                .map(|f| f.mime_type())
                .unwrap_or("application/octet-stream");
            Ok(AssetRef {
                url: format!("data:{};base64,{}", mime, STANDARD.encode(data)),
            })
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_format_detection() {
        assert_eq!(ImageFormat::detect(PNG_HEADER, "photo.JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(PNG_HEADER, "clipboard"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::detect(b"GIF89a..", ""), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::detect(b"plain", "notes.txt"), None);
    }

    #[test]
    fn test_memory_upload() {
        let assets = MemoryAssets::new();
        let asset = block_on(assets.upload(PNG_HEADER, "diagram.png")).unwrap();

        assert!(asset.url.starts_with("memory://whiteboard-images/whiteboards/"));
        assert!(asset.url.ends_with(".png"));
        assert_eq!(assets.get(&asset.url).as_deref(), Some(PNG_HEADER));
    }

    #[test]
    fn test_memory_upload_unique_paths() {
        let assets = MemoryAssets::new();
        let a = block_on(assets.upload(PNG_HEADER, "same.png")).unwrap();
        let b = block_on(assets.upload(PNG_HEADER, "same.png")).unwrap();
        assert_ne!(a.url, b.url);
        assert_eq!(assets.len(), 2);
    }

    #[test]
    fn test_memory_upload_failure() {
        let assets = MemoryAssets::new();
        assets.set_fail_uploads(true);

        let result = block_on(assets.upload(PNG_HEADER, "diagram.png"));
        assert!(matches!(result, Err(AssetError::Rejected(_))));
        assert!(assets.is_empty());
    }

    #[test]
    fn test_empty_upload_rejected() {
        assert!(matches!(block_on(MemoryAssets::new().upload(&[], "a.png")), Err(AssetError::Empty)));
        assert!(matches!(block_on(DataUrlAssets.upload(&[], "a.png")), Err(AssetError::Empty)));
    }

    #[test]
    fn test_data_url() {
        let asset = block_on(DataUrlAssets.upload(PNG_HEADER, "")).unwrap();
        assert_eq!(asset.url, format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER)));
    }
}
