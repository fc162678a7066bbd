//! Source file abstraction
//!
//! Wraps the raw bytes of a source image together with its sniffed MIME
//! type, extension, and content hash. When a caller needs the source on
//! disk, `materialize` writes it to a temp file owned by this object;
//! the temp file is removed when the `SourceFile` is dropped, on every
//! exit path.

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::RepixError;

/// MIME type reported when the bytes are not a recognized image
pub const OCTET_STREAM: &str = "application/octet-stream";

/// An immutable source image blob
#[derive(Debug)]
pub struct SourceFile {
    raw: Bytes,
    mime_type: String,
    extension: String,
    local: Option<NamedTempFile>,
}

/// Map a sniffed image format to (MIME type, canonical extension)
fn identify(data: &[u8]) -> (String, String) {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Jpeg) => ("image/jpeg".to_string(), "jpg".to_string()),
        Ok(image::ImageFormat::Png) => ("image/png".to_string(), "png".to_string()),
        Ok(image::ImageFormat::WebP) => ("image/webp".to_string(), "webp".to_string()),
        Ok(image::ImageFormat::Gif) => ("image/gif".to_string(), "gif".to_string()),
        Ok(other) => {
            let ext = other
                .extensions_str()
                .first()
                .copied()
                .unwrap_or("bin")
                .to_string();
            (format!("image/{}", ext), ext)
        }
        Err(_) => (OCTET_STREAM.to_string(), "bin".to_string()),
    }
}

impl SourceFile {
    /// Create a source from a byte blob, sniffing MIME type and extension
    pub fn from_bytes(blob: impl Into<Bytes>) -> Self {
        let raw = blob.into();
        let (mime_type, extension) = identify(&raw);
        Self {
            raw,
            mime_type,
            extension,
            local: None,
        }
    }

    /// Create a source with an explicitly declared MIME type
    pub fn from_bytes_with_mime(blob: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        let mut file = Self::from_bytes(blob);
        file.mime_type = mime_type.into();
        file
    }

    /// Create a source by reading an existing file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RepixError> {
        let data = std::fs::read(path)?;
        Ok(Self::from_bytes(data))
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn size(&self) -> usize {
        self.raw.len()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Override the derived extension
    pub fn set_extension(&mut self, extension: impl Into<String>) {
        self.extension = extension.into();
    }

    /// True when the MIME family matches the given prefix, e.g. "image"
    pub fn has_mime_prefix(&self, prefix: &str) -> bool {
        self.mime_type.starts_with(&format!("{}/", prefix))
    }

    pub fn is_image(&self) -> bool {
        self.has_mime_prefix("image")
    }

    /// SHA-256 of the raw contents, hex-encoded, for content addressing
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.raw);
        hex::encode(hasher.finalize())
    }

    /// Content-addressed filename: `<hash>.<extension>`
    pub fn full_filename(&self) -> String {
        format!("{}.{}", self.content_hash(), self.extension)
    }

    /// Write the bytes to a temp file and return its path.
    ///
    /// The file is owned by this `SourceFile` and unlinked when it is
    /// dropped or when `release_local` is called. Repeated calls reuse
    /// the existing materialization.
    pub fn materialize(&mut self) -> Result<PathBuf, RepixError> {
        if let Some(local) = &self.local {
            return Ok(local.path().to_path_buf());
        }

        let mut file = NamedTempFile::new()?;
        file.write_all(&self.raw)?;
        file.flush()?;
        let path = file.path().to_path_buf();
        self.local = Some(file);
        Ok(path)
    }

    pub fn has_local_file(&self) -> bool {
        self.local.is_some()
    }

    /// Unlink the temp materialization, if any, ahead of drop
    pub fn release_local(&mut self) {
        self.local = None;
    }
}
