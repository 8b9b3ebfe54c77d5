//! Turning user-chosen image files into request-ready payloads.
//!
//! Each [`UploadSlot`] owns the state for one upload position. Accepting a
//! file replaces the slot wholesale; a failed read leaves it untouched.

use crate::error::{MirageError, Result};
use crate::image::types::{ImageFormat, InlineImage};
use base64::Engine;
use std::path::{Path, PathBuf};

/// Content type declared for files whose extension we don't recognise.
const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// A file offered for upload, with the content type it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    content_type: String,
}

impl SourceFile {
    /// Declares the content type from the file extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let content_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .map(|f| f.mime_type())
            .unwrap_or(UNKNOWN_CONTENT_TYPE)
            .to_string();
        Self { path, content_type }
    }

    /// Uses an explicitly declared content type.
    pub fn with_content_type(path: impl Into<PathBuf>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
        }
    }

    /// Path of the file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Whether the declared type is in the image family.
    pub fn is_image(&self) -> bool {
        self.content_type
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

/// What an upload slot currently holds. All fields empty when cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadedImage {
    /// The accepted file.
    pub file: Option<SourceFile>,
    /// `file://` URL for local display.
    pub preview_url: Option<String>,
    /// Base64 payload without a `data:` prefix.
    pub base64: Option<String>,
}

impl UploadedImage {
    /// True once a non-empty payload is available.
    pub fn is_ready(&self) -> bool {
        self.file.is_some() && self.base64.as_deref().is_some_and(|b| !b.is_empty())
    }

    /// The payload and its content type, ready to embed in a request.
    pub fn inline(&self) -> Option<InlineImage> {
        if !self.is_ready() {
            return None;
        }
        Some(InlineImage {
            mime_type: self.file.as_ref()?.content_type().to_string(),
            data: self.base64.clone()?,
        })
    }
}

/// One independent upload position (primary or secondary).
#[derive(Debug, Default)]
pub struct UploadSlot {
    image: UploadedImage,
}

impl UploadSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents.
    pub fn image(&self) -> &UploadedImage {
        &self.image
    }

    /// Whether the slot holds an encoded payload.
    pub fn is_ready(&self) -> bool {
        self.image.is_ready()
    }

    /// Accepts `file` into this slot, replacing whatever was there.
    ///
    /// Non-image files are refused before anything is read. Read or encode
    /// failures are logged and leave the slot as it was.
    pub async fn accept_file(&mut self, file: SourceFile) -> Result<&UploadedImage> {
        if !file.is_image() {
            tracing::debug!(
                path = %file.path().display(),
                content_type = %file.content_type(),
                "refusing non-image upload"
            );
            return Err(MirageError::UnsupportedMediaType(
                file.content_type().to_string(),
            ));
        }

        let preview_url = preview_url(file.path())?;

        let base64 = match encode_file(&file).await {
            Ok(b64) => b64,
            Err(e) => {
                tracing::error!(path = %file.path().display(), error = %e, "error processing file");
                return Err(e);
            }
        };

        tracing::debug!(
            path = %file.path().display(),
            content_type = %file.content_type(),
            encoded_len = base64.len(),
            "accepted upload"
        );

        self.image = UploadedImage {
            file: Some(file),
            preview_url: Some(preview_url),
            base64: Some(base64),
        };
        Ok(&self.image)
    }

    /// Resets every field to empty.
    pub fn clear(&mut self) {
        self.image = UploadedImage::default();
    }
}

/// Builds a `file://` URL for an absolute form of `path`. No I/O.
fn preview_url(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)?;
    reqwest::Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| {
            MirageError::InvalidRequest(format!(
                "cannot build a preview URL for {}",
                absolute.display()
            ))
        })
}

/// Reads the file and returns its bare base64 payload.
async fn encode_file(file: &SourceFile) -> Result<String> {
    let bytes = tokio::fs::read(file.path()).await?;
    if bytes.is_empty() {
        return Err(MirageError::Decode(format!(
            "{} is empty",
            file.path().display()
        )));
    }
    let data_url = to_data_url(file.content_type(), &bytes);
    Ok(strip_data_url_prefix(&data_url).to_string())
}

/// Encodes bytes as a `data:<type>;base64,<payload>` URL.
fn to_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Drops a leading `data:...,` scheme prefix, if any.
pub fn strip_data_url_prefix(input: &str) -> &str {
    match input.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((_, payload)) => payload,
        None => input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_BYTES: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(SourceFile::from_path("a/pose.JPG").content_type(), "image/jpeg");
        assert_eq!(SourceFile::from_path("b.webp").content_type(), "image/webp");
        assert_eq!(
            SourceFile::from_path("notes.txt").content_type(),
            "application/octet-stream"
        );
        assert!(!SourceFile::from_path("no_extension").is_image());
        assert!(SourceFile::with_content_type("x.bin", "image/avif").is_image());
    }

    #[test]
    fn test_strip_data_url_prefix() {
        assert_eq!(strip_data_url_prefix("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url_prefix("AAAA"), "AAAA");
        assert_eq!(strip_data_url_prefix("data:,"), "");
    }

    #[tokio::test]
    async fn test_accept_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "source.png", &PNG_BYTES);

        let mut slot = UploadSlot::new();
        let image = slot.accept_file(SourceFile::from_path(&path)).await.unwrap();

        let payload = image.base64.as_deref().unwrap();
        assert_eq!(payload, "iVBORw0KGgo=");
        assert!(!payload.starts_with("data:"));
        assert!(image.preview_url.as_deref().unwrap().starts_with("file://"));
        assert!(slot.is_ready());

        let inline = slot.image().inline().unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn test_non_image_leaves_slot_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_file(dir.path(), "source.png", &PNG_BYTES);
        let txt = write_file(dir.path(), "notes.txt", b"hello");

        let mut slot = UploadSlot::new();
        slot.accept_file(SourceFile::from_path(&png)).await.unwrap();
        let before = slot.image().clone();

        let err = slot.accept_file(SourceFile::from_path(&txt)).await.unwrap_err();
        assert!(matches!(err, MirageError::UnsupportedMediaType(_)));
        assert_eq!(slot.image(), &before);

        let mut empty = UploadSlot::new();
        assert!(empty
            .accept_file(SourceFile::from_path(&txt))
            .await
            .is_err());
        assert_eq!(empty.image(), &UploadedImage::default());
    }

    #[tokio::test]
    async fn test_read_failure_leaves_slot_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_file(dir.path(), "source.png", &PNG_BYTES);
        let empty_png = write_file(dir.path(), "empty.png", &[]);

        let mut slot = UploadSlot::new();
        slot.accept_file(SourceFile::from_path(&png)).await.unwrap();
        let before = slot.image().clone();

        let missing = dir.path().join("missing.png");
        let err = slot
            .accept_file(SourceFile::from_path(&missing))
            .await
            .unwrap_err();
        assert!(matches!(err, MirageError::Io(_)));
        assert_eq!(slot.image(), &before);

        let err = slot
            .accept_file(SourceFile::from_path(&empty_png))
            .await
            .unwrap_err();
        assert!(matches!(err, MirageError::Decode(_)));
        assert_eq!(slot.image(), &before);
    }

    #[tokio::test]
    async fn test_reupload_replaces_and_clear_resets() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_file(dir.path(), "first.png", &PNG_BYTES);
        let second = write_file(dir.path(), "second.jpg", &[0xFF, 0xD8, 0xFF, 0xE0]);

        let mut slot = UploadSlot::new();
        slot.accept_file(SourceFile::from_path(&first)).await.unwrap();
        slot.accept_file(SourceFile::from_path(&second)).await.unwrap();

        let image = slot.image();
        assert_eq!(image.file.as_ref().unwrap().path(), second.as_path());
        assert_eq!(image.file.as_ref().unwrap().content_type(), "image/jpeg");
        assert_eq!(image.base64.as_deref(), Some("/9j/4A=="));
        assert!(image.preview_url.as_deref().unwrap().ends_with("second.jpg"));

        slot.clear();
        assert_eq!(slot.image(), &UploadedImage::default());
        assert!(!slot.is_ready());
        assert!(slot.image().inline().is_none());
    }
}
