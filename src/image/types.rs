//! Core types for image editing.

use crate::error::{MirageError, Result};
use base64::Engine;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Product name used in generated download filenames.
pub const PRODUCT_NAME: &str = "mirage";

/// Content type assumed for inline data that declares none.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Image formats accepted for upload, recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
    /// GIF format.
    Gif,
    /// HEIC / HEIF format (phone cameras).
    Heic,
    /// Windows bitmap.
    Bmp,
}

impl ImageFormat {
    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Heic => "image/heic",
            Self::Bmp => "image/bmp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            "heic" | "heif" => Some(Self::Heic),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }
}

/// Output aspect ratios accepted by the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AspectRatio {
    /// 1:1 square aspect ratio.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 3:4 portrait aspect ratio.
    #[serde(rename = "3:4")]
    StandardPortrait,
    /// 4:3 landscape aspect ratio.
    #[serde(rename = "4:3")]
    Standard,
    /// 9:16 tall portrait aspect ratio.
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9 widescreen aspect ratio.
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    /// Every ratio, in the order they are offered to the user.
    pub const ALL: [AspectRatio; 5] = [
        Self::Square,
        Self::StandardPortrait,
        Self::Standard,
        Self::Portrait,
        Self::Landscape,
    ];

    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::StandardPortrait => "3:4",
            Self::Standard => "4:3",
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = MirageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| {
                MirageError::InvalidRequest(format!(
                    "unsupported aspect ratio '{s}' (expected one of 1:1, 3:4, 4:3, 9:16, 16:9)"
                ))
            })
    }
}

/// How the prompt and uploads are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Edit a single source image with a free-text instruction.
    #[default]
    Standard,
    /// Render the subject of the second image in the pose of the first.
    Gesture,
}

impl GenerationMode {
    /// Returns the mode name as used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Gesture => "gesture",
        }
    }

    /// Whether the secondary (subject) image must be present.
    pub fn requires_secondary(&self) -> bool {
        matches!(self, Self::Gesture)
    }

    /// Label for the primary upload slot.
    pub fn primary_label(&self) -> &'static str {
        match self {
            Self::Standard => "Upload Source Image",
            Self::Gesture => "Upload Gesture (Pose)",
        }
    }

    /// Label for the secondary upload slot, if the mode uses one.
    pub fn secondary_label(&self) -> Option<&'static str> {
        match self {
            Self::Standard => None,
            Self::Gesture => Some("Upload Subject (Person)"),
        }
    }

    /// Label for the generate action.
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::Standard => "Generate Transformation",
            Self::Gesture => "Copy Gesture & Generate",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text-encoded image ready to embed in a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// Declared content type (e.g. `image/jpeg`).
    pub mime_type: String,
    /// Base64 payload without any `data:` prefix.
    pub data: String,
}

/// One outbound edit request. Built per call, never stored.
///
/// Constructed by [`crate::EditSession`], which checks that the images the
/// mode needs are present before building one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Prompt text after mode-specific templating.
    pub prompt: String,
    /// Source (standard) or pose (gesture) image.
    pub primary: InlineImage,
    /// Subject image, gesture mode only.
    pub secondary: Option<InlineImage>,
    /// Output aspect ratio, passed through to the model.
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    /// Number of images carried by this request.
    pub fn image_count(&self) -> usize {
        1 + usize::from(self.secondary.is_some())
    }
}

/// The normalized output of one successful generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "generated result should be displayed or saved"]
pub struct GeneratedResult {
    /// `data:` URI of the returned image, if any.
    pub image_url: Option<String>,
    /// Accompanying text returned by the model, if any.
    pub text: Option<String>,
}

impl GeneratedResult {
    /// Returns true when the model returned neither image nor text.
    pub fn is_empty(&self) -> bool {
        self.image_url.is_none() && self.text.is_none()
    }

    /// Filename offered when saving a result generated at `timestamp_ms`.
    pub fn download_filename(timestamp_ms: i64) -> String {
        format!("{PRODUCT_NAME}-edit-{timestamp_ms}.png")
    }

    /// Decodes the image data URI into raw bytes.
    pub fn image_bytes(&self) -> Result<Option<Vec<u8>>> {
        let Some(url) = self.image_url.as_deref() else {
            return Ok(None);
        };
        let payload = url
            .split_once(";base64,")
            .map(|(_, data)| data)
            .ok_or_else(|| MirageError::Decode("image URL is not a base64 data URI".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map(Some)
            .map_err(|e| MirageError::Decode(e.to_string()))
    }

    /// Saves the image into `dir` under a timestamped download name.
    ///
    /// Returns `None` when the result carries no image.
    pub fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let Some(bytes) = self.image_bytes()? else {
            return Ok(None);
        };
        let filename = Self::download_filename(chrono::Utc::now().timestamp_millis());
        let path = dir.as_ref().join(filename);
        std::fs::write(&path, bytes)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("heif"), Some(ImageFormat::Heic));
        assert_eq!(ImageFormat::from_extension("txt"), None);
        assert_eq!(ImageFormat::Heic.mime_type(), "image/heic");
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_aspect_ratio_parse() {
        for ratio in AspectRatio::ALL {
            assert_eq!(ratio.as_str().parse::<AspectRatio>().unwrap(), ratio);
        }
        assert!("21:9".parse::<AspectRatio>().is_err());
        assert!("square".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_aspect_ratio_serializes_verbatim() {
        let json = serde_json::to_string(&AspectRatio::Standard).unwrap();
        assert_eq!(json, "\"4:3\"");
        assert_eq!(AspectRatio::default(), AspectRatio::Square);
    }

    #[test]
    fn test_mode_labels() {
        assert!(!GenerationMode::Standard.requires_secondary());
        assert!(GenerationMode::Gesture.requires_secondary());
        assert_eq!(GenerationMode::Standard.secondary_label(), None);
        assert_eq!(
            GenerationMode::Gesture.action_label(),
            "Copy Gesture & Generate"
        );
    }

    #[test]
    fn test_download_filename() {
        assert_eq!(
            GeneratedResult::download_filename(1_700_000_000_000),
            "mirage-edit-1700000000000.png"
        );
    }

    #[test]
    fn test_image_bytes_decodes_data_uri() {
        let result = GeneratedResult {
            image_url: Some("data:image/png;base64,AAAA".into()),
            text: None,
        };
        assert_eq!(result.image_bytes().unwrap(), Some(vec![0, 0, 0]));

        let empty = GeneratedResult::default();
        assert!(empty.is_empty());
        assert_eq!(empty.image_bytes().unwrap(), None);

        let bad = GeneratedResult {
            image_url: Some("https://example.com/x.png".into()),
            text: None,
        };
        assert!(matches!(bad.image_bytes(), Err(MirageError::Decode(_))));
    }

    #[test]
    fn test_save_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = GeneratedResult {
            image_url: Some("data:image/png;base64,iVBORw0KGgo=".into()),
            text: Some("done".into()),
        };
        let path = result.save_to_dir(dir.path()).unwrap().unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("mirage-edit-"));
        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), PNG_MAGIC[..8].to_vec());

        let text_only = GeneratedResult {
            image_url: None,
            text: Some("no image".into()),
        };
        assert!(text_only.save_to_dir(dir.path()).unwrap().is_none());
    }
}
