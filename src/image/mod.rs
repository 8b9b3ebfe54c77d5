//! Image editing module.

pub mod prompt;
mod provider;
pub mod providers;
mod types;
pub mod upload;

pub use prompt::{effective_prompt, presets_for, PromptPreset, GESTURE_TEMPLATE};
pub use provider::ImageEditor;
pub use types::{
    AspectRatio, GeneratedResult, GenerationMode, GenerationRequest, ImageFormat, InlineImage,
    DEFAULT_IMAGE_MIME, PRODUCT_NAME,
};
pub use upload::{SourceFile, UploadSlot, UploadedImage};
