#![warn(missing_docs)]
//! Mirage - prompt-driven image editing and gesture transfer.
//!
//! Upload one image (or two, in gesture mode), describe the change, and get
//! an edited image back from a Gemini image model.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mirage::{AspectRatio, EditSession, GeminiProvider, SourceFile};
//!
//! #[tokio::main]
//! async fn main() -> mirage::Result<()> {
//!     let provider = GeminiProvider::builder().build()?;
//!     let mut session = EditSession::new(Arc::new(provider));
//!
//!     session.upload_primary(SourceFile::from_path("portrait.jpg")).await?;
//!     session.set_prompt("Turn this into a pencil sketch drawing.");
//!     session.set_aspect_ratio(AspectRatio::Standard);
//!     session.generate().await?;
//!
//!     if let Some(result) = session.result() {
//!         result.save_to_dir(".")?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Gesture mode
//!
//! In [`GenerationMode::Gesture`] the primary image is a pose reference and
//! the secondary image is the subject. The prompt is wrapped in
//! [`GESTURE_TEMPLATE`] and the images are sent in that order.
//!
//! # Features
//! - `gemini-image`: Gemini (Google) backend
//! - `cli`: Command-line interface

mod error;
pub mod image;
pub mod session;

// Re-export error types at crate root
pub use error::{MirageError, Result, GENERIC_FAILURE_MESSAGE};

pub use image::{
    AspectRatio, GeneratedResult, GenerationMode, GenerationRequest, ImageEditor, ImageFormat,
    InlineImage, PromptPreset, SourceFile, UploadSlot, UploadedImage, GESTURE_TEMPLATE,
};
pub use session::{EditSession, GenerationState, PendingGeneration};

#[cfg(feature = "gemini-image")]
pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{MirageError, Result};
    pub use crate::image::{
        AspectRatio, GeneratedResult, GenerationMode, ImageEditor, SourceFile,
    };
    pub use crate::session::{EditSession, GenerationState};

    #[cfg(feature = "gemini-image")]
    pub use crate::image::providers::GeminiProvider;
}
